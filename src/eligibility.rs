//! Return eligibility calculator
//!
//! A pure date rule: purchase date + category window -> verdict. This stays
//! deterministic arithmetic precisely so the language model never does it.
//! Different product categories have different return windows (general 30
//! days, electronics 15, clothing 60, food/perishables 7 by default).

use crate::config::ReturnsConfig;
use crate::errors::{AgentError, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Category-to-window-days lookup
#[derive(Debug, Clone)]
pub struct ReturnWindows {
    config: ReturnsConfig,
}

impl ReturnWindows {
    pub fn new(config: ReturnsConfig) -> Self {
        Self { config }
    }

    /// Window in days for a category; unrecognized categories fall back to
    /// the default window rather than erroring
    pub fn window_for(&self, category: &str) -> u32 {
        let normalized = category.trim().to_lowercase();
        self.config
            .windows
            .get(&normalized)
            .copied()
            .unwrap_or(self.config.default_days)
    }
}

impl Default for ReturnWindows {
    fn default() -> Self {
        Self::new(ReturnsConfig::default())
    }
}

/// Outcome of an eligibility check; computed per request, never persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityVerdict {
    pub category: String,
    pub purchase_date: NaiveDate,
    pub as_of: NaiveDate,
    pub window_days: u32,
    pub elapsed_days: u32,
    pub deadline: NaiveDate,
    pub eligible: bool,
    pub days_remaining: Option<u32>,
    pub days_overdue: Option<u32>,
}

impl EligibilityVerdict {
    /// Human-readable verdict block for prompts and terminal output
    pub fn summary(&self) -> String {
        if self.eligible {
            format!(
                "ELIGIBLE FOR RETURN\n\
                 Purchase Date: {}\n\
                 Product Category: {}\n\
                 Return Window: {} days\n\
                 Days Since Purchase: {}\n\
                 Days Remaining: {}\n\
                 Deadline: {}",
                self.purchase_date,
                self.category,
                self.window_days,
                self.elapsed_days,
                self.days_remaining.unwrap_or(0),
                self.deadline,
            )
        } else {
            format!(
                "NOT ELIGIBLE FOR RETURN\n\
                 Purchase Date: {}\n\
                 Product Category: {}\n\
                 Return Window: {} days\n\
                 Days Since Purchase: {}\n\
                 Days Overdue: {}\n\
                 Deadline Was: {}\n\
                 Note: the customer may contact support for special consideration",
                self.purchase_date,
                self.category,
                self.window_days,
                self.elapsed_days,
                self.days_overdue.unwrap_or(0),
                self.deadline,
            )
        }
    }
}

/// Evaluate return eligibility for a purchase
///
/// `elapsed_days` counts calendar days. The window is inclusive: a purchase
/// exactly `window_days` old is still eligible with zero days remaining.
/// A purchase date after `as_of` is an error, never silently defaulted.
pub fn evaluate(
    purchase_date: NaiveDate,
    category: &str,
    as_of: NaiveDate,
    windows: &ReturnWindows,
) -> Result<EligibilityVerdict> {
    if as_of < purchase_date {
        return Err(AgentError::InvalidArgument(format!(
            "purchase date {} is after the reference date {}",
            purchase_date, as_of
        )));
    }

    let window_days = windows.window_for(category);
    let elapsed_days = (as_of - purchase_date).num_days() as u32;
    let deadline = purchase_date + Duration::days(window_days as i64);
    let eligible = elapsed_days <= window_days;

    Ok(EligibilityVerdict {
        category: category.trim().to_lowercase(),
        purchase_date,
        as_of,
        window_days,
        elapsed_days,
        deadline,
        eligible,
        days_remaining: eligible.then(|| window_days - elapsed_days),
        days_overdue: (!eligible).then(|| elapsed_days - window_days),
    })
}
