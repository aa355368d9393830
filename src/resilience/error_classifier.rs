//! # Scan Error Classification
//!
//! Decides how the range scanner recovers from a failed log query.
//!
//! Categories are checked in a fixed priority order. A structured
//! [`LedgerErrorKind`] decides directly; [`LedgerErrorKind::Other`] falls back
//! to keyword matching on the lower-cased message, using the same priority:
//!
//! 1. transient (timeout, deadline, connection)
//! 2. rate limited (rate, 429, too many requests)
//! 3. range too large (range, limit, 422, block, 10000)
//! 4. anything else

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ledger::{LedgerError, LedgerErrorKind};

const TRANSIENT_PATTERNS: &[&str] = &["timeout", "deadline", "connection"];
const RATE_LIMIT_PATTERNS: &[&str] = &["rate", "429", "too many requests"];
const RANGE_PATTERNS: &[&str] = &["range", "limit", "422", "block", "10000"];

/// Recovery tier for a failed sub-range query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanErrorCategory {
    /// Retry the same sub-range indefinitely after a fixed backoff
    Transient,

    /// Double the pacing delay, then retry
    RateLimited,

    /// Halve the chunk size, then retry
    RangeTooLarge,

    /// Bounded retry, then skip the sub-range
    Other,
}

impl fmt::Display for ScanErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanErrorCategory::Transient => write!(f, "Transient"),
            ScanErrorCategory::RateLimited => write!(f, "Rate Limited"),
            ScanErrorCategory::RangeTooLarge => write!(f, "Range Too Large"),
            ScanErrorCategory::Other => write!(f, "Other"),
        }
    }
}

pub fn classify_scan_error(error: &LedgerError) -> ScanErrorCategory {
    match error.kind {
        LedgerErrorKind::Timeout | LedgerErrorKind::Network => ScanErrorCategory::Transient,
        LedgerErrorKind::RateLimited => ScanErrorCategory::RateLimited,
        LedgerErrorKind::RangeTooLarge => ScanErrorCategory::RangeTooLarge,
        LedgerErrorKind::Other => classify_message(&error.message),
        LedgerErrorKind::Reverted | LedgerErrorKind::Decode | LedgerErrorKind::Signing => {
            ScanErrorCategory::Other
        }
    }
}

fn classify_message(message: &str) -> ScanErrorCategory {
    let message = message.to_lowercase();
    let matches = |patterns: &[&str]| patterns.iter().any(|p| message.contains(p));

    if matches(TRANSIENT_PATTERNS) {
        ScanErrorCategory::Transient
    } else if matches(RATE_LIMIT_PATTERNS) {
        ScanErrorCategory::RateLimited
    } else if matches(RANGE_PATTERNS) {
        ScanErrorCategory::RangeTooLarge
    } else {
        ScanErrorCategory::Other
    }
}
