//! # Invoice Numbering
//!
//! Pure formatting and parsing for invoice numbers. Reservation of the next
//! sequence value is a database concern and lives in `lazordy-db`.
//!
//! ## Format
//! ```text
//!   LZR - 2026 - 10 - 0042
//!   ─┬─   ─┬──   ┬─   ─┬──
//!    │     │     │     └── sequence, 1-based, reset every calendar month
//!    │     │     └──────── month (UTC), two digits
//!    │     └────────────── year (UTC), four digits
//!    └──────────────────── configurable prefix
//!
//!   Fallback after repeated collisions:
//!   LZR-2026-10-0042-FIX-20261019143005-a3f9
//! ```

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::ValidationError;

// =============================================================================
// Period
// =============================================================================

/// A calendar month in UTC. Sequences restart at 1 in every period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoicePeriod {
    pub year: i32,
    pub month: u32,
}

impl InvoicePeriod {
    /// Builds a period, rejecting months outside 1..=12 and years that do
    /// not print as four digits.
    pub fn new(year: i32, month: u32) -> Result<Self, ValidationError> {
        if !(1..=12).contains(&month) {
            return Err(ValidationError::OutOfRange {
                field: "month".to_string(),
                min: 1,
                max: 12,
            });
        }
        if !(1000..=9999).contains(&year) {
            return Err(ValidationError::OutOfRange {
                field: "year".to_string(),
                min: 1000,
                max: 9999,
            });
        }
        Ok(InvoicePeriod { year, month })
    }

    /// The period containing `at`.
    pub fn containing(at: DateTime<Utc>) -> Self {
        InvoicePeriod {
            year: at.year(),
            month: at.month(),
        }
    }

    /// Storage key, `YYYY-MM`.
    pub fn key(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    /// Every number in this period starts with this string.
    pub fn number_base(&self, prefix: &str) -> String {
        format!("{}-{:04}-{:02}-", prefix, self.year, self.month)
    }
}

impl fmt::Display for InvoicePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for InvoicePeriod {
    type Err = ValidationError;

    /// Parses `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidFormat {
            field: "period".to_string(),
            reason: "expected YYYY-MM".to_string(),
        };

        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        InvoicePeriod::new(year, month)
    }
}

// =============================================================================
// Invoice Number
// =============================================================================

/// A parsed regular invoice number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceNumber {
    pub prefix: String,
    pub period: InvoicePeriod,
    pub sequence: u32,
}

impl InvoiceNumber {
    pub fn new(prefix: impl Into<String>, period: InvoicePeriod, sequence: u32) -> Self {
        InvoiceNumber {
            prefix: prefix.into(),
            period,
            sequence,
        }
    }

    /// Parses a regular number with the given prefix. Fallback (`-FIX-`)
    /// numbers and other prefixes return `None`.
    ///
    /// ```rust
    /// use lazordy_core::numbering::InvoiceNumber;
    ///
    /// let n = InvoiceNumber::parse("LZR-2026-10-0042", "LZR").unwrap();
    /// assert_eq!(n.sequence, 42);
    /// assert!(InvoiceNumber::parse("LZR-2026-10-0042-FIX-20261019143005-a3f9", "LZR").is_none());
    /// ```
    pub fn parse(s: &str, prefix: &str) -> Option<Self> {
        let rest = s.strip_prefix(prefix)?.strip_prefix('-')?;
        let mut parts = rest.split('-');
        let year = parts.next()?;
        let month = parts.next()?;
        let seq = parts.next()?;
        if parts.next().is_some() || year.len() != 4 || month.len() != 2 || seq.len() < 4 {
            return None;
        }
        if !seq.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let period = InvoicePeriod::new(year.parse().ok()?, month.parse().ok()?).ok()?;
        let sequence = seq.parse().ok()?;
        if sequence == 0 {
            return None;
        }
        Some(InvoiceNumber::new(prefix, period, sequence))
    }
}

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:04}", self.period.number_base(&self.prefix), self.sequence)
    }
}

// =============================================================================
// Fallback
// =============================================================================

/// Builds the collision fallback `<base>-FIX-<YYYYMMDDHHMMSS>-<4 hex>`.
///
/// The caller supplies the timestamp and the random source so this stays
/// deterministic under test.
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use lazordy_core::numbering::fallback_number;
/// use uuid::Uuid;
///
/// let at = Utc.with_ymd_and_hms(2026, 10, 19, 14, 30, 5).unwrap();
/// let salt = Uuid::parse_str("a3f90000-0000-4000-8000-000000000000").unwrap();
/// assert_eq!(
///     fallback_number("LZR-2026-10-0042", at, salt),
///     "LZR-2026-10-0042-FIX-20261019143005-a3f9"
/// );
/// ```
pub fn fallback_number(base: &str, at: DateTime<Utc>, salt: Uuid) -> String {
    let hex = salt.simple().to_string();
    format!("{}-FIX-{}-{}", base, at.format("%Y%m%d%H%M%S"), &hex[..4])
}

// =============================================================================
// Unit Tests
// =============================================================================
