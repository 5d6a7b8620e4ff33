//! # Invoice Totals Calculator
//!
//! Derives an invoice's money fields and status from its line items.
//!
//! ## Calculation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lines ──► subtotal = Σ quantity × unit_price                          │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │            total = max(0, subtotal - discount - manager_discount)      │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │            paid = min(amount_paid, total)                              │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │            remaining = total - paid                                    │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │            status (unless sticky)                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The function is pure: the same inputs always give the same result, and
//! feeding a result back in as `current` changes nothing.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{InvoiceLineItem, InvoiceStatus, StatusSource};

// =============================================================================
// Inputs
// =============================================================================

/// The part of a line item the calculator needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmount {
    pub quantity: i64,
    pub unit_price: Money,
}

impl LineAmount {
    pub const fn new(quantity: i64, unit_price: Money) -> Self {
        LineAmount {
            quantity,
            unit_price,
        }
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

impl From<&InvoiceLineItem> for LineAmount {
    fn from(item: &InvoiceLineItem) -> Self {
        LineAmount::new(item.quantity, item.unit_price())
    }
}

/// A status together with where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StatusState {
    pub status: InvoiceStatus,
    pub source: StatusSource,
}

impl StatusState {
    pub const fn derived(status: InvoiceStatus) -> Self {
        StatusState {
            status,
            source: StatusSource::Derived,
        }
    }

    pub const fn manual(status: InvoiceStatus) -> Self {
        StatusState {
            status,
            source: StatusSource::Manual,
        }
    }

    /// Sticky statuses are never re-derived: `Cancelled` always, `Paid` only
    /// after an explicit settlement.
    pub fn is_sticky(&self) -> bool {
        match self.status {
            InvoiceStatus::Cancelled => true,
            InvoiceStatus::Paid => self.source == StatusSource::Manual,
            _ => false,
        }
    }
}

// =============================================================================
// Output
// =============================================================================

/// Everything derived from an invoice's lines and payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub manager_discount: Money,
    pub total: Money,
    /// Clamped to `total`.
    pub amount_paid: Money,
    pub amount_remaining: Money,
    pub status: StatusState,
}

// =============================================================================
// Calculator
// =============================================================================

/// Recomputes an invoice's totals and status.
///
/// ## Status Rules (first match wins)
/// ```text
/// sticky current status        → keep it
/// remaining <= 0               → paid (derived, also for a zero total)
/// paid > 0                     → uncompleted
/// otherwise                    → draft
/// ```
///
/// ## Example
/// ```rust
/// use lazordy_core::money::Money;
/// use lazordy_core::totals::{calculate_totals, LineAmount, StatusState};
/// use lazordy_core::InvoiceStatus;
///
/// let lines = [LineAmount::new(1, Money::from_cents(10000))];
/// let totals = calculate_totals(
///     &lines,
///     Money::from_cents(2000),
///     Money::from_cents(1000),
///     Money::from_cents(5000),
///     StatusState::derived(InvoiceStatus::Draft),
/// );
///
/// assert_eq!(totals.total.cents(), 7000);
/// assert_eq!(totals.amount_remaining.cents(), 2000);
/// assert_eq!(totals.status.status, InvoiceStatus::Uncompleted);
/// ```
pub fn calculate_totals(
    lines: &[LineAmount],
    discount: Money,
    manager_discount: Money,
    amount_paid: Money,
    current: StatusState,
) -> InvoiceTotals {
    let subtotal: Money = lines.iter().map(LineAmount::subtotal).sum();
    let total = (subtotal - discount - manager_discount).non_negative();
    let amount_paid = amount_paid.non_negative().min(total);
    let amount_remaining = total - amount_paid;

    let status = if current.is_sticky() {
        current
    } else {
        StatusState::derived(derive_status(amount_paid, amount_remaining))
    };

    InvoiceTotals {
        subtotal,
        discount,
        manager_discount,
        total,
        amount_paid,
        amount_remaining,
        status,
    }
}

fn derive_status(paid: Money, remaining: Money) -> InvoiceStatus {
    if !remaining.is_positive() {
        InvoiceStatus::Paid
    } else if paid.is_positive() {
        InvoiceStatus::Uncompleted
    } else {
        InvoiceStatus::Draft
    }
}

/// Applies an explicit settlement to freshly computed totals.
///
/// When nothing remains on a non-empty invoice the status becomes a sticky
/// manual `Paid`. Otherwise the derived status stands.
pub fn settle(totals: InvoiceTotals) -> InvoiceTotals {
    if totals.status.is_sticky() || totals.total.is_zero() || totals.amount_remaining.is_positive()
    {
        return totals;
    }

    InvoiceTotals {
        status: StatusState::manual(InvoiceStatus::Paid),
        ..totals
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
