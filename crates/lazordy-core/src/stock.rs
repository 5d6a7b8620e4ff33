//! # Stock Movement Rules
//!
//! The pure half of the stock ledger: which deltas are allowed for which
//! movement kind, and what a delta does to an on-hand quantity. The database
//! layer enforces the same rule atomically with a conditional `UPDATE`.
//!
//! ## Sign Rules
//! ```text
//! ┌──────────────┬──────────────────────────────┐
//! │ kind         │ allowed delta                │
//! ├──────────────┼──────────────────────────────┤
//! │ restock      │ > 0                          │
//! │ sale         │ < 0                          │
//! │ adjustment   │ != 0                         │
//! └──────────────┴──────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{StockLedgerEntry, StockMovementKind};
use crate::MAX_STOCK_DELTA;

/// Checks that `delta` is allowed for `kind`.
pub fn validate_movement(kind: StockMovementKind, delta: i64) -> CoreResult<()> {
    if delta.unsigned_abs() > MAX_STOCK_DELTA.unsigned_abs() {
        return Err(ValidationError::OutOfRange {
            field: "delta".to_string(),
            min: -MAX_STOCK_DELTA,
            max: MAX_STOCK_DELTA,
        }
        .into());
    }

    let reason = match kind {
        _ if delta == 0 => "must not be zero",
        StockMovementKind::Restock if delta < 0 => "restock must add stock",
        StockMovementKind::Sale if delta > 0 => "sale must remove stock",
        _ => return Ok(()),
    };

    Err(ValidationError::InvalidFormat {
        field: "delta".to_string(),
        reason: reason.to_string(),
    }
    .into())
}

/// Applies `delta` to `available`, returning the new quantity.
///
/// ```rust
/// use lazordy_core::stock::apply_delta;
///
/// assert_eq!(apply_delta("RING-1", 10, -3).unwrap(), 7);
/// assert!(apply_delta("RING-1", 2, -3).is_err());
/// ```
pub fn apply_delta(product: &str, available: i64, delta: i64) -> CoreResult<i64> {
    let next = available.saturating_add(delta);
    if next < 0 {
        return Err(CoreError::InsufficientStock {
            product: product.to_string(),
            available,
            requested: delta.saturating_neg(),
        });
    }
    Ok(next)
}

/// Dry-run check that `quantity` units can leave stock.
pub fn check_available(product: &str, available: i64, quantity: i64) -> CoreResult<()> {
    apply_delta(product, available, -quantity).map(|_| ())
}

/// The offsetting delta that undoes `entry`.
#[inline]
pub fn reversal_delta(entry: &StockLedgerEntry) -> i64 {
    -entry.delta
}

/// The stock movement for changing a product line from `old` to `new`
/// units. Growing the line sells more stock, shrinking it returns stock.
///
/// ```rust
/// use lazordy_core::stock::line_quantity_movement;
/// use lazordy_core::StockMovementKind;
///
/// assert_eq!(line_quantity_movement(2, 5), Some((-3, StockMovementKind::Sale)));
/// assert_eq!(line_quantity_movement(5, 2), Some((3, StockMovementKind::Adjustment)));
/// assert_eq!(line_quantity_movement(4, 4), None);
/// ```
pub fn line_quantity_movement(old: i64, new: i64) -> Option<(i64, StockMovementKind)> {
    let change = new - old;
    if change > 0 {
        Some((-change, StockMovementKind::Sale))
    } else if change < 0 {
        Some((-change, StockMovementKind::Adjustment))
    } else {
        None
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sign_rules() {
        assert!(validate_movement(StockMovementKind::Restock, 5).is_ok());
        assert!(validate_movement(StockMovementKind::Restock, -5).is_err());
        assert!(validate_movement(StockMovementKind::Sale, -5).is_ok());
        assert!(validate_movement(StockMovementKind::Sale, 5).is_err());
        assert!(validate_movement(StockMovementKind::Adjustment, 5).is_ok());
        assert!(validate_movement(StockMovementKind::Adjustment, -5).is_ok());
        assert!(validate_movement(StockMovementKind::Restock, MAX_STOCK_DELTA).is_ok());
        assert!(validate_movement(StockMovementKind::Restock, MAX_STOCK_DELTA + 1).is_err());
        assert!(validate_movement(StockMovementKind::Adjustment, i64::MIN).is_err());
        assert!(apply_delta("RING-1", 3, i64::MIN).is_err());

        for kind in [
            StockMovementKind::Restock,
            StockMovementKind::Sale,
            StockMovementKind::Adjustment,
        ] {
            assert!(matches!(
                validate_movement(kind, 0),
                Err(CoreError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_ledger_scenario() {
        // 10 on hand, sell 3, sell 2, return 3
        let q = apply_delta("RING-1", 10, -3).unwrap();
        assert_eq!(q, 7);
        let q = apply_delta("RING-1", q, -2).unwrap();
        assert_eq!(q, 5);
        let q = apply_delta("RING-1", q, 3).unwrap();
        assert_eq!(q, 8);
    }

    #[test]
    fn test_insufficient_stock_reports_levels() {
        let err = apply_delta("RING-1", 2, -5).unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientStock {
                product: "RING-1".to_string(),
                available: 2,
                requested: 5,
            }
        );
        assert!(check_available("RING-1", 5, 5).is_ok());
        assert!(check_available("RING-1", 4, 5).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: applying any sequence of deltas, keeping only the ones
        /// that succeed, never drives the quantity below zero, and every
        /// rejected delta leaves the quantity untouched.
        #[test]
        fn quantity_never_negative(
            start in 0i64..50,
            deltas in prop::collection::vec(-20i64..20, 0..50)
        ) {
            let mut quantity = start;
            for delta in deltas {
                match apply_delta("P", quantity, delta) {
                    Ok(next) => {
                        prop_assert_eq!(next, quantity + delta);
                        quantity = next;
                    }
                    Err(CoreError::InsufficientStock { available, requested, .. }) => {
                        prop_assert_eq!(available, quantity);
                        prop_assert!(requested > available);
                    }
                    Err(other) => prop_assert!(false, "unexpected error {other}"),
                }
                prop_assert!(quantity >= 0);
            }
        }

        /// Property: a line quantity change followed by its inverse nets to zero stock.
        #[test]
        fn line_movements_are_symmetric(old in 1i64..100, new in 1i64..100) {
            let forward = line_quantity_movement(old, new).map(|(d, _)| d).unwrap_or(0);
            let back = line_quantity_movement(new, old).map(|(d, _)| d).unwrap_or(0);
            prop_assert_eq!(forward + back, 0);
            prop_assert_eq!(forward, old - new);
        }
    }
}
