//! # Error Types
//!
//! Domain-specific error types for lazordy-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  lazordy-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  lazordy-db errors (separate crate)                                    │
//! │  └── DbError          - Database failures, wraps CoreError             │
//! │                                                                         │
//! │  back-office errors                                                    │
//! │  └── ApiError         - What the caller sees (code + message)          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Caller       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant is recoverable at the caller boundary. None of them should
//! take the process down.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Product cannot be found (or was soft-deleted).
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Invoice cannot be found.
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    /// Line item does not exist on the given invoice.
    #[error("Line item {item_id} not found on invoice {invoice_id}")]
    LineItemNotFound { invoice_id: String, item_id: String },

    /// Outgoing stock movement exceeds what is on hand.
    ///
    /// ## User Workflow
    /// ```text
    /// Add line item (qty: 5)
    ///      │
    ///      ▼
    /// Stock ledger: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "CH-0042", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// UI shows: "Only 3 CH-0042 in stock"
    /// ```
    /// Never partially applied: the product quantity is left untouched.
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// A line item's product/price/name combination is not acceptable.
    #[error("Invalid line item: {reason}")]
    InvalidLineItem { reason: String },

    /// The sequence allocator kept colliding and handed out a fallback number.
    ///
    /// This is a warning value, not a failure: the caller still receives
    /// `fallback` as the invoice number.
    #[error("Invoice number {attempted} collided after {attempts} attempts; issued {fallback}")]
    DuplicateInvoiceNumber {
        attempted: String,
        fallback: String,
        attempts: u32,
    },

    /// An optimistic version check failed or the row was locked by a
    /// concurrent writer. The caller retries the whole operation.
    #[error("{entity} {id} was modified concurrently, retry the operation")]
    ConcurrentModification { entity: String, id: String },

    /// Invoice is in a status that does not allow the operation.
    #[error("Invoice {invoice_id} is {status}, cannot perform operation")]
    InvalidInvoiceStatus { invoice_id: String, status: String },

    /// A ledger entry can be reversed once.
    #[error("Stock ledger entry {0} has already been reversed")]
    AlreadyReversed(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Shorthand for [`CoreError::InvalidLineItem`].
    pub fn invalid_line_item(reason: impl Into<String>) -> Self {
        CoreError::InvalidLineItem {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`CoreError::ConcurrentModification`].
    pub fn concurrent(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::ConcurrentModification {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when input doesn't meet requirements and are raised before
/// any business logic or storage work starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, malformed invoice number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product: "CH-0042".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for CH-0042: available 3, requested 5"
        );

        let err = CoreError::invalid_line_item("custom items need a price");
        assert_eq!(err.to_string(), "Invalid line item: custom items need a price");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "item_code".to_string(),
        };
        assert_eq!(err.to_string(), "item_code is required");

        let err = ValidationError::MustNotBeNegative {
            field: "discount".to_string(),
        };
        assert_eq!(err.to_string(), "discount must not be negative");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
