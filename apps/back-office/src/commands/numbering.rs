//! # Invoice Numbering Commands

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::DbState;
use lazordy_core::InvoicePeriod;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocatedNumber {
    pub number: String,
    /// Set when every attempt collided and a `-FIX-` number was issued.
    pub warning: Option<String>,
}

/// Reserves the next invoice number for `period` ("YYYY-MM"), or for the
/// current month when `period` is `None`.
///
/// The number is reserved, not attached to an invoice. Unused numbers leave
/// a gap; they are never handed out again.
pub async fn allocate_invoice_number(
    db: &DbState,
    period: Option<&str>,
) -> Result<AllocatedNumber, ApiError> {
    let period = match period {
        Some(key) => key.trim().parse::<InvoicePeriod>()?,
        None => InvoicePeriod::containing(Utc::now()),
    };
    debug!(period = %period, "allocate_invoice_number command");

    let allocation = db.inner().sequences().allocate(period).await?;
    let warning = allocation.warning.map(|w| {
        warn!(number = %allocation.number, "Fallback invoice number issued");
        w.to_string()
    });

    Ok(AllocatedNumber {
        number: allocation.number,
        warning,
    })
}
