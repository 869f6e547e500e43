//! Vendor identity extraction.
//!
//! Credentials are issued and verified upstream; by the time a request
//! reaches this service the caller's vendor id travels in the
//! `X-Vendor-Id` header.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use ledger::{Ledger, VendorId};

use crate::error::ApiError;
use crate::state::AppState;

pub const VENDOR_ID_HEADER: &str = "x-vendor-id";

/// The vendor on whose behalf the request is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentVendor(pub VendorId);

impl<L: Ledger + 'static> FromRequestParts<Arc<AppState<L>>> for CurrentVendor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<L>>,
    ) -> Result<Self, Self::Rejection> {
        let vendor_id = parse_vendor_id(parts)?;

        // Unknown vendors get the same answer as a missing header.
        match state.ledger().find_vendor(vendor_id).await? {
            Some(vendor) => Ok(CurrentVendor(vendor.id)),
            None => {
                tracing::debug!(%vendor_id, "request for unknown vendor");
                Err(unauthorized())
            }
        }
    }
}

fn parse_vendor_id(parts: &Parts) -> Result<VendorId, ApiError> {
    parts
        .headers
        .get(VENDOR_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i64>().ok())
        .map(VendorId::new)
        .ok_or_else(unauthorized)
}

fn unauthorized() -> ApiError {
    ApiError::Unauthorized("Vendor authentication required".to_string())
}
