//! Vendor inventory endpoints.
//!
//! Every route acts on the calling vendor's own rows. Price and stock edits
//! go through the ledger, which locks the row the same way a reservation
//! does.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, SecondsFormat, Utc};
use ledger::{InventoryRecord, Ledger, MAX_STOCK, Money, ProductId, VendorProduct};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;
use crate::vendor::CurrentVendor;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    pub product_id: i64,
    pub price_cents: i64,
    pub stock: i64,
}

#[derive(Debug, Deserialize)]
pub struct PriceUpdateRequest {
    pub price_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct StockUpdateRequest {
    pub stock: i64,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct VendorProductResponse {
    pub product_id: ProductId,
    pub product_code: String,
    pub name: String,
    pub price_cents: i64,
    pub stock: u32,
    pub updated_at: String,
}

impl From<VendorProduct> for VendorProductResponse {
    fn from(row: VendorProduct) -> Self {
        Self {
            product_id: row.record.product_id,
            product_code: row.product.code,
            name: row.product.name,
            price_cents: row.record.price.cents(),
            stock: row.record.stock,
            updated_at: timestamp(row.record.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EnrollmentResponse {
    pub product_id: ProductId,
    pub price_cents: i64,
    pub stock: u32,
    pub updated_at: String,
}

impl From<InventoryRecord> for EnrollmentResponse {
    fn from(record: InventoryRecord) -> Self {
        Self {
            product_id: record.product_id,
            price_cents: record.price.cents(),
            stock: record.stock,
            updated_at: timestamp(record.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PriceUpdateResponse {
    pub product_id: ProductId,
    pub old_price_cents: i64,
    pub new_price_cents: i64,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct StockUpdateResponse {
    pub product_id: ProductId,
    pub old_stock: u32,
    pub new_stock: u32,
    pub updated_at: String,
}

// -- Handlers --

/// GET /vendors/me/products
#[tracing::instrument(skip(state))]
pub async fn list<L: Ledger + 'static>(
    State(state): State<Arc<AppState<L>>>,
    CurrentVendor(vendor_id): CurrentVendor,
) -> Result<Json<Vec<VendorProductResponse>>, ApiError> {
    let rows = state.ledger().list_vendor_records(vendor_id).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// POST /vendors/me/products: start selling a catalog product.
#[tracing::instrument(skip(state, req))]
pub async fn enroll<L: Ledger + 'static>(
    State(state): State<Arc<AppState<L>>>,
    CurrentVendor(vendor_id): CurrentVendor,
    Json(req): Json<EnrollRequest>,
) -> Result<(StatusCode, Json<EnrollmentResponse>), ApiError> {
    let stock = parse_stock(req.stock)?;
    let record = state
        .ledger()
        .enroll(
            vendor_id,
            ProductId::new(req.product_id),
            Money::from_cents(req.price_cents),
            stock,
        )
        .await?;

    metrics::counter!("vendor_inventory_changes_total", "change" => "enroll").increment(1);
    tracing::info!(%vendor_id, product_id = req.product_id, stock, "product enrolled");

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// PUT /vendors/me/products/{product_id}/price
#[tracing::instrument(skip(state, req))]
pub async fn update_price<L: Ledger + 'static>(
    State(state): State<Arc<AppState<L>>>,
    CurrentVendor(vendor_id): CurrentVendor,
    Path(product_id): Path<i64>,
    Json(req): Json<PriceUpdateRequest>,
) -> Result<Json<PriceUpdateResponse>, ApiError> {
    let change = state
        .ledger()
        .update_price(
            vendor_id,
            ProductId::new(product_id),
            Money::from_cents(req.price_cents),
        )
        .await?;

    metrics::counter!("vendor_inventory_changes_total", "change" => "price").increment(1);
    tracing::info!(
        %vendor_id,
        product_id,
        old_price = %change.old_price,
        new_price = %change.record.price,
        "price updated"
    );

    Ok(Json(PriceUpdateResponse {
        product_id: change.record.product_id,
        old_price_cents: change.old_price.cents(),
        new_price_cents: change.record.price.cents(),
        updated_at: timestamp(change.record.updated_at),
    }))
}

/// PUT /vendors/me/products/{product_id}/stock
#[tracing::instrument(skip(state, req))]
pub async fn update_stock<L: Ledger + 'static>(
    State(state): State<Arc<AppState<L>>>,
    CurrentVendor(vendor_id): CurrentVendor,
    Path(product_id): Path<i64>,
    Json(req): Json<StockUpdateRequest>,
) -> Result<Json<StockUpdateResponse>, ApiError> {
    let stock = parse_stock(req.stock)?;
    let change = state
        .ledger()
        .update_stock(vendor_id, ProductId::new(product_id), stock)
        .await?;

    metrics::counter!("vendor_inventory_changes_total", "change" => "stock").increment(1);
    tracing::info!(
        %vendor_id,
        product_id,
        old_stock = change.old_stock,
        new_stock = change.record.stock,
        "stock updated"
    );

    Ok(Json(StockUpdateResponse {
        product_id: change.record.product_id,
        old_stock: change.old_stock,
        new_stock: change.record.stock,
        updated_at: timestamp(change.record.updated_at),
    }))
}

/// DELETE /vendors/me/products/{product_id}
#[tracing::instrument(skip(state))]
pub async fn unenroll<L: Ledger + 'static>(
    State(state): State<Arc<AppState<L>>>,
    CurrentVendor(vendor_id): CurrentVendor,
    Path(product_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .ledger()
        .unenroll(vendor_id, ProductId::new(product_id))
        .await?;

    metrics::counter!("vendor_inventory_changes_total", "change" => "unenroll").increment(1);
    tracing::info!(%vendor_id, product_id, "product unenrolled");

    Ok(StatusCode::NO_CONTENT)
}

fn parse_stock(stock: i64) -> Result<u32, ApiError> {
    u32::try_from(stock)
        .ok()
        .filter(|stock| *stock <= MAX_STOCK)
        .ok_or_else(|| ApiError::BadRequest(format!("stock must be between 0 and {MAX_STOCK}")))
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
