//! Order placement and vendor order lookup endpoints.

use std::sync::Arc;

use allocation::OrderResult;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::SecondsFormat;
use ledger::{Ledger, Order, OrderId, OrderStatus, ProductId, VendorId};
use serde::{Deserialize, Serialize};

use crate::config::ResponseProfile;
use crate::error::ApiError;
use crate::state::AppState;
use crate::vendor::CurrentVendor;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub product_id: i64,
    pub quantity: i64,
}

// -- Response types --

/// Order as returned to callers.
///
/// The optional fields are only present under the detailed response profile.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub allocated_to: VendorId,
    pub status: OrderStatus,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price_cents: Option<i64>,
}

impl OrderResponse {
    fn compact(order: &Order) -> Self {
        Self {
            order_id: order.id,
            product_id: order.product_id,
            quantity: order.quantity,
            allocated_to: order.allocated_vendor_id,
            status: order.status,
            created_at: order.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            product_name: None,
            vendor_name: None,
            unit_price_cents: None,
            total_price_cents: None,
        }
    }

    fn detailed(result: OrderResult) -> Self {
        Self {
            product_name: Some(result.product_name),
            vendor_name: Some(result.order.vendor_name.clone()),
            unit_price_cents: Some(result.unit_price.cents()),
            total_price_cents: Some(result.total_price.cents()),
            ..Self::compact(&result.order)
        }
    }

    pub fn render(result: OrderResult, profile: ResponseProfile) -> Self {
        match profile {
            ResponseProfile::Compact => Self::compact(&result.order),
            ResponseProfile::Detailed => Self::detailed(result),
        }
    }
}

// -- Handlers --

/// POST /orders: allocate an order to a single vendor.
#[tracing::instrument(skip(state, req))]
pub async fn create<L: Ledger + 'static>(
    State(state): State<Arc<AppState<L>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let quantity = parse_quantity(req.quantity)?;

    let result = state
        .orchestrator
        .create_order(ProductId::new(req.product_id), quantity)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse::render(result, state.profile)),
    ))
}

/// GET /orders: orders allocated to the calling vendor, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<L: Ledger + 'static>(
    State(state): State<Arc<AppState<L>>>,
    CurrentVendor(vendor_id): CurrentVendor,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.orchestrator.list_orders(vendor_id).await?;
    Ok(Json(render_orders(&state, orders).await?))
}

/// GET /orders/{id}: a single order allocated to the calling vendor.
#[tracing::instrument(skip(state))]
pub async fn get<L: Ledger + 'static>(
    State(state): State<Arc<AppState<L>>>,
    CurrentVendor(vendor_id): CurrentVendor,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.orchestrator.get_order(order_id, vendor_id).await?;

    let response = match state.profile {
        ResponseProfile::Compact => OrderResponse::compact(&order),
        ResponseProfile::Detailed => {
            OrderResponse::detailed(state.orchestrator.describe_order(order).await?)
        }
    };
    Ok(Json(response))
}

async fn render_orders<L: Ledger>(
    state: &AppState<L>,
    orders: Vec<Order>,
) -> Result<Vec<OrderResponse>, ApiError> {
    match state.profile {
        ResponseProfile::Compact => Ok(orders.iter().map(OrderResponse::compact).collect()),
        ResponseProfile::Detailed => Ok(state
            .orchestrator
            .describe_orders(orders)
            .await?
            .into_iter()
            .map(OrderResponse::detailed)
            .collect()),
    }
}

fn parse_quantity(quantity: i64) -> Result<u32, ApiError> {
    if quantity <= 0 {
        return Err(ApiError::BadRequest(
            "quantity must be greater than zero".to_string(),
        ));
    }
    u32::try_from(quantity)
        .map_err(|_| ApiError::BadRequest(format!("quantity {quantity} is too large")))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ledger::Money;

    fn sample_result() -> OrderResult {
        let order = Order {
            id: OrderId::new(),
            product_id: ProductId::new(1),
            quantity: 3,
            allocated_vendor_id: VendorId::new(2),
            status: OrderStatus::Allocated,
            unit_price: Money::from_cents(4500),
            vendor_name: "Vendor-2".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        };
        OrderResult::new(order, "Widget")
    }

    #[test]
    fn compact_profile_omits_pricing() {
        let json =
            serde_json::to_value(OrderResponse::render(sample_result(), ResponseProfile::Compact))
                .unwrap();

        assert_eq!(json["allocated_to"], 2);
        assert_eq!(json["status"], "ALLOCATED");
        assert_eq!(json["created_at"], "2024-05-01T12:00:00.000Z");
        assert!(json.get("product_name").is_none());
        assert!(json.get("total_price_cents").is_none());
    }

    #[test]
    fn detailed_profile_includes_snapshot_pricing() {
        let json =
            serde_json::to_value(OrderResponse::render(sample_result(), ResponseProfile::Detailed))
                .unwrap();

        assert_eq!(json["product_name"], "Widget");
        assert_eq!(json["vendor_name"], "Vendor-2");
        assert_eq!(json["unit_price_cents"], 4500);
        assert_eq!(json["total_price_cents"], 13_500);
    }

    #[test]
    fn quantity_must_be_positive_and_fit() {
        assert!(matches!(parse_quantity(0), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_quantity(-4), Err(ApiError::BadRequest(_))));
        assert!(matches!(
            parse_quantity(i64::from(u32::MAX) + 1),
            Err(ApiError::BadRequest(_))
        ));
        assert_eq!(parse_quantity(7).unwrap(), 7);
    }
}
