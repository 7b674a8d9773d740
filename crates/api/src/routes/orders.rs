//! Order ledger endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::OrderNumber;
use orders::{NewOrderLine, Order};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub user_email: String,
    #[serde(default)]
    pub items: Vec<NewOrderLine>,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlacedResponse {
    pub order_number: OrderNumber,
}

// -- Handlers --

/// POST /api/orders: Place an order.
#[tracing::instrument(skip(state, req))]
pub async fn place(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderPlacedResponse>), ApiError> {
    let order_number = state.ledger.place_order(&req.user_email, req.items).await?;
    Ok((StatusCode::CREATED, Json(OrderPlacedResponse { order_number })))
}

/// GET /api/orders: All orders, or one user's orders with `?email=`.
#[tracing::instrument(skip(state))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let orders = match query.email {
        Some(email) => state.ledger.get_orders_by_user(&email).await?,
        None => state.ledger.get_all_orders().await?,
    };
    Ok(Json(orders))
}

/// GET /api/orders/{orderNumber}
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(order_number): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .ledger
        .get_order_by_number(&OrderNumber::new(order_number))
        .await?;
    Ok(Json(order))
}

/// PATCH /api/orders/{orderNumber}/status?status=X: Overwrite the status.
#[tracing::instrument(skip(state))]
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(order_number): Path<String>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Order>, ApiError> {
    let status = query
        .status
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("status query parameter is required".to_string()))?;

    let order = state
        .ledger
        .update_order_status(&OrderNumber::new(order_number), &status)
        .await?;
    Ok(Json(order))
}
