//! Order lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{Order, Payment};
use engine::ItemRequest;
use serde::{Deserialize, Serialize};
use store::Store;

use crate::AppState;
use crate::auth::Authenticated;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub items: Vec<ItemRequest>,
}

#[derive(Deserialize)]
pub struct PayOrderRequest {
    pub amount: f64,
    pub method: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub order_number: String,
    pub customer_id: String,
    pub status: String,
    pub items: Vec<LineItemResponse>,
    pub total: f64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fulfilled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct LineItemResponse {
    pub sku: String,
    pub name: String,
    pub price: f64,
    pub qty: u32,
    pub line_total: f64,
}

#[derive(Serialize)]
pub struct PaymentResponse {
    pub id: String,
    pub amount: f64,
    pub method: String,
    pub transaction_id: String,
    pub paid_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct PayOrderResponse {
    pub payment: PaymentResponse,
    pub order: OrderResponse,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.to_string(),
            order_number: order.order_number,
            customer_id: order.customer.to_string(),
            status: order.status.to_string(),
            items: order
                .items
                .into_iter()
                .map(|item| LineItemResponse {
                    sku: item.sku.to_string(),
                    name: item.name,
                    price: item.price.as_dollars_f64(),
                    qty: item.qty,
                    line_total: item.line_total.as_dollars_f64(),
                })
                .collect(),
            total: order.total.as_dollars_f64(),
            created_at: order.created_at,
            paid_at: order.paid_at,
            fulfilled_at: order.fulfilled_at,
            cancelled_at: order.cancelled_at,
        }
    }
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id.to_string(),
            amount: payment.amount.as_dollars_f64(),
            method: payment.method.to_string(),
            transaction_id: payment.transaction_id,
            paid_at: payment.paid_at,
        }
    }
}

fn parse_order_id(raw: &str) -> Result<OrderId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid order id: {raw}")))
}

// -- Handlers --

/// POST /orders — place an order for the authenticated customer.
#[tracing::instrument(skip(state, req))]
pub async fn place<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(claim): Authenticated,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order = state.engine.place_order(&claim, &req.items).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /orders — list orders; admins see all, customers their own.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(claim): Authenticated,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.engine.list_orders(&claim).await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

/// GET /orders/{id} — ownership-checked point read.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(claim): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.engine.get_order(&claim, parse_order_id(&id)?).await?;
    Ok(Json(order.into()))
}

/// POST /orders/{id}/pay — record a payment and mark the order paid.
#[tracing::instrument(skip(state, req))]
pub async fn pay<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(claim): Authenticated,
    Path(id): Path<String>,
    Json(req): Json<PayOrderRequest>,
) -> Result<Json<PayOrderResponse>, ApiError> {
    let (payment, order) = state
        .engine
        .pay_order(&claim, parse_order_id(&id)?, req.amount, &req.method)
        .await?;
    Ok(Json(PayOrderResponse {
        payment: payment.into(),
        order: order.into(),
    }))
}

/// POST /orders/{id}/fulfill — mark a paid order fulfilled (admin only).
#[tracing::instrument(skip(state))]
pub async fn fulfill<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(claim): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .engine
        .fulfill_order(&claim, parse_order_id(&id)?)
        .await?;
    Ok(Json(order.into()))
}

/// POST /orders/{id}/cancel — cancel an order and restore its stock.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(claim): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .engine
        .cancel_order(&claim, parse_order_id(&id)?)
        .await?;
    Ok(Json(order.into()))
}
