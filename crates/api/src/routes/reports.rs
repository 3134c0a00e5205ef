//! Tabular reporting endpoints (administrative, read-only).

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use domain::{OrderStatus, Sku};
use serde::{Deserialize, Serialize};
use store::{OrderFilter, Store};

use crate::AppState;
use crate::auth::{Authenticated, require_admin};
use crate::error::ApiError;
use crate::routes::orders::OrderResponse;
use crate::routes::products::ProductResponse;

const LOW_STOCK_THRESHOLD: i64 = 5;

#[derive(Serialize)]
pub struct StockReportResponse {
    pub total_products: usize,
    pub low_stock_count: usize,
    pub out_of_stock_count: usize,
    pub products: Vec<ProductResponse>,
    pub low_stock_products: Vec<ProductResponse>,
    pub out_of_stock_products: Vec<ProductResponse>,
}

/// GET /reports/stock — stock levels with low/out-of-stock breakdowns.
#[tracing::instrument(skip(state))]
pub async fn stock<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(claim): Authenticated,
) -> Result<Json<StockReportResponse>, ApiError> {
    require_admin(&claim)?;

    let mut products = state.store.list_products().await?;
    products.sort_by_key(|p| p.stock);

    let low_stock: Vec<_> = products
        .iter()
        .filter(|p| p.stock < LOW_STOCK_THRESHOLD)
        .cloned()
        .collect();
    let out_of_stock: Vec<_> = products.iter().filter(|p| p.stock == 0).cloned().collect();

    Ok(Json(StockReportResponse {
        total_products: products.len(),
        low_stock_count: low_stock.len(),
        out_of_stock_count: out_of_stock.len(),
        products: products.into_iter().map(Into::into).collect(),
        low_stock_products: low_stock.into_iter().map(Into::into).collect(),
        out_of_stock_products: out_of_stock.into_iter().map(Into::into).collect(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct OrdersReportQuery {
    pub status: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct OrdersReportSummary {
    pub total_orders: usize,
    pub pending_orders: usize,
    pub paid_orders: usize,
    pub fulfilled_orders: usize,
    pub cancelled_orders: usize,
    pub total_value: f64,
}

#[derive(Serialize)]
pub struct OrdersReportResponse {
    pub summary: OrdersReportSummary,
    pub orders: Vec<OrderResponse>,
}

/// GET /reports/orders — orders filtered by status and creation range.
#[tracing::instrument(skip(state))]
pub async fn orders<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(claim): Authenticated,
    Query(query): Query<OrdersReportQuery>,
) -> Result<Json<OrdersReportResponse>, ApiError> {
    require_admin(&claim)?;

    let mut filter = OrderFilter::all();
    if let Some(raw) = &query.status {
        let status: OrderStatus = raw
            .parse()
            .map_err(|e: String| ApiError::BadRequest(e))?;
        filter = filter.status(status);
    }
    if let Some(from) = query.from {
        filter = filter.from(from);
    }
    if let Some(to) = query.to {
        filter = filter.to(to);
    }

    let orders = state.store.list_orders(filter).await?;

    let count_of = |status: OrderStatus| orders.iter().filter(|o| o.status == status).count();
    let summary = OrdersReportSummary {
        total_orders: orders.len(),
        pending_orders: count_of(OrderStatus::Pending),
        paid_orders: count_of(OrderStatus::Paid),
        fulfilled_orders: count_of(OrderStatus::Fulfilled),
        cancelled_orders: count_of(OrderStatus::Cancelled),
        total_value: orders
            .iter()
            .map(|o| o.total)
            .sum::<domain::Money>()
            .as_dollars_f64(),
    };

    Ok(Json(OrdersReportResponse {
        summary,
        orders: orders.into_iter().map(Into::into).collect(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SalesSummaryQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct ProductSales {
    pub sku: String,
    pub name: String,
    pub total_qty: u64,
    pub total_revenue: f64,
}

#[derive(Serialize)]
pub struct SalesSummaryResponse {
    pub total_revenue: f64,
    pub total_orders: usize,
    pub top_products: Vec<ProductSales>,
}

/// GET /reports/sales-summary — revenue and best-selling products over a
/// `paid_at` range.
#[tracing::instrument(skip(state))]
pub async fn sales_summary<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(claim): Authenticated,
    Query(query): Query<SalesSummaryQuery>,
) -> Result<Json<SalesSummaryResponse>, ApiError> {
    require_admin(&claim)?;

    let payments = state.store.list_payments(query.from, query.to).await?;
    let total_revenue: domain::Money = payments.iter().map(|p| p.amount).sum();

    let mut sold = Vec::new();
    for status in [OrderStatus::Paid, OrderStatus::Fulfilled] {
        sold.extend(
            state
                .store
                .list_orders(OrderFilter::all().status(status))
                .await?,
        );
    }
    sold.retain(|o| {
        o.paid_at.is_some_and(|paid_at| {
            query.from.is_none_or(|f| paid_at >= f) && query.to.is_none_or(|t| paid_at <= t)
        })
    });

    let mut by_sku: HashMap<Sku, ProductSales> = HashMap::new();
    for order in &sold {
        for item in &order.items {
            let entry = by_sku
                .entry(item.sku.clone())
                .or_insert_with(|| ProductSales {
                    sku: item.sku.to_string(),
                    name: item.name.clone(),
                    total_qty: 0,
                    total_revenue: 0.0,
                });
            entry.total_qty += item.qty as u64;
            entry.total_revenue += item.line_total.as_dollars_f64();
        }
    }
    let mut top_products: Vec<_> = by_sku.into_values().collect();
    top_products.sort_by(|a, b| b.total_revenue.total_cmp(&a.total_revenue));
    top_products.truncate(10);

    Ok(Json(SalesSummaryResponse {
        total_revenue: total_revenue.as_dollars_f64(),
        total_orders: sold.len(),
        top_products,
    }))
}
