//! Catalog maintenance endpoints (administrative, outside the order core).

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{Money, Product, ProductUpdate, Sku};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::AppState;
use crate::auth::{Authenticated, require_admin};
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub stock: i64,
}

#[derive(Deserialize, Default)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
}

#[derive(Serialize)]
pub struct ProductResponse {
    pub sku: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: i64,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            sku: product.sku.to_string(),
            name: product.name,
            description: product.description,
            price: product.price.as_dollars_f64(),
            stock: product.stock,
        }
    }
}

fn parse_price(price: f64) -> Result<Money, ApiError> {
    if !price.is_finite() || price < 0.0 {
        return Err(ApiError::BadRequest(
            "Price must be a non-negative number".to_string(),
        ));
    }
    Ok(Money::from_dollars_f64(price))
}

/// POST /products — create a product (admin only).
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(claim): Authenticated,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    require_admin(&claim)?;

    let sku = Sku::new(&req.sku);
    if sku.is_empty() {
        return Err(ApiError::BadRequest("SKU is required".to_string()));
    }
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Product name is required".to_string()));
    }
    if req.stock < 0 {
        return Err(ApiError::BadRequest(
            "Stock must be a non-negative integer".to_string(),
        ));
    }
    let price = parse_price(req.price)?;

    let product = state
        .store
        .insert_product(Product {
            sku,
            name: req.name.trim().to_string(),
            description: req.description,
            price,
            stock: req.stock,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(product.into())))
}

/// GET /products — list the catalog (public).
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state.store.list_products().await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

/// PUT /products/{sku} — partial update (admin only).
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(claim): Authenticated,
    Path(sku): Path<String>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    require_admin(&claim)?;

    if req.stock.is_some_and(|stock| stock < 0) {
        return Err(ApiError::BadRequest(
            "Stock must be a non-negative integer".to_string(),
        ));
    }
    let update = ProductUpdate {
        name: req.name,
        description: req.description,
        price: req.price.map(parse_price).transpose()?,
        stock: req.stock,
    };

    let product = state.store.update_product(&Sku::new(&sku), update).await?;
    Ok(Json(product.into()))
}

/// DELETE /products/{sku} — remove a product (admin only).
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(claim): Authenticated,
    Path(sku): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_admin(&claim)?;
    state.store.delete_product(&Sku::new(&sku)).await?;
    Ok(StatusCode::NO_CONTENT)
}
