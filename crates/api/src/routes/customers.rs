//! Customer directory endpoints (administrative, outside the order core).

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::CustomerId;
use domain::Customer;
use serde::{Deserialize, Serialize};
use store::Store;

use crate::AppState;
use crate::auth::{Authenticated, require_admin};
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateCustomerRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Serialize)]
pub struct CustomerResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

impl From<Customer> for CustomerResponse {
    fn from(customer: Customer) -> Self {
        Self {
            id: customer.id.to_string(),
            name: customer.name,
            email: customer.email,
            phone: customer.phone,
            address: customer.address,
        }
    }
}

/// POST /customers — create a customer record (admin only).
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(claim): Authenticated,
    Json(req): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<CustomerResponse>), ApiError> {
    require_admin(&claim)?;

    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Name is required".to_string()));
    }
    let email = req.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest("Email is invalid".to_string()));
    }

    let customer = state
        .store
        .insert_customer(Customer::new(
            req.name.trim(),
            email,
            req.phone,
            req.address,
        ))
        .await?;

    Ok((StatusCode::CREATED, Json(customer.into())))
}

/// GET /customers — list the directory (admin only).
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(claim): Authenticated,
) -> Result<Json<Vec<CustomerResponse>>, ApiError> {
    require_admin(&claim)?;
    let customers = state.store.list_customers().await?;
    Ok(Json(customers.into_iter().map(Into::into).collect()))
}

/// GET /customers/{id} — point read (admin only).
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(claim): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<CustomerResponse>, ApiError> {
    require_admin(&claim)?;

    let id: CustomerId = id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid customer id: {id}")))?;

    let customer = state
        .store
        .find_customer(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Customer {id} not found")))?;
    Ok(Json(customer.into()))
}
