//! # Request Handlers
//!
//! Axum request handlers for the storefront API.
//! Every cart and checkout route is scoped to one browsing session.

use crate::state::{AppState, SessionEntry};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use shop_checkout::{CheckoutAttempt, CheckoutStatus};
use shop_core::{AuthSession, CartLineItem, CartSummary, Role, ShopError};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Open session request (login is optional)
#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Serialize)]
pub struct OpenSessionResponse {
    pub session_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthSession>,
}

/// Login request. No credential check happens here.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub user: String,
    #[serde(default)]
    pub role: Role,
}

/// Add-to-cart request from a service page
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub service_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

/// Cart page payload
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub items: Vec<CartLineItem>,
    #[serde(flatten)]
    pub summary: CartSummary,
    pub discount_eligible: bool,
}

/// Checkout page payload
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub attempt: Option<CheckoutAttempt>,
    /// Where the UI should navigate once the purchase completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<T, ApiError>;

fn shop_error_to_response(err: ShopError) -> ApiError {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

async fn session_entry(state: &AppState, session_id: Uuid) -> ApiResult<Arc<SessionEntry>> {
    state
        .sessions
        .get(session_id)
        .await
        .map_err(shop_error_to_response)
}

async fn cart_response(entry: &SessionEntry) -> CartResponse {
    let discount_eligible = entry.session.is_discount_eligible().await;
    let cart = entry.session.cart();
    let cart = cart.read().await;
    CartResponse {
        items: cart.items().to_vec(),
        summary: cart.summary(discount_eligible),
        discount_eligible,
    }
}

async fn checkout_response(entry: &SessionEntry) -> CheckoutResponse {
    let attempt = entry.checkout.attempt();
    let redirect = match &attempt {
        Some(a) if a.status == CheckoutStatus::Success && a.completed => {
            Some(entry.session.dashboard_path().await.to_string())
        }
        _ => None,
    };
    CheckoutResponse { attempt, redirect }
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "storefront",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// List active services
pub async fn list_services(State(state): State<AppState>) -> impl IntoResponse {
    let services: Vec<_> = state.catalog.active_services().collect();
    Json(serde_json::json!({
        "services": services,
        "count": services.len()
    }))
}

/// Get single service
pub async fn get_service(
    State(state): State<AppState>,
    Path(service_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let service = state
        .catalog
        .get(&service_id)
        .ok_or_else(|| shop_error_to_response(ShopError::ServiceNotFound { service_id }))?;

    Ok(Json(service.clone()))
}

/// Open a browsing session, optionally signed in
#[instrument(skip(state, request))]
pub async fn open_session(
    State(state): State<AppState>,
    Json(request): Json<OpenSessionRequest>,
) -> (StatusCode, Json<OpenSessionResponse>) {
    let auth = request
        .user
        .map(|user| AuthSession::new(user, request.role.unwrap_or_default()));

    let (session_id, _) = state.sessions.open(auth.clone()).await;
    (
        StatusCode::CREATED,
        Json(OpenSessionResponse { session_id, auth }),
    )
}

/// End a session and tear down its checkout
pub async fn end_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .sessions
        .end(session_id)
        .await
        .map_err(shop_error_to_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Replace the session's login
pub async fn login(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<CartResponse>> {
    let entry = session_entry(&state, session_id).await?;
    entry
        .session
        .login(AuthSession::new(request.user, request.role))
        .await;
    Ok(Json(cart_response(&entry).await))
}

pub async fn logout(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<CartResponse>> {
    let entry = session_entry(&state, session_id).await?;
    entry.session.logout().await;
    Ok(Json(cart_response(&entry).await))
}

/// Cart contents and totals
pub async fn get_cart(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<CartResponse>> {
    let entry = session_entry(&state, session_id).await?;
    Ok(Json(cart_response(&entry).await))
}

/// Add a catalog service to the cart
#[instrument(skip(state, request), fields(service_id = %request.service_id))]
pub async fn add_item(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<AddItemRequest>,
) -> ApiResult<Json<CartResponse>> {
    let entry = session_entry(&state, session_id).await?;

    let service = state.catalog.get(&request.service_id).ok_or_else(|| {
        shop_error_to_response(ShopError::ServiceNotFound {
            service_id: request.service_id.clone(),
        })
    })?;

    if !service.active {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                format!("Service is not available: {}", service.id),
                400,
            )),
        ));
    }

    entry
        .session
        .add_item(CartLineItem::from_service(service, request.quantity))
        .await
        .map_err(shop_error_to_response)?;

    info!(session = %session_id, quantity = request.quantity, "Added to cart");
    Ok(Json(cart_response(&entry).await))
}

/// Set a line item's quantity; values below 1 are rejected
pub async fn update_item(
    State(state): State<AppState>,
    Path((session_id, item_id)): Path<(Uuid, String)>,
    Json(request): Json<UpdateQuantityRequest>,
) -> ApiResult<Json<CartResponse>> {
    let entry = session_entry(&state, session_id).await?;

    let updated = entry
        .session
        .update_quantity(&item_id, request.quantity)
        .await
        .map_err(|e| {
            warn!("Rejected quantity update: {}", e);
            shop_error_to_response(e)
        })?;

    if !updated {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!("Item not in cart: {}", item_id), 404)),
        ));
    }

    Ok(Json(cart_response(&entry).await))
}

/// Remove a line item (no-op if absent)
pub async fn remove_item(
    State(state): State<AppState>,
    Path((session_id, item_id)): Path<(Uuid, String)>,
) -> ApiResult<Json<CartResponse>> {
    let entry = session_entry(&state, session_id).await?;
    entry.session.remove_item(&item_id).await;
    Ok(Json(cart_response(&entry).await))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<CartResponse>> {
    let entry = session_entry(&state, session_id).await?;
    entry.session.clear_cart().await;
    Ok(Json(cart_response(&entry).await))
}

/// Pay the open attempt, or start one for the current total and pay it
#[instrument(skip(state))]
pub async fn start_checkout(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<CheckoutResponse>)> {
    let entry = session_entry(&state, session_id).await?;

    let attempt = entry.checkout.checkout().await.map_err(|e| {
        warn!("Checkout rejected: {}", e);
        shop_error_to_response(e)
    })?;

    info!(
        "Checkout started: session={}, attempt={}, amount={}",
        session_id,
        attempt.id,
        attempt.amount.display()
    );

    Ok((StatusCode::ACCEPTED, Json(checkout_response(&entry).await)))
}

/// Current attempt, with the redirect once the purchase completed
pub async fn get_checkout(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<CheckoutResponse>> {
    let entry = session_entry(&state, session_id).await?;
    Ok(Json(checkout_response(&entry).await))
}

pub async fn retry_checkout(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<CheckoutResponse>> {
    let entry = session_entry(&state, session_id).await?;
    entry.checkout.retry().map_err(shop_error_to_response)?;
    Ok(Json(checkout_response(&entry).await))
}

pub async fn cancel_checkout(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<CheckoutResponse>> {
    let entry = session_entry(&state, session_id).await?;
    entry.checkout.cancel().map_err(shop_error_to_response)?;
    Ok(Json(checkout_response(&entry).await))
}
