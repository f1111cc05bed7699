//! # Routes
//!
//! Axum router configuration for the storefront API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Catalog:
///   - GET  /api/v1/services - List active services
///   - GET  /api/v1/services/{service_id} - Get service by ID
///
/// - Sessions:
///   - POST   /api/v1/sessions - Open a browsing session
///   - DELETE /api/v1/sessions/{sid} - End it
///   - PUT / DELETE /api/v1/sessions/{sid}/login - Sign in / out
///
/// - Cart:
///   - GET / DELETE /api/v1/sessions/{sid}/cart - View / clear
///   - POST /api/v1/sessions/{sid}/cart/items - Add a service
///   - PATCH / DELETE /api/v1/sessions/{sid}/cart/items/{item_id} - Quantity / remove
///
/// - Checkout:
///   - POST / GET /api/v1/sessions/{sid}/checkout - Pay / view attempt
///   - POST /api/v1/sessions/{sid}/checkout/retry
///   - POST /api/v1/sessions/{sid}/checkout/cancel
pub fn create_router(state: AppState) -> Router {
    // The UI is served from a different origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let catalog_routes = Router::new()
        .route("/services", get(handlers::list_services))
        .route("/services/{service_id}", get(handlers::get_service));

    let session_routes = Router::new()
        .route("/sessions", post(handlers::open_session))
        .route("/sessions/{session_id}", delete(handlers::end_session))
        .route(
            "/sessions/{session_id}/login",
            put(handlers::login).delete(handlers::logout),
        )
        // Cart
        .route(
            "/sessions/{session_id}/cart",
            get(handlers::get_cart).delete(handlers::clear_cart),
        )
        .route("/sessions/{session_id}/cart/items", post(handlers::add_item))
        .route(
            "/sessions/{session_id}/cart/items/{item_id}",
            patch(handlers::update_item).delete(handlers::remove_item),
        )
        // Checkout
        .route(
            "/sessions/{session_id}/checkout",
            post(handlers::start_checkout).get(handlers::get_checkout),
        )
        .route("/sessions/{session_id}/checkout/retry", post(handlers::retry_checkout))
        .route("/sessions/{session_id}/checkout/cancel", post(handlers::cancel_checkout));

    let api_routes = Router::new()
        .merge(catalog_routes)
        .merge(session_routes);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/api/v1", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AppConfig, SessionRegistry, DEFAULT_SESSION_IDLE_TIMEOUT};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use shop_checkout::{FixedOutcome, SimulatorConfig};
    use shop_core::{Currency, Price, Service, ServiceCatalog};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn catalog() -> ServiceCatalog {
        ServiceCatalog::new()
            .with_service(
                Service::new("web-basic", "Basic Website", Price::new(500.0, Currency::INR))
                    .with_feature("5 pages"),
            )
            .with_service(Service::new("seo", "SEO Audit", Price::new(250.0, Currency::INR)))
    }

    fn app(outcome: FixedOutcome) -> Router {
        let config = AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            catalog_path: None,
            session_idle_timeout: DEFAULT_SESSION_IDLE_TIMEOUT,
        };
        let simulator = SimulatorConfig::default()
            .with_delays(Duration::from_millis(2000), Duration::from_millis(1500));
        let sessions = SessionRegistry::new(simulator).with_outcome(Arc::new(outcome));
        create_router(AppState::from_parts(config, catalog(), sessions))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn open_session(app: &Router, body: Value) -> String {
        let (status, value) = call(app, "POST", "/api/v1/sessions", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        value["session_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_and_catalog() {
        let app = app(FixedOutcome::approve());

        let (status, value) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["status"], "healthy");

        let (_, value) = call(&app, "GET", "/api/v1/services", None).await;
        assert_eq!(value["count"], 2);

        let (status, _) = call(&app, "GET", "/api/v1/services/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cart_flow_with_partner_discount() {
        let app = app(FixedOutcome::approve());
        let sid = open_session(&app, json!({ "user": "asha", "role": "partner" })).await;
        let items = format!("/api/v1/sessions/{sid}/cart/items");

        call(&app, "POST", &items, Some(json!({ "service_id": "web-basic", "quantity": 2 }))).await;
        let (status, cart) =
            call(&app, "POST", &items, Some(json!({ "service_id": "seo", "quantity": 3 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cart["count"], 5);
        assert_eq!(cart["subtotal"]["amount"], 175_000);
        assert_eq!(cart["discount"]["amount"], 35_000);
        assert_eq!(cart["total"]["amount"], 140_000);

        let (status, _) = call(
            &app,
            "PATCH",
            &format!("{items}/seo"),
            Some(json!({ "quantity": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (_, cart) = call(&app, "DELETE", &format!("{items}/seo"), None).await;
        assert_eq!(cart["count"], 2);

        let (_, cart) = call(&app, "DELETE", &format!("/api/v1/sessions/{sid}/login"), None).await;
        assert_eq!(cart["discount_eligible"], false);
        assert_eq!(cart["total"]["amount"], 100_000);
    }

    #[tokio::test]
    async fn test_unknown_session_and_service() {
        let app = app(FixedOutcome::approve());
        let missing = uuid::Uuid::new_v4();

        let (status, _) = call(&app, "GET", &format!("/api/v1/sessions/{missing}/cart"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let sid = open_session(&app, json!({})).await;
        let (status, _) = call(
            &app,
            "POST",
            &format!("/api/v1/sessions/{sid}/cart/items"),
            Some(json!({ "service_id": "nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn test_checkout_success_redirects_to_dashboard() {
        let app = app(FixedOutcome::approve());
        let sid = open_session(&app, json!({ "user": "ravi", "role": "customer" })).await;
        call(
            &app,
            "POST",
            &format!("/api/v1/sessions/{sid}/cart/items"),
            Some(json!({ "service_id": "web-basic", "quantity": 2 })),
        )
        .await;

        let checkout = format!("/api/v1/sessions/{sid}/checkout");
        let (status, value) = call(&app, "POST", &checkout, None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(value["attempt"]["status"], "processing");
        assert_eq!(value["attempt"]["amount"]["amount"], 100_000);

        tokio::time::sleep(Duration::from_millis(4000)).await;

        let (_, value) = call(&app, "GET", &checkout, None).await;
        assert_eq!(value["attempt"]["status"], "success");
        assert_eq!(value["redirect"], "/dashboard/customer");

        let (_, cart) = call(&app, "GET", &format!("/api/v1/sessions/{sid}/cart"), None).await;
        assert_eq!(cart["count"], 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_checkout_failure_retry_and_cancel() {
        let app = app(FixedOutcome::decline());
        let sid = open_session(&app, json!({})).await;
        call(
            &app,
            "POST",
            &format!("/api/v1/sessions/{sid}/cart/items"),
            Some(json!({ "service_id": "seo" })),
        )
        .await;

        let checkout = format!("/api/v1/sessions/{sid}/checkout");
        call(&app, "POST", &checkout, None).await;
        tokio::time::sleep(Duration::from_millis(2500)).await;

        let (_, value) = call(&app, "GET", &checkout, None).await;
        assert_eq!(value["attempt"]["status"], "failed");
        assert!(value.get("redirect").is_none());

        let (status, value) = call(&app, "POST", &format!("{checkout}/retry"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["attempt"]["status"], "input");

        let (status, value) = call(&app, "POST", &format!("{checkout}/cancel"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(value["attempt"].is_null());

        let (status, _) = call(&app, "POST", &format!("{checkout}/retry"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, cart) = call(&app, "GET", &format!("/api/v1/sessions/{sid}/cart"), None).await;
        assert_eq!(cart["count"], 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_checkout_post_while_processing_conflicts() {
        let app = app(FixedOutcome::approve());
        let sid = open_session(&app, json!({})).await;
        call(
            &app,
            "POST",
            &format!("/api/v1/sessions/{sid}/cart/items"),
            Some(json!({ "service_id": "web-basic" })),
        )
        .await;

        let checkout = format!("/api/v1/sessions/{sid}/checkout");
        let (status, first) = call(&app, "POST", &checkout, None).await;
        assert_eq!(status, StatusCode::ACCEPTED);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        let (status, _) = call(&app, "POST", &checkout, None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, value) = call(&app, "GET", &checkout, None).await;
        assert_eq!(value["attempt"]["id"], first["attempt"]["id"]);
        assert_eq!(value["attempt"]["status"], "processing");

        tokio::time::sleep(Duration::from_millis(4000)).await;
        let (_, value) = call(&app, "GET", &checkout, None).await;
        assert_eq!(value["attempt"]["id"], first["attempt"]["id"]);
        assert_eq!(value["redirect"], "/dashboard/customer");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_then_post_pays_same_attempt() {
        let app = app(FixedOutcome::decline());
        let sid = open_session(&app, json!({})).await;
        call(
            &app,
            "POST",
            &format!("/api/v1/sessions/{sid}/cart/items"),
            Some(json!({ "service_id": "seo" })),
        )
        .await;

        let checkout = format!("/api/v1/sessions/{sid}/checkout");
        let (_, first) = call(&app, "POST", &checkout, None).await;
        tokio::time::sleep(Duration::from_millis(2500)).await;

        // Paying a failed attempt needs a retry first
        let (status, _) = call(&app, "POST", &checkout, None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, retried) = call(&app, "POST", &format!("{checkout}/retry"), None).await;
        assert_eq!(retried["attempt"]["id"], first["attempt"]["id"]);

        let (status, paid) = call(&app, "POST", &checkout, None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(paid["attempt"]["id"], first["attempt"]["id"]);
        assert_eq!(paid["attempt"]["status"], "processing");
        assert_eq!(paid["attempt"]["amount"]["amount"], 25_000);
    }

    #[tokio::test]
    async fn test_checkout_empty_cart_rejected() {
        let app = app(FixedOutcome::approve());
        let sid = open_session(&app, json!({})).await;

        let (status, value) =
            call(&app, "POST", &format!("/api/v1/sessions/{sid}/checkout"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "Cart is empty");
    }

    #[tokio::test]
    async fn test_end_session() {
        let app = app(FixedOutcome::approve());
        let sid = open_session(&app, json!({})).await;

        let (status, _) = call(&app, "DELETE", &format!("/api/v1/sessions/{sid}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = call(&app, "GET", &format!("/api/v1/sessions/{sid}/cart"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
