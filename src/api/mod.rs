//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Resource endpoints are mounted under `/api/v1`; `/health`,
//! `/config/packages` and `/ws` live at the root.

pub mod dto;
pub mod handlers;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// OpenAPI document for every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "imagegen-gateway",
        description = "Credit ledger and generation gateway behind an AI image bot"
    ),
    paths(
        handlers::account::upsert_account,
        handlers::account::start_session,
        handlers::account::grant_signup_bonus,
        handlers::account::get_stats,
        handlers::ledger::get_balance,
        handlers::ledger::add_credits,
        handlers::ledger::deduct_credits,
        handlers::generation::create_generation,
        handlers::generation::list_generations,
        handlers::purchase::create_purchase,
        handlers::purchase::list_purchases,
        handlers::system::health_handler,
        handlers::system::packages_handler,
    ),
    tags(
        (name = "Accounts", description = "Account lifecycle"),
        (name = "Ledger", description = "Credit balance"),
        (name = "Generations", description = "Paid image generation"),
        (name = "Purchases", description = "Pending credit purchases"),
        (name = "System", description = "Health and catalog"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}

/// Builds the full application: REST, WebSocket, OpenAPI document and
/// HTTP middleware, bound to `state`.
pub fn build_app(state: AppState) -> Router {
    let router = build_router().route("/ws", get(ws_handler));

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    #[cfg(not(feature = "swagger-ui"))]
    let router = router.route(
        "/api-docs/openapi.json",
        get(|| async { axum::Json(ApiDoc::openapi()) }),
    );

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::config::LedgerRules;
    use crate::domain::EventBus;
    use crate::generator::PlaceholderGenerator;
    use crate::persistence::MemoryLedgerStore;

    fn make_app() -> (Router, Arc<MemoryLedgerStore>) {
        let store = Arc::new(MemoryLedgerStore::new());
        let state = AppState::new(
            Arc::clone(&store) as Arc<dyn crate::persistence::LedgerStore>,
            Arc::new(PlaceholderGenerator::new()),
            LedgerRules::default(),
            EventBus::new(64),
        );
        (build_app(state), store)
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        };
        let Ok(request) = request else {
            panic!("failed to build request");
        };
        let Ok(response) = app.clone().oneshot(request).await else {
            panic!("router failed");
        };
        let status = response.status();
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("failed to read body");
        };
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn start_grants_bonus_once() {
        let (app, _) = make_app();

        let (status, body) = call(&app, Method::POST, "/api/v1/users/42/start", Some(json!({"first_name": "Ada"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["bonus_granted"], true);
        assert_eq!(body["account"]["balance"], 3);
        assert_eq!(body["account"]["first_name"], "Ada");

        let (_, body) = call(&app, Method::POST, "/api/v1/users/42/signup-bonus", None).await;
        assert_eq!(body["granted"], false);
        assert_eq!(body["balance"], 3);
    }

    #[tokio::test]
    async fn unknown_user_balance_is_zero_and_stats_404() {
        let (app, _) = make_app();

        let (status, body) = call(&app, Method::GET, "/api/v1/users/9/balance", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["balance"], 0);

        let (status, body) = call(&app, Method::GET, "/api/v1/users/9/stats", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], 2001);
    }

    #[tokio::test]
    async fn credits_and_debits() {
        let (app, _) = make_app();
        let _ = call(&app, Method::PUT, "/api/v1/users/5", Some(json!({}))).await;

        let (status, body) = call(&app, Method::POST, "/api/v1/users/5/credits", Some(json!({"amount": 5}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["balance"], 5);

        let (status, body) = call(&app, Method::POST, "/api/v1/users/5/credits", Some(json!({"amount": -1}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], 1002);

        let (_, body) = call(&app, Method::POST, "/api/v1/users/5/debits", Some(json!({"amount": 6}))).await;
        assert_eq!(body["deducted"], false);
        assert_eq!(body["balance"], 5);

        let (_, body) = call(&app, Method::POST, "/api/v1/users/5/debits", Some(json!({"amount": 2}))).await;
        assert_eq!(body["deducted"], true);
        assert_eq!(body["balance"], 3);
    }

    #[tokio::test]
    async fn generation_charges_then_refuses_on_empty_balance() {
        let (app, _) = make_app();
        let _ = call(&app, Method::PUT, "/api/v1/users/8", Some(json!({}))).await;
        let _ = call(&app, Method::POST, "/api/v1/users/8/credits", Some(json!({"amount": 1}))).await;

        let prompt = json!({"prompt": "a lighthouse at dusk"});
        let (status, body) = call(&app, Method::POST, "/api/v1/users/8/generations", Some(prompt.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["balance"], 0);
        assert_eq!(body["generation"]["prompt"], "a lighthouse at dusk");

        let (status, body) = call(&app, Method::POST, "/api/v1/users/8/generations", Some(prompt)).await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(body["error"]["code"], 4001);

        let (_, body) = call(&app, Method::GET, "/api/v1/users/8/generations?limit=5", None).await;
        assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn duplicate_purchase_is_conflict() {
        let (app, _) = make_app();
        let _ = call(&app, Method::PUT, "/api/v1/users/3", Some(json!({}))).await;

        let request = json!({"package_id": "buy_10", "payment_id": "3_1700000000"});
        let (status, body) = call(&app, Method::POST, "/api/v1/users/3/purchases", Some(request.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "pending");
        assert_eq!(body["credits"], 10);

        let (status, body) = call(&app, Method::POST, "/api/v1/users/3/purchases", Some(request)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], 2003);

        let (status, _) = call(&app, Method::POST, "/api/v1/users/3/purchases", Some(json!({"package_id": "7"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_reports_store_outage() {
        let (app, store) = make_app();

        let (status, body) = call(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        store.set_unavailable(true);
        let (status, body) = call(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["store"], "unavailable");

        let (status, body) = call(&app, Method::GET, "/api/v1/users/1/balance", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], 3001);
    }

    #[tokio::test]
    async fn packages_lists_catalog() {
        let (app, _) = make_app();
        let (status, body) = call(&app, Method::GET, "/config/packages", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["generation_cost"], 1);
        assert_eq!(body["packages"].as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn openapi_documents_user_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/users/{user_id}/balance"));
        assert!(doc.paths.paths.contains_key("/config/packages"));
    }
}
