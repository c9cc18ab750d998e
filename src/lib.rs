use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod middleware;
pub mod session;
pub mod store;

use store::Store;

/// Shared application state handed to every handler by the router
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
}

pub fn app(state: AppState) -> Router {
    use axum::routing::MethodRouter;

    let collection_routes: MethodRouter<AppState> = get(handlers::records::get)
        .post(handlers::records::post)
        .put(handlers::records::put)
        .delete(handlers::records::delete);

    // Everything under /api sits behind the session gate
    let protected = Router::new()
        .route("/api/auth/whoami", get(handlers::whoami::whoami))
        .route("/api/:collection", collection_routes)
        .route_layer(axum::middleware::from_fn(
            middleware::session_gate_middleware,
        ));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Scale API",
            "version": version,
            "description": "Multi-tenant project management backend",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "whoami": "/api/auth/whoami (protected)",
                "records": "/api/:collection?slug=&id= (protected - GET/POST/PUT/DELETE)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
