pub mod analyze;
pub mod extract;
pub mod profile;

use crate::error::ApiError;
use crate::middleware::{build_cors_layer, panic_response};
use crate::state::SharedState;
use crate::web::extract::ApiJson;
use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer, compression::CompressionLayer, trace::TraceLayer,
};

pub const ENDPOINTS: [&str; 7] = [
    "GET /",
    "POST /api/test-simple",
    "GET /api/analyze-food-base64",
    "POST /api/analyze-food-base64",
    "POST /api/user/profile",
    "POST /api/user/dashboard",
    "POST /api/calculate-target",
];

/// Unknown paths and unsupported methods on known paths both get the JSON 404.
pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/", get(health).fallback(not_found))
        .route("/api/test-simple", post(test_simple).fallback(not_found))
        .fallback(not_found)
        .with_state(state.clone())
        .merge(analyze::router(state.clone()))
        .merge(profile::router(state))
}

/// Routes plus the HTTP layers the server runs with.
pub fn app(state: SharedState) -> Router {
    let cors = build_cors_layer(state.config.cors_origins.as_deref());
    let max_body_bytes = state.config.max_body_bytes;

    routes(state).layer(
        ServiceBuilder::new()
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(CompressionLayer::new())
            .layer(DefaultBodyLimit::max(max_body_bytes)),
    )
}

async fn health(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "status": "OK",
        "message": "Nutrition backend is running",
        "timestamp": chrono::Utc::now(),
        "aiConnected": state.vision.is_some(),
        "apiKeyPresent": state.config.ai.api_key.is_some(),
        "provider": state.config.ai.provider.name(),
        "endpoints": {
            "health": "GET /",
            "testSimple": "POST /api/test-simple",
            "analyzeFoodInfo": "GET /api/analyze-food-base64",
            "analyzeFood": "POST /api/analyze-food-base64",
            "userProfile": "POST /api/user/profile",
            "dashboard": "POST /api/user/dashboard",
            "calculateTarget": "POST /api/calculate-target"
        }
    }))
}

async fn test_simple(ApiJson(body): ApiJson<Value>) -> Json<Value> {
    tracing::debug!("test-simple received: {}", body);
    Json(json!({
        "success": true,
        "message": "Test endpoint working",
        "receivedData": body,
        "timestamp": chrono::Utc::now(),
    }))
}

pub(crate) async fn not_found() -> ApiError {
    ApiError::NotFound
}
