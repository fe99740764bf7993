use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::AppState;

pub async fn ping_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Marquee is running",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Reports cache reachability. An unreachable cache degrades the service
/// rather than taking it down, so this stays 200.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let mut health_status = json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "checks": {}
    });

    match state.cache.ping().await {
        Ok(()) => {
            health_status["checks"]["cache"] = json!({
                "status": "healthy",
                "backend": state.cache.backend(),
            });
        }
        Err(e) => {
            health_status["checks"]["cache"] = json!({
                "status": "unreachable",
                "backend": state.cache.backend(),
                "error": e.to_string()
            });
            health_status["status"] = json!("degraded");
        }
    }

    Json(health_status)
}
