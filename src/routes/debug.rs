use crate::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

/// GET /debug/health - Report the session the service is holding
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let mut status = json!({
        "status": "ok",
        "checks": {}
    });

    {
        let itinerary = state.itinerary.lock().await;
        status["checks"]["session"] = json!(itinerary.session_mode());
        status["checks"]["has_plan"] = json!(itinerary.plan().is_some());
        status["checks"]["transport_mode"] = json!(itinerary.transport_mode());
    }

    {
        let viewport = state.viewport.lock().await;
        status["checks"]["pin_count"] = json!(viewport.pins().len());
        status["checks"]["search_pending"] = json!(viewport.reconciler().armed_generation().is_some());
    }

    Json(status)
}
