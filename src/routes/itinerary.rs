use crate::error::{AppError, Result};
use crate::models::{PlaceId, Plan, SelectedPlace, SessionContext, TransportMode};
use crate::services::itinerary::ItineraryView;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::macros::format_description;
use time::Date;
use tokio::time::Instant;

fn parse_date(value: &str) -> Result<Date> {
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .map_err(|e| AppError::InvalidRequest(format!("Invalid date '{}': {}", value, e)))
}

/// PUT /session
/// Start a planning session (new trip, edit or view of a saved one)
pub async fn start_session(
    State(state): State<Arc<AppState>>,
    Json(context): Json<SessionContext>,
) -> Result<Json<ItineraryView>> {
    if let Some(plan) = &context.plan {
        plan.validate().map_err(AppError::InvalidRequest)?;
    }

    state.viewport.lock().await.reset();
    let mut itinerary = state.itinerary.lock().await;
    itinerary.initialize(context);
    Ok(Json(itinerary.view(Instant::now())))
}

/// DELETE /session
pub async fn end_session(State(state): State<Arc<AppState>>) -> StatusCode {
    state.itinerary.lock().await.reset();
    state.viewport.lock().await.reset();
    tracing::info!("Planning session ended");
    StatusCode::NO_CONTENT
}

/// PUT /plan
pub async fn set_plan(
    State(state): State<Arc<AppState>>,
    Json(plan): Json<Plan>,
) -> Result<Json<ItineraryView>> {
    let mut itinerary = state.itinerary.lock().await;
    itinerary.set_plan(plan)?;
    Ok(Json(itinerary.view(Instant::now())))
}

/// GET /itinerary
pub async fn get_itinerary(State(state): State<Arc<AppState>>) -> Json<ItineraryView> {
    let itinerary = state.itinerary.lock().await;
    Json(itinerary.view(Instant::now()))
}

#[derive(Debug, Deserialize)]
pub struct CurrentDayRequest {
    pub index: usize,
}

/// PUT /itinerary/current-day
pub async fn set_current_day(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CurrentDayRequest>,
) -> Json<ItineraryView> {
    let mut itinerary = state.itinerary.lock().await;
    itinerary.set_current_day(request.index);
    Json(itinerary.view(Instant::now()))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPlaceRequest {
    /// Defaults to the currently displayed day
    #[serde(default)]
    pub date: Option<Date>,
    /// Defaults to the place currently selected on the map
    #[serde(default)]
    pub place: Option<SelectedPlace>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPlaceResponse {
    pub added: Option<PlaceId>,
    pub itinerary: ItineraryView,
}

/// POST /itinerary/places
/// Append a place to a day. A missing date, place or coordinate adds nothing.
pub async fn add_place(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddPlaceRequest>,
) -> Json<AddPlaceResponse> {
    let place = match request.place {
        Some(place) => Some(place),
        None => state.viewport.lock().await.selection().cloned(),
    };

    let mut itinerary = state.itinerary.lock().await;
    let added = match place {
        Some(place) => {
            let date = request.date.or_else(|| itinerary.current_date());
            itinerary.add_place(date, &place).await
        }
        None => None,
    };

    Json(AddPlaceResponse {
        added,
        itinerary: itinerary.view(Instant::now()),
    })
}

/// DELETE /itinerary/days/{date}/places/{id}
pub async fn delete_place(
    State(state): State<Arc<AppState>>,
    Path((date, id)): Path<(String, String)>,
) -> Result<Json<ItineraryView>> {
    let date = parse_date(&date)?;
    let mut itinerary = state.itinerary.lock().await;

    if !itinerary.delete_place(date, &PlaceId::from(id.as_str())).await {
        return Err(AppError::NotFound(format!(
            "No place {} on {}",
            id, date
        )));
    }
    Ok(Json(itinerary.view(Instant::now())))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetDayResponse {
    pub removed: usize,
    pub itinerary: ItineraryView,
}

/// POST /itinerary/days/{date}/reset
pub async fn reset_day(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
) -> Result<Json<ResetDayResponse>> {
    let date = parse_date(&date)?;
    let mut itinerary = state.itinerary.lock().await;
    let removed = itinerary.reset_day(date);
    Ok(Json(ResetDayResponse {
        removed,
        itinerary: itinerary.view(Instant::now()),
    }))
}

#[derive(Debug, Deserialize)]
pub struct TransportModeRequest {
    pub mode: TransportMode,
}

/// PUT /itinerary/transport-mode
/// Every leg is recomputed under the new mode before the response is built.
pub async fn set_transport_mode(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TransportModeRequest>,
) -> Json<ItineraryView> {
    let mut itinerary = state.itinerary.lock().await;
    itinerary.set_transport_mode(request.mode).await;
    Json(itinerary.view(Instant::now()))
}

/// POST /itinerary/recalculate
pub async fn recalculate(State(state): State<Arc<AppState>>) -> Json<ItineraryView> {
    let mut itinerary = state.itinerary.lock().await;
    itinerary.recalculate_all_travel_times().await;
    Json(itinerary.view(Instant::now()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelSavedResponse {
    pub travel_id: i64,
}

/// POST /itinerary/register
pub async fn register(State(state): State<Arc<AppState>>) -> Result<Json<TravelSavedResponse>> {
    let travel_id = {
        let mut itinerary = state.itinerary.lock().await;
        itinerary.register_itinerary(state.backend.as_ref()).await?
    };
    state.viewport.lock().await.reset();
    Ok(Json(TravelSavedResponse { travel_id }))
}

/// POST /itinerary/save
pub async fn save_and_exit(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TravelSavedResponse>> {
    let travel_id = {
        let mut itinerary = state.itinerary.lock().await;
        itinerary.save_and_exit(state.backend.as_ref()).await?
    };
    state.viewport.lock().await.reset();
    Ok(Json(TravelSavedResponse { travel_id }))
}
