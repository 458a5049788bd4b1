use crate::constants::REGISTER_PLACE_FAILED;
use crate::error::{AppError, Result};
use crate::models::{Coordinates, MapPin, SearchCandidate, SelectedPlace, SelectionMarker, ViewportBounds};
use crate::services::search::{MapCommand, Registration, SearchStep};
use crate::services::viewport::PinClick;
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapResponse {
    pub center: Coordinates,
    pub bounds: Option<ViewportBounds>,
    pub pins: Vec<MapPin>,
    pub selection: SelectionResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionResponse {
    pub place: Option<SelectedPlace>,
    pub marker: Option<SelectionMarker>,
}

impl SelectionResponse {
    fn from_selection(selection: Option<&SelectedPlace>) -> Self {
        SelectionResponse {
            marker: selection.and_then(SelectedPlace::marker),
            place: selection.cloned(),
        }
    }
}

async fn map_snapshot(state: &AppState) -> MapResponse {
    let viewport = state.viewport.lock().await;
    MapResponse {
        center: viewport.center(),
        bounds: viewport.bounds().copied(),
        pins: viewport.pins().to_vec(),
        selection: SelectionResponse::from_selection(viewport.selection()),
    }
}

/// POST /map/viewport
/// The map stopped moving. Pins are refetched for the new bounds and a
/// pending search is reconciled against them.
pub async fn viewport_settled(
    State(state): State<Arc<AppState>>,
    Json(bounds): Json<ViewportBounds>,
) -> Result<Json<MapResponse>> {
    bounds.validate().map_err(AppError::InvalidRequest)?;

    let ticket = state.viewport.lock().await.begin_settle(bounds);
    let fetched = state.backend.fetch_pins(ticket.bounds()).await;
    let matched = state.viewport.lock().await.complete_settle(ticket, fetched);

    if let Some(matched) = matched {
        let detail = state.backend.fetch_place(matched.pin.place_id).await;
        state.viewport.lock().await.complete_pin_match(matched, detail);
    }

    Ok(Json(map_snapshot(&state).await))
}

/// GET /map/pins
pub async fn get_pins(State(state): State<Arc<AppState>>) -> Json<MapResponse> {
    Json(map_snapshot(&state).await)
}

/// POST /map/pins/{place_id}/select
pub async fn select_pin(
    State(state): State<Arc<AppState>>,
    Path(place_id): Path<i64>,
) -> Json<SelectionResponse> {
    let click = state.viewport.lock().await.begin_pin_click(place_id);
    if let PinClick::Fetch { place_id, ticket } = click {
        let detail = state.backend.fetch_place(place_id).await;
        state
            .viewport
            .lock()
            .await
            .complete_pin_click(place_id, ticket, detail);
    }

    let viewport = state.viewport.lock().await;
    Json(SelectionResponse::from_selection(viewport.selection()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Where the map should pan; absent when the search ended without a result
    pub command: Option<MapCommand>,
}

async fn run_search_step(state: &AppState, step: SearchStep) -> Option<MapCommand> {
    match step {
        SearchStep::Pan(command) => Some(command),
        SearchStep::Geocode { ticket, query } => {
            let result = state.geocoder.geocode(&query).await;
            state
                .viewport
                .lock()
                .await
                .complete_text_search(ticket, result)
        }
        SearchStep::Ignored => None,
    }
}

/// POST /search/autocomplete
pub async fn select_candidate(
    State(state): State<Arc<AppState>>,
    Json(candidate): Json<SearchCandidate>,
) -> Json<SearchResponse> {
    let step = state.viewport.lock().await.select_candidate(candidate);
    Json(SearchResponse {
        command: run_search_step(&state, step).await,
    })
}

#[derive(Debug, Deserialize)]
pub struct TextSearchRequest {
    pub query: String,
}

/// POST /search/text
pub async fn search_text(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TextSearchRequest>,
) -> Json<SearchResponse> {
    let step = state.viewport.lock().await.begin_text_search(&request.query);
    Json(SearchResponse {
        command: run_search_step(&state, step).await,
    })
}

/// GET /selection
pub async fn get_selection(State(state): State<Arc<AppState>>) -> Json<SelectionResponse> {
    let viewport = state.viewport.lock().await;
    Json(SelectionResponse::from_selection(viewport.selection()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSelectionResponse {
    pub place_id: i64,
    pub selection: SelectionResponse,
}

/// POST /selection/register
/// Register the selected place with the backend so it becomes a pin.
pub async fn register_selection(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RegisterSelectionResponse>> {
    let registration = state.viewport.lock().await.reconciler().registration()?;
    let place_id = match registration {
        Registration::Registered(place_id) => place_id,
        Registration::Required { ticket, request } => {
            let place_id = state
                .backend
                .register_place(&request)
                .await
                .map_err(|e| AppError::user_facing(REGISTER_PLACE_FAILED, e))?;
            state
                .viewport
                .lock()
                .await
                .reconciler_mut()
                .attach_place_id(ticket, place_id);
            place_id
        }
    };

    let viewport = state.viewport.lock().await;
    Ok(Json(RegisterSelectionResponse {
        place_id,
        selection: SelectionResponse::from_selection(viewport.selection()),
    }))
}
