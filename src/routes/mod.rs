pub mod debug;
pub mod itinerary;
pub mod map;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/debug/health", get(debug::health_check))
        .route(
            "/session",
            put(itinerary::start_session).delete(itinerary::end_session),
        )
        .route("/plan", put(itinerary::set_plan))
        .route("/itinerary", get(itinerary::get_itinerary))
        .route("/itinerary/current-day", put(itinerary::set_current_day))
        .route("/itinerary/places", post(itinerary::add_place))
        .route(
            "/itinerary/days/{date}/places/{id}",
            delete(itinerary::delete_place),
        )
        .route("/itinerary/days/{date}/reset", post(itinerary::reset_day))
        .route(
            "/itinerary/transport-mode",
            put(itinerary::set_transport_mode),
        )
        .route("/itinerary/recalculate", post(itinerary::recalculate))
        .route("/itinerary/register", post(itinerary::register))
        .route("/itinerary/save", post(itinerary::save_and_exit))
        .route("/map/viewport", post(map::viewport_settled))
        .route("/map/pins", get(map::get_pins))
        .route("/map/pins/{place_id}/select", post(map::select_pin))
        .route("/search/autocomplete", post(map::select_candidate))
        .route("/search/text", post(map::search_text))
        .route("/selection", get(map::get_selection))
        .route("/selection/register", post(map::register_selection))
        .with_state(state)
}
