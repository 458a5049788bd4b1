// Library exports for testing and reusability

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use error::{AppError, Result};

use config::{ReconcilerConfig, TravelTimeConfig};
use services::backend::BackendApi;
use services::google_maps::{Geocoder, TransitTimeProvider};
use services::itinerary::ItineraryStore;
use services::travel_time::TravelTimeEstimator;
use services::viewport::MapViewportController;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One planning session shared across handlers.
///
/// The two halves are locked separately so a pin fetch never blocks an
/// itinerary edit.
pub struct AppState {
    pub itinerary: Mutex<ItineraryStore>,
    pub viewport: Mutex<MapViewportController>,
    pub backend: Arc<dyn BackendApi>,
    pub geocoder: Arc<dyn Geocoder>,
}

impl AppState {
    pub fn new(
        backend: Arc<dyn BackendApi>,
        transit: Arc<dyn TransitTimeProvider>,
        geocoder: Arc<dyn Geocoder>,
        travel_time: TravelTimeConfig,
        reconciler: ReconcilerConfig,
    ) -> Self {
        let estimator = Arc::new(TravelTimeEstimator::new(transit, travel_time));
        AppState {
            itinerary: Mutex::new(ItineraryStore::new(estimator)),
            viewport: Mutex::new(MapViewportController::new(reconciler)),
            backend,
            geocoder,
        }
    }
}
