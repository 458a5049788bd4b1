use crate::config::TravelTimeConfig;
use crate::constants::TRAVEL_TIME_UNAVAILABLE_TEXT;
use crate::models::{Coordinates, TransportMode};
use crate::services::google_maps::TransitTimeProvider;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;

pub use crate::models::place::EstimateQuality;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TravelEstimate {
    pub duration: u32,
    pub duration_text: String,
    pub quality: EstimateQuality,
}

impl TravelEstimate {
    pub fn computed(duration: u32, duration_text: impl Into<String>) -> Self {
        TravelEstimate {
            duration,
            duration_text: duration_text.into(),
            quality: EstimateQuality::Computed,
        }
    }

    /// Sentinel shown when the transit service fails: 0 minutes, "계산 불가"
    pub fn unavailable() -> Self {
        TravelEstimate {
            duration: 0,
            duration_text: TRAVEL_TIME_UNAVAILABLE_TEXT.to_string(),
            quality: EstimateQuality::Unavailable,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.quality == EstimateQuality::Unavailable
    }
}

/// Straight-line duration in whole minutes at `speed_kmh`
pub fn straight_line_minutes(origin: &Coordinates, destination: &Coordinates, speed_kmh: f64) -> u32 {
    let distance_km = origin.distance_to(destination);
    let hours = distance_km / speed_kmh;
    (hours * 60.0).round() as u32
}

/// Travel duration between two stops.
///
/// DRIVING and WALKING are estimated locally from the great-circle distance;
/// TRANSIT asks the provider, with at most `transit_max_concurrency` requests
/// in flight across every caller sharing this estimator.
pub struct TravelTimeEstimator {
    transit: Arc<dyn TransitTimeProvider>,
    transit_permits: Arc<Semaphore>,
    config: TravelTimeConfig,
}

impl TravelTimeEstimator {
    pub fn new(transit: Arc<dyn TransitTimeProvider>, config: TravelTimeConfig) -> Self {
        TravelTimeEstimator {
            transit,
            transit_permits: Arc::new(Semaphore::new(config.transit_max_concurrency.max(1))),
            config,
        }
    }

    /// `None` when either coordinate is missing or the provider reported a
    /// non-OK element; callers leave the existing duration as it is.
    /// A provider failure is not `None` but [`TravelEstimate::unavailable`].
    pub async fn estimate(
        &self,
        origin: Option<&Coordinates>,
        destination: Option<&Coordinates>,
        mode: TransportMode,
    ) -> Option<TravelEstimate> {
        let (origin, destination) = match (origin, destination) {
            (Some(o), Some(d)) => (o, d),
            _ => return None,
        };

        match mode {
            TransportMode::Transit => self.estimate_transit(origin, destination).await,
            TransportMode::Walking => {
                let minutes = straight_line_minutes(origin, destination, self.config.walking_speed_kmh);
                Some(TravelEstimate::computed(minutes, format!("{}분", minutes)))
            }
            TransportMode::Driving => {
                let minutes = straight_line_minutes(origin, destination, self.config.driving_speed_kmh);
                Some(TravelEstimate::computed(minutes, format!("{}분", minutes)))
            }
        }
    }

    async fn estimate_transit(
        &self,
        origin: &Coordinates,
        destination: &Coordinates,
    ) -> Option<TravelEstimate> {
        let _permit = match self.transit_permits.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                tracing::error!("Transit limiter closed: {}", e);
                return Some(TravelEstimate::unavailable());
            }
        };

        match self.transit.transit_duration(origin, destination).await {
            Ok(element) if element.is_ok() => match element.duration_seconds {
                Some(seconds) => {
                    let minutes = (seconds / 60.0).round() as u32;
                    let text = element
                        .duration_text
                        .unwrap_or_else(|| format!("{}분", minutes));
                    tracing::debug!(minutes, "Transit estimate");
                    Some(TravelEstimate::computed(minutes, text))
                }
                None => None,
            },
            Ok(element) => {
                tracing::debug!(status = %element.status, "Transit element not OK, keeping previous value");
                None
            }
            Err(e) => {
                tracing::error!("Travel time calculation error: {}", e);
                Some(TravelEstimate::unavailable())
            }
        }
    }
}
