//! Stable application-wide constants.
//!
//! Values here are display sentinels, provider endpoints and default fallbacks
//! for env-var-based configuration. Matching tolerances and speeds are
//! overridable through [`Config`](crate::config::Config); the values below are
//! only what the planner starts from when the environment is silent.

// --- Server defaults (used when HOST / PORT env vars are absent) ---

/// Default bind address for the HTTP server.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default port for the HTTP server.
pub const DEFAULT_PORT: &str = "3000";

// --- Map provider defaults ---

/// Region bias for geocoding and distance-matrix requests.
pub const DEFAULT_MAPS_REGION: &str = "kr";
/// Response language for provider display strings ("23분", "1시간 5분").
pub const DEFAULT_MAPS_LANGUAGE: &str = "ko";
/// Zoom level the map is set to after a search pans to its result.
pub const SEARCH_RESULT_ZOOM: u8 = 15;
/// Initial map center (Seoul City Hall).
pub const DEFAULT_MAP_CENTER: (f64, f64) = (37.5665, 126.9780);

// --- Travel time estimation ---

/// Earth radius used by the straight-line estimator.
pub const EARTH_RADIUS_KM: f64 = 6371.0;
/// Assumed average walking speed. Overridden by `WALKING_SPEED_KMH`.
pub const DEFAULT_WALKING_SPEED_KMH: f64 = 4.0;
/// Assumed average driving speed. Overridden by `DRIVING_SPEED_KMH`.
pub const DEFAULT_DRIVING_SPEED_KMH: f64 = 30.0;
/// Maximum number of transit requests in flight at once.
/// Overridden by `TRANSIT_MAX_CONCURRENCY`.
pub const DEFAULT_TRANSIT_MAX_CONCURRENCY: usize = 1;
/// Display text attached to a leg whose transit estimate failed.
pub const TRAVEL_TIME_UNAVAILABLE_TEXT: &str = "계산 불가";

// --- Search reconciliation ---

/// Per-axis tolerance (degrees) under which a search result and a pin are
/// considered the same coordinate. ~11 m of latitude.
pub const DEFAULT_EXACT_MATCH_TOLERANCE_DEG: f64 = 1e-4;
/// Radius (meters) within which the nearest pin is accepted as the searched place.
pub const DEFAULT_NEAREST_MATCH_RADIUS_M: f64 = 50.0;

// --- Itinerary ---

/// How long a freshly added place keeps its "new" marker (entrance animation).
pub const NEW_PLACE_HIGHLIGHT_MS: u64 = 500;
/// Fallback name shown when a place detail comes back without one.
pub const PLACE_NAME_FALLBACK: &str = "장소 정보";

// --- User-surfaced failure messages ---

pub const REGISTER_ITINERARY_FAILED: &str = "여행 일정 등록에 실패했습니다.";
pub const SAVE_ITINERARY_FAILED: &str = "여행 일정 저장에 실패했습니다.";
pub const REGISTER_PLACE_FAILED: &str = "장소 등록에 실패했습니다.";
