pub mod coordinates;
pub mod course;
pub mod pin;
pub mod place;
pub mod plan;
pub mod transport;

pub use coordinates::Coordinates;
pub use course::{format_travel_minutes, TravelCourse};
pub use pin::{MapPin, ViewportBounds};
pub use place::{EstimateQuality, PlaceDetail, PlaceId, PlaceItem, SearchCandidate, SelectedPlace, SelectionMarker};
pub use plan::{DayPlan, Plan, SessionContext, SessionMode};
pub use transport::TransportMode;
