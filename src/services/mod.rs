pub mod backend;
pub mod google_maps;
pub mod itinerary;
pub mod search;
pub mod travel_time;
pub mod viewport;
