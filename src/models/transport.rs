use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportMode {
    #[default]
    Driving,
    Transit,
    Walking,
}

impl TransportMode {
    /// Distance-matrix `mode` parameter for this transport mode
    pub fn provider_mode(&self) -> &'static str {
        match self {
            TransportMode::Driving => "driving",
            TransportMode::Transit => "transit",
            TransportMode::Walking => "walking",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Driving => write!(f, "DRIVING"),
            TransportMode::Transit => write!(f, "TRANSIT"),
            TransportMode::Walking => write!(f, "WALKING"),
        }
    }
}
