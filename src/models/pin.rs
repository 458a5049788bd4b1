use crate::models::Coordinates;
use serde::{Deserialize, Serialize};

/// A backend-registered place as it appears on the map, with aggregated
/// feedback and comment counts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MapPin {
    pub place_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub comments_cnt: u32,
    #[serde(default)]
    pub best_count: u32,
    #[serde(default)]
    pub good_count: u32,
    #[serde(default)]
    pub soso_count: u32,
    #[serde(default)]
    pub bad_count: u32,
}

impl MapPin {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.latitude,
            lng: self.longitude,
        }
    }
}

/// Axis-aligned bounding box of the visible map area.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewportBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl ViewportBounds {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_lat > self.max_lat {
            return Err(format!(
                "minLat {} is greater than maxLat {}",
                self.min_lat, self.max_lat
            ));
        }
        if !(-90.0..=90.0).contains(&self.min_lat) || !(-90.0..=90.0).contains(&self.max_lat) {
            return Err("Latitude bounds must be between -90 and 90".to_string());
        }
        if !(-180.0..=180.0).contains(&self.min_lng) || !(-180.0..=180.0).contains(&self.max_lng)
        {
            return Err("Longitude bounds must be between -180 and 180".to_string());
        }
        Ok(())
    }

    pub fn center(&self) -> Coordinates {
        Coordinates {
            lat: (self.min_lat + self.max_lat) / 2.0,
            lng: (self.min_lng + self.max_lng) / 2.0,
        }
    }

    /// Query parameters for the pin-search endpoint
    pub fn to_query(&self) -> [(&'static str, String); 4] {
        [
            ("minLat", self.min_lat.to_string()),
            ("maxLat", self.max_lat.to_string()),
            ("minLng", self.min_lng.to_string()),
            ("maxLng", self.max_lng.to_string()),
        ]
    }
}
