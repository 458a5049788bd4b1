use crate::constants::PLACE_NAME_FALLBACK;
use crate::models::Coordinates;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

/// Client-side identifier of an itinerary entry.
///
/// Unique within the day it was added to for the lifetime of the session.
/// It is not a server identifier and is never sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceId(String);

impl PlaceId {
    /// Millisecond timestamp followed by a random suffix, both base36.
    pub fn generate() -> Self {
        let millis = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000).max(0) as u64;
        let suffix: u64 = rand::random();
        PlaceId(format!("{}{}", to_base36(millis), to_base36(suffix)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlaceId {
    fn from(s: &str) -> Self {
        PlaceId(s.to_string())
    }
}

impl fmt::Display for PlaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Whether a stored travel duration is a real estimate.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EstimateQuality {
    #[default]
    Computed,
    /// The transit provider failed; the duration is a display placeholder
    Unavailable,
}

/// One stop of a day's itinerary.
///
/// `travel_duration` is the cost of reaching this stop from the previous one
/// in the same day; the first stop of a day always carries 0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaceItem {
    pub id: PlaceId,
    pub name: String,
    pub address: String,
    /// Stops loaded from a saved trip may have no coordinate
    pub location: Option<Coordinates>,
    pub travel_duration: u32,
    pub travel_duration_text: String,
    #[serde(default)]
    pub travel_estimate: EstimateQuality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_place_id: Option<i64>,
    #[serde(default)]
    pub description: String,
}

impl PlaceItem {
    pub fn clear_travel_time(&mut self) {
        self.travel_duration = 0;
        self.travel_duration_text.clear();
        self.travel_estimate = EstimateQuality::Computed;
    }

    pub fn travel_time_unavailable(&self) -> bool {
        self.travel_estimate == EstimateQuality::Unavailable
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedbackCounts {
    pub best: u32,
    pub good: u32,
    pub soso: u32,
    pub bad: u32,
}

/// The place currently shown in the side panel, either a registered pin or a
/// raw search result.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SelectedPlace {
    pub name: String,
    pub address: String,
    pub location: Option<Coordinates>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub img_urls: Vec<String>,
    /// Set when the selection is (or has become) a backend-registered place
    #[serde(default)]
    pub place_id: Option<i64>,
    #[serde(default)]
    pub comments_cnt: u32,
    #[serde(default)]
    pub feedback: Option<FeedbackCounts>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SelectionMarker {
    /// Highlight the existing pin
    Pin { place_id: i64 },
    /// Plain marker for a place the backend does not know yet
    Plain { location: Coordinates },
}

impl SelectedPlace {
    pub fn marker(&self) -> Option<SelectionMarker> {
        match (self.place_id, self.location) {
            (Some(place_id), _) => Some(SelectionMarker::Pin { place_id }),
            (None, Some(location)) => Some(SelectionMarker::Plain { location }),
            (None, None) => None,
        }
    }

    pub fn from_detail(detail: PlaceDetail, location: Coordinates) -> Self {
        let name = if detail.name.is_empty() {
            PLACE_NAME_FALLBACK.to_string()
        } else {
            detail.name
        };
        SelectedPlace {
            name,
            address: detail.address,
            location: Some(location),
            photos: Vec::new(),
            img_urls: detail.img_urls,
            place_id: Some(detail.place_id),
            comments_cnt: detail.comments_cnt,
            feedback: Some(FeedbackCounts {
                best: detail.best.unwrap_or(0),
                good: detail.good.unwrap_or(0),
                soso: detail.soso.unwrap_or(0),
                bad: detail.bad.unwrap_or(0),
            }),
        }
    }
}

/// `GET /v1/places/{placeId}` response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaceDetail {
    pub place_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub img_urls: Vec<String>,
    #[serde(default)]
    pub comments_cnt: u32,
    pub best: Option<u32>,
    pub good: Option<u32>,
    pub soso: Option<u32>,
    pub bad: Option<u32>,
}

/// `POST /v1/places` body
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPlaceRequest {
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub img_urls: Vec<String>,
}

/// What the autocomplete widget handed over when the user picked a suggestion.
/// `location` is absent when the provider had no geometry for the suggestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchCandidate {
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub location: Option<Coordinates>,
    #[serde(default)]
    pub photos: Vec<String>,
}
