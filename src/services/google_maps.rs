use crate::constants::{DEFAULT_MAPS_LANGUAGE, DEFAULT_MAPS_REGION};
use crate::error::{AppError, Result};
use crate::models::{Coordinates, TransportMode};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

pub const GOOGLE_MAPS_BASE_URL: &str = "https://maps.googleapis.com/maps/api";

/// One origin/destination element of a distance-matrix answer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitElement {
    /// Per-element provider status ("OK", "ZERO_RESULTS", "NOT_FOUND", ...)
    pub status: String,
    pub duration_seconds: Option<f64>,
    pub duration_text: Option<String>,
}

impl TransitElement {
    pub fn is_ok(&self) -> bool {
        self.status == "OK"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeResult {
    pub formatted_address: String,
    pub location: Coordinates,
}

/// "coordinate pair -> transit duration"
#[async_trait]
pub trait TransitTimeProvider: Send + Sync {
    async fn transit_duration(
        &self,
        origin: &Coordinates,
        destination: &Coordinates,
    ) -> Result<TransitElement>;
}

/// "search text -> geocoded coordinate"; `Ok(None)` when nothing matched
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, query: &str) -> Result<Option<GeocodeResult>>;
}

#[derive(Clone)]
pub struct GoogleMapsClient {
    client: Client,
    api_key: String,
    base_url: String,
    region: String,
    language: String,
}

impl GoogleMapsClient {
    pub fn new(api_key: String) -> Self {
        GoogleMapsClient {
            client: Client::new(),
            api_key,
            base_url: GOOGLE_MAPS_BASE_URL.to_string(),
            region: DEFAULT_MAPS_REGION.to_string(),
            language: DEFAULT_MAPS_LANGUAGE.to_string(),
        }
    }

    pub fn with_config(api_key: String, base_url: String, region: String, language: String) -> Self {
        GoogleMapsClient {
            client: Client::new(),
            api_key,
            base_url,
            region,
            language,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}/{}/json", self.base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[
                ("region", self.region.as_str()),
                ("language", self.language.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::MapsApi(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(
                status = %status,
                endpoint,
                "Maps API HTTP error {}: {}",
                status, error_text
            );
            return Err(AppError::MapsApi(format!("HTTP {}: {}", status, error_text)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::MapsApi(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl TransitTimeProvider for GoogleMapsClient {
    async fn transit_duration(
        &self,
        origin: &Coordinates,
        destination: &Coordinates,
    ) -> Result<TransitElement> {
        let origins = origin.to_query_value();
        let destinations = destination.to_query_value();

        tracing::debug!(
            origin = %origins,
            destination = %destinations,
            "Distance matrix request (transit)"
        );

        let matrix: DistanceMatrixResponse = self
            .get_json(
                "distancematrix",
                &[
                    ("origins", origins.as_str()),
                    ("destinations", destinations.as_str()),
                    ("mode", TransportMode::Transit.provider_mode()),
                ],
            )
            .await?;

        if matrix.status != "OK" {
            return Err(AppError::MapsApi(format!(
                "Distance matrix status {}",
                matrix.status
            )));
        }

        let element = matrix
            .rows
            .into_iter()
            .next()
            .and_then(|row| row.elements.into_iter().next());

        Ok(match element {
            Some(element) => TransitElement {
                status: element.status,
                duration_seconds: element.duration.as_ref().map(|d| d.value),
                duration_text: element.duration.map(|d| d.text),
            },
            None => TransitElement {
                status: "NOT_FOUND".to_string(),
                duration_seconds: None,
                duration_text: None,
            },
        })
    }
}

#[async_trait]
impl Geocoder for GoogleMapsClient {
    async fn geocode(&self, query: &str) -> Result<Option<GeocodeResult>> {
        tracing::debug!(query, "Geocoding request");

        let geocode: GeocodeResponse = self.get_json("geocode", &[("address", query)]).await?;

        match geocode.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Ok(None),
            other => {
                return Err(AppError::MapsApi(format!("Geocoding status {}", other)));
            }
        }

        Ok(geocode.results.into_iter().next().and_then(|result| {
            Coordinates::new(result.geometry.location.lat, result.geometry.location.lng)
                .ok()
                .map(|location| GeocodeResult {
                    formatted_address: result.formatted_address.unwrap_or_default(),
                    location,
                })
        }))
    }
}

/// Stand-in used when no API key is configured: every call fails, so transit
/// legs degrade and free-text searches end idle.
#[derive(Clone, Default)]
pub struct DisabledMapsClient;

#[async_trait]
impl TransitTimeProvider for DisabledMapsClient {
    async fn transit_duration(&self, _: &Coordinates, _: &Coordinates) -> Result<TransitElement> {
        Err(AppError::MapsApi(
            "GOOGLE_MAPS_API_KEY is not configured".to_string(),
        ))
    }
}

#[async_trait]
impl Geocoder for DisabledMapsClient {
    async fn geocode(&self, _: &str) -> Result<Option<GeocodeResult>> {
        Err(AppError::MapsApi(
            "GOOGLE_MAPS_API_KEY is not configured".to_string(),
        ))
    }
}

// Google Maps API response types

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    status: String,
    #[serde(default)]
    rows: Vec<DistanceMatrixRow>,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixRow {
    #[serde(default)]
    elements: Vec<DistanceMatrixElement>,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixElement {
    status: String,
    duration: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    value: f64, // seconds
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeApiResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeApiResult {
    formatted_address: Option<String>,
    geometry: GeocodeGeometry,
}

#[derive(Debug, Deserialize)]
struct GeocodeGeometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}
