use crate::error::{AppError, Result};
use crate::models::course::{CreateTravelRequest, UpdateTravelRequest};
use crate::models::place::RegisterPlaceRequest;
use crate::models::{MapPin, PlaceDetail, TravelCourse, ViewportBounds};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;

/// The parts of the travel backend the planner talks to.
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// `GET /v1/map/places/pin` for the given viewport
    async fn fetch_pins(&self, bounds: &ViewportBounds) -> Result<Vec<MapPin>>;

    /// `GET /v1/places/{placeId}`
    async fn fetch_place(&self, place_id: i64) -> Result<PlaceDetail>;

    /// `POST /v1/places`, returns the assigned placeId
    async fn register_place(&self, request: &RegisterPlaceRequest) -> Result<i64>;

    /// `POST /v1/travel`, returns the travelId
    async fn create_travel(&self, request: &CreateTravelRequest) -> Result<i64>;

    /// `POST /v1/travel/{travelId}/course`
    async fn register_courses(&self, travel_id: i64, courses: &[TravelCourse]) -> Result<()>;

    /// `PUT /v1/travel/{travelId}`
    async fn update_travel(&self, travel_id: i64, request: &UpdateTravelRequest) -> Result<()>;
}

/// Authorization is forwarded everywhere except the auth endpoints themselves.
pub fn forwards_authorization(path: &str) -> bool {
    !path.trim_start_matches('/').starts_with("v1/auth")
}

/// Endpoints that hand back a new id answer either `{"data": id}` or a bare id.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdResponse {
    Envelope { data: i64 },
    Bare(i64),
}

impl IdResponse {
    fn id(&self) -> i64 {
        match self {
            IdResponse::Envelope { data } => *data,
            IdResponse::Bare(id) => *id,
        }
    }
}

#[derive(Clone)]
pub struct HttpBackendClient {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl HttpBackendClient {
    pub fn new(base_url: String, access_token: Option<String>) -> Self {
        HttpBackendClient {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let path = path.trim_start_matches('/');
        let url = format!("{}/{}", self.base_url, path);
        let request = self.client.request(method, url);

        match &self.access_token {
            Some(token) if forwards_authorization(path) => request.bearer_auth(token),
            _ => request,
        }
    }

    async fn check(response: Response, what: &str) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        tracing::warn!(status = %status, "{} failed: {}", what, error_text);
        Err(AppError::Backend(format!(
            "{}: HTTP {}: {}",
            what, status, error_text
        )))
    }

    async fn read_id(response: Response, what: &str) -> Result<i64> {
        let id: IdResponse = response
            .json()
            .await
            .map_err(|e| AppError::Backend(format!("{}: failed to parse id: {}", what, e)))?;
        Ok(id.id())
    }
}

#[async_trait]
impl BackendApi for HttpBackendClient {
    async fn fetch_pins(&self, bounds: &ViewportBounds) -> Result<Vec<MapPin>> {
        let response = self
            .request(Method::GET, "v1/map/places/pin")
            .query(&bounds.to_query())
            .send()
            .await?;
        let response = Self::check(response, "Pin search").await?;

        let data: Value = response
            .json()
            .await
            .map_err(|e| AppError::Backend(format!("Pin search: invalid JSON: {}", e)))?;

        if !data.is_array() {
            return Err(AppError::Backend(format!(
                "Pin search returned a non-array response: {}",
                data
            )));
        }

        serde_json::from_value(data)
            .map_err(|e| AppError::Backend(format!("Pin search: malformed pin: {}", e)))
    }

    async fn fetch_place(&self, place_id: i64) -> Result<PlaceDetail> {
        let response = self
            .request(Method::GET, &format!("v1/places/{}", place_id))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("Place {} not found", place_id)));
        }
        let response = Self::check(response, "Place detail").await?;

        response
            .json()
            .await
            .map_err(|e| AppError::Backend(format!("Place detail: invalid body: {}", e)))
    }

    async fn register_place(&self, request: &RegisterPlaceRequest) -> Result<i64> {
        let response = self
            .request(Method::POST, "v1/places")
            .json(request)
            .send()
            .await?;
        let response = Self::check(response, "Place registration").await?;
        Self::read_id(response, "Place registration").await
    }

    async fn create_travel(&self, request: &CreateTravelRequest) -> Result<i64> {
        let response = self
            .request(Method::POST, "v1/travel")
            .json(request)
            .send()
            .await?;
        let response = Self::check(response, "Travel creation").await?;
        Self::read_id(response, "Travel creation").await
    }

    async fn register_courses(&self, travel_id: i64, courses: &[TravelCourse]) -> Result<()> {
        let response = self
            .request(Method::POST, &format!("v1/travel/{}/course", travel_id))
            .json(courses)
            .send()
            .await?;
        Self::check(response, "Course registration").await?;
        Ok(())
    }

    async fn update_travel(&self, travel_id: i64, request: &UpdateTravelRequest) -> Result<()> {
        let response = self
            .request(Method::PUT, &format!("v1/travel/{}", travel_id))
            .json(request)
            .send()
            .await?;
        Self::check(response, "Travel update").await?;
        Ok(())
    }
}
