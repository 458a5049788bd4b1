use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tripmap::config::{ReconcilerConfig, TravelTimeConfig};
use tripmap::models::course::{CreateTravelRequest, UpdateTravelRequest};
use tripmap::models::place::RegisterPlaceRequest;
use tripmap::models::{Coordinates, MapPin, PlaceDetail, SelectedPlace, TravelCourse, ViewportBounds};
use tripmap::services::backend::BackendApi;
use tripmap::services::google_maps::{GeocodeResult, Geocoder, TransitElement, TransitTimeProvider};
use tripmap::services::itinerary::ItineraryStore;
use tripmap::services::travel_time::TravelTimeEstimator;
use tripmap::{AppError, AppState, Result};

/// In-memory backend recording every write it receives
#[allow(dead_code)]
pub struct StubBackend {
    pub pins: Mutex<Vec<MapPin>>,
    pub fail_pins: AtomicBool,
    pub places: Mutex<HashMap<i64, PlaceDetail>>,
    pub fail_writes: AtomicBool,
    pub next_id: AtomicI64,
    pub pin_requests: AtomicUsize,
    pub place_requests: AtomicUsize,
    pub created: Mutex<Vec<CreateTravelRequest>>,
    pub courses: Mutex<Vec<(i64, Vec<TravelCourse>)>>,
    pub updates: Mutex<Vec<(i64, UpdateTravelRequest)>>,
    pub registered_places: Mutex<Vec<RegisterPlaceRequest>>,
    /// How long `register_place` takes to answer after recording the request
    pub register_delay: Mutex<Duration>,
}

impl Default for StubBackend {
    fn default() -> Self {
        StubBackend {
            pins: Mutex::new(Vec::new()),
            fail_pins: AtomicBool::new(false),
            places: Mutex::new(HashMap::new()),
            fail_writes: AtomicBool::new(false),
            next_id: AtomicI64::new(100),
            pin_requests: AtomicUsize::new(0),
            place_requests: AtomicUsize::new(0),
            created: Mutex::new(Vec::new()),
            courses: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
            registered_places: Mutex::new(Vec::new()),
            register_delay: Mutex::new(Duration::ZERO),
        }
    }
}

#[allow(dead_code)]
impl StubBackend {
    pub fn with_pins(pins: Vec<MapPin>) -> Self {
        let backend = StubBackend::default();
        for pin in &pins {
            backend.add_place_detail(pin.place_id, &format!("place {}", pin.place_id));
        }
        *backend.pins.lock().unwrap() = pins;
        backend
    }

    pub fn add_place_detail(&self, place_id: i64, name: &str) {
        self.places.lock().unwrap().insert(
            place_id,
            PlaceDetail {
                place_id,
                name: name.to_string(),
                address: "부산광역시 해운대구".to_string(),
                latitude: None,
                longitude: None,
                img_urls: vec![],
                comments_cnt: 3,
                best: Some(2),
                good: Some(1),
                soso: None,
                bad: None,
            },
        );
    }

    fn check_writes(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Backend("HTTP 500: stub failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BackendApi for StubBackend {
    async fn fetch_pins(&self, _bounds: &ViewportBounds) -> Result<Vec<MapPin>> {
        self.pin_requests.fetch_add(1, Ordering::SeqCst);
        if self.fail_pins.load(Ordering::SeqCst) {
            return Err(AppError::Backend("Pin search returned a non-array response".to_string()));
        }
        Ok(self.pins.lock().unwrap().clone())
    }

    async fn fetch_place(&self, place_id: i64) -> Result<PlaceDetail> {
        self.place_requests.fetch_add(1, Ordering::SeqCst);
        self.places
            .lock()
            .unwrap()
            .get(&place_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Place {} not found", place_id)))
    }

    async fn register_place(&self, request: &RegisterPlaceRequest) -> Result<i64> {
        self.check_writes()?;
        self.registered_places.lock().unwrap().push(request.clone());
        let delay = *self.register_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn create_travel(&self, request: &CreateTravelRequest) -> Result<i64> {
        self.check_writes()?;
        self.created.lock().unwrap().push(request.clone());
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn register_courses(&self, travel_id: i64, courses: &[TravelCourse]) -> Result<()> {
        self.check_writes()?;
        self.courses
            .lock()
            .unwrap()
            .push((travel_id, courses.to_vec()));
        Ok(())
    }

    async fn update_travel(&self, travel_id: i64, request: &UpdateTravelRequest) -> Result<()> {
        self.check_writes()?;
        self.updates
            .lock()
            .unwrap()
            .push((travel_id, request.clone()));
        Ok(())
    }
}

/// Transit provider answering with a fixed element after `delay`, counting
/// how many calls overlap.
#[allow(dead_code)]
pub struct StubTransit {
    pub status: Mutex<String>,
    pub seconds: f64,
    pub text: Option<String>,
    pub fail: AtomicBool,
    pub delay: Duration,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

#[allow(dead_code)]
impl StubTransit {
    pub fn ok(seconds: f64, text: &str) -> Self {
        StubTransit {
            status: Mutex::new("OK".to_string()),
            seconds,
            text: Some(text.to_string()),
            fail: AtomicBool::new(false),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        let stub = StubTransit::ok(0.0, "");
        stub.fail.store(true, Ordering::SeqCst);
        stub
    }

    pub fn with_status(status: &str) -> Self {
        let stub = StubTransit::ok(0.0, "");
        *stub.status.lock().unwrap() = status.to_string();
        stub
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl TransitTimeProvider for StubTransit {
    async fn transit_duration(&self, _: &Coordinates, _: &Coordinates) -> Result<TransitElement> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::MapsApi("Request failed: connection reset".to_string()));
        }
        let status = self.status.lock().unwrap().clone();
        let ok = status == "OK";
        Ok(TransitElement {
            status,
            duration_seconds: ok.then_some(self.seconds),
            duration_text: if ok { self.text.clone() } else { None },
        })
    }
}

/// Geocoder backed by a fixed table; unknown queries find nothing
#[allow(dead_code)]
#[derive(Default)]
pub struct StubGeocoder {
    pub results: Mutex<HashMap<String, GeocodeResult>>,
    pub fail: AtomicBool,
}

#[allow(dead_code)]
impl StubGeocoder {
    pub fn with(query: &str, address: &str, location: Coordinates) -> Self {
        let geocoder = StubGeocoder::default();
        geocoder.results.lock().unwrap().insert(
            query.to_string(),
            GeocodeResult {
                formatted_address: address.to_string(),
                location,
            },
        );
        geocoder
    }
}

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<GeocodeResult>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::MapsApi("Geocoding status REQUEST_DENIED".to_string()));
        }
        Ok(self.results.lock().unwrap().get(query).cloned())
    }
}

#[allow(dead_code)]
pub fn coords(lat: f64, lng: f64) -> Coordinates {
    Coordinates::new(lat, lng).unwrap()
}

/// A coordinate `meters` due north of `origin`
#[allow(dead_code)]
pub fn north_of(origin: Coordinates, meters: f64) -> Coordinates {
    let delta = (meters / (tripmap::constants::EARTH_RADIUS_KM * 1000.0)).to_degrees();
    coords(origin.lat + delta, origin.lng)
}

#[allow(dead_code)]
pub fn pin(place_id: i64, location: Coordinates) -> MapPin {
    MapPin {
        place_id,
        latitude: location.lat,
        longitude: location.lng,
        comments_cnt: 0,
        best_count: 0,
        good_count: 0,
        soso_count: 0,
        bad_count: 0,
    }
}

#[allow(dead_code)]
pub fn place(name: &str, location: Coordinates) -> SelectedPlace {
    SelectedPlace {
        name: name.to_string(),
        address: format!("대한민국 부산광역시 {}", name),
        location: Some(location),
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn store_with(transit: Arc<dyn TransitTimeProvider>) -> ItineraryStore {
    ItineraryStore::new(Arc::new(TravelTimeEstimator::new(
        transit,
        TravelTimeConfig::default(),
    )))
}

#[allow(dead_code)]
pub fn test_state(backend: Arc<StubBackend>, geocoder: Arc<StubGeocoder>) -> Arc<AppState> {
    Arc::new(AppState::new(
        backend,
        Arc::new(StubTransit::failing()),
        geocoder,
        TravelTimeConfig::default(),
        ReconcilerConfig::default(),
    ))
}

/// Check if we should skip real API tests
#[allow(dead_code)]
pub fn should_skip_real_api_tests() -> bool {
    std::env::var("SKIP_REAL_API_TESTS").is_ok()
}
