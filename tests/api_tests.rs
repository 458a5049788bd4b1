use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

mod common;
use common::{coords, pin, StubBackend, StubGeocoder};

fn setup_test_app(backend: Arc<StubBackend>) -> Router {
    let geocoder = Arc::new(StubGeocoder::with(
        "광화문",
        "대한민국 서울특별시 종로구 세종로",
        coords(37.5759, 126.9769),
    ));
    tripmap::routes::create_router(common::test_state(backend, geocoder))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn busan_session() -> Value {
    json!({
        "mode": "create",
        "plan": {"region": "Busan", "startDate": "2025-03-25", "endDate": "2025-03-27"}
    })
}

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = setup_test_app(Arc::new(StubBackend::default()));

    let (status, json) = send(&app, "GET", "/debug/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["checks"]["session"]["mode"], "create");
    assert_eq!(json["checks"]["pin_count"], 0);
}

#[tokio::test]
async fn test_plan_validation() {
    let app = setup_test_app(Arc::new(StubBackend::default()));

    let (status, json) = send(
        &app,
        "PUT",
        "/plan",
        Some(json!({"region": "Busan", "startDate": "2025-03-27", "endDate": "2025-03-25"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["message"].as_str().unwrap().contains("after"));
}

#[tokio::test]
async fn test_itinerary_flow() {
    let app = setup_test_app(Arc::new(StubBackend::default()));

    let (status, view) = send(&app, "PUT", "/session", Some(busan_session())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["dateRange"].as_array().unwrap().len(), 3);
    assert_eq!(view["transportMode"], "DRIVING");

    let (status, added) = send(
        &app,
        "POST",
        "/itinerary/places",
        Some(json!({"place": {"name": "해운대", "address": "부산광역시 해운대구",
            "location": {"lat": 35.1587, "lng": 129.1604}}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let first_id = added["added"].as_str().unwrap().to_string();
    assert_eq!(added["itinerary"]["markers"][0]["isNew"], true);

    let (_, added) = send(
        &app,
        "POST",
        "/itinerary/places",
        Some(json!({"place": {"name": "광안리", "address": "부산광역시 수영구",
            "location": {"lat": 35.1532, "lng": 129.1186}}})),
    )
    .await;
    let markers = added["itinerary"]["markers"].as_array().unwrap();
    assert_eq!(markers.len(), 2);
    assert_eq!(markers[0]["travelDuration"], 0);
    assert!(markers[1]["travelDuration"].as_u64().unwrap() > 0);

    let (status, view) = send(
        &app,
        "DELETE",
        &format!("/itinerary/days/2025-03-25/places/{}", first_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["markers"].as_array().unwrap().len(), 1);
    assert_eq!(view["markers"][0]["travelDuration"], 0);
    assert_eq!(view["markers"][0]["travelDurationText"], "");

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/itinerary/days/2025-03-25/places/{}", first_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_transit_failure_shows_sentinel() {
    let app = setup_test_app(Arc::new(StubBackend::default()));
    send(&app, "PUT", "/session", Some(busan_session())).await;

    for (name, lat, lng) in [("해운대", 35.1587, 129.1604), ("광안리", 35.1532, 129.1186)] {
        send(
            &app,
            "POST",
            "/itinerary/places",
            Some(json!({"place": {"name": name, "address": "", "location": {"lat": lat, "lng": lng}}})),
        )
        .await;
    }

    let (status, view) = send(
        &app,
        "PUT",
        "/itinerary/transport-mode",
        Some(json!({"mode": "TRANSIT"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["transportMode"], "TRANSIT");
    assert_eq!(view["markers"][1]["travelDurationText"], "계산 불가");
    assert_eq!(view["totalTravelMinutes"], 0);
    assert_eq!(view["markers"][1]["travelEstimate"], "unavailable");
    assert_eq!(view["totalTravelIncomplete"], true);
}

#[tokio::test]
async fn test_invalid_path_date() {
    let app = setup_test_app(Arc::new(StubBackend::default()));
    let (status, _) = send(&app, "POST", "/itinerary/days/March-25/reset", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_failure_is_user_facing() {
    let backend = Arc::new(StubBackend::default());
    backend.fail_writes.store(true, Ordering::SeqCst);
    let app = setup_test_app(backend);
    send(&app, "PUT", "/session", Some(busan_session())).await;

    let (status, json) = send(&app, "POST", "/itinerary/register", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["message"], "여행 일정 등록에 실패했습니다.");
}

#[tokio::test]
async fn test_register_success_ends_session() {
    let backend = Arc::new(StubBackend::default());
    let app = setup_test_app(backend.clone());
    send(&app, "PUT", "/session", Some(busan_session())).await;

    let (status, json) = send(&app, "POST", "/itinerary/register", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["travelId"], 100);
    assert_eq!(backend.created.lock().unwrap().len(), 1);

    let (_, view) = send(&app, "GET", "/itinerary", None).await;
    assert!(view["plan"].is_null());
}

#[tokio::test]
async fn test_viewport_rejects_inverted_bounds() {
    let app = setup_test_app(Arc::new(StubBackend::default()));
    let (status, _) = send(
        &app,
        "POST",
        "/map/viewport",
        Some(json!({"minLat": 37.6, "maxLat": 37.4, "minLng": 126.9, "maxLng": 127.1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_then_settle_selects_pin() {
    let backend = Arc::new(StubBackend::with_pins(vec![pin(5, coords(37.5759, 126.9769))]));
    let app = setup_test_app(backend);

    let (status, json) = send(&app, "POST", "/search/text", Some(json!({"query": "광화문"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["command"]["type"], "panTo");
    assert_eq!(json["command"]["zoom"], 15);

    let (status, map) = send(
        &app,
        "POST",
        "/map/viewport",
        Some(json!({"minLat": 37.5, "maxLat": 37.6, "minLng": 126.9, "maxLng": 127.0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(map["pins"].as_array().unwrap().len(), 1);
    assert_eq!(map["selection"]["place"]["placeId"], 5);
    assert_eq!(map["selection"]["marker"]["kind"], "pin");

    // a new session starts without a selection
    send(&app, "PUT", "/session", Some(busan_session())).await;
    let (_, selection) = send(&app, "GET", "/selection", None).await;
    assert!(selection["place"].is_null());
}

#[tokio::test]
async fn test_empty_text_search_does_nothing() {
    let app = setup_test_app(Arc::new(StubBackend::default()));
    let (status, json) = send(&app, "POST", "/search/text", Some(json!({"query": "  "}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["command"].is_null());
}

#[tokio::test]
async fn test_selected_place_is_added_to_current_day() {
    let backend = Arc::new(StubBackend::with_pins(vec![]));
    let app = setup_test_app(backend.clone());
    send(&app, "PUT", "/session", Some(busan_session())).await;

    send(
        &app,
        "POST",
        "/search/autocomplete",
        Some(json!({"name": "광화문", "address": "서울특별시 종로구",
            "location": {"lat": 37.5759, "lng": 126.9769}})),
    )
    .await;
    send(
        &app,
        "POST",
        "/map/viewport",
        Some(json!({"minLat": 37.5, "maxLat": 37.6, "minLng": 126.9, "maxLng": 127.0})),
    )
    .await;

    let (status, registered) = send(&app, "POST", "/selection/register", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(registered["placeId"], 100);
    assert_eq!(registered["selection"]["marker"]["kind"], "pin");

    let (_, added) = send(&app, "POST", "/itinerary/places", Some(json!({}))).await;
    assert_eq!(added["itinerary"]["markers"][0]["name"], "광화문");
    assert_eq!(added["itinerary"]["markers"][0]["serverPlaceId"], 100);
}

#[tokio::test]
async fn test_end_session() {
    let app = setup_test_app(Arc::new(StubBackend::default()));
    send(&app, "PUT", "/session", Some(busan_session())).await;

    let (status, _) = send(&app, "DELETE", "/session", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, view) = send(&app, "GET", "/itinerary", None).await;
    assert!(view["dateRange"].as_array().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_map_stays_usable_while_a_place_registers() {
    let backend = Arc::new(StubBackend::with_pins(vec![]));
    *backend.register_delay.lock().unwrap() = Duration::from_secs(1);
    let app = setup_test_app(backend.clone());

    send(
        &app,
        "POST",
        "/search/autocomplete",
        Some(json!({"name": "광화문", "address": "서울특별시 종로구",
            "location": {"lat": 37.5759, "lng": 126.9769}})),
    )
    .await;
    send(
        &app,
        "POST",
        "/map/viewport",
        Some(json!({"minLat": 37.5, "maxLat": 37.6, "minLng": 126.9, "maxLng": 127.0})),
    )
    .await;

    let registering = {
        let app = app.clone();
        tokio::spawn(async move { send(&app, "POST", "/selection/register", None).await })
    };
    while backend.registered_places.lock().unwrap().is_empty() {
        tokio::task::yield_now().await;
    }

    let (status, selection) = tokio::time::timeout(
        Duration::from_millis(10),
        send(&app, "GET", "/selection", None),
    )
    .await
    .expect("selection should be readable during registration");
    assert_eq!(status, StatusCode::OK);
    assert!(selection["place"]["placeId"].is_null());

    let (status, registered) = registering.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(registered["placeId"], 100);
    assert_eq!(registered["selection"]["place"]["placeId"], 100);
}
