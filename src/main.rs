use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tripmap::config::Config;
use tripmap::services::backend::{BackendApi, HttpBackendClient};
use tripmap::services::google_maps::{
    DisabledMapsClient, Geocoder, GoogleMapsClient, TransitTimeProvider, GOOGLE_MAPS_BASE_URL,
};
use tripmap::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tripmap=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| format!("Failed to load configuration: {}", e))?;

    tracing::info!("Starting tripmap planner service");
    tracing::info!(backend = %config.backend_api_url, "Configuration loaded successfully");

    let backend: Arc<dyn BackendApi> = Arc::new(HttpBackendClient::new(
        config.backend_api_url.clone(),
        config.backend_access_token.clone(),
    ));

    // Transit estimates and free-text geocoding need the maps key; without it
    // both degrade the same way a provider outage would
    let (transit, geocoder): (Arc<dyn TransitTimeProvider>, Arc<dyn Geocoder>) =
        match config.google_maps_api_key {
            Some(ref api_key) => {
                let base_url = config
                    .google_maps_base_url
                    .clone()
                    .unwrap_or_else(|| GOOGLE_MAPS_BASE_URL.to_string());
                let client = Arc::new(GoogleMapsClient::with_config(
                    api_key.clone(),
                    base_url,
                    config.maps_region.clone(),
                    config.maps_language.clone(),
                ));
                let transit: Arc<dyn TransitTimeProvider> = client.clone();
                let geocoder: Arc<dyn Geocoder> = client;
                (transit, geocoder)
            }
            None => {
                tracing::warn!(
                    "GOOGLE_MAPS_API_KEY not set. Transit estimates and text search are unavailable."
                );
                let transit: Arc<dyn TransitTimeProvider> = Arc::new(DisabledMapsClient);
                let geocoder: Arc<dyn Geocoder> = Arc::new(DisabledMapsClient);
                (transit, geocoder)
            }
        };

    let state = Arc::new(AppState::new(
        backend,
        transit,
        geocoder,
        config.travel_time.clone(),
        config.reconciler.clone(),
    ));

    // Build router with CORS and tracing
    let app = Router::new()
        .nest("/api/v1", tripmap::routes::create_router(state))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = config.server_address();
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
