use crate::constants::*;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Base URL the `/v1/...` backend paths are appended to
    pub backend_api_url: String,
    pub backend_access_token: Option<String>,
    /// Without a key, transit estimates and free-text geocoding degrade
    pub google_maps_api_key: Option<String>,
    /// Overrides the provider endpoint (proxies, test servers)
    pub google_maps_base_url: Option<String>,
    pub maps_region: String,
    pub maps_language: String,
    pub travel_time: TravelTimeConfig,
    pub reconciler: ReconcilerConfig,
}

#[derive(Debug, Clone)]
pub struct TravelTimeConfig {
    /// Average speed assumed for WALKING legs
    pub walking_speed_kmh: f64,

    /// Average speed assumed for DRIVING legs
    pub driving_speed_kmh: f64,

    /// Transit requests allowed in flight at once (the provider is rate-limited)
    pub transit_max_concurrency: usize,
}

impl Default for TravelTimeConfig {
    fn default() -> Self {
        Self {
            walking_speed_kmh: DEFAULT_WALKING_SPEED_KMH,
            driving_speed_kmh: DEFAULT_DRIVING_SPEED_KMH,
            transit_max_concurrency: DEFAULT_TRANSIT_MAX_CONCURRENCY,
        }
    }
}

impl TravelTimeConfig {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let config = Self {
            walking_speed_kmh: env::var("WALKING_SPEED_KMH")
                .unwrap_or_else(|_| defaults.walking_speed_kmh.to_string())
                .parse()
                .map_err(|_| "Invalid WALKING_SPEED_KMH")?,

            driving_speed_kmh: env::var("DRIVING_SPEED_KMH")
                .unwrap_or_else(|_| defaults.driving_speed_kmh.to_string())
                .parse()
                .map_err(|_| "Invalid DRIVING_SPEED_KMH")?,

            transit_max_concurrency: env::var("TRANSIT_MAX_CONCURRENCY")
                .unwrap_or_else(|_| defaults.transit_max_concurrency.to_string())
                .parse()
                .map_err(|_| "Invalid TRANSIT_MAX_CONCURRENCY")?,
        };

        if !is_positive(config.walking_speed_kmh) || !is_positive(config.driving_speed_kmh) {
            return Err("Travel speeds must be positive".to_string());
        }
        if config.transit_max_concurrency == 0 {
            return Err("TRANSIT_MAX_CONCURRENCY must be at least 1".to_string());
        }

        Ok(config)
    }
}

/// Finite and above zero; "NaN" and "inf" parse as f64 but are not usable
fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Per-axis degree tolerance for treating a search result as sitting on a pin
    pub exact_match_tolerance_deg: f64,

    /// Nearest pin within this many meters is accepted when no exact match exists
    pub nearest_match_radius_m: f64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            exact_match_tolerance_deg: DEFAULT_EXACT_MATCH_TOLERANCE_DEG,
            nearest_match_radius_m: DEFAULT_NEAREST_MATCH_RADIUS_M,
        }
    }
}

impl ReconcilerConfig {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let config = Self {
            exact_match_tolerance_deg: env::var("SEARCH_EXACT_MATCH_TOLERANCE_DEG")
                .unwrap_or_else(|_| defaults.exact_match_tolerance_deg.to_string())
                .parse()
                .map_err(|_| "Invalid SEARCH_EXACT_MATCH_TOLERANCE_DEG")?,

            nearest_match_radius_m: env::var("SEARCH_NEAREST_MATCH_RADIUS_M")
                .unwrap_or_else(|_| defaults.nearest_match_radius_m.to_string())
                .parse()
                .map_err(|_| "Invalid SEARCH_NEAREST_MATCH_RADIUS_M")?,
        };

        if !is_positive(config.exact_match_tolerance_deg) || !is_positive(config.nearest_match_radius_m) {
            return Err("Search match tolerances must be positive".to_string());
        }

        Ok(config)
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenv::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| "Invalid PORT")?,
            backend_api_url: env::var("BACKEND_API_URL")
                .map_err(|_| "BACKEND_API_URL must be set")?
                .trim_end_matches('/')
                .to_string(),
            backend_access_token: env::var("BACKEND_ACCESS_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
            google_maps_api_key: env::var("GOOGLE_MAPS_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            google_maps_base_url: env::var("GOOGLE_MAPS_BASE_URL")
                .ok()
                .map(|u| u.trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty()),
            maps_region: env::var("MAPS_REGION")
                .unwrap_or_else(|_| DEFAULT_MAPS_REGION.to_string()),
            maps_language: env::var("MAPS_LANGUAGE")
                .unwrap_or_else(|_| DEFAULT_MAPS_LANGUAGE.to_string()),
            travel_time: TravelTimeConfig::from_env()?,
            reconciler: ReconcilerConfig::from_env()?,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "BACKEND_API_URL",
            "BACKEND_ACCESS_TOKEN",
            "GOOGLE_MAPS_API_KEY",
            "GOOGLE_MAPS_BASE_URL",
            "WALKING_SPEED_KMH",
            "DRIVING_SPEED_KMH",
            "TRANSIT_MAX_CONCURRENCY",
            "SEARCH_EXACT_MATCH_TOLERANCE_DEG",
            "SEARCH_NEAREST_MATCH_RADIUS_M",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn defaults_when_env_is_silent() {
        clear_env();
        let travel = TravelTimeConfig::from_env().unwrap();
        assert_eq!(travel.walking_speed_kmh, 4.0);
        assert_eq!(travel.driving_speed_kmh, 30.0);
        assert_eq!(travel.transit_max_concurrency, 1);

        let reconciler = ReconcilerConfig::from_env().unwrap();
        assert_eq!(reconciler.exact_match_tolerance_deg, 1e-4);
        assert_eq!(reconciler.nearest_match_radius_m, 50.0);
    }

    #[test]
    #[serial]
    fn rejects_non_positive_values() {
        clear_env();
        env::set_var("TRANSIT_MAX_CONCURRENCY", "0");
        assert!(TravelTimeConfig::from_env().is_err());
        env::remove_var("TRANSIT_MAX_CONCURRENCY");

        env::set_var("SEARCH_NEAREST_MATCH_RADIUS_M", "-5");
        assert!(ReconcilerConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn rejects_nan_and_infinite_values() {
        clear_env();
        env::set_var("WALKING_SPEED_KMH", "NaN");
        assert!(TravelTimeConfig::from_env().is_err());
        env::set_var("WALKING_SPEED_KMH", "inf");
        assert!(TravelTimeConfig::from_env().is_err());
        env::remove_var("WALKING_SPEED_KMH");

        env::set_var("SEARCH_EXACT_MATCH_TOLERANCE_DEG", "NaN");
        assert!(ReconcilerConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn backend_url_is_required_and_trimmed() {
        clear_env();
        assert!(Config::from_env().is_err());

        env::set_var("BACKEND_API_URL", "http://localhost:8080/api/");
        let config = Config::from_env().unwrap();
        assert_eq!(config.backend_api_url, "http://localhost:8080/api");
        assert!(config.google_maps_api_key.is_none());
        assert!(config.google_maps_base_url.is_none());

        env::set_var("GOOGLE_MAPS_BASE_URL", "http://127.0.0.1:9000/maps/api/");
        let config = Config::from_env().unwrap();
        assert_eq!(
            config.google_maps_base_url.as_deref(),
            Some("http://127.0.0.1:9000/maps/api")
        );
        clear_env();
    }
}
