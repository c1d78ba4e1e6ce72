use serde::{Deserialize, Serialize};

/// User-facing message for every failed lookup, whatever the cause.
pub const LOOKUP_FAILED_MESSAGE: &str = "City not found. Please try again.";

/// Base URL for provider-hosted condition icons.
pub const DEFAULT_ICON_BASE_URL: &str = "http://openweathermap.org/img/wn";

/// A single city search, created once per explicit submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherQuery {
    pub city_name: String,
}

impl WeatherQuery {
    pub fn new(city_name: impl Into<String>) -> Self {
        Self { city_name: city_name.into() }
    }
}

/// Current conditions for a city, mapped from a successful provider response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub location_name: String,
    pub country_code: String,
    pub temperature_c: i32,
    pub feels_like_c: i32,
    pub humidity_pct: u8,
    pub wind_speed_mps: f64,
    pub pressure_hpa: u32,
    pub condition: String,
    pub icon_key: String,
}

impl WeatherReport {
    /// Icon image URL on the provider's default image host.
    pub fn icon_url(&self) -> String {
        self.icon_url_with_base(DEFAULT_ICON_BASE_URL)
    }

    pub fn icon_url_with_base(&self, base: &str) -> String {
        format!("{}/{}@2x.png", base.trim_end_matches('/'), self.icon_key)
    }
}

/// Progress of the most recent lookup.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LookupOutcome {
    #[default]
    Idle,
    Pending,
    Success(WeatherReport),
    Failure(String),
}

impl LookupOutcome {
    pub fn failed() -> Self {
        Self::Failure(LOOKUP_FAILED_MESSAGE.to_string())
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// `true` once a lookup has resolved, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success(_) | Self::Failure(_))
    }

    pub fn report(&self) -> Option<&WeatherReport> {
        match self {
            Self::Success(report) => Some(report),
            _ => None,
        }
    }

    pub fn failure_message(&self) -> Option<&str> {
        match self {
            Self::Failure(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Rounds to the nearest integer with halves going up, so `-2.5` becomes `-2`.
pub fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}
