use async_trait::async_trait;
use std::fmt::Debug;

use crate::model::WeatherReport;

pub mod openweather;

pub use openweather::OpenWeatherProvider;

/// Source of current weather for a city.
///
/// Implementations report failures however they like; the lookup service
/// collapses every error into a single generic failure.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current_weather(&self, city: &str) -> anyhow::Result<WeatherReport>;
}
