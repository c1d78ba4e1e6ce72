//! Core library for the `cityweather` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather provider behind a `WeatherProvider` seam
//! - `WeatherLookupService`, which tracks the outcome of city lookups
//! - Shared domain models (queries, reports, outcomes)
//!
//! It is used by `cityweather-cli`, but can also be reused by other front ends.

pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod service;

pub use config::Config;
pub use error::LookupError;
pub use model::{LOOKUP_FAILED_MESSAGE, LookupOutcome, WeatherQuery, WeatherReport};
pub use provider::{OpenWeatherProvider, WeatherProvider};
pub use service::WeatherLookupService;
