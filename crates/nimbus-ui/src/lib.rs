//! View model and presentation for Nimbus.
//!
//! `models` holds the fetch-cycle state and its reducer, `services` runs the
//! cycles, `views` turns state into something printable.

pub mod error_mapping;
pub mod models;
pub mod services;
pub mod views;

pub use models::weather_model::{WeatherAction, WeatherState, WeatherViewModel};
pub use services::{WeatherServiceMessage, WeatherServices};
pub use views::weather_view::{render, Screen};
