//! Weather data for Nimbus.
//!
//! Resolves the device location, reverse-geocodes it to a place name and
//! fetches One Call-style forecasts. All temperatures are kept in kelvin;
//! [`units`] converts them for display.

pub mod geocode;
pub mod location;
pub mod provider;
pub mod types;
pub mod units;

pub use geocode::{GeocodeClient, PlaceLookup};
pub use location::{
    DeviceClass, FixedSensor, IpSensor, LocationProvider, LocationSensor, PermissionStatus,
};
pub use nimbus_core::{EmptyResultPolicy, TemperatureUnit};
pub use provider::{ForecastSource, WeatherProvider};
pub use types::*;
