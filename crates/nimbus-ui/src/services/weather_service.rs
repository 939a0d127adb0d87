//! Weather backend: one fetch cycle per refresh.
//! Network and sensor work runs on the runtime; results come back over mpsc
//! stamped with the cycle they belong to.

use std::sync::Arc;

use nimbus_core::{AppError, Config};
use nimbus_weather::{
    Coordinate, DeviceClass, ForecastSnapshot, ForecastSource, GeocodeClient, LocationProvider,
    PlaceDescription, PlaceLookup, WeatherProvider,
};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// Error type for weather operations, one variant per failing step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeatherError {
    Location(String),
    Geocode(String),
    Weather(String),
}

impl std::fmt::Display for WeatherError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeatherError::Location(s) => write!(f, "Location error: {}", s),
            WeatherError::Geocode(s) => write!(f, "Geocode error: {}", s),
            WeatherError::Weather(s) => write!(f, "Weather error: {}", s),
        }
    }
}

impl std::error::Error for WeatherError {}

/// Messages sent from a running cycle back to the view model
#[derive(Debug)]
pub enum WeatherServiceMessage {
    DeviceDetected {
        cycle: u64,
        device: DeviceClass,
    },
    LocationDone {
        cycle: u64,
        result: Result<Coordinate, WeatherError>,
    },
    PlaceDone {
        cycle: u64,
        result: Result<Option<PlaceDescription>, WeatherError>,
    },
    ForecastDone {
        cycle: u64,
        result: Result<ForecastSnapshot, WeatherError>,
    },
}

impl WeatherServiceMessage {
    pub fn cycle(&self) -> u64 {
        match self {
            Self::DeviceDetected { cycle, .. }
            | Self::LocationDone { cycle, .. }
            | Self::PlaceDone { cycle, .. }
            | Self::ForecastDone { cycle, .. } => *cycle,
        }
    }
}

/// The three collaborators a fetch cycle talks to
#[derive(Clone)]
pub struct WeatherServices {
    pub location: LocationProvider,
    pub places: Arc<dyn PlaceLookup>,
    pub forecasts: Arc<dyn ForecastSource>,
}

impl WeatherServices {
    pub fn new(
        location: LocationProvider,
        places: Arc<dyn PlaceLookup>,
        forecasts: Arc<dyn ForecastSource>,
    ) -> Self {
        Self {
            location,
            places,
            forecasts,
        }
    }

    /// Wire the real HTTP clients and the configured location sensor.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let timeout = std::time::Duration::from_secs(config.weather.request_timeout_secs);
        let location = LocationProvider::from_config(config).map_err(WeatherError::from)?;
        let places = GeocodeClient::new(&config.geocode, timeout).map_err(WeatherError::from)?;
        let forecasts = WeatherProvider::new(&config.weather).map_err(WeatherError::from)?;

        Ok(Self::new(location, Arc::new(places), Arc::new(forecasts)))
    }
}

impl From<nimbus_weather::LocationError> for WeatherError {
    fn from(e: nimbus_weather::LocationError) -> Self {
        WeatherError::Location(e.to_string())
    }
}

impl From<nimbus_weather::GeocodeError> for WeatherError {
    fn from(e: nimbus_weather::GeocodeError) -> Self {
        WeatherError::Geocode(e.to_string())
    }
}

impl From<nimbus_weather::WeatherError> for WeatherError {
    fn from(e: nimbus_weather::WeatherError) -> Self {
        WeatherError::Weather(e.to_string())
    }
}

/// Start fetch cycle `cycle` on `runtime`.
///
/// The task stops early when `cancel` fires; anything it already sent is
/// still stamped with `cycle` so the receiver can drop it.
pub fn request_cycle(
    runtime: &tokio::runtime::Handle,
    tx: &UnboundedSender<WeatherServiceMessage>,
    services: WeatherServices,
    cycle: u64,
    cancel: CancellationToken,
) {
    let tx = tx.clone();

    runtime.spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("Fetch cycle {} cancelled", cycle);
            }
            _ = run_cycle(&tx, &services, cycle) => {
                tracing::debug!("Fetch cycle {} finished", cycle);
            }
        }
    });
}

async fn run_cycle(
    tx: &UnboundedSender<WeatherServiceMessage>,
    services: &WeatherServices,
    cycle: u64,
) {
    let device = services.location.detect_device_class().await;
    let _ = tx.send(WeatherServiceMessage::DeviceDetected { cycle, device });

    // Both requests below need the coordinate; nothing is issued without it
    let coordinate = match services.location.resolve_current_location().await {
        Ok(coordinate) => {
            let _ = tx.send(WeatherServiceMessage::LocationDone {
                cycle,
                result: Ok(coordinate),
            });
            coordinate
        }
        Err(e) => {
            tracing::error!("Failed to resolve location: {}", e);
            let _ = tx.send(WeatherServiceMessage::LocationDone {
                cycle,
                result: Err(e.into()),
            });
            return;
        }
    };

    let place = async {
        let result = services
            .places
            .reverse_geocode(&coordinate)
            .await
            .map_err(|e| {
                tracing::warn!("Reverse geocode failed: {}", e);
                WeatherError::from(e)
            });
        let _ = tx.send(WeatherServiceMessage::PlaceDone { cycle, result });
    };

    let forecast = async {
        let result = services
            .forecasts
            .fetch_forecast(&coordinate)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch weather: {}", e);
                WeatherError::from(e)
            });
        let _ = tx.send(WeatherServiceMessage::ForecastDone { cycle, result });
    };

    tokio::join!(place, forecast);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weather_error_display() {
        assert!(format!("{}", WeatherError::Location("denied".into())).contains("Location"));
        assert!(format!("{}", WeatherError::Geocode("boom".into())).contains("Geocode"));
        assert!(format!("{}", WeatherError::Weather("timeout".into())).contains("Weather"));
    }

    #[test]
    fn location_error_keeps_message() {
        let err: WeatherError = nimbus_weather::LocationError::PermissionDenied.into();
        assert_eq!(
            err,
            WeatherError::Location("Permission to access location was denied".into())
        );
    }

    #[test]
    fn message_reports_its_cycle() {
        let msg = WeatherServiceMessage::DeviceDetected {
            cycle: 7,
            device: DeviceClass::Large,
        };
        assert_eq!(msg.cycle(), 7);

        let msg = WeatherServiceMessage::ForecastDone {
            cycle: 3,
            result: Err(WeatherError::Weather("x".into())),
        };
        assert_eq!(msg.cycle(), 3);
    }
}
