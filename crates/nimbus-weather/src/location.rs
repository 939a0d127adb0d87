//! Device location: a permission-gated single fix plus the device class used
//! for layout sizing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nimbus_core::{Config, LocationSource};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use terminal_size::Width;

use crate::types::{Coordinate, LocationError};

/// Coarse device category, only used for layout decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    #[default]
    Handheld,
    Large,
}

/// Terminals at least this wide count as large-format devices.
const LARGE_MIN_COLUMNS: u16 = 100;

impl DeviceClass {
    /// Accepts exactly the values `ui.device_class` validation allows.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "handheld" => Some(Self::Handheld),
            "large" => Some(Self::Large),
            _ => None,
        }
    }

    pub fn from_columns(columns: u16) -> Self {
        if columns >= LARGE_MIN_COLUMNS {
            Self::Large
        } else {
            Self::Handheld
        }
    }
}

/// Detect the device class from an explicit override, the attached terminal,
/// or `COLUMNS` when no terminal is attached.
fn probe_device_class(configured: Option<DeviceClass>) -> Result<DeviceClass, LocationError> {
    let terminal_width = terminal_size::terminal_size().map(|(Width(w), _)| w);
    device_class_from(configured, terminal_width, std::env::var("COLUMNS").ok())
}

fn device_class_from(
    configured: Option<DeviceClass>,
    terminal_width: Option<u16>,
    columns_env: Option<String>,
) -> Result<DeviceClass, LocationError> {
    if let Some(class) = configured {
        return Ok(class);
    }
    if let Some(width) = terminal_width {
        return Ok(DeviceClass::from_columns(width));
    }

    let columns =
        columns_env.ok_or_else(|| LocationError::Other("terminal width unknown".to_string()))?;
    columns
        .trim()
        .parse::<u16>()
        .map(DeviceClass::from_columns)
        .map_err(|e| LocationError::Other(format!("invalid COLUMNS value {:?}: {}", columns, e)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Platform location sensor
#[async_trait]
pub trait LocationSensor: Send + Sync {
    async fn request_permission(&self) -> Result<PermissionStatus, LocationError>;

    /// A single current fix, not a stream
    async fn current_fix(&self) -> Result<Coordinate, LocationError>;

    async fn device_class(&self) -> Result<DeviceClass, LocationError>;
}

/// Resolves one coordinate per fetch cycle from a [`LocationSensor`].
#[derive(Clone)]
pub struct LocationProvider {
    sensor: Arc<dyn LocationSensor>,
    timeout: Duration,
}

impl LocationProvider {
    pub fn new(sensor: Arc<dyn LocationSensor>, timeout: Duration) -> Self {
        Self { sensor, timeout }
    }

    /// Build the sensor selected in config.
    pub fn from_config(config: &Config) -> Result<Self, LocationError> {
        let timeout = Duration::from_secs(config.weather.request_timeout_secs);
        let device = config.ui.device_class.as_deref().and_then(DeviceClass::parse);
        let location = &config.location;

        let sensor: Arc<dyn LocationSensor> = match location.source {
            LocationSource::Fixed => Arc::new(FixedSensor {
                coordinate: location
                    .latitude
                    .zip(location.longitude)
                    .map(|(lat, lon)| Coordinate::new(lat, lon)),
                permission_granted: location.permission_granted,
                device,
            }),
            LocationSource::Ip => Arc::new(IpSensor::new(
                &location.ip_endpoint,
                location.permission_granted,
                device,
                timeout,
            )?),
        };

        Ok(Self::new(sensor, timeout))
    }

    /// Ask for permission, then take a single fix.
    ///
    /// A denied permission fails with [`LocationError::PermissionDenied`] without
    /// touching the sensor again. No retries.
    pub async fn resolve_current_location(&self) -> Result<Coordinate, LocationError> {
        match self.sensor.request_permission().await? {
            PermissionStatus::Denied => {
                tracing::warn!("Location permission denied");
                return Err(LocationError::PermissionDenied);
            }
            PermissionStatus::Granted => {}
        }

        let fix = tokio::time::timeout(self.timeout, self.sensor.current_fix())
            .await
            .map_err(|_| LocationError::Timeout)??;

        tracing::info!("Got location: {}, {}", fix.latitude, fix.longitude);
        Ok(fix)
    }

    /// Never fails: anything the sensor can't answer falls back to handheld layout.
    pub async fn detect_device_class(&self) -> DeviceClass {
        match self.sensor.device_class().await {
            Ok(class) => class,
            Err(e) => {
                tracing::debug!("Device class detection failed ({}), using handheld layout", e);
                DeviceClass::Handheld
            }
        }
    }
}

/// Sensor answering with a configured coordinate.
#[derive(Debug, Clone)]
pub struct FixedSensor {
    pub coordinate: Option<Coordinate>,
    pub permission_granted: bool,
    pub device: Option<DeviceClass>,
}

#[async_trait]
impl LocationSensor for FixedSensor {
    async fn request_permission(&self) -> Result<PermissionStatus, LocationError> {
        Ok(if self.permission_granted {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        })
    }

    async fn current_fix(&self) -> Result<Coordinate, LocationError> {
        self.coordinate.ok_or_else(|| {
            LocationError::SensorUnavailable("no latitude/longitude configured".to_string())
        })
    }

    async fn device_class(&self) -> Result<DeviceClass, LocationError> {
        probe_device_class(self.device)
    }
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    status: Option<String>,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

/// Sensor backed by an IP geolocation service (ip-api.com response format).
#[derive(Debug, Clone)]
pub struct IpSensor {
    client: Client,
    endpoint: String,
    permission_granted: bool,
    device: Option<DeviceClass>,
}

impl IpSensor {
    pub fn new(
        endpoint: &str,
        permission_granted: bool,
        device: Option<DeviceClass>,
        timeout: Duration,
    ) -> Result<Self, LocationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LocationError::Other(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            permission_granted,
            device,
        })
    }
}

#[async_trait]
impl LocationSensor for IpSensor {
    async fn request_permission(&self) -> Result<PermissionStatus, LocationError> {
        Ok(if self.permission_granted {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        })
    }

    async fn current_fix(&self) -> Result<Coordinate, LocationError> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| LocationError::SensorUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LocationError::SensorUnavailable(format!(
                "lookup returned status {}",
                response.status()
            )));
        }

        let body: IpLookupResponse = response
            .json()
            .await
            .map_err(|e| LocationError::SensorUnavailable(format!("parse error: {}", e)))?;

        if body.status.as_deref().is_some_and(|s| s != "success") {
            return Err(LocationError::SensorUnavailable(
                body.message.unwrap_or_else(|| "lookup failed".to_string()),
            ));
        }

        match (body.lat, body.lon) {
            (Some(lat), Some(lon)) => Ok(Coordinate::new(lat, lon)),
            _ => Err(LocationError::SensorUnavailable(
                "lookup returned no coordinates".to_string(),
            )),
        }
    }

    async fn device_class(&self) -> Result<DeviceClass, LocationError> {
        probe_device_class(self.device)
    }
}
