use chrono::{DateTime, FixedOffset};
use nimbus_core::NetworkError;
use serde::{Deserialize, Serialize};

/// A single latitude/longitude fix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// `"{lat},{lon}"`, the query form geocoders expect
    pub fn query_string(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

/// Human-readable place for a coordinate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceDescription {
    pub city: String,
    pub state: String,
    pub country_code: String,
}

impl PlaceDescription {
    /// "Newark, NJ, US": country code uppercased, empty parts skipped.
    pub fn display_line(&self) -> String {
        let country = self.country_code.to_uppercase();
        [self.city.as_str(), self.state.as_str(), country.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// One observation or forecast point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionRecord {
    /// Epoch seconds
    pub timestamp: i64,
    pub temperature_kelvin: f64,
    /// Only set on daily records
    pub max_temperature_kelvin: Option<f64>,
    /// Icon code, e.g. "01d"
    pub icon: String,
    /// Short condition label, e.g. "Clear"
    pub label: String,
}

impl ConditionRecord {
    /// Daily maximum, falling back to the plain temperature for non-daily records
    pub fn max_or_temperature(&self) -> f64 {
        self.max_temperature_kelvin.unwrap_or(self.temperature_kelvin)
    }

    /// The record's timestamp in a zone `offset_seconds` east of UTC.
    pub fn local_datetime(&self, offset_seconds: i32) -> Option<DateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt(offset_seconds)?;
        DateTime::from_timestamp(self.timestamp, 0).map(|utc| utc.with_timezone(&offset))
    }
}

/// Current, hourly and daily conditions for one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSnapshot {
    pub current: ConditionRecord,
    pub hourly: Vec<ConditionRecord>,
    pub daily: Vec<ConditionRecord>,
    /// Offset of the forecast location from UTC, used for local dates
    pub timezone_offset_seconds: i32,
}

/// Location service errors
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Permission to access location was denied")]
    PermissionDenied,
    #[error("Location unavailable: {0}")]
    SensorUnavailable(String),
    #[error("Location request timed out")]
    Timeout,
    #[error("Location error: {0}")]
    Other(String),
}

/// Reverse-geocoding errors
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("{0}")]
    Network(NetworkError),
    #[error("geocoder returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid geocode response: {0}")]
    Parse(String),
    #[error("no place found for this location")]
    NoResults,
}

/// Forecast fetch errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("{0}")]
    Network(NetworkError),
    #[error("weather service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid weather response: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(timestamp: i64) -> ConditionRecord {
        ConditionRecord {
            timestamp,
            temperature_kelvin: 290.0,
            max_temperature_kelvin: None,
            icon: "01d".into(),
            label: "Clear".into(),
        }
    }

    #[test]
    fn test_query_string() {
        assert_eq!(Coordinate::new(40.0, -74.0).query_string(), "40,-74");
        assert_eq!(Coordinate::new(47.6062, -122.3321).query_string(), "47.6062,-122.3321");
    }

    #[test]
    fn test_display_line_uppercases_country() {
        let place = PlaceDescription {
            city: "Newark".into(),
            state: "NJ".into(),
            country_code: "us".into(),
        };
        assert_eq!(place.display_line(), "Newark, NJ, US");
    }

    #[test]
    fn test_display_line_skips_empty_parts() {
        let place = PlaceDescription {
            city: "Monaco".into(),
            state: String::new(),
            country_code: "mc".into(),
        };
        assert_eq!(place.display_line(), "Monaco, MC");
    }

    #[test]
    fn test_max_falls_back_to_temperature() {
        let mut daily = record(0);
        assert_eq!(daily.max_or_temperature(), 290.0);
        daily.max_temperature_kelvin = Some(300.0);
        assert_eq!(daily.max_or_temperature(), 300.0);
    }

    #[test]
    fn test_local_datetime_applies_offset() {
        // 2021-08-01T00:00:00Z
        let rec = record(1_627_776_000);
        let utc = rec.local_datetime(0).unwrap();
        assert_eq!(utc.format("%Y-%m-%d %H:%M").to_string(), "2021-08-01 00:00");

        let new_york = rec.local_datetime(-4 * 3600).unwrap();
        assert_eq!(new_york.format("%Y-%m-%d %H:%M").to_string(), "2021-07-31 20:00");
    }

    #[test]
    fn test_local_datetime_rejects_bad_offset() {
        assert!(record(0).local_datetime(200_000).is_none());
    }

    #[test]
    fn test_permission_denied_message() {
        assert_eq!(
            LocationError::PermissionDenied.to_string(),
            "Permission to access location was denied"
        );
    }
}
