//! Forecast client for One Call-style weather endpoints.

use std::time::Duration;

use async_trait::async_trait;
use nimbus_core::{ReqwestErrorExt, WeatherConfig};
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::types::{ConditionRecord, Coordinate, ForecastSnapshot, WeatherError};

#[derive(Debug, Deserialize)]
struct ApiForecast {
    #[serde(default)]
    timezone_offset: i32,
    current: ApiCondition,
    #[serde(default)]
    hourly: Vec<ApiCondition>,
    #[serde(default)]
    daily: Vec<ApiCondition>,
}

#[derive(Debug, Deserialize)]
struct ApiCondition {
    dt: i64,
    temp: ApiTemperature,
    #[serde(default)]
    weather: Vec<ApiWeather>,
}

/// `temp` is a number on current/hourly records and an object on daily ones.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiTemperature {
    Value(f64),
    Daily { max: f64, day: Option<f64> },
}

#[derive(Debug, Deserialize)]
struct ApiWeather {
    #[serde(default)]
    icon: String,
    #[serde(default)]
    main: String,
}

impl From<ApiCondition> for ConditionRecord {
    fn from(api: ApiCondition) -> Self {
        let (temperature_kelvin, max_temperature_kelvin) = match api.temp {
            ApiTemperature::Value(temp) => (temp, None),
            ApiTemperature::Daily { max, day } => (day.unwrap_or(max), Some(max)),
        };
        let (icon, label) = api
            .weather
            .into_iter()
            .next()
            .map(|w| (w.icon, w.main))
            .unwrap_or_default();

        Self {
            timestamp: api.dt,
            temperature_kelvin,
            max_temperature_kelvin,
            icon,
            label,
        }
    }
}

impl From<ApiForecast> for ForecastSnapshot {
    fn from(api: ApiForecast) -> Self {
        Self {
            current: api.current.into(),
            hourly: api.hourly.into_iter().map(ConditionRecord::from).collect(),
            daily: api.daily.into_iter().map(ConditionRecord::from).collect(),
            timezone_offset_seconds: api.timezone_offset,
        }
    }
}

/// Anything that can produce a forecast for a coordinate.
#[async_trait]
pub trait ForecastSource: Send + Sync {
    async fn fetch_forecast(&self, coordinate: &Coordinate)
        -> Result<ForecastSnapshot, WeatherError>;
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Client,
    endpoint: String,
}

impl WeatherProvider {
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| WeatherError::Network(e.into_network_error()))?;

        Ok(Self {
            client,
            endpoint: config.api_endpoint.clone(),
        })
    }

    /// Endpoint with the first `{lat}` and `{lon}` replaced by the coordinate.
    pub fn forecast_url(&self, coordinate: &Coordinate) -> String {
        self.endpoint
            .replacen("{lat}", &coordinate.latitude.to_string(), 1)
            .replacen("{lon}", &coordinate.longitude.to_string(), 1)
    }
}

/// Substitute `{icon_id}` in an icon URL template.
pub fn icon_url(template: &str, icon: &str) -> String {
    template.replacen("{icon_id}", icon, 1)
}

#[async_trait]
impl ForecastSource for WeatherProvider {
    #[instrument(skip(self), level = "info")]
    async fn fetch_forecast(
        &self,
        coordinate: &Coordinate,
    ) -> Result<ForecastSnapshot, WeatherError> {
        let url = self.forecast_url(coordinate);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| WeatherError::Network(e.into_network_error()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Weather endpoint returned status {}", status);
            return Err(WeatherError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let api: ApiForecast = response
            .json()
            .await
            .map_err(|e| WeatherError::Parse(e.to_string()))?;

        let snapshot = ForecastSnapshot::from(api);
        tracing::info!(
            "Fetched forecast: {} hourly, {} daily records",
            snapshot.hourly.len(),
            snapshot.daily.len()
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> WeatherConfig {
        WeatherConfig {
            api_endpoint: format!("{}/data/2.5/onecall?lat={{lat}}&lon={{lon}}&appid=k", server.uri()),
            icon_endpoint: "https://icons.test/img/{icon_id}@2x.png".to_string(),
            ..WeatherConfig::default()
        }
    }

    fn sample_body() -> serde_json::Value {
        serde_json::json!({
            "timezone_offset": -14400,
            "current": {
                "dt": 1_627_833_600,
                "temp": 295.15,
                "weather": [{"id": 800, "icon": "01d", "main": "Clear", "description": "clear sky"}]
            },
            "hourly": [
                {"dt": 1_627_833_600, "temp": 295.15, "weather": [{"icon": "01d", "main": "Clear"}]},
                {"dt": 1_627_837_200, "temp": 296.0, "weather": [{"icon": "02d", "main": "Clouds"}]}
            ],
            "daily": [
                {"dt": 1_627_833_600, "temp": {"day": 297.0, "min": 290.0, "max": 300.0}, "weather": [{"icon": "01d", "main": "Clear"}]},
                {"dt": 1_627_920_000, "temp": {"day": 296.0, "min": 289.0, "max": 299.0}, "weather": [{"icon": "10d", "main": "Rain"}]}
            ]
        })
    }

    #[test]
    fn test_forecast_url_substitution() {
        let provider = WeatherProvider::new(&WeatherConfig {
            api_endpoint: "https://w.test/onecall?lat={lat}&lon={lon}&echo={lat}".to_string(),
            ..WeatherConfig::default()
        })
        .unwrap();

        assert_eq!(
            provider.forecast_url(&Coordinate::new(40.5, -74.0)),
            "https://w.test/onecall?lat=40.5&lon=-74&echo={lat}"
        );
    }

    #[test]
    fn test_icon_url() {
        assert_eq!(
            icon_url("https://icons.test/img/{icon_id}@2x.png", "01d"),
            "https://icons.test/img/01d@2x.png"
        );
    }

    #[tokio::test]
    async fn test_fetch_forecast() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/onecall"))
            .and(query_param("lat", "40"))
            .and(query_param("lon", "-74"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_body()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = WeatherProvider::new(&config_for(&mock_server)).unwrap();
        let snapshot = provider
            .fetch_forecast(&Coordinate::new(40.0, -74.0))
            .await
            .unwrap();

        assert_eq!(snapshot.timezone_offset_seconds, -14400);
        assert_eq!(snapshot.current.temperature_kelvin, 295.15);
        assert_eq!(snapshot.current.icon, "01d");
        assert_eq!(snapshot.current.label, "Clear");
        assert_eq!(snapshot.current.max_temperature_kelvin, None);
        assert_eq!(snapshot.hourly.len(), 2);
        assert_eq!(snapshot.daily.len(), 2);
        assert_eq!(snapshot.daily[0].max_temperature_kelvin, Some(300.0));
        assert_eq!(snapshot.daily[0].temperature_kelvin, 297.0);
        assert_eq!(snapshot.daily[1].label, "Rain");
    }

    #[tokio::test]
    async fn test_missing_sections_default_empty() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "current": {"dt": 0, "temp": 280.0, "weather": []}
            })))
            .mount(&mock_server)
            .await;

        let provider = WeatherProvider::new(&config_for(&mock_server)).unwrap();
        let snapshot = provider
            .fetch_forecast(&Coordinate::new(1.0, 2.0))
            .await
            .unwrap();

        assert!(snapshot.hourly.is_empty());
        assert!(snapshot.daily.is_empty());
        assert_eq!(snapshot.timezone_offset_seconds, 0);
        assert_eq!(snapshot.current.icon, "");
    }

    #[tokio::test]
    async fn test_server_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&mock_server)
            .await;

        let provider = WeatherProvider::new(&config_for(&mock_server)).unwrap();
        let result = provider.fetch_forecast(&Coordinate::new(40.0, -74.0)).await;

        assert!(matches!(result, Err(WeatherError::Status { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"cod": 401})))
            .mount(&mock_server)
            .await;

        let provider = WeatherProvider::new(&config_for(&mock_server)).unwrap();
        let result = provider.fetch_forecast(&Coordinate::new(40.0, -74.0)).await;

        assert!(matches!(result, Err(WeatherError::Parse(_))));
    }
}
