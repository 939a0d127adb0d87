use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Environment variable holding the geocoding API key.
pub const GEOCODE_API_KEY_ENV: &str = "OPENCAGE_API_KEY";
/// Environment variable holding the weather endpoint (it usually embeds the API key).
pub const WEATHER_ENDPOINT_ENV: &str = "OPENWEATHER_API_ENDPOINT";
/// Prefix for layered overrides, e.g. `NIMBUS__GEOCODE__EMPTY_RESULTS=error`.
pub const ENV_PREFIX: &str = "NIMBUS";

/// Application configuration, read once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    #[serde(default)]
    pub weather: WeatherConfig,

    #[serde(default)]
    pub geocode: GeocodeConfig,

    #[serde(default)]
    pub location: LocationConfig,

    #[serde(default)]
    pub ui: UiConfig,
}

/// Temperature display unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    Celsius,
    #[default]
    Fahrenheit,
}

impl TemperatureUnit {
    /// Unit suffix shown next to temperatures
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Celsius => Self::Fahrenheit,
            Self::Fahrenheit => Self::Celsius,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Forecast endpoint with literal `{lat}` and `{lon}` placeholders
    pub api_endpoint: String,

    /// Icon URL template with a literal `{icon_id}` placeholder
    pub icon_endpoint: String,

    /// Unit shown when the app starts
    #[serde(default)]
    pub temperature_unit: TemperatureUnit,

    /// Timeout applied to the location fix and to every HTTP request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_endpoint: "https://api.openweathermap.org/data/2.5/onecall?lat={lat}&lon={lon}&exclude=minutely,alerts&appid=YOUR_OPENWEATHER_API_KEY".to_string(),
            icon_endpoint: "https://openweathermap.org/img/wn/{icon_id}@2x.png".to_string(),
            temperature_unit: TemperatureUnit::default(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// What to do when the geocoder answers successfully but with no candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmptyResultPolicy {
    /// Leave the place panel empty without reporting anything
    #[default]
    Ignore,
    /// Report a geocode error for the place panel
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeConfig {
    /// Reverse-geocoding endpoint
    pub endpoint: String,

    /// API key sent with every request
    pub api_key: String,

    #[serde(default)]
    pub empty_results: EmptyResultPolicy,
}

impl GeocodeConfig {
    /// Check if the key is configured (not a placeholder)
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.api_key.starts_with("YOUR_")
    }
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.opencagedata.com/geocode/v1/json".to_string(),
            api_key: "YOUR_OPENCAGE_API_KEY".to_string(),
            empty_results: EmptyResultPolicy::default(),
        }
    }
}

/// Where the coordinate fix comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    /// The latitude/longitude in this section
    Fixed,
    /// IP-based geolocation lookup
    #[default]
    Ip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default)]
    pub source: LocationSource,

    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    /// Consent to look up the current location. `false` behaves like a denied
    /// permission prompt.
    #[serde(default = "default_permission_granted")]
    pub permission_granted: bool,

    #[serde(default = "default_ip_endpoint")]
    pub ip_endpoint: String,
}

fn default_permission_granted() -> bool {
    true
}

fn default_ip_endpoint() -> String {
    "http://ip-api.com/json".to_string()
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            source: LocationSource::default(),
            latitude: None,
            longitude: None,
            permission_granted: default_permission_granted(),
            ip_endpoint: default_ip_endpoint(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiConfig {
    /// "handheld" or "large"; detected from the terminal when unset
    pub device_class: Option<String>,
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nimbus")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            weather: WeatherConfig::default(),
            geocode: GeocodeConfig::default(),
            location: LocationConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = Self::load_from(&path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from `path`, layered with `NIMBUS__*` environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let mut config = Self::default();
            if let Some(parent) = path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(path)?;
            tracing::info!("Created default config at {}", path.display());
        }

        let layered = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Toml))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .context("Failed to read config file")?;

        let config: Config = layered
            .try_deserialize()
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns an error if validation fails with critical errors; warnings are logged.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Well-known environment variables for the two secrets win over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(GEOCODE_API_KEY_ENV) {
            if !key.is_empty() {
                self.geocode.api_key = key;
            }
        }
        if let Ok(endpoint) = std::env::var(WEATHER_ENDPOINT_ENV) {
            if !endpoint.is_empty() {
                self.weather.api_endpoint = endpoint;
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.api_endpoint, "weather.api_endpoint", &mut result);
        for placeholder in ["{lat}", "{lon}"] {
            if !self.weather.api_endpoint.contains(placeholder) {
                result.add_error(
                    "weather.api_endpoint",
                    format!("Endpoint must contain the {} placeholder", placeholder),
                );
            }
        }
        if self.weather.api_endpoint.contains("YOUR_") {
            result.add_warning(
                "weather.api_endpoint",
                "Weather API key looks like a placeholder - forecasts will fail",
            );
        }

        self.validate_url(&self.weather.icon_endpoint, "weather.icon_endpoint", &mut result);
        if !self.weather.icon_endpoint.contains("{icon_id}") {
            result.add_error(
                "weather.icon_endpoint",
                "Icon endpoint must contain the {icon_id} placeholder",
            );
        }

        if self.weather.request_timeout_secs == 0 {
            result.add_error(
                "weather.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        } else if self.weather.request_timeout_secs > 120 {
            result.add_warning(
                "weather.request_timeout_secs",
                "Request timeout is unusually long (>120s)",
            );
        }

        self.validate_url(&self.geocode.endpoint, "geocode.endpoint", &mut result);
        if !self.geocode.is_configured() {
            result.add_warning(
                "geocode.api_key",
                "Geocode API key not configured - place names will be unavailable",
            );
        }

        match self.location.source {
            LocationSource::Fixed => {
                match (self.location.latitude, self.location.longitude) {
                    (Some(lat), Some(lon)) => {
                        if !(-90.0..=90.0).contains(&lat) {
                            result.add_error("location.latitude", "Latitude must be within -90..=90");
                        }
                        if !(-180.0..=180.0).contains(&lon) {
                            result.add_error(
                                "location.longitude",
                                "Longitude must be within -180..=180",
                            );
                        }
                    }
                    _ => result.add_warning(
                        "location",
                        "Fixed location source without latitude/longitude - location will be unavailable",
                    ),
                }
            }
            LocationSource::Ip => {
                self.validate_url(&self.location.ip_endpoint, "location.ip_endpoint", &mut result);
            }
        }

        if let Some(class) = &self.ui.device_class {
            if !matches!(class.as_str(), "handheld" | "large") {
                result.add_error(
                    "ui.device_class",
                    format!("Expected \"handheld\" or \"large\", got: {}", class),
                );
            }
        }

        result
    }

    /// Validate a URL field. Template placeholders are tolerated.
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        let probe = url_str
            .replace("{lat}", "0")
            .replace("{lon}", "0")
            .replace("{icon_id}", "01d");

        match Url::parse(&probe) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("nimbus");

        Ok(config_dir.join("config.toml"))
    }
}
