//! Weather view model.
//!
//! [`WeatherState`] is a plain struct updated only through
//! [`WeatherState::apply`], so the whole fetch-cycle state machine can be
//! driven in tests without a runtime. [`WeatherViewModel`] couples that state
//! with the services and the message channel.

use chrono::{Datelike, Timelike};
use nimbus_core::{AppError, FetchState, Slot, TemperatureUnit};
use nimbus_weather::{units, ConditionRecord, Coordinate, DeviceClass, ForecastSnapshot, PlaceDescription};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;

use crate::services::weather_service::{self, WeatherServiceMessage, WeatherServices};
use crate::views::weather_view::{self, Screen};

/// Everything that can change the weather state
#[derive(Debug)]
pub enum WeatherAction {
    /// Mount or pull-to-refresh
    StartCycle,
    Service(WeatherServiceMessage),
    ToggleUnit,
    SetUnit(TemperatureUnit),
}

/// State of the weather screen
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherState {
    /// Id of the current fetch cycle; messages from other cycles are dropped
    pub cycle: u64,
    pub fetch: FetchState,
    pub location: Option<Coordinate>,
    pub place: Slot<PlaceDescription>,
    pub forecast: Slot<ForecastSnapshot>,
    pub unit: TemperatureUnit,
    pub device: DeviceClass,
}

impl Default for WeatherState {
    fn default() -> Self {
        Self::new(TemperatureUnit::default())
    }
}

/// Daily maxima ready for a line chart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<i64>,
    pub legend: String,
}

impl WeatherState {
    pub fn new(unit: TemperatureUnit) -> Self {
        Self {
            cycle: 0,
            fetch: FetchState::Idle,
            location: None,
            place: Slot::Pending,
            forecast: Slot::Pending,
            unit,
            device: DeviceClass::default(),
        }
    }

    /// The reducer. All state changes go through here.
    pub fn apply(&mut self, action: WeatherAction) {
        match action {
            WeatherAction::StartCycle => {
                self.cycle += 1;
                self.fetch = self.fetch.on_cycle_started();
                self.location = None;
                self.place = Slot::Pending;
                self.forecast = Slot::Pending;
                tracing::info!("Starting fetch cycle {}", self.cycle);
            }
            WeatherAction::ToggleUnit => self.unit = self.unit.toggled(),
            WeatherAction::SetUnit(unit) => self.unit = unit,
            WeatherAction::Service(msg) => {
                if msg.cycle() != self.cycle {
                    tracing::debug!(
                        "Dropping message from stale cycle {} (current {})",
                        msg.cycle(),
                        self.cycle
                    );
                    return;
                }
                self.apply_service_message(msg);
            }
        }
    }

    fn apply_service_message(&mut self, msg: WeatherServiceMessage) {
        match msg {
            WeatherServiceMessage::DeviceDetected { device, .. } => self.device = device,
            WeatherServiceMessage::LocationDone { result, .. } => match result {
                Ok(coordinate) => {
                    self.location = Some(coordinate);
                    self.fetch = self.fetch.on_location_done(Ok(()));
                }
                Err(e) => {
                    let err = AppError::from(e);
                    self.location = None;
                    self.fetch = self.fetch.on_location_done(Err(err.to_string()));
                    // Nothing else is requested in this cycle
                    self.place = Slot::Empty;
                    self.forecast = Slot::Empty;
                }
            },
            WeatherServiceMessage::PlaceDone { result, .. } => {
                self.place = Slot::from_optional(result.map_err(AppError::from));
            }
            WeatherServiceMessage::ForecastDone { result, .. } => {
                self.forecast = result.map_err(AppError::from).into();
            }
        }
    }

    /// Spinner state: nothing settled yet, or a panel still waiting.
    pub fn is_loading(&self) -> bool {
        match &self.fetch {
            FetchState::Idle | FetchState::InFlight => true,
            FetchState::Ready => self.place.is_pending() || self.forecast.is_pending(),
            FetchState::ErrorOccurred(_) => false,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.fetch.error()
    }

    pub fn forecast(&self) -> Option<&ForecastSnapshot> {
        self.forecast.loaded()
    }

    pub fn place(&self) -> Option<&PlaceDescription> {
        self.place.loaded()
    }

    /// "NEWARK, NJ, US"
    pub fn location_text(&self) -> Option<String> {
        self.place()
            .map(|place| place.display_line().to_uppercase())
            .filter(|line| !line.is_empty())
    }

    /// Current temperature in the active unit
    pub fn current_temperature(&self) -> Option<i64> {
        self.forecast()
            .map(|f| units::convert(f.current.temperature_kelvin, self.unit))
    }

    /// "72°F"
    pub fn current_temperature_text(&self) -> Option<String> {
        self.forecast()
            .map(|f| units::format_temperature(f.current.temperature_kelvin, self.unit))
    }

    /// "Sunday 1, 9:05" for the current observation, in the forecast's timezone
    pub fn observed_at_text(&self) -> Option<String> {
        let forecast = self.forecast()?;
        observed_at_text(&forecast.current, forecast.timezone_offset_seconds)
    }

    pub fn chart_series(&self) -> Option<ChartSeries> {
        let forecast = self.forecast()?;
        Some(chart_series(forecast, self.unit, self.device))
    }
}

/// Full weekday name of a record's local date.
pub fn weekday_name(record: &ConditionRecord, offset_seconds: i32) -> Option<String> {
    record
        .local_datetime(offset_seconds)
        .map(|dt| dt.format("%A").to_string())
}

/// "{Weekday} {day}, {hour}:{minute:02}"
pub fn observed_at_text(record: &ConditionRecord, offset_seconds: i32) -> Option<String> {
    let dt = record.local_datetime(offset_seconds)?;
    Some(format!(
        "{} {}, {}:{:02}",
        dt.format("%A"),
        dt.day(),
        dt.hour(),
        dt.minute()
    ))
}

/// Compact "M/D" on handheld devices, "Weekday M/D" on larger ones.
pub fn chart_label(record: &ConditionRecord, offset_seconds: i32, device: DeviceClass) -> String {
    let Some(dt) = record.local_datetime(offset_seconds) else {
        return String::new();
    };
    match device {
        DeviceClass::Handheld => format!("{}/{}", dt.month(), dt.day()),
        DeviceClass::Large => format!("{} {}/{}", dt.format("%A"), dt.month(), dt.day()),
    }
}

pub fn chart_series(
    forecast: &ForecastSnapshot,
    unit: TemperatureUnit,
    device: DeviceClass,
) -> ChartSeries {
    let offset = forecast.timezone_offset_seconds;
    ChartSeries {
        labels: forecast
            .daily
            .iter()
            .map(|day| chart_label(day, offset, device))
            .collect(),
        values: forecast
            .daily
            .iter()
            .map(|day| units::convert(day.max_or_temperature(), unit))
            .collect(),
        legend: format!("1 Week Daily Max Temperature {}", unit.symbol()),
    }
}

/// Owns the state and drives fetch cycles.
pub struct WeatherViewModel {
    state: WeatherState,
    services: WeatherServices,
    icon_template: String,
    runtime: tokio::runtime::Handle,
    tx: UnboundedSender<WeatherServiceMessage>,
    rx: UnboundedReceiver<WeatherServiceMessage>,
    cancel: Option<CancellationToken>,
}

impl WeatherViewModel {
    pub fn new(
        services: WeatherServices,
        icon_template: impl Into<String>,
        unit: TemperatureUnit,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state: WeatherState::new(unit),
            services,
            icon_template: icon_template.into(),
            runtime,
            tx,
            rx,
            cancel: None,
        }
    }

    pub fn state(&self) -> &WeatherState {
        &self.state
    }

    /// Start a new cycle (mount or pull-to-refresh).
    ///
    /// Cancels the previous cycle's requests and clears every result slot
    /// before anything new is requested.
    pub fn refresh(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }

        self.state.apply(WeatherAction::StartCycle);

        let token = CancellationToken::new();
        self.cancel = Some(token.clone());
        weather_service::request_cycle(
            &self.runtime,
            &self.tx,
            self.services.clone(),
            self.state.cycle,
            token,
        );
    }

    /// Switch units. Re-renders from the current state; never refetches.
    pub fn toggle_unit(&mut self) {
        self.state.apply(WeatherAction::ToggleUnit);
    }

    /// Apply every message that has already arrived. Returns true if any did.
    pub fn poll_channel(&mut self) -> bool {
        let mut changed = false;
        while let Ok(msg) = self.rx.try_recv() {
            self.state.apply(WeatherAction::Service(msg));
            changed = true;
        }
        changed
    }

    /// Wait for the next message and apply it.
    pub async fn next_message(&mut self) {
        if let Some(msg) = self.rx.recv().await {
            self.state.apply(WeatherAction::Service(msg));
        }
    }

    /// Wait until the current cycle stops loading.
    pub async fn settle(&mut self) {
        if matches!(self.state.fetch, FetchState::Idle) {
            return;
        }
        while self.state.is_loading() {
            self.next_message().await;
        }
    }

    pub fn render(&self) -> Screen {
        weather_view::render(&self.state, &self.icon_template)
    }
}

impl Drop for WeatherViewModel {
    fn drop(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
    }
}
