//! Presentation layer: turns a [`WeatherState`] into a [`Screen`].
//!
//! Rendering is pure; every panel is decided by matching on the fetch state
//! and the panel's own slot.

use std::fmt;

use nimbus_core::{FetchState, Slot, TemperatureUnit};
use nimbus_weather::provider::icon_url;
use nimbus_weather::{units, DeviceClass};

use crate::models::weather_model::{ChartSeries, WeatherState};

const HANDHELD_CHART_HEIGHT: u32 = 300;
const LARGE_CHART_HEIGHT: u32 = 500;
const BAR_WIDTH: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitToggle {
    pub options: [TemperatureUnit; 2],
    pub active: TemperatureUnit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentPanel {
    pub icon_url: String,
    pub label: String,
    pub temperature: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendChart {
    pub labels: Vec<String>,
    pub values: Vec<i64>,
    pub legend: String,
    pub height: u32,
}

/// One frame of the weather screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub spinner: bool,
    pub error_banner: Option<String>,
    pub unit_toggle: UnitToggle,
    pub location_line: Option<String>,
    pub date_line: Option<String>,
    pub current: Option<CurrentPanel>,
    pub chart: Option<TrendChart>,
}

pub fn render(state: &WeatherState, icon_template: &str) -> Screen {
    let error_banner = match &state.fetch {
        FetchState::ErrorOccurred(message) => {
            Some(format!("Error: {}\nPull to refresh to retry", message))
        }
        FetchState::Idle | FetchState::InFlight | FetchState::Ready => None,
    };

    let location_line = match &state.place {
        Slot::Loaded(_) => state.location_text(),
        Slot::Pending | Slot::Empty | Slot::Failed(_) => None,
    };

    let (date_line, current, chart) = match &state.forecast {
        Slot::Loaded(forecast) => {
            let current = CurrentPanel {
                icon_url: icon_url(icon_template, &forecast.current.icon),
                label: forecast.current.label.clone(),
                temperature: units::format_temperature(
                    forecast.current.temperature_kelvin,
                    state.unit,
                ),
            };
            (
                state.observed_at_text(),
                Some(current),
                state.chart_series().map(|series| trend_chart(series, state.device)),
            )
        }
        Slot::Pending | Slot::Empty | Slot::Failed(_) => (None, None, None),
    };

    Screen {
        spinner: state.is_loading() && error_banner.is_none(),
        error_banner,
        unit_toggle: UnitToggle {
            options: [TemperatureUnit::Fahrenheit, TemperatureUnit::Celsius],
            active: state.unit,
        },
        location_line,
        date_line,
        current,
        chart,
    }
}

fn trend_chart(series: ChartSeries, device: DeviceClass) -> TrendChart {
    TrendChart {
        labels: series.labels,
        values: series.values,
        legend: series.legend,
        height: match device {
            DeviceClass::Handheld => HANDHELD_CHART_HEIGHT,
            DeviceClass::Large => LARGE_CHART_HEIGHT,
        },
    }
}

impl fmt::Display for UnitToggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .options
            .iter()
            .map(|unit| {
                if *unit == self.active {
                    format!("[{}]", unit.symbol())
                } else {
                    format!(" {} ", unit.symbol())
                }
            })
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

impl fmt::Display for TrendChart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.legend)?;

        let (Some(&min), Some(&max)) = (self.values.iter().min(), self.values.iter().max()) else {
            return Ok(());
        };
        let label_width = self.labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);

        for (label, &value) in self.labels.iter().zip(&self.values) {
            let bar = bar_length(value, min, max);
            writeln!(
                f,
                "{:>width$} | {} {}",
                label,
                "#".repeat(bar),
                value,
                width = label_width
            )?;
        }
        Ok(())
    }
}

/// Bar length in `1..=BAR_WIDTH`, scaled between the series minimum and maximum.
/// Widened to i128 so extreme values can't overflow.
fn bar_length(value: i64, min: i64, max: i64) -> usize {
    let span = (i128::from(max) - i128::from(min)).max(1);
    let offset = (i128::from(value) - i128::from(min)).clamp(0, span);
    let scaled = offset * (BAR_WIDTH as i128 - 1) / span;
    1 + usize::try_from(scaled).unwrap_or(0).min(BAR_WIDTH - 1)
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.spinner {
            writeln!(f, "Loading...")?;
        }
        writeln!(f, "{}", self.unit_toggle)?;
        if let Some(banner) = &self.error_banner {
            writeln!(f, "{}", banner)?;
        }
        if let Some(line) = &self.location_line {
            writeln!(f, "{}", line)?;
        }
        if let Some(line) = &self.date_line {
            writeln!(f, "{}", line)?;
        }
        if let Some(current) = &self.current {
            writeln!(f, "{}  {}  ({})", current.temperature, current.label, current.icon_url)?;
        }
        if let Some(chart) = &self.chart {
            writeln!(f)?;
            write!(f, "{}", chart)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::weather_model::WeatherAction;
    use crate::services::weather_service::{WeatherError, WeatherServiceMessage};
    use nimbus_weather::{ConditionRecord, Coordinate, ForecastSnapshot, PlaceDescription};

    const ICONS: &str = "https://icons.test/img/{icon_id}@2x.png";

    fn forecast() -> ForecastSnapshot {
        let day = |timestamp: i64, max: f64| ConditionRecord {
            timestamp,
            temperature_kelvin: max - 2.0,
            max_temperature_kelvin: Some(max),
            icon: "01d".into(),
            label: "Clear".into(),
        };
        ForecastSnapshot {
            current: ConditionRecord {
                timestamp: 1_627_833_600,
                temperature_kelvin: 295.15,
                max_temperature_kelvin: None,
                icon: "01d".into(),
                label: "Clear".into(),
            },
            hourly: vec![],
            daily: vec![day(1_627_833_600, 300.0), day(1_627_920_000, 295.0)],
            timezone_offset_seconds: 0,
        }
    }

    fn located() -> WeatherState {
        let mut state = WeatherState::default();
        state.apply(WeatherAction::StartCycle);
        state.apply(WeatherAction::Service(WeatherServiceMessage::LocationDone {
            cycle: 1,
            result: Ok(Coordinate::new(40.0, -74.0)),
        }));
        state
    }

    #[test]
    fn idle_shows_spinner_only() {
        let screen = render(&WeatherState::default(), ICONS);
        assert!(screen.spinner);
        assert_eq!(screen.error_banner, None);
        assert_eq!(screen.location_line, None);
        assert_eq!(screen.current, None);
        assert_eq!(screen.chart, None);
        assert_eq!(screen.unit_toggle.active, TemperatureUnit::Fahrenheit);
    }

    #[test]
    fn error_hides_spinner_and_shows_banner() {
        let mut state = WeatherState::default();
        state.apply(WeatherAction::StartCycle);
        state.apply(WeatherAction::Service(WeatherServiceMessage::LocationDone {
            cycle: 1,
            result: Err(WeatherError::Location(
                "Permission to access location was denied".into(),
            )),
        }));

        let screen = render(&state, ICONS);

        assert!(!screen.spinner);
        assert_eq!(
            screen.error_banner.as_deref(),
            Some("Error: Permission to access location was denied\nPull to refresh to retry")
        );
        assert_eq!(screen.current, None);
    }

    #[test]
    fn panels_render_independently() {
        let mut state = located();
        state.apply(WeatherAction::Service(WeatherServiceMessage::ForecastDone {
            cycle: 1,
            result: Ok(forecast()),
        }));

        let screen = render(&state, ICONS);

        // Place still pending
        assert!(screen.spinner);
        assert_eq!(screen.location_line, None);
        let current = screen.current.unwrap();
        assert_eq!(current.temperature, "72°F");
        assert_eq!(current.label, "Clear");
        assert_eq!(current.icon_url, "https://icons.test/img/01d@2x.png");
        assert_eq!(screen.date_line.as_deref(), Some("Sunday 1, 16:00"));
    }

    #[test]
    fn chart_height_follows_device_class() {
        let mut state = located();
        state.apply(WeatherAction::Service(WeatherServiceMessage::ForecastDone {
            cycle: 1,
            result: Ok(forecast()),
        }));
        assert_eq!(render(&state, ICONS).chart.unwrap().height, 300);

        state.device = DeviceClass::Large;
        let chart = render(&state, ICONS).chart.unwrap();
        assert_eq!(chart.height, 500);
        assert_eq!(chart.labels, vec!["Sunday 8/1", "Monday 8/2"]);
    }

    #[test]
    fn unit_toggle_display_marks_active() {
        let toggle = UnitToggle {
            options: [TemperatureUnit::Fahrenheit, TemperatureUnit::Celsius],
            active: TemperatureUnit::Celsius,
        };
        assert_eq!(toggle.to_string(), " °F  [°C]");
    }

    #[test]
    fn screen_display_contains_panels() {
        let mut state = located();
        state.apply(WeatherAction::Service(WeatherServiceMessage::PlaceDone {
            cycle: 1,
            result: Ok(Some(PlaceDescription {
                city: "Newark".into(),
                state: "NJ".into(),
                country_code: "us".into(),
            })),
        }));
        state.apply(WeatherAction::Service(WeatherServiceMessage::ForecastDone {
            cycle: 1,
            result: Ok(forecast()),
        }));

        let text = render(&state, ICONS).to_string();

        assert!(!text.contains("Loading"));
        assert!(text.contains("NEWARK, NJ, US"));
        assert!(text.contains("72°F"));
        assert!(text.contains("1 Week Daily Max Temperature °F"));
        assert!(text.contains("\n8/1 | "));
    }

    #[test]
    fn bar_length_spans_min_to_max() {
        assert_eq!(bar_length(10, 10, 20), 1);
        assert_eq!(bar_length(20, 10, 20), BAR_WIDTH);
        assert_eq!(bar_length(5, 5, 5), 1);
    }

    #[test]
    fn extreme_values_render_without_overflow() {
        let chart = TrendChart {
            labels: vec!["8/1".into(), "8/2".into(), "8/3".into()],
            values: vec![i64::MIN, 0, i64::MAX],
            legend: "1 Week Daily Max Temperature °F".into(),
            height: 300,
        };

        let text = chart.to_string();
        let bars: Vec<usize> = text
            .lines()
            .skip(1)
            .map(|line| line.chars().filter(|c| *c == '#').count())
            .collect();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0], 1);
        assert_eq!(bars[2], BAR_WIDTH);
        assert!(bars.iter().all(|b| (1..=BAR_WIDTH).contains(b)));

        let chart = TrendChart {
            values: vec![0, 1_000_000_000_000_000_000],
            labels: vec!["8/1".into(), "8/2".into()],
            ..chart
        };
        assert!(chart.to_string().contains(&"#".repeat(BAR_WIDTH)));
    }

    #[test]
    fn empty_chart_prints_legend_only() {
        let chart = TrendChart {
            labels: vec![],
            values: vec![],
            legend: "1 Week Daily Max Temperature °F".into(),
            height: 300,
        };
        assert_eq!(chart.to_string(), "1 Week Daily Max Temperature °F\n");
    }
}
