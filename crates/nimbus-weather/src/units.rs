//! Kelvin to display-unit conversion.

use nimbus_core::TemperatureUnit;

const KELVIN_OFFSET: f64 = 273.15;

pub fn to_celsius(kelvin: f64) -> i64 {
    (kelvin - KELVIN_OFFSET).round() as i64
}

pub fn to_fahrenheit(kelvin: f64) -> i64 {
    ((kelvin - KELVIN_OFFSET) * 9.0 / 5.0 + 32.0).round() as i64
}

/// Convert to whichever unit is active.
pub fn convert(kelvin: f64, unit: TemperatureUnit) -> i64 {
    match unit {
        TemperatureUnit::Celsius => to_celsius(kelvin),
        TemperatureUnit::Fahrenheit => to_fahrenheit(kelvin),
    }
}

/// `"72°F"`
pub fn format_temperature(kelvin: f64, unit: TemperatureUnit) -> String {
    format!("{}{}", convert(kelvin, unit), unit.symbol())
}
