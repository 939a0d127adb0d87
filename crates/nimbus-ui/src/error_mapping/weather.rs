use crate::services::weather_service::WeatherError as UiWeatherError;
use nimbus_core::AppError;

impl From<UiWeatherError> for AppError {
    fn from(e: UiWeatherError) -> Self {
        match e {
            UiWeatherError::Location(s) => AppError::Location(s),
            UiWeatherError::Geocode(s) => AppError::Geocode(s),
            UiWeatherError::Weather(s) => AppError::Weather(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_errors_abort_the_cycle() {
        let err: AppError = UiWeatherError::Location("denied".into()).into();
        assert!(err.aborts_cycle());
        assert_eq!(err.to_string(), "denied");
    }

    #[test]
    fn geocode_errors_keep_prefix() {
        let err: AppError = UiWeatherError::Geocode("no results".into()).into();
        assert!(!err.aborts_cycle());
        assert_eq!(err.to_string(), "Geocode Error: no results");
    }
}
