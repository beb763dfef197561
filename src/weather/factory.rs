use crate::config::IntegrationConfig;
use crate::error::WeatherError;
use crate::weather::meteoclimatic::MeteoclimaticProvider;
use crate::weather::provider::WeatherProvider;
use crate::weather::tomorrowio::TomorrowioProvider;
use std::sync::Arc;

pub fn create_provider(
    config: &IntegrationConfig,
) -> Result<Arc<dyn WeatherProvider>, WeatherError> {
    match config {
        IntegrationConfig::Meteoclimatic(c) => {
            let station_code = c.station_code.trim();
            if station_code.is_empty() {
                return Err(WeatherError::Configuration(
                    "Meteoclimatic requires a station code. Add 'station_code' to the integration in your config.toml".to_string(),
                ));
            }
            Ok(Arc::new(MeteoclimaticProvider::new(station_code.to_string())))
        }
        IntegrationConfig::Tomorrowio(c) => {
            if c.api_key.trim().is_empty() {
                return Err(WeatherError::Configuration(
                    "Tomorrow.io requires an API key. Add 'api_key' to the integration in your config.toml".to_string(),
                ));
            }
            if !(-90.0..=90.0).contains(&c.latitude) || !(-180.0..=180.0).contains(&c.longitude) {
                return Err(WeatherError::Configuration(format!(
                    "Tomorrow.io location {},{} is out of range",
                    c.latitude, c.longitude
                )));
            }
            Ok(Arc::new(TomorrowioProvider::new(
                c.api_key.trim().to_string(),
                c.latitude,
                c.longitude,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_MAX_REQUESTS_PER_DAY, MeteoclimaticConfig, TomorrowioConfig};

    fn tomorrowio(api_key: &str, latitude: f64, longitude: f64) -> IntegrationConfig {
        IntegrationConfig::Tomorrowio(TomorrowioConfig {
            api_key: api_key.to_string(),
            latitude,
            longitude,
            name: None,
            scan_interval: None,
            max_requests_per_day: DEFAULT_MAX_REQUESTS_PER_DAY,
        })
    }

    fn meteoclimatic(station_code: &str) -> IntegrationConfig {
        IntegrationConfig::Meteoclimatic(MeteoclimaticConfig {
            station_code: station_code.to_string(),
            name: None,
            scan_interval: None,
        })
    }

    #[test]
    fn test_create_meteoclimatic_provider() {
        let provider = create_provider(&meteoclimatic("ESCAT4300000043206B")).unwrap();
        assert_eq!(provider.get_name(), "Meteoclimatic");
    }

    #[test]
    fn test_create_meteoclimatic_provider_without_station() {
        let result = create_provider(&meteoclimatic("  "));
        assert!(matches!(result, Err(WeatherError::Configuration(_))));
    }

    #[test]
    fn test_create_tomorrowio_provider_with_key() {
        let provider = create_provider(&tomorrowio("test_key", 41.15, 1.1)).unwrap();
        assert_eq!(provider.get_name(), "Tomorrow.io");
    }

    #[test]
    fn test_create_tomorrowio_provider_without_key() {
        assert!(create_provider(&tomorrowio("", 41.15, 1.1)).is_err());
    }

    #[test]
    fn test_create_tomorrowio_provider_out_of_range() {
        assert!(create_provider(&tomorrowio("test_key", 91.0, 1.1)).is_err());
        assert!(create_provider(&tomorrowio("test_key", 41.0, -181.0)).is_err());
    }
}
