use crate::error::ConfigError;
use crate::weather::units::UnitSystem;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_REQUESTS_PER_DAY: u32 = 500;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub units: UnitSystem,

    #[serde(default)]
    pub integrations: Vec<IntegrationConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "platform", rename_all = "snake_case")]
pub enum IntegrationConfig {
    Meteoclimatic(MeteoclimaticConfig),
    Tomorrowio(TomorrowioConfig),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MeteoclimaticConfig {
    pub station_code: String,
    pub name: Option<String>,
    /// Seconds between polls.
    pub scan_interval: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TomorrowioConfig {
    pub api_key: String,
    pub latitude: f64,
    pub longitude: f64,
    pub name: Option<String>,
    pub scan_interval: Option<u64>,
    #[serde(default = "default_max_requests_per_day")]
    pub max_requests_per_day: u32,
}

fn default_max_requests_per_day() -> u32 {
    DEFAULT_MAX_REQUESTS_PER_DAY
}

impl IntegrationConfig {
    pub fn platform(&self) -> &'static str {
        match self {
            IntegrationConfig::Meteoclimatic(_) => "meteoclimatic",
            IntegrationConfig::Tomorrowio(_) => "tomorrowio",
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            IntegrationConfig::Meteoclimatic(c) => c.name.as_deref(),
            IntegrationConfig::Tomorrowio(c) => c.name.as_deref(),
        }
    }

    pub fn scan_interval(&self) -> Option<u64> {
        match self {
            IntegrationConfig::Meteoclimatic(c) => c.scan_interval,
            IntegrationConfig::Tomorrowio(c) => c.scan_interval,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join("wxsense").join("config.toml"))
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for integration in &self.integrations {
            if integration.scan_interval() == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "{}: scan_interval must be at least 1 second",
                    integration.platform()
                )));
            }
            if let IntegrationConfig::Tomorrowio(c) = integration {
                if c.max_requests_per_day == 0 {
                    return Err(ConfigError::Invalid(
                        "tomorrowio: max_requests_per_day must be positive".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_both_platforms() {
        let file = write_config(
            r#"
units = "imperial"

[[integrations]]
platform = "meteoclimatic"
station_code = "ESCAT4300000043206B"

[[integrations]]
platform = "tomorrowio"
api_key = "abc"
latitude = 41.15
longitude = 1.10
name = "Home"
scan_interval = 300
"#,
        );

        let config = Config::load_from(file.path()).unwrap();

        assert_eq!(config.units, UnitSystem::Imperial);
        assert_eq!(config.integrations.len(), 2);
        assert_eq!(config.integrations[0].platform(), "meteoclimatic");
        assert_eq!(config.integrations[0].name(), None);
        match &config.integrations[1] {
            IntegrationConfig::Tomorrowio(c) => {
                assert_eq!(c.api_key, "abc");
                assert_eq!(c.scan_interval, Some(300));
                assert_eq!(c.max_requests_per_day, DEFAULT_MAX_REQUESTS_PER_DAY);
            }
            other => panic!("unexpected integration {:?}", other),
        }
    }

    #[test]
    fn test_units_default_to_metric() {
        let file = write_config("");
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.units, UnitSystem::Metric);
        assert!(config.integrations.is_empty());
    }

    #[test]
    fn test_unknown_platform_is_rejected() {
        let file = write_config(
            r#"
[[integrations]]
platform = "darksky"
"#,
        );
        assert!(matches!(
            Config::load_from(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_zero_scan_interval_is_rejected() {
        let file = write_config(
            r#"
[[integrations]]
platform = "meteoclimatic"
station_code = "ESX"
scan_interval = 0
"#,
        );
        assert!(matches!(
            Config::load_from(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load_from(Path::new("/nonexistent/wxsense.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
