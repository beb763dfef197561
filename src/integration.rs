//! Config-entry lifecycle: build the provider and descriptor table, block
//! on the first refresh, then bind one sensor entity per descriptor.

use crate::config::{Config, IntegrationConfig};
use crate::coordinator::DataUpdateCoordinator;
use crate::error::{DescriptorError, WeatherError};
use crate::sensor::{SensorEntity, SensorEntityDescription};
use crate::weather::units::UnitSystem;
use crate::weather::{WeatherProvider, create_provider, meteoclimatic, tomorrowio};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

/// Tomorrow.io answers the whole field list with one timelines call.
const TOMORROWIO_REQUESTS_PER_UPDATE: u32 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigEntry {
    pub entry_id: String,
    pub unique_id: String,
    pub title: String,
    pub data: IntegrationConfig,
}

impl ConfigEntry {
    pub fn new(index: usize, data: IntegrationConfig) -> Self {
        let unique_id = match &data {
            IntegrationConfig::Meteoclimatic(c) => c.station_code.trim().to_string(),
            IntegrationConfig::Tomorrowio(c) => format!("{}_{}", c.latitude, c.longitude),
        };
        let title = match (&data, data.name()) {
            (_, Some(name)) => name.to_string(),
            (IntegrationConfig::Meteoclimatic(_), None) => unique_id.clone(),
            (IntegrationConfig::Tomorrowio(_), None) => "Tomorrow.io".to_string(),
        };

        Self {
            entry_id: format!("{}-{}", data.platform(), index),
            unique_id,
            title,
            data,
        }
    }

    pub fn from_config(config: &Config) -> Vec<ConfigEntry> {
        config
            .integrations
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, data)| ConfigEntry::new(index, data))
            .collect()
    }

    pub fn update_interval(&self, config: &Config) -> Duration {
        if let Some(secs) = self.data.scan_interval() {
            return Duration::from_secs(secs);
        }
        match &self.data {
            IntegrationConfig::Meteoclimatic(_) => meteoclimatic::SCAN_INTERVAL,
            IntegrationConfig::Tomorrowio(c) => {
                let sharing_key = config
                    .integrations
                    .iter()
                    .filter(|other| matches!(other, IntegrationConfig::Tomorrowio(o) if o.api_key == c.api_key))
                    .count();
                tomorrowio::update_interval(
                    sharing_key,
                    c.max_requests_per_day,
                    TOMORROWIO_REQUESTS_PER_UPDATE,
                )
            }
        }
    }

    pub fn sensor_types(&self) -> Result<Vec<SensorEntityDescription>, DescriptorError> {
        match &self.data {
            IntegrationConfig::Meteoclimatic(_) => meteoclimatic::sensor_types(),
            IntegrationConfig::Tomorrowio(_) => tomorrowio::sensor_types(),
        }
    }
}

pub struct Integration {
    entry: ConfigEntry,
    coordinator: Arc<DataUpdateCoordinator>,
    entities: Vec<SensorEntity>,
    task: Option<JoinHandle<()>>,
}

impl Integration {
    pub async fn setup(entry: ConfigEntry, config: &Config) -> Result<Self, WeatherError> {
        let provider = create_provider(&entry.data)?;
        let descriptors = entry.sensor_types()?;
        let interval = entry.update_interval(config);
        Self::setup_with(entry, provider, descriptors, interval, config.units).await
    }

    pub(crate) async fn setup_with(
        mut entry: ConfigEntry,
        provider: Arc<dyn WeatherProvider>,
        descriptors: Vec<SensorEntityDescription>,
        update_interval: Duration,
        units: UnitSystem,
    ) -> Result<Self, WeatherError> {
        let coordinator = Arc::new(DataUpdateCoordinator::new(
            format!("{} Coordinator for {}", provider.get_name(), entry.unique_id),
            provider,
            update_interval,
        ));

        coordinator.first_refresh().await?;

        let handle = coordinator.subscribe();
        if entry.data.name().is_none()
            && let Some(station) = handle
                .get("station_name")
                .and_then(|v| v.as_str().map(str::to_string))
        {
            entry.title = station;
        }

        let entities: Vec<SensorEntity> = descriptors
            .into_iter()
            .map(|desc| SensorEntity::new(&entry, handle.clone(), desc, units))
            .collect();

        info!(
            entry = %entry.entry_id,
            title = %entry.title,
            coordinator = coordinator.name(),
            sensors = entities.len(),
            interval_secs = coordinator.update_interval().as_secs(),
            "Set up integration"
        );

        Ok(Self {
            entry,
            coordinator,
            entities,
            task: None,
        })
    }

    /// Starts periodic polling. Calling it twice has no effect.
    pub fn start(&mut self) {
        if self.task.is_none() {
            self.task = Some(Arc::clone(&self.coordinator).spawn());
        }
    }

    pub fn unload(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!(entry = %self.entry.entry_id, "Unloaded integration");
        }
    }

    pub fn entry(&self) -> &ConfigEntry {
        &self.entry
    }

    pub fn coordinator(&self) -> &Arc<DataUpdateCoordinator> {
        &self.coordinator
    }

    pub fn entities(&self) -> &[SensorEntity] {
        &self.entities
    }
}

impl Drop for Integration {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_MAX_REQUESTS_PER_DAY, MeteoclimaticConfig, TomorrowioConfig};
    use crate::coordinator::tests::{FakeProvider, snapshot};
    use crate::error::ProviderError;
    use serde_json::json;

    fn meteoclimatic_entry(name: Option<&str>) -> ConfigEntry {
        ConfigEntry::new(
            0,
            IntegrationConfig::Meteoclimatic(MeteoclimaticConfig {
                station_code: "ESCAT4300000043206B".to_string(),
                name: name.map(str::to_string),
                scan_interval: None,
            }),
        )
    }

    fn tomorrowio_config(api_key: &str, scan_interval: Option<u64>) -> IntegrationConfig {
        IntegrationConfig::Tomorrowio(TomorrowioConfig {
            api_key: api_key.to_string(),
            latitude: 41.15,
            longitude: 1.1,
            name: None,
            scan_interval,
            max_requests_per_day: DEFAULT_MAX_REQUESTS_PER_DAY,
        })
    }

    #[test]
    fn test_entry_ids() {
        let entry = meteoclimatic_entry(None);
        assert_eq!(entry.entry_id, "meteoclimatic-0");
        assert_eq!(entry.unique_id, "ESCAT4300000043206B");
        assert_eq!(entry.title, "ESCAT4300000043206B");

        let entry = ConfigEntry::new(3, tomorrowio_config("key", None));
        assert_eq!(entry.entry_id, "tomorrowio-3");
        assert_eq!(entry.unique_id, "41.15_1.1");
        assert_eq!(entry.title, "Tomorrow.io");
    }

    #[test]
    fn test_update_intervals() {
        let config = Config {
            units: UnitSystem::Metric,
            integrations: vec![
                tomorrowio_config("shared", None),
                tomorrowio_config("shared", None),
                tomorrowio_config("other", Some(120)),
            ],
        };
        let entries = ConfigEntry::from_config(&config);

        assert_eq!(entries[0].update_interval(&config).as_secs(), 384);
        assert_eq!(entries[2].update_interval(&config), Duration::from_secs(120));
        assert_eq!(
            meteoclimatic_entry(None).update_interval(&config),
            meteoclimatic::SCAN_INTERVAL
        );
    }

    #[tokio::test]
    async fn test_setup_binds_entities_and_uses_station_name() {
        let provider = Arc::new(FakeProvider::new(vec![Ok(snapshot(json!({
            "station_name": "Reus - Nord",
            "temp_current": 18.4,
        })))]));
        let entry = meteoclimatic_entry(None);
        let descriptors = entry.sensor_types().unwrap();

        let integration = Integration::setup_with(
            entry,
            provider,
            descriptors,
            Duration::from_secs(600),
            UnitSystem::Metric,
        )
        .await
        .unwrap();

        assert_eq!(integration.entities().len(), 13);
        let temp = &integration.entities()[0];
        assert_eq!(temp.name(), "Reus - Nord - Temperature");
        assert_eq!(temp.unique_id(), "ESCAT4300000043206B_temp_current");
        assert_eq!(temp.state(UnitSystem::Metric), "18.4");
        assert_eq!(integration.entities()[12].state(UnitSystem::Metric), "unknown");
    }

    #[tokio::test]
    async fn test_configured_name_wins() {
        let provider = Arc::new(FakeProvider::new(vec![Ok(snapshot(json!({
            "station_name": "Reus - Nord",
        })))]));
        let entry = meteoclimatic_entry(Some("Garden"));
        let descriptors = entry.sensor_types().unwrap();

        let integration = Integration::setup_with(
            entry,
            provider,
            descriptors,
            Duration::from_secs(600),
            UnitSystem::Metric,
        )
        .await
        .unwrap();

        assert_eq!(integration.entry().title, "Garden");
        assert_eq!(integration.entities()[0].name(), "Garden - Temperature");
    }

    #[tokio::test]
    async fn test_setup_fails_fast_on_first_refresh() {
        let provider = Arc::new(FakeProvider::new(vec![Err(ProviderError::StationNotFound(
            "ESCAT4300000043206B".to_string(),
        ))]));
        let entry = meteoclimatic_entry(None);
        let descriptors = entry.sensor_types().unwrap();

        let result = Integration::setup_with(
            entry,
            provider,
            descriptors,
            Duration::from_secs(600),
            UnitSystem::Metric,
        )
        .await;

        assert!(matches!(result, Err(WeatherError::NotReady { .. })));
    }

    #[tokio::test]
    async fn test_start_and_unload() {
        let provider = Arc::new(FakeProvider::new(vec![Ok(snapshot(json!({"rain": 0.2})))]));
        let entry = meteoclimatic_entry(None);
        let descriptors = entry.sensor_types().unwrap();
        let mut integration = Integration::setup_with(
            entry,
            provider,
            descriptors,
            Duration::from_secs(600),
            UnitSystem::Metric,
        )
        .await
        .unwrap();

        integration.start();
        integration.start();
        assert!(integration.task.is_some());

        integration.unload();
        assert!(integration.task.is_none());
        assert_eq!(integration.entities()[12].state(UnitSystem::Metric), "0.2");
    }
}
