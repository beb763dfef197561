use crate::error::{DescriptorError, NetworkError, ProviderError};
use crate::sensor::{
    Conversion, SensorDeviceClass, SensorEntityDescription, SensorStateClass, ValueMap,
    ppb_to_ugm3,
};
use crate::weather::provider::{Snapshot, WeatherProvider};
use crate::weather::units::{
    BTUS_PER_HOUR_SQUARE_FOOT, CELSIUS, HECTOPASCALS, KILOMETERS, METERS_PER_SECOND,
    MICROGRAMS_PER_CUBIC_METER, MILES, MILES_PER_HOUR, PARTS_PER_MILLION, PERCENTAGE,
    WATTS_PER_SQUARE_METER, km_to_miles, ms_to_mph,
};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const TOMORROWIO_BASE_URL: &str = "https://api.tomorrow.io/v4/timelines";
const TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Fraction of the daily request quota the poller allows itself.
const QUOTA_SHARE: f64 = 0.9;

pub const ATTR_FEELS_LIKE: &str = "temperatureApparent";
pub const ATTR_DEW_POINT: &str = "dewPoint";
pub const ATTR_PRESSURE_SURFACE_LEVEL: &str = "pressureSurfaceLevel";
pub const ATTR_SOLAR_GHI: &str = "solarGHI";
pub const ATTR_CLOUD_BASE: &str = "cloudBase";
pub const ATTR_CLOUD_CEILING: &str = "cloudCeiling";
pub const ATTR_CLOUD_COVER: &str = "cloudCover";
pub const ATTR_WIND_GUST: &str = "windGust";
pub const ATTR_PRECIPITATION_TYPE: &str = "precipitationType";
pub const ATTR_OZONE: &str = "pollutantO3";
pub const ATTR_PARTICULATE_MATTER_25: &str = "particulateMatter25";
pub const ATTR_PARTICULATE_MATTER_10: &str = "particulateMatter10";
pub const ATTR_NITROGEN_DIOXIDE: &str = "pollutantNO2";
pub const ATTR_CARBON_MONOXIDE: &str = "pollutantCO";
pub const ATTR_SULPHUR_DIOXIDE: &str = "pollutantSO2";
pub const ATTR_EPA_AQI: &str = "epaIndex";
pub const ATTR_EPA_PRIMARY_POLLUTANT: &str = "epaPrimaryPollutant";
pub const ATTR_EPA_HEALTH_CONCERN: &str = "epaHealthConcern";
pub const ATTR_CHINA_AQI: &str = "mepIndex";
pub const ATTR_CHINA_PRIMARY_POLLUTANT: &str = "mepPrimaryPollutant";
pub const ATTR_CHINA_HEALTH_CONCERN: &str = "mepHealthConcern";
pub const ATTR_POLLEN_TREE: &str = "treeIndex";
pub const ATTR_POLLEN_WEED: &str = "weedIndex";
pub const ATTR_POLLEN_GRASS: &str = "grassIndex";
pub const ATTR_FIRE_INDEX: &str = "fireIndex";
pub const ATTR_UV_INDEX: &str = "uvIndex";
pub const ATTR_UV_HEALTH_CONCERN: &str = "uvHealthConcern";

pub const ATTR_OBSERVATION_TIME: &str = "observation_time";

const FIELDS: &[&str] = &[
    ATTR_FEELS_LIKE,
    ATTR_DEW_POINT,
    ATTR_PRESSURE_SURFACE_LEVEL,
    ATTR_SOLAR_GHI,
    ATTR_CLOUD_BASE,
    ATTR_CLOUD_CEILING,
    ATTR_CLOUD_COVER,
    ATTR_WIND_GUST,
    ATTR_PRECIPITATION_TYPE,
    ATTR_OZONE,
    ATTR_PARTICULATE_MATTER_25,
    ATTR_PARTICULATE_MATTER_10,
    ATTR_NITROGEN_DIOXIDE,
    ATTR_CARBON_MONOXIDE,
    ATTR_SULPHUR_DIOXIDE,
    ATTR_EPA_AQI,
    ATTR_EPA_PRIMARY_POLLUTANT,
    ATTR_EPA_HEALTH_CONCERN,
    ATTR_CHINA_AQI,
    ATTR_CHINA_PRIMARY_POLLUTANT,
    ATTR_CHINA_HEALTH_CONCERN,
    ATTR_POLLEN_TREE,
    ATTR_POLLEN_WEED,
    ATTR_POLLEN_GRASS,
    ATTR_FIRE_INDEX,
    ATTR_UV_INDEX,
    ATTR_UV_HEALTH_CONCERN,
];

pub struct TomorrowioProvider {
    base_url: String,
    api_key: String,
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct TimelinesResponse {
    data: TimelinesData,
}

#[derive(Debug, Deserialize)]
struct TimelinesData {
    timelines: Vec<Timeline>,
}

#[derive(Debug, Deserialize)]
struct Timeline {
    timestep: String,
    intervals: Vec<Interval>,
}

#[derive(Debug, Deserialize)]
struct Interval {
    #[serde(rename = "startTime")]
    start_time: String,
    values: Snapshot,
}

impl TomorrowioProvider {
    pub fn new(api_key: String, latitude: f64, longitude: f64) -> Self {
        Self {
            base_url: TOMORROWIO_BASE_URL.to_string(),
            api_key,
            latitude,
            longitude,
        }
    }

    fn build_url(&self) -> String {
        format!(
            "{}?location={},{}&fields={}&timesteps=current&units=metric&apikey={}",
            self.base_url,
            self.latitude,
            self.longitude,
            FIELDS.join(","),
            self.api_key
        )
    }

    fn parse_response(body: &str) -> Result<Snapshot, ProviderError> {
        let parse_error = |message: String| ProviderError::Parse {
            provider: "Tomorrow.io",
            message,
        };

        let response: TimelinesResponse =
            serde_json::from_str(body).map_err(|e| parse_error(e.to_string()))?;

        let timeline = response
            .data
            .timelines
            .into_iter()
            .find(|t| t.timestep == "current")
            .ok_or_else(|| parse_error("no current timeline".to_string()))?;

        let interval = timeline
            .intervals
            .into_iter()
            .next()
            .ok_or_else(|| parse_error("current timeline has no intervals".to_string()))?;

        let mut snapshot = interval.values;
        snapshot.insert(
            ATTR_OBSERVATION_TIME.to_string(),
            Value::String(interval.start_time),
        );
        Ok(snapshot)
    }
}

impl WeatherProvider for TomorrowioProvider {
    fn fetch(&self) -> Result<Snapshot, ProviderError> {
        let url = self.build_url();
        // Built per call: the blocking client must live and die on this worker.
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| NetworkError::from_reqwest(e, &url, TIMEOUT_SECS))?;

        let response = client
            .get(&url)
            .send()
            .map_err(|e| NetworkError::from_reqwest(e, &url, TIMEOUT_SECS))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                provider: self.get_name(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .map_err(|e| NetworkError::from_reqwest(e, &url, TIMEOUT_SECS))?;
        let snapshot = Self::parse_response(&body)?;
        debug!(
            latitude = self.latitude,
            longitude = self.longitude,
            fields = snapshot.len(),
            "Fetched Tomorrow.io realtime values"
        );
        Ok(snapshot)
    }

    fn get_name(&self) -> &'static str {
        "Tomorrow.io"
    }
}

/// Poll interval that keeps `entries` locations sharing one API key under
/// 90% of the daily quota.
pub fn update_interval(
    entries: usize,
    max_requests_per_day: u32,
    requests_per_update: u32,
) -> Duration {
    let minutes = (24.0 * 60.0 * entries.max(1) as f64 * requests_per_update as f64)
        / (max_requests_per_day.max(1) as f64 * QUOTA_SHARE);
    Duration::from_secs_f64(minutes * 60.0)
}

pub fn sensor_types() -> Result<Vec<SensorEntityDescription>, DescriptorError> {
    let types = vec![
        SensorEntityDescription::builder("feels_like", ATTR_FEELS_LIKE, "Feels Like")
            .native_unit(CELSIUS)
            .device_class(SensorDeviceClass::Temperature),
        SensorEntityDescription::builder("dew_point", ATTR_DEW_POINT, "Dew Point")
            .icon("mdi:thermometer-water")
            .native_unit(CELSIUS)
            .device_class(SensorDeviceClass::Temperature),
        // hPa
        SensorEntityDescription::builder(
            "pressure_surface_level",
            ATTR_PRESSURE_SURFACE_LEVEL,
            "Pressure (Surface Level)",
        )
        .native_unit(HECTOPASCALS)
        .device_class(SensorDeviceClass::Pressure),
        // W/m², BTU/(h⋅ft²) for imperial
        SensorEntityDescription::builder(
            "global_horizontal_irradiance",
            ATTR_SOLAR_GHI,
            "Global Horizontal Irradiance",
        )
        .unit_metric(WATTS_PER_SQUARE_METER)
        .unit_imperial(BTUS_PER_HOUR_SQUARE_FOOT)
        .imperial_conversion(Conversion::Scale(1.0 / 3.15459))
        .device_class(SensorDeviceClass::Irradiance),
        SensorEntityDescription::builder("cloud_base", ATTR_CLOUD_BASE, "Cloud Base")
            .icon("mdi:cloud-arrow-down")
            .unit_metric(KILOMETERS)
            .unit_imperial(MILES)
            .imperial_conversion(Conversion::Function(km_to_miles)),
        SensorEntityDescription::builder("cloud_ceiling", ATTR_CLOUD_CEILING, "Cloud Ceiling")
            .icon("mdi:cloud-arrow-up")
            .unit_metric(KILOMETERS)
            .unit_imperial(MILES)
            .imperial_conversion(Conversion::Function(km_to_miles)),
        SensorEntityDescription::builder("cloud_cover", ATTR_CLOUD_COVER, "Cloud Cover")
            .icon("mdi:cloud-percent")
            .native_unit(PERCENTAGE),
        SensorEntityDescription::builder("wind_gust", ATTR_WIND_GUST, "Wind Gust")
            .icon("mdi:weather-windy")
            .unit_metric(METERS_PER_SECOND)
            .unit_imperial(MILES_PER_HOUR)
            .imperial_conversion(Conversion::Function(ms_to_mph)),
        SensorEntityDescription::builder(
            "precipitation_type",
            ATTR_PRECIPITATION_TYPE,
            "Precipitation Type",
        )
        .value_map(ValueMap::PrecipitationType)
        .translation_key("precipitation_type")
        .icon("mdi:weather-snowy-rainy"),
        // ppb in, µg/m³ out. Molecular weight of ozone is 48.
        SensorEntityDescription::builder("ozone", ATTR_OZONE, "Ozone")
            .native_unit(MICROGRAMS_PER_CUBIC_METER)
            .multiplication_factor(ppb_to_ugm3(48.0))
            .device_class(SensorDeviceClass::Ozone),
        SensorEntityDescription::builder(
            "particulate_matter_2_5_mm",
            ATTR_PARTICULATE_MATTER_25,
            "Particulate Matter < 2.5 μm",
        )
        .native_unit(MICROGRAMS_PER_CUBIC_METER)
        .device_class(SensorDeviceClass::Pm25),
        SensorEntityDescription::builder(
            "particulate_matter_10_mm",
            ATTR_PARTICULATE_MATTER_10,
            "Particulate Matter < 10 μm",
        )
        .native_unit(MICROGRAMS_PER_CUBIC_METER)
        .device_class(SensorDeviceClass::Pm10),
        SensorEntityDescription::builder(
            "nitrogen_dioxide",
            ATTR_NITROGEN_DIOXIDE,
            "Nitrogen Dioxide",
        )
        .native_unit(MICROGRAMS_PER_CUBIC_METER)
        .multiplication_factor(ppb_to_ugm3(46.01))
        .device_class(SensorDeviceClass::NitrogenDioxide),
        // ppb in, ppm out
        SensorEntityDescription::builder(
            "carbon_monoxide",
            ATTR_CARBON_MONOXIDE,
            "Carbon Monoxide",
        )
        .native_unit(PARTS_PER_MILLION)
        .multiplication_factor(Conversion::Scale(1.0 / 1000.0))
        .device_class(SensorDeviceClass::Co),
        SensorEntityDescription::builder(
            "sulphur_dioxide",
            ATTR_SULPHUR_DIOXIDE,
            "Sulphur Dioxide",
        )
        .native_unit(MICROGRAMS_PER_CUBIC_METER)
        .multiplication_factor(ppb_to_ugm3(64.07))
        .device_class(SensorDeviceClass::SulphurDioxide),
        SensorEntityDescription::builder(
            "us_epa_air_quality_index",
            ATTR_EPA_AQI,
            "US EPA Air Quality Index",
        )
        .device_class(SensorDeviceClass::Aqi),
        SensorEntityDescription::builder(
            "us_epa_primary_pollutant",
            ATTR_EPA_PRIMARY_POLLUTANT,
            "US EPA Primary Pollutant",
        )
        .value_map(ValueMap::PrimaryPollutant)
        .translation_key("primary_pollutant"),
        SensorEntityDescription::builder(
            "us_epa_health_concern",
            ATTR_EPA_HEALTH_CONCERN,
            "US EPA Health Concern",
        )
        .value_map(ValueMap::HealthConcern)
        .translation_key("health_concern")
        .icon("mdi:hospital"),
        SensorEntityDescription::builder(
            "china_mep_air_quality_index",
            ATTR_CHINA_AQI,
            "China MEP Air Quality Index",
        )
        .device_class(SensorDeviceClass::Aqi),
        SensorEntityDescription::builder(
            "china_mep_primary_pollutant",
            ATTR_CHINA_PRIMARY_POLLUTANT,
            "China MEP Primary Pollutant",
        )
        .value_map(ValueMap::PrimaryPollutant)
        .translation_key("primary_pollutant"),
        SensorEntityDescription::builder(
            "china_mep_health_concern",
            ATTR_CHINA_HEALTH_CONCERN,
            "China MEP Health Concern",
        )
        .value_map(ValueMap::HealthConcern)
        .translation_key("health_concern")
        .icon("mdi:hospital"),
        SensorEntityDescription::builder("tree_pollen_index", ATTR_POLLEN_TREE, "Tree Pollen Index")
            .icon("mdi:tree")
            .value_map(ValueMap::PollenIndex)
            .translation_key("pollen_index"),
        SensorEntityDescription::builder("weed_pollen_index", ATTR_POLLEN_WEED, "Weed Pollen Index")
            .value_map(ValueMap::PollenIndex)
            .translation_key("pollen_index")
            .icon("mdi:flower-pollen"),
        SensorEntityDescription::builder(
            "grass_pollen_index",
            ATTR_POLLEN_GRASS,
            "Grass Pollen Index",
        )
        .icon("mdi:grass")
        .value_map(ValueMap::PollenIndex)
        .translation_key("pollen_index"),
        SensorEntityDescription::builder("fire_index", ATTR_FIRE_INDEX, "Fire Index")
            .icon("mdi:fire"),
        SensorEntityDescription::builder("uv_index", ATTR_UV_INDEX, "UV Index")
            .state_class(SensorStateClass::Measurement)
            .icon("mdi:sun-wireless"),
        SensorEntityDescription::builder(
            "uv_radiation_health_concern",
            ATTR_UV_HEALTH_CONCERN,
            "UV Radiation Health Concern",
        )
        .value_map(ValueMap::UvDescription)
        .translation_key("uv_index")
        .icon("mdi:weather-sunny-alert"),
    ];

    types
        .into_iter()
        .map(|builder| builder.disabled_by_default().build())
        .collect()
}
