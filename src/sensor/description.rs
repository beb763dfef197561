use crate::error::DescriptorError;
use crate::sensor::value_map::ValueMap;
use crate::weather::units::round2;

// x µg/m³ = y ppb * molecular weight / 24.45
const PPB_MOLAR_VOLUME: f64 = 24.45;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorDeviceClass {
    Temperature,
    Humidity,
    Pressure,
    Irradiance,
    WindSpeed,
    Precipitation,
    Ozone,
    Pm25,
    Pm10,
    NitrogenDioxide,
    Co,
    SulphurDioxide,
    Aqi,
    Enum,
}

impl SensorDeviceClass {
    pub fn as_str(self) -> &'static str {
        match self {
            SensorDeviceClass::Temperature => "temperature",
            SensorDeviceClass::Humidity => "humidity",
            SensorDeviceClass::Pressure => "pressure",
            SensorDeviceClass::Irradiance => "irradiance",
            SensorDeviceClass::WindSpeed => "wind_speed",
            SensorDeviceClass::Precipitation => "precipitation",
            SensorDeviceClass::Ozone => "ozone",
            SensorDeviceClass::Pm25 => "pm25",
            SensorDeviceClass::Pm10 => "pm10",
            SensorDeviceClass::NitrogenDioxide => "nitrogen_dioxide",
            SensorDeviceClass::Co => "carbon_monoxide",
            SensorDeviceClass::SulphurDioxide => "sulphur_dioxide",
            SensorDeviceClass::Aqi => "aqi",
            SensorDeviceClass::Enum => "enum",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorStateClass {
    Measurement,
}

impl SensorStateClass {
    pub fn as_str(self) -> &'static str {
        match self {
            SensorStateClass::Measurement => "measurement",
        }
    }
}

/// Numeric transformation applied to a raw reading.
#[derive(Debug, Clone, Copy)]
pub enum Conversion {
    Scale(f64),
    Function(fn(f64) -> f64),
}

impl Conversion {
    /// Applies the conversion and rounds to two decimals.
    pub fn apply(self, value: f64) -> f64 {
        let converted = match self {
            Conversion::Scale(factor) => value * factor,
            Conversion::Function(f) => f(value),
        };
        round2(converted)
    }
}

pub fn ppb_to_ugm3(molecular_weight: f64) -> Conversion {
    Conversion::Scale(molecular_weight / PPB_MOLAR_VOLUME)
}

/// Static metadata describing how one snapshot field becomes a sensor.
///
/// Only obtainable through [`SensorEntityDescriptionBuilder::build`], which
/// enforces that metric and imperial units are given together.
#[derive(Debug, Clone)]
pub struct SensorEntityDescription {
    key: &'static str,
    attribute: &'static str,
    name: &'static str,
    icon: Option<&'static str>,
    translation_key: Option<&'static str>,
    native_unit_of_measurement: Option<&'static str>,
    device_class: Option<SensorDeviceClass>,
    state_class: Option<SensorStateClass>,
    unit_metric: Option<&'static str>,
    unit_imperial: Option<&'static str>,
    multiplication_factor: Option<Conversion>,
    imperial_conversion: Option<Conversion>,
    value_map: Option<ValueMap>,
    options: Option<Vec<String>>,
    entity_registry_enabled_default: bool,
}

impl SensorEntityDescription {
    pub fn builder(
        key: &'static str,
        attribute: &'static str,
        name: &'static str,
    ) -> SensorEntityDescriptionBuilder {
        SensorEntityDescriptionBuilder {
            key,
            attribute,
            name,
            icon: None,
            translation_key: None,
            native_unit_of_measurement: None,
            device_class: None,
            state_class: None,
            unit_metric: None,
            unit_imperial: None,
            multiplication_factor: None,
            imperial_conversion: None,
            value_map: None,
            entity_registry_enabled_default: true,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn attribute(&self) -> &'static str {
        self.attribute
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn icon(&self) -> Option<&'static str> {
        self.icon
    }

    pub fn translation_key(&self) -> Option<&'static str> {
        self.translation_key
    }

    pub fn native_unit_of_measurement(&self) -> Option<&'static str> {
        self.native_unit_of_measurement
    }

    pub fn device_class(&self) -> Option<SensorDeviceClass> {
        self.device_class
    }

    pub fn state_class(&self) -> Option<SensorStateClass> {
        self.state_class
    }

    pub fn unit_metric(&self) -> Option<&'static str> {
        self.unit_metric
    }

    pub fn unit_imperial(&self) -> Option<&'static str> {
        self.unit_imperial
    }

    pub fn multiplication_factor(&self) -> Option<Conversion> {
        self.multiplication_factor
    }

    pub fn imperial_conversion(&self) -> Option<Conversion> {
        self.imperial_conversion
    }

    pub fn value_map(&self) -> Option<ValueMap> {
        self.value_map
    }

    pub fn options(&self) -> Option<&[String]> {
        self.options.as_deref()
    }

    pub fn entity_registry_enabled_default(&self) -> bool {
        self.entity_registry_enabled_default
    }
}

pub struct SensorEntityDescriptionBuilder {
    key: &'static str,
    attribute: &'static str,
    name: &'static str,
    icon: Option<&'static str>,
    translation_key: Option<&'static str>,
    native_unit_of_measurement: Option<&'static str>,
    device_class: Option<SensorDeviceClass>,
    state_class: Option<SensorStateClass>,
    unit_metric: Option<&'static str>,
    unit_imperial: Option<&'static str>,
    multiplication_factor: Option<Conversion>,
    imperial_conversion: Option<Conversion>,
    value_map: Option<ValueMap>,
    entity_registry_enabled_default: bool,
}

impl SensorEntityDescriptionBuilder {
    pub fn icon(mut self, icon: &'static str) -> Self {
        self.icon = Some(icon);
        self
    }

    pub fn translation_key(mut self, translation_key: &'static str) -> Self {
        self.translation_key = Some(translation_key);
        self
    }

    pub fn native_unit(mut self, unit: &'static str) -> Self {
        self.native_unit_of_measurement = Some(unit);
        self
    }

    pub fn device_class(mut self, device_class: SensorDeviceClass) -> Self {
        self.device_class = Some(device_class);
        self
    }

    pub fn state_class(mut self, state_class: SensorStateClass) -> Self {
        self.state_class = Some(state_class);
        self
    }

    pub fn unit_metric(mut self, unit: &'static str) -> Self {
        self.unit_metric = Some(unit);
        self
    }

    pub fn unit_imperial(mut self, unit: &'static str) -> Self {
        self.unit_imperial = Some(unit);
        self
    }

    pub fn multiplication_factor(mut self, conversion: Conversion) -> Self {
        self.multiplication_factor = Some(conversion);
        self
    }

    pub fn imperial_conversion(mut self, conversion: Conversion) -> Self {
        self.imperial_conversion = Some(conversion);
        self
    }

    pub fn value_map(mut self, value_map: ValueMap) -> Self {
        self.value_map = Some(value_map);
        self
    }

    pub fn disabled_by_default(mut self) -> Self {
        self.entity_registry_enabled_default = false;
        self
    }

    pub fn build(self) -> Result<SensorEntityDescription, DescriptorError> {
        if self.unit_metric.is_some() != self.unit_imperial.is_some() {
            return Err(DescriptorError::UnitMismatch { key: self.key });
        }

        let (device_class, options) = match self.value_map {
            Some(map) => (Some(SensorDeviceClass::Enum), Some(map.options())),
            None => (self.device_class, None),
        };

        Ok(SensorEntityDescription {
            key: self.key,
            attribute: self.attribute,
            name: self.name,
            icon: self.icon,
            translation_key: self.translation_key,
            native_unit_of_measurement: self.native_unit_of_measurement,
            device_class,
            state_class: self.state_class,
            unit_metric: self.unit_metric,
            unit_imperial: self.unit_imperial,
            multiplication_factor: self.multiplication_factor,
            imperial_conversion: self.imperial_conversion,
            value_map: self.value_map,
            options,
            entity_registry_enabled_default: self.entity_registry_enabled_default,
        })
    }
}
