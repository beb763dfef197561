use crate::coordinator::CoordinatorHandle;
use crate::integration::ConfigEntry;
use crate::sensor::description::SensorEntityDescription;
use crate::weather::units::UnitSystem;
use serde_json::Value;
use std::fmt;
use tracing::debug;

pub const STATE_UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Number(f64),
    Text(String),
    Enum(&'static str),
}

impl fmt::Display for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::Number(n) => write!(f, "{}", n),
            NativeValue::Text(s) => f.write_str(s),
            NativeValue::Enum(name) => f.write_str(name),
        }
    }
}

/// Turns one raw snapshot value into a presentable state.
///
/// `None` means the state is unknown.
pub fn render_value(
    desc: &SensorEntityDescription,
    raw: Option<&Value>,
    units: UnitSystem,
) -> Option<NativeValue> {
    let raw = raw.filter(|v| !v.is_null())?;

    if let Some(map) = desc.value_map() {
        let decoded = map.decode(raw);
        if decoded.is_none() {
            debug!(sensor = desc.key(), value = %raw, "Value outside enum");
        }
        return decoded.map(NativeValue::Enum);
    }

    let value = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => return Some(NativeValue::Text(s.clone())),
        Value::Bool(b) => return Some(NativeValue::Text(b.to_string())),
        _ => return None,
    };

    if let Some(factor) = desc.multiplication_factor() {
        return Some(NativeValue::Number(factor.apply(value)));
    }

    if let Some(conversion) = desc.imperial_conversion() {
        let differs = desc
            .unit_imperial()
            .is_some_and(|imperial| Some(imperial) != desc.unit_metric());
        if differs && units.is_imperial() {
            return Some(NativeValue::Number(conversion.apply(value)));
        }
    }

    Some(NativeValue::Number(value))
}

/// One descriptor bound to a coordinator's snapshot.
#[derive(Debug, Clone)]
pub struct SensorEntity {
    description: SensorEntityDescription,
    handle: CoordinatorHandle,
    name: String,
    unique_id: String,
    unit_of_measurement: Option<&'static str>,
}

impl SensorEntity {
    pub fn new(
        entry: &ConfigEntry,
        handle: CoordinatorHandle,
        description: SensorEntityDescription,
        units: UnitSystem,
    ) -> Self {
        let name = format!("{} - {}", entry.title, description.name());
        let unique_id = format!("{}_{}", entry.unique_id, description.key());
        let unit_of_measurement = match description.native_unit_of_measurement() {
            Some(unit) => Some(unit),
            None if units.is_imperial() => description.unit_imperial(),
            None => description.unit_metric(),
        };

        Self {
            description,
            handle,
            name,
            unique_id,
            unit_of_measurement,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn unit_of_measurement(&self) -> Option<&'static str> {
        self.unit_of_measurement
    }

    pub fn description(&self) -> &SensorEntityDescription {
        &self.description
    }

    pub fn icon(&self) -> Option<&'static str> {
        self.description.icon()
    }

    pub fn enabled_by_default(&self) -> bool {
        self.description.entity_registry_enabled_default()
    }

    pub fn available(&self) -> bool {
        self.handle.last_update_success()
    }

    pub fn native_value(&self, units: UnitSystem) -> Option<NativeValue> {
        let snapshot = self.handle.snapshot()?;
        render_value(
            &self.description,
            snapshot.get(self.description.attribute()),
            units,
        )
    }

    pub fn state(&self, units: UnitSystem) -> String {
        self.native_value(units)
            .map(|value| value.to_string())
            .unwrap_or_else(|| STATE_UNKNOWN.to_string())
    }
}
