use crate::integration::Integration;
use crate::sensor::{NativeValue, SensorEntity};
use crate::weather::units::UnitSystem;

pub struct SensorDisplay;

impl SensorDisplay {
    pub fn format_entity(entity: &SensorEntity, units: UnitSystem) -> String {
        let state = entity.state(units);
        // Text readings carry no unit.
        let unit = match entity.native_value(units) {
            Some(NativeValue::Number(_)) => entity.unit_of_measurement(),
            _ => None,
        };
        let mut line = match unit {
            Some(unit) => format!("  {:<50} {} {}", entity.name(), state, unit),
            None => format!("  {:<50} {}", entity.name(), state),
        };
        if !entity.available() {
            line.push_str(" (stale)");
        }
        line
    }

    /// Registry metadata of a sensor, one indented line.
    pub fn format_details(entity: &SensorEntity) -> String {
        let desc = entity.description();
        let mut parts = vec![format!("id: {}", entity.unique_id())];
        if let Some(icon) = entity.icon() {
            parts.push(format!("icon: {}", icon));
        }
        if let Some(device_class) = desc.device_class() {
            parts.push(format!("device class: {}", device_class.as_str()));
        }
        if let Some(state_class) = desc.state_class() {
            parts.push(format!("state class: {}", state_class.as_str()));
        }
        if let Some(translation_key) = desc.translation_key() {
            parts.push(format!("translation key: {}", translation_key));
        }
        if let Some(options) = desc.options() {
            parts.push(format!("options: {}", options.join(", ")));
        }
        if !entity.enabled_by_default() {
            parts.push("disabled by default".to_string());
        }
        format!("      {}", parts.join(" | "))
    }

    pub fn format_header(integration: &Integration) -> String {
        let coordinator = integration.coordinator();
        let handle = coordinator.subscribe();
        let updated = handle
            .last_updated()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never".to_string());
        let status = match handle.last_error() {
            Some(err) if !handle.last_update_success() => format!("update failed: {}", err),
            _ => "ok".to_string(),
        };
        format!(
            "{} [{}] | every {}s | last update {} | {}",
            integration.entry().title,
            integration.entry().entry_id,
            coordinator.update_interval().as_secs(),
            updated,
            status
        )
    }

    pub fn render(
        integration: &Integration,
        units: UnitSystem,
        include_disabled: bool,
        details: bool,
    ) -> String {
        let mut lines = vec![Self::format_header(integration)];
        for entity in integration
            .entities()
            .iter()
            .filter(|entity| include_disabled || entity.enabled_by_default())
        {
            lines.push(Self::format_entity(entity, units));
            if details {
                lines.push(Self::format_details(entity));
            }
        }
        lines.join("\n")
    }
}
