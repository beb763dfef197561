use serde::Deserialize;

pub const CELSIUS: &str = "°C";
pub const PERCENTAGE: &str = "%";
pub const HECTOPASCALS: &str = "hPa";
pub const KILOMETERS: &str = "km";
pub const MILES: &str = "mi";
pub const METERS_PER_SECOND: &str = "m/s";
pub const KILOMETERS_PER_HOUR: &str = "km/h";
pub const MILES_PER_HOUR: &str = "mph";
pub const MILLIMETERS: &str = "mm";
pub const DEGREES: &str = "°";
pub const WATTS_PER_SQUARE_METER: &str = "W/m²";
pub const BTUS_PER_HOUR_SQUARE_FOOT: &str = "BTU/(h⋅ft²)";
pub const MICROGRAMS_PER_CUBIC_METER: &str = "µg/m³";
pub const PARTS_PER_MILLION: &str = "ppm";

const METERS_PER_MILE: f64 = 1609.344;

/// Process-wide measurement preference, read when a sensor renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    pub fn is_imperial(self) -> bool {
        self == UnitSystem::Imperial
    }
}

pub fn km_to_miles(km: f64) -> f64 {
    km * 1000.0 / METERS_PER_MILE
}

pub fn ms_to_mph(speed: f64) -> f64 {
    speed * 3600.0 / METERS_PER_MILE
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
