use serde_json::Value;

/// Enumerations reported by Tomorrow.io as integer codes.
///
/// Codes are contiguous from zero, so each table is indexed by code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueMap {
    PrecipitationType,
    PrimaryPollutant,
    HealthConcern,
    PollenIndex,
    UvDescription,
}

const PRECIPITATION_TYPE: &[&str] = &["n_a", "rain", "snow", "freezing_rain", "ice_pellets"];
const PRIMARY_POLLUTANT: &[&str] = &["pm25", "pm10", "o3", "no2", "co", "so2"];
const HEALTH_CONCERN: &[&str] = &[
    "good",
    "moderate",
    "unhealthy_for_sensitive_groups",
    "unhealthy",
    "very_unhealthy",
    "hazardous",
];
const POLLEN_INDEX: &[&str] = &["none", "very_low", "low", "medium", "high", "very_high"];
const UV_DESCRIPTION: &[&str] = &["low", "moderate", "high", "very_high", "extreme"];

impl ValueMap {
    /// Lower-cased symbolic names, in code order.
    pub fn names(self) -> &'static [&'static str] {
        match self {
            Self::PrecipitationType => PRECIPITATION_TYPE,
            Self::PrimaryPollutant => PRIMARY_POLLUTANT,
            Self::HealthConcern => HEALTH_CONCERN,
            Self::PollenIndex => POLLEN_INDEX,
            Self::UvDescription => UV_DESCRIPTION,
        }
    }

    pub fn decode_code(self, code: i64) -> Option<&'static str> {
        let index = usize::try_from(code).ok()?;
        self.names().get(index).copied()
    }

    /// Decodes a raw snapshot value. Integral floats are accepted since
    /// some payloads report codes as `2.0`.
    pub fn decode(self, raw: &Value) -> Option<&'static str> {
        let code = match raw {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))?,
            _ => return None,
        };
        self.decode_code(code)
    }

    pub fn options(self) -> Vec<String> {
        self.names().iter().map(|name| name.to_string()).collect()
    }
}
