use crate::error::{DescriptorError, NetworkError, ProviderError};
use crate::sensor::{SensorDeviceClass, SensorEntityDescription, SensorStateClass};
use crate::weather::provider::{Snapshot, WeatherProvider};
use crate::weather::units::{
    CELSIUS, DEGREES, HECTOPASCALS, KILOMETERS_PER_HOUR, MILLIMETERS, PERCENTAGE,
};
use regex::{Captures, Regex};
use serde_json::{Number, Value};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

const METEOCLIMATIC_FEED_URL: &str = "https://www.meteoclimatic.net/feed/rss";
const TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 10;

pub const SCAN_INTERVAL: Duration = Duration::from_secs(600);

// Each group is `current;max;min` except wind (`current;max;bearing`) and
// rain (`daily total`). Decimals use commas.
static DATA_BLOCK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[<(?P<code>[A-Za-z0-9]+);\((?P<temp>[^)]*)\);\((?P<humidity>[^)]*)\);\((?P<pressure>[^)]*)\);\((?P<wind>[^)]*)\);\((?P<rain>[^)]*)\)").unwrap()
});
static ITEM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<item(?:\s[^>]*)?>(?P<item>.*?)</item>").unwrap());
static NUMERIC_ENTITY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(?:[xX](?P<hex>[0-9a-fA-F]+)|(?P<dec>[0-9]+));").unwrap());

const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

pub struct MeteoclimaticProvider {
    base_url: String,
    station_code: String,
}

impl MeteoclimaticProvider {
    pub fn new(station_code: String) -> Self {
        Self {
            base_url: METEOCLIMATIC_FEED_URL.to_string(),
            station_code,
        }
    }

    fn build_url(&self) -> String {
        format!("{}/{}", self.base_url, self.station_code)
    }

    fn parse_feed(station_code: &str, body: &str) -> Result<Snapshot, ProviderError> {
        let item = ITEM_PATTERN
            .captures(body)
            .and_then(|caps| caps.name("item"))
            .map(|m| m.as_str())
            .ok_or_else(|| ProviderError::StationNotFound(station_code.to_string()))?;

        let description = unescape(&element_text(item, "description").unwrap_or_default());
        let caps = DATA_BLOCK_PATTERN
            .captures(&description)
            .ok_or_else(|| ProviderError::Parse {
                provider: "Meteoclimatic",
                message: format!("no data block for station {}", station_code),
            })?;
        let mut snapshot = Snapshot::new();
        snapshot.insert(
            "station_code".to_string(),
            Value::String(caps["code"].to_string()),
        );
        if let Some(name) = element_text(item, "title") {
            snapshot.insert("station_name".to_string(), Value::String(unescape(&name)));
        }
        if let Some(link) = element_text(item, "link") {
            snapshot.insert("station_url".to_string(), Value::String(link));
        }

        insert_fields(
            &mut snapshot,
            &["temp_current", "temp_max", "temp_min", "condition"],
            &group(&caps, "temp"),
        );
        insert_fields(
            &mut snapshot,
            &["humidity_current", "humidity_max", "humidity_min"],
            &group(&caps, "humidity"),
        );
        insert_fields(
            &mut snapshot,
            &["pressure_current", "pressure_max", "pressure_min"],
            &group(&caps, "pressure"),
        );
        insert_fields(
            &mut snapshot,
            &["wind_current", "wind_max", "wind_bearing"],
            &group(&caps, "wind"),
        );
        insert_fields(&mut snapshot, &["rain"], &group(&caps, "rain"));

        let compass = snapshot
            .get("wind_bearing")
            .and_then(Value::as_str)
            .and_then(compass_to_degrees);
        if let Some(degrees) = compass.and_then(Number::from_f64) {
            snapshot.insert("wind_bearing".to_string(), Value::Number(degrees));
        }

        snapshot.insert(
            "reception_time".to_string(),
            Value::String(chrono::Utc::now().to_rfc3339()),
        );
        Ok(snapshot)
    }
}

fn group<'h>(caps: &regex::Captures<'h>, name: &str) -> Vec<&'h str> {
    caps.name(name)
        .map(|m| m.as_str().split(';').collect())
        .unwrap_or_default()
}

fn insert_fields(snapshot: &mut Snapshot, names: &[&str], values: &[&str]) {
    for (name, raw) in names.iter().zip(values.iter().chain(std::iter::repeat(&""))) {
        snapshot.insert(name.to_string(), parse_field(raw));
    }
}

/// Numbers become JSON numbers, blanks become null, anything else is kept
/// as text (condition names, compass bearings).
fn parse_field(raw: &str) -> Value {
    let raw = raw.trim();
    if raw.is_empty() || raw == "-" {
        return Value::Null;
    }
    match raw.replace(',', ".").parse::<f64>() {
        Ok(n) => Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null),
        Err(_) => Value::String(raw.to_string()),
    }
}

fn compass_to_degrees(point: &str) -> Option<f64> {
    let point = point.trim().to_ascii_uppercase();
    COMPASS_POINTS
        .iter()
        .position(|p| *p == point)
        .map(|index| index as f64 * 22.5)
}

/// Text of the first `<tag>` element, attributes allowed, CDATA unwrapped.
fn element_text(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    let mut from = 0;
    let start = loop {
        let at = from + xml[from..].find(&open)?;
        let rest = &xml[at + open.len()..];
        match rest.chars().next() {
            Some('>') => break at + open.len() + 1,
            Some(c) if c.is_whitespace() => break at + open.len() + rest.find('>')? + 1,
            // Longer tag name sharing the prefix.
            _ => from = at + open.len(),
        }
    };
    let end = start + xml[start..].find(&close)?;
    let text = xml[start..end].trim();
    let text = text
        .strip_prefix("<![CDATA[")
        .and_then(|t| t.strip_suffix("]]>"))
        .unwrap_or(text);
    Some(text.trim().to_string())
}

fn unescape(text: &str) -> String {
    let text = NUMERIC_ENTITY_PATTERN.replace_all(text, |caps: &Captures| {
        let code = match (caps.name("hex"), caps.name("dec")) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (_, Some(dec)) => dec.as_str().parse::<u32>().ok(),
            _ => None,
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

impl WeatherProvider for MeteoclimaticProvider {
    fn fetch(&self) -> Result<Snapshot, ProviderError> {
        let url = self.build_url();
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
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::StationNotFound(self.station_code.clone()));
        }
        if !status.is_success() {
            return Err(ProviderError::Status {
                provider: self.get_name(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .map_err(|e| NetworkError::from_reqwest(e, &url, TIMEOUT_SECS))?;
        let snapshot = Self::parse_feed(&self.station_code, &body)?;
        debug!(station = %self.station_code, "Fetched Meteoclimatic observation");
        Ok(snapshot)
    }

    fn get_name(&self) -> &'static str {
        "Meteoclimatic"
    }
}

pub fn sensor_types() -> Result<Vec<SensorEntityDescription>, DescriptorError> {
    let temperature = |key, name| {
        SensorEntityDescription::builder(key, key, name)
            .native_unit(CELSIUS)
            .device_class(SensorDeviceClass::Temperature)
            .state_class(SensorStateClass::Measurement)
    };
    let humidity = |key, name| {
        SensorEntityDescription::builder(key, key, name)
            .native_unit(PERCENTAGE)
            .device_class(SensorDeviceClass::Humidity)
            .state_class(SensorStateClass::Measurement)
    };
    let pressure = |key, name| {
        SensorEntityDescription::builder(key, key, name)
            .native_unit(HECTOPASCALS)
            .device_class(SensorDeviceClass::Pressure)
            .state_class(SensorStateClass::Measurement)
    };

    vec![
        temperature("temp_current", "Temperature"),
        temperature("temp_max", "Daily Max Temperature"),
        temperature("temp_min", "Daily Min Temperature"),
        humidity("humidity_current", "Humidity"),
        humidity("humidity_max", "Daily Max Humidity"),
        humidity("humidity_min", "Daily Min Humidity"),
        pressure("pressure_current", "Pressure"),
        pressure("pressure_max", "Daily Max Pressure"),
        pressure("pressure_min", "Daily Min Pressure"),
        SensorEntityDescription::builder("wind_current", "wind_current", "Wind Speed")
            .native_unit(KILOMETERS_PER_HOUR)
            .device_class(SensorDeviceClass::WindSpeed)
            .icon("mdi:weather-windy"),
        SensorEntityDescription::builder("wind_max", "wind_max", "Daily Max Wind Speed")
            .native_unit(KILOMETERS_PER_HOUR)
            .device_class(SensorDeviceClass::WindSpeed)
            .icon("mdi:weather-windy"),
        SensorEntityDescription::builder("wind_bearing", "wind_bearing", "Wind Bearing")
            .native_unit(DEGREES)
            .icon("mdi:weather-windy"),
        SensorEntityDescription::builder("rain", "rain", "Daily Precipitation")
            .native_unit(MILLIMETERS)
            .device_class(SensorDeviceClass::Precipitation)
            .icon("mdi:cup-water"),
    ]
    .into_iter()
    .map(|builder| builder.build())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
<channel>
<title>Meteoclimatic</title>
<item>
<title>Reus - Nord (Baix Camp)</title>
<link>http://www.meteoclimatic.net/perfil/ESCAT4300000043206B</link>
<pubDate>Sat, 18 Oct 2026 10:00:00 +0000</pubDate>
<description><![CDATA[<ul><li>Temperatura: <b>18,4</b> &deg;C</li></ul>
<!-- [[<BEGIN:ESCAT4300000043206B:DATA>]]
[[<ESCAT4300000043206B;(18,4;21,0;12,3;suncloud);(76;90;55);(1017,2;1018,0;1015,9);(5;19;230);(0,4);(0,0);(0,0);<END:ESCAT4300000043206B:DATA>]] -->]]></description>
</item>
</channel>
</rss>"#;

    #[test]
    fn test_parse_feed() {
        let snapshot =
            MeteoclimaticProvider::parse_feed("ESCAT4300000043206B", FIXTURE).unwrap();

        assert_eq!(snapshot.get("station_code"), Some(&json!("ESCAT4300000043206B")));
        assert_eq!(snapshot.get("station_name"), Some(&json!("Reus - Nord (Baix Camp)")));
        assert_eq!(snapshot.get("temp_current"), Some(&json!(18.4)));
        assert_eq!(snapshot.get("temp_max"), Some(&json!(21.0)));
        assert_eq!(snapshot.get("temp_min"), Some(&json!(12.3)));
        assert_eq!(snapshot.get("condition"), Some(&json!("suncloud")));
        assert_eq!(snapshot.get("humidity_current"), Some(&json!(76.0)));
        assert_eq!(snapshot.get("pressure_current"), Some(&json!(1017.2)));
        assert_eq!(snapshot.get("wind_max"), Some(&json!(19.0)));
        assert_eq!(snapshot.get("wind_bearing"), Some(&json!(230.0)));
        assert_eq!(snapshot.get("rain"), Some(&json!(0.4)));
        assert!(snapshot.contains_key("reception_time"));
    }

    #[test]
    fn test_escaped_description() {
        let body = "<rss><channel><item><title>Station</title><description>&lt;!-- [[&lt;ESX1;(1,5;2;0;sun);(50;60;40);(1000;1001;999);(3;7;NNE);(0)&gt;]] --&gt;</description></item></channel></rss>";
        let snapshot = MeteoclimaticProvider::parse_feed("ESX1", body).unwrap();
        assert_eq!(snapshot.get("temp_current"), Some(&json!(1.5)));
        assert_eq!(snapshot.get("wind_bearing"), Some(&json!(22.5)));
        assert_eq!(snapshot.get("rain"), Some(&json!(0.0)));
    }

    #[test]
    fn test_missing_item_is_station_not_found() {
        let body = "<rss><channel><title>Meteoclimatic</title></channel></rss>";
        assert!(matches!(
            MeteoclimaticProvider::parse_feed("ESX1", body),
            Err(ProviderError::StationNotFound(code)) if code == "ESX1"
        ));
    }

    #[test]
    fn test_item_without_data_block() {
        let body = "<rss><item><title>Station</title><description>offline</description></item></rss>";
        assert!(matches!(
            MeteoclimaticProvider::parse_feed("ESX1", body),
            Err(ProviderError::Parse { .. })
        ));
    }

    #[test]
    fn test_tags_with_attributes_and_numeric_entities() {
        let body = r#"<rss><channel><item xml:id="1"><title>Cal Ram&#243;n &amp; Fill&#xE8;</title><link>http://www.meteoclimatic.net/perfil/ESX1</link><description type="html"><![CDATA[[[<ESX1;(9,1;10;8;rain);(90;95;80);(1008;1010;1005);(12;30;WSW);(4,2)>]]]]></description></item></channel></rss>"#;
        let snapshot = MeteoclimaticProvider::parse_feed("ESX1", body).unwrap();

        assert_eq!(snapshot.get("station_name"), Some(&json!("Cal Ramón & Fillè")));
        assert_eq!(snapshot.get("temp_current"), Some(&json!(9.1)));
        assert_eq!(snapshot.get("wind_bearing"), Some(&json!(247.5)));
        assert_eq!(snapshot.get("rain"), Some(&json!(4.2)));
    }

    #[test]
    fn test_element_text_skips_longer_tag_names() {
        let xml = "<descriptionx>no</descriptionx><description lang=\"ca\">yes</description>";
        assert_eq!(element_text(xml, "description"), Some("yes".to_string()));
        assert_eq!(element_text("<title>T</title>", "description"), None);
    }

    #[test]
    fn test_compass_to_degrees() {
        assert_eq!(compass_to_degrees("N"), Some(0.0));
        assert_eq!(compass_to_degrees("nne"), Some(22.5));
        assert_eq!(compass_to_degrees("NW"), Some(315.0));
        assert_eq!(compass_to_degrees("calm"), None);
    }

    #[test]
    fn test_parse_field() {
        assert_eq!(parse_field("12,5"), json!(12.5));
        assert_eq!(parse_field(" 7 "), json!(7.0));
        assert_eq!(parse_field(""), Value::Null);
        assert_eq!(parse_field("-"), Value::Null);
        assert_eq!(parse_field("hazesun"), json!("hazesun"));
    }

    #[test]
    fn test_blank_values_become_null() {
        let body = "<rss><item><title>S</title><description>[[<ESX1;(;;;);(;;);(;;);(;;);()>]]</description></item></rss>";
        let snapshot = MeteoclimaticProvider::parse_feed("ESX1", body).unwrap();
        assert_eq!(snapshot.get("temp_current"), Some(&Value::Null));
        assert_eq!(snapshot.get("rain"), Some(&Value::Null));
    }

    #[test]
    fn test_sensor_table() {
        let types = sensor_types().unwrap();
        assert_eq!(types.len(), 13);
        assert!(types.iter().all(|d| d.key() == d.attribute()));
        assert!(types.iter().all(|d| d.entity_registry_enabled_default()));
    }

    #[test]
    fn test_build_url() {
        let provider = MeteoclimaticProvider::new("ESX1".to_string());
        assert_eq!(
            provider.build_url(),
            "https://www.meteoclimatic.net/feed/rss/ESX1"
        );
    }
}
