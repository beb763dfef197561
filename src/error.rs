use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error("{name} is not ready: {source}")]
    NotReady {
        name: String,
        #[source]
        source: UpdateFailed,
    },
}

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("Could not connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },
}

impl NetworkError {
    pub fn from_reqwest(err: reqwest::Error, url: &str, timeout_secs: u64) -> Self {
        // Query strings carry api keys.
        let url = redact_query(url);
        if err.is_timeout() {
            NetworkError::Timeout { url, timeout_secs }
        } else if err.is_connect() {
            NetworkError::Connect {
                url,
                message: err.without_url().to_string(),
            }
        } else {
            NetworkError::Request {
                url,
                message: err.without_url().to_string(),
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            NetworkError::Timeout { timeout_secs, .. } => format!(
                "The weather service did not answer within {} seconds. Check your connection or try again later.",
                timeout_secs
            ),
            NetworkError::Connect { .. } => {
                "Could not reach the weather service. Check your internet connection.".to_string()
            }
            NetworkError::Request { message, .. } => {
                format!("The weather service request failed: {}", message)
            }
        }
    }
}

fn redact_query(url: &str) -> String {
    match url.split_once('?') {
        Some((base, _)) => base.to_string(),
        None => url.to_string(),
    }
}

/// Failure of a single provider fetch.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("{provider} answered with HTTP {status}")]
    Status {
        provider: &'static str,
        status: u16,
    },

    #[error("Could not parse {provider} response: {message}")]
    Parse {
        provider: &'static str,
        message: String,
    },

    #[error("Station {0} not found")]
    StationNotFound(String),
}

/// Generic refresh failure raised by a coordinator, carrying the cause.
#[derive(Debug, Error)]
pub enum UpdateFailed {
    #[error("Error while retrieving data: {0}")]
    Provider(#[from] ProviderError),

    #[error("Fetch worker did not complete: {0}")]
    Worker(String),
}

impl UpdateFailed {
    /// Short explanation for the console; network causes get a hint.
    pub fn user_message(&self) -> String {
        match self {
            UpdateFailed::Provider(ProviderError::Network(err)) => err.user_friendly_message(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error(
        "Sensor '{key}' must include both imperial and metric units or they must both be None"
    )]
    UnitMismatch { key: &'static str },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("No config directory available on this platform")]
    NoConfigDir,

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
