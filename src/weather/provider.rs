use crate::error::ProviderError;
use serde_json::{Map, Value};

/// Flat field-to-value record produced by one successful poll.
pub type Snapshot = Map<String, Value>;

/// A weather source polled by a coordinator.
///
/// `fetch` is a blocking call; coordinators run it on the blocking pool.
pub trait WeatherProvider: Send + Sync {
    fn fetch(&self) -> Result<Snapshot, ProviderError>;

    fn get_name(&self) -> &'static str;
}
