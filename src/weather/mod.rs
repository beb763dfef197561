pub mod factory;
pub mod meteoclimatic;
pub mod provider;
pub mod tomorrowio;
pub mod units;

pub use factory::create_provider;
pub use provider::WeatherProvider;
pub use units::UnitSystem;
