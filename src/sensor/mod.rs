pub mod description;
pub mod entity;
pub mod value_map;

pub use description::{
    Conversion, SensorDeviceClass, SensorEntityDescription, SensorStateClass, ppb_to_ugm3,
};
pub use entity::{NativeValue, SensorEntity};
pub use value_map::ValueMap;
