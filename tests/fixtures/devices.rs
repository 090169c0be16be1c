use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Opaque device identifier.
pub struct DeviceId(pub String);

pub type SensorType = &'static str;

/// Kinds of sensor a device can carry.
pub mod sensor_type {
    use super::SensorType;

    /// Air temperature in degrees Celsius.
    pub const TEMPERATURE: SensorType = "temperature";
    /// Relative humidity in percent.
    pub const HUMIDITY: SensorType = "humidity";
    /// Deprecated: pressure sensors were discontinued.
    pub const PRESSURE: SensorType = "pressure";
}

/// Connectivity state reported by the device.
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    /// Reachable and reporting.
    Online,
    Offline,
}

/// A registered device.
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Stable identifier.
    pub device_id: DeviceId,
    pub display_name: Option<String>,
    pub status: DeviceStatus,
    pub location: Option<Location>,
    pub labels: BTreeMap<String, String>,
}

pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

/// One sensor measurement.
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub sensor: SensorType,
    pub value: f64,
    pub taken_at: DateTime<Utc>,
}

/// A page of readings.
pub struct ReadingPage {
    pub items: Vec<Reading>,
    pub next: Option<String>,
}

/// Error payload returned on failure.
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

/// Command sent to a device over the broker.
pub struct Command {
    pub name: String,
    pub arguments: Vec<CommandArgument>,
}

pub struct CommandArgument {
    pub key: String,
    pub value: String,
}
