//! Well-known metric name constants and channel message types.
//!
//! These are the canonical metric names used in the durable threshold
//! config, the control-channel threshold updates, and the outbound
//! telemetry protocol.

/// Air temperature in degrees Celsius.
pub const METRIC_TEMPERATURE: &str = "temperature";

/// Relative humidity percentage.
pub const METRIC_HUMIDITY: &str = "humidity";

/// CO2 concentration in ppm.
pub const METRIC_CO2: &str = "co2";

/// PM2.5 particulate concentration in µg/m³.
pub const METRIC_PM25: &str = "pm25";

/// Control-channel request type carrying a full threshold mapping.
pub const REQ_CHANGE_THRESHOLDS: &str = "change_thresholds_level";

/// Outbound request type for alert payloads.
pub const REQ_SEND_ALERT: &str = "send_alert";

/// Outbound request type for periodic telemetry payloads.
pub const REQ_SEND_TELEMETRY: &str = "send_telemetry";
