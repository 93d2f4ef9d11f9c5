//! Telemetry upload to an IoT hub endpoint: a fixed health payload plus simulated per-sensor readings
//! with threshold alerts.

use indexmap::IndexMap;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::context::SimulationContext;
use crate::core::error::ReportError;
use crate::core::metrics::ScenarioReport;
use crate::{log_info, log_warn};
use crate::reporting::Reporter;

/// Message sent on every upload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPayload {
    pub heart_rate: u32,
    pub temperature: f64,
}

impl Default for TelemetryPayload {
    fn default() -> Self {
        Self {
            heart_rate: 82,
            temperature: 36.7,
        }
    }
}

/// Device identity on the hub.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub host_name: String,
    pub device_id: String,
    #[serde(default)]
    pub shared_access_key: String,
}

impl Default for EndpointDescriptor {
    fn default() -> Self {
        Self {
            host_name: "HealthIoTHub2025.azure-devices.net".to_string(),
            device_id: "healthsensor01".to_string(),
            shared_access_key: String::new(),
        }
    }
}

impl EndpointDescriptor {
    /// Formats the descriptor as `HostName=..;DeviceId=..;SharedAccessKey=..`.
    pub fn connection_string(&self) -> String {
        format!(
            "HostName={};DeviceId={};SharedAccessKey={}",
            self.host_name, self.device_id, self.shared_access_key
        )
    }

    /// Parses a device connection string. Unknown keys are ignored.
    pub fn parse(connection_string: &str) -> Result<Self, ReportError> {
        let mut host_name = None;
        let mut device_id = None;
        let mut shared_access_key = None;
        for part in connection_string.split(';').map(|p| p.trim()).filter(|p| !p.is_empty()) {
            // keys may contain '=' padding, so split only once
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| ReportError::UploadFailure(format!("malformed connection string part: {}", part)))?;
            match key {
                "HostName" => host_name = Some(value.to_string()),
                "DeviceId" => device_id = Some(value.to_string()),
                "SharedAccessKey" => shared_access_key = Some(value.to_string()),
                _ => {}
            }
        }
        match (host_name, device_id) {
            (Some(host_name), Some(device_id)) => Ok(Self {
                host_name,
                device_id,
                shared_access_key: shared_access_key.unwrap_or_default(),
            }),
            _ => Err(ReportError::UploadFailure(
                "connection string lacks HostName or DeviceId".to_string(),
            )),
        }
    }
}

const SECONDS_PER_MONTH: f64 = 60. * 60. * 24. * 30.;

/// Value ranges and device parameters of one kind of sensor reading.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReadingProfile {
    pub sensor_name: String,
    pub sensor_type: String,
    pub unit: String,
    /// Range of values produced in the normal state.
    pub normal_range: (f64, f64),
    /// Values at or above this are alerts.
    #[serde(default)]
    pub critical_high: Option<f64>,
    /// Values at or below this are alerts.
    #[serde(default)]
    pub critical_low: Option<f64>,
    /// Power drawn by one transmission, in watts.
    pub power_usage: f64,
}

impl ReadingProfile {
    fn new(
        sensor_name: &str,
        sensor_type: &str,
        unit: &str,
        normal_range: (f64, f64),
        critical_high: Option<f64>,
        critical_low: Option<f64>,
        power_usage: f64,
    ) -> Self {
        Self {
            sensor_name: sensor_name.to_string(),
            sensor_type: sensor_type.to_string(),
            unit: unit.to_string(),
            normal_range,
            critical_high,
            critical_low,
            power_usage,
        }
    }

    pub fn is_alert(&self, value: f64) -> bool {
        self.critical_high.map_or(false, |high| value >= high) || self.critical_low.map_or(false, |low| value <= low)
    }

    /// Draws a value from the normal range, or with `spike_probability` a critical one beyond a threshold.
    pub fn sample<R: Rng>(&self, rng: &mut R, spike_probability: f64) -> f64 {
        let (from, to) = self.normal_range;
        let span = to - from;
        if rng.gen_bool(spike_probability) {
            let critical = match (self.critical_high, self.critical_low) {
                (Some(high), Some(low)) => Some(if rng.gen_bool(0.5) { (high, 1.) } else { (low, -1.) }),
                (Some(high), None) => Some((high, 1.)),
                (None, Some(low)) => Some((low, -1.)),
                (None, None) => None,
            };
            if let Some((threshold, direction)) = critical {
                return threshold + direction * span * rng.gen::<f64>();
            }
        }
        from + span * rng.gen::<f64>()
    }
}

/// Profiles of the five health sensors.
pub fn default_reading_profiles() -> Vec<ReadingProfile> {
    vec![
        ReadingProfile::new("ECG", "ecg", "mV_rms", (0.5, 2.0), Some(3.0), None, 0.05),
        ReadingProfile::new("HeartRate", "bpm", "bpm", (60., 100.), Some(120.), Some(40.), 0.04),
        // systolic pressure
        ReadingProfile::new("BloodPressure", "blood_pressure", "mmHg", (110., 130.), Some(140.), Some(90.), 0.06),
        ReadingProfile::new("Oximeter", "spo2", "%", (95., 100.), None, Some(92.), 0.03),
        ReadingProfile::new("Temperature", "body_temp", "C", (36.1, 37.5), Some(38.0), Some(35.0), 0.03),
    ]
}

/// One reading as sent to the hub.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TelemetryReading {
    pub sensor_name: String,
    pub sensor_type: String,
    pub value: f64,
    pub unit: String,
    /// Simulation time of the reading in seconds.
    pub timestamp: f64,
    pub is_alert: bool,
}

impl TelemetryReading {
    pub fn new(profile: &ReadingProfile, value: f64, timestamp: f64) -> Self {
        Self {
            sensor_name: profile.sensor_name.clone(),
            sensor_type: profile.sensor_type.clone(),
            value,
            unit: profile.unit.clone(),
            timestamp,
            is_alert: profile.is_alert(value),
        }
    }
}

/// Message body with its application properties.
#[derive(Clone, Debug, PartialEq)]
pub struct TelemetryMessage {
    pub body: String,
    pub properties: IndexMap<String, String>,
}

impl TelemetryMessage {
    pub fn json<T: Serialize>(value: &T) -> Result<Self, ReportError> {
        Ok(Self {
            body: serde_json::to_string(value).map_err(|e| ReportError::UploadFailure(e.to_string()))?,
            properties: IndexMap::new(),
        })
    }

    /// Alert readings are marked with `alert=true` and `priority=high`.
    pub fn from_reading(reading: &TelemetryReading) -> Result<Self, ReportError> {
        let mut message = Self::json(reading)?;
        if reading.is_alert {
            message.properties.insert("alert".to_string(), "true".to_string());
            message.properties.insert("priority".to_string(), "high".to_string());
        }
        Ok(message)
    }

    pub fn is_alert(&self) -> bool {
        self.properties.get("alert").map_or(false, |v| v == "true")
    }
}

/// Average monthly power in kW of `transmissions` sends of a device drawing `power_usage` watts each,
/// spread over `sim_time` seconds. Zero for an empty time span.
pub fn transmission_power(transmissions: u64, power_usage: f64, sim_time: f64) -> f64 {
    let months = sim_time / SECONDS_PER_MONTH;
    if months <= 0. {
        return 0.;
    }
    transmissions as f64 * power_usage / months / 1000.
}

fn default_spike_probability() -> f64 {
    0.05
}

fn default_interval() -> f64 {
    1.
}

fn default_seed() -> u64 {
    123
}

/// Telemetry section of the scenario config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub endpoint: EndpointDescriptor,
    #[serde(default)]
    pub payload: TelemetryPayload,
    /// Number of reading rounds sent after the payload, every profile sends once per round.
    #[serde(default)]
    pub rounds: u32,
    /// Simulated seconds between rounds.
    #[serde(default = "default_interval")]
    pub interval: f64,
    #[serde(default = "default_spike_probability")]
    pub spike_probability: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_reading_profiles")]
    pub readings: Vec<ReadingProfile>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            endpoint: EndpointDescriptor::default(),
            payload: TelemetryPayload::default(),
            rounds: 0,
            interval: default_interval(),
            spike_probability: default_spike_probability(),
            seed: default_seed(),
            readings: default_reading_profiles(),
        }
    }
}

/// Trait for implementation of telemetry delivery.
pub trait TelemetryTransport {
    fn send(&mut self, endpoint: &EndpointDescriptor, message: &TelemetryMessage) -> Result<(), ReportError>;
}

/// Transport which only logs the messages and keeps them in memory.
pub struct LogTransport {
    ctx: SimulationContext,
    sent: Vec<TelemetryMessage>,
}

impl LogTransport {
    pub fn new() -> Self {
        Self {
            ctx: SimulationContext::new("telemetry"),
            sent: Vec::new(),
        }
    }

    pub fn sent(&self) -> &[TelemetryMessage] {
        &self.sent
    }
}

impl Default for LogTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryTransport for LogTransport {
    fn send(&mut self, endpoint: &EndpointDescriptor, message: &TelemetryMessage) -> Result<(), ReportError> {
        if message.is_alert() {
            log_warn!(
                self.ctx,
                "alert to {}/devices/{}: {}",
                endpoint.host_name,
                endpoint.device_id,
                message.body
            );
        } else {
            log_info!(
                self.ctx,
                "sending to {}/devices/{}: {}",
                endpoint.host_name,
                endpoint.device_id,
                message.body
            );
        }
        self.sent.push(message.clone());
        Ok(())
    }
}

/// Reporter uploading the configured payload and the configured rounds of readings once per report.
pub struct TelemetryReporter<T: TelemetryTransport> {
    config: TelemetryConfig,
    transport: T,
    rng: Pcg64,
    transmissions: IndexMap<String, u64>,
    elapsed: f64,
}

impl<T: TelemetryTransport> TelemetryReporter<T> {
    pub fn new(config: TelemetryConfig, transport: T) -> Self {
        let transmissions = config
            .readings
            .iter()
            .map(|profile| (profile.sensor_name.clone(), 0))
            .collect();
        Self {
            rng: Pcg64::seed_from_u64(config.seed),
            config,
            transport,
            transmissions,
            elapsed: 0.,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Number of readings delivered per sensor.
    pub fn transmission_counts(&self) -> &IndexMap<String, u64> {
        &self.transmissions
    }

    /// Simulated seconds covered by the sent rounds.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Transmission power per sensor over the elapsed time, see [`transmission_power`].
    pub fn power_stats(&self) -> IndexMap<String, f64> {
        self.config
            .readings
            .iter()
            .map(|profile| {
                let count = self.transmissions.get(&profile.sensor_name).copied().unwrap_or(0);
                (
                    profile.sensor_name.clone(),
                    transmission_power(count, profile.power_usage, self.elapsed),
                )
            })
            .collect()
    }

    fn send_readings(&mut self) -> Result<(), ReportError> {
        for _ in 0..self.config.rounds {
            for profile in &self.config.readings {
                let value = profile.sample(&mut self.rng, self.config.spike_probability);
                let reading = TelemetryReading::new(profile, value, self.elapsed);
                self.transport
                    .send(&self.config.endpoint, &TelemetryMessage::from_reading(&reading)?)?;
                *self.transmissions.entry(profile.sensor_name.clone()).or_insert(0) += 1;
            }
            self.elapsed += self.config.interval;
        }
        Ok(())
    }
}

impl<T: TelemetryTransport> Reporter for TelemetryReporter<T> {
    fn name(&self) -> &str {
        "telemetry"
    }

    fn emit(&mut self, _report: &ScenarioReport) -> Result<(), ReportError> {
        if self.config.endpoint.host_name.is_empty() || self.config.endpoint.device_id.is_empty() {
            return Err(ReportError::UploadFailure("endpoint is not configured".to_string()));
        }
        let interval = self.config.interval;
        if !(0.0..=1.0).contains(&self.config.spike_probability) || !(interval.is_finite() && interval > 0.) {
            return Err(ReportError::UploadFailure(
                "bad spike probability or reading interval".to_string(),
            ));
        }
        let message = TelemetryMessage::json(&self.config.payload)?;
        self.transport.send(&self.config.endpoint, &message)?;
        self.send_readings()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_string_parses_back() {
        let endpoint =
            EndpointDescriptor::parse("HostName=hub.example.net;DeviceId=dev1;SharedAccessKey=abc=").unwrap();
        assert_eq!(endpoint.host_name, "hub.example.net");
        assert_eq!(endpoint.device_id, "dev1");
        assert_eq!(endpoint.shared_access_key, "abc=");
        assert_eq!(
            endpoint.connection_string(),
            "HostName=hub.example.net;DeviceId=dev1;SharedAccessKey=abc="
        );
    }

    #[test]
    fn incomplete_connection_string_is_rejected() {
        assert!(EndpointDescriptor::parse("HostName=hub.example.net").is_err());
        assert!(EndpointDescriptor::parse("garbage").is_err());
    }

    #[test]
    fn payload_is_serialized() {
        let json = serde_json::to_string(&TelemetryPayload::default()).unwrap();
        assert_eq!(json, r#"{"heart_rate":82,"temperature":36.7}"#);
    }

    #[test]
    fn readings_beyond_thresholds_are_alerts() {
        let profiles = default_reading_profiles();
        let heart_rate = &profiles[1];
        assert!(heart_rate.is_alert(120.));
        assert!(heart_rate.is_alert(40.));
        assert!(!heart_rate.is_alert(119.9));
        assert!(!heart_rate.is_alert(40.1));
        // no upper threshold
        let oximeter = &profiles[3];
        assert!(!oximeter.is_alert(150.));
        assert!(oximeter.is_alert(92.));
    }

    #[test]
    fn samples_follow_spike_probability() {
        let mut rng = Pcg64::seed_from_u64(1);
        for profile in default_reading_profiles() {
            for _ in 0..100 {
                let normal = profile.sample(&mut rng, 0.);
                assert!(normal >= profile.normal_range.0 && normal <= profile.normal_range.1);
                assert!(!profile.is_alert(normal));
                assert!(profile.is_alert(profile.sample(&mut rng, 1.)));
            }
        }
    }

    #[test]
    fn alert_messages_carry_priority() {
        let profile = &default_reading_profiles()[4];
        let alert = TelemetryMessage::from_reading(&TelemetryReading::new(profile, 38.5, 2.)).unwrap();
        assert!(alert.is_alert());
        assert_eq!(alert.properties.get("priority").map(String::as_str), Some("high"));
        let normal = TelemetryMessage::from_reading(&TelemetryReading::new(profile, 36.6, 2.)).unwrap();
        assert!(normal.properties.is_empty());
        assert!(normal.body.contains(r#""is_alert":false"#));
    }

    #[test]
    fn transmission_power_is_monthly_average() {
        assert_eq!(transmission_power(10, 0.05, 0.), 0.);
        // 1000 sends of 0.06 W over one month
        assert!((transmission_power(1000, 0.06, SECONDS_PER_MONTH) - 0.06).abs() < 1e-12);
        assert!((transmission_power(1000, 0.06, SECONDS_PER_MONTH / 2.) - 0.12).abs() < 1e-12);
    }
}
