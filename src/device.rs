//! Device configuration and identity.
//! A `Device` is an immutable snapshot built from a successful system-info query.

use crate::command::SystemInfo;
use crate::error::{Result, TpLinkError};
use crate::protocol::DEFAULT_PORT;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

define_features! {
    /// Realtime and historical energy readings (`emeter` subsystem)
    EnergyMeter => "ENE",
    /// On-device schedules and countdown timers
    Timer => "TIM",
}

/// The kind of device a config declares or a device reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    Unknown,
    Bulb,
    Plug,
}

impl DeviceKind {
    /// Infers a kind from the `type`/`mic_type` string of a system-info reply.
    pub fn from_type_name(name: &str) -> Self {
        let name = name.to_ascii_uppercase();
        if name.contains("PLUG") {
            DeviceKind::Plug
        } else if name.contains("BULB") {
            DeviceKind::Bulb
        } else {
            DeviceKind::Unknown
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceKind::Unknown => "Unknown",
            DeviceKind::Bulb => "Bulb",
            DeviceKind::Plug => "Plug",
        };
        f.write_str(s)
    }
}

impl FromStr for DeviceKind {
    type Err = TpLinkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "unknown" => Ok(DeviceKind::Unknown),
            "bulb" => Ok(DeviceKind::Bulb),
            "plug" => Ok(DeviceKind::Plug),
            other => Err(TpLinkError::InvalidConfig(format!(
                "Unknown device kind '{}'",
                other
            ))),
        }
    }
}

/// The set of feature tokens a device advertises, e.g. `"TIM:ENE"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSet {
    tokens: BTreeSet<String>,
}

impl FeatureSet {
    /// Parse a colon-delimited feature string. Empty tokens are dropped.
    pub fn parse(features: &str) -> Self {
        let tokens = features
            .split(':')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();
        Self { tokens }
    }

    pub fn contains(&self, feature: Feature) -> bool {
        self.tokens.contains(feature.token())
    }

    pub fn contains_token(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    /// Capabilities whose token is present. Unknown tokens are skipped.
    pub fn features(&self) -> Vec<Feature> {
        self.tokens
            .iter()
            .filter_map(|t| Feature::from_token(t))
            .collect()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Construction-time parameters for a device.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceConfig {
    address: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    kind: DeviceKind,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl DeviceConfig {
    pub fn builder<A: Into<String>>(address: A) -> DeviceConfigBuilder {
        DeviceConfigBuilder::new(address)
    }

    /// A plug on the default port.
    pub fn plug<A: Into<String>>(address: A) -> Result<Self> {
        Self::builder(address).kind(DeviceKind::Plug).build()
    }

    /// A bulb on the default port.
    pub fn bulb<A: Into<String>>(address: A) -> Result<Self> {
        Self::builder(address).kind(DeviceKind::Bulb).build()
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Re-applies builder validation, for configs that came through serde.
    pub fn validated(self) -> Result<Self> {
        DeviceConfigBuilder {
            address: self.address,
            port: Some(self.port),
            kind: self.kind,
        }
        .build()
    }
}

/// Builder for [`DeviceConfig`].
///
/// ```
/// use tplink_smart::{DeviceConfig, DeviceKind};
///
/// let config = DeviceConfig::builder("192.168.1.20")
///     .kind(DeviceKind::Plug)
///     .build()
///     .unwrap();
/// assert_eq!(config.port(), 9999);
/// ```
#[derive(Debug, Clone)]
pub struct DeviceConfigBuilder {
    address: String,
    port: Option<u16>,
    kind: DeviceKind,
}

impl DeviceConfigBuilder {
    pub fn new<A: Into<String>>(address: A) -> Self {
        Self {
            address: address.into(),
            port: None,
            kind: DeviceKind::Unknown,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn kind(mut self, kind: DeviceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn build(self) -> Result<DeviceConfig> {
        let address = self.address.trim().to_string();
        if address.is_empty() {
            return Err(TpLinkError::InvalidConfig("Device address is empty".into()));
        }
        if address.chars().any(char::is_whitespace) {
            return Err(TpLinkError::InvalidConfig(format!(
                "Device address '{}' contains whitespace",
                address
            )));
        }

        let port = match self.port {
            None | Some(0) => DEFAULT_PORT,
            Some(p) => p,
        };

        Ok(DeviceConfig {
            address,
            port,
            kind: self.kind,
        })
    }
}

/// Represents a TP-Link device whose identity has been read from the device.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    address: String,
    port: u16,
    kind: DeviceKind,
    device_id: String,
    device_name: String,
    firmware_id: String,
    hardware_id: String,
    hardware_version: String,
    model: String,
    manufacturer_id: String,
    software_version: String,
    mac: String,
    features: FeatureSet,
}

impl Device {
    /// A device that only knows where to reach it.
    pub fn from_config(config: &DeviceConfig) -> Self {
        Self {
            address: config.address.clone(),
            port: config.port,
            kind: config.kind,
            device_id: String::new(),
            device_name: String::new(),
            firmware_id: String::new(),
            hardware_id: String::new(),
            hardware_version: String::new(),
            model: String::new(),
            manufacturer_id: String::new(),
            software_version: String::new(),
            mac: String::new(),
            features: FeatureSet::default(),
        }
    }

    /// A device populated from its system-info reply.
    ///
    /// The configured kind wins; an `Unknown` kind is inferred from the reply.
    pub fn from_system_info(config: &DeviceConfig, info: &SystemInfo) -> Self {
        let kind = match config.kind {
            DeviceKind::Unknown => {
                let reported = if info.device_type.is_empty() {
                    &info.mic_type
                } else {
                    &info.device_type
                };
                DeviceKind::from_type_name(reported)
            }
            kind => kind,
        };

        Self {
            address: config.address.clone(),
            port: config.port,
            kind,
            device_id: info.device_id.clone(),
            device_name: info.device_name.clone(),
            firmware_id: info.firmware_id.clone(),
            hardware_id: info.hardware_id.clone(),
            hardware_version: info.hardware_version.clone(),
            model: info.model.clone(),
            manufacturer_id: info.manufacturer_id.clone(),
            software_version: info.software_version.clone(),
            mac: info.mac.clone(),
            features: info.features(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `address:port`, as used in connections and log lines.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn firmware_id(&self) -> &str {
        &self.firmware_id
    }

    pub fn hardware_id(&self) -> &str {
        &self.hardware_id
    }

    pub fn hardware_version(&self) -> &str {
        &self.hardware_version
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn manufacturer_id(&self) -> &str {
        &self.manufacturer_id
    }

    pub fn software_version(&self) -> &str {
        &self.software_version
    }

    pub fn mac(&self) -> &str {
        &self.mac
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    pub fn supports(&self, feature: Feature) -> bool {
        self.features.contains(feature)
    }
}
