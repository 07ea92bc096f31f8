//! Typed command envelopes.
//!
//! Every request is sent as `{"<subsystem>": {"<verb>": {params}}}` and the
//! device answers with the same nesting, the leaf carrying an `err_code`
//! (zero on success) and sometimes an `err_msg`.
//!
//! Request and response are separate types: a [`Command`] serializes into the
//! parameter object and names its [`Reply`] type.

use crate::device::FeatureSet;
use crate::error::{Result, TpLinkError};
use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

pub const SUBSYSTEM_SYSTEM: &str = "system";
pub const SUBSYSTEM_EMETER: &str = "emeter";
pub const SUBSYSTEM_NETIF: &str = "netif";

const KEY_ERR_CODE: &str = "err_code";

/// WPA2 key type for `netif.set_stainfo`.
pub const KEY_TYPE_WPA2: u8 = 3;

/// A request that can be sent to a device.
pub trait Command: Serialize {
    const SUBSYSTEM: &'static str;
    const VERB: &'static str;

    /// The leaf object the device answers with.
    type Response: Reply;

    /// `subsystem.verb`, used in logs and errors.
    fn name() -> String {
        format!("{}.{}", Self::SUBSYSTEM, Self::VERB)
    }
}

/// A response leaf carrying the device's error code.
pub trait Reply: DeserializeOwned {
    fn err_code(&self) -> i64;
    fn err_msg(&self) -> Option<&str>;
}

/// Serialize a command into its JSON envelope.
pub fn to_envelope<C: Command>(command: &C) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&Envelope(command))?)
}

/// `{"<subsystem>": {"<verb>": command}}`, keeping the command's field order.
struct Envelope<'a, C>(&'a C);

struct Verb<'a, C>(&'a C);

impl<C: Command> Serialize for Envelope<'_, C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(C::SUBSYSTEM, &Verb(self.0))?;
        map.end()
    }
}

impl<C: Command> Serialize for Verb<'_, C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(C::VERB, self.0)?;
        map.end()
    }
}

/// Deserialize the response leaf of a command from a JSON envelope.
///
/// A device that does not implement a subsystem answers with the error code
/// on the subsystem object itself; that object is then decoded as the leaf.
pub fn from_envelope<C: Command>(payload: &[u8]) -> Result<C::Response> {
    let mut root: Value = serde_json::from_slice(payload)?;
    let subsystem = root.get_mut(C::SUBSYSTEM).ok_or_else(|| {
        TpLinkError::InvalidPayload(format!("Missing '{}' in response", C::SUBSYSTEM))
    })?;

    let leaf = if let Some(leaf) = subsystem.get_mut(C::VERB) {
        leaf.take()
    } else if has_error_code(subsystem) {
        subsystem.take()
    } else {
        return Err(TpLinkError::InvalidPayload(format!(
            "Missing '{}' in response",
            C::name()
        )));
    };

    Ok(serde_json::from_value(leaf)?)
}

fn has_error_code(value: &Value) -> bool {
    value
        .get(KEY_ERR_CODE)
        .and_then(Value::as_i64)
        .is_some_and(|code| code != 0)
}

/// Response leaf for commands that only report success or failure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Status {
    pub err_code: i64,
    pub err_msg: Option<String>,
}

impl_reply!(Status, SystemInfo);

// -------------------------------------------------------------------------
// system
// -------------------------------------------------------------------------

/// `system.get_sysinfo`
#[derive(Debug, Clone, Default, Serialize)]
pub struct GetSysInfo {}

impl Command for GetSysInfo {
    const SUBSYSTEM: &'static str = SUBSYSTEM_SYSTEM;
    const VERB: &'static str = "get_sysinfo";
    type Response = SystemInfo;
}

/// Identity and state reported by `system.get_sysinfo`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SystemInfo {
    pub err_code: i64,
    pub err_msg: Option<String>,
    #[serde(rename = "sw_ver")]
    pub software_version: String,
    #[serde(rename = "hw_ver")]
    pub hardware_version: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub mic_type: String,
    pub model: String,
    pub mac: String,
    #[serde(rename = "deviceId")]
    pub device_id: String,
    #[serde(rename = "hwId")]
    pub hardware_id: String,
    #[serde(rename = "fwId")]
    pub firmware_id: String,
    #[serde(rename = "oemId")]
    pub manufacturer_id: String,
    pub alias: String,
    #[serde(rename = "dev_name")]
    pub device_name: String,
    pub icon_hash: String,
    pub relay_state: i64,
    /// Seconds since the relay was last switched on.
    pub on_time: u64,
    pub active_mode: String,
    /// Colon-delimited feature tokens, e.g. `TIM:ENE`.
    pub feature: String,
    pub updating: i64,
    pub rssi: i64,
    pub led_off: i64,
    pub latitude: f64,
    pub longitude: f64,
}

impl SystemInfo {
    pub fn is_on(&self) -> bool {
        self.relay_state != 0
    }

    pub fn is_led_on(&self) -> bool {
        self.led_off == 0
    }

    pub fn uptime(&self) -> Duration {
        Duration::from_secs(self.on_time)
    }

    pub fn features(&self) -> FeatureSet {
        FeatureSet::parse(&self.feature)
    }
}

/// `system.set_relay_state`
#[derive(Debug, Clone, Serialize)]
pub struct SetRelayState {
    pub state: u8,
}

impl SetRelayState {
    pub fn new(on: bool) -> Self {
        Self { state: u8::from(on) }
    }
}

impl Command for SetRelayState {
    const SUBSYSTEM: &'static str = SUBSYSTEM_SYSTEM;
    const VERB: &'static str = "set_relay_state";
    type Response = Status;
}

/// `system.reboot`
#[derive(Debug, Clone, Serialize)]
pub struct Reboot {
    /// Seconds to wait before rebooting.
    pub delay: u32,
}

impl Command for Reboot {
    const SUBSYSTEM: &'static str = SUBSYSTEM_SYSTEM;
    const VERB: &'static str = "reboot";
    type Response = Status;
}

/// `system.reset`, a factory reset.
#[derive(Debug, Clone, Serialize)]
pub struct Reset {
    pub delay: u32,
}

impl Command for Reset {
    const SUBSYSTEM: &'static str = SUBSYSTEM_SYSTEM;
    const VERB: &'static str = "reset";
    type Response = Status;
}

/// `system.set_dev_alias`
#[derive(Debug, Clone, Serialize)]
pub struct SetAlias {
    pub alias: String,
}

impl Command for SetAlias {
    const SUBSYSTEM: &'static str = SUBSYSTEM_SYSTEM;
    const VERB: &'static str = "set_dev_alias";
    type Response = Status;
}

/// `system.set_device_id`
#[derive(Debug, Clone, Serialize)]
pub struct SetDeviceId {
    #[serde(rename = "deviceId")]
    pub device_id: String,
}

impl Command for SetDeviceId {
    const SUBSYSTEM: &'static str = SUBSYSTEM_SYSTEM;
    const VERB: &'static str = "set_device_id";
    type Response = Status;
}

/// `system.set_hw_id`
#[derive(Debug, Clone, Serialize)]
pub struct SetHardwareId {
    #[serde(rename = "hwId")]
    pub hardware_id: String,
}

impl Command for SetHardwareId {
    const SUBSYSTEM: &'static str = SUBSYSTEM_SYSTEM;
    const VERB: &'static str = "set_hw_id";
    type Response = Status;
}

/// `system.set_led_off`; `off` is 1 to turn the LED off.
#[derive(Debug, Clone, Serialize)]
pub struct SetLedOff {
    pub off: u8,
}

impl SetLedOff {
    pub fn new(led_on: bool) -> Self {
        Self {
            off: u8::from(!led_on),
        }
    }
}

impl Command for SetLedOff {
    const SUBSYSTEM: &'static str = SUBSYSTEM_SYSTEM;
    const VERB: &'static str = "set_led_off";
    type Response = Status;
}

/// `system.set_dev_location`
#[derive(Debug, Clone, Serialize)]
pub struct SetLocation {
    pub latitude: f64,
    pub longitude: f64,
}

impl Command for SetLocation {
    const SUBSYSTEM: &'static str = SUBSYSTEM_SYSTEM;
    const VERB: &'static str = "set_dev_location";
    type Response = Status;
}

// -------------------------------------------------------------------------
// netif
// -------------------------------------------------------------------------

/// `netif.set_stainfo`: join a wireless network.
#[derive(Clone, Serialize)]
pub struct SetStaInfo {
    pub ssid: String,
    pub password: String,
    pub key_type: u8,
}

impl SetStaInfo {
    pub fn wpa2<S: Into<String>, P: Into<String>>(ssid: S, password: P) -> Self {
        Self {
            ssid: ssid.into(),
            password: password.into(),
            key_type: KEY_TYPE_WPA2,
        }
    }
}

impl fmt::Debug for SetStaInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetStaInfo")
            .field("ssid", &self.ssid)
            .field("password", &MASK)
            .field("key_type", &self.key_type)
            .finish()
    }
}

impl Command for SetStaInfo {
    const SUBSYSTEM: &'static str = SUBSYSTEM_NETIF;
    const VERB: &'static str = "set_stainfo";
    type Response = Status;
}

// -------------------------------------------------------------------------
// Log redaction
// -------------------------------------------------------------------------

/// Keys whose values never reach the log.
const SECRET_KEYS: &[&str] = &["password"];

const MASK: &str = "***";

/// Render a JSON payload for logging with secret values masked.
///
/// Returns `None` when the payload holds no secrets and can be logged as is.
pub(crate) fn redact_secrets(payload: &[u8]) -> Option<String> {
    let mut value: Value = serde_json::from_slice(payload).ok()?;
    if mask_secrets(&mut value) {
        Some(value.to_string())
    } else {
        None
    }
}

fn mask_secrets(value: &mut Value) -> bool {
    match value {
        Value::Object(map) => {
            let mut masked = false;
            for (key, field) in map.iter_mut() {
                if SECRET_KEYS.contains(&key.as_str()) {
                    *field = Value::String(MASK.to_string());
                    masked = true;
                } else {
                    masked |= mask_secrets(field);
                }
            }
            masked
        }
        Value::Array(items) => items
            .iter_mut()
            .fold(false, |masked, item| mask_secrets(item) || masked),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded<C: Command>(command: &C) -> String {
        String::from_utf8(to_envelope(command).unwrap()).unwrap()
    }

    #[test]
    fn requests_use_sparse_envelopes() {
        assert_eq!(encoded(&GetSysInfo {}), r#"{"system":{"get_sysinfo":{}}}"#);
        assert_eq!(
            encoded(&SetRelayState::new(false)),
            r#"{"system":{"set_relay_state":{"state":0}}}"#
        );
        assert_eq!(
            encoded(&Reboot { delay: 55 }),
            r#"{"system":{"reboot":{"delay":55}}}"#
        );
        assert_eq!(
            encoded(&Reset { delay: 55 }),
            r#"{"system":{"reset":{"delay":55}}}"#
        );
        assert_eq!(
            encoded(&SetAlias {
                alias: "abc123".into()
            }),
            r#"{"system":{"set_dev_alias":{"alias":"abc123"}}}"#
        );
        assert_eq!(
            encoded(&SetDeviceId {
                device_id: "ABCDEF".into()
            }),
            r#"{"system":{"set_device_id":{"deviceId":"ABCDEF"}}}"#
        );
        assert_eq!(
            encoded(&SetHardwareId {
                hardware_id: "1234".into()
            }),
            r#"{"system":{"set_hw_id":{"hwId":"1234"}}}"#
        );
        assert_eq!(
            encoded(&SetLedOff::new(true)),
            r#"{"system":{"set_led_off":{"off":0}}}"#
        );
        assert_eq!(
            encoded(&SetStaInfo::wpa2("123abc", "456def")),
            r#"{"netif":{"set_stainfo":{"ssid":"123abc","password":"456def","key_type":3}}}"#
        );
    }

    #[test]
    fn location_keeps_coordinates() {
        let value: Value = serde_json::from_slice(
            &to_envelope(&SetLocation {
                latitude: 12.5,
                longitude: -71.25,
            })
            .unwrap(),
        )
        .unwrap();
        assert_eq!(value["system"]["set_dev_location"]["latitude"], 12.5);
        assert_eq!(value["system"]["set_dev_location"]["longitude"], -71.25);
    }

    #[test]
    fn system_info_reply_is_decoded() {
        let payload = br#"{"system": {"get_sysinfo": {"err_code": 0, "sw_ver": "1.1.1 Build 160725 Rel.164033", "hw_ver": "1.0", "type": "IOT.SMARTPLUGSWITCH", "model": "HS110(US)", "mac": "50:C7:BF:84:2F:03", "deviceId": "80069BA4A24AA2A34AF01633A5F4A02A1886345F", "hwId": "60FF6B258734EA6880E186F8C96DDC61", "fwId": "060BFEA28A8CD1E67146EB5B2B599CC8", "oemId": "FFF22CFF774A0B89F7624BFC6F50D5DE", "alias": "Core HS110", "dev_name": "Wi-Fi Smart Plug With Energy Monitoring", "icon_hash": "", "relay_state": 1, "on_time": 10726298, "active_mode": "none", "feature": "TIM:ENE", "updating": 0, "rssi": -61, "led_off": 0, "latitude": 0, "longitude": 0}}}"#;

        let info = from_envelope::<GetSysInfo>(payload).unwrap();
        assert_eq!(info.err_code, 0);
        assert_eq!(info.hardware_version, "1.0");
        assert_eq!(info.model, "HS110(US)");
        assert_eq!(info.manufacturer_id, "FFF22CFF774A0B89F7624BFC6F50D5DE");
        assert_eq!(info.rssi, -61);
        assert!(info.is_on());
        assert!(info.is_led_on());
        assert_eq!(info.uptime(), Duration::from_secs(10726298));
        assert!(info.features().contains(crate::device::Feature::EnergyMeter));
    }

    #[test]
    fn missing_error_code_defaults_to_zero() {
        let status =
            from_envelope::<SetRelayState>(br#"{"system":{"set_relay_state":{}}}"#).unwrap();
        assert_eq!(status.err_code(), 0);
        assert_eq!(status.err_msg(), None);
    }

    #[test]
    fn subsystem_level_errors_surface_as_the_leaf() {
        let status = from_envelope::<SetStaInfo>(
            br#"{"netif":{"err_code":-1,"err_msg":"module not support"}}"#,
        )
        .unwrap();
        assert_eq!(status.err_code(), -1);
        assert_eq!(status.err_msg(), Some("module not support"));
    }

    #[test]
    fn unexpected_envelopes_are_rejected() {
        assert!(matches!(
            from_envelope::<Reboot>(br#"{"emeter":{"reboot":{}}}"#),
            Err(TpLinkError::InvalidPayload(_))
        ));
        assert!(matches!(
            from_envelope::<Reboot>(br#"{"system":{"reset":{"err_code":0}}}"#),
            Err(TpLinkError::InvalidPayload(_))
        ));
        assert!(matches!(
            from_envelope::<Reboot>(b"not json"),
            Err(TpLinkError::Json(_))
        ));
    }

    #[test]
    fn network_password_is_masked_for_logs() {
        let payload = to_envelope(&SetStaInfo::wpa2("home", "hunter22")).unwrap();
        let shown = redact_secrets(&payload).unwrap();
        assert_eq!(
            shown,
            r#"{"netif":{"set_stainfo":{"key_type":3,"password":"***","ssid":"home"}}}"#
        );
        assert!(!format!("{:?}", SetStaInfo::wpa2("home", "hunter22")).contains("hunter22"));

        let payload = to_envelope(&SetAlias {
            alias: "password".into(),
        })
        .unwrap();
        assert_eq!(redact_secrets(&payload), None);
        assert_eq!(redact_secrets(b"not json"), None);
    }
}
