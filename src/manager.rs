//! Device manager: marshals typed commands over the transport.
//! Owns the retry policy, error-code checks, capability checks and the device registry.

use crate::command::{
    Command, GetSysInfo, Reboot, Reply, Reset, SetAlias, SetDeviceId, SetHardwareId, SetLedOff,
    SetLocation, SetRelayState, SetStaInfo, SystemInfo, from_envelope, redact_secrets, to_envelope,
};
use crate::device::{Device, DeviceConfig, Feature};
use crate::emeter::EMeter;
use crate::error::{Result, TpLinkError};
use crate::protocol::{pack_frame, unpack_frame};
use crate::transport::{TcpTransport, Transport};
use log::{debug, error, info, log_enabled, trace, Level};
use parking_lot::RwLock;
use std::borrow::Cow;
use std::time::Duration;

/// Default deadline for one exchange (connect + write + read).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default number of sends per command, the first one included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Settings shared by every exchange a manager performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    timeout: Duration,
    max_attempts: u32,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ManagerConfig {
    pub fn builder() -> ManagerConfigBuilder {
        ManagerConfigBuilder::default()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// Builder for [`ManagerConfig`]. Unset values take the defaults.
#[derive(Debug, Clone, Default)]
pub struct ManagerConfigBuilder {
    timeout: Option<Duration>,
    max_attempts: Option<u32>,
}

impl ManagerConfigBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn build(self) -> Result<ManagerConfig> {
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(TpLinkError::InvalidConfig("Timeout must be non-zero".into()));
        }
        let max_attempts = self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);
        if max_attempts == 0 {
            return Err(TpLinkError::InvalidConfig(
                "At least one attempt is required".into(),
            ));
        }
        Ok(ManagerConfig {
            timeout,
            max_attempts,
        })
    }
}

/// Sends commands to TP-Link devices and keeps the devices it has loaded.
pub struct DeviceManager<T = TcpTransport> {
    transport: T,
    config: ManagerConfig,
    devices: RwLock<Vec<Device>>,
}

impl Default for DeviceManager<TcpTransport> {
    fn default() -> Self {
        Self::new(ManagerConfig::default())
    }
}

impl DeviceManager<TcpTransport> {
    /// Create a manager that talks TCP.
    pub fn new(config: ManagerConfig) -> Self {
        Self::with_transport(TcpTransport, config)
    }
}

impl<T: Transport> DeviceManager<T> {
    pub fn with_transport(transport: T, config: ManagerConfig) -> Self {
        Self {
            transport,
            config,
            devices: RwLock::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Snapshot of the devices loaded so far, in load order.
    pub fn devices(&self) -> Vec<Device> {
        self.devices.read().clone()
    }

    // -------------------------------------------------------------------------
    // Exchange
    // -------------------------------------------------------------------------

    /// Send a command and return the decrypted response payload.
    ///
    /// Transient network errors are retried up to `max_attempts` sends in
    /// total. Framing errors and permanent network errors end the call.
    pub async fn marshal<C: Command>(&self, device: &Device, command: &C) -> Result<Vec<u8>> {
        let payload = to_envelope(command)?;
        self.marshal_raw(device, &payload).await
    }

    /// Same as [`marshal`](Self::marshal) for an already-encoded JSON payload.
    pub async fn marshal_raw(&self, device: &Device, payload: &[u8]) -> Result<Vec<u8>> {
        let endpoint = device.endpoint();
        // Frames carrying secrets are never dumped.
        let mut has_secrets = false;
        if log_enabled!(Level::Debug) {
            let shown = match redact_secrets(payload) {
                Some(redacted) => {
                    has_secrets = true;
                    Cow::Owned(redacted)
                }
                None => String::from_utf8_lossy(payload),
            };
            debug!("Marshal message to device {}: {}", endpoint, shown);
        }

        let frame = pack_frame(payload)?;
        if !has_secrets && log_enabled!(Level::Trace) {
            trace!("Frame for {}: {}", endpoint, hex::encode(&frame));
        }

        let max_attempts = self.config.max_attempts;
        let mut attempt = 1;
        let response = loop {
            match self
                .transport
                .send(device.address(), device.port(), &frame, self.config.timeout)
                .await
            {
                Ok(response) => break response,
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    info!(
                        "Retrying device message (attempt {}/{}) for {}: {}",
                        attempt, max_attempts, endpoint, e
                    );
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        "Exchange with {} failed after {} attempt(s): {}",
                        endpoint, attempt, e
                    );
                    return Err(e.at_device(&endpoint));
                }
            }
        };

        let plaintext = unpack_frame(&response).map_err(|e| e.at_device(&endpoint))?;
        debug!(
            "Unmarshal message from device {}: {}",
            endpoint,
            String::from_utf8_lossy(&plaintext)
        );
        Ok(plaintext)
    }

    /// Send a command and decode its reply, failing on a nonzero `err_code`.
    pub async fn execute<C: Command>(&self, device: &Device, command: &C) -> Result<C::Response> {
        let response = self.marshal(device, command).await?;
        let reply = from_envelope::<C>(&response).map_err(|e| e.at_device(&device.endpoint()))?;

        let code = reply.err_code();
        if code != 0 {
            return Err(TpLinkError::OperationFailed {
                endpoint: device.endpoint(),
                command: C::name(),
                code,
                message: reply.err_msg().map(String::from),
            });
        }
        Ok(reply)
    }

    // -------------------------------------------------------------------------
    // Device lifecycle
    // -------------------------------------------------------------------------

    /// Query a device's identity and register it.
    pub async fn load_device(&self, config: &DeviceConfig) -> Result<Device> {
        let minimal = Device::from_config(config);
        let info = self.system_info(&minimal).await?;

        let device = Device::from_system_info(config, &info);
        info!(
            "Loaded {} {} ({}) at {}",
            device.kind(),
            device.model(),
            device.device_id(),
            device.endpoint()
        );
        self.devices.write().push(device.clone());
        Ok(device)
    }

    /// Load devices in order, stopping at the first failure.
    pub async fn load_devices(&self, configs: &[DeviceConfig]) -> Result<Vec<Device>> {
        let mut loaded = Vec::with_capacity(configs.len());
        for config in configs {
            loaded.push(self.load_device(config).await?);
        }
        Ok(loaded)
    }

    pub async fn system_info(&self, device: &Device) -> Result<SystemInfo> {
        self.execute(device, &GetSysInfo {}).await
    }

    pub async fn set_relay_state(&self, device: &Device, on: bool) -> Result<()> {
        self.execute(device, &SetRelayState::new(on)).await?;
        Ok(())
    }

    pub async fn on(&self, device: &Device) -> Result<()> {
        self.set_relay_state(device, true).await
    }

    pub async fn off(&self, device: &Device) -> Result<()> {
        self.set_relay_state(device, false).await
    }

    /// Reboot after `delay` seconds.
    pub async fn reboot(&self, device: &Device, delay: u32) -> Result<()> {
        self.execute(device, &Reboot { delay }).await?;
        Ok(())
    }

    /// Factory reset after `delay` seconds.
    pub async fn reset(&self, device: &Device, delay: u32) -> Result<()> {
        self.execute(device, &Reset { delay }).await?;
        Ok(())
    }

    pub async fn set_alias(&self, device: &Device, alias: &str) -> Result<()> {
        let command = SetAlias {
            alias: alias.to_string(),
        };
        self.execute(device, &command).await?;
        Ok(())
    }

    pub async fn set_device_id(&self, device: &Device, device_id: &str) -> Result<()> {
        let command = SetDeviceId {
            device_id: device_id.to_string(),
        };
        self.execute(device, &command).await?;
        Ok(())
    }

    pub async fn set_hardware_id(&self, device: &Device, hardware_id: &str) -> Result<()> {
        let command = SetHardwareId {
            hardware_id: hardware_id.to_string(),
        };
        self.execute(device, &command).await?;
        Ok(())
    }

    /// Turn the status LED on or off.
    pub async fn set_led(&self, device: &Device, on: bool) -> Result<()> {
        self.execute(device, &SetLedOff::new(on)).await?;
        Ok(())
    }

    pub async fn set_location(&self, device: &Device, latitude: f64, longitude: f64) -> Result<()> {
        let command = SetLocation {
            latitude,
            longitude,
        };
        self.execute(device, &command).await?;
        Ok(())
    }

    /// Join a WPA2 network. The device drops off the current network on success.
    pub async fn set_network(&self, device: &Device, ssid: &str, password: &str) -> Result<()> {
        self.execute(device, &SetStaInfo::wpa2(ssid, password))
            .await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Capabilities
    // -------------------------------------------------------------------------

    pub fn supports(&self, device: &Device, feature: Feature) -> bool {
        device.supports(feature)
    }

    /// Energy meter reads for a device that advertises the feature.
    pub fn electricity_meter(&self, device: &Device) -> Result<EMeter<'_, T>> {
        if !self.supports(device, Feature::EnergyMeter) {
            return Err(TpLinkError::UnsupportedFeature {
                endpoint: device.endpoint(),
                feature: Feature::EnergyMeter,
            });
        }
        Ok(EMeter::new(device.clone(), self))
    }
}
