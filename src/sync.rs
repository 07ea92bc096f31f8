//! Blocking wrappers around the async [`DeviceManager`](crate::manager::DeviceManager).
//!
//! Each wrapper owns a current-thread tokio runtime and blocks on it, so these
//! types must not be used from inside another runtime.

use crate::command::SystemInfo;
use crate::device::{Device, DeviceConfig, Feature};
use crate::emeter::{DailyStats, MonthlyStats, RealtimeEnergy};
use crate::error::{Result, TpLinkError};
use crate::manager::{self, ManagerConfig};
use crate::transport::{TcpTransport, Transport};
use std::future::Future;
use tokio::runtime::{Builder, Runtime};

/// Blocking device manager.
pub struct DeviceManager<T = TcpTransport> {
    runtime: Runtime,
    inner: manager::DeviceManager<T>,
}

impl DeviceManager<TcpTransport> {
    pub fn new(config: ManagerConfig) -> Result<Self> {
        Self::with_transport(TcpTransport, config)
    }
}

impl<T: Transport> DeviceManager<T> {
    pub fn with_transport(transport: T, config: ManagerConfig) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| TpLinkError::Io(format!("Failed to start runtime: {}", e)))?;
        Ok(Self {
            runtime,
            inner: manager::DeviceManager::with_transport(transport, config),
        })
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub fn config(&self) -> &ManagerConfig {
        self.inner.config()
    }

    pub fn devices(&self) -> Vec<Device> {
        self.inner.devices()
    }

    pub fn marshal_raw(&self, device: &Device, payload: &[u8]) -> Result<Vec<u8>> {
        self.block_on(self.inner.marshal_raw(device, payload))
    }

    pub fn load_device(&self, config: &DeviceConfig) -> Result<Device> {
        self.block_on(self.inner.load_device(config))
    }

    pub fn load_devices(&self, configs: &[DeviceConfig]) -> Result<Vec<Device>> {
        self.block_on(self.inner.load_devices(configs))
    }

    pub fn system_info(&self, device: &Device) -> Result<SystemInfo> {
        self.block_on(self.inner.system_info(device))
    }

    pub fn set_relay_state(&self, device: &Device, on: bool) -> Result<()> {
        self.block_on(self.inner.set_relay_state(device, on))
    }

    pub fn on(&self, device: &Device) -> Result<()> {
        self.block_on(self.inner.on(device))
    }

    pub fn off(&self, device: &Device) -> Result<()> {
        self.block_on(self.inner.off(device))
    }

    pub fn reboot(&self, device: &Device, delay: u32) -> Result<()> {
        self.block_on(self.inner.reboot(device, delay))
    }

    pub fn reset(&self, device: &Device, delay: u32) -> Result<()> {
        self.block_on(self.inner.reset(device, delay))
    }

    pub fn set_alias(&self, device: &Device, alias: &str) -> Result<()> {
        self.block_on(self.inner.set_alias(device, alias))
    }

    pub fn set_device_id(&self, device: &Device, device_id: &str) -> Result<()> {
        self.block_on(self.inner.set_device_id(device, device_id))
    }

    pub fn set_hardware_id(&self, device: &Device, hardware_id: &str) -> Result<()> {
        self.block_on(self.inner.set_hardware_id(device, hardware_id))
    }

    pub fn set_led(&self, device: &Device, on: bool) -> Result<()> {
        self.block_on(self.inner.set_led(device, on))
    }

    pub fn set_location(&self, device: &Device, latitude: f64, longitude: f64) -> Result<()> {
        self.block_on(self.inner.set_location(device, latitude, longitude))
    }

    pub fn set_network(&self, device: &Device, ssid: &str, password: &str) -> Result<()> {
        self.block_on(self.inner.set_network(device, ssid, password))
    }

    pub fn supports(&self, device: &Device, feature: Feature) -> bool {
        self.inner.supports(device, feature)
    }

    pub fn electricity_meter(&self, device: &Device) -> Result<EMeter<'_, T>> {
        let meter = self.inner.electricity_meter(device)?;
        Ok(EMeter {
            runtime: &self.runtime,
            meter,
        })
    }
}

/// Blocking energy meter reads.
pub struct EMeter<'a, T: Transport> {
    runtime: &'a Runtime,
    meter: crate::emeter::EMeter<'a, T>,
}

impl<T: Transport> EMeter<'_, T> {
    pub fn device(&self) -> &Device {
        self.meter.device()
    }

    pub fn realtime(&self) -> Result<RealtimeEnergy> {
        self.runtime.block_on(self.meter.realtime())
    }

    pub fn daily_stats(&self, year: u32, month: u32) -> Result<DailyStats> {
        self.runtime.block_on(self.meter.daily_stats(year, month))
    }

    pub fn monthly_stats(&self, year: u32) -> Result<MonthlyStats> {
        self.runtime.block_on(self.meter.monthly_stats(year))
    }

    pub fn erase_stats(&self) -> Result<()> {
        self.runtime.block_on(self.meter.erase_stats())
    }
}
