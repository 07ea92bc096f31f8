//! Energy meter (`emeter` subsystem) commands and the per-device accessor.

use crate::command::{Command, SUBSYSTEM_EMETER, Status};
use crate::device::Device;
use crate::error::Result;
use crate::manager::DeviceManager;
use crate::transport::Transport;
use serde::{Deserialize, Serialize};

/// `emeter.get_realtime`
#[derive(Debug, Clone, Default, Serialize)]
pub struct GetRealtime {}

impl Command for GetRealtime {
    const SUBSYSTEM: &'static str = SUBSYSTEM_EMETER;
    const VERB: &'static str = "get_realtime";
    type Response = RealtimeEnergy;
}

/// Instantaneous readings. Current in A, voltage in V, power in W, total in kWh.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RealtimeEnergy {
    pub err_code: i64,
    pub err_msg: Option<String>,
    pub current: f32,
    pub voltage: f32,
    pub power: f32,
    pub total: f32,
}

/// `emeter.get_daystat`
#[derive(Debug, Clone, Serialize)]
pub struct GetDayStat {
    pub month: u32,
    pub year: u32,
}

impl Command for GetDayStat {
    const SUBSYSTEM: &'static str = SUBSYSTEM_EMETER;
    const VERB: &'static str = "get_daystat";
    type Response = DailyStats;
}

/// `emeter.get_monthstat`
#[derive(Debug, Clone, Serialize)]
pub struct GetMonthStat {
    pub year: u32,
}

impl Command for GetMonthStat {
    const SUBSYSTEM: &'static str = SUBSYSTEM_EMETER;
    const VERB: &'static str = "get_monthstat";
    type Response = MonthlyStats;
}

/// `emeter.erase_emeter_stat`
#[derive(Debug, Clone, Default, Serialize)]
pub struct EraseStats {}

impl Command for EraseStats {
    const SUBSYSTEM: &'static str = SUBSYSTEM_EMETER;
    const VERB: &'static str = "erase_emeter_stat";
    type Response = Status;
}

/// Energy used in one day or month, in kWh.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EnergyStat {
    pub year: u32,
    pub month: u32,
    /// Zero in monthly lists.
    pub day: u32,
    pub energy: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DailyStats {
    pub err_code: i64,
    pub err_msg: Option<String>,
    pub day_list: Vec<EnergyStat>,
}

impl DailyStats {
    /// Mean daily energy, `None` when no days were reported.
    pub fn average(&self) -> Option<f32> {
        average(&self.day_list)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MonthlyStats {
    pub err_code: i64,
    pub err_msg: Option<String>,
    pub month_list: Vec<EnergyStat>,
}

impl MonthlyStats {
    pub fn average(&self) -> Option<f32> {
        average(&self.month_list)
    }
}

fn average(stats: &[EnergyStat]) -> Option<f32> {
    if stats.is_empty() {
        return None;
    }
    let total: f32 = stats.iter().map(|s| s.energy).sum();
    Some(total / stats.len() as f32)
}

impl_reply!(RealtimeEnergy, DailyStats, MonthlyStats);

/// Energy meter reads bound to one device.
///
/// Obtained from [`DeviceManager::electricity_meter`], which only hands one
/// out for devices advertising the energy-meter feature.
pub struct EMeter<'a, T: Transport> {
    device: Device,
    manager: &'a DeviceManager<T>,
}

impl<'a, T: Transport> EMeter<'a, T> {
    pub(crate) fn new(device: Device, manager: &'a DeviceManager<T>) -> Self {
        Self { device, manager }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub async fn realtime(&self) -> Result<RealtimeEnergy> {
        self.manager.execute(&self.device, &GetRealtime {}).await
    }

    pub async fn daily_stats(&self, year: u32, month: u32) -> Result<DailyStats> {
        self.manager
            .execute(&self.device, &GetDayStat { month, year })
            .await
    }

    pub async fn monthly_stats(&self, year: u32) -> Result<MonthlyStats> {
        self.manager
            .execute(&self.device, &GetMonthStat { year })
            .await
    }

    /// Clears the stored daily and monthly statistics.
    pub async fn erase_stats(&self) -> Result<()> {
        self.manager.execute(&self.device, &EraseStats {}).await?;
        Ok(())
    }
}
