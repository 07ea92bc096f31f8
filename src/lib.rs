//! # tplink-smart
//!
//! Local control of TP-Link smart plugs and bulbs over the encrypted
//! JSON protocol on TCP port 9999, without cloud dependencies.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tplink_smart::{DeviceConfig, DeviceManager, ManagerConfig};
//!
//! # async fn run() -> tplink_smart::Result<()> {
//! let manager = DeviceManager::new(ManagerConfig::default());
//! let plug = manager.load_device(&DeviceConfig::plug("192.168.1.20")?).await?;
//! manager.on(&plug).await?;
//! # Ok(())
//! # }
//! ```
//!
//! A blocking variant lives in [`sync`].
#[macro_use]
pub mod macros;
pub mod command;
pub mod crypto;
pub mod device;
pub mod emeter;
pub mod error;
pub mod manager;
pub mod protocol;
pub mod sync;
pub mod transport;

pub use command::{Command, Reply, SystemInfo};
pub use device::{Device, DeviceConfig, DeviceConfigBuilder, DeviceKind, Feature, FeatureSet};
pub use emeter::{DailyStats, EMeter, EnergyStat, MonthlyStats, RealtimeEnergy};
pub use error::{Result, TpLinkError, TransportPhase};
pub use manager::{DeviceManager, ManagerConfig, ManagerConfigBuilder};
pub use transport::{TcpTransport, Transport};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version() -> &'static str {
    VERSION
}
