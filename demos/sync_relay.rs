/**
 * Relay Example (Sync)
 *
 * Switches one or more plugs on or off with the blocking manager.
 *
 * Usage: cargo run --example sync_relay -- on 192.168.1.20 192.168.1.21
 */
use tplink_smart::sync::DeviceManager;
use tplink_smart::{DeviceConfig, ManagerConfig};

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let on = match args.next().as_deref() {
        Some("on") => true,
        Some("off") => false,
        _ => {
            eprintln!("Usage: sync_relay <on|off> <address>...");
            return;
        }
    };

    let configs: Vec<DeviceConfig> = match args.map(DeviceConfig::plug).collect() {
        Ok(configs) => configs,
        Err(e) => {
            println!("[ERROR] {}", e);
            return;
        }
    };

    let manager = match DeviceManager::new(ManagerConfig::default()) {
        Ok(manager) => manager,
        Err(e) => {
            println!("[ERROR] {}", e);
            return;
        }
    };

    // Loading stops at the first device that fails
    if let Err(e) = manager.load_devices(&configs) {
        println!("[ERROR] Load failed: {}", e);
    }

    for device in manager.devices() {
        match manager.set_relay_state(&device, on) {
            Ok(()) => println!("[SUCCESS] {} ({}) switched", device.model(), device.endpoint()),
            Err(e) => println!("[ERROR] {}: {}", device.endpoint(), e),
        }
    }
}
