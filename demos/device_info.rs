/**
 * Device Info Example
 *
 * Loads a device, prints its identity and energy readings, then toggles the relay.
 *
 * Usage: cargo run --example device_info -- 192.168.1.20
 * Set RUST_LOG=debug to see the JSON exchanged with the device.
 */
use tokio::time::{Duration, sleep};
use tplink_smart::{DeviceConfig, DeviceManager, Feature, ManagerConfig};

#[tokio::main]
async fn main() {
    env_logger::init();

    let Some(address) = std::env::args().nth(1) else {
        eprintln!("Usage: device_info <address>");
        return;
    };
    println!("--- tplink-smart - Device Info ---");

    let config = match DeviceConfig::plug(address) {
        Ok(config) => config,
        Err(e) => {
            println!("[ERROR] {}", e);
            return;
        }
    };
    let manager = DeviceManager::new(ManagerConfig::default());

    // 1. Read the device identity
    let device = match manager.load_device(&config).await {
        Ok(device) => device,
        Err(e) => {
            println!("[ERROR] Load failed: {}", e);
            return;
        }
    };
    println!("[INFO] Model:    {} ({})", device.model(), device.kind());
    println!("[INFO] Name:     {}", device.device_name());
    println!("[INFO] Id:       {}", device.device_id());
    println!("[INFO] Hardware: {}", device.hardware_version());
    println!("[INFO] Software: {}", device.software_version());
    println!("[INFO] MAC:      {}", device.mac());

    let info = match manager.system_info(&device).await {
        Ok(info) => info,
        Err(e) => {
            println!("[ERROR] System info failed: {}", e);
            return;
        }
    };
    println!("[INFO] Alias:    {}", info.alias);
    println!("[INFO] Relay:    {}", if info.is_on() { "on" } else { "off" });
    println!("[INFO] Uptime:   {:?}", info.uptime());

    // 2. Energy readings, if the device has a meter
    if device.supports(Feature::EnergyMeter) {
        match manager.electricity_meter(&device) {
            Ok(meter) => match meter.realtime().await {
                Ok(e) => println!(
                    "[INFO] Energy:   {:.3} A, {:.1} V, {:.1} W, {:.3} kWh total",
                    e.current, e.voltage, e.power, e.total
                ),
                Err(e) => println!("[ERROR] Realtime read failed: {}", e),
            },
            Err(e) => println!("[ERROR] {}", e),
        }
    }

    // 3. Toggle the relay and restore it
    let was_on = info.is_on();
    for state in [!was_on, was_on] {
        match manager.set_relay_state(&device, state).await {
            Ok(()) => println!("[SUCCESS] Relay {}", if state { "on" } else { "off" }),
            Err(e) => println!("[ERROR] Relay switch failed: {}", e),
        }
        sleep(Duration::from_secs(2)).await;
    }
}
