use std::time::Duration;

/// Report ID used by the gamepad input report in the report map and the
/// Report Reference descriptor.
pub const HID_REPORT_ID: u8 = 1;

/// GAP appearance "HID Gamepad" (category 0x00F, sub-category 0x04).
pub const APPEARANCE_GAMEPAD: u16 = 0x03C4;

/// Polling period of the demo firmware loop.
pub const SLOT_PERIOD: Duration = Duration::from_millis(25);

/// Slots between two battery level updates of the demo firmware.
pub const BATTERY_PERIOD_SLOTS: u32 = 100;

/// Battery level goes out in slot 3 of every period.
pub fn is_battery_slot(slot: u32) -> bool {
    slot % BATTERY_PERIOD_SLOTS == 3
}

/// How long backends wait for the stack to confirm a setup operation.
pub const STACK_CONFIRM_TIMEOUT: Duration = Duration::from_secs(5);

/// Source of the vendor id inside the PnP ID characteristic.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorIdSource {
    BluetoothSig = 0x01,
    UsbIf = 0x02,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub manufacturer: String,
    pub vendor_id_source: VendorIdSource,
    pub vendor_id: u16,
    pub product_id: u16,
    pub version: u16,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            name: "ESP32 BLE Controller".to_string(),
            manufacturer: "Espressif".to_string(),
            vendor_id_source: VendorIdSource::UsbIf,
            vendor_id: 0x303A,
            product_id: 0x8001,
            version: 0x0100,
        }
    }
}

/// Connection parameters a peripheral asks the central for once connected.
/// Intervals in 1.25 ms units, supervision timeout in 10 ms units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnParams {
    pub min_interval: u16,
    pub max_interval: u16,
    pub latency: u16,
    pub timeout: u16,
}

impl Default for ConnParams {
    fn default() -> Self {
        Self {
            min_interval: 6,
            max_interval: 12,
            latency: 0,
            timeout: 400,
        }
    }
}

/// Tuning only honored by the raw advertisement path.
/// Advertising intervals in 0.625 ms units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertisingConfig {
    pub min_interval: u16,
    pub max_interval: u16,
    pub connection: Option<ConnParams>,
}

impl Default for AdvertisingConfig {
    fn default() -> Self {
        Self {
            min_interval: 0x20,
            max_interval: 0x40,
            connection: Some(ConnParams::default()),
        }
    }
}

/// Link security required to access the HID attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityLevel {
    Open,
    #[default]
    Encrypted,
}

#[derive(Debug, Clone, Default)]
pub struct GamepadConfig {
    pub device: DeviceInfo,
    pub advertising: AdvertisingConfig,
    pub security: SecurityLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn battery_goes_out_once_per_period() {
        let slots: Vec<u32> = (0..350).filter(|slot| is_battery_slot(*slot)).collect();
        assert_eq!(slots, vec![3, 103, 203, 303]);
    }
}
