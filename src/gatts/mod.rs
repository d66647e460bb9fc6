pub mod attribute;
pub mod characteristic;
pub mod connection;
pub mod descriptor;
#[cfg(feature = "esp")]
pub mod esp;
#[cfg(feature = "esp")]
pub mod event;
pub mod prepare;
pub mod service;

use std::{fmt, sync::Arc};

use characteristic::CharacteristicConfig;
use descriptor::DescriptorConfig;

pub type Handle = u16;

/// Bluetooth SIG assigned 16-bit UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Uuid16(pub u16);

pub mod uuid {
    use super::Uuid16;

    pub const DEVICE_INFORMATION_SERVICE: Uuid16 = Uuid16(0x180A);
    pub const BATTERY_SERVICE: Uuid16 = Uuid16(0x180F);
    pub const HID_SERVICE: Uuid16 = Uuid16(0x1812);

    pub const BATTERY_LEVEL: Uuid16 = Uuid16(0x2A19);
    pub const MANUFACTURER_NAME: Uuid16 = Uuid16(0x2A29);
    pub const HID_INFORMATION: Uuid16 = Uuid16(0x2A4A);
    pub const REPORT_MAP: Uuid16 = Uuid16(0x2A4B);
    pub const HID_CONTROL_POINT: Uuid16 = Uuid16(0x2A4C);
    pub const REPORT: Uuid16 = Uuid16(0x2A4D);
    pub const PROTOCOL_MODE: Uuid16 = Uuid16(0x2A4E);
    pub const PNP_ID: Uuid16 = Uuid16(0x2A50);

    pub const CLIENT_CHARACTERISTIC_CONFIGURATION: Uuid16 = Uuid16(0x2902);
    pub const REPORT_REFERENCE: Uuid16 = Uuid16(0x2908);
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerAddr(pub [u8; 6]);

impl fmt::Debug for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            a, b, c, d, e, g
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected { conn_id: u16, peer: PeerAddr },
    Disconnected { conn_id: u16, peer: PeerAddr, reason: u16 },
}

/// Receives call-ins from the BLE stack. Implementations must return quickly:
/// they run on whatever context the stack delivers events from.
pub trait GattsEventHandler: Send + Sync {
    fn on_connection_event(&self, event: ConnectionEvent);

    fn on_write(&self, _handle: Handle, _value: &[u8]) {}
}

/// GATT server operations the gamepad needs from the underlying BLE stack.
///
/// Attributes registered after a characteristic belong to it until the next
/// characteristic is added, so descriptors must follow their characteristic.
pub trait GattServer: Send + Sync {
    fn create_service(&self, uuid: Uuid16, num_handles: u16) -> anyhow::Result<Handle>;

    fn add_characteristic(
        &self,
        service: Handle,
        config: &CharacteristicConfig,
        value: &[u8],
    ) -> anyhow::Result<Handle>;

    fn add_descriptor(
        &self,
        service: Handle,
        config: &DescriptorConfig,
        value: &[u8],
    ) -> anyhow::Result<Handle>;

    fn start_service(&self, service: Handle) -> anyhow::Result<()>;

    /// Replaces the locally stored value served to reads.
    fn set_value(&self, handle: Handle, value: &[u8]) -> anyhow::Result<()>;

    /// Pushes `value` to the connected peer without waiting for delivery.
    fn notify(&self, handle: Handle, value: &[u8]) -> anyhow::Result<()>;

    fn subscribe(&self, handler: Arc<dyn GattsEventHandler>) -> anyhow::Result<()>;
}
