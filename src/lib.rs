#[cfg(feature = "esp")]
pub mod ble;
pub mod config;
pub mod gamepad;
pub mod gap;
pub mod gatts;
pub mod hid;

#[cfg(test)]
mod testing;

pub use config::GamepadConfig;
pub use gamepad::GamepadBle;
pub use hid::{Button, GamepadReport};
