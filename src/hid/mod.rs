pub mod report;
pub mod report_map;

pub use report::{Button, GamepadReport};
pub use report_map::REPORT_MAP;
