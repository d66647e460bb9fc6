use enumset::{EnumSet, EnumSetType};
use serde::{Deserialize, Serialize};

use crate::gatts::attribute::{decode, encode, AttrBytes, Attribute};

/// Gamepad buttons in report bit order, following the XInput to DirectInput
/// mapping (A is button 1, i.e. bit 0).
#[derive(EnumSetType, Debug)]
#[enumset(repr = "u16")]
pub enum Button {
    A,
    B,
    X,
    Y,
    LeftBumper,
    RightBumper,
    Back,
    Start,
    LeftStick,
    RightStick,
}

/// Input report payload. Field order and widths mirror `REPORT_MAP`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamepadReport {
    pub left_stick_x: i16,
    pub left_stick_y: i16,
    pub right_stick_x: i16,
    pub right_stick_y: i16,
    #[serde(with = "button_bits")]
    pub buttons: EnumSet<Button>,
}

impl GamepadReport {
    /// Serialized length, report id excluded.
    pub const LEN: usize = 10;

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        if pressed {
            self.buttons.insert(button);
        } else {
            self.buttons.remove(button);
        }
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        self.buttons.contains(button)
    }

    pub fn set_left_stick(&mut self, x: i16, y: i16) {
        self.left_stick_x = x;
        self.left_stick_y = y;
    }

    pub fn set_right_stick(&mut self, x: i16, y: i16) {
        self.right_stick_x = x;
        self.right_stick_y = y;
    }
}

impl Attribute for GamepadReport {
    fn get_bytes(&self) -> anyhow::Result<AttrBytes> {
        encode(self)
    }

    fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        decode(bytes)
    }
}

mod button_bits {
    use enumset::EnumSet;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Button;

    pub fn serialize<S: Serializer>(buttons: &EnumSet<Button>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u16(buttons.as_repr())
    }

    // Bits above the last known button are padding in the report map
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<EnumSet<Button>, D::Error> {
        Ok(EnumSet::from_repr_truncated(u16::deserialize(d)?))
    }
}
