// https://www.bluetooth.com/specifications/assigned-numbers/
// Section 2.3 Common Data Types
pub const AD_FLAGS: u8 = 0x01;
pub const AD_COMPLETE_16BIT_UUIDS: u8 = 0x03;
pub const AD_SHORTENED_LOCAL_NAME: u8 = 0x08;
pub const AD_COMPLETE_LOCAL_NAME: u8 = 0x09;
pub const AD_APPEARANCE: u8 = 0x19;

pub const FLAG_LE_GENERAL_DISCOVERABLE: u8 = 0x02;
pub const FLAG_BR_EDR_NOT_SUPPORTED: u8 = 0x04;

/// Legacy advertising PDUs carry at most 31 bytes of AD structures.
pub const MAX_ADV_LEN: usize = 31;

pub type AdvBytes = heapless::Vec<u8, MAX_ADV_LEN>;

/// Picks the AD type and the part of `name` that fits into `room` bytes of
/// name data. Names are only cut at character boundaries.
pub fn advertised_name(name: &str, room: usize) -> (u8, &str) {
    if name.len() <= room {
        return (AD_COMPLETE_LOCAL_NAME, name);
    }

    let mut end = room;
    while !name.is_char_boundary(end) {
        end -= 1;
    }

    (AD_SHORTENED_LOCAL_NAME, &name[..end])
}
