use crate::config::HID_REPORT_ID;

/// HID report map of the gamepad (Report Map characteristic 0x2A4B).
///
/// Layout of the input report with ID [`HID_REPORT_ID`], all little-endian:
/// four signed 16-bit axes X, Y, Rx, Ry followed by sixteen one-bit buttons.
/// [`GamepadReport`](super::GamepadReport) serializes in exactly this order.
pub const REPORT_MAP: [u8; 50] = [
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x05, // Usage (Game Pad)
    0xA1, 0x01, // Collection (Application)
    0x85, HID_REPORT_ID, //   Report ID
    0x09, 0x01, //   Usage (Pointer)
    0xA1, 0x00, //   Collection (Physical)
    0x09, 0x30, //     Usage (X)
    0x09, 0x31, //     Usage (Y)
    0x09, 0x33, //     Usage (Rx)
    0x09, 0x34, //     Usage (Ry)
    0x16, 0x00, 0x80, //     Logical Minimum (-32768)
    0x26, 0xFF, 0x7F, //     Logical Maximum (32767)
    0x75, 0x10, //     Report Size (16)
    0x95, 0x04, //     Report Count (4)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    0xC0, //   End Collection
    0x05, 0x09, //   Usage Page (Button)
    0x19, 0x01, //   Usage Minimum (1)
    0x29, 0x10, //   Usage Maximum (16)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x10, //   Report Count (16)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    0xC0, // End Collection
];

/// One Input main item as a host would interpret it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputField {
    pub report_id: u8,
    pub usage_page: u16,
    /// Offset inside the report payload, report id byte excluded.
    pub bit_offset: usize,
    pub bit_size: usize,
    pub count: usize,
    pub logical_min: i32,
    pub logical_max: i32,
}

impl InputField {
    pub fn is_signed(&self) -> bool {
        self.logical_min < 0
    }

    pub fn bit_len(&self) -> usize {
        self.bit_size * self.count
    }

    /// Reads element `index` of this field out of a serialized report.
    pub fn value(&self, payload: &[u8], index: usize) -> Option<i32> {
        if index >= self.count || self.bit_size == 0 || self.bit_size > 32 {
            return None;
        }

        let start = self.bit_offset + index * self.bit_size;
        let mut raw: u32 = 0;
        for bit in 0..self.bit_size {
            let position = start + bit;
            let byte = *payload.get(position / 8)?;
            if (byte >> (position % 8)) & 1 == 1 {
                raw |= 1 << bit;
            }
        }

        if self.is_signed() && self.bit_size < 32 && raw & (1 << (self.bit_size - 1)) != 0 {
            raw |= u32::MAX << self.bit_size;
        }

        Some(raw as i32)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct GlobalState {
    usage_page: u16,
    logical_min: i32,
    logical_max: i32,
    logical_max_unsigned: u32,
    report_size: usize,
    report_count: usize,
    report_id: u8,
}

fn item_unsigned(data: &[u8]) -> u32 {
    data.iter()
        .rev()
        .fold(0u32, |acc, byte| (acc << 8) | u32::from(*byte))
}

fn item_signed(data: &[u8]) -> i32 {
    match data.len() {
        0 => 0,
        1 => i32::from(data[0] as i8),
        2 => i32::from(i16::from_le_bytes([data[0], data[1]])),
        _ => item_unsigned(data) as i32,
    }
}

/// Walks the short items of a report map and lists its Input fields with their
/// bit offsets, one running offset per report id.
pub fn input_fields(map: &[u8]) -> anyhow::Result<Vec<InputField>> {
    let mut fields = Vec::new();
    let mut globals = GlobalState::default();
    let mut global_stack = Vec::new();
    let mut offsets: Vec<(u8, usize)> = Vec::new();

    let mut position = 0;
    while position < map.len() {
        let prefix = map[position];
        if prefix == 0xFE {
            return Err(anyhow::anyhow!(
                "Long items are not supported (offset {})",
                position
            ));
        }

        let size = match prefix & 0x03 {
            3 => 4,
            size => size as usize,
        };
        let data = map
            .get(position + 1..position + 1 + size)
            .ok_or_else(|| anyhow::anyhow!("Truncated report map item at offset {}", position))?;

        let item_type = (prefix >> 2) & 0x03;
        let tag = prefix >> 4;

        match (item_type, tag) {
            // Input
            (0, 0x8) => {
                let slot = match offsets.iter().position(|(id, _)| *id == globals.report_id) {
                    Some(slot) => slot,
                    None => {
                        offsets.push((globals.report_id, 0));
                        offsets.len() - 1
                    }
                };
                let offset = &mut offsets[slot].1;

                let logical_max = if globals.logical_min >= 0 && globals.logical_max < 0 {
                    globals.logical_max_unsigned as i32
                } else {
                    globals.logical_max
                };

                fields.push(InputField {
                    report_id: globals.report_id,
                    usage_page: globals.usage_page,
                    bit_offset: *offset,
                    bit_size: globals.report_size,
                    count: globals.report_count,
                    logical_min: globals.logical_min,
                    logical_max,
                });
                *offset += globals.report_size * globals.report_count;
            }
            (1, 0x0) => globals.usage_page = item_unsigned(data) as u16,
            (1, 0x1) => globals.logical_min = item_signed(data),
            (1, 0x2) => {
                globals.logical_max = item_signed(data);
                globals.logical_max_unsigned = item_unsigned(data);
            }
            (1, 0x7) => globals.report_size = item_unsigned(data) as usize,
            (1, 0x8) => globals.report_id = item_unsigned(data) as u8,
            (1, 0x9) => globals.report_count = item_unsigned(data) as usize,
            (1, 0xA) => global_stack.push(globals),
            (1, 0xB) => {
                globals = global_stack
                    .pop()
                    .ok_or_else(|| anyhow::anyhow!("Pop without Push at offset {}", position))?;
            }
            _ => {}
        }

        position += 1 + size;
    }

    Ok(fields)
}

/// Payload length in bytes of the input report `report_id`, report id byte excluded.
pub fn input_report_len(map: &[u8], report_id: u8) -> anyhow::Result<usize> {
    let bits: usize = input_fields(map)?
        .iter()
        .filter(|field| field.report_id == report_id)
        .map(InputField::bit_len)
        .sum();

    if bits == 0 {
        return Err(anyhow::anyhow!(
            "Report map declares no input fields for report id {}",
            report_id
        ));
    }

    Ok(bits.div_ceil(8))
}
