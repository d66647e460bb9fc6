use serde::{Deserialize, Serialize};

use crate::config::{DeviceInfo, HID_REPORT_ID};
use crate::gatts::attribute::{decode, encode, AttrBytes, Attribute};

/// A wrapper for u8 values that implements the Attribute trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct U8Attr(pub u8);

impl Attribute for U8Attr {
    fn get_bytes(&self) -> anyhow::Result<AttrBytes> {
        AttrBytes::from_slice(&[self.0]).map_err(|_| anyhow::anyhow!("U8Attr does not fit"))
    }

    fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        if bytes.len() != 1 {
            return Err(anyhow::anyhow!(
                "Invalid length for U8Attr: expected 1 byte, got {}",
                bytes.len()
            ));
        }
        Ok(U8Attr(bytes[0]))
    }
}

/// A wrapper for u16 values that implements the Attribute trait.
/// Uses little-endian byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct U16Attr(pub u16);

impl Attribute for U16Attr {
    fn get_bytes(&self) -> anyhow::Result<AttrBytes> {
        AttrBytes::from_slice(&self.0.to_le_bytes())
            .map_err(|_| anyhow::anyhow!("U16Attr does not fit"))
    }

    fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        if bytes.len() != 2 {
            return Err(anyhow::anyhow!(
                "Invalid length for U16Attr: expected 2 bytes, got {}",
                bytes.len()
            ));
        }
        Ok(U16Attr(u16::from_le_bytes([bytes[0], bytes[1]])))
    }
}

/// A wrapper for string values that implements the Attribute trait.
/// Stores UTF-8 encoded string data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringAttr(pub String);

impl Attribute for StringAttr {
    fn get_bytes(&self) -> anyhow::Result<AttrBytes> {
        AttrBytes::from_slice(self.0.as_bytes()).map_err(|_| {
            anyhow::anyhow!(
                "String attribute {:?} is longer than {} bytes",
                self.0,
                super::MAX_ATTR_LEN
            )
        })
    }

    fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let string = String::from_utf8(bytes.to_vec())
            .map_err(|e| anyhow::anyhow!("Invalid UTF-8 string data: {}", e))?;
        Ok(StringAttr(string))
    }
}

/// Client Characteristic Configuration value (0x2902).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    pub notifications: bool,
    pub indications: bool,
}

impl ClientConfig {
    pub const DISABLED: Self = Self {
        notifications: false,
        indications: false,
    };
}

impl Attribute for ClientConfig {
    fn get_bytes(&self) -> anyhow::Result<AttrBytes> {
        let bits = u16::from(self.notifications) | (u16::from(self.indications) << 1);
        U16Attr(bits).get_bytes()
    }

    fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let U16Attr(bits) = U16Attr::from_bytes(bytes)?;
        Ok(Self {
            notifications: bits & 0x0001 != 0,
            indications: bits & 0x0002 != 0,
        })
    }
}

/// HID Information value (0x2A4A).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HidInformation {
    pub bcd_hid: u16,
    pub country_code: u8,
    pub flags: u8,
}

impl HidInformation {
    pub const FLAG_REMOTE_WAKE: u8 = 0x01;
}

impl Default for HidInformation {
    fn default() -> Self {
        Self {
            bcd_hid: 0x0111,
            country_code: 0x00,
            flags: Self::FLAG_REMOTE_WAKE,
        }
    }
}

impl Attribute for HidInformation {
    fn get_bytes(&self) -> anyhow::Result<AttrBytes> {
        encode(self)
    }

    fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        decode(bytes)
    }
}

/// Protocol Mode value (0x2A4E).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolMode {
    Boot = 0x00,
    Report = 0x01,
}

impl Attribute for ProtocolMode {
    fn get_bytes(&self) -> anyhow::Result<AttrBytes> {
        U8Attr(*self as u8).get_bytes()
    }

    fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        match U8Attr::from_bytes(bytes)? {
            U8Attr(0x00) => Ok(ProtocolMode::Boot),
            U8Attr(0x01) => Ok(ProtocolMode::Report),
            U8Attr(other) => Err(anyhow::anyhow!("Unknown protocol mode: {:#04x}", other)),
        }
    }
}

/// HID Control Point commands (0x2A4C).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlPoint {
    Suspend = 0x00,
    ExitSuspend = 0x01,
}

impl Attribute for ControlPoint {
    fn get_bytes(&self) -> anyhow::Result<AttrBytes> {
        U8Attr(*self as u8).get_bytes()
    }

    fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        match U8Attr::from_bytes(bytes)? {
            U8Attr(0x00) => Ok(ControlPoint::Suspend),
            U8Attr(0x01) => Ok(ControlPoint::ExitSuspend),
            U8Attr(other) => Err(anyhow::anyhow!("Unknown control point command: {:#04x}", other)),
        }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportType {
    Input = 0x01,
    Output = 0x02,
    Feature = 0x03,
}

/// Report Reference descriptor value (0x2908).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportReference {
    pub report_id: u8,
    pub report_type: u8,
}

impl ReportReference {
    pub fn new(report_id: u8, report_type: ReportType) -> Self {
        Self {
            report_id,
            report_type: report_type as u8,
        }
    }

    pub fn gamepad_input() -> Self {
        Self::new(HID_REPORT_ID, ReportType::Input)
    }
}

impl Attribute for ReportReference {
    fn get_bytes(&self) -> anyhow::Result<AttrBytes> {
        encode(self)
    }

    fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        decode(bytes)
    }
}

/// PnP ID value (0x2A50).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PnpId {
    pub vendor_id_source: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub version: u16,
}

impl From<&DeviceInfo> for PnpId {
    fn from(device: &DeviceInfo) -> Self {
        Self {
            vendor_id_source: device.vendor_id_source as u8,
            vendor_id: device.vendor_id,
            product_id: device.product_id,
            version: device.version,
        }
    }
}

impl Attribute for PnpId {
    fn get_bytes(&self) -> anyhow::Result<AttrBytes> {
        encode(self)
    }

    fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        decode(bytes)
    }
}
