use crate::{
    config::{AdvertisingConfig, DeviceInfo, APPEARANCE_GAMEPAD},
    gatts::uuid,
};

use super::{
    payload::{
        advertised_name, AdvBytes, AD_APPEARANCE, AD_COMPLETE_16BIT_UUIDS, AD_FLAGS,
        FLAG_BR_EDR_NOT_SUPPORTED, FLAG_LE_GENERAL_DISCOVERABLE, MAX_ADV_LEN,
    },
    AdvParams, AdvertisementPayload, AdvertisementStrategy,
};

const ADV_DATA: [u8; 11] = [
    // Flags
    0x02,
    AD_FLAGS,
    FLAG_LE_GENERAL_DISCOVERABLE | FLAG_BR_EDR_NOT_SUPPORTED,
    // Appearance
    0x03,
    AD_APPEARANCE,
    APPEARANCE_GAMEPAD.to_le_bytes()[0],
    APPEARANCE_GAMEPAD.to_le_bytes()[1],
    // Complete list of 16-bit service UUIDs
    0x03,
    AD_COMPLETE_16BIT_UUIDS,
    uuid::HID_SERVICE.0.to_le_bytes()[0],
    uuid::HID_SERVICE.0.to_le_bytes()[1],
];

/// Low-level path: the payload bytes are written by hand and the advertising
/// and connection parameters are passed through explicitly.
#[derive(Debug, Clone)]
pub struct RawAdvertisement {
    params: AdvParams,
}

impl AdvertisementStrategy for RawAdvertisement {
    fn from_config(config: &AdvertisingConfig) -> Self {
        Self {
            params: AdvParams {
                min_interval: config.min_interval,
                max_interval: config.max_interval,
                connection: config.connection,
            },
        }
    }

    fn name(&self) -> &'static str {
        "raw"
    }

    fn payload(&self, device: &DeviceInfo) -> anyhow::Result<AdvertisementPayload> {
        let mut adv_data = AdvBytes::new();
        adv_data
            .extend_from_slice(&ADV_DATA)
            .map_err(|_| anyhow::anyhow!("Advertising data exceeds {} bytes", MAX_ADV_LEN))?;

        let (ad_type, name) = advertised_name(&device.name, MAX_ADV_LEN - 2);
        let mut scan_rsp = AdvBytes::new();
        scan_rsp
            .extend_from_slice(&[name.len() as u8 + 1, ad_type])
            .and_then(|_| scan_rsp.extend_from_slice(name.as_bytes()))
            .map_err(|_| anyhow::anyhow!("Scan response exceeds {} bytes", MAX_ADV_LEN))?;

        Ok(AdvertisementPayload { adv_data, scan_rsp })
    }

    fn params(&self) -> Option<AdvParams> {
        Some(self.params)
    }
}
