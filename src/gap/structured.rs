use crate::{
    config::{AdvertisingConfig, DeviceInfo, APPEARANCE_GAMEPAD},
    gatts::{uuid, Uuid16},
};

use super::{
    payload::{
        advertised_name, AdvBytes, AD_APPEARANCE, AD_COMPLETE_16BIT_UUIDS, AD_FLAGS,
        FLAG_BR_EDR_NOT_SUPPORTED, FLAG_LE_GENERAL_DISCOVERABLE, MAX_ADV_LEN,
    },
    AdvParams, AdvertisementPayload, AdvertisementStrategy,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdField<'a> {
    Flags(u8),
    Appearance(u16),
    ServiceUuids16(&'a [Uuid16]),
    /// Complete local name, shortened to whatever room is left.
    Name(&'a str),
}

/// AD structure list assembled field by field.
#[derive(Debug, Clone, Default)]
pub struct AdvertisingData {
    data: AdvBytes,
}

impl AdvertisingData {
    pub fn push(&mut self, field: AdField<'_>) -> anyhow::Result<&mut Self> {
        match field {
            AdField::Flags(flags) => self.push_structure(AD_FLAGS, &[flags])?,
            AdField::Appearance(appearance) => {
                self.push_structure(AD_APPEARANCE, &appearance.to_le_bytes())?
            }
            AdField::ServiceUuids16(uuids) => {
                let mut bytes = heapless::Vec::<u8, MAX_ADV_LEN>::new();
                for uuid in uuids {
                    bytes
                        .extend_from_slice(&uuid.0.to_le_bytes())
                        .map_err(|_| anyhow::anyhow!("Too many service UUIDs to advertise"))?;
                }
                self.push_structure(AD_COMPLETE_16BIT_UUIDS, &bytes)?
            }
            AdField::Name(name) => {
                let room = MAX_ADV_LEN.saturating_sub(self.data.len() + 2);
                let (ad_type, name) = advertised_name(name, room);
                self.push_structure(ad_type, name.as_bytes())?
            }
        }

        Ok(self)
    }

    fn push_structure(&mut self, ad_type: u8, value: &[u8]) -> anyhow::Result<()> {
        if self.data.len() + 2 + value.len() > MAX_ADV_LEN {
            return Err(anyhow::anyhow!(
                "AD structure {:#04x} of {} bytes does not fit into the advertisement",
                ad_type,
                value.len()
            ));
        }

        self.data
            .extend_from_slice(&[value.len() as u8 + 1, ad_type])
            .and_then(|_| self.data.extend_from_slice(value))
            .map_err(|_| anyhow::anyhow!("Advertising data exceeds {} bytes", MAX_ADV_LEN))
    }

    pub fn into_bytes(self) -> AdvBytes {
        self.data
    }
}

/// High-level path: the payload is described as typed fields and the stack
/// keeps its default advertising parameters.
#[derive(Debug, Clone, Default)]
pub struct StructuredAdvertisement;

impl AdvertisementStrategy for StructuredAdvertisement {
    fn from_config(config: &AdvertisingConfig) -> Self {
        log::debug!(
            "Structured advertisement uses stack default parameters, ignoring {:?}",
            config
        );
        Self
    }

    fn name(&self) -> &'static str {
        "structured"
    }

    fn payload(&self, device: &DeviceInfo) -> anyhow::Result<AdvertisementPayload> {
        let mut adv_data = AdvertisingData::default();
        adv_data
            .push(AdField::Flags(
                FLAG_LE_GENERAL_DISCOVERABLE | FLAG_BR_EDR_NOT_SUPPORTED,
            ))?
            .push(AdField::Appearance(APPEARANCE_GAMEPAD))?
            .push(AdField::ServiceUuids16(&[uuid::HID_SERVICE]))?;

        let mut scan_rsp = AdvertisingData::default();
        scan_rsp.push(AdField::Name(&device.name))?;

        Ok(AdvertisementPayload {
            adv_data: adv_data.into_bytes(),
            scan_rsp: scan_rsp.into_bytes(),
        })
    }

    fn params(&self) -> Option<AdvParams> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_length_type_value_encoded() {
        let mut data = AdvertisingData::default();
        data.push(AdField::Flags(0x06))
            .unwrap()
            .push(AdField::ServiceUuids16(&[Uuid16(0x1812), Uuid16(0x180F)]))
            .unwrap();

        assert_eq!(
            data.into_bytes().as_slice(),
            &[0x02, 0x01, 0x06, 0x05, 0x03, 0x12, 0x18, 0x0F, 0x18]
        );
    }

    #[test]
    fn overflowing_structures_are_rejected() {
        let uuids = [Uuid16(0x1812); 15];
        let mut data = AdvertisingData::default();
        assert!(data.push(AdField::ServiceUuids16(&uuids)).is_err());
    }

    #[test]
    fn structures_fill_the_advertisement_exactly() {
        let mut data = AdvertisingData::default();
        data.push(AdField::Flags(0x06))
            .unwrap()
            .push(AdField::ServiceUuids16(&[Uuid16(0x1812); 13]))
            .unwrap();

        assert!(data.push(AdField::Flags(0x06)).is_err());

        let bytes = data.into_bytes();
        assert_eq!(bytes.len(), MAX_ADV_LEN);
        assert_eq!(&bytes[3..5], &[27, AD_COMPLETE_16BIT_UUIDS]);
    }

    #[test]
    fn name_takes_remaining_room() {
        let mut data = AdvertisingData::default();
        data.push(AdField::Flags(0x06)).unwrap();
        data.push(AdField::Name(&"n".repeat(40))).unwrap();

        let bytes = data.into_bytes();
        assert_eq!(bytes.len(), MAX_ADV_LEN);
        assert_eq!(bytes[3], 26 + 1);
        assert_eq!(bytes[4], super::super::payload::AD_SHORTENED_LOCAL_NAME);
    }

    #[test]
    fn uses_stack_default_parameters() {
        let strategy = StructuredAdvertisement::from_config(&AdvertisingConfig::default());
        assert_eq!(strategy.params(), None);
    }
}
