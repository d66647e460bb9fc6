#[cfg(feature = "esp")]
pub mod esp;
#[cfg(feature = "esp")]
mod event;
pub mod payload;
pub mod raw;
pub mod security;
pub mod structured;

use std::sync::Arc;

use payload::AdvBytes;

use crate::{
    config::{AdvertisingConfig, ConnParams, DeviceInfo},
    gatts::{connection::AdvertisingControl, PeerAddr},
};

pub use raw::RawAdvertisement;
pub use structured::StructuredAdvertisement;

#[cfg(not(feature = "raw-advertising"))]
pub type DefaultAdvertisement = StructuredAdvertisement;
#[cfg(feature = "raw-advertising")]
pub type DefaultAdvertisement = RawAdvertisement;

/// Advertising parameters passed to the stack when starting to advertise.
/// Intervals in 0.625 ms units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvParams {
    pub min_interval: u16,
    pub max_interval: u16,
    pub connection: Option<ConnParams>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisementPayload {
    pub adv_data: AdvBytes,
    pub scan_rsp: AdvBytes,
}

/// GAP operations the gamepad needs from the underlying BLE stack.
pub trait Gap: Send + Sync {
    fn set_device_name(&self, name: &str) -> anyhow::Result<()>;

    fn set_adv_data(&self, data: &[u8]) -> anyhow::Result<()>;

    fn set_scan_rsp_data(&self, data: &[u8]) -> anyhow::Result<()>;

    /// `None` keeps the stack's default advertising parameters.
    fn start_advertising(&self, params: Option<&AdvParams>) -> anyhow::Result<()>;

    fn update_conn_params(&self, peer: PeerAddr, params: &ConnParams) -> anyhow::Result<()>;
}

/// One way of producing the advertisement. Every strategy must produce the
/// same bytes for the same device.
pub trait AdvertisementStrategy {
    fn from_config(config: &AdvertisingConfig) -> Self
    where
        Self: Sized;

    fn name(&self) -> &'static str;

    fn payload(&self, device: &DeviceInfo) -> anyhow::Result<AdvertisementPayload>;

    fn params(&self) -> Option<AdvParams>;
}

pub struct Advertiser {
    gap: Arc<dyn Gap>,
    strategy: &'static str,
    payload: AdvertisementPayload,
    params: Option<AdvParams>,
}

impl Advertiser {
    pub fn new(
        gap: Arc<dyn Gap>,
        strategy: &dyn AdvertisementStrategy,
        device: &DeviceInfo,
    ) -> anyhow::Result<Self> {
        let payload = strategy.payload(device)?;

        gap.set_device_name(&device.name)
            .map_err(|err| anyhow::anyhow!("Failed to set device name: {:?}", err))?;

        Ok(Self {
            gap,
            strategy: strategy.name(),
            payload,
            params: strategy.params(),
        })
    }

    /// Loads the payload and starts advertising. Safe to call again after
    /// the stack stopped advertising on connect.
    pub fn start(&self) -> anyhow::Result<()> {
        self.gap
            .set_adv_data(&self.payload.adv_data)
            .map_err(|err| anyhow::anyhow!("Failed to set advertising data: {:?}", err))?;
        self.gap
            .set_scan_rsp_data(&self.payload.scan_rsp)
            .map_err(|err| anyhow::anyhow!("Failed to set scan response data: {:?}", err))?;
        self.gap
            .start_advertising(self.params.as_ref())
            .map_err(|err| anyhow::anyhow!("Failed to start advertising: {:?}", err))?;

        log::info!("Advertising started ({} advertisement)", self.strategy);

        Ok(())
    }

    pub fn payload(&self) -> &AdvertisementPayload {
        &self.payload
    }
}

impl AdvertisingControl for Advertiser {
    fn restart_advertising(&self) -> anyhow::Result<()> {
        self.start()
    }

    fn peer_connected(&self, peer: PeerAddr) -> anyhow::Result<()> {
        let Some(connection) = self.params.and_then(|params| params.connection) else {
            return Ok(());
        };

        self.gap.update_conn_params(peer, &connection)
    }
}

#[cfg(test)]
mod tests {
    use super::{payload::MAX_ADV_LEN, *};
    use crate::testing::MockBle;

    fn device(name: &str) -> DeviceInfo {
        DeviceInfo {
            name: name.to_string(),
            ..DeviceInfo::default()
        }
    }

    fn both(device: &DeviceInfo) -> (AdvertisementPayload, AdvertisementPayload) {
        let config = AdvertisingConfig::default();
        (
            StructuredAdvertisement::from_config(&config)
                .payload(device)
                .unwrap(),
            RawAdvertisement::from_config(&config)
                .payload(device)
                .unwrap(),
        )
    }

    #[test]
    fn advertising_data_is_exact() {
        let (structured, raw) = both(&device("TestPad"));

        let expected = [
            0x02, 0x01, 0x06, 0x03, 0x19, 0xC4, 0x03, 0x03, 0x03, 0x12, 0x18,
        ];
        assert_eq!(structured.adv_data.as_slice(), &expected);
        assert_eq!(raw.adv_data.as_slice(), &expected);
    }

    #[test]
    fn strategies_agree_on_short_names() {
        let (structured, raw) = both(&device("TestPad"));

        assert_eq!(structured, raw);
        assert_eq!(
            structured.scan_rsp.as_slice(),
            &[0x08, 0x09, b'T', b'e', b's', b't', b'P', b'a', b'd']
        );
    }

    #[test]
    fn strategies_agree_on_long_names() {
        let (structured, raw) = both(&device("An Unreasonably Long Gamepad Name For BLE"));

        assert_eq!(structured, raw);
        assert_eq!(structured.scan_rsp.len(), MAX_ADV_LEN);
        assert_eq!(structured.scan_rsp[0], 30);
        assert_eq!(structured.scan_rsp[1], payload::AD_SHORTENED_LOCAL_NAME);
    }

    #[test]
    fn start_loads_payload_then_advertises() {
        let ble = Arc::new(MockBle::default());
        let strategy = RawAdvertisement::from_config(&AdvertisingConfig::default());
        let advertiser = Advertiser::new(ble.clone(), &strategy, &device("TestPad")).unwrap();

        advertiser.start().unwrap();
        advertiser.restart_advertising().unwrap();

        assert_eq!(ble.device_name().as_deref(), Some("TestPad"));
        assert_eq!(ble.adv_data(), advertiser.payload().adv_data.to_vec());
        assert_eq!(ble.scan_rsp_data(), advertiser.payload().scan_rsp.to_vec());
        assert_eq!(ble.advertising_starts(), 2);
        assert_eq!(ble.last_adv_params(), Some(strategy.params()));
    }

    #[test]
    fn connection_hints_only_with_configured_parameters() {
        let ble = Arc::new(MockBle::default());
        let peer = PeerAddr([1, 2, 3, 4, 5, 6]);

        let raw = RawAdvertisement::from_config(&AdvertisingConfig::default());
        let advertiser = Advertiser::new(ble.clone(), &raw, &device("TestPad")).unwrap();
        advertiser.peer_connected(peer).unwrap();
        assert_eq!(ble.conn_param_updates(), vec![(peer, ConnParams::default())]);

        let structured = StructuredAdvertisement::from_config(&AdvertisingConfig::default());
        let advertiser = Advertiser::new(ble.clone(), &structured, &device("TestPad")).unwrap();
        advertiser.peer_connected(peer).unwrap();
        assert_eq!(ble.conn_param_updates().len(), 1);
    }
}
