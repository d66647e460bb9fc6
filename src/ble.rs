use std::sync::Arc;

use esp_idf_svc as svc;
use esp_idf_svc::hal::modem::Modem;

use svc::bt::BtDriver;
use svc::nvs::EspDefaultNvsPartition;

use crate::config::GamepadConfig;
use crate::gap::esp::EspGap;
use crate::gap::security::PairingPeer;
use crate::gatts::esp::EspGattServer;

pub type ExtBtDriver = Arc<BtDriver<'static, svc::bt::Ble>>;

const GATT_APP_ID: u16 = 0;

/// Owns the Bluetooth controller and the Bluedroid GAP and GATT server
/// backends built on top of it.
pub struct Ble {
    _bt: ExtBtDriver,
    pub gap: Arc<EspGap>,
    pub gatts: Arc<EspGattServer>,
}

impl Ble {
    pub fn new(modem: Modem, config: &GamepadConfig) -> anyhow::Result<Self> {
        let nvs = EspDefaultNvsPartition::take()?;
        let bt = Arc::new(BtDriver::<svc::bt::Ble>::new(modem, Some(nvs.clone()))?);

        let pairing = Arc::new(PairingPeer::default());
        let gap = Arc::new(EspGap::new(bt.clone(), config.security, pairing.clone())?);
        let gatts = Arc::new(EspGattServer::new(
            bt.clone(),
            GATT_APP_ID,
            config.security,
            pairing,
        )?);

        Ok(Ble {
            _bt: bt,
            gap,
            gatts,
        })
    }
}
