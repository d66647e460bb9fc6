use std::{
    collections::HashMap,
    mem::{discriminant, Discriminant},
    sync::{Arc, RwLock},
};

use crossbeam_channel::{bounded, Sender};
use esp_idf_svc::{
    bt::{ble::gap::EspBleGap, BtStatus},
    sys::{self, esp},
};

use super::{event::GapEvent, security::PairingPeer, AdvParams, Gap};
use crate::{
    ble::ExtBtDriver,
    config::{ConnParams, SecurityLevel, STACK_CONFIRM_TIMEOUT},
    gatts::PeerAddr,
};
use esp_idf_svc as svc;

type GapEventsMap = HashMap<Discriminant<GapEvent>, Sender<GapEvent>>;

/// Bluedroid GAP backend.
#[derive(Clone)]
pub struct EspGap(Arc<EspGapInner>);

pub struct EspGapInner {
    gap: EspBleGap<'static, svc::bt::Ble, ExtBtDriver>,
    gap_events: Arc<RwLock<GapEventsMap>>,
}

impl EspGap {
    pub fn new(
        bt: ExtBtDriver,
        security: SecurityLevel,
        pairing: Arc<PairingPeer>,
    ) -> anyhow::Result<Self> {
        let gap = EspBleGap::new(bt)?;

        let gap = Self(Arc::new(EspGapInner {
            gap,
            gap_events: Arc::new(RwLock::new(HashMap::new())),
        }));

        gap.init_callbacks(pairing)?;
        gap.configure_security(security)?;

        Ok(gap)
    }

    fn init_callbacks(&self, pairing: Arc<PairingPeer>) -> anyhow::Result<()> {
        let callback_channels_map = Arc::downgrade(&self.0.gap_events);
        self.0.gap.subscribe(move |e| {
            let Some(callback_channels) = callback_channels_map.upgrade() else {
                log::error!("Failed to upgrade Gap events map");
                return;
            };

            let event = GapEvent::from(e);
            log::debug!("Received event {:?}", event);

            match &event {
                GapEvent::SecurityRequest => Self::accept_security_request(&pairing),
                GapEvent::AuthenticationComplete { bd_addr, status } => {
                    log::info!("Authentication with {:?} completed: {:?}", bd_addr, status)
                }
                GapEvent::ConnectionParamsConfigured {
                    addr,
                    status,
                    conn_int,
                    latency_ms,
                    timeout_ms,
                    ..
                } => log::info!(
                    "Connection parameters for {:?}: {:?}, interval {}, latency {} ms, timeout {} ms",
                    addr,
                    status,
                    conn_int,
                    latency_ms,
                    timeout_ms
                ),
                _ => {}
            }

            let Ok(map_lock) = callback_channels.read() else {
                log::error!("Failed to acquire read lock for events map");
                return;
            };

            let Some(callback_channel) = map_lock.get(&discriminant(&event)) else {
                return;
            };

            callback_channel.send(event).unwrap_or_else(|err| {
                log::error!("Failed to send event to callback channel: {:?}", err);
            });
        })?;

        Ok(())
    }

    fn accept_security_request(pairing: &PairingPeer) {
        let Some(peer) = pairing.current() else {
            log::warn!("Security request without a connected peer");
            return;
        };

        let mut bda = peer.0;
        match esp!(unsafe { sys::esp_ble_gap_security_rsp(bda.as_mut_ptr(), true) }) {
            Ok(()) => log::info!("Accepted security request from {}", peer),
            Err(err) => log::error!("Failed to accept security request from {}: {:?}", peer, err),
        }
    }

    /// Just Works bonding. Encryption itself is requested per link once a
    /// peer connects.
    fn configure_security(&self, security: SecurityLevel) -> anyhow::Result<()> {
        if security == SecurityLevel::Open {
            return Ok(());
        }

        let mut auth_req = sys::ESP_LE_AUTH_REQ_SC_BOND as u8;
        let mut io_cap = sys::ESP_IO_CAP_NONE as u8;
        let mut key_size = 16u8;
        let mut init_key = (sys::ESP_BLE_ENC_KEY_MASK | sys::ESP_BLE_ID_KEY_MASK) as u8;
        let mut rsp_key = (sys::ESP_BLE_ENC_KEY_MASK | sys::ESP_BLE_ID_KEY_MASK) as u8;

        for (param, value) in [
            (sys::esp_ble_sm_param_t_ESP_BLE_SM_AUTHEN_REQ_MODE, &mut auth_req),
            (sys::esp_ble_sm_param_t_ESP_BLE_SM_IOCAP_MODE, &mut io_cap),
            (sys::esp_ble_sm_param_t_ESP_BLE_SM_MAX_KEY_SIZE, &mut key_size),
            (sys::esp_ble_sm_param_t_ESP_BLE_SM_SET_INIT_KEY, &mut init_key),
            (sys::esp_ble_sm_param_t_ESP_BLE_SM_SET_RSP_KEY, &mut rsp_key),
        ] {
            esp!(unsafe {
                sys::esp_ble_gap_set_security_param(param, value as *mut u8 as *mut _, 1)
            })
            .map_err(|err| {
                anyhow::anyhow!("Failed to set security parameter {}: {:?}", param, err)
            })?;
        }

        Ok(())
    }

    fn await_event(
        &self,
        template: GapEvent,
        action: impl FnOnce() -> anyhow::Result<()>,
    ) -> anyhow::Result<GapEvent> {
        let (tx, rx) = bounded(1);
        let key = discriminant(&template);

        self.0
            .gap_events
            .write()
            .map_err(|err| anyhow::anyhow!("Failed to write gap_events: {:?}", err))?
            .insert(key, tx);

        let result = action().and_then(|_| {
            rx.recv_timeout(STACK_CONFIRM_TIMEOUT)
                .map_err(|_| anyhow::anyhow!("Timeout waiting for {:?}", template))
        });

        self.0
            .gap_events
            .write()
            .map_err(|err| anyhow::anyhow!("Failed to write gap_events: {:?}", err))?
            .remove(&key);

        result
    }

    fn check_status(event: GapEvent) -> anyhow::Result<()> {
        match event {
            GapEvent::RawAdvertisingConfigured(status)
            | GapEvent::RawScanResponseConfigured(status)
            | GapEvent::AdvertisingStarted(status) => match status {
                BtStatus::Success => Ok(()),
                _ => Err(anyhow::anyhow!("Stack reported {:?}", status)),
            },
            other => Err(anyhow::anyhow!("Unexpected event: {:?}", other)),
        }
    }
}

impl Gap for EspGap {
    fn set_device_name(&self, name: &str) -> anyhow::Result<()> {
        self.0.gap.set_device_name(name)?;
        Ok(())
    }

    fn set_adv_data(&self, data: &[u8]) -> anyhow::Result<()> {
        let event = self.await_event(GapEvent::RawAdvertisingConfigured(BtStatus::Done), || {
            self.0.gap.set_raw_adv_conf(data)?;
            Ok(())
        })?;

        Self::check_status(event)
    }

    fn set_scan_rsp_data(&self, data: &[u8]) -> anyhow::Result<()> {
        let event = self.await_event(GapEvent::RawScanResponseConfigured(BtStatus::Done), || {
            self.0.gap.set_raw_scan_rsp_conf(data)?;
            Ok(())
        })?;

        Self::check_status(event)
    }

    fn start_advertising(&self, params: Option<&AdvParams>) -> anyhow::Result<()> {
        let event = self.await_event(GapEvent::AdvertisingStarted(BtStatus::Done), || {
            match params {
                None => self.0.gap.start_advertising()?,
                Some(params) => {
                    let mut adv_params = sys::esp_ble_adv_params_t {
                        adv_int_min: params.min_interval,
                        adv_int_max: params.max_interval,
                        adv_type: sys::esp_ble_adv_type_t_ADV_TYPE_IND,
                        own_addr_type: sys::esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
                        peer_addr: [0; 6],
                        peer_addr_type: sys::esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
                        channel_map: sys::esp_ble_adv_channel_t_ADV_CHNL_ALL,
                        adv_filter_policy:
                            sys::esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
                    };

                    esp!(unsafe { sys::esp_ble_gap_start_advertising(&mut adv_params) })?;
                }
            }
            Ok(())
        })?;

        Self::check_status(event)
    }

    fn update_conn_params(&self, peer: PeerAddr, params: &ConnParams) -> anyhow::Result<()> {
        let mut update = sys::esp_ble_conn_update_params_t {
            bda: peer.0,
            min_int: params.min_interval,
            max_int: params.max_interval,
            latency: params.latency,
            timeout: params.timeout,
        };

        // Completion arrives as ConnectionParamsConfigured and is only logged
        esp!(unsafe { sys::esp_ble_gap_update_conn_params(&mut update) }).map_err(|err| {
            anyhow::anyhow!("Failed to request connection parameters: {:?}", err)
        })
    }
}
