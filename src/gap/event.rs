use esp_idf_svc::bt::{ble::gap::BleGapEvent, BdAddr, BtStatus};

#[derive(Debug, Clone)]
pub enum GapEvent {
    RawAdvertisingConfigured(BtStatus),
    RawScanResponseConfigured(BtStatus),
    AdvertisingStarted(BtStatus),
    AuthenticationComplete {
        bd_addr: BdAddr,
        status: BtStatus,
    },
    SecurityRequest,
    ConnectionParamsConfigured {
        addr: BdAddr,
        status: BtStatus,
        min_int_ms: u32,
        max_int_ms: u32,
        latency_ms: u32,
        conn_int: u16,
        timeout_ms: u32,
    },

    Other,
}

impl<'d> From<BleGapEvent<'d>> for GapEvent {
    fn from(event: BleGapEvent<'d>) -> Self {
        match event {
            BleGapEvent::RawAdvertisingConfigured(bt_status) => {
                GapEvent::RawAdvertisingConfigured(bt_status)
            }
            BleGapEvent::RawScanResponseConfigured(bt_status) => {
                GapEvent::RawScanResponseConfigured(bt_status)
            }
            BleGapEvent::AdvertisingStarted(bt_status) => GapEvent::AdvertisingStarted(bt_status),
            BleGapEvent::AuthenticationComplete { bd_addr, status } => {
                GapEvent::AuthenticationComplete { bd_addr, status }
            }
            BleGapEvent::SecurityRequest => GapEvent::SecurityRequest,
            BleGapEvent::ConnectionParamsConfigured {
                addr,
                status,
                min_int_ms,
                max_int_ms,
                latency_ms,
                conn_int,
                timeout_ms,
            } => GapEvent::ConnectionParamsConfigured {
                addr,
                status,
                min_int_ms,
                max_int_ms,
                latency_ms,
                conn_int,
                timeout_ms,
            },

            _ => GapEvent::Other,
        }
    }
}
