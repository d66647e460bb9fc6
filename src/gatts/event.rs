use esp_idf_svc::bt::{
    ble::gatt::{
        self,
        server::{AppId, ConnectionId, TransferId},
        GattConnReason, GattInterface, GattStatus, Handle,
    },
    BdAddr, BtUuid,
};

use crate::gatts::{ConnectionEvent, PeerAddr};

/// Owned mirror of the stack events the server reacts to.
#[derive(Debug, Clone)]
pub enum GattsEvent {
    ServiceRegistered {
        status: GattStatus,
        app_id: AppId,
    },
    Read {
        conn_id: ConnectionId,
        trans_id: TransferId,
        addr: BdAddr,
        handle: Handle,
        offset: u16,
        is_long: bool,
        need_rsp: bool,
    },
    Write {
        conn_id: ConnectionId,
        trans_id: TransferId,
        addr: BdAddr,
        handle: Handle,
        offset: u16,
        need_rsp: bool,
        is_prep: bool,
        value: Vec<u8>,
    },
    ExecWrite {
        conn_id: ConnectionId,
        trans_id: TransferId,
        addr: BdAddr,
        canceled: bool,
    },
    Mtu {
        conn_id: ConnectionId,
        mtu: u16,
    },
    ServiceCreated {
        status: GattStatus,
        service_handle: Handle,
    },
    CharacteristicAdded {
        status: GattStatus,
        attr_handle: Handle,
        service_handle: Handle,
        char_uuid: BtUuid,
    },
    DescriptorAdded {
        status: GattStatus,
        attr_handle: Handle,
        service_handle: Handle,
        descr_uuid: BtUuid,
    },
    ServiceStarted {
        status: GattStatus,
        service_handle: Handle,
    },
    PeerConnected {
        conn_id: ConnectionId,
        addr: BdAddr,
    },
    PeerDisconnected {
        conn_id: ConnectionId,
        addr: BdAddr,
        reason: GattConnReason,
    },
    Congest {
        conn_id: ConnectionId,
        congested: bool,
    },

    Other,
}

impl<'d> From<gatt::server::GattsEvent<'d>> for GattsEvent {
    fn from(event: gatt::server::GattsEvent<'d>) -> Self {
        match event {
            gatt::server::GattsEvent::ServiceRegistered { status, app_id } => {
                GattsEvent::ServiceRegistered { status, app_id }
            }
            gatt::server::GattsEvent::Read {
                conn_id,
                trans_id,
                addr,
                handle,
                offset,
                is_long,
                need_rsp,
            } => GattsEvent::Read {
                conn_id,
                trans_id,
                addr,
                handle,
                offset,
                is_long,
                need_rsp,
            },
            gatt::server::GattsEvent::Write {
                conn_id,
                trans_id,
                addr,
                handle,
                offset,
                need_rsp,
                is_prep,
                value,
            } => GattsEvent::Write {
                conn_id,
                trans_id,
                addr,
                handle,
                offset,
                need_rsp,
                is_prep,
                value: value.to_vec(),
            },
            gatt::server::GattsEvent::ExecWrite {
                conn_id,
                trans_id,
                addr,
                canceled,
            } => GattsEvent::ExecWrite {
                conn_id,
                trans_id,
                addr,
                canceled,
            },
            gatt::server::GattsEvent::Mtu { conn_id, mtu } => GattsEvent::Mtu { conn_id, mtu },
            gatt::server::GattsEvent::ServiceCreated {
                status,
                service_handle,
                ..
            } => GattsEvent::ServiceCreated {
                status,
                service_handle,
            },
            gatt::server::GattsEvent::CharacteristicAdded {
                status,
                attr_handle,
                service_handle,
                char_uuid,
            } => GattsEvent::CharacteristicAdded {
                status,
                attr_handle,
                service_handle,
                char_uuid,
            },
            gatt::server::GattsEvent::DescriptorAdded {
                status,
                attr_handle,
                service_handle,
                descr_uuid,
            } => GattsEvent::DescriptorAdded {
                status,
                attr_handle,
                service_handle,
                descr_uuid,
            },
            gatt::server::GattsEvent::ServiceStarted {
                status,
                service_handle,
            } => GattsEvent::ServiceStarted {
                status,
                service_handle,
            },
            gatt::server::GattsEvent::PeerConnected { conn_id, addr, .. } => {
                GattsEvent::PeerConnected { conn_id, addr }
            }
            gatt::server::GattsEvent::PeerDisconnected {
                conn_id,
                addr,
                reason,
            } => GattsEvent::PeerDisconnected {
                conn_id,
                addr,
                reason,
            },
            gatt::server::GattsEvent::Congest { conn_id, congested } => {
                GattsEvent::Congest { conn_id, congested }
            }
            _ => GattsEvent::Other,
        }
    }
}

impl GattsEvent {
    pub fn connection_event(&self) -> Option<ConnectionEvent> {
        match self {
            GattsEvent::PeerConnected { conn_id, addr } => Some(ConnectionEvent::Connected {
                conn_id: *conn_id,
                peer: PeerAddr(addr.addr()),
            }),
            GattsEvent::PeerDisconnected {
                conn_id,
                addr,
                reason,
            } => Some(ConnectionEvent::Disconnected {
                conn_id: *conn_id,
                peer: PeerAddr(addr.addr()),
                reason: *reason as u16,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GattsEventMessage(pub GattInterface, pub GattsEvent);
