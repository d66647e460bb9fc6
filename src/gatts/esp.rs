use std::{
    collections::HashMap,
    mem::{discriminant, Discriminant},
    sync::{Arc, RwLock},
};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use enumset::EnumSet;
use esp_idf_svc::{
    bt::{
        ble::gatt::{
            server::{AppId, ConnectionId, EspGatts, TransferId},
            AutoResponse, GattCharacteristic, GattConnReason, GattDescriptor, GattId, GattInterface, GattResponse,
            GattServiceId, GattStatus, Permission, Property,
        },
        BdAddr, BtUuid,
    },
    sys::{self, esp},
};

use super::{
    characteristic::CharacteristicConfig,
    descriptor::DescriptorConfig,
    event::{GattsEvent, GattsEventMessage},
    prepare::{check_bounds, PrepareQueue, WriteRejection},
    GattServer, GattsEventHandler, Handle, Uuid16,
};
use crate::{
    ble::ExtBtDriver,
    config::{SecurityLevel, STACK_CONFIRM_TIMEOUT},
    gap::security::PairingPeer,
};
use esp_idf_svc as svc;

const DEFAULT_MTU: u16 = 23;

type GattsEventsMap = HashMap<Discriminant<GattsEvent>, Sender<GattsEventMessage>>;

fn read_permission(security: SecurityLevel) -> Permission {
    match security {
        SecurityLevel::Open => Permission::Read,
        SecurityLevel::Encrypted => Permission::ReadEncrypted,
    }
}

fn write_permission(security: SecurityLevel) -> Permission {
    match security {
        SecurityLevel::Open => Permission::Write,
        SecurityLevel::Encrypted => Permission::WriteEncrypted,
    }
}

impl From<&CharacteristicConfig> for GattCharacteristic {
    fn from(config: &CharacteristicConfig) -> Self {
        let mut permissions = EnumSet::new();
        let mut properties = EnumSet::new();

        if config.readable {
            permissions.insert(read_permission(config.security));
            properties.insert(Property::Read);
        }

        if config.writable {
            permissions.insert(write_permission(config.security));
            properties.insert(Property::Write);
        }

        if config.write_without_response {
            permissions.insert(write_permission(config.security));
            properties.insert(Property::WriteNoResponse);
        }

        if config.enable_notify {
            properties.insert(Property::Notify);
        }

        GattCharacteristic {
            uuid: BtUuid::uuid16(config.uuid.0),
            permissions,
            properties,
            max_len: config.value_max_len,
            auto_rsp: AutoResponse::ByApp,
        }
    }
}

impl From<&DescriptorConfig> for GattDescriptor {
    fn from(config: &DescriptorConfig) -> Self {
        let mut permissions = EnumSet::new();

        if config.readable {
            permissions.insert(read_permission(config.security));
        }

        if config.writable {
            permissions.insert(write_permission(config.security));
        }

        GattDescriptor {
            uuid: BtUuid::uuid16(config.uuid.0),
            permissions,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Connection {
    conn_id: ConnectionId,
    addr: BdAddr,
    mtu: u16,
}

/// Bluedroid GATT server backend. Answers reads and writes from its own
/// attribute store and tracks a single connection.
#[derive(Clone)]
pub struct EspGattServer(Arc<EspGattServerInner>);

pub struct EspGattServerInner {
    gatts: EspGatts<'static, svc::bt::Ble, ExtBtDriver>,
    security: SecurityLevel,
    interface: RwLock<Option<GattInterface>>,

    values: RwLock<HashMap<Handle, Vec<u8>>>,
    max_lens: RwLock<HashMap<Handle, usize>>,
    prepare_queue: RwLock<PrepareQueue>,
    connection: RwLock<Option<Connection>>,
    handler: RwLock<Option<Arc<dyn GattsEventHandler>>>,

    gatts_events: Arc<RwLock<GattsEventsMap>>,
}

impl EspGattServer {
    pub fn new(
        bt: ExtBtDriver,
        app_id: AppId,
        security: SecurityLevel,
        pairing: Arc<PairingPeer>,
    ) -> anyhow::Result<Self> {
        let gatts = EspGatts::new(bt)?;
        let server = Self(Arc::new(EspGattServerInner {
            gatts,
            security,
            interface: RwLock::new(None),
            values: RwLock::new(HashMap::new()),
            max_lens: RwLock::new(HashMap::new()),
            prepare_queue: RwLock::new(PrepareQueue::default()),
            connection: RwLock::new(None),
            handler: RwLock::new(None),
            gatts_events: Arc::new(RwLock::new(HashMap::new())),
        }));

        server.init_callback(pairing)?;
        server.configure_read_events()?;
        server.configure_write_events()?;
        server.configure_connection_events()?;
        server.register_app(app_id)?;

        Ok(server)
    }

    fn init_callback(&self, pairing: Arc<PairingPeer>) -> anyhow::Result<()> {
        let callback_inner_ref = Arc::downgrade(&self.0.gatts_events);
        self.0.gatts.subscribe(move |(interface, e)| {
            let Some(callback_map) = callback_inner_ref.upgrade() else {
                log::error!("Failed to upgrade Gatts events map");
                return;
            };

            let event = GattsEvent::from(e);
            log::debug!("Received event {:?}", (interface, &event));

            // Tracked before the queue hop, a pairing request can follow the
            // connect immediately
            if let Some(connection_event) = event.connection_event() {
                pairing.track(&connection_event);
            }

            let Ok(callback_map) = callback_map.read() else {
                log::error!("Failed to acquire read lock on Gatts events map");
                return;
            };

            let Some(sender) = callback_map.get(&discriminant(&event)) else {
                return;
            };

            sender
                .send(GattsEventMessage(interface, event))
                .unwrap_or_else(|err| {
                    log::error!("Failed to send event: {:?}", err);
                });
        })?;

        Ok(())
    }

    fn subscribe_events(
        &self,
        templates: &[GattsEvent],
        tx: Sender<GattsEventMessage>,
    ) -> anyhow::Result<()> {
        let mut gatts_events = self
            .0
            .gatts_events
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to write Gatts events map"))?;

        for template in templates {
            gatts_events.insert(discriminant(template), tx.clone());
        }

        Ok(())
    }

    fn spawn_worker(
        &self,
        name: &str,
        rx: Receiver<GattsEventMessage>,
        handle: fn(&EspGattServerInner, GattsEventMessage) -> anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        let server = Arc::downgrade(&self.0);
        let name = name.to_string();
        std::thread::Builder::new()
            .stack_size(8 * 1024)
            .spawn(move || {
                for event in rx.iter() {
                    let Some(server) = server.upgrade() else {
                        log::warn!("Gatt server dropped, exiting {} thread", name);
                        return;
                    };

                    if let Err(err) = handle(&server, event) {
                        log::error!("Failed to handle {} event: {:?}", name, err);
                    }
                }
            })?;

        Ok(())
    }

    fn configure_read_events(&self) -> anyhow::Result<()> {
        let (tx, rx) = bounded(1);
        self.subscribe_events(
            &[GattsEvent::Read {
                conn_id: 0,
                trans_id: 0,
                addr: BdAddr::from_bytes([0; 6]),
                handle: 0,
                offset: 0,
                is_long: false,
                need_rsp: true,
            }],
            tx,
        )?;

        self.spawn_worker("read", rx, EspGattServerInner::handle_read_event)
    }

    fn configure_write_events(&self) -> anyhow::Result<()> {
        let (tx, rx) = bounded(1);
        self.subscribe_events(
            &[
                GattsEvent::Write {
                    conn_id: 0,
                    trans_id: 0,
                    addr: BdAddr::from_bytes([0; 6]),
                    handle: 0,
                    offset: 0,
                    need_rsp: false,
                    is_prep: false,
                    value: vec![],
                },
                GattsEvent::ExecWrite {
                    conn_id: 0,
                    trans_id: 0,
                    addr: BdAddr::from_bytes([0; 6]),
                    canceled: false,
                },
            ],
            tx,
        )?;

        self.spawn_worker("write", rx, EspGattServerInner::handle_write_event)
    }

    // Unbounded so the stack task never waits on a tracker that is itself
    // waiting for a GAP confirmation.
    fn configure_connection_events(&self) -> anyhow::Result<()> {
        let (tx, rx) = unbounded();
        self.subscribe_events(
            &[
                GattsEvent::PeerConnected {
                    conn_id: 0,
                    addr: BdAddr::from_bytes([0; 6]),
                },
                GattsEvent::PeerDisconnected {
                    conn_id: 0,
                    addr: BdAddr::from_bytes([0; 6]),
                    reason: GattConnReason::Unknown,
                },
                GattsEvent::Mtu { conn_id: 0, mtu: 0 },
                GattsEvent::Congest {
                    conn_id: 0,
                    congested: false,
                },
            ],
            tx,
        )?;

        self.spawn_worker(
            "connection",
            rx,
            EspGattServerInner::handle_connection_event,
        )
    }

    fn register_app(&self, app_id: AppId) -> anyhow::Result<()> {
        let message = self.0.await_event(
            GattsEvent::ServiceRegistered {
                status: GattStatus::Busy,
                app_id: 0,
            },
            || {
                self.0.gatts.register_app(app_id)?;
                Ok(())
            },
        )?;

        match message {
            GattsEventMessage(interface, GattsEvent::ServiceRegistered { status, app_id: id }) => {
                if id != app_id {
                    return Err(anyhow::anyhow!("Received unexpected GATT app: {:?}", id));
                }
                if status != GattStatus::Ok {
                    return Err(anyhow::anyhow!("Failed to register: {:?}", status));
                }

                self.0
                    .interface
                    .write()
                    .map_err(|_| anyhow::anyhow!("Failed to write Gatt interface"))?
                    .replace(interface);

                log::info!("Registered GATT application {}", app_id);

                Ok(())
            }
            other => Err(anyhow::anyhow!("Received unexpected GATT event: {:?}", other)),
        }
    }
}

impl EspGattServerInner {
    fn interface(&self) -> anyhow::Result<GattInterface> {
        self.interface
            .read()
            .map_err(|_| anyhow::anyhow!("Failed to read Gatt interface"))?
            .ok_or(anyhow::anyhow!("Gatt interface is not set"))
    }

    fn connection(&self) -> anyhow::Result<Option<Connection>> {
        Ok(*self
            .connection
            .read()
            .map_err(|_| anyhow::anyhow!("Failed to read connection"))?)
    }

    fn await_event(
        &self,
        template: GattsEvent,
        action: impl FnOnce() -> anyhow::Result<()>,
    ) -> anyhow::Result<GattsEventMessage> {
        let (tx, rx) = bounded(1);
        let key = discriminant(&template);

        self.gatts_events
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to write Gatts events"))?
            .insert(key, tx);

        let result = action().and_then(|_| {
            rx.recv_timeout(STACK_CONFIRM_TIMEOUT)
                .map_err(|_| anyhow::anyhow!("Timed out waiting for {:?}", template))
        });

        self.gatts_events
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to write Gatts events"))?
            .remove(&key);

        result
    }

    fn send_response(
        &self,
        interface: GattInterface,
        conn_id: ConnectionId,
        trans_id: TransferId,
        status: GattStatus,
        response: Option<&GattResponse>,
    ) -> anyhow::Result<()> {
        self.gatts
            .send_response(interface, conn_id, trans_id, status, response)
            .map_err(|err| anyhow::anyhow!("Failed to send response: {:?}", err))
    }

    fn handle_read_event(&self, event: GattsEventMessage) -> anyhow::Result<()> {
        let GattsEventMessage(
            interface,
            GattsEvent::Read {
                conn_id,
                trans_id,
                handle,
                offset,
                need_rsp,
                ..
            },
        ) = event
        else {
            return Err(anyhow::anyhow!("Invalid event type for read event"));
        };

        if !need_rsp {
            return Ok(());
        }

        let mtu = self
            .connection()?
            .filter(|connection| connection.conn_id == conn_id)
            .map_or(DEFAULT_MTU, |connection| connection.mtu);

        let response = (|| {
            let values = self
                .values
                .read()
                .map_err(|_| anyhow::anyhow!("Failed to read attribute values"))?;
            let value = values
                .get(&handle)
                .ok_or(anyhow::anyhow!("No value for handle {}", handle))?;
            let chunk = value.get(offset as usize..).ok_or(anyhow::anyhow!(
                "Read offset {} past value of {} bytes",
                offset,
                value.len()
            ))?;
            let chunk = &chunk[..chunk.len().min(mtu as usize - 1)];

            let mut response = GattResponse::new();
            response
                .attr_handle(handle)
                .auth_req(0)
                .offset(offset)
                .value(chunk)?;

            Ok(response)
        })()
        .map_err(|err: anyhow::Error| {
            match self.send_response(interface, conn_id, trans_id, GattStatus::InvalidOffset, None)
            {
                Ok(_) => anyhow::anyhow!("Failed to answer read of {}: {:?}", handle, err),
                Err(send_err) => anyhow::anyhow!(
                    "Failed to answer read of {} ({:?}) and send error response ({:?})",
                    handle,
                    err,
                    send_err
                ),
            }
        })?;

        self.send_response(
            interface,
            conn_id,
            trans_id,
            GattStatus::Ok,
            Some(&response),
        )
    }

    fn store_written(&self, handle: Handle, value: Vec<u8>) -> anyhow::Result<()> {
        self.values
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to write attribute values"))?
            .insert(handle, value.clone());

        let handler = self
            .handler
            .read()
            .map_err(|_| anyhow::anyhow!("Failed to read event handler"))?
            .clone();

        if let Some(handler) = handler {
            handler.on_write(handle, &value);
        }

        Ok(())
    }

    fn max_len(&self, handle: Handle) -> anyhow::Result<usize> {
        self.max_lens
            .read()
            .map_err(|_| anyhow::anyhow!("Failed to read attribute lengths"))?
            .get(&handle)
            .copied()
            .ok_or(anyhow::anyhow!("Write to unknown handle {}", handle))
    }

    fn apply_write(
        &self,
        conn_id: ConnectionId,
        handle: Handle,
        offset: u16,
        is_prep: bool,
        value: &[u8],
    ) -> anyhow::Result<()> {
        let max_len = self.max_len(handle)?;

        if !is_prep {
            if offset != 0 {
                return Err(WriteRejection::InvalidOffset.into());
            }
            check_bounds(offset, value.len(), max_len)?;
            return self.store_written(handle, value.to_vec());
        }

        self.prepare_queue
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to acquire write lock on prepare queue"))?
            .prepare(conn_id, handle, offset, value, max_len)?;

        Ok(())
    }

    fn write_status(result: &anyhow::Result<()>) -> GattStatus {
        match result {
            Ok(()) => GattStatus::Ok,
            Err(err) => match err.downcast_ref::<WriteRejection>() {
                Some(WriteRejection::InvalidOffset) => GattStatus::InvalidOffset,
                Some(WriteRejection::InvalidLength) => GattStatus::InvalidAttrLen,
                None => GattStatus::Error,
            },
        }
    }

    fn handle_write_event(&self, event: GattsEventMessage) -> anyhow::Result<()> {
        match event {
            GattsEventMessage(
                interface,
                GattsEvent::Write {
                    conn_id,
                    trans_id,
                    handle,
                    offset,
                    need_rsp,
                    is_prep,
                    value,
                    ..
                },
            ) => {
                let result = self.apply_write(conn_id, handle, offset, is_prep, &value);

                if !need_rsp {
                    return result;
                }

                let mut response = GattResponse::new();
                response
                    .attr_handle(handle)
                    .auth_req(0)
                    .offset(offset)
                    .value(&value)?;

                self.send_response(
                    interface,
                    conn_id,
                    trans_id,
                    Self::write_status(&result),
                    Some(&response),
                )?;

                result
            }
            GattsEventMessage(
                interface,
                GattsEvent::ExecWrite {
                    conn_id,
                    trans_id,
                    canceled,
                    ..
                },
            ) => {
                let prepared = {
                    let mut queue = self.prepare_queue.write().map_err(|_| {
                        anyhow::anyhow!("Failed to acquire write lock on prepare queue")
                    })?;

                    if canceled {
                        queue.cancel(conn_id);
                        Vec::new()
                    } else {
                        queue.execute(conn_id)
                    }
                };

                let result = prepared
                    .into_iter()
                    .try_for_each(|(handle, value)| self.store_written(handle, value));

                self.send_response(
                    interface,
                    conn_id,
                    trans_id,
                    Self::write_status(&result),
                    None,
                )?;

                result
            }
            _ => Err(anyhow::anyhow!(
                "Invalid event type for write event: {:?}",
                event
            )),
        }
    }

    fn handle_connection_event(&self, event: GattsEventMessage) -> anyhow::Result<()> {
        let GattsEventMessage(_, event) = event;

        match &event {
            GattsEvent::PeerConnected { conn_id, addr } => {
                self.connection
                    .write()
                    .map_err(|_| anyhow::anyhow!("Failed to write connection"))?
                    .replace(Connection {
                        conn_id: *conn_id,
                        addr: *addr,
                        mtu: DEFAULT_MTU,
                    });

                if self.security == SecurityLevel::Encrypted {
                    let mut bda = addr.addr();
                    if let Err(err) = esp!(unsafe {
                        sys::esp_ble_set_encryption(
                            bda.as_mut_ptr(),
                            sys::esp_ble_sec_act_t_ESP_BLE_SEC_ENCRYPT,
                        )
                    }) {
                        log::warn!("Failed to request encryption with {:?}: {:?}", addr, err);
                    }
                }
            }
            GattsEvent::PeerDisconnected { conn_id, .. } => {
                self.connection
                    .write()
                    .map_err(|_| anyhow::anyhow!("Failed to write connection"))?
                    .take();
                self.prepare_queue
                    .write()
                    .map_err(|_| anyhow::anyhow!("Failed to clear prepare queue"))?
                    .cancel(*conn_id);
            }
            GattsEvent::Mtu { conn_id, mtu } => {
                if let Some(connection) = self
                    .connection
                    .write()
                    .map_err(|_| anyhow::anyhow!("Failed to write connection"))?
                    .as_mut()
                    .filter(|connection| connection.conn_id == *conn_id)
                {
                    connection.mtu = *mtu;
                    log::info!("MTU of {:?} is {}", connection.addr, mtu);
                }
                return Ok(());
            }
            GattsEvent::Congest { conn_id, congested } => {
                log::warn!("Connection {} congested: {}", conn_id, congested);
                return Ok(());
            }
            other => {
                return Err(anyhow::anyhow!(
                    "Invalid event type for connection event: {:?}",
                    other
                ))
            }
        }

        let Some(connection_event) = event.connection_event() else {
            return Ok(());
        };

        let handler = self
            .handler
            .read()
            .map_err(|_| anyhow::anyhow!("Failed to read event handler"))?
            .clone();

        match handler {
            Some(handler) => handler.on_connection_event(connection_event),
            None => log::warn!("No handler for {:?}", connection_event),
        }

        Ok(())
    }

    fn check_attribute_added(
        status: GattStatus,
        service: Handle,
        added_service: Handle,
        uuid: Uuid16,
        added_uuid: &BtUuid,
    ) -> anyhow::Result<()> {
        if *added_uuid != BtUuid::uuid16(uuid.0) {
            return Err(anyhow::anyhow!(
                "Received unexpected attribute UUID: {:?}",
                added_uuid
            ));
        }

        if added_service != service {
            return Err(anyhow::anyhow!(
                "Received unexpected GATT service handle: {:?}",
                added_service
            ));
        }

        if status != GattStatus::Ok {
            return Err(anyhow::anyhow!("Failed to add {:?}: {:?}", uuid, status));
        }

        Ok(())
    }

    fn register_value(&self, handle: Handle, value: &[u8], max_len: usize) -> anyhow::Result<()> {
        self.max_lens
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to write attribute lengths"))?
            .insert(handle, max_len);

        self.store_value(handle, value)
    }

    fn store_value(&self, handle: Handle, value: &[u8]) -> anyhow::Result<()> {
        self.values
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to write attribute values"))?
            .insert(handle, value.to_vec());

        Ok(())
    }
}

impl GattServer for EspGattServer {
    fn create_service(&self, uuid: Uuid16, num_handles: u16) -> anyhow::Result<Handle> {
        let interface = self.0.interface()?;
        let service_id = GattServiceId {
            id: GattId {
                uuid: BtUuid::uuid16(uuid.0),
                inst_id: 0,
            },
            is_primary: true,
        };

        let message = self.0.await_event(
            GattsEvent::ServiceCreated {
                status: GattStatus::Busy,
                service_handle: 0,
            },
            || {
                self.0
                    .gatts
                    .create_service(interface, &service_id, num_handles)?;
                Ok(())
            },
        )?;

        match message {
            GattsEventMessage(
                _,
                GattsEvent::ServiceCreated {
                    status,
                    service_handle,
                },
            ) => {
                if status != GattStatus::Ok {
                    return Err(anyhow::anyhow!("Failed to create service: {:?}", status));
                }
                Ok(service_handle)
            }
            other => Err(anyhow::anyhow!("Received unexpected GATT event: {:?}", other)),
        }
    }

    fn add_characteristic(
        &self,
        service: Handle,
        config: &CharacteristicConfig,
        value: &[u8],
    ) -> anyhow::Result<Handle> {
        let message = self.0.await_event(
            GattsEvent::CharacteristicAdded {
                status: GattStatus::Busy,
                attr_handle: 0,
                service_handle: 0,
                char_uuid: BtUuid::uuid16(0),
            },
            || {
                self.0.gatts.add_characteristic(service, &config.into(), &[])?;
                Ok(())
            },
        )?;

        match message {
            GattsEventMessage(
                _,
                GattsEvent::CharacteristicAdded {
                    status,
                    attr_handle,
                    service_handle,
                    char_uuid,
                },
            ) => {
                EspGattServerInner::check_attribute_added(
                    status,
                    service,
                    service_handle,
                    config.uuid,
                    &char_uuid,
                )?;
                self.0
                    .register_value(attr_handle, value, config.value_max_len)?;
                Ok(attr_handle)
            }
            other => Err(anyhow::anyhow!("Received unexpected GATT event: {:?}", other)),
        }
    }

    fn add_descriptor(
        &self,
        service: Handle,
        config: &DescriptorConfig,
        value: &[u8],
    ) -> anyhow::Result<Handle> {
        let message = self.0.await_event(
            GattsEvent::DescriptorAdded {
                status: GattStatus::Busy,
                attr_handle: 0,
                service_handle: 0,
                descr_uuid: BtUuid::uuid16(0),
            },
            || {
                self.0.gatts.add_descriptor(service, &config.into())?;
                Ok(())
            },
        )?;

        match message {
            GattsEventMessage(
                _,
                GattsEvent::DescriptorAdded {
                    status,
                    attr_handle,
                    service_handle,
                    descr_uuid,
                },
            ) => {
                EspGattServerInner::check_attribute_added(
                    status,
                    service,
                    service_handle,
                    config.uuid,
                    &descr_uuid,
                )?;
                self.0
                    .register_value(attr_handle, value, config.value_max_len)?;
                Ok(attr_handle)
            }
            other => Err(anyhow::anyhow!("Received unexpected GATT event: {:?}", other)),
        }
    }

    fn start_service(&self, service: Handle) -> anyhow::Result<()> {
        let message = self.0.await_event(
            GattsEvent::ServiceStarted {
                status: GattStatus::Busy,
                service_handle: 0,
            },
            || {
                self.0.gatts.start_service(service)?;
                Ok(())
            },
        )?;

        match message {
            GattsEventMessage(
                _,
                GattsEvent::ServiceStarted {
                    status,
                    service_handle,
                },
            ) if service_handle == service => {
                if status != GattStatus::Ok {
                    return Err(anyhow::anyhow!("Failed to start service: {:?}", status));
                }
                Ok(())
            }
            other => Err(anyhow::anyhow!("Received unexpected GATT event: {:?}", other)),
        }
    }

    fn set_value(&self, handle: Handle, value: &[u8]) -> anyhow::Result<()> {
        self.0.store_value(handle, value)
    }

    fn notify(&self, handle: Handle, value: &[u8]) -> anyhow::Result<()> {
        let connection = self
            .0
            .connection()?
            .ok_or(anyhow::anyhow!("No peer connected"))?;
        let interface = self.0.interface()?;

        let len = value.len().min(connection.mtu as usize - 3);
        self.0
            .gatts
            .notify(interface, connection.conn_id, handle, &value[..len])
            .map_err(|err| {
                anyhow::anyhow!(
                    "Failed to notify {} on connection {}: {:?}",
                    handle,
                    connection.conn_id,
                    err
                )
            })
    }

    fn subscribe(&self, handler: Arc<dyn GattsEventHandler>) -> anyhow::Result<()> {
        self.0
            .handler
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to write event handler"))?
            .replace(handler);

        Ok(())
    }
}
