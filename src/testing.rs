//! Recording in-memory backend for host tests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::{
    config::ConnParams,
    gap::{AdvParams, Gap},
    gatts::{
        characteristic::CharacteristicConfig, descriptor::DescriptorConfig, ConnectionEvent,
        GattServer, GattsEventHandler, Handle, PeerAddr, Uuid16,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockAttributeKind {
    Characteristic(CharacteristicConfig),
    Descriptor {
        config: DescriptorConfig,
        characteristic: Handle,
    },
}

#[derive(Debug, Clone)]
pub struct MockAttribute {
    pub service: Handle,
    pub handle: Handle,
    pub uuid: Uuid16,
    pub kind: MockAttributeKind,
}

#[derive(Debug, Clone)]
pub struct MockService {
    pub uuid: Uuid16,
    pub handle: Handle,
    pub num_handles: u16,
    pub started: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    CreateService(Uuid16),
    AddCharacteristic(Uuid16),
    StartAdvertising,
    Notify,
}

#[derive(Default)]
struct MockState {
    next_handle: Handle,
    services: Vec<MockService>,
    attributes: Vec<MockAttribute>,
    values: HashMap<Handle, Vec<u8>>,
    notifications: Vec<(Handle, Vec<u8>)>,
    handler: Option<Arc<dyn GattsEventHandler>>,
    conn_id: u16,

    device_name: Option<String>,
    adv_data: Vec<u8>,
    scan_rsp: Vec<u8>,
    advertising_starts: usize,
    last_adv_params: Option<Option<AdvParams>>,
    conn_param_updates: Vec<(PeerAddr, ConnParams)>,

    failures: Vec<Failure>,
}

/// Implements both stack seams and records every call.
#[derive(Default)]
pub struct MockBle {
    state: Mutex<MockState>,
}

impl MockBle {
    pub fn failing(failure: Failure) -> Self {
        let mock = Self::default();
        mock.fail(failure);
        mock
    }

    pub fn fail(&self, failure: Failure) {
        self.state.lock().unwrap().failures.push(failure);
    }

    fn check(&self, failure: Failure) -> anyhow::Result<()> {
        if self.state.lock().unwrap().failures.contains(&failure) {
            return Err(anyhow::anyhow!("Injected failure {:?}", failure));
        }
        Ok(())
    }

    fn handler(&self) -> Arc<dyn GattsEventHandler> {
        self.state
            .lock()
            .unwrap()
            .handler
            .clone()
            .expect("no handler subscribed")
    }

    /// Delivers a connect event the way the stack would, outside any lock.
    pub fn connect(&self, peer: PeerAddr) {
        let conn_id = {
            let mut state = self.state.lock().unwrap();
            state.conn_id += 1;
            state.conn_id
        };
        self.handler()
            .on_connection_event(ConnectionEvent::Connected { conn_id, peer });
    }

    pub fn disconnect(&self, peer: PeerAddr, reason: u16) {
        let conn_id = self.state.lock().unwrap().conn_id;
        self.handler()
            .on_connection_event(ConnectionEvent::Disconnected {
                conn_id,
                peer,
                reason,
            });
    }

    /// Simulates a peer write: stores the value then hands it to the handler.
    pub fn write(&self, handle: Handle, value: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .values
            .insert(handle, value.to_vec());
        self.handler().on_write(handle, value);
    }

    pub fn services(&self) -> Vec<MockService> {
        self.state.lock().unwrap().services.clone()
    }

    pub fn attributes(&self) -> Vec<MockAttribute> {
        self.state.lock().unwrap().attributes.clone()
    }

    pub fn find(&self, uuid: Uuid16) -> Option<MockAttribute> {
        self.attributes().into_iter().find(|attr| attr.uuid == uuid)
    }

    pub fn descriptors_of(&self, characteristic: Handle) -> Vec<MockAttribute> {
        self.attributes()
            .into_iter()
            .filter(|attr| {
                matches!(
                    attr.kind,
                    MockAttributeKind::Descriptor { characteristic: owner, .. } if owner == characteristic
                )
            })
            .collect()
    }

    pub fn value(&self, handle: Handle) -> Option<Vec<u8>> {
        self.state.lock().unwrap().values.get(&handle).cloned()
    }

    pub fn notifications(&self) -> Vec<(Handle, Vec<u8>)> {
        self.state.lock().unwrap().notifications.clone()
    }

    pub fn device_name(&self) -> Option<String> {
        self.state.lock().unwrap().device_name.clone()
    }

    pub fn adv_data(&self) -> Vec<u8> {
        self.state.lock().unwrap().adv_data.clone()
    }

    pub fn scan_rsp_data(&self) -> Vec<u8> {
        self.state.lock().unwrap().scan_rsp.clone()
    }

    pub fn advertising_starts(&self) -> usize {
        self.state.lock().unwrap().advertising_starts
    }

    pub fn last_adv_params(&self) -> Option<Option<AdvParams>> {
        self.state.lock().unwrap().last_adv_params
    }

    pub fn conn_param_updates(&self) -> Vec<(PeerAddr, ConnParams)> {
        self.state.lock().unwrap().conn_param_updates.clone()
    }

    fn allocate(state: &mut MockState) -> Handle {
        if state.next_handle == 0 {
            state.next_handle = 40;
        }
        let handle = state.next_handle;
        state.next_handle += 1;
        handle
    }
}

impl GattServer for MockBle {
    fn create_service(&self, uuid: Uuid16, num_handles: u16) -> anyhow::Result<Handle> {
        self.check(Failure::CreateService(uuid))?;

        let mut state = self.state.lock().unwrap();
        let handle = Self::allocate(&mut state);
        state.services.push(MockService {
            uuid,
            handle,
            num_handles,
            started: false,
        });
        Ok(handle)
    }

    fn add_characteristic(
        &self,
        service: Handle,
        config: &CharacteristicConfig,
        value: &[u8],
    ) -> anyhow::Result<Handle> {
        self.check(Failure::AddCharacteristic(config.uuid))?;

        let mut state = self.state.lock().unwrap();
        if !state.services.iter().any(|s| s.handle == service) {
            return Err(anyhow::anyhow!("Unknown service handle {}", service));
        }

        // Declaration handle, then value handle
        Self::allocate(&mut state);
        let handle = Self::allocate(&mut state);
        state.attributes.push(MockAttribute {
            service,
            handle,
            uuid: config.uuid,
            kind: MockAttributeKind::Characteristic(config.clone()),
        });
        state.values.insert(handle, value.to_vec());
        Ok(handle)
    }

    fn add_descriptor(
        &self,
        service: Handle,
        config: &DescriptorConfig,
        value: &[u8],
    ) -> anyhow::Result<Handle> {
        let mut state = self.state.lock().unwrap();
        let characteristic = state
            .attributes
            .iter()
            .rev()
            .find(|attr| {
                attr.service == service
                    && matches!(attr.kind, MockAttributeKind::Characteristic(_))
            })
            .map(|attr| attr.handle)
            .ok_or_else(|| anyhow::anyhow!("Descriptor without characteristic"))?;

        let handle = Self::allocate(&mut state);
        state.attributes.push(MockAttribute {
            service,
            handle,
            uuid: config.uuid,
            kind: MockAttributeKind::Descriptor {
                config: config.clone(),
                characteristic,
            },
        });
        state.values.insert(handle, value.to_vec());
        Ok(handle)
    }

    fn start_service(&self, service: Handle) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        let service = state
            .services
            .iter_mut()
            .find(|s| s.handle == service)
            .ok_or_else(|| anyhow::anyhow!("Unknown service handle {}", service))?;
        service.started = true;
        Ok(())
    }

    fn set_value(&self, handle: Handle, value: &[u8]) -> anyhow::Result<()> {
        self.state
            .lock()
            .unwrap()
            .values
            .insert(handle, value.to_vec());
        Ok(())
    }

    fn notify(&self, handle: Handle, value: &[u8]) -> anyhow::Result<()> {
        self.check(Failure::Notify)?;
        self.state
            .lock()
            .unwrap()
            .notifications
            .push((handle, value.to_vec()));
        Ok(())
    }

    fn subscribe(&self, handler: Arc<dyn GattsEventHandler>) -> anyhow::Result<()> {
        self.state.lock().unwrap().handler = Some(handler);
        Ok(())
    }
}

impl Gap for MockBle {
    fn set_device_name(&self, name: &str) -> anyhow::Result<()> {
        self.state.lock().unwrap().device_name = Some(name.to_string());
        Ok(())
    }

    fn set_adv_data(&self, data: &[u8]) -> anyhow::Result<()> {
        self.state.lock().unwrap().adv_data = data.to_vec();
        Ok(())
    }

    fn set_scan_rsp_data(&self, data: &[u8]) -> anyhow::Result<()> {
        self.state.lock().unwrap().scan_rsp = data.to_vec();
        Ok(())
    }

    fn start_advertising(&self, params: Option<&AdvParams>) -> anyhow::Result<()> {
        self.check(Failure::StartAdvertising)?;

        let mut state = self.state.lock().unwrap();
        state.advertising_starts += 1;
        state.last_adv_params = Some(params.copied());
        Ok(())
    }

    fn update_conn_params(&self, peer: PeerAddr, params: &ConnParams) -> anyhow::Result<()> {
        self.state
            .lock()
            .unwrap()
            .conn_param_updates
            .push((peer, *params));
        Ok(())
    }
}
