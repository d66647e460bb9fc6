use std::{marker::PhantomData, sync::Arc};

use crate::config::SecurityLevel;

use super::{
    attribute::{AttrBytes, Attribute},
    descriptor::{Descriptor, DescriptorConfig},
    GattServer, Handle, Uuid16,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicConfig {
    pub uuid: Uuid16,
    pub value_max_len: usize,

    pub readable: bool,
    pub writable: bool,
    pub write_without_response: bool,

    // Notify-capable characteristics get a CCCD registered right after them
    pub enable_notify: bool,

    pub security: SecurityLevel,
}

impl CharacteristicConfig {
    pub fn read_only(uuid: Uuid16, value_max_len: usize, security: SecurityLevel) -> Self {
        Self {
            uuid,
            value_max_len,
            readable: true,
            writable: false,
            write_without_response: false,
            enable_notify: false,
            security,
        }
    }
}

/// Typed handle to a registered characteristic.
pub struct Characteristic<T: Attribute> {
    server: Arc<dyn GattServer>,
    service_handle: Handle,
    handle: Handle,
    config: CharacteristicConfig,
    _p: PhantomData<T>,
}

impl<T: Attribute> Characteristic<T> {
    pub fn register(
        server: &Arc<dyn GattServer>,
        service_handle: Handle,
        config: CharacteristicConfig,
        value: &T,
    ) -> anyhow::Result<Self> {
        let bytes = value.get_bytes()?;
        let handle = server
            .add_characteristic(service_handle, &config, &bytes)
            .map_err(|err| {
                anyhow::anyhow!(
                    "Failed to register GATT characteristic {:?}: {:?}",
                    config.uuid,
                    err
                )
            })?;

        log::debug!("Characteristic {:?} registered at handle {}", config.uuid, handle);

        Ok(Self {
            server: server.clone(),
            service_handle,
            handle,
            config,
            _p: PhantomData,
        })
    }

    pub fn register_descriptor<D: Attribute>(
        &self,
        config: DescriptorConfig,
        value: &D,
    ) -> anyhow::Result<Descriptor<D>> {
        Descriptor::register(&self.server, self.service_handle, config, value)
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Stores `value` as the characteristic value and, if `notify` is set,
    /// pushes it to the peer. The stored value is kept even if the push fails.
    pub fn update_value(&self, value: &T, notify: bool) -> anyhow::Result<AttrBytes> {
        let bytes = value.get_bytes()?;

        self.server.set_value(self.handle, &bytes).map_err(|err| {
            anyhow::anyhow!(
                "Failed to store value of characteristic {:?}: {:?}",
                self.config.uuid,
                err
            )
        })?;

        if notify && self.config.enable_notify {
            self.server.notify(self.handle, &bytes).map_err(|err| {
                anyhow::anyhow!(
                    "Failed to notify characteristic {:?}: {:?}",
                    self.config.uuid,
                    err
                )
            })?;
        }

        Ok(bytes)
    }
}
