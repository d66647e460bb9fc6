use std::{marker::PhantomData, sync::Arc};

use crate::config::SecurityLevel;

use super::{attribute::Attribute, uuid, GattServer, Handle, Uuid16};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorConfig {
    pub uuid: Uuid16,
    pub value_max_len: usize,

    pub readable: bool,
    pub writable: bool,

    pub security: SecurityLevel,
}

impl DescriptorConfig {
    pub fn client_configuration(security: SecurityLevel) -> Self {
        Self {
            uuid: uuid::CLIENT_CHARACTERISTIC_CONFIGURATION,
            value_max_len: 2,
            readable: true,
            writable: true,
            security,
        }
    }

    pub fn report_reference(security: SecurityLevel) -> Self {
        Self {
            uuid: uuid::REPORT_REFERENCE,
            value_max_len: 2,
            readable: true,
            writable: false,
            security,
        }
    }
}

pub struct Descriptor<T: Attribute> {
    handle: Handle,
    _p: PhantomData<T>,
}

impl<T: Attribute> Descriptor<T> {
    pub fn register(
        server: &Arc<dyn GattServer>,
        service_handle: Handle,
        config: DescriptorConfig,
        value: &T,
    ) -> anyhow::Result<Self> {
        let bytes = value.get_bytes()?;
        let handle = server
            .add_descriptor(service_handle, &config, &bytes)
            .map_err(|err| {
                anyhow::anyhow!(
                    "Failed to register GATT descriptor {:?}: {:?}",
                    config.uuid,
                    err
                )
            })?;

        log::debug!("Descriptor {:?} registered at handle {}", config.uuid, handle);

        Ok(Self {
            handle,
            _p: PhantomData,
        })
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }
}
