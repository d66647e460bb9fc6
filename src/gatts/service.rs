use std::sync::Arc;

use super::{
    attribute::Attribute,
    characteristic::{Characteristic, CharacteristicConfig},
    GattServer, Handle, Uuid16,
};

pub struct Service {
    server: Arc<dyn GattServer>,
    uuid: Uuid16,
    handle: Handle,
}

impl Service {
    pub fn new(server: &Arc<dyn GattServer>, uuid: Uuid16, num_handles: u16) -> anyhow::Result<Self> {
        let handle = server.create_service(uuid, num_handles).map_err(|err| {
            anyhow::anyhow!("Failed to create GATT service {:?}: {:?}", uuid, err)
        })?;

        log::debug!("Service {:?} created at handle {}", uuid, handle);

        Ok(Self {
            server: server.clone(),
            uuid,
            handle,
        })
    }

    pub fn register_characteristic<T: Attribute>(
        &self,
        config: CharacteristicConfig,
        value: &T,
    ) -> anyhow::Result<Characteristic<T>> {
        Characteristic::register(&self.server, self.handle, config, value)
    }

    /// Registers a characteristic whose value never changes after start,
    /// such as the report map.
    pub fn register_static_characteristic(
        &self,
        config: CharacteristicConfig,
        value: &[u8],
    ) -> anyhow::Result<Handle> {
        if value.len() > config.value_max_len {
            return Err(anyhow::anyhow!(
                "Value of {:?} is {} bytes, limit is {}",
                config.uuid,
                value.len(),
                config.value_max_len
            ));
        }

        self.server
            .add_characteristic(self.handle, &config, value)
            .map_err(|err| {
                anyhow::anyhow!(
                    "Failed to register GATT characteristic {:?}: {:?}",
                    config.uuid,
                    err
                )
            })
    }

    pub fn start(&self) -> anyhow::Result<()> {
        self.server.start_service(self.handle).map_err(|err| {
            anyhow::anyhow!("Failed to start GATT service {:?}: {:?}", self.uuid, err)
        })?;

        log::info!("Service {:?} started", self.uuid);

        Ok(())
    }
}
