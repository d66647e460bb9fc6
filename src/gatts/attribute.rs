pub mod defaults;

use serde::{de::DeserializeOwned, Serialize};

/// Largest value any of the gamepad's dynamic attributes carries.
pub const MAX_ATTR_LEN: usize = 32;

pub type AttrBytes = heapless::Vec<u8, MAX_ATTR_LEN>;

pub trait Attribute: Send + Sync + 'static {
    fn get_bytes(&self) -> anyhow::Result<AttrBytes>;
    fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self>
    where
        Self: Sized;
}

/// Encodes a serde value with the wire layout GATT attributes use:
/// fields in declaration order, fixed-width little-endian integers.
pub fn encode<T: Serialize>(value: &T) -> anyhow::Result<AttrBytes> {
    let mut buffer = [0u8; MAX_ATTR_LEN];
    let len = bincode::serde::encode_into_slice(value, &mut buffer, bincode::config::legacy())
        .map_err(|err| {
            anyhow::anyhow!("Failed to serialize attribute value to bytes: {:?}", err)
        })?;

    AttrBytes::from_slice(&buffer[..len])
        .map_err(|_| anyhow::anyhow!("Attribute value of {} bytes does not fit", len))
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> anyhow::Result<T> {
    let (value, read): (T, usize) =
        bincode::serde::decode_from_slice(bytes, bincode::config::legacy()).map_err(|err| {
            anyhow::anyhow!("Failed to deserialize bytes to attribute value: {:?}", err)
        })?;

    if read != bytes.len() {
        return Err(anyhow::anyhow!(
            "Trailing bytes after attribute value: read {} of {}",
            read,
            bytes.len()
        ));
    }

    Ok(value)
}
