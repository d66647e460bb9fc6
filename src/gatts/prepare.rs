//! Prepared (queued) writes, held per connection until the peer executes or
//! cancels them.

use std::{collections::HashMap, fmt};

use super::Handle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteRejection {
    /// Offset lies past the attribute's maximum length
    InvalidOffset,
    /// Value would grow past the attribute's maximum length
    InvalidLength,
}

impl fmt::Display for WriteRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteRejection::InvalidOffset => write!(f, "write offset out of range"),
            WriteRejection::InvalidLength => write!(f, "write exceeds attribute length"),
        }
    }
}

impl std::error::Error for WriteRejection {}

/// Checks that `len` bytes written at `offset` stay within `max_len`.
pub fn check_bounds(offset: u16, len: usize, max_len: usize) -> Result<(), WriteRejection> {
    let offset = offset as usize;
    if offset > max_len {
        return Err(WriteRejection::InvalidOffset);
    }
    if offset + len > max_len {
        return Err(WriteRejection::InvalidLength);
    }
    Ok(())
}

#[derive(Debug)]
struct PreparedValue {
    handle: Handle,
    value: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct PrepareQueue {
    queues: HashMap<u16, Vec<PreparedValue>>,
}

impl PrepareQueue {
    pub fn prepare(
        &mut self,
        conn_id: u16,
        handle: Handle,
        offset: u16,
        chunk: &[u8],
        max_len: usize,
    ) -> Result<(), WriteRejection> {
        check_bounds(offset, chunk.len(), max_len)?;

        let queue = self.queues.entry(conn_id).or_default();
        let index = match queue.iter().position(|prepared| prepared.handle == handle) {
            Some(index) => index,
            None => {
                queue.push(PreparedValue {
                    handle,
                    value: Vec::new(),
                });
                queue.len() - 1
            }
        };

        let prepared = &mut queue[index];
        let start = offset as usize;
        let end = start + chunk.len();
        if prepared.value.len() < end {
            prepared.value.resize(end, 0);
        }
        prepared.value[start..end].copy_from_slice(chunk);

        Ok(())
    }

    /// Takes every value queued on `conn_id`, in the order their handles were
    /// first prepared.
    pub fn execute(&mut self, conn_id: u16) -> Vec<(Handle, Vec<u8>)> {
        self.queues
            .remove(&conn_id)
            .unwrap_or_default()
            .into_iter()
            .map(|prepared| (prepared.handle, prepared.value))
            .collect()
    }

    pub fn cancel(&mut self, conn_id: u16) {
        self.queues.remove(&conn_id);
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_assemble_across_requests() {
        let mut queue = PrepareQueue::default();

        queue.prepare(1, 42, 0, &[0x01, 0x02], 4).unwrap();
        queue.prepare(1, 42, 2, &[0x03, 0x04], 4).unwrap();

        assert_eq!(queue.execute(1), vec![(42, vec![0x01, 0x02, 0x03, 0x04])]);
        assert!(queue.is_empty());
    }

    #[test]
    fn values_stay_with_their_connection() {
        let mut queue = PrepareQueue::default();

        queue.prepare(1, 42, 0, &[0xAA], 2).unwrap();
        queue.prepare(2, 42, 0, &[0xBB], 2).unwrap();
        queue.prepare(1, 50, 0, &[0xCC, 0xDD], 2).unwrap();

        queue.cancel(2);
        assert!(queue.execute(2).is_empty());
        assert_eq!(
            queue.execute(1),
            vec![(42, vec![0xAA]), (50, vec![0xCC, 0xDD])]
        );
    }

    #[test]
    fn overlapping_chunks_overwrite() {
        let mut queue = PrepareQueue::default();

        queue.prepare(1, 42, 0, &[0x01, 0x02, 0x03], 8).unwrap();
        queue.prepare(1, 42, 1, &[0xFF], 8).unwrap();

        assert_eq!(queue.execute(1), vec![(42, vec![0x01, 0xFF, 0x03])]);
    }

    #[test]
    fn writes_past_max_len_are_rejected() {
        let mut queue = PrepareQueue::default();

        assert_eq!(
            queue.prepare(1, 42, 3, &[0x01], 2),
            Err(WriteRejection::InvalidOffset)
        );
        assert_eq!(
            queue.prepare(1, 42, 1, &[0x01, 0x02], 2),
            Err(WriteRejection::InvalidLength)
        );
        assert_eq!(
            queue.prepare(1, 42, u16::MAX, &[0x01], 2),
            Err(WriteRejection::InvalidOffset)
        );
        assert!(queue.is_empty());

        assert_eq!(check_bounds(0, 2, 2), Ok(()));
        assert_eq!(check_bounds(2, 0, 2), Ok(()));
    }

    #[test]
    fn cancel_drops_queued_values() {
        let mut queue = PrepareQueue::default();

        queue.prepare(7, 42, 0, &[0x01], 1).unwrap();
        queue.cancel(7);

        assert!(queue.is_empty());
        assert!(queue.execute(7).is_empty());
    }
}
