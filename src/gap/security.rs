use std::sync::RwLock;

use crate::gatts::{ConnectionEvent, PeerAddr};

/// Peer of the current link, updated from the stack's own callback context
/// so that pairing requests arriving right after connect can be answered.
#[derive(Debug, Default)]
pub struct PairingPeer(RwLock<Option<PeerAddr>>);

impl PairingPeer {
    pub fn track(&self, event: &ConnectionEvent) {
        let Ok(mut current) = self.0.write() else {
            log::error!("Failed to write pairing peer");
            return;
        };

        match *event {
            ConnectionEvent::Connected { peer, .. } => *current = Some(peer),
            // A late disconnect of an earlier link must not forget the new peer
            ConnectionEvent::Disconnected { peer, .. } if *current == Some(peer) => {
                *current = None
            }
            ConnectionEvent::Disconnected { .. } => {}
        }
    }

    pub fn current(&self) -> Option<PeerAddr> {
        self.0.read().ok().and_then(|current| *current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIRST: PeerAddr = PeerAddr([0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
    const SECOND: PeerAddr = PeerAddr([0xA1, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6]);

    fn connected(peer: PeerAddr) -> ConnectionEvent {
        ConnectionEvent::Connected { conn_id: 0, peer }
    }

    fn disconnected(peer: PeerAddr) -> ConnectionEvent {
        ConnectionEvent::Disconnected {
            conn_id: 0,
            peer,
            reason: 0x13,
        }
    }

    #[test]
    fn follows_the_connected_peer() {
        let pairing = PairingPeer::default();
        assert_eq!(pairing.current(), None);

        pairing.track(&connected(FIRST));
        assert_eq!(pairing.current(), Some(FIRST));

        pairing.track(&disconnected(FIRST));
        assert_eq!(pairing.current(), None);
    }

    #[test]
    fn stale_disconnect_keeps_new_peer() {
        let pairing = PairingPeer::default();

        pairing.track(&connected(FIRST));
        pairing.track(&connected(SECOND));
        pairing.track(&disconnected(FIRST));

        assert_eq!(pairing.current(), Some(SECOND));
    }
}
