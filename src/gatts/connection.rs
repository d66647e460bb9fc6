use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use super::{ConnectionEvent, PeerAddr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    NotConnected,
    Connected,
}

/// Connectivity flag shared between the BLE stack context and the polling loop.
#[derive(Debug, Default)]
pub struct ConnectionStatus(AtomicBool);

impl ConnectionStatus {
    pub fn state(&self) -> ConnectionState {
        if self.0.load(Ordering::Acquire) {
            ConnectionState::Connected
        } else {
            ConnectionState::NotConnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    fn set(&self, state: ConnectionState) -> ConnectionState {
        let previous = self
            .0
            .swap(state == ConnectionState::Connected, Ordering::AcqRel);

        if previous {
            ConnectionState::Connected
        } else {
            ConnectionState::NotConnected
        }
    }
}

/// What the tracker may ask of the advertising side. Both calls must be
/// idempotent and must not block on the stack.
pub trait AdvertisingControl: Send + Sync {
    fn restart_advertising(&self) -> anyhow::Result<()>;

    fn peer_connected(&self, _peer: PeerAddr) -> anyhow::Result<()> {
        Ok(())
    }
}

pub struct ConnectionTracker {
    status: Arc<ConnectionStatus>,
    advertising: Arc<dyn AdvertisingControl>,
}

impl ConnectionTracker {
    pub fn new(status: Arc<ConnectionStatus>, advertising: Arc<dyn AdvertisingControl>) -> Self {
        Self {
            status,
            advertising,
        }
    }

    pub fn handle(&self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Connected { conn_id, peer } => self.on_connect(conn_id, peer),
            ConnectionEvent::Disconnected {
                conn_id,
                peer,
                reason,
            } => self.on_disconnect(conn_id, peer, reason),
        }
    }

    pub fn on_connect(&self, conn_id: u16, peer: PeerAddr) {
        let previous = self.status.set(ConnectionState::Connected);
        if previous == ConnectionState::Connected {
            log::warn!("Peer {} connected while another link was up", peer);
        }

        log::info!("Peer {} connected (conn_id {})", peer, conn_id);

        if let Err(err) = self.advertising.peer_connected(peer) {
            log::warn!("Failed to request connection parameters: {:?}", err);
        }
    }

    pub fn on_disconnect(&self, conn_id: u16, peer: PeerAddr, reason: u16) {
        self.status.set(ConnectionState::NotConnected);

        log::info!(
            "Peer {} disconnected (conn_id {}, reason {:#06x}), restarting advertising",
            peer,
            conn_id,
            reason
        );

        if let Err(err) = self.advertising.restart_advertising() {
            log::error!("Failed to restart advertising: {:?}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[derive(Default)]
    struct CountingAdvertising {
        restarts: AtomicUsize,
        hints: AtomicUsize,
        fail: bool,
    }

    impl AdvertisingControl for CountingAdvertising {
        fn restart_advertising(&self) -> anyhow::Result<()> {
            self.restarts.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(anyhow::anyhow!("stack busy"));
            }
            Ok(())
        }

        fn peer_connected(&self, _peer: PeerAddr) -> anyhow::Result<()> {
            self.hints.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    const PEER: PeerAddr = PeerAddr([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);

    #[test]
    fn connect_and_disconnect_transition_state() {
        let status = Arc::new(ConnectionStatus::default());
        let advertising = Arc::new(CountingAdvertising::default());
        let tracker = ConnectionTracker::new(status.clone(), advertising.clone());

        assert_eq!(status.state(), ConnectionState::NotConnected);

        tracker.handle(ConnectionEvent::Connected {
            conn_id: 0,
            peer: PEER,
        });
        assert!(status.is_connected());
        assert_eq!(advertising.hints.load(Ordering::SeqCst), 1);
        assert_eq!(advertising.restarts.load(Ordering::SeqCst), 0);

        tracker.handle(ConnectionEvent::Disconnected {
            conn_id: 0,
            peer: PEER,
            reason: 0x13,
        });
        assert_eq!(status.state(), ConnectionState::NotConnected);
        assert_eq!(advertising.restarts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn every_disconnect_restarts_advertising() {
        let status = Arc::new(ConnectionStatus::default());
        let advertising = Arc::new(CountingAdvertising::default());
        let tracker = ConnectionTracker::new(status.clone(), advertising.clone());

        for _ in 0..3 {
            tracker.on_connect(1, PEER);
            tracker.on_disconnect(1, PEER, 0x08);
        }

        assert_eq!(advertising.restarts.load(Ordering::SeqCst), 3);
        assert!(!status.is_connected());
    }

    #[test]
    fn failed_restart_still_marks_disconnected() {
        let status = Arc::new(ConnectionStatus::default());
        let advertising = Arc::new(CountingAdvertising {
            fail: true,
            ..CountingAdvertising::default()
        });
        let tracker = ConnectionTracker::new(status.clone(), advertising);

        tracker.on_connect(0, PEER);
        tracker.on_disconnect(0, PEER, 0x13);

        assert!(!status.is_connected());
    }

    #[test]
    fn peer_address_formats_as_colon_separated_hex() {
        assert_eq!(PEER.to_string(), "aa:bb:cc:dd:ee:ff");
    }
}
