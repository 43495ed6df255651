#![allow(dead_code)]

//! Shared mock transport for integration tests.

use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use parley_types::AudioFrame;
use parley_voice::{TransportHandle, VoiceError, VoiceTransport};
use tokio::sync::{mpsc, watch};

/// Channel-backed transport that records join/leave calls and exposes the
/// far side of the most recent handle's channels.
pub struct MockTransport {
    ready: bool,
    pub joins: Mutex<Vec<(String, String, bool)>>,
    pub leaves: Mutex<Vec<String>>,
    inbound_tx: Mutex<Option<mpsc::Sender<AudioFrame>>>,
    outbound_rx: Mutex<Option<mpsc::Receiver<Bytes>>>,
    speaking_rx: Mutex<Option<watch::Receiver<bool>>>,
}

impl MockTransport {
    pub fn new(ready: bool) -> Self {
        Self {
            ready,
            joins: Mutex::new(Vec::new()),
            leaves: Mutex::new(Vec::new()),
            inbound_tx: Mutex::new(None),
            outbound_rx: Mutex::new(None),
            speaking_rx: Mutex::new(None),
        }
    }

    /// Current value of the speaking indicator for the most recent join.
    pub fn is_speaking(&self) -> bool {
        self.speaking_rx
            .lock()
            .expect("lock")
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or(false)
    }

    /// Sender feeding the inbound channel of the most recent join.
    pub fn inbound_sender(&self) -> mpsc::Sender<AudioFrame> {
        self.inbound_tx
            .lock()
            .expect("lock")
            .clone()
            .expect("no receive-enabled join yet")
    }

    /// Receiver draining the outbound channel of the most recent join.
    pub fn take_outbound(&self) -> mpsc::Receiver<Bytes> {
        self.outbound_rx
            .lock()
            .expect("lock")
            .take()
            .expect("no join yet")
    }

    pub fn join_count(&self) -> usize {
        self.joins.lock().expect("lock").len()
    }

    pub fn leave_count(&self) -> usize {
        self.leaves.lock().expect("lock").len()
    }
}

#[async_trait]
impl VoiceTransport for MockTransport {
    async fn join(
        &self,
        group_id: &str,
        endpoint_id: &str,
        want_recv: bool,
    ) -> Result<TransportHandle, VoiceError> {
        self.joins.lock().expect("lock").push((
            group_id.to_string(),
            endpoint_id.to_string(),
            want_recv,
        ));

        let (_ready_tx, ready_rx) = watch::channel(self.ready);
        let (speaking_tx, speaking_rx) = watch::channel(false);
        *self.speaking_rx.lock().expect("lock") = Some(speaking_rx);
        let (outbound_tx, outbound_rx) = mpsc::channel(256);
        *self.outbound_rx.lock().expect("lock") = Some(outbound_rx);

        let inbound_rx = if want_recv {
            let (inbound_tx, inbound_rx) = mpsc::channel(256);
            *self.inbound_tx.lock().expect("lock") = Some(inbound_tx);
            Some(inbound_rx)
        } else {
            None
        };

        Ok(TransportHandle::new(
            ready_rx,
            speaking_tx,
            outbound_tx,
            inbound_rx,
        ))
    }

    async fn leave(&self, group_id: &str) -> Result<(), VoiceError> {
        self.leaves.lock().expect("lock").push(group_id.to_string());
        Ok(())
    }
}
