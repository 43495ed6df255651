//! Boundary to the external voice transport.
//!
//! The transport itself (signaling handshake, encryption, UDP) is an
//! external collaborator; this module defines the narrow interface the
//! subsystem consumes: join/leave keyed by group and endpoint, a polled
//! readiness flag, an outbound Opus frame sink, an inbound per-source frame
//! stream, and the speaking indicator. Frames travel over explicit channels
//! so ordering and back-pressure stay visible to the engines instead of
//! being hidden behind callback registration.

use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use parley_types::AudioFrame;
use tokio::sync::{mpsc, watch};

use crate::error::VoiceError;

/// External voice transport, joined and left on behalf of the registry.
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    /// Joins `endpoint_id` within `group_id` and returns the channel-backed
    /// handle for the new connection. `want_recv` asks the transport to
    /// deliver inbound frames (required for recording).
    async fn join(
        &self,
        group_id: &str,
        endpoint_id: &str,
        want_recv: bool,
    ) -> Result<TransportHandle, VoiceError>;

    /// Leaves whatever endpoint is currently joined within `group_id`.
    async fn leave(&self, group_id: &str) -> Result<(), VoiceError>;
}

/// Handle to one joined voice endpoint, produced by [`VoiceTransport::join`].
#[derive(Debug)]
pub struct TransportHandle {
    ready: watch::Receiver<bool>,
    speaking: watch::Sender<bool>,
    outbound: mpsc::Sender<Bytes>,
    inbound: Mutex<Option<mpsc::Receiver<AudioFrame>>>,
}

impl TransportHandle {
    /// Builds a handle from its channel halves. Called by transport
    /// implementations; `inbound` is `None` when the join did not request
    /// receive.
    pub fn new(
        ready: watch::Receiver<bool>,
        speaking: watch::Sender<bool>,
        outbound: mpsc::Sender<Bytes>,
        inbound: Option<mpsc::Receiver<AudioFrame>>,
    ) -> Self {
        Self {
            ready,
            speaking,
            outbound,
            inbound: Mutex::new(inbound),
        }
    }

    /// Non-blocking readiness check.
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Toggles the transport-level speaking indicator. Setting the current
    /// value again is a no-op on the wire.
    pub fn set_speaking(&self, speaking: bool) {
        self.speaking.send_replace(speaking);
    }

    /// Sink for outbound Opus frames.
    pub fn outbound(&self) -> mpsc::Sender<Bytes> {
        self.outbound.clone()
    }

    /// Takes the inbound frame stream. Returns `None` after the first call,
    /// or when the join did not request receive.
    pub fn take_inbound(&self) -> Option<mpsc::Receiver<AudioFrame>> {
        match self.inbound.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}
