//! A single joined voice endpoint.

use std::sync::Arc;

use bytes::Bytes;
use parley_types::AudioFrame;
use tokio::sync::{mpsc, RwLock};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::VoiceConfig;
use crate::error::VoiceError;
use crate::transport::{TransportHandle, VoiceTransport};

/// Connection lifecycle of a [`VoiceSession`].
///
/// `Connecting` is entered by [`VoiceSession::connect`] and exits only to
/// `Ready` or back to `Disconnected` on timeout or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
}

/// One joined voice endpoint, owned by the registry until released.
pub struct VoiceSession {
    group_id: String,
    endpoint_id: String,
    want_recv: bool,
    config: VoiceConfig,
    transport: Arc<dyn VoiceTransport>,
    state: RwLock<ConnectionState>,
    handle: RwLock<Option<TransportHandle>>,
}

impl VoiceSession {
    pub fn new(
        transport: Arc<dyn VoiceTransport>,
        group_id: impl Into<String>,
        endpoint_id: impl Into<String>,
        want_recv: bool,
        config: VoiceConfig,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            endpoint_id: endpoint_id.into(),
            want_recv,
            config,
            transport,
            state: RwLock::new(ConnectionState::Disconnected),
            handle: RwLock::new(None),
        }
    }

    /// Joins the endpoint and polls the transport readiness flag at the
    /// configured interval (100 ms) until ready. Past the configured ceiling
    /// (30 s) the join is torn down again and the call fails with
    /// [`VoiceError::ConnectTimeout`]. Returns immediately when already
    /// ready.
    pub async fn connect(&self) -> Result<(), VoiceError> {
        if *self.state.read().await == ConnectionState::Ready {
            return Ok(());
        }
        *self.state.write().await = ConnectionState::Connecting;

        let handle = match self
            .transport
            .join(&self.group_id, &self.endpoint_id, self.want_recv)
            .await
        {
            Ok(handle) => handle,
            Err(err) => {
                *self.state.write().await = ConnectionState::Disconnected;
                return Err(err);
            }
        };

        let timeout = self.config.connect_timeout();
        let deadline = Instant::now() + timeout;
        let mut ticker = tokio::time::interval(self.config.ready_poll_interval());
        loop {
            ticker.tick().await;
            if handle.is_ready() {
                break;
            }
            if Instant::now() >= deadline {
                *self.state.write().await = ConnectionState::Disconnected;
                if let Err(err) = self.transport.leave(&self.group_id).await {
                    warn!(group = %self.group_id, error = %err, "leave after connect timeout failed");
                }
                return Err(VoiceError::ConnectTimeout(timeout));
            }
        }

        *self.handle.write().await = Some(handle);
        *self.state.write().await = ConnectionState::Ready;
        debug!(group = %self.group_id, endpoint = %self.endpoint_id, "voice session ready");
        Ok(())
    }

    /// Leaves the endpoint. Idempotent: a no-op when not connected.
    pub async fn disconnect(&self) -> Result<(), VoiceError> {
        {
            let mut state = self.state.write().await;
            if *state == ConnectionState::Disconnected {
                return Ok(());
            }
            self.transport.leave(&self.group_id).await?;
            *state = ConnectionState::Disconnected;
        }
        self.handle.write().await.take();
        debug!(group = %self.group_id, "voice session disconnected");
        Ok(())
    }

    /// Non-blocking check: the session reached `Ready` and the transport
    /// still reports ready.
    pub async fn is_ready(&self) -> bool {
        if *self.state.read().await != ConnectionState::Ready {
            return false;
        }
        match self.handle.read().await.as_ref() {
            Some(handle) => handle.is_ready(),
            None => false,
        }
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn endpoint_id(&self) -> &str {
        &self.endpoint_id
    }

    /// Sink for outbound Opus frames.
    pub async fn outbound_sink(&self) -> Result<mpsc::Sender<Bytes>, VoiceError> {
        self.handle
            .read()
            .await
            .as_ref()
            .map(TransportHandle::outbound)
            .ok_or_else(|| VoiceError::NotConnected(self.group_id.clone()))
    }

    /// Takes the inbound frame stream; available once per connect, and only
    /// when the session was joined with receive enabled.
    pub async fn take_inbound(&self) -> Result<mpsc::Receiver<AudioFrame>, VoiceError> {
        let guard = self.handle.read().await;
        let handle = guard
            .as_ref()
            .ok_or_else(|| VoiceError::NotConnected(self.group_id.clone()))?;
        handle.take_inbound().ok_or_else(|| {
            VoiceError::Transport(
                "inbound frame stream unavailable (join without receive, or already taken)"
                    .to_string(),
            )
        })
    }

    /// Toggles the transport-level speaking indicator.
    pub async fn set_speaking(&self, speaking: bool) -> Result<(), VoiceError> {
        let guard = self.handle.read().await;
        let handle = guard
            .as_ref()
            .ok_or_else(|| VoiceError::NotConnected(self.group_id.clone()))?;
        handle.set_speaking(speaking);
        Ok(())
    }
}
