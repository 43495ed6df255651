//! Session registry: at most one active voice session per group.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::VoiceConfig;
use crate::error::VoiceError;
use crate::session::VoiceSession;
use crate::transport::VoiceTransport;

/// Owns every active [`VoiceSession`], keyed by group identifier.
///
/// The map lock is scoped to mapping mutation only; connect and disconnect
/// calls run outside it, so one group's ready-wait cannot block joins or
/// leaves in other groups.
pub struct VoiceSessionRegistry {
    transport: Arc<dyn VoiceTransport>,
    config: VoiceConfig,
    sessions: RwLock<HashMap<String, Arc<VoiceSession>>>,
}

impl VoiceSessionRegistry {
    pub fn new(transport: Arc<dyn VoiceTransport>, config: VoiceConfig) -> Self {
        Self {
            transport,
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Returns a ready session for `(group_id, endpoint_id)`.
    ///
    /// Idempotent: an existing ready session on the same endpoint is
    /// returned unchanged without a second transport-level connect. A
    /// session on a different endpoint (or one that lost readiness) is left
    /// first, then replaced. If two joins for the same group race, the later
    /// connect wins.
    pub async fn join(
        &self,
        group_id: &str,
        endpoint_id: &str,
        want_recv: bool,
    ) -> Result<Arc<VoiceSession>, VoiceError> {
        let stale = {
            let mut sessions = self.sessions.write().await;
            if let Some(existing) = sessions.get(group_id) {
                if existing.endpoint_id() == endpoint_id && existing.is_ready().await {
                    return Ok(Arc::clone(existing));
                }
                sessions.remove(group_id)
            } else {
                None
            }
        };
        if let Some(stale) = stale {
            if let Err(err) = stale.disconnect().await {
                warn!(group = group_id, error = %err, "failed to leave stale voice session");
            }
        }

        let session = Arc::new(VoiceSession::new(
            Arc::clone(&self.transport),
            group_id,
            endpoint_id,
            want_recv,
            self.config.clone(),
        ));
        session.connect().await?;
        info!(group = group_id, endpoint = endpoint_id, "joined voice channel");

        self.sessions
            .write()
            .await
            .insert(group_id.to_string(), Arc::clone(&session));
        Ok(session)
    }

    /// Disconnects and removes the session for `group_id`.
    pub async fn leave(&self, group_id: &str) -> Result<(), VoiceError> {
        let session = self
            .sessions
            .write()
            .await
            .remove(group_id)
            .ok_or_else(|| VoiceError::NotConnected(group_id.to_string()))?;
        session.disconnect().await
    }

    /// The tracked session for `group_id`, if any.
    pub async fn get(&self, group_id: &str) -> Option<Arc<VoiceSession>> {
        self.sessions.read().await.get(group_id).cloned()
    }

    /// Whether a ready session exists for `group_id`.
    pub async fn is_connected(&self, group_id: &str) -> bool {
        match self.get(group_id).await {
            Some(session) => session.is_ready().await,
            None => false,
        }
    }

    /// Disconnects and removes every tracked session. Used at process
    /// shutdown; individual disconnect failures are logged, not propagated.
    pub async fn close_all(&self) {
        let sessions: Vec<_> = self.sessions.write().await.drain().collect();
        for (group, session) in sessions {
            if let Err(err) = session.disconnect().await {
                warn!(group = %group, error = %err, "failed to disconnect voice session");
            }
        }
    }
}
