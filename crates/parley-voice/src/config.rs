use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_transcoder_binary() -> String {
    "ffmpeg".to_string()
}

fn default_bitrate() -> String {
    "128k".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_ready_poll_interval_ms() -> u64 {
    100
}

fn default_frame_interval_ms() -> u64 {
    20
}

fn default_drain_timeout_secs() -> u64 {
    5
}

/// Tunables for the voice subsystem.
///
/// The timing fields are a hard contract, not an implementation detail:
/// connect readiness is polled every `ready_poll_interval_ms` for at most
/// `connect_timeout_secs`; playback delivers one frame per
/// `frame_interval_ms`; shutdown waits at most `drain_timeout_secs` for the
/// recording consumer to finish draining.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// External transcoder binary, resolved via PATH or as an absolute path.
    #[serde(default = "default_transcoder_binary")]
    pub transcoder_binary: String,

    /// Opus bitrate passed to the transcoder (e.g. `128k`).
    #[serde(default = "default_bitrate")]
    pub bitrate: String,

    /// Ceiling on the ready-wait after a transport join. Default: 30.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Interval between readiness checks while connecting. Default: 100.
    #[serde(default = "default_ready_poll_interval_ms")]
    pub ready_poll_interval_ms: u64,

    /// Playback pacing interval, one Opus frame per tick. Default: 20.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,

    /// Grace period for the recording consumer to drain on stop. Default: 5.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            transcoder_binary: default_transcoder_binary(),
            bitrate: default_bitrate(),
            connect_timeout_secs: default_connect_timeout_secs(),
            ready_poll_interval_ms: default_ready_poll_interval_ms(),
            frame_interval_ms: default_frame_interval_ms(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

impl VoiceConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn ready_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_interval_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}
