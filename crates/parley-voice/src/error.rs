use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors produced by the voice subsystem.
///
/// Session-level and setup-time failures (connect, transcoder lookup,
/// directory creation) abort the operation and surface here. Per-frame
/// failures during steady-state streaming are logged and recovered locally
/// instead, so one bad frame cannot take down an otherwise healthy run.
#[derive(Debug, Error)]
pub enum VoiceError {
    /// The transport did not report ready within the configured bound.
    #[error("voice connection not ready after {0:?}")]
    ConnectTimeout(Duration),

    #[error("voice transport error: {0}")]
    Transport(String),

    #[error("not connected to a voice channel in group {0}")]
    NotConnected(String),

    #[error("transcoder binary not found: {0}")]
    TranscoderNotFound(String),

    #[error("audio file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("malformed ogg stream: {0}")]
    MalformedStream(String),

    #[error("filesystem error at {}: {source}", .path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("audio stream error: {0}")]
    Stream(#[from] std::io::Error),
}
