//! Real-time voice streaming for the Parley platform.
//!
//! Joins a remote voice transport session and either streams a transcoded
//! local audio file into it at real-time cadence (playback) or captures the
//! inbound per-speaker frames to Ogg/Opus files (recording).
//!
//! The transport itself (signaling, encryption, UDP) is an external
//! collaborator behind the [`VoiceTransport`] trait, and Opus encoding is
//! delegated to an external transcoder process (ffmpeg by default). What
//! lives here is the engineering in between: Ogg container framing, strict
//! 20 ms frame pacing, per-source demultiplexed file output, and
//! cancellation that behaves under signals.
//!
//! # Components
//!
//! - [`VoiceSessionRegistry`] — at most one session per group, idempotent join
//! - [`VoiceSession`] — one joined endpoint with a bounded ready-wait
//! - [`Player`] — transcode and pace a file into the outbound sink
//! - [`Recorder`] — demux inbound frames into per-source `.ogg` files
//! - [`ogg`] — page/packet framing shared by both engines
//! - [`shutdown`] — SIGINT/SIGTERM wiring onto a run's stop token

pub mod config;
pub mod error;
pub mod ogg;
pub mod playback;
pub mod record;
pub mod registry;
pub mod session;
pub mod shutdown;
pub mod transport;

pub use config::VoiceConfig;
pub use error::VoiceError;
pub use playback::Player;
pub use record::Recorder;
pub use registry::VoiceSessionRegistry;
pub use session::{ConnectionState, VoiceSession};
pub use transport::{TransportHandle, VoiceTransport};
