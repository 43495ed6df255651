//! Shared types and constants for the Parley voice toolkit.
//!
//! This crate provides the foundational definitions used across the Parley
//! workspace: the transport-level audio frame and the fixed audio parameters
//! of the voice pipeline. No crate in the workspace depends on anything
//! *except* `parley-types` for cross-cutting definitions, which keeps the
//! dependency graph clean and prevents circular dependencies.

/// Sample rate of the voice pipeline, in Hz.
pub const SAMPLE_RATE: u32 = 48_000;

/// Number of audio channels carried by the pipeline (stereo).
pub const CHANNELS: u8 = 2;

/// Duration of one audio frame, in milliseconds.
pub const FRAME_MILLIS: u64 = 20;

/// Samples per channel in one frame (20 ms at 48 kHz).
pub const SAMPLES_PER_FRAME: u32 = 960;

/// Maximum encoded size of a single Opus frame, in bytes.
pub const MAX_OPUS_FRAME_BYTES: usize = 1275;

mod voice;
pub use voice::AudioFrame;
