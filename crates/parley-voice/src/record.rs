//! Per-source recording of inbound voice frames.
//!
//! Each distinct source tag seen on the inbound channel gets its own
//! Opus-in-Ogg file, created lazily on the first frame and named
//! `<startEpochSeconds>_<sourceTag>_<base>.ogg`. A single consumer task
//! drains the channel; on stop it finishes whatever the channel already
//! holds and every writer is closed, best-effort, within the drain bound.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use parley_types::{AudioFrame, CHANNELS, SAMPLE_RATE};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::VoiceConfig;
use crate::error::VoiceError;
use crate::ogg::OggStreamWriter;
use crate::session::VoiceSession;

type WriterMap = HashMap<u32, OggStreamWriter<BufWriter<File>>>;

/// Writer map plus the shutdown latch. Once `closed` is set no further
/// frame write is attempted, even if the consumer outlives the drain
/// window.
#[derive(Default)]
struct SharedWriters {
    closed: bool,
    writers: WriterMap,
}

/// Captures inbound per-source frames to per-source container files.
pub struct Recorder {
    config: VoiceConfig,
    stop: CancellationToken,
}

impl Recorder {
    pub fn new(config: VoiceConfig) -> Self {
        Self {
            config,
            stop: CancellationToken::new(),
        }
    }

    /// Token fired when recording should stop; hand a clone to signal
    /// wiring. Firing it more than once is a no-op.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Requests recording stop. Safe to call repeatedly.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// True until the recorder has been stopped.
    pub fn is_recording(&self) -> bool {
        !self.stop.is_cancelled()
    }

    /// Records inbound frames to one file per source tag until the stop
    /// token fires. The directory of `output_path` is created if absent; its
    /// file name (minus any `.ogg` suffix) becomes the base name, falling
    /// back to `recording`.
    ///
    /// Shutdown is best-effort: the consumer gets the configured drain
    /// window to finish, then every writer is closed unconditionally, and
    /// close failures are logged rather than returned.
    pub async fn record_to_files(
        &self,
        session: &VoiceSession,
        output_path: &Path,
    ) -> Result<(), VoiceError> {
        if !session.is_ready().await {
            return Err(VoiceError::NotConnected(session.group_id().to_string()));
        }

        let (dir, base) = split_output_path(output_path);
        std::fs::create_dir_all(&dir).map_err(|err| VoiceError::FileSystem {
            path: dir.clone(),
            source: err,
        })?;

        let started_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0);

        let inbound = session.take_inbound().await?;
        info!(
            dir = %dir.display(),
            pattern = %format!("{started_at}_<source>_{base}.ogg"),
            "recording started"
        );

        let writers: Arc<Mutex<SharedWriters>> = Arc::new(Mutex::new(SharedWriters::default()));
        let consumer = tokio::spawn(consume_frames(
            inbound,
            Arc::clone(&writers),
            dir,
            base,
            started_at,
            self.stop.clone(),
        ));

        self.stop.cancelled().await;

        match tokio::time::timeout(self.config.drain_timeout(), consumer).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(error = %err, "recording consumer task failed"),
            Err(_) => warn!("timeout waiting for recording to drain"),
        }

        close_writers(&writers);
        info!("recording saved");
        Ok(())
    }
}

/// Single consumer: reads inbound frames, lazily opening one writer per
/// source tag. After the stop signal it drains what the channel already
/// holds, then exits; no frame is accepted past that point.
async fn consume_frames(
    mut inbound: mpsc::Receiver<AudioFrame>,
    writers: Arc<Mutex<SharedWriters>>,
    dir: PathBuf,
    base: String,
    started_at: u64,
    stop: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            received = inbound.recv() => match received {
                Some(frame) => frame,
                None => return,
            },
            _ = stop.cancelled() => break,
        };
        write_frame(&writers, &dir, &base, started_at, &frame);
    }

    while let Ok(frame) = inbound.try_recv() {
        write_frame(&writers, &dir, &base, started_at, &frame);
    }
}

/// Writes one frame, creating the source's file and writer on first sight.
/// Failures drop the frame with a log line; the run continues.
fn write_frame(
    writers: &Mutex<SharedWriters>,
    dir: &Path,
    base: &str,
    started_at: u64,
    frame: &AudioFrame,
) {
    let mut shared = lock_writers(writers);
    if shared.closed {
        warn!(
            source = frame.source,
            sequence = frame.sequence,
            "frame dropped after shutdown"
        );
        return;
    }
    let writer = match shared.writers.entry(frame.source) {
        Entry::Occupied(occupied) => occupied.into_mut(),
        Entry::Vacant(vacant) => {
            let filename = dir.join(format!("{started_at}_{}_{base}.ogg", frame.source));
            match open_writer(&filename, frame.source) {
                Ok(writer) => {
                    info!(file = %filename.display(), source = frame.source, "recording new source");
                    vacant.insert(writer)
                }
                Err(err) => {
                    warn!(source = frame.source, error = %err, "failed to create recording file");
                    return;
                }
            }
        }
    };

    if let Err(err) = writer.write_packet(&frame.payload) {
        warn!(
            source = frame.source,
            sequence = frame.sequence,
            error = %err,
            "failed to write frame"
        );
    }
}

fn open_writer(path: &Path, serial: u32) -> Result<OggStreamWriter<BufWriter<File>>, VoiceError> {
    let file = File::create(path).map_err(|err| VoiceError::FileSystem {
        path: path.to_path_buf(),
        source: err,
    })?;
    OggStreamWriter::new(BufWriter::new(file), serial, SAMPLE_RATE, CHANNELS)
}

/// Unconditionally closes every writer; failures are logged and the run
/// still counts as complete.
fn close_writers(writers: &Mutex<SharedWriters>) {
    let mut shared = lock_writers(writers);
    shared.closed = true;
    for (source, mut writer) in shared.writers.drain() {
        if let Err(err) = writer.flush() {
            warn!(source, error = %err, "failed to close recording file");
        }
    }
}

fn lock_writers(writers: &Mutex<SharedWriters>) -> std::sync::MutexGuard<'_, SharedWriters> {
    match writers.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Splits `output_path` into its directory and base file name, stripping a
/// trailing `.ogg` and falling back to `recording` for an empty base.
fn split_output_path(path: &Path) -> (PathBuf, String) {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let trimmed = name.strip_suffix(".ogg").unwrap_or(name.as_str());
    let base = if trimmed.is_empty() || trimmed == "." {
        "recording".to_string()
    } else {
        trimmed.to_string()
    };
    (dir, base)
}
