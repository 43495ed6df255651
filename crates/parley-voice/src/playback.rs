//! File playback into a voice session.
//!
//! The external transcoder turns an arbitrary audio file into an
//! Opus-in-Ogg stream on its stdout; this module demuxes that stream and
//! paces one Opus packet per frame interval into the session's outbound
//! sink, holding the speaking indicator for the duration.

use std::path::Path;
use std::process::Stdio;

use bytes::Bytes;
use parley_types::{CHANNELS, SAMPLE_RATE};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::time::Interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::VoiceConfig;
use crate::error::VoiceError;
use crate::ogg::OggPacketReader;
use crate::session::VoiceSession;

/// Leading logical packets of an Opus-in-Ogg stream that are headers
/// (`OpusHead`, `OpusTags`) rather than audio.
const OPUS_HEADER_PACKETS: u64 = 2;

/// Plays one local audio file into a ready [`VoiceSession`].
pub struct Player {
    config: VoiceConfig,
    stop: CancellationToken,
}

impl Player {
    pub fn new(config: VoiceConfig) -> Self {
        Self {
            config,
            stop: CancellationToken::new(),
        }
    }

    /// Token fired when playback should stop; hand a clone to signal wiring
    /// or to other stop sources. Firing it more than once is a no-op.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Requests playback stop. Safe to call repeatedly.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// True until the player has been stopped.
    pub fn is_playing(&self) -> bool {
        !self.stop.is_cancelled()
    }

    /// Transcodes `path` and paces the resulting Opus packets into the
    /// session's outbound sink, one per frame interval. Returns once the
    /// stream ends, the transcoder exits, or the stop token fires.
    pub async fn play_file(&self, session: &VoiceSession, path: &Path) -> Result<(), VoiceError> {
        if !session.is_ready().await {
            return Err(VoiceError::NotConnected(session.group_id().to_string()));
        }
        if !path.exists() {
            return Err(VoiceError::FileNotFound(path.to_path_buf()));
        }

        let mut child = self.spawn_transcoder(path)?;
        forward_diagnostics(&mut child);
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("transcoder stdout not captured"))?;

        let sink = session.outbound_sink().await?;
        session.set_speaking(true).await?;
        info!(file = %path.display(), "playback started");

        let result = self.stream_packets(BufReader::new(stdout), sink).await;

        if let Err(err) = session.set_speaking(false).await {
            warn!(error = %err, "failed to clear speaking indicator");
        }
        if let Err(err) = child.start_kill() {
            debug!(error = %err, "transcoder already exited");
        }
        if let Err(err) = child.wait().await {
            warn!(error = %err, "failed to reap transcoder");
        }

        let frames = result?;
        info!(frames, file = %path.display(), "playback finished");
        Ok(())
    }

    fn spawn_transcoder(&self, path: &Path) -> Result<Child, VoiceError> {
        let mut command = Command::new(&self.config.transcoder_binary);
        command
            .arg("-i")
            .arg(path)
            .args(["-f", "opus"])
            .arg("-ar")
            .arg(SAMPLE_RATE.to_string())
            .arg("-ac")
            .arg(CHANNELS.to_string())
            .arg("-b:a")
            .arg(&self.config.bitrate)
            .args(["-application", "audio", "-loglevel", "error", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        command.spawn().map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => {
                VoiceError::TranscoderNotFound(self.config.transcoder_binary.clone())
            }
            _ => VoiceError::Stream(err),
        })
    }

    /// Demuxes `reader`, discards the Opus header packets, and paces the
    /// rest into `sink`. The ticker is armed on the first audio packet so
    /// header discard does not consume ticks. Returns the number of audio
    /// packets delivered.
    async fn stream_packets<R>(
        &self,
        reader: R,
        sink: mpsc::Sender<Bytes>,
    ) -> Result<u64, VoiceError>
    where
        R: AsyncRead + Unpin,
    {
        let mut packets = OggPacketReader::new(reader);
        let mut ticker: Option<Interval> = None;
        let mut seen: u64 = 0;
        let mut sent: u64 = 0;

        loop {
            if self.stop.is_cancelled() {
                break;
            }

            let packet = tokio::select! {
                read = packets.read_packet() => match read? {
                    Some(packet) => packet,
                    None => break,
                },
                _ = self.stop.cancelled() => break,
            };

            seen += 1;
            if seen <= OPUS_HEADER_PACKETS {
                continue;
            }

            let ticker = ticker
                .get_or_insert_with(|| tokio::time::interval(self.config.frame_interval()));
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.stop.cancelled() => break,
            }

            if sink.send(packet).await.is_err() {
                return Err(VoiceError::Transport(
                    "outbound frame sink closed".to_string(),
                ));
            }
            sent += 1;
        }
        Ok(sent)
    }
}

/// Forwards the transcoder's stderr into the log, line by line.
fn forward_diagnostics(child: &mut Child) {
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!(target: "transcoder", "{line}");
            }
        });
    }
}
