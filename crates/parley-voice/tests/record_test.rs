mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use common::MockTransport;
use parley_types::AudioFrame;
use parley_voice::ogg::OggPacketReader;
use parley_voice::{Recorder, VoiceConfig, VoiceSessionRegistry};
use tokio::io::BufReader;

/// Reads every logical packet out of a recorded file.
async fn packets_in(path: &Path) -> Vec<Bytes> {
    let file = tokio::fs::File::open(path).await.expect("open recording");
    let mut reader = OggPacketReader::new(BufReader::new(file));
    let mut packets = Vec::new();
    while let Some(packet) = reader.read_packet().await.expect("read packet") {
        packets.push(packet);
    }
    packets
}

/// Files in `dir` whose names end with `suffix`.
fn files_with_suffix(dir: &Path, suffix: &str) -> Vec<std::path::PathBuf> {
    std::fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| entry.expect("dir entry").path())
        .filter(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().ends_with(suffix))
                .unwrap_or(false)
        })
        .collect()
}

#[tokio::test]
async fn interleaved_sources_record_to_separate_files_in_order() {
    let _ = tracing_subscriber::fmt().try_init();
    let dir = tempfile::tempdir().expect("tempdir");
    let transport = Arc::new(MockTransport::new(true));
    let registry = VoiceSessionRegistry::new(transport.clone(), VoiceConfig::default());

    let session = registry
        .join("guild-1", "channel-1", true)
        .await
        .expect("join");
    let inbound = transport.inbound_sender();

    let recorder = Arc::new(Recorder::new(VoiceConfig::default()));
    let output = dir.path().join("capture");
    let run = {
        let recorder = Arc::clone(&recorder);
        let session = Arc::clone(&session);
        tokio::spawn(async move { recorder.record_to_files(&session, &output).await })
    };

    // 10 frames each for sources 111 and 222, interleaved; the payload
    // encodes (source marker, frame index) so file contents are checkable.
    for i in 0..10u8 {
        for (marker, source) in [(1u8, 111u32), (2u8, 222u32)] {
            let frame = AudioFrame::new(
                source,
                u16::from(i),
                u32::from(i) * 960,
                vec![marker, i, 0xfc],
            );
            inbound.send(frame).await.expect("send frame");
        }
    }

    recorder.stop();
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("drain within the grace period")
        .expect("task")
        .expect("record");

    for (marker, source) in [(1u8, 111u32), (2u8, 222u32)] {
        let matches = files_with_suffix(dir.path(), &format!("_{source}_capture.ogg"));
        assert_eq!(matches.len(), 1, "expected one file for source {source}");

        let packets = packets_in(&matches[0]).await;
        assert_eq!(packets.len(), 12, "two headers plus ten frames");
        assert!(packets[0].starts_with(b"OpusHead"));
        assert!(packets[1].starts_with(b"OpusTags"));
        for (i, packet) in packets[2..].iter().enumerate() {
            assert_eq!(packet.as_ref(), &[marker, i as u8, 0xfc]);
        }
    }

    // nothing else was created
    assert_eq!(files_with_suffix(dir.path(), ".ogg").len(), 2);
}

#[tokio::test]
async fn output_path_ogg_suffix_is_stripped_from_the_base_name() {
    let dir = tempfile::tempdir().expect("tempdir");
    let transport = Arc::new(MockTransport::new(true));
    let registry = VoiceSessionRegistry::new(transport.clone(), VoiceConfig::default());

    let session = registry
        .join("guild-1", "channel-1", true)
        .await
        .expect("join");
    let inbound = transport.inbound_sender();

    let recorder = Arc::new(Recorder::new(VoiceConfig::default()));
    let output = dir.path().join("meeting.ogg");
    let run = {
        let recorder = Arc::clone(&recorder);
        let session = Arc::clone(&session);
        tokio::spawn(async move { recorder.record_to_files(&session, &output).await })
    };

    inbound
        .send(AudioFrame::new(7, 0, 0, vec![0xfc]))
        .await
        .expect("send frame");

    recorder.stop();
    run.await.expect("task").expect("record");

    let matches = files_with_suffix(dir.path(), "_7_meeting.ogg");
    assert_eq!(matches.len(), 1);
    assert!(!recorder.is_recording());
}

#[tokio::test]
async fn stopping_before_any_frame_still_completes_cleanly() {
    let dir = tempfile::tempdir().expect("tempdir");
    let transport = Arc::new(MockTransport::new(true));
    let registry = VoiceSessionRegistry::new(transport.clone(), VoiceConfig::default());

    let session = registry
        .join("guild-1", "channel-1", true)
        .await
        .expect("join");

    let recorder = Recorder::new(VoiceConfig::default());
    recorder.stop();
    recorder
        .record_to_files(&session, &dir.path().join("capture"))
        .await
        .expect("record");

    assert!(files_with_suffix(dir.path(), ".ogg").is_empty());
}
