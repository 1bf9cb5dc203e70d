//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the tool traits and an
//! in-memory subscriber, allowing orchestrator tests without ffmpeg.
//!
//! # Example
//!
//! ```rust,ignore
//! use ffmpegd_core::testing::{probe_with_frames, MockEncoder, MockProber, RecordingSubscriber};
//!
//! let prober = MockProber::new().with_result(probe_with_frames(300));
//! let encoder = MockEncoder::new().with_step(Duration::from_millis(500), 75);
//! let subscriber = RecordingSubscriber::new();
//!
//! // Build an EncodeOrchestrator with them, register the subscriber...
//! let events = subscriber.wait_for_terminal().await;
//! ```

mod mock_encoder;
mod mock_prober;
mod recording_subscriber;

pub use fixtures::*;
pub use mock_encoder::{EncodeStep, MockEncoder, RecordedEncode};
pub use mock_prober::MockProber;
pub use recording_subscriber::RecordingSubscriber;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::PathBuf;

    use crate::encoder::{ProbeResult, StreamInfo};
    use crate::orchestrator::EncodeRequest;

    /// The payload the web UI sends for "mp4, x264 at crf 23, copy audio".
    pub const SAMPLE_PAYLOAD: &str = r#"{"format":{"container":"mp4","clip":false},"video":{"codec":"libx264","preset":"none","pass":"1","crf":23,"pixel_format":"auto","frame_rate":"auto","speed":"auto","tune":"none","profile":"none","level":"none","faststart":false,"size":"source","width":"1080","height":"1920","format":"widescreen","aspect":"auto","scaling":"auto","codec_options":""},"audio":{"codec":"copy","channel":"source","quality":"auto","sampleRate":"auto","volume":"100"},"filter":{"deband":false,"deshake":false,"deflicker":false,"dejudder":false,"denoise":"none","deinterlace":"none","brightness":"0","contrast":"1","saturation":"0","gamma":"0","acontrast":"33"}}"#;

    /// A probe report with an h264 stream 0 of `total` frames and an aac stream.
    ///
    /// `total == 0` leaves `nb_frames` empty, as ffprobe does for some containers.
    pub fn probe_with_frames(total: u64) -> ProbeResult {
        ProbeResult {
            streams: vec![
                StreamInfo {
                    index: 0,
                    codec_name: "h264".to_string(),
                    codec_type: "video".to_string(),
                    width: Some(1920),
                    height: Some(1080),
                    pix_fmt: "yuv420p".to_string(),
                    r_frame_rate: "30/1".to_string(),
                    avg_frame_rate: "30/1".to_string(),
                    nb_frames: if total == 0 {
                        String::new()
                    } else {
                        total.to_string()
                    },
                    ..Default::default()
                },
                StreamInfo {
                    index: 1,
                    codec_name: "aac".to_string(),
                    codec_type: "audio".to_string(),
                    sample_rate: "48000".to_string(),
                    channels: Some(2),
                    channel_layout: "stereo".to_string(),
                    ..Default::default()
                },
            ],
        }
    }

    /// An encode request for `input` using [`SAMPLE_PAYLOAD`].
    pub fn encode_request(input: &str, output: &str) -> EncodeRequest {
        EncodeRequest {
            input: PathBuf::from(input),
            output: PathBuf::from(output),
            payload: SAMPLE_PAYLOAD.to_string(),
        }
    }
}
