//! ffprobe report types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::ProbeError;

/// Stream descriptors reported by ffprobe, in report order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub streams: Vec<StreamInfo>,
}

impl ProbeResult {
    /// Total frame count of stream 0, when ffprobe knows it.
    ///
    /// Returns `None` for an empty, unparseable or zero `nb_frames`;
    /// progress percentages are only computed when this is `Some`.
    pub fn total_frames(&self) -> Option<u64> {
        self.streams
            .iter()
            .find(|s| s.index == 0)
            .and_then(|s| s.nb_frames.trim().parse::<u64>().ok())
            .filter(|&n| n > 0)
    }
}

/// One stream of the probed input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamInfo {
    pub index: u32,
    pub codec_name: String,
    pub codec_long_name: String,
    pub profile: String,
    pub codec_type: String,
    pub codec_tag_string: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub coded_width: Option<u32>,
    pub coded_height: Option<u32>,
    pub pix_fmt: String,
    pub level: Option<i64>,
    pub r_frame_rate: String,
    pub avg_frame_rate: String,
    pub time_base: String,
    pub start_time: String,
    pub duration: String,
    pub bit_rate: String,
    /// Frame count as reported; empty when the container does not say.
    pub nb_frames: String,
    pub sample_rate: String,
    pub channels: Option<u32>,
    pub channel_layout: String,
    pub disposition: BTreeMap<String, i64>,
    pub tags: BTreeMap<String, String>,
}

/// Parses the JSON report printed by `ffprobe -show_streams -print_format json`.
pub fn parse_probe_output(output: &str) -> Result<ProbeResult, ProbeError> {
    serde_json::from_str(output).map_err(|e| ProbeError::MalformedReport {
        reason: e.to_string(),
    })
}

/// Turns failed tool output into a single message: stderr then stdout,
/// with JSON braces removed and surrounding whitespace trimmed.
pub fn clean_tool_output(stderr: &str, stdout: &str) -> String {
    let mut combined = String::with_capacity(stderr.len() + stdout.len());
    combined.push_str(stderr);
    combined.push_str(stdout);
    combined
        .replace(['{', '}'], "")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"{
        "streams": [
            {
                "index": 0,
                "codec_name": "h264",
                "codec_long_name": "H.264 / AVC / MPEG-4 AVC / MPEG-4 part 10",
                "profile": "High",
                "codec_type": "video",
                "codec_tag_string": "avc1",
                "width": 1920,
                "height": 1080,
                "coded_width": 1920,
                "coded_height": 1088,
                "pix_fmt": "yuv420p",
                "level": 40,
                "r_frame_rate": "30/1",
                "avg_frame_rate": "30/1",
                "time_base": "1/15360",
                "start_time": "0.000000",
                "duration": "10.000000",
                "bit_rate": "4000000",
                "nb_frames": "300",
                "disposition": {"default": 1, "dub": 0},
                "tags": {"language": "und", "handler_name": "VideoHandler"}
            },
            {
                "index": 1,
                "codec_name": "aac",
                "codec_type": "audio",
                "sample_rate": "48000",
                "channels": 2,
                "channel_layout": "stereo",
                "nb_frames": "469"
            }
        ]
    }"#;

    #[test]
    fn test_parse_probe_output() {
        let result = parse_probe_output(REPORT).unwrap();
        assert_eq!(result.streams.len(), 2);

        let video = &result.streams[0];
        assert_eq!(video.codec_type, "video");
        assert_eq!(video.width, Some(1920));
        assert_eq!(video.disposition.get("default"), Some(&1));
        assert_eq!(video.tags.get("language").map(String::as_str), Some("und"));

        let audio = &result.streams[1];
        assert_eq!(audio.channels, Some(2));
        assert_eq!(audio.width, None);
        assert_eq!(result.total_frames(), Some(300));
    }

    #[test]
    fn test_total_frames_unknown() {
        let mut result = parse_probe_output(REPORT).unwrap();
        result.streams[0].nb_frames = String::new();
        assert_eq!(result.total_frames(), None);

        result.streams[0].nb_frames = "0".to_string();
        assert_eq!(result.total_frames(), None);

        assert_eq!(ProbeResult::default().total_frames(), None);
    }

    #[test]
    fn test_missing_streams_is_malformed() {
        let err = parse_probe_output("{}").unwrap_err();
        assert!(matches!(err, ProbeError::MalformedReport { .. }));

        let err = parse_probe_output("not json").unwrap_err();
        assert!(matches!(err, ProbeError::MalformedReport { .. }));
    }

    #[test]
    fn test_clean_tool_output() {
        let cleaned = clean_tool_output("missing.mp4: No such file or directory\n", "{\n\n}\n");
        assert_eq!(cleaned, "missing.mp4: No such file or directory");
    }
}
