//! The encode configuration document sent by the UI.
//!
//! Every optional field has an "unset" sentinel (`"none"`, `"auto"`,
//! `"source"` or a neutral number). Missing fields deserialize to their
//! sentinel; the four sections themselves are required.

use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;

/// Full configuration for one encode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    pub format: FormatOptions,
    pub video: VideoOptions,
    pub audio: AudioOptions,
    pub filter: FilterOptions,
}

/// Container options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatOptions {
    pub container: String,
    pub clip: bool,
    #[serde(alias = "startTime", deserialize_with = "text_or_number")]
    pub start_time: String,
    #[serde(alias = "endTime", deserialize_with = "text_or_number")]
    pub end_time: String,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            container: "auto".to_string(),
            clip: false,
            start_time: String::new(),
            end_time: String::new(),
        }
    }
}

/// Video stream options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoOptions {
    pub codec: String,
    pub preset: String,
    #[serde(deserialize_with = "text_or_number")]
    pub pass: String,
    #[serde(deserialize_with = "text_or_number")]
    pub crf: String,
    #[serde(deserialize_with = "text_or_number")]
    pub bitrate: String,
    pub pixel_format: String,
    #[serde(deserialize_with = "text_or_number")]
    pub frame_rate: String,
    #[serde(deserialize_with = "text_or_number")]
    pub speed: String,
    pub tune: String,
    pub profile: String,
    #[serde(deserialize_with = "text_or_number")]
    pub level: String,
    pub faststart: bool,
    #[serde(deserialize_with = "text_or_number")]
    pub size: String,
    #[serde(deserialize_with = "text_or_number")]
    pub width: String,
    #[serde(deserialize_with = "text_or_number")]
    pub height: String,
    /// `widescreen` sizes are widths, `fullscreen` sizes are heights.
    pub format: String,
    pub aspect: String,
    pub scaling: String,
    pub codec_options: String,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            codec: "none".to_string(),
            preset: "none".to_string(),
            pass: "1".to_string(),
            crf: "none".to_string(),
            bitrate: String::new(),
            pixel_format: "auto".to_string(),
            frame_rate: "auto".to_string(),
            speed: "auto".to_string(),
            tune: "none".to_string(),
            profile: "none".to_string(),
            level: "none".to_string(),
            faststart: false,
            size: "source".to_string(),
            width: "auto".to_string(),
            height: "auto".to_string(),
            format: "widescreen".to_string(),
            aspect: "auto".to_string(),
            scaling: "auto".to_string(),
            codec_options: String::new(),
        }
    }
}

/// Audio stream options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioOptions {
    pub codec: String,
    #[serde(deserialize_with = "text_or_number")]
    pub channel: String,
    #[serde(deserialize_with = "text_or_number")]
    pub quality: String,
    #[serde(rename = "sampleRate", alias = "sample_rate", deserialize_with = "text_or_number")]
    pub sample_rate: String,
    #[serde(deserialize_with = "text_or_number")]
    pub volume: String,
}

impl Default for AudioOptions {
    fn default() -> Self {
        Self {
            codec: "none".to_string(),
            channel: "source".to_string(),
            quality: "auto".to_string(),
            sample_rate: "auto".to_string(),
            volume: "100".to_string(),
        }
    }
}

/// Video and audio filter options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOptions {
    pub deband: bool,
    pub deshake: bool,
    pub deflicker: bool,
    pub dejudder: bool,
    pub denoise: String,
    pub deinterlace: String,
    #[serde(deserialize_with = "text_or_number")]
    pub brightness: String,
    #[serde(deserialize_with = "text_or_number")]
    pub contrast: String,
    #[serde(deserialize_with = "text_or_number")]
    pub saturation: String,
    #[serde(deserialize_with = "text_or_number")]
    pub gamma: String,
    #[serde(deserialize_with = "text_or_number")]
    pub acontrast: String,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            deband: false,
            deshake: false,
            deflicker: false,
            dejudder: false,
            denoise: "none".to_string(),
            deinterlace: "none".to_string(),
            brightness: "0".to_string(),
            contrast: "1".to_string(),
            saturation: "0".to_string(),
            gamma: "0".to_string(),
            acontrast: "33".to_string(),
        }
    }
}

/// Accepts either a JSON string or a JSON number and keeps the text.
///
/// The UI sends some numeric settings as numbers (`"crf": 23`) and others
/// as strings (`"brightness": "0"`); both are stored as written.
fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct TextOrNumber;

    impl<'de> de::Visitor<'de> for TextOrNumber {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a string or a number")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(TextOrNumber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_sentinels() {
        let doc: ConfigDocument =
            serde_json::from_str(r#"{"format":{},"video":{},"audio":{},"filter":{}}"#).unwrap();
        assert_eq!(doc, ConfigDocument::default());
    }

    #[test]
    fn test_missing_section_is_an_error() {
        let result = serde_json::from_str::<ConfigDocument>(r#"{"format":{},"video":{}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_numbers_are_kept_as_text() {
        let doc: ConfigDocument = serde_json::from_str(
            r#"{"format":{},"video":{"crf":23,"frame_rate":29.97},"audio":{"sampleRate":48000},"filter":{}}"#,
        )
        .unwrap();
        assert_eq!(doc.video.crf, "23");
        assert_eq!(doc.video.frame_rate, "29.97");
        assert_eq!(doc.audio.sample_rate, "48000");
    }

    #[test]
    fn test_sample_rate_uses_camel_case_on_the_wire() {
        let json = serde_json::to_value(AudioOptions::default()).unwrap();
        assert_eq!(json["sampleRate"], "auto");
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        let result = serde_json::from_str::<ConfigDocument>(
            r#"{"format":{},"video":{"crf":[1]},"audio":{},"filter":{}}"#,
        );
        assert!(result.is_err());
    }
}
