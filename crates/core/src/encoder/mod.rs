//! Encoder module: probing, argument translation and running ffmpeg.
//!
//! The [`Prober`] and [`Encoder`] traits wrap the two external tools; the
//! ffprobe/ffmpeg implementations run them as child processes. A job's
//! [`ConfigDocument`] is turned into ffmpeg option arguments by
//! [`translate`], and the running encoder reports into a shared
//! [`ProgressHandle`].
//!
//! # Example
//!
//! ```ignore
//! use ffmpegd_core::encoder::{parse_payload, translate, Encoder, FfmpegEncoder, ProgressHandle};
//!
//! let doc = parse_payload(&request.payload)?;
//! let args = translate(&doc)?;
//!
//! let encoder = FfmpegEncoder::new("ffmpeg");
//! let progress = ProgressHandle::new();
//! encoder.encode(&input, &output, &args, &progress).await?;
//! println!("{} frames", progress.snapshot().await.frame);
//! ```

mod document;
mod error;
mod ffmpeg;
mod ffprobe;
mod probe;
mod progress;
mod tool;
mod traits;
mod translate;

pub use document::{AudioOptions, ConfigDocument, FilterOptions, FormatOptions, VideoOptions};
pub use error::{EncodeError, JobError, ProbeError, ToolError, TranslateError};
pub use ffmpeg::FfmpegEncoder;
pub use ffprobe::FfprobeProber;
pub use probe::{clean_tool_output, parse_probe_output, ProbeResult, StreamInfo};
pub use progress::{parse_line, ProgressHandle, ProgressLine, ProgressSnapshot, ProgressUpdate};
pub use tool::{parse_version, tool_version};
pub use traits::{Encoder, Prober};
pub use translate::{parse_payload, translate};
