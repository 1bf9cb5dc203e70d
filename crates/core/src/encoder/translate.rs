//! Maps a [`ConfigDocument`] onto ffmpeg command-line arguments.
//!
//! The result holds only the option flags; input, output, logging and
//! progress flags are added by the encoder. Output is deterministic: the
//! same document always yields the same arguments in the same order.

use super::document::{AudioOptions, ConfigDocument, FilterOptions, FormatOptions, VideoOptions};
use super::error::TranslateError;

/// Parses a serialized configuration document.
pub fn parse_payload(payload: &str) -> Result<ConfigDocument, TranslateError> {
    serde_json::from_str(payload).map_err(|e| TranslateError::InvalidPayload {
        reason: e.to_string(),
    })
}

/// Translates a configuration document into ffmpeg option arguments.
pub fn translate(doc: &ConfigDocument) -> Result<Vec<String>, TranslateError> {
    let mut args = ArgList::default();

    format_args(&doc.format, &mut args)?;
    video_args(&doc.video, &doc.filter, &mut args)?;
    audio_args(&doc.audio, &doc.filter, &mut args)?;

    Ok(args.into_inner())
}

#[derive(Debug, Default)]
struct ArgList(Vec<String>);

impl ArgList {
    fn flag(&mut self, flag: &str, value: impl Into<String>) {
        self.0.push(flag.to_string());
        self.0.push(value.into());
    }

    fn extend(&mut self, raw: Vec<String>) {
        self.0.extend(raw);
    }

    fn into_inner(self) -> Vec<String> {
        self.0
    }
}

fn format_args(format: &FormatOptions, args: &mut ArgList) -> Result<(), TranslateError> {
    if !is_unset(&format.container, &["auto", "none"]) {
        args.flag("-f", token("format.container", &format.container)?);
    }

    if format.clip {
        if !is_unset(&format.start_time, &[]) {
            args.flag("-ss", timestamp("format.start_time", &format.start_time)?);
        }
        if !is_unset(&format.end_time, &[]) {
            args.flag("-to", timestamp("format.end_time", &format.end_time)?);
        }
    }

    Ok(())
}

fn video_args(
    video: &VideoOptions,
    filter: &FilterOptions,
    args: &mut ArgList,
) -> Result<(), TranslateError> {
    if video.codec.trim() == "copy" {
        args.flag("-c:v", "copy");
        return container_video_args(video, args);
    }
    if !is_unset(&video.codec, &["none"]) {
        args.flag("-c:v", token("video.codec", &video.codec)?);
    }

    if !is_unset(&video.preset, &["none"]) {
        args.flag("-preset", token("video.preset", &video.preset)?);
    }

    match video.pass.trim() {
        "" | "1" => {}
        "2" => {
            return Err(TranslateError::invalid_field(
                "video.pass",
                &video.pass,
                "two-pass encoding is not supported",
            ))
        }
        _ => {
            return Err(TranslateError::invalid_field(
                "video.pass",
                &video.pass,
                "expected 1",
            ))
        }
    }

    if !is_unset(&video.crf, &["none", "auto"]) {
        args.flag("-crf", numeric("video.crf", &video.crf)?);
    }
    if !is_unset(&video.bitrate, &["none", "auto"]) {
        args.flag("-b:v", bitrate("video.bitrate", &video.bitrate)?);
    }
    if !is_unset(&video.pixel_format, &["auto"]) {
        args.flag("-pix_fmt", token("video.pixel_format", &video.pixel_format)?);
    }
    if !is_unset(&video.frame_rate, &["auto"]) {
        args.flag("-r", rate("video.frame_rate", &video.frame_rate)?);
    }
    if !is_unset(&video.speed, &["auto"]) {
        args.flag("-speed", numeric("video.speed", &video.speed)?);
    }
    if !is_unset(&video.tune, &["none"]) {
        args.flag("-tune", token("video.tune", &video.tune)?);
    }
    if !is_unset(&video.profile, &["none"]) {
        args.flag("-profile:v", token("video.profile", &video.profile)?);
    }
    if !is_unset(&video.level, &["none"]) {
        args.flag("-level", numeric("video.level", &video.level)?);
    }
    container_video_args(video, args)?;

    let chain = video_filter_chain(video, filter)?;
    if !chain.is_empty() {
        args.flag("-vf", chain.join(","));
    }

    if !is_unset(&video.codec_options, &[]) {
        let raw = shlex::split(&video.codec_options).ok_or_else(|| {
            TranslateError::invalid_field(
                "video.codec_options",
                &video.codec_options,
                "unbalanced quotes",
            )
        })?;
        args.extend(raw);
    }

    Ok(())
}

/// Display aspect and moov placement apply to stream copies too.
fn container_video_args(video: &VideoOptions, args: &mut ArgList) -> Result<(), TranslateError> {
    if !is_unset(&video.aspect, &["auto"]) {
        args.flag("-aspect", aspect("video.aspect", &video.aspect)?);
    }
    if video.faststart {
        args.flag("-movflags", "+faststart");
    }
    Ok(())
}

fn video_filter_chain(
    video: &VideoOptions,
    filter: &FilterOptions,
) -> Result<Vec<String>, TranslateError> {
    let mut chain = Vec::new();

    let deinterlace = match filter.deinterlace.trim() {
        "" | "none" => None,
        "frame" => Some("yadif=0:-1:0"),
        "field" => Some("yadif=1:-1:0"),
        "frame_nospatial" => Some("yadif=2:-1:0"),
        "field_nospatial" => Some("yadif=3:-1:0"),
        _ => {
            return Err(TranslateError::invalid_field(
                "filter.deinterlace",
                &filter.deinterlace,
                "expected none, frame, field, frame_nospatial or field_nospatial",
            ))
        }
    };
    chain.extend(deinterlace.map(str::to_string));

    let denoise = match filter.denoise.trim() {
        "" | "none" => None,
        "light" => Some("hqdn3d=2:1.5:3:2.25"),
        "medium" => Some("hqdn3d=4:3:6:4.5"),
        "heavy" => Some("hqdn3d=8:6:12:9"),
        _ => {
            return Err(TranslateError::invalid_field(
                "filter.denoise",
                &filter.denoise,
                "expected none, light, medium or heavy",
            ))
        }
    };
    chain.extend(denoise.map(str::to_string));

    for (enabled, name) in [
        (filter.deband, "deband"),
        (filter.deshake, "deshake"),
        (filter.deflicker, "deflicker"),
        (filter.dejudder, "dejudder"),
    ] {
        if enabled {
            chain.push(name.to_string());
        }
    }

    if let Some(scale) = scale_filter(video)? {
        chain.push(scale);
    }

    let mut eq = Vec::new();
    for (field, key, value, neutral) in [
        ("filter.brightness", "brightness", &filter.brightness, 0.0),
        ("filter.contrast", "contrast", &filter.contrast, 1.0),
        ("filter.saturation", "saturation", &filter.saturation, 0.0),
        ("filter.gamma", "gamma", &filter.gamma, 0.0),
    ] {
        if is_unset(value, &[]) {
            continue;
        }
        let (text, level) = number(field, value)?;
        if level != neutral {
            eq.push(format!("{}={}", key, text));
        }
    }
    if !eq.is_empty() {
        chain.push(format!("eq={}", eq.join(":")));
    }

    Ok(chain)
}

fn scale_filter(video: &VideoOptions) -> Result<Option<String>, TranslateError> {
    let (width, height) = match video.size.trim() {
        "" | "source" => return Ok(None),
        "custom" => (
            dimension("video.width", &video.width)?,
            dimension("video.height", &video.height)?,
        ),
        size => {
            let size = positive_integer("video.size", size)?;
            match video.format.trim() {
                "" | "widescreen" => (size, "-2".to_string()),
                "fullscreen" => ("-2".to_string(), size),
                _ => {
                    return Err(TranslateError::invalid_field(
                        "video.format",
                        &video.format,
                        "expected widescreen or fullscreen",
                    ))
                }
            }
        }
    };

    if width == "-2" && height == "-2" {
        return Ok(None);
    }

    let mut scale = format!("scale={}:{}", width, height);
    if !is_unset(&video.scaling, &["auto"]) {
        scale.push_str(":flags=");
        scale.push_str(&token("video.scaling", &video.scaling)?);
    }
    Ok(Some(scale))
}

fn audio_args(
    audio: &AudioOptions,
    filter: &FilterOptions,
    args: &mut ArgList,
) -> Result<(), TranslateError> {
    if audio.codec.trim() == "copy" {
        args.flag("-c:a", "copy");
        return Ok(());
    }
    if !is_unset(&audio.codec, &["none"]) {
        args.flag("-c:a", token("audio.codec", &audio.codec)?);
    }

    let channels = match audio.channel.trim() {
        "" | "source" => None,
        "mono" => Some("1".to_string()),
        "stereo" => Some("2".to_string()),
        "5.1" => Some("6".to_string()),
        other => Some(positive_integer("audio.channel", other)?),
    };
    if let Some(channels) = channels {
        args.flag("-ac", channels);
    }

    if !is_unset(&audio.quality, &["auto"]) {
        args.flag("-b:a", bitrate("audio.quality", &audio.quality)?);
    }
    if !is_unset(&audio.sample_rate, &["auto"]) {
        args.flag("-ar", positive_integer("audio.sampleRate", &audio.sample_rate)?);
    }

    let mut chain = Vec::new();
    if !is_unset(&audio.volume, &[]) {
        let (_, level) = number("audio.volume", &audio.volume)?;
        if level != 100.0 {
            chain.push(format!("volume={}", level / 100.0));
        }
    }
    if !is_unset(&filter.acontrast, &[]) {
        let (text, level) = number("filter.acontrast", &filter.acontrast)?;
        if level != 33.0 {
            chain.push(format!("acontrast=contrast={}", text));
        }
    }
    if !chain.is_empty() {
        args.flag("-af", chain.join(","));
    }

    Ok(())
}

/// Empty values are always unset; `sentinels` lists the field's other unset values.
fn is_unset(value: &str, sentinels: &[&str]) -> bool {
    let value = value.trim();
    value.is_empty() || sentinels.contains(&value)
}

/// A single argv word: no whitespace, not flag-shaped.
fn token(field: &'static str, value: &str) -> Result<String, TranslateError> {
    let value = value.trim();
    if value.starts_with('-') || value.chars().any(char::is_whitespace) {
        return Err(TranslateError::invalid_field(
            field,
            value,
            "expected a single word",
        ));
    }
    Ok(value.to_string())
}

fn numeric(field: &'static str, value: &str) -> Result<String, TranslateError> {
    number(field, value).map(|(text, _)| text)
}

/// The trimmed text as written plus its parsed value.
fn number(field: &'static str, value: &str) -> Result<(String, f64), TranslateError> {
    let value = value.trim();
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok((value.to_string(), v)),
        _ => Err(TranslateError::invalid_field(
            field,
            value,
            "not a number",
        )),
    }
}

fn positive_integer(field: &'static str, value: &str) -> Result<String, TranslateError> {
    let value = value.trim();
    match value.parse::<u32>() {
        Ok(v) if v > 0 => Ok(value.to_string()),
        _ => Err(TranslateError::invalid_field(
            field,
            value,
            "expected a positive integer",
        )),
    }
}

/// A scale dimension; `auto` keeps the aspect ratio.
fn dimension(field: &'static str, value: &str) -> Result<String, TranslateError> {
    if is_unset(value, &["auto"]) {
        Ok("-2".to_string())
    } else {
        positive_integer(field, value)
    }
}

/// A frame rate: plain number or `num/den`.
fn rate(field: &'static str, value: &str) -> Result<String, TranslateError> {
    let value = value.trim();
    let valid = match value.split_once('/') {
        Some((num, den)) => {
            num.parse::<u32>().is_ok() && den.parse::<u32>().map(|d| d > 0).unwrap_or(false)
        }
        None => value.parse::<f64>().map(|v| v > 0.0 && v.is_finite()).unwrap_or(false),
    };
    if valid {
        Ok(value.to_string())
    } else {
        Err(TranslateError::invalid_field(
            field,
            value,
            "expected a frame rate like 30 or 30000/1001",
        ))
    }
}

/// A display aspect ratio: `16:9`, `16/9` or a number.
fn aspect(field: &'static str, value: &str) -> Result<String, TranslateError> {
    let value = value.trim();
    let valid = match value.split_once([':', '/']) {
        Some((w, h)) => w.parse::<u32>().is_ok() && h.parse::<u32>().map(|h| h > 0).unwrap_or(false),
        None => value.parse::<f64>().map(|v| v > 0.0 && v.is_finite()).unwrap_or(false),
    };
    if valid {
        Ok(value.to_string())
    } else {
        Err(TranslateError::invalid_field(
            field,
            value,
            "expected a ratio like 16:9",
        ))
    }
}

/// A bitrate: digits with an optional `k`/`M` suffix.
fn bitrate(field: &'static str, value: &str) -> Result<String, TranslateError> {
    let value = value.trim();
    let digits = value.trim_end_matches(['k', 'K', 'm', 'M']);
    let valid = value.len() - digits.len() <= 1
        && digits.parse::<f64>().map(|v| v > 0.0 && v.is_finite()).unwrap_or(false);
    if valid {
        Ok(value.to_string())
    } else {
        Err(TranslateError::invalid_field(
            field,
            value,
            "expected a bitrate like 128k",
        ))
    }
}

/// Seconds (`12.5`) or `[HH:]MM:SS[.ms]`.
fn timestamp(field: &'static str, value: &str) -> Result<String, TranslateError> {
    let value = value.trim();
    let parts: Vec<&str> = value.split(':').collect();
    let valid = parts.len() <= 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.parse::<f64>().map(|v| v >= 0.0).unwrap_or(false));
    if valid {
        Ok(value.to_string())
    } else {
        Err(TranslateError::invalid_field(
            field,
            value,
            "expected seconds or HH:MM:SS",
        ))
    }
}
