use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use serde::Deserialize;

use super::types::{VideoMetadata, VideoProbe};
use super::ExtractionError;

/// Container metadata through `ffprobe -print_format json`.
pub struct FfprobeCli {
    binary: PathBuf,
}

impl FfprobeCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfprobeCli {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl VideoProbe for FfprobeCli {
    fn probe(&self, path: &Path) -> Result<VideoMetadata, ExtractionError> {
        let output = Command::new(&self.binary)
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .output();

        let output = match output {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ExtractionError::ProbeInit(format!(
                    "ffprobe not found at {}",
                    self.binary.display()
                )));
            }
            Err(e) => return Err(ExtractionError::Io(e)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::VideoProbe(format!(
                "ffprobe failed: {}",
                stderr.trim()
            )));
        }

        parse_probe_output(&output.stdout)
    }
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    format_name: Option<String>,
    duration: Option<String>,
}

/// Parse ffprobe JSON into container metadata.
pub fn parse_probe_output(json: &[u8]) -> Result<VideoMetadata, ExtractionError> {
    let probe: ProbeOutput = serde_json::from_slice(json)
        .map_err(|e| ExtractionError::VideoProbe(format!("Invalid ffprobe output: {e}")))?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or(ExtractionError::NoVideoStream)?;
    let has_audio = probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let parse_secs = |d: &str| d.trim().parse::<f64>().ok();
    let duration_secs = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(parse_secs)
        .or_else(|| video.duration.as_deref().and_then(parse_secs))
        .unwrap_or(0.0);

    let fps = video
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| video.r_frame_rate.as_deref().and_then(parse_frame_rate));

    Ok(VideoMetadata {
        duration_secs,
        fps,
        width: video.width.unwrap_or(0),
        height: video.height.unwrap_or(0),
        has_audio,
        codec: video.codec_name.clone(),
        container: probe.format.and_then(|f| f.format_name),
    })
}

/// Parse an ffprobe rate such as `30000/1001` or `25`. `0/0` means unknown.
pub fn parse_frame_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Mock probe returning fixed metadata. Remembers the paths it was asked to
/// probe and whether each existed at the time.
pub struct MockVideoProbe {
    metadata: Result<VideoMetadata, String>,
    seen: Mutex<Vec<(PathBuf, bool)>>,
}

impl MockVideoProbe {
    pub fn new(metadata: VideoMetadata) -> Self {
        Self {
            metadata: Ok(metadata),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            metadata: Err(message.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<(PathBuf, bool)> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl VideoProbe for MockVideoProbe {
    fn probe(&self, path: &Path) -> Result<VideoMetadata, ExtractionError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push((path.to_path_buf(), path.exists()));
        }
        self.metadata.clone().map_err(ExtractionError::VideoProbe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {"codec_type": "video", "codec_name": "h264", "width": 1280, "height": 720,
             "avg_frame_rate": "30000/1001", "r_frame_rate": "30/1", "duration": "12.000"},
            {"codec_type": "audio", "codec_name": "aac"}
        ],
        "format": {"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "12.345000"}
    }"#;

    #[test]
    fn parses_video_and_audio_streams() {
        let meta = parse_probe_output(SAMPLE.as_bytes()).unwrap();
        assert!((meta.duration_secs - 12.345).abs() < 1e-9);
        assert!((meta.fps.unwrap() - 29.97).abs() < 0.01);
        assert_eq!((meta.width, meta.height), (1280, 720));
        assert!(meta.has_audio);
        assert_eq!(meta.codec.as_deref(), Some("h264"));
        assert!(meta.container.unwrap().contains("mp4"));
    }

    #[test]
    fn silent_video_has_no_audio() {
        let json = r#"{"streams":[{"codec_type":"video","width":2,"height":2,"avg_frame_rate":"25/1"}],
                       "format":{"duration":"1.5"}}"#;
        let meta = parse_probe_output(json.as_bytes()).unwrap();
        assert!(!meta.has_audio);
        assert_eq!(meta.fps, Some(25.0));
    }

    #[test]
    fn audio_only_is_rejected() {
        let json = r#"{"streams":[{"codec_type":"audio"}],"format":{"duration":"3.0"}}"#;
        let err = parse_probe_output(json.as_bytes()).unwrap_err();
        assert!(matches!(err, ExtractionError::NoVideoStream));
    }

    #[test]
    fn garbage_output_is_probe_error() {
        let err = parse_probe_output(b"not json").unwrap_err();
        assert!(matches!(err, ExtractionError::VideoProbe(_)));
    }

    #[test]
    fn frame_rate_forms() {
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate("60/2"), Some(30.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("abc"), None);
    }

    #[test]
    fn falls_back_to_stream_duration_and_r_frame_rate() {
        let json = r#"{"streams":[{"codec_type":"video","avg_frame_rate":"0/0",
                        "r_frame_rate":"24/1","duration":"4.0"}]}"#;
        let meta = parse_probe_output(json.as_bytes()).unwrap();
        assert_eq!(meta.duration_secs, 4.0);
        assert_eq!(meta.fps, Some(24.0));
        assert_eq!(meta.container, None);
    }

    #[test]
    fn unparsable_format_duration_falls_back_to_stream() {
        let json = r#"{"streams":[{"codec_type":"video","duration":"4.0"}],
                       "format":{"duration":"N/A"}}"#;
        let meta = parse_probe_output(json.as_bytes()).unwrap();
        assert_eq!(meta.duration_secs, 4.0);
    }

    #[test]
    fn missing_binary_maps_to_init_error() {
        let probe = FfprobeCli::new("/nonexistent/ffprobe-binary");
        let err = probe.probe(Path::new("/tmp/none.mp4")).unwrap_err();
        assert!(matches!(err, ExtractionError::ProbeInit(_)));
    }
}
