//! Video probing and frame extraction.
//! Shells out to ffprobe/ffmpeg to read metadata and decode single frames
//! at requested timestamps.

use dashmap::DashMap;
use std::path::Path;
use std::process::{Command, Stdio};

use retrofx_core::{FrameBuffer, FxError, FxResult};

/// Metadata about a video file.
#[derive(Debug, Clone)]
pub struct VideoInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Native frame rate (fps).
    pub fps: f64,
}

/// Extracts frames from video files by shelling out to `ffmpeg`.
///
/// Seeks are strictly sequential: extraction takes `&mut self` because
/// each job shares one decode cursor, and a seek must complete before the
/// next one is issued.
pub struct FrameExtractor {
    /// Memoized probe results keyed by path.
    info_cache: DashMap<String, VideoInfo>,
}

impl FrameExtractor {
    pub fn new() -> Self {
        Self {
            info_cache: DashMap::new(),
        }
    }

    /// Check if ffmpeg/ffprobe are available on the system.
    pub fn is_available() -> bool {
        Command::new("ffprobe")
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Probe a video file for its metadata (width, height, duration, fps).
    pub fn probe(&self, path: &Path) -> FxResult<VideoInfo> {
        let key = path.to_string_lossy().to_string();
        if let Some(info) = self.info_cache.get(&key) {
            return Ok(info.clone());
        }

        if !path.exists() {
            return Err(FxError::source_unavailable(&key, "video file not found"));
        }

        if !Self::is_available() {
            return Err(FxError::source_unavailable(
                &key,
                "ffprobe not found in PATH",
            ));
        }

        let output = Command::new("ffprobe")
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| FxError::source_unavailable(&key, format!("failed to run ffprobe: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FxError::source_unavailable(
                &key,
                format!("ffprobe failed: {}", stderr),
            ));
        }

        let json: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| FxError::source_unavailable(&key, format!("bad ffprobe output: {}", e)))?;

        let streams = json["streams"]
            .as_array()
            .ok_or_else(|| FxError::source_unavailable(&key, "no streams found in video"))?;

        let video_stream = streams
            .iter()
            .find(|s| s["codec_type"].as_str() == Some("video"))
            .ok_or_else(|| FxError::source_unavailable(&key, "no video stream found"))?;

        let width = video_stream["width"]
            .as_u64()
            .ok_or_else(|| FxError::source_unavailable(&key, "missing width in video stream"))?
            as u32;
        let height = video_stream["height"]
            .as_u64()
            .ok_or_else(|| FxError::source_unavailable(&key, "missing height in video stream"))?
            as u32;

        let fps = parse_frame_rate(video_stream["r_frame_rate"].as_str().unwrap_or("30/1"));

        let duration_secs = json["format"]["duration"]
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .or_else(|| {
                video_stream["duration"]
                    .as_str()
                    .and_then(|s| s.parse::<f64>().ok())
            })
            .unwrap_or(0.0);

        let info = VideoInfo {
            width,
            height,
            duration_secs,
            fps,
        };

        self.info_cache.insert(key, info.clone());
        Ok(info)
    }

    /// Seek to `timestamp_secs` and decode exactly one frame, scaled to
    /// `target_width x target_height` RGBA.
    ///
    /// `&mut self` keeps seeks sequential; callers never overlap two
    /// extractions against the same cursor.
    pub fn extract_frame(
        &mut self,
        path: &Path,
        timestamp_secs: f64,
        target_width: u32,
        target_height: u32,
    ) -> FxResult<FrameBuffer> {
        let key = path.to_string_lossy().to_string();

        if !path.exists() {
            return Err(FxError::source_unavailable(&key, "video file not found"));
        }

        let ts_str = format!("{:.3}", timestamp_secs);

        // Seek before -i for fast keyframe seeking, then decode a single
        // frame as raw RGBA on stdout.
        let output = Command::new("ffmpeg")
            .args(["-ss", &ts_str, "-i"])
            .arg(path)
            .args([
                "-vframes",
                "1",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "-s",
                &format!("{}x{}", target_width, target_height),
                "-",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                FxError::source_unavailable(&key, format!("failed to extract frame: {}", e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FxError::source_unavailable(
                &key,
                format!("frame extraction at {}s failed: {}", ts_str, stderr),
            ));
        }

        let expected_size = (target_width as usize) * (target_height as usize) * 4;
        if output.stdout.len() < expected_size {
            return Err(FxError::source_unavailable(
                &key,
                format!(
                    "short frame at {}s: expected {} bytes, got {}",
                    ts_str,
                    expected_size,
                    output.stdout.len()
                ),
            ));
        }

        let mut fb = FrameBuffer::new(target_width, target_height);
        fb.data = output.stdout[..expected_size].to_vec();
        Ok(fb)
    }
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a frame rate string like "30/1" or "24000/1001" into a float.
fn parse_frame_rate(rate_str: &str) -> f64 {
    if let Some((num_str, den_str)) = rate_str.split_once('/') {
        let num: f64 = num_str.parse().unwrap_or(30.0);
        let den: f64 = den_str.parse().unwrap_or(1.0);
        if den > 0.0 {
            num / den
        } else {
            30.0
        }
    } else {
        rate_str.parse::<f64>().unwrap_or(30.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate_fraction() {
        assert!((parse_frame_rate("30/1") - 30.0).abs() < 0.001);
        assert!((parse_frame_rate("24000/1001") - 23.976).abs() < 0.01);
    }

    #[test]
    fn test_parse_frame_rate_plain() {
        assert!((parse_frame_rate("25") - 25.0).abs() < 0.001);
        assert!((parse_frame_rate("29.97") - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_parse_frame_rate_invalid() {
        assert!((parse_frame_rate("invalid") - 30.0).abs() < 0.001);
        assert!((parse_frame_rate("30/0") - 30.0).abs() < 0.001);
    }

    #[test]
    fn test_probe_missing_file() {
        let extractor = FrameExtractor::new();
        let err = extractor.probe(Path::new("/nonexistent/video.mp4")).unwrap_err();
        assert!(matches!(err, FxError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_extract_missing_file() {
        let mut extractor = FrameExtractor::new();
        let err = extractor
            .extract_frame(Path::new("/nonexistent/video.mp4"), 0.0, 320, 240)
            .unwrap_err();
        assert!(matches!(err, FxError::SourceUnavailable { .. }));
    }
}
