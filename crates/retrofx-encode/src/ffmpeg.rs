use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use retrofx_core::{FrameBuffer, FxError, FxResult};

/// Encoder that shells out to FFmpeg for H.264 encoding.
///
/// Frames are written to FFmpeg's stdin in the order given and never
/// reordered or dropped. On any failure the partially written output file
/// is removed; callers never observe partial output.
pub struct FfmpegEncoder;

impl FfmpegEncoder {
    /// Check if FFmpeg is available on the system.
    pub fn is_available() -> bool {
        Command::new("ffmpeg")
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Return an [`FxError::EncodingUnavailable`] unless FFmpeg can run.
    /// Video jobs call this before doing any extraction or render work.
    pub fn ensure_available() -> FxResult<()> {
        if Self::is_available() {
            Ok(())
        } else {
            Err(FxError::EncodingUnavailable(
                "ffmpeg not found in PATH. Install FFmpeg: https://ffmpeg.org/download.html".into(),
            ))
        }
    }

    /// Encode an ordered sequence of RGBA frame buffers to an MP4 file.
    ///
    /// All frames must share `width x height`; `fps` fixes both the input
    /// pacing and the container frame rate.
    pub fn encode(
        frames: &[FrameBuffer],
        width: u32,
        height: u32,
        fps: f64,
        output_path: &Path,
    ) -> FxResult<()> {
        if frames.is_empty() {
            return Err(FxError::job("encoding", "no frames to encode"));
        }

        Self::ensure_available()?;

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let result = Self::run_ffmpeg(frames, width, height, fps, output_path);
        if result.is_err() {
            // Discard partial output; a failed job returns nothing.
            let _ = std::fs::remove_file(output_path);
        }
        result
    }

    fn run_ffmpeg(
        frames: &[FrameBuffer],
        width: u32,
        height: u32,
        fps: f64,
        output_path: &Path,
    ) -> FxResult<()> {
        let fps_str = format!("{}", fps);

        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-y"); // Overwrite output

        // Raw RGBA frames arrive on stdin.
        cmd.args([
            "-f", "rawvideo",
            "-pixel_format", "rgba",
            "-video_size", &format!("{}x{}", width, height),
            "-framerate", &fps_str,
            "-i", "-",
        ]);

        cmd.args([
            "-c:v", "libx264",
            "-pix_fmt", "yuv420p",
            "-preset", "medium",
            "-crf", "23",
            "-movflags", "+faststart",
            "-an",
        ]);

        cmd.arg(output_path);

        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| FxError::job("encoding", format!("failed to start ffmpeg: {}", e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| FxError::job("encoding", "failed to open ffmpeg stdin"))?;

        for (i, frame) in frames.iter().enumerate() {
            if frame.width != width || frame.height != height {
                // Kill before stdin closes: an EOF here would let the
                // child finalize the frames it already has and write the
                // output file after the failed job removed it.
                let _ = child.kill();
                let _ = child.wait();
                return Err(FxError::job(
                    "encoding",
                    format!(
                        "frame {} has dimensions {}x{}, expected {}x{}",
                        i, frame.width, frame.height, width, height
                    ),
                ));
            }
            if let Err(e) = stdin.write_all(&frame.data) {
                // Collect FFmpeg's stderr rather than reporting a bare
                // broken pipe.
                let stderr = child
                    .wait_with_output()
                    .map(|o| String::from_utf8_lossy(&o.stderr).into_owned())
                    .unwrap_or_default();
                return Err(FxError::job(
                    "encoding",
                    format!(
                        "failed to write frame {} to ffmpeg: {}. FFmpeg stderr: {}",
                        i, e, stderr
                    ),
                ));
            }
        }

        // Close stdin to signal end of input.
        drop(stdin);

        let output = child
            .wait_with_output()
            .map_err(|e| FxError::job("encoding", format!("ffmpeg process error: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FxError::job(
                "encoding",
                format!("ffmpeg failed with status {}: {}", output.status, stderr),
            ));
        }

        tracing::info!(
            "encoded {} frames to {} ({}x{} @ {}fps)",
            frames.len(),
            output_path.display(),
            width,
            height,
            fps
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffmpeg_availability_check_does_not_panic() {
        // May be true or false depending on the system.
        let _available = FfmpegEncoder::is_available();
    }

    #[test]
    fn test_encode_empty_frames() {
        let dir = tempfile::tempdir().unwrap();
        let result = FfmpegEncoder::encode(&[], 320, 240, 15.0, &dir.path().join("out.mp4"));
        assert!(result.is_err());
    }

    #[test]
    fn test_encode_dimension_mismatch() {
        if !FfmpegEncoder::is_available() {
            eprintln!("skipping: ffmpeg not installed");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.mp4");
        let frames = vec![FrameBuffer::new(16, 16), FrameBuffer::new(8, 8)];
        let err = FfmpegEncoder::encode(&frames, 16, 16, 15.0, &out).unwrap_err();
        assert!(matches!(err, FxError::JobFailed { .. }));
        // Partial output is discarded, and the encoder process is reaped
        // before cleanup: no late write may resurrect the file either.
        assert!(!out.exists());
        std::thread::sleep(std::time::Duration::from_millis(500));
        assert!(!out.exists());
    }

    #[test]
    fn test_encode_roundtrip_when_ffmpeg_present() {
        if !FfmpegEncoder::is_available() {
            eprintln!("skipping: ffmpeg not installed");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.mp4");
        let frames: Vec<FrameBuffer> = (0..15)
            .map(|i| FrameBuffer::solid(64, 64, [i as u8 * 16, 0, 255 - i as u8 * 16, 255]))
            .collect();
        FfmpegEncoder::encode(&frames, 64, 64, 15.0, &out).unwrap();
        assert!(out.exists());
        assert!(std::fs::metadata(&out).unwrap().len() > 0);
    }
}
