//! The transcoder job state machine.
//!
//! One job walks `Idle → LoadingSource → ExtractingFrames →
//! RenderingFrames → Encoding → Done`, or stops at `Failed`. Frames are
//! extracted, rendered, and encoded strictly in timestamp order; nothing
//! is reordered or dropped once accepted, and extraction stops at the
//! duration cap. Failure at any stage aborts the remaining stages and
//! discards partial output.

use std::path::Path;

use retrofx_core::{EffectSettings, EngineConfig, FrameBuffer, FxError, FxResult};
use retrofx_encode::FfmpegEncoder;
use retrofx_render::FxEngine;

use crate::decoder::FrameExtractor;

/// Stages of a transcode job, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Idle,
    LoadingSource,
    ExtractingFrames,
    RenderingFrames,
    Encoding,
    Done,
    Failed,
}

impl std::fmt::Display for JobStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobStage::Idle => "idle",
            JobStage::LoadingSource => "loading-source",
            JobStage::ExtractingFrames => "extracting-frames",
            JobStage::RenderingFrames => "rendering-frames",
            JobStage::Encoding => "encoding",
            JobStage::Done => "done",
            JobStage::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Per-job knobs. The defaults are deliberately conservative to bound
/// total GPU and encode work per job.
#[derive(Debug, Clone)]
pub struct TranscodeOptions {
    /// Frame sampling rate.
    pub fps: f64,
    /// Cap on the transcoded duration in seconds.
    pub max_duration_secs: f64,
    /// Output width; the source's native width when None.
    pub output_width: Option<u32>,
    /// Output height; the source's native height when None.
    pub output_height: Option<u32>,
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self {
            fps: 15.0,
            max_duration_secs: 5.0,
            output_width: None,
            output_height: None,
        }
    }
}

impl TranscodeOptions {
    /// Options taken from an engine config.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            fps: config.video.fps,
            max_duration_secs: config.video.max_duration_secs,
            ..Default::default()
        }
    }
}

/// Summary of a finished job.
#[derive(Debug, Clone)]
pub struct TranscodeReport {
    /// Frames extracted, rendered, and encoded.
    pub frame_count: u64,
    /// Output dimensions.
    pub width: u32,
    pub height: u32,
    /// Container frame rate.
    pub fps: f64,
    /// Transcoded duration in seconds (after the cap).
    pub duration_secs: f64,
}

/// Number of frames a job covers: `ceil(duration * fps)`, never more.
pub fn frame_count(duration_secs: f64, fps: f64) -> u64 {
    (duration_secs * fps).ceil() as u64
}

/// Drives transcode jobs. One at a time: the extractor's decode cursor
/// and the engine's GPU state are both serialized through `&mut`.
pub struct VideoTranscoder {
    extractor: FrameExtractor,
}

impl VideoTranscoder {
    pub fn new() -> Self {
        Self {
            extractor: FrameExtractor::new(),
        }
    }

    /// Transcode `source` with `settings` into an MP4 at `output_path`.
    pub fn transcode(
        &mut self,
        engine: &mut FxEngine,
        source: &Path,
        settings: &EffectSettings,
        options: &TranscodeOptions,
        output_path: &Path,
    ) -> FxResult<TranscodeReport> {
        // A missing encoder fails the job before any extraction or GPU
        // work is spent.
        FfmpegEncoder::ensure_available()?;

        let mut stage = JobStage::LoadingSource;
        tracing::info!(source = %source.display(), %stage, "transcode job started");

        let info = self
            .extractor
            .probe(source)
            .map_err(|e| fail(stage, e))?;

        let duration = info.duration_secs.min(options.max_duration_secs);
        let total_frames = frame_count(duration, options.fps);
        if total_frames == 0 {
            return Err(fail_msg(stage, "source has no playable duration"));
        }

        let width = options.output_width.unwrap_or(info.width);
        let height = options.output_height.unwrap_or(info.height);
        let source_key = source.to_string_lossy();

        stage = JobStage::ExtractingFrames;
        tracing::info!(%stage, total_frames, duration, "extracting frames");
        let mut extracted: Vec<FrameBuffer> = Vec::with_capacity(total_frames as usize);
        for index in 0..total_frames {
            let timestamp = index as f64 / options.fps;
            let frame = self
                .extractor
                .extract_frame(source, timestamp, width, height)
                .map_err(|e| fail(stage, e))?;
            extracted.push(frame);
        }

        stage = JobStage::RenderingFrames;
        tracing::info!(%stage, "rendering frames");
        let mut rendered: Vec<FrameBuffer> = Vec::with_capacity(extracted.len());
        for (index, frame) in extracted.iter().enumerate() {
            // Same settings every frame; only the time axis advances.
            let frame_settings = settings.at_time((index as f64 / options.fps) as f32);
            let key = format!("{}#f{}", source_key, index);
            let out = engine
                .render_to_buffer(frame, &key, width, height, &frame_settings)
                .map_err(|e| fail(stage, e))?;
            rendered.push(out);
        }
        drop(extracted);

        stage = JobStage::Encoding;
        tracing::info!(%stage, frames = rendered.len(), "encoding");
        FfmpegEncoder::encode(&rendered, width, height, options.fps, output_path)
            .map_err(|e| fail(stage, e))?;

        tracing::info!(stage = %JobStage::Done, "transcode job finished");
        Ok(TranscodeReport {
            frame_count: total_frames,
            width,
            height,
            fps: options.fps,
            duration_secs: duration,
        })
    }

    /// Transcode into an in-memory byte stream, for callers that persist
    /// or upload the result themselves.
    pub fn transcode_to_bytes(
        &mut self,
        engine: &mut FxEngine,
        source: &Path,
        settings: &EffectSettings,
        options: &TranscodeOptions,
    ) -> FxResult<(Vec<u8>, TranscodeReport)> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.mp4");
        let report = self.transcode(engine, source, settings, options, &path)?;
        let bytes = std::fs::read(&path)?;
        Ok((bytes, report))
    }
}

impl Default for VideoTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrap an in-flight error with the stage it happened in. Errors that are
/// already typed for the caller (hardware, shader, source, encoder
/// availability) pass through unwrapped.
fn fail(stage: JobStage, err: FxError) -> FxError {
    match err {
        FxError::UnsupportedHardware(_)
        | FxError::ShaderCompilation { .. }
        | FxError::SourceUnavailable { .. }
        | FxError::EncodingUnavailable(_)
        | FxError::JobFailed { .. } => err,
        other => FxError::job(stage.to_string(), other.to_string()),
    }
}

fn fail_msg(stage: JobStage, message: &str) -> FxError {
    FxError::job(stage.to_string(), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrofx_core::EffectType;

    #[test]
    fn test_frame_count_caps_long_sources() {
        // 10-second source with fps=15, max=5 → exactly 75 frames.
        let duration = f64::min(10.0, 5.0);
        assert_eq!(frame_count(duration, 15.0), 75);
    }

    #[test]
    fn test_frame_count_rounds_up() {
        assert_eq!(frame_count(1.05, 15.0), 16);
        assert_eq!(frame_count(0.01, 15.0), 1);
        assert_eq!(frame_count(0.0, 15.0), 0);
    }

    #[test]
    fn test_default_options_are_conservative() {
        let opts = TranscodeOptions::default();
        assert_eq!(opts.fps, 15.0);
        assert_eq!(opts.max_duration_secs, 5.0);
        assert_eq!(frame_count(opts.max_duration_secs, opts.fps), 75);
    }

    #[test]
    fn test_options_from_config() {
        let mut config = EngineConfig::default();
        config.video.fps = 10.0;
        config.video.max_duration_secs = 2.0;
        let opts = TranscodeOptions::from_config(&config);
        assert_eq!(opts.fps, 10.0);
        assert_eq!(opts.max_duration_secs, 2.0);
    }

    #[test]
    fn test_stage_display_names() {
        assert_eq!(JobStage::ExtractingFrames.to_string(), "extracting-frames");
        assert_eq!(JobStage::Done.to_string(), "done");
    }

    #[test]
    fn test_fail_wraps_untyped_errors_only() {
        let typed = fail(
            JobStage::ExtractingFrames,
            FxError::source_unavailable("a.mp4", "gone"),
        );
        assert!(matches!(typed, FxError::SourceUnavailable { .. }));

        let untyped = fail(
            JobStage::RenderingFrames,
            FxError::Decode("boom".into()),
        );
        match untyped {
            FxError::JobFailed { stage, .. } => assert_eq!(stage, "rendering-frames"),
            other => panic!("expected JobFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_source_fails_job_with_typed_error() {
        if !FfmpegEncoder::is_available() {
            eprintln!("skipping: ffmpeg not installed");
            return;
        }
        let Ok(mut engine) = FxEngine::new() else {
            eprintln!("skipping: no GPU adapter");
            return;
        };
        let mut transcoder = VideoTranscoder::new();
        let err = transcoder
            .transcode(
                &mut engine,
                Path::new("/nonexistent/clip.mp4"),
                &EffectSettings::default_for(EffectType::Duotone),
                &TranscodeOptions::default(),
                Path::new("/tmp/retrofx-never-written.mp4"),
            )
            .unwrap_err();
        assert!(matches!(err, FxError::SourceUnavailable { .. }));
    }
}
