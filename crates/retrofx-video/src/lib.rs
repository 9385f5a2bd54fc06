//! # retrofx-video
//!
//! The video side of the engine: probes source videos, extracts frames at
//! a fixed sampling rate through one sequential decode cursor, renders
//! each frame through the GPU engine, and streams the result into the
//! FFmpeg encoder. One transcoder drives one job at a time.

pub mod decoder;
pub mod transcoder;

pub use decoder::{FrameExtractor, VideoInfo};
pub use transcoder::{JobStage, TranscodeOptions, TranscodeReport, VideoTranscoder};
