//! # retrofx-encode
//!
//! Encoding module — converts rendered frame buffers into an H.264/MP4
//! video file by streaming raw RGBA frames to FFmpeg. The encoder accepts
//! the frame sequence directly and preserves strict submission order; no
//! live-capture pacing is involved.

pub mod ffmpeg;

pub use ffmpeg::FfmpegEncoder;
