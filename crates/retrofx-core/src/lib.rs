//! # retrofx-core
//!
//! Core types and primitives for the RetroFX effect engine.
//! This crate contains foundational types shared across all RetroFX crates:
//! frame buffers, effect settings, content hashing, config, and error types.

pub mod config;
pub mod error;
pub mod frame;
pub mod hash;
pub mod settings;

pub use config::EngineConfig;
pub use error::{FxError, FxResult};
pub use frame::FrameBuffer;
pub use hash::ContentHash;
pub use settings::{EffectSettings, EffectType, HalftoneShape};
