//! # retrofx-render
//!
//! The RetroFX rendering engine. Owns the one GPU context per engine
//! instance, the effect kernel registry, the program and texture caches,
//! and the source loader. Produces lossless still-image bytes (or raw
//! frame buffers for the video path) from a decoded bitmap plus an
//! [`EffectSettings`](retrofx_core::EffectSettings) record.
//!
//! All render calls against one engine instance are serialized through
//! `&mut` receivers; source loading is the only concern safe to share
//! across threads.

pub mod engine;
pub mod gpu;
pub mod registry;
pub mod source;
pub mod texture_cache;
pub mod uniforms;

pub use engine::FxEngine;
pub use gpu::GpuContext;
pub use registry::ProgramKey;
pub use source::{SourceLoader, SourceRef};
