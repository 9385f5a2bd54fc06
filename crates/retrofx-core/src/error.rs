/// Core error types for the RetroFX engine.

/// A specialized Result type for RetroFX operations.
pub type FxResult<T> = Result<T, FxError>;

/// Top-level error type encompassing all RetroFX subsystems.
///
/// Caching layers never swallow these: a miss that fails to resolve
/// propagates immediately and leaves the cache unchanged. The engine
/// performs no automatic retries; retry policy is a caller concern.
#[derive(Debug, thiserror::Error)]
pub enum FxError {
    /// No compatible GPU adapter or device could be created.
    /// Fatal: the engine is unusable in this process.
    #[error("unsupported hardware: {0}")]
    UnsupportedHardware(String),

    /// Shader compilation or pipeline linking failed for one effect key.
    /// Fatal for that key: the effect stays unavailable this process.
    #[error("shader compilation failed for '{key}': {message}")]
    ShaderCompilation { key: String, message: String },

    /// A source reference could not be fetched or decoded.
    /// Recoverable at the call site with a different reference.
    #[error("source unavailable: '{reference}': {message}")]
    SourceUnavailable { reference: String, message: String },

    /// No working video encoder on this system. Video jobs fail;
    /// still-image rendering is unaffected.
    #[error("video encoding unavailable: {0}")]
    EncodingUnavailable(String),

    /// Any other in-flight video-job error. Partial output is discarded.
    #[error("video job failed during {stage}: {message}")]
    JobFailed { stage: String, message: String },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FxError {
    /// Create a source error carrying the original reference for diagnostics.
    pub fn source_unavailable(reference: impl Into<String>, message: impl Into<String>) -> Self {
        FxError::SourceUnavailable {
            reference: reference.into(),
            message: message.into(),
        }
    }

    /// Create a shader error for one `(effect, variant)` key.
    pub fn shader(key: impl Into<String>, message: impl Into<String>) -> Self {
        FxError::ShaderCompilation {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a video-job error tagged with the stage it failed in.
    pub fn job(stage: impl Into<String>, message: impl Into<String>) -> Self {
        FxError::JobFailed {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_display() {
        let err = FxError::source_unavailable("https://cdn.example/a.png", "relay returned 404");
        assert_eq!(
            err.to_string(),
            "source unavailable: 'https://cdn.example/a.png': relay returned 404"
        );
    }

    #[test]
    fn test_shader_error_display() {
        let err = FxError::shader("halftone:ellipse", "expression has no type");
        assert!(err.to_string().contains("halftone:ellipse"));
    }

    #[test]
    fn test_job_error_display() {
        let err = FxError::job("extracting-frames", "seek past end of stream");
        assert!(err.to_string().contains("extracting-frames"));
    }
}
