use serde::{Deserialize, Serialize};

/// Source loading configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SourceConfig {
    /// Same-origin relay endpoint for remote sources whose origin rejects
    /// direct pixel reads. When unset, URLs are fetched directly.
    pub relay_endpoint: Option<String>,
}

/// Video transcoding configuration. Defaults are deliberately conservative
/// to bound total GPU and encode work per job.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VideoConfig {
    /// Frame sampling rate for transcode jobs.
    pub fps: f64,
    /// Cap on the transcoded duration in seconds; longer sources are cut.
    pub max_duration_secs: f64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            fps: 15.0,
            max_duration_secs: 5.0,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub video: VideoConfig,
}

impl EngineConfig {
    pub fn load_from_file(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.video.fps, 15.0);
        assert_eq!(cfg.video.max_duration_secs, 5.0);
        assert!(cfg.source.relay_endpoint.is_none());
    }

    #[test]
    fn test_parse_partial_toml() {
        let cfg: EngineConfig = toml::from_str(
            r#"
[source]
relay_endpoint = "http://localhost:8787/relay"
"#,
        )
        .unwrap();
        assert_eq!(
            cfg.source.relay_endpoint.as_deref(),
            Some("http://localhost:8787/relay")
        );
        // Missing sections fall back to defaults.
        assert_eq!(cfg.video.fps, 15.0);
    }
}
