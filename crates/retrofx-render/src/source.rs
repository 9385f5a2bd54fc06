//! Source loading: resolves an image reference into a decoded RGBA frame.
//!
//! Inline bytes are decoded directly; remote URLs go through the
//! configured same-origin relay (which returns base64 bytes) or a direct
//! fetch when no relay is set; an already-decoded frame passes through
//! untouched. Results are memoized by the exact reference key, so
//! repeated renders of one source skip network and decode work. Loading
//! touches no GPU state and is safe to share across threads.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use dashmap::DashMap;
use serde::Deserialize;

use retrofx_core::{hash, FrameBuffer, FxError, FxResult};

/// An image reference at the engine boundary.
#[derive(Debug, Clone)]
pub enum SourceRef {
    /// Inline encoded image bytes (PNG, JPEG, WebP, ...).
    Bytes(Vec<u8>),
    /// Remote image URL.
    Url(String),
    /// An already-decoded frame; used directly, never memoized.
    Frame(FrameBuffer),
}

impl SourceRef {
    /// Stable identity string for memoization and texture-cache keying.
    pub fn cache_key(&self) -> String {
        match self {
            SourceRef::Bytes(data) => format!("bytes:{}", hash::hash_bytes(data).to_hex()),
            SourceRef::Url(url) => format!("url:{}", url),
            SourceRef::Frame(frame) => {
                format!("frame:{}x{}:{}", frame.width, frame.height, hash::hash_frame(frame))
            }
        }
    }

    /// Short human-readable form for error messages.
    fn describe(&self) -> String {
        match self {
            SourceRef::Bytes(data) => format!("<{} inline bytes>", data.len()),
            SourceRef::Url(url) => url.clone(),
            SourceRef::Frame(frame) => format!("<{}x{} frame>", frame.width, frame.height),
        }
    }
}

/// Wire form of the relay response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelayResponse {
    base64: String,
    #[allow(dead_code)]
    mime_type: Option<String>,
}

pub struct SourceLoader {
    relay_endpoint: Option<String>,
    http: reqwest::blocking::Client,
    cache: DashMap<String, FrameBuffer>,
}

impl SourceLoader {
    /// Create a loader. When `relay_endpoint` is set, URL sources are
    /// fetched through it (`GET endpoint?url=...` returning
    /// `{ base64, mimeType }`); otherwise URLs are fetched directly.
    pub fn new(relay_endpoint: Option<String>) -> Self {
        Self {
            relay_endpoint,
            http: reqwest::blocking::Client::new(),
            cache: DashMap::new(),
        }
    }

    /// Resolve a reference into a decoded bitmap.
    ///
    /// Failures are never retried here and never cached: a later call
    /// with the same reference starts from scratch.
    pub fn resolve(&self, source: &SourceRef) -> FxResult<FrameBuffer> {
        if let SourceRef::Frame(frame) = source {
            return Ok(frame.clone());
        }

        let key = source.cache_key();
        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!(key, "source cache hit");
            return Ok(cached.clone());
        }

        let frame = match source {
            SourceRef::Bytes(data) => decode_image(data, &source.describe())?,
            SourceRef::Url(url) => {
                let bytes = self.fetch(url)?;
                decode_image(&bytes, url)?
            }
            SourceRef::Frame(_) => unreachable!("handled above"),
        };

        self.cache.insert(key, frame.clone());
        Ok(frame)
    }

    /// Number of memoized sources.
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    fn fetch(&self, url: &str) -> FxResult<Vec<u8>> {
        match &self.relay_endpoint {
            Some(endpoint) => {
                tracing::debug!(url, endpoint, "fetching source via relay");
                let response = self
                    .http
                    .get(endpoint)
                    .query(&[("url", url)])
                    .send()
                    .map_err(|e| FxError::source_unavailable(url, format!("relay error: {}", e)))?;

                let status = response.status();
                if !status.is_success() {
                    return Err(FxError::source_unavailable(
                        url,
                        format!("relay returned {}", status),
                    ));
                }

                let body: RelayResponse = response.json().map_err(|e| {
                    FxError::source_unavailable(url, format!("invalid relay payload: {}", e))
                })?;
                BASE64.decode(body.base64.as_bytes()).map_err(|e| {
                    FxError::source_unavailable(url, format!("invalid relay base64: {}", e))
                })
            }
            None => {
                tracing::debug!(url, "fetching source directly");
                let response = self
                    .http
                    .get(url)
                    .send()
                    .map_err(|e| FxError::source_unavailable(url, format!("fetch error: {}", e)))?;

                let status = response.status();
                if !status.is_success() {
                    return Err(FxError::source_unavailable(
                        url,
                        format!("fetch returned {}", status),
                    ));
                }

                response
                    .bytes()
                    .map(|b| b.to_vec())
                    .map_err(|e| FxError::source_unavailable(url, format!("read error: {}", e)))
            }
        }
    }
}

fn decode_image(data: &[u8], reference: &str) -> FxResult<FrameBuffer> {
    let img = image::load_from_memory(data)
        .map_err(|e| FxError::source_unavailable(reference, format!("decode failed: {}", e)))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    Ok(FrameBuffer {
        data: rgba.into_raw(),
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    /// Serve one HTTP response on an ephemeral port, then exit.
    fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf);
                let response = format!(
                    "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{}", addr)
    }

    fn png_fixture() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([128, 128, 128, 255]));
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();
        bytes
    }

    #[test]
    fn test_inline_bytes_decode_and_memoize() {
        let loader = SourceLoader::new(None);
        let source = SourceRef::Bytes(png_fixture());

        let frame = loader.resolve(&source).unwrap();
        assert_eq!((frame.width, frame.height), (4, 4));
        assert_eq!(frame.get_pixel(0, 0), Some([128, 128, 128, 255]));
        assert_eq!(loader.cache_size(), 1);

        let again = loader.resolve(&source).unwrap();
        assert_eq!(frame, again);
        assert_eq!(loader.cache_size(), 1);
    }

    #[test]
    fn test_frame_passthrough_not_memoized() {
        let loader = SourceLoader::new(None);
        let frame = FrameBuffer::solid(2, 2, [1, 2, 3, 255]);
        let resolved = loader.resolve(&SourceRef::Frame(frame.clone())).unwrap();
        assert_eq!(resolved, frame);
        assert_eq!(loader.cache_size(), 0);
    }

    #[test]
    fn test_undecodable_bytes_are_source_unavailable() {
        let loader = SourceLoader::new(None);
        let err = loader
            .resolve(&SourceRef::Bytes(b"not an image".to_vec()))
            .unwrap_err();
        assert!(matches!(err, FxError::SourceUnavailable { .. }));
        assert_eq!(loader.cache_size(), 0);
    }

    #[test]
    fn test_relay_404_is_source_unavailable_and_nothing_cached() {
        let endpoint = serve_once("HTTP/1.1 404 Not Found", "{}");
        let loader = SourceLoader::new(Some(endpoint));
        let err = loader
            .resolve(&SourceRef::Url("https://cdn.example/a.png".into()))
            .unwrap_err();
        match err {
            FxError::SourceUnavailable { reference, message } => {
                assert_eq!(reference, "https://cdn.example/a.png");
                assert!(message.contains("404"), "message: {}", message);
            }
            other => panic!("expected SourceUnavailable, got {:?}", other),
        }
        assert_eq!(loader.cache_size(), 0);
    }

    #[test]
    fn test_relay_bad_payload_is_source_unavailable() {
        let endpoint = serve_once("HTTP/1.1 200 OK", r#"{"base64": "!!!not-base64!!!"}"#);
        let loader = SourceLoader::new(Some(endpoint));
        let err = loader
            .resolve(&SourceRef::Url("https://cdn.example/b.png".into()))
            .unwrap_err();
        assert!(matches!(err, FxError::SourceUnavailable { .. }));
        assert_eq!(loader.cache_size(), 0);
    }

    #[test]
    fn test_cache_keys_distinguish_sources() {
        let a = SourceRef::Bytes(vec![1, 2, 3]);
        let b = SourceRef::Bytes(vec![1, 2, 4]);
        let u = SourceRef::Url("https://cdn.example/a.png".into());
        assert_ne!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), u.cache_key());
        // Identical content yields an identical key.
        assert_eq!(a.cache_key(), SourceRef::Bytes(vec![1, 2, 3]).cache_key());
    }
}
