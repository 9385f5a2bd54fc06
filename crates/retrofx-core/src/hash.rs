//! Content hashing for cache keys and deterministic-output verification.
//!
//! Produces a SHA-256 hash over raw bytes or frame buffers. Inline image
//! sources are memoized under their content hash, and tests use frame
//! hashes to assert bit-exact render output across runs.

use sha2::{Digest, Sha256};

use crate::frame::FrameBuffer;

/// A content hash digest (SHA-256, 32 bytes).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash {
    bytes: [u8; 32],
}

impl ContentHash {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Get the hash as a hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Compute the content hash of an arbitrary byte slice.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
    let result = Sha256::digest(data);
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&result);
    ContentHash::from_bytes(bytes)
}

/// Compute the content hash of a single frame buffer.
pub fn hash_frame(frame: &FrameBuffer) -> ContentHash {
    let mut hasher = Sha256::new();
    // Dimensions participate so differently shaped buffers with identical
    // pixel bytes hash differently.
    hasher.update(frame.width.to_le_bytes());
    hasher.update(frame.height.to_le_bytes());
    hasher.update(&frame.data);
    let result = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&result);
    ContentHash::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        let frame1 = FrameBuffer::solid(10, 10, [255, 0, 0, 255]);
        let frame2 = FrameBuffer::solid(10, 10, [255, 0, 0, 255]);
        assert_eq!(hash_frame(&frame1), hash_frame(&frame2));
    }

    #[test]
    fn test_hash_different_content() {
        let frame1 = FrameBuffer::solid(10, 10, [255, 0, 0, 255]);
        let frame2 = FrameBuffer::solid(10, 10, [0, 0, 255, 255]);
        assert_ne!(hash_frame(&frame1), hash_frame(&frame2));
    }

    #[test]
    fn test_hash_different_size() {
        let frame1 = FrameBuffer::new(10, 10);
        let frame2 = FrameBuffer::new(20, 5);
        assert_ne!(hash_frame(&frame1), hash_frame(&frame2));
    }

    #[test]
    fn test_hash_bytes_hex_format() {
        let hash = hash_bytes(b"retrofx");
        let hex = hash.to_hex();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(format!("{}", hash), hex);
    }
}
