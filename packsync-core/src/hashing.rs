//! Hashing System - SHA-256 digests for diagnostics and archives

use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{PipelineError, Result};

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Compute SHA-256 hash of a file's contents
pub fn file_sha256(path: &Path) -> Result<String> {
    let data = fs::read(path).map_err(|e| PipelineError::io(path, e))?;
    Ok(sha256_hex(&data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        let data = b"void main() {}";
        assert_eq!(sha256_hex(data), sha256_hex(data));
    }

    #[test]
    fn test_hash_known_value() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_file_hash_matches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.fsh");
        fs::write(&path, b"X").unwrap();
        assert_eq!(file_sha256(&path).unwrap(), sha256_hex(b"X"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = file_sha256(&dir.path().join("nope")).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Io);
    }
}
