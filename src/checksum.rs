//! Checksum and hashing utilities

use serde::{Serialize, Serializer};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::io::Read;
use std::path::Path;

use crate::protocol::{algo, DIGEST_LEN};

/// Available checksum algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumType {
    #[default]
    Sha256,
    Blake3,
}

impl ChecksumType {
    pub fn wire_id(self) -> u8 {
        match self {
            ChecksumType::Sha256 => algo::SHA256,
            ChecksumType::Blake3 => algo::BLAKE3,
        }
    }

    pub fn from_wire_id(id: u8) -> Option<Self> {
        match id {
            algo::SHA256 => Some(ChecksumType::Sha256),
            algo::BLAKE3 => Some(ChecksumType::Blake3),
            _ => None,
        }
    }
}

impl fmt::Display for ChecksumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecksumType::Sha256 => f.write_str("sha256"),
            ChecksumType::Blake3 => f.write_str("blake3"),
        }
    }
}

impl std::str::FromStr for ChecksumType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(ChecksumType::Sha256),
            "blake3" => Ok(ChecksumType::Blake3),
            other => Err(format!("unknown checksum algorithm: {other}")),
        }
    }
}

/// Fixed-length content digest
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

enum Hasher {
    Sha256(Sha256),
    Blake3(Box<blake3::Hasher>),
}

/// Incremental checksum: feeding chunks one by one yields the same digest
/// as hashing the concatenation at once.
pub struct StreamingChecksum {
    inner: Hasher,
}

impl StreamingChecksum {
    pub fn new(kind: ChecksumType) -> Self {
        let inner = match kind {
            ChecksumType::Sha256 => Hasher::Sha256(Sha256::new()),
            ChecksumType::Blake3 => Hasher::Blake3(Box::new(blake3::Hasher::new())),
        };
        Self { inner }
    }

    pub fn update(&mut self, data: &[u8]) {
        match &mut self.inner {
            Hasher::Sha256(h) => h.update(data),
            Hasher::Blake3(h) => {
                h.update(data);
            }
        }
    }

    pub fn finalize(self) -> Digest {
        match self.inner {
            Hasher::Sha256(h) => Digest(h.finalize().into()),
            Hasher::Blake3(h) => Digest(*h.finalize().as_bytes()),
        }
    }
}

/// One-shot digest of an in-memory buffer
pub fn digest_bytes(data: &[u8], kind: ChecksumType) -> Digest {
    let mut hasher = StreamingChecksum::new(kind);
    hasher.update(data);
    hasher.finalize()
}

/// Size and digest of a file in a single streaming pass
pub fn digest_file(path: &Path, kind: ChecksumType) -> std::io::Result<(u64, Digest)> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = StreamingChecksum::new(kind);
    let mut buf = vec![0u8; 64 * 1024];
    let mut total = 0u64;
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        total += n as u64;
    }
    Ok((total, hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        let digest = digest_bytes(b"", ChecksumType::Sha256);
        assert_eq!(
            digest.to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        let content = b"This is a test file for hash verification.";
        for kind in [ChecksumType::Sha256, ChecksumType::Blake3] {
            let expected = digest_bytes(content, kind);
            let mut rolling = StreamingChecksum::new(kind);
            for chunk in content.chunks(10) {
                rolling.update(chunk);
            }
            assert_eq!(rolling.finalize(), expected);
        }
    }

    #[test]
    fn test_corrupted_byte_changes_digest() {
        let mut content = b"the cat sat on the mat".to_vec();
        let original = digest_bytes(&content, ChecksumType::Sha256);
        content[4] ^= 0x01;
        assert_ne!(digest_bytes(&content, ChecksumType::Sha256), original);
    }

    #[test]
    fn test_algorithms_differ() {
        let content = b"same bytes";
        assert_ne!(
            digest_bytes(content, ChecksumType::Sha256),
            digest_bytes(content, ChecksumType::Blake3)
        );
    }

    #[test]
    fn test_wire_id_round_trip() {
        for kind in [ChecksumType::Sha256, ChecksumType::Blake3] {
            assert_eq!(ChecksumType::from_wire_id(kind.wire_id()), Some(kind));
        }
        assert_eq!(ChecksumType::from_wire_id(200), None);
    }

    #[test]
    fn test_digest_file_reports_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        std::fs::write(&path, "hello world").unwrap();
        let (size, digest) = digest_file(&path, ChecksumType::Blake3).unwrap();
        assert_eq!(size, 11);
        assert_eq!(digest, digest_bytes(b"hello world", ChecksumType::Blake3));
    }
}
