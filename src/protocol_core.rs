//! Header encoding and the validation shared by server, client and config.

use std::path::{Component, Path};

use crate::checksum::{ChecksumType, Digest};
use crate::error::{ConfigError, ProtocolError};
use crate::protocol::{DIGEST_LEN, HEADER_LEN, MAGIC, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE, VERSION};

/// Sent once per connection, ahead of the body.
/// `checksum` covers exactly the `size` bytes that follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTransferHeader {
    pub size: u64,
    pub algorithm: ChecksumType,
    pub checksum: Digest,
}

impl FileTransferHeader {
    /// Format: MAGIC (4) | VERSION (2) | ALGO (1) | RESERVED (1) | SIZE (8) | DIGEST (32)
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut header = [0u8; HEADER_LEN];
        header[0..4].copy_from_slice(MAGIC);
        header[4..6].copy_from_slice(&VERSION.to_le_bytes());
        header[6] = self.algorithm.wire_id();
        header[7] = 0;
        header[8..16].copy_from_slice(&self.size.to_le_bytes());
        header[16..16 + DIGEST_LEN].copy_from_slice(self.checksum.as_bytes());
        header
    }

    pub fn decode(header: &[u8; HEADER_LEN]) -> Result<Self, ProtocolError> {
        if &header[0..4] != MAGIC {
            return Err(ProtocolError::BadMagic);
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != VERSION {
            return Err(ProtocolError::Version {
                got: version,
                expected: VERSION,
            });
        }

        let algorithm = ChecksumType::from_wire_id(header[6])
            .ok_or(ProtocolError::UnknownAlgorithm(header[6]))?;

        let mut size = [0u8; 8];
        size.copy_from_slice(&header[8..16]);
        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(&header[16..16 + DIGEST_LEN]);

        Ok(Self {
            size: u64::from_le_bytes(size),
            algorithm,
            checksum: Digest::from_bytes(digest),
        })
    }
}

pub fn validate_chunk_size(size: usize) -> Result<(), ConfigError> {
    if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&size) {
        return Err(ConfigError::ChunkSize {
            value: size,
            min: MIN_CHUNK_SIZE,
            max: MAX_CHUNK_SIZE,
        });
    }
    Ok(())
}

/// Check that a path is safe to serve.
/// 1. Rejects empty paths and NUL bytes
/// 2. Rejects parent directory components (traversal)
/// 3. Requires an existing regular file
pub fn validate_file_path(path: &Path) -> Result<(), ConfigError> {
    let reject = |reason: &str| ConfigError::FilePath {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    if path.as_os_str().is_empty() {
        return Err(reject("path is empty"));
    }
    if path.to_string_lossy().contains('\0') {
        return Err(reject("path contains NUL byte"));
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(reject("path contains parent directory component"));
    }

    let metadata = std::fs::metadata(path).map_err(|e| reject(&e.to_string()))?;
    if !metadata.is_file() {
        return Err(reject("not a regular file"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::StreamingChecksum;
    use std::fs;
    use tempfile::TempDir;

    fn sample_header() -> FileTransferHeader {
        let mut hasher = StreamingChecksum::new(ChecksumType::Sha256);
        hasher.update(b"the cat sat on the mat");
        FileTransferHeader {
            size: 22,
            algorithm: ChecksumType::Sha256,
            checksum: hasher.finalize(),
        }
    }

    #[test]
    fn test_header_round_trip() {
        let header = sample_header();
        let encoded = header.encode();
        assert_eq!(FileTransferHeader::decode(&encoded).unwrap(), header);
    }

    #[test]
    fn test_header_size_is_little_endian() {
        let mut header = sample_header();
        header.size = 0x0102;
        let encoded = header.encode();
        assert_eq!(&encoded[8..10], &[0x02, 0x01]);
        assert!(encoded[10..16].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_decode_invalid_magic() {
        let mut encoded = sample_header().encode();
        encoded[0..4].copy_from_slice(b"WRNG");
        assert_eq!(
            FileTransferHeader::decode(&encoded),
            Err(ProtocolError::BadMagic)
        );
    }

    #[test]
    fn test_decode_wrong_version() {
        let mut encoded = sample_header().encode();
        encoded[4..6].copy_from_slice(&999u16.to_le_bytes());
        assert!(matches!(
            FileTransferHeader::decode(&encoded),
            Err(ProtocolError::Version { got: 999, .. })
        ));
    }

    #[test]
    fn test_decode_unknown_algorithm() {
        let mut encoded = sample_header().encode();
        encoded[6] = 7;
        assert_eq!(
            FileTransferHeader::decode(&encoded),
            Err(ProtocolError::UnknownAlgorithm(7))
        );
    }

    #[test]
    fn test_validate_chunk_size_edge_cases() {
        assert!(validate_chunk_size(0).is_err());
        assert!(validate_chunk_size(1).is_ok());
        assert!(validate_chunk_size(8).is_ok());
        assert!(validate_chunk_size(MAX_CHUNK_SIZE).is_ok());
        assert!(validate_chunk_size(MAX_CHUNK_SIZE + 1).is_err());
    }

    #[test]
    fn test_validate_file_path_accepts_regular_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("book.txt");
        fs::write(&file, "call me ishmael").unwrap();
        assert!(validate_file_path(&file).is_ok());
    }

    #[test]
    fn test_validate_file_path_rejects_unsafe_paths() {
        let temp_dir = TempDir::new().unwrap();

        assert!(validate_file_path(Path::new("")).is_err());
        assert!(validate_file_path(Path::new("../../../etc/passwd")).is_err());
        assert!(validate_file_path(Path::new("file\0.txt")).is_err());
        assert!(validate_file_path(&temp_dir.path().join("missing.txt")).is_err());
        // Directory, not a file
        assert!(validate_file_path(temp_dir.path()).is_err());
    }
}
