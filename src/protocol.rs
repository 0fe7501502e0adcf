//! Shared protocol constants for the wordstream transfer header

// Protocol header constants
pub const MAGIC: &[u8; 4] = b"WSTR";
pub const VERSION: u16 = 1;

/// Header layout: MAGIC (4) | VERSION (2) | ALGO (1) | RESERVED (1) | SIZE (8) | DIGEST (32)
pub const HEADER_LEN: usize = 4 + 2 + 1 + 1 + 8 + DIGEST_LEN;

/// Every supported checksum produces a 32-byte digest
pub const DIGEST_LEN: usize = 32;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 9001;

// Chunk bounds. The sender may pick any size in range; the receiver never
// assumes alignment with text or word boundaries.
pub const MIN_CHUNK_SIZE: usize = 1;
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024;
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Client-side socket read buffer
pub const DEFAULT_READ_BUFFER: usize = 8192;

/// Number of words in the final report
pub const DEFAULT_TOP_K: usize = 10;

// Checksum algorithm ids carried in the ALGO header byte
pub mod algo {
    pub const SHA256: u8 = 0;
    pub const BLAKE3: u8 = 1;
}

// Centralized timeout constants for server and client paths
pub mod timeouts {
    // Connection establishment timeout (ms)
    pub const CONNECT_MS: u64 = 2_000;

    // Header read timeout once connected (ms)
    pub const HEADER_MS: u64 = 2_000;

    // Base timeout for writes (ms)
    pub const WRITE_BASE_MS: u64 = 5_000;

    // Additional timeout per MB of data (ms)
    pub const PER_MB_MS: u64 = 1;

    // Upper bound on one endpoint's whole transfer (ms)
    pub const TRANSFER_MS: u64 = 30_000;

    // Calculate write deadline based on payload size (ms)
    // 5s base + 1ms per 1MB payload (ceil)
    pub fn write_deadline_ms(payload_len: usize) -> u64 {
        let mb = (payload_len as u64 + 1_048_575) / 1_048_576;
        WRITE_BASE_MS + mb * PER_MB_MS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_len_matches_layout() {
        assert_eq!(HEADER_LEN, 48);
    }

    #[test]
    fn write_deadline_scales_per_megabyte() {
        assert_eq!(timeouts::write_deadline_ms(0), timeouts::WRITE_BASE_MS);
        assert_eq!(timeouts::write_deadline_ms(1), timeouts::WRITE_BASE_MS + 1);
        assert_eq!(timeouts::write_deadline_ms(1_048_576), timeouts::WRITE_BASE_MS + 1);
        assert_eq!(timeouts::write_deadline_ms(1_048_577), timeouts::WRITE_BASE_MS + 2);
    }
}
