//! Error taxonomy shared by the server, the client and the config loader

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::client::Transfer;
use crate::endpoint::Endpoint;

/// Configuration rejected at load time, before any socket is opened
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("host cannot be empty")]
    EmptyHost,

    #[error("chunk size must be between {min} and {max}, got {value}")]
    ChunkSize { value: usize, min: usize, max: usize },

    #[error("invalid or inaccessible file path {path}: {reason}")]
    FilePath { path: PathBuf, reason: String },

    #[error("invalid endpoint {input:?}: {reason}")]
    Endpoint { input: String, reason: String },

    #[error("at least one endpoint is required")]
    NoEndpoints,

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

/// Fatal at process level: the server never binds when this is returned
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
}

/// Header malformed, or the body disagrees with the header
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("invalid magic in transfer header")]
    BadMagic,

    #[error("protocol version mismatch: got {got}, expected {expected}")]
    Version { got: u16, expected: u16 },

    #[error("unknown checksum algorithm id {0}")]
    UnknownAlgorithm(u8),

    #[error("connection closed after {received} of {expected} header bytes")]
    TruncatedHeader { received: usize, expected: usize },

    #[error("declared size {expected} bytes but received {received}")]
    SizeMismatch { expected: u64, received: u64 },
}

/// UTF-8 stream could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid UTF-8 sequence at byte offset {offset}")]
    InvalidSequence { offset: u64 },

    #[error("stream ended inside a multi-byte character ({pending} trailing bytes)")]
    TruncatedTail { pending: usize },
}

/// Per-endpoint failure. Never escapes the endpoint's own result.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("connect {endpoint}: {source}")]
    Connect {
        endpoint: Endpoint,
        #[source]
        source: io::Error,
    },

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("{stage} timed out after {ms} ms")]
    Timeout { stage: &'static str, ms: u64 },

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("checksum mismatch: computed digest differs from header")]
    Integrity { transfer: Box<Transfer> },

    #[error("decoding error: {source}")]
    Decoding {
        #[source]
        source: DecodeError,
        transfer: Box<Transfer>,
    },

    #[error("endpoint task aborted: {0}")]
    Aborted(String),
}

impl TransferError {
    /// Results gathered before the failure, when the body was fully read
    pub fn partial(&self) -> Option<&Transfer> {
        match self {
            TransferError::Integrity { transfer } => Some(transfer.as_ref()),
            TransferError::Decoding { transfer, .. } => Some(transfer.as_ref()),
            _ => None,
        }
    }

    /// Short stable label used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            TransferError::Connect { .. } | TransferError::Io(_) | TransferError::Timeout { .. } => {
                "connection"
            }
            TransferError::Protocol(_) => "protocol",
            TransferError::Integrity { .. } => "integrity",
            TransferError::Decoding { .. } => "decoding",
            TransferError::Aborted(_) => "aborted",
        }
    }
}
