//! Wordstream Library
//!
//! Checksummed single-file streaming over TCP, with a client that decodes
//! and word-counts several servers concurrently and merges the results.

pub mod checksum;
pub mod cli;
pub mod client;
pub mod config;
pub mod counter;
pub mod decoder;
pub mod endpoint;
pub mod error;
pub mod local;
pub mod logger;
pub mod protocol;
pub mod protocol_core;
pub mod report;
pub mod server;

pub use client::{EndpointResult, MultiServerClient, Transfer};
pub use counter::{FrequencyTable, WordCounter};
pub use decoder::StreamDecoder;
pub use endpoint::Endpoint;
pub use report::SessionReport;
pub use server::FileServer;
