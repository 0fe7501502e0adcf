//! Multi-server client.
//!
//! One task per endpoint, each owning its own decoder, counter and checksum.
//! Every failure is caught at the task boundary and becomes that endpoint's
//! [`EndpointResult`]; the global table is built once, after all tasks end.

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::checksum::{ChecksumType, Digest, StreamingChecksum};
use crate::config::ClientConfig;
use crate::counter::{FrequencyTable, WordCounter};
use crate::decoder::StreamDecoder;
use crate::endpoint::Endpoint;
use crate::error::{ConfigError, DecodeError, ProtocolError, TransferError};
use crate::logger::Logger;
use crate::protocol::timeouts::HEADER_MS;
use crate::protocol::HEADER_LEN;
use crate::protocol_core::FileTransferHeader;
use crate::report::{aggregate, SessionReport};

/// Outcome of one fully read body
#[derive(Debug, Clone, Serialize)]
pub struct Transfer {
    pub bytes_received: u64,
    pub expected_size: u64,
    pub algorithm: ChecksumType,
    pub expected_checksum: Digest,
    pub computed_checksum: Digest,
    pub matches_expected: bool,
    pub table: FrequencyTable,
}

#[derive(Debug)]
pub struct EndpointResult {
    pub endpoint: Endpoint,
    pub elapsed: Duration,
    pub outcome: Result<Transfer, TransferError>,
}

impl EndpointResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Checksum verified but the text ended in malformed UTF-8. The words
    /// decoded before the bad bytes still count toward the global table.
    pub fn is_degraded(&self) -> bool {
        match &self.outcome {
            Err(TransferError::Decoding { transfer, .. }) => transfer.matches_expected,
            _ => false,
        }
    }

    /// Neither succeeded nor degraded
    pub fn is_failure(&self) -> bool {
        !self.is_success() && !self.is_degraded()
    }

    /// Table that takes part in aggregation, if any
    pub fn contributing_table(&self) -> Option<&FrequencyTable> {
        match &self.outcome {
            Ok(transfer) => Some(&transfer.table),
            Err(TransferError::Decoding { transfer, .. }) if transfer.matches_expected => {
                Some(&transfer.table)
            }
            Err(_) => None,
        }
    }

    /// Full table on success, partial table for integrity/decoding failures
    pub fn table(&self) -> Option<&FrequencyTable> {
        match &self.outcome {
            Ok(transfer) => Some(&transfer.table),
            Err(e) => e.partial().map(|t| &t.table),
        }
    }

    pub fn error(&self) -> Option<&TransferError> {
        self.outcome.as_ref().err()
    }
}

/// Per-endpoint settings copied into each task
#[derive(Debug, Clone)]
struct FetchContext {
    endpoint: Endpoint,
    connect_timeout: Duration,
    transfer_timeout: Duration,
    read_buffer: usize,
}

pub struct MultiServerClient {
    config: ClientConfig,
    logger: Arc<dyn Logger>,
}

impl MultiServerClient {
    pub fn new(config: ClientConfig, logger: Arc<dyn Logger>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, logger })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch every endpoint concurrently, then aggregate.
    /// Results are listed in configuration order.
    pub async fn run(&self) -> SessionReport {
        let mut handles = Vec::with_capacity(self.config.endpoints.len());
        for endpoint in &self.config.endpoints {
            let ctx = self.context_for(endpoint);
            let logger = Arc::clone(&self.logger);
            let handle = tokio::spawn(async move { fetch_endpoint(ctx, logger).await });
            handles.push((endpoint.clone(), handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (endpoint, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    self.logger.error("fetch", &endpoint.to_string(), &e.to_string());
                    EndpointResult {
                        endpoint,
                        elapsed: Duration::ZERO,
                        outcome: Err(TransferError::Aborted(e.to_string())),
                    }
                }
            };
            results.push(result);
        }

        aggregate(results, self.config.top_k)
    }

    /// Fetch a single endpoint in the calling task
    pub async fn fetch(&self, endpoint: &Endpoint) -> EndpointResult {
        fetch_endpoint(self.context_for(endpoint), Arc::clone(&self.logger)).await
    }

    fn context_for(&self, endpoint: &Endpoint) -> FetchContext {
        FetchContext {
            endpoint: endpoint.clone(),
            connect_timeout: self.config.connect_timeout(),
            transfer_timeout: self.config.transfer_timeout(),
            read_buffer: self.config.read_buffer,
        }
    }
}

async fn fetch_endpoint(ctx: FetchContext, logger: Arc<dyn Logger>) -> EndpointResult {
    let started = Instant::now();
    let peer = ctx.endpoint.to_string();

    let outcome = match timeout(ctx.transfer_timeout, receive(&ctx, logger.as_ref())).await {
        Ok(outcome) => outcome,
        Err(_) => Err(TransferError::Timeout {
            stage: "transfer",
            ms: ctx.transfer_timeout.as_millis() as u64,
        }),
    };

    match &outcome {
        Ok(transfer) => logger.transfer_done(&peer, transfer.bytes_received),
        Err(e) => logger.error(e.kind(), &peer, &e.to_string()),
    }
    logger.disconnected(&peer);

    EndpointResult {
        endpoint: ctx.endpoint,
        elapsed: started.elapsed(),
        outcome,
    }
}

async fn receive(ctx: &FetchContext, logger: &dyn Logger) -> Result<Transfer, TransferError> {
    let mut stream = connect(&ctx.endpoint, ctx.connect_timeout).await?;
    logger.connected(&ctx.endpoint.to_string());
    read_transfer(&mut stream, ctx.read_buffer).await
}

pub async fn connect(endpoint: &Endpoint, limit: Duration) -> Result<TcpStream, TransferError> {
    let addr = endpoint.connect_addr();
    let stream = match timeout(limit, TcpStream::connect(&addr)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => {
            return Err(TransferError::Connect {
                endpoint: endpoint.clone(),
                source,
            })
        }
        Err(_) => {
            return Err(TransferError::Timeout {
                stage: "connect",
                ms: limit.as_millis() as u64,
            })
        }
    };
    let _ = stream.set_nodelay(true);
    Ok(stream)
}

async fn read_header<R: AsyncRead + Unpin>(reader: &mut R) -> Result<FileTransferHeader, TransferError> {
    let mut raw = [0u8; HEADER_LEN];
    let mut filled = 0;
    let read = async {
        while filled < HEADER_LEN {
            let n = reader.read(&mut raw[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok::<_, std::io::Error>(())
    };
    match timeout(Duration::from_millis(HEADER_MS), read).await {
        Ok(res) => res?,
        Err(_) => {
            return Err(TransferError::Timeout {
                stage: "header",
                ms: HEADER_MS,
            })
        }
    }
    if filled < HEADER_LEN {
        return Err(ProtocolError::TruncatedHeader {
            received: filled,
            expected: HEADER_LEN,
        }
        .into());
    }
    Ok(FileTransferHeader::decode(&raw)?)
}

/// Read header and body from any byte stream.
///
/// Bytes are hashed and counted in arrival order. A decoding failure stops
/// word counting but not hashing, so integrity is still checked. End-of-stream
/// checks run in order: declared size, checksum, decoder tail.
pub async fn read_transfer<R: AsyncRead + Unpin>(
    reader: &mut R,
    read_buffer: usize,
) -> Result<Transfer, TransferError> {
    let header = read_header(reader).await?;

    let mut hasher = StreamingChecksum::new(header.algorithm);
    let mut decoder = StreamDecoder::new();
    let mut counter = WordCounter::new();
    let mut decode_error: Option<DecodeError> = None;
    let mut buf = vec![0u8; read_buffer.max(1)];
    let mut received = 0u64;

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        let chunk = &buf[..n];
        received += n as u64;
        hasher.update(chunk);
        if decode_error.is_none() {
            match decoder.feed(chunk) {
                Ok(text) => counter.feed(&text),
                Err(e) => decode_error = Some(e),
            }
        }
    }

    if received != header.size {
        return Err(ProtocolError::SizeMismatch {
            expected: header.size,
            received,
        }
        .into());
    }
    if decode_error.is_none() {
        decode_error = decoder.finish().err();
    }

    let computed = hasher.finalize();
    let transfer = Transfer {
        bytes_received: received,
        expected_size: header.size,
        algorithm: header.algorithm,
        expected_checksum: header.checksum,
        computed_checksum: computed,
        matches_expected: computed == header.checksum,
        table: counter.finish(),
    };

    if !transfer.matches_expected {
        return Err(TransferError::Integrity {
            transfer: Box::new(transfer),
        });
    }
    if let Some(source) = decode_error {
        return Err(TransferError::Decoding {
            source,
            transfer: Box::new(transfer),
        });
    }
    Ok(transfer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::digest_bytes;
    use crate::counter::count_words;

    fn wire(body: &[u8], kind: ChecksumType) -> Vec<u8> {
        let header = FileTransferHeader {
            size: body.len() as u64,
            algorithm: kind,
            checksum: digest_bytes(body, kind),
        };
        let mut out = header.encode().to_vec();
        out.extend_from_slice(body);
        out
    }

    #[tokio::test]
    async fn reads_clean_transfer() {
        let bytes = wire(b"the cat sat on the mat", ChecksumType::Sha256);
        let transfer = read_transfer(&mut &bytes[..], 3).await.unwrap();
        assert_eq!(transfer.bytes_received, 22);
        assert!(transfer.matches_expected);
        assert_eq!(transfer.table, count_words("the cat sat on the mat"));
    }

    #[tokio::test]
    async fn blake3_transfer_verifies() {
        let bytes = wire("naïve café".as_bytes(), ChecksumType::Blake3);
        let transfer = read_transfer(&mut &bytes[..], 1).await.unwrap();
        assert_eq!(transfer.algorithm, ChecksumType::Blake3);
        assert_eq!(transfer.table.get("café"), 1);
    }

    #[tokio::test]
    async fn corrupted_byte_is_integrity_error_with_partial_table() {
        let mut bytes = wire(b"the cat sat on the mat", ChecksumType::Sha256);
        // 'c' -> 'b' in "cat"
        bytes[HEADER_LEN + 4] = b'b';
        let err = read_transfer(&mut &bytes[..], 8).await.unwrap_err();
        assert_eq!(err.kind(), "integrity");
        let partial = err.partial().unwrap();
        assert!(!partial.matches_expected);
        assert_eq!(partial.table.get("bat"), 1);
        assert_eq!(partial.table.get("cat"), 0);
    }

    #[tokio::test]
    async fn short_body_is_size_mismatch() {
        let mut bytes = wire(b"hello world", ChecksumType::Sha256);
        bytes.truncate(bytes.len() - 3);
        let err = read_transfer(&mut &bytes[..], 8).await.unwrap_err();
        assert!(matches!(
            err,
            TransferError::Protocol(ProtocolError::SizeMismatch {
                expected: 11,
                received: 8
            })
        ));
    }

    #[tokio::test]
    async fn truncated_header_is_protocol_error() {
        let bytes = wire(b"hello", ChecksumType::Sha256);
        let err = read_transfer(&mut &bytes[..10], 8).await.unwrap_err();
        assert!(matches!(
            err,
            TransferError::Protocol(ProtocolError::TruncatedHeader { received: 10, .. })
        ));
    }

    #[tokio::test]
    async fn truncated_utf8_tail_is_decoding_error() {
        // Header checksum covers the malformed bytes, so integrity passes
        let body = b"good words \xE2\x82";
        let bytes = wire(body, ChecksumType::Sha256);
        let err = read_transfer(&mut &bytes[..], 4).await.unwrap_err();
        match err {
            TransferError::Decoding { source, transfer } => {
                assert_eq!(source, DecodeError::TruncatedTail { pending: 2 });
                assert!(transfer.matches_expected);
                assert_eq!(transfer.table.get("good"), 1);
                assert_eq!(transfer.table.get("words"), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_utf8_mid_stream_still_verifies_checksum() {
        let body = b"alpha beta \xFF gamma delta";
        let bytes = wire(body, ChecksumType::Sha256);
        let err = read_transfer(&mut &bytes[..], 64).await.unwrap_err();
        let partial = err.partial().unwrap();
        assert_eq!(err.kind(), "decoding");
        assert_eq!(partial.bytes_received, body.len() as u64);
        assert_eq!(partial.table.get("alpha"), 1);
        assert_eq!(partial.table.get("gamma"), 0);
    }

    #[tokio::test]
    async fn connect_to_closed_port_is_connection_error() {
        let port = {
            let sock = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            sock.local_addr().unwrap().port()
        };
        let err = connect(&Endpoint::new("127.0.0.1", port), Duration::from_secs(2))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "connection");
    }
}
