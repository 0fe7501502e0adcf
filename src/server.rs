//! Async (Tokio) file server.
//!
//! The served file is validated and hashed once at startup. Each accepted
//! connection then gets its own task: header first, body in fixed-size
//! chunks, clean shutdown. A failing connection only ends its own task.

use anyhow::{Context, Result};
use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};

use crate::checksum::digest_file;
use crate::config::ServerConfig;
use crate::error::StartupError;
use crate::logger::Logger;
use crate::protocol::timeouts::write_deadline_ms;
use crate::protocol_core::FileTransferHeader;

/// Back-off after a failed accept (e.g. fd exhaustion) before retrying
const ACCEPT_BACKOFF_MS: u64 = 100;

/// Immutable for the lifetime of the server
#[derive(Debug, Clone)]
pub struct ServedFile {
    pub path: PathBuf,
    pub header: FileTransferHeader,
}

/// Everything one connection task needs, passed explicitly
struct ConnectionContext {
    peer: String,
    served: Arc<ServedFile>,
    chunk_size: usize,
    logger: Arc<dyn Logger>,
}

pub struct FileServer {
    listener: TcpListener,
    served: Arc<ServedFile>,
    chunk_size: usize,
    logger: Arc<dyn Logger>,
}

#[inline]
async fn write_all_timed(stream: &mut TcpStream, buf: &[u8], ms: u64) -> Result<()> {
    match timeout(Duration::from_millis(ms), async { stream.write_all(buf).await }).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => anyhow::bail!("write timeout ({} ms)", ms),
    }
}

/// Fill `buf` unless the reader hits EOF first; returns bytes read
async fn read_full<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

impl FileServer {
    /// Validate the config, hash the file, then bind. Nothing is bound when
    /// the file is missing or unreadable.
    pub async fn bind(config: &ServerConfig, logger: Arc<dyn Logger>) -> Result<Self, StartupError> {
        config.validate()?;

        // Hashing reads the whole file; keep it off the runtime workers
        let path = config.file_path.clone();
        let kind = config.checksum;
        let (size, checksum) = tokio::task::spawn_blocking(move || digest_file(&path, kind))
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
            .and_then(|hashed| hashed)
            .map_err(|source| StartupError::Unreadable {
                path: config.file_path.clone(),
                source,
            })?;
        let served = ServedFile {
            path: config.file_path.clone(),
            header: FileTransferHeader {
                size,
                algorithm: config.checksum,
                checksum,
            },
        };

        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| StartupError::Bind {
                addr: addr.clone(),
                source,
            })?;

        Ok(Self {
            listener,
            served: Arc::new(served),
            chunk_size: config.chunk_size,
            logger,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn served(&self) -> &ServedFile {
        &self.served
    }

    /// Accept forever
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Accept until `shutdown` resolves. Connections already in flight keep
    /// running to completion on their own tasks.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = self
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "?".to_string());
        self.logger.listening(&addr, &self.served.path);

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!(%addr, "server shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => self.spawn_connection(stream, peer),
                        Err(e) => {
                            self.logger.error("accept", &addr, &e.to_string());
                            tokio::time::sleep(Duration::from_millis(ACCEPT_BACKOFF_MS)).await;
                        }
                    }
                }
            }
        }
    }

    fn spawn_connection(&self, mut stream: TcpStream, peer: SocketAddr) {
        let _ = stream.set_nodelay(true);
        let ctx = ConnectionContext {
            peer: peer.to_string(),
            served: Arc::clone(&self.served),
            chunk_size: self.chunk_size,
            logger: Arc::clone(&self.logger),
        };
        ctx.logger.connected(&ctx.peer);

        // Spawn per-connection task.
        tokio::spawn(async move {
            let started = Instant::now();
            match send_file(&ctx, &mut stream).await {
                Ok(sent) => {
                    ctx.logger.transfer_done(&ctx.peer, sent);
                    tracing::debug!(
                        peer = %ctx.peer,
                        sent,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        checksum = %ctx.served.header.checksum,
                        "transfer finished"
                    );
                }
                Err(e) => ctx.logger.error("transfer", &ctx.peer, &format!("{e:#}")),
            }
            ctx.logger.disconnected(&ctx.peer);
        });
    }
}

async fn send_file(ctx: &ConnectionContext, stream: &mut TcpStream) -> Result<u64> {
    let header = ctx.served.header.encode();
    write_all_timed(stream, &header, write_deadline_ms(header.len())).await?;

    let file = tokio::fs::File::open(&ctx.served.path)
        .await
        .with_context(|| format!("open {}", ctx.served.path.display()))?;
    // Never send more than the header announced
    let mut body = file.take(ctx.served.header.size);

    let mut buf = vec![0u8; ctx.chunk_size];
    let deadline = write_deadline_ms(ctx.chunk_size);
    let mut sent = 0u64;
    loop {
        let n = read_full(&mut body, &mut buf).await?;
        if n == 0 {
            break;
        }
        write_all_timed(stream, &buf[..n], deadline).await?;
        sent += n as u64;
    }

    if sent != ctx.served.header.size {
        anyhow::bail!(
            "{} shrank while serving: sent {} of {} bytes",
            ctx.served.path.display(),
            sent,
            ctx.served.header.size
        );
    }

    stream.shutdown().await?;
    Ok(sent)
}

/// Path of the per-port log file the server binary writes
pub fn log_path(log_dir: &Path, port: u16) -> PathBuf {
    log_dir.join(format!("server_{port}.log"))
}
