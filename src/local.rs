//! In-process session: one server per file on an ephemeral localhost port,
//! then one client run against all of them.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

use crate::checksum::ChecksumType;
use crate::client::MultiServerClient;
use crate::config::{ClientConfig, ServerConfig};
use crate::endpoint::Endpoint;
use crate::error::StartupError;
use crate::logger::Logger;
use crate::report::SessionReport;
use crate::server::FileServer;

pub struct LocalSession {
    pub files: Vec<PathBuf>,
    pub chunk_size: usize,
    pub checksum: ChecksumType,
    /// Endpoints are filled in from the spawned servers
    pub client: ClientConfig,
}

impl LocalSession {
    /// Every server is bound before any client connects; a file that fails
    /// startup validation aborts the whole session.
    pub async fn run(self, logger: Arc<dyn Logger>) -> Result<SessionReport, StartupError> {
        let mut servers = Vec::with_capacity(self.files.len());
        for file in &self.files {
            let mut config = ServerConfig::new("127.0.0.1", 0, self.chunk_size, file);
            config.checksum = self.checksum;
            servers.push(FileServer::bind(&config, Arc::clone(&logger)).await?);
        }

        let mut endpoints = Vec::with_capacity(servers.len());
        for server in &servers {
            let addr = server.local_addr().map_err(|source| StartupError::Bind {
                addr: "127.0.0.1:0".to_string(),
                source,
            })?;
            endpoints.push(Endpoint::new(addr.ip().to_string(), addr.port()));
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let mut tasks = Vec::with_capacity(servers.len());
        for server in servers {
            let mut rx = stop_rx.clone();
            tasks.push(tokio::spawn(server.serve_with_shutdown(async move {
                let _ = rx.changed().await;
            })));
        }

        let client_config = ClientConfig {
            endpoints,
            ..self.client
        };
        let client = MultiServerClient::new(client_config, logger)?;
        let report = client.run().await;

        let _ = stop_tx.send(true);
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!("local server task ended abnormally: {e}");
            }
        }
        Ok(report)
    }
}
