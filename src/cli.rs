//! Shared CLI helpers and small reusable Clap fragments

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::checksum::ChecksumType;
use crate::config::{ClientConfig, ConfigFile, ServerConfig};
use crate::endpoint::Endpoint;
use crate::error::ConfigError;

/// Serve one text file to any client that connects
#[derive(Clone, Debug, Parser)]
#[command(name = "wordstreamd", author, version)]
pub struct DaemonOpts {
    /// TOML config file ([server] table)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Host or IP address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (0 = ephemeral)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Body chunk size in bytes
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Checksum algorithm (sha256 or blake3)
    #[arg(long)]
    pub checksum: Option<ChecksumType>,

    /// Directory for the per-port server log
    #[arg(long, default_value = "logs")]
    pub log_dir: PathBuf,

    /// Do not write a log file
    #[arg(long)]
    pub no_log_file: bool,

    /// File to serve
    pub file: Option<PathBuf>,
}

impl DaemonOpts {
    /// Config file first, flags on top, validated once
    pub fn server_config(&self) -> Result<ServerConfig, ConfigError> {
        let mut config = ConfigFile::load_or_default(self.config.as_deref())?.server;
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(checksum) = self.checksum {
            config.checksum = checksum;
        }
        if let Some(file) = &self.file {
            config.file_path = file.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

/// Fetch text from one or more servers and report word frequencies
#[derive(Clone, Debug, Parser)]
#[command(name = "wordstream", author, version)]
pub struct ClientOpts {
    /// TOML config file ([client] table)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of top words to report
    #[arg(long, global = true)]
    pub top: Option<usize>,

    /// Per-endpoint bound on the whole transfer (ms)
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Print the report as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: ClientCommand,
}

#[derive(Clone, Debug, Subcommand)]
pub enum ClientCommand {
    /// Connect to running servers (host:port)
    Fetch {
        endpoints: Vec<Endpoint>,
    },
    /// Serve each file from an in-process server and fetch them all
    Local {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Body chunk size in bytes
        #[arg(long, default_value_t = crate::protocol::DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// Checksum algorithm (sha256 or blake3)
        #[arg(long, default_value = "sha256")]
        checksum: ChecksumType,
    },
}

impl ClientOpts {
    /// Client settings without endpoint validation; `fetch` adds the
    /// endpoints, `local` fills them in from its own servers.
    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        let mut config = ConfigFile::load_or_default(self.config.as_deref())?.client;
        if let Some(top) = self.top {
            config.top_k = top;
        }
        if let Some(ms) = self.timeout_ms {
            config.transfer_timeout_ms = ms;
        }
        if let ClientCommand::Fetch { endpoints } = &self.command {
            if !endpoints.is_empty() {
                config.endpoints = endpoints.clone();
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_endpoints_override_config() {
        let opts = ClientOpts::parse_from([
            "wordstream",
            "--top",
            "3",
            "fetch",
            "localhost:9001",
            "localhost:9002",
        ]);
        let config = opts.client_config().unwrap();
        assert_eq!(config.top_k, 3);
        assert_eq!(
            config.endpoints,
            vec![Endpoint::new("localhost", 9001), Endpoint::new("localhost", 9002)]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn local_requires_files() {
        assert!(ClientOpts::try_parse_from(["wordstream", "local"]).is_err());
        let opts = ClientOpts::try_parse_from(["wordstream", "local", "a.txt", "--chunk-size", "8"]).unwrap();
        match opts.command {
            ClientCommand::Local { files, chunk_size, checksum } => {
                assert_eq!(files, vec![PathBuf::from("a.txt")]);
                assert_eq!(chunk_size, 8);
                assert_eq!(checksum, ChecksumType::Sha256);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn daemon_flags_are_validated() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("book.txt");
        std::fs::write(&file, "words").unwrap();

        let args: Vec<std::ffi::OsString> = vec![
            "wordstreamd".into(),
            "--port".into(),
            "0".into(),
            "--chunk-size".into(),
            "8".into(),
            "--checksum".into(),
            "blake3".into(),
            file.clone().into_os_string(),
        ];
        let opts = DaemonOpts::parse_from(args);
        let config = opts.server_config().unwrap();
        assert_eq!(config.chunk_size, 8);
        assert_eq!(config.checksum, ChecksumType::Blake3);

        let bad = DaemonOpts::parse_from(["wordstreamd", "--chunk-size", "0", "missing.txt"]);
        assert!(bad.server_config().is_err());
    }
}
