use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wordstream::cli::DaemonOpts;
use wordstream::logger::{Logger, TeeLogger, TextLogger, TracingLogger};
use wordstream::server::{log_path, FileServer};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wordstream=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let opts = DaemonOpts::parse();

    // Validate everything before binding
    let config = opts.server_config()?;

    let mut sinks: Vec<Box<dyn Logger>> = vec![Box::new(TracingLogger::new(format!(
        "server_{}",
        config.port
    )))];
    if !opts.no_log_file {
        let path = log_path(&opts.log_dir, config.port);
        let text = TextLogger::new(&path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        sinks.push(Box::new(text));
    }
    let logger: Arc<dyn Logger> = Arc::new(TeeLogger::new(sinks));

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    rt.block_on(async move {
        let server = FileServer::bind(&config, logger).await?;
        let addr = server.local_addr()?;
        let served = server.served();

        println!("Starting wordstream daemon:");
        println!("  File: {}", served.path.display());
        println!("  Size: {} bytes", served.header.size);
        println!("  {}: {}", served.header.algorithm, served.header.checksum);
        println!("  Bind: {}", addr);
        println!("  Chunk: {} bytes", config.chunk_size);

        server
            .serve_with_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await
    })
}
