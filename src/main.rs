//! wordstream - fetch text from one or more wordstreamd servers, verify each
//! transfer and print merged word frequencies.

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wordstream::cli::{ClientCommand, ClientOpts};
use wordstream::local::LocalSession;
use wordstream::logger::{Logger, TracingLogger};
use wordstream::report::SessionReport;
use wordstream::MultiServerClient;

/// Some endpoint failed outright; the report still went out
const EXIT_PARTIAL: u8 = 2;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wordstream=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(opts: ClientOpts) -> Result<SessionReport> {
    let logger: Arc<dyn Logger> = Arc::new(TracingLogger::new("client"));
    let config = opts.client_config()?;

    match opts.command {
        ClientCommand::Fetch { .. } => {
            let client = MultiServerClient::new(config, logger).context("invalid client configuration")?;
            Ok(client.run().await)
        }
        ClientCommand::Local {
            files,
            chunk_size,
            checksum,
        } => {
            let session = LocalSession {
                files,
                chunk_size,
                checksum,
                client: config,
            };
            Ok(session.run(logger).await?)
        }
    }
}

fn main() -> Result<ExitCode> {
    init_tracing();
    let opts = ClientOpts::parse();
    let json = opts.json;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;
    let report = rt.block_on(run(opts))?;

    if json {
        println!("{}", report.to_json()?);
    } else {
        print!("{report}");
    }

    if report.no_failures() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_PARTIAL))
    }
}
