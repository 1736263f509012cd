//! Gallows terminal client entry point.

use std::{fs::File, sync::Mutex};

use clap::Parser;
use gallows_app::{FileTokenStore, Runtime};
use gallows_cli::{Args, TerminalDriver};
use gallows_client::http::{HttpConfig, HttpTransport};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args)?;

    let transport = HttpTransport::new(HttpConfig::new(args.server.clone()))?;
    let store = FileTokenStore::new(&args.token_file);
    tracing::info!(server = %args.server, token_file = %args.token_file.display(), "starting");

    let driver = TerminalDriver::new()?;
    let runtime = Runtime::new(driver, transport, store, args.client_config());
    let runtime = match args.name {
        Some(name) => runtime.with_name(name),
        None => runtime,
    };

    Ok(runtime.run().await?)
}

/// Log to a file; `RUST_LOG` wins over `--log-level`.
fn init_logging(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&args.log_level))?;
    let file = File::create(&args.log_file)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
