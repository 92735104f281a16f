use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::info;
use recordbase::{NodeConfig, RecordBaseHttpServer, RecordBaseNode};

/// Command line options for the RecordBase server binary.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the HTTP bind address from the configuration
    #[arg(long)]
    bind: Option<String>,

    /// Override the storage path from the configuration
    #[arg(long)]
    storage: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    info!("Starting RecordBase server...");

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => NodeConfig::from_file(path)?,
        None => NodeConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.bind_address = bind;
    }
    if let Some(storage) = cli.storage {
        config.storage_path = storage;
    }
    info!("Config loaded successfully");

    let bind_address = config.bind_address.clone();
    let node = Arc::new(RecordBaseNode::new(config)?);

    // The reconciler keeps the compiled schema artifact in sync while
    // the server handles requests.
    node.reconciler().start().await;

    let server = RecordBaseHttpServer::new(node.clone(), &bind_address);
    let result = server.run().await;

    node.shutdown().await;
    result?;
    Ok(())
}
