//! Entry point
//!
//! Parses the positional `[port] [host]` arguments, sets up logging and
//! a single-threaded runtime, then bootstraps and runs the server.

use anyhow::{Context, Result};
use tracing::info;

use poolserve::{Config, Server, VERSION};

fn main() -> Result<()> {
    let config =
        Config::from_args(std::env::args().skip(1)).context("invalid command line arguments")?;

    poolserve::util::init_tracing(&config.logging)?;

    info!(
        version = VERSION,
        host = %config.host,
        port = config.port,
        "starting poolserve"
    );

    // One logical thread executes all application code; connection tasks
    // are spawned onto the LocalSet.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?;
    let local = tokio::task::LocalSet::new();

    local.block_on(&runtime, async {
        let server = Server::bootstrap(config).await?;
        server.run().await
    })
}
