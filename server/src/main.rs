// server/src/main.rs

// Entry point for the `medwallet` command line tool.

use anyhow::Result;
use medwallet_server::cli::start_cli;

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity; output goes to stderr so stdout stays JSON.
    env_logger::init();

    start_cli().await
}
