//! Watch party room server.
//!
//! Authenticates WebSocket connections, tracks room membership, relays chat and
//! WebRTC signaling, and enforces host moderation.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin nagaya-server -- --directory directory.json
//! cargo run --bin nagaya-server -- --host 0.0.0.0 --port 3000 --auth-url http://localhost:3000
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use nagaya_server::{config::ResolverConfig, ui::Server, ui::state::AppState};
use nagaya_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "nagaya-server")]
#[command(about = "Real-time room core for watch parties", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Static directory JSON (tokens and event hosts)
    #[arg(long, value_name = "FILE")]
    directory: Option<PathBuf>,

    /// Base URL of the web application that resolves sessions and event hosts
    #[arg(long, value_name = "URL", conflicts_with = "directory")]
    auth_url: Option<String>,

    /// Timeout for HTTP resolver calls (milliseconds)
    #[arg(long, default_value = "5000")]
    resolver_timeout_ms: u64,

    /// Capacity of each connection's outbound queue
    #[arg(long, default_value = "256", value_parser = clap::value_parser!(u64).range(1..))]
    outbound_buffer: u64,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    // 1. Resolvers (external collaborators)
    let resolvers = match ResolverConfig::from_args(
        args.directory,
        args.auth_url,
        Duration::from_millis(args.resolver_timeout_ms),
    )
    .build()
    {
        Ok(resolvers) => resolvers,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // 2. Repository, MessagePusher and UseCases
    let state = AppState::build(
        resolvers.identity,
        resolvers.host,
        Arc::new(SystemClock),
        args.outbound_buffer as usize,
    );

    // 3. Run the server
    let server = Server::new(state);
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
