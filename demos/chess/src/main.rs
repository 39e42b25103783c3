//! A two-player chess server on Gambit.
//!
//! Participants are paired into sessions as they connect; extras can
//! observe by joining a session id. White is the first seat. Legality
//! comes from the [`CasualChess`](chess::CasualChess) oracle; the
//! server itself only brokers seats, turns and broadcasts.

mod chess;

use clap::Parser;
use gambit::prelude::*;

use crate::chess::CasualChess;

#[derive(Parser, Debug)]
#[command(name = "chess-server", about = "Casual chess over WebSocket")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:5500")]
    bind: String,
}

#[tokio::main]
async fn main() -> Result<(), GambitError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let server = GambitServerBuilder::new()
        .bind(&args.bind)
        .build(CasualChess)
        .await?;

    tracing::info!(addr = %args.bind, "chess server ready");
    server.run().await
}

// =========================================================================
// End-to-end tests: real clients, real server, real chess.
// =========================================================================
