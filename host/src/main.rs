use clap::Parser;
use host::network::Server;
use log::info;
use shared::{GameConfig, Ruleset};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind the UDP socket to
    #[arg(short = 'b', long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// JSON game configuration; unset keys keep their defaults
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Override the tick length in milliseconds
    #[arg(short = 't', long)]
    tick_ms: Option<u64>,

    /// Override the match length in milliseconds
    #[arg(short = 'd', long)]
    duration_ms: Option<u64>,

    /// Play with projectiles, ammo and armor
    #[arg(long)]
    combat: bool,

    /// Maximum number of connected peers, spectators included
    #[arg(short = 'm', long, default_value = "16")]
    max_clients: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading config from {}", path.display());
            GameConfig::load(path)?
        }
        None => GameConfig::default(),
    };
    if let Some(tick_ms) = args.tick_ms {
        config.tick_ms = tick_ms;
    }
    if let Some(duration_ms) = args.duration_ms {
        config.game_duration_ms = duration_ms;
    }
    if args.combat {
        config.ruleset = Ruleset::Combat;
    }

    info!(
        "Starting host on {} ({}x{} grid, {:?} rules, {} ms ticks)",
        args.bind, config.grid_cols, config.grid_rows, config.ruleset, config.tick_ms
    );

    let mut server = Server::new(&args.bind, config, args.max_clients).await?;
    server.run().await?;

    Ok(())
}
