// streampinger-server/src/main.rs

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use streampinger_core::config::DEFAULT_CONFIG_PATH;

mod context;
mod server;

#[derive(Parser, Debug, Clone)]
#[command(name = "streampinger")]
#[command(author, version, about = "Discord go-live notifications for Twitch, Picarto and YouTube")]
pub struct Args {
    /// Path to the JSON config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("streampinger=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(sub) {
        eprintln!("Failed to set global subscriber: {e}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env first so RUST_LOG from it reaches the filter.
    dotenv::dotenv().ok();
    init_tracing();
    let args = Args::parse();
    info!("StreamPinger starting. config={}", args.config.display());

    if let Err(e) = server::run_server(args).await {
        error!("Server error: {:?}", e);
        return Err(e);
    }
    info!("Main finished. Goodbye!");
    Ok(())
}
