use clap::Parser;
use tracing::{info, warn};
use vidrec::services::serving::create_router;
use vidrec::{init_tracing, AppState, Config};

#[derive(Parser, Debug)]
#[command(author, version, about = "Serve video recommendations over HTTP", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Directory holding the trained artifacts.
    #[arg(short, long)]
    artifacts: Option<String>,

    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let mut config = Config::load_or_default(&args.config)?;
    if let Some(dir) = args.artifacts {
        config.artifacts = config.artifacts.with_dir(dir);
    }
    info!("Starting recommendation server with config: {:?}", config.server);

    let addr = config.server.socket_addr()?;
    let state = AppState::new(config);
    if !state.recommendation_service.is_ready() {
        warn!("Artifacts unavailable, /recommend will answer 503 until the server is restarted with a trained model");
    }

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
