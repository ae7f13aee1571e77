use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use vidrec::services::training::TrainingService;
use vidrec::{init_tracing, Config};

#[derive(Parser, Debug)]
#[command(author, version, about = "Train the video recommendation artifacts", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Interaction CSV to train on.
    #[arg(short, long)]
    dataset: Option<PathBuf>,

    /// Output directory for the artifacts.
    #[arg(short, long)]
    artifacts: Option<PathBuf>,

    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    info!("Starting training run");

    let mut config = Config::load_or_default(&args.config)?;
    if let Some(dataset) = args.dataset {
        config.training.dataset_path = dataset;
    }
    if let Some(dir) = args.artifacts {
        config.artifacts = config.artifacts.with_dir(dir);
    }
    info!("Training configuration loaded: {:?}", config.training);

    let service = TrainingService::new(Arc::new(config));
    let report = tokio::task::spawn_blocking(move || service.run()).await??;

    info!(
        events = report.events,
        users = report.users,
        videos = report.videos,
        "Training completed successfully"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
