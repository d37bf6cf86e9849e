mod app;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;

use emolens_core::analysis::pipeline_factory::{ModelPipelineFactory, PipelineConfig};
use emolens_core::emotion::infrastructure::scorer_factory::ScorerBackend;
use emolens_core::shared::settings::Settings;

use crate::app::{app, AppState};

/// WebSocket server answering each submitted frame with an emotion analysis.
#[derive(Parser)]
#[command(name = "emolens-server")]
struct Cli {
    /// Address to bind.
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on.
    #[arg(long)]
    port: Option<u16>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Emotion scorer backend: ferplus or fer2013.
    #[arg(long)]
    scorer: Option<ScorerBackend>,

    /// Emotion model file (required for fer2013).
    #[arg(long)]
    emotion_model: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    if let Some(confidence) = cli.confidence {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(
                format!("Confidence must be between 0.0 and 1.0, got {confidence}").into(),
            );
        }
    }

    let settings = Settings::load();
    let mut config = PipelineConfig::from_settings(&settings);
    if let Some(confidence) = cli.confidence {
        config.confidence = confidence;
    }
    if let Some(scorer) = cli.scorer {
        config.scorer = scorer;
    }
    if cli.emotion_model.is_some() {
        config.emotion_model = cli.emotion_model.clone();
    }

    // resolve (and download) models before accepting connections
    let factory = ModelPipelineFactory::resolve(&config, None)?;
    let addr = format!(
        "{}:{}",
        cli.host.unwrap_or(settings.host),
        cli.port.unwrap_or(settings.port)
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve(&addr, AppState::new(Arc::new(factory))))
}

async fn serve(addr: &str, state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Server listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}
