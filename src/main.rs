//! research-analyzer: dashboard server and maintenance commands
//!
//! Usage:
//!   research-analyzer serve [--bind 127.0.0.1:8501]
//!   research-analyzer stats
//!   research-analyzer summarize paper.pdf

use clap::{Parser, Subcommand};
use research_analyzer_lib::controller::Controller;
use research_analyzer_lib::feedback::{FeedbackLabel, FeedbackStore};
use research_analyzer_lib::processing::rag::RagProcessor;
use research_analyzer_lib::processing::{DocumentProcessor, SUMMARY_PROMPT};
use research_analyzer_lib::session::SessionRegistry;
use research_analyzer_lib::settings::{default_data_dir, LlmBackend, Settings, SETTINGS_FILE};
use research_analyzer_lib::web::{self, AppState};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "research_analyzer=info,research_analyzer_lib=info,tower_http=info";

#[derive(Parser)]
#[command(name = "research-analyzer")]
#[command(version, about = "Climate Change Research Analyzer", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Data directory (default: platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Feedback CSV path (default: <data-dir>/feedback.csv)
    #[arg(long, global = true)]
    feedback_csv: Option<PathBuf>,

    /// LLM backend override (anthropic or ollama)
    #[arg(long, global = true)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the dashboard server
    Serve {
        /// Bind address (default from settings)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Print feedback counts by label
    Stats,
    /// Extract and summarize one PDF
    Summarize {
        /// Path to the PDF
        pdf: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    std::fs::create_dir_all(&data_dir)
        .map_err(|e| format!("Failed to create data directory {}: {}", data_dir.display(), e))?;

    let mut settings = Settings::load_from_dir(&data_dir);
    if let Some(path) = cli.feedback_csv {
        settings.feedback_csv = Some(path);
    }
    if let Some(backend) = cli.backend {
        settings.llm_backend = backend.parse::<LlmBackend>()?;
    }

    match cli.command {
        Commands::Serve { bind } => serve(settings, &data_dir, bind).await,
        Commands::Stats => stats(&settings, &data_dir),
        Commands::Summarize { pdf } => summarize(&settings, &data_dir, &pdf).await,
    }
}

async fn serve(settings: Settings, data_dir: &Path, bind: Option<String>) -> Result<(), String> {
    let settings_path = data_dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        // Stored without CLI overrides applied
        Settings::default().save(&settings_path)?;
        info!("Wrote default settings to {}", settings_path.display());
    }

    let bind_addr = bind.unwrap_or_else(|| settings.bind.clone());
    let feedback_path = settings.feedback_path(data_dir);

    info!("Data directory: {}", data_dir.display());
    info!("Feedback log: {}", feedback_path.display());
    info!("LLM backend: {}", settings.llm_backend.as_str());

    let processor = RagProcessor::from_settings(&settings, data_dir)?;
    let feedback = Arc::new(FeedbackStore::new(feedback_path));
    let controller = Arc::new(Controller::new(Arc::new(processor), feedback));
    let sessions = Arc::new(SessionRegistry::new(Duration::from_secs(settings.session_ttl_secs)));

    web::serve(AppState::new(controller, sessions), &bind_addr, settings.max_upload_bytes).await
}

fn stats(settings: &Settings, data_dir: &Path) -> Result<(), String> {
    let store = FeedbackStore::new(settings.feedback_path(data_dir));
    if !store.exists() {
        println!("No feedback recorded yet ({})", store.path().display());
        return Ok(());
    }

    let counts = store.aggregate_by_label().map_err(|e| e.to_string())?;
    let total: usize = counts.values().sum();
    println!("Feedback in {}", store.path().display());
    for label in FeedbackLabel::ALL {
        println!("  {:<4} {}", label.as_str(), counts.get(&label).copied().unwrap_or(0));
    }
    println!("  ---- {}", total);
    Ok(())
}

async fn summarize(settings: &Settings, data_dir: &Path, pdf: &Path) -> Result<(), String> {
    let bytes = std::fs::read(pdf).map_err(|e| format!("Failed to read {}: {}", pdf.display(), e))?;
    let processor = RagProcessor::from_settings(settings, data_dir)?;

    let text = processor.extract(&bytes).await.map_err(|e| e.to_string())?;
    info!("Extracted {} characters from {}", text.chars().count(), pdf.display());
    let summary = processor.summarize(&text, SUMMARY_PROMPT).await.map_err(|e| e.to_string())?;
    println!("{}", summary);
    Ok(())
}
