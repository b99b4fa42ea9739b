use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt::writer::BoxMakeWriter};

use stoolai::config::{LoggingConfig, Settings};
use stoolai::inference::{create_backend, ModelLoader};
use stoolai::resources::{self, FileResourceProvider};
use stoolai::server::ApiServer;
use stoolai::{ClassificationResult, Classifier};

mod display;

#[derive(Parser)]
#[command(name = "stoolai", version, about = "Stool image classification service")]
struct Cli {
    /// Directory holding default.toml and the optional local.toml
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server (default)
    Serve,
    /// Classify local image files and print the results
    Classify {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Check that registered resources and files on disk agree
    VerifyResources,
}

/// Sets up the global subscriber.
///
/// Logs go to a daily rolling file when a log directory is configured, to
/// stderr otherwise. The returned guard must live as long as the process
/// so buffered lines are flushed on exit.
fn init_logging(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("invalid log filter")?;

    let (writer, guard) = match &config.directory {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::RollingFileAppender::new(
                tracing_appender::rolling::Rotation::DAILY,
                dir,
                "stoolai",
            );
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_line_number(true)
        .with_file(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_target(false);

    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(guard)
}

async fn build_classifier(settings: &Settings) -> anyhow::Result<Arc<Classifier>> {
    let resource = resources::lookup(&settings.models.model)?;
    let root = resources::resolve_model_root(settings, resource)
        .await
        .with_context(|| format!("failed to fetch {} from resource store", resource))?;
    info!("Model resource: {}", resource.locate(&root).display());

    let provider = Arc::new(FileResourceProvider::new(root, resource));
    let backend = create_backend(&settings.inference);
    let loader = Arc::new(ModelLoader::new(provider, backend));
    Ok(Arc::new(Classifier::new(loader)))
}

fn verify(settings: &Settings) -> Result<(), stoolai::error::ResourceError> {
    resources::verify_resource_mappings(&settings.resource_roots())
}

async fn classify_files(settings: &Settings, files: Vec<PathBuf>) -> anyhow::Result<()> {
    let classifier = build_classifier(settings).await?;

    let results = tokio::task::spawn_blocking(move || {
        files
            .into_iter()
            .map(|path| {
                let result = match std::fs::read(&path) {
                    Ok(bytes) => classifier.classify(&bytes),
                    Err(e) => ClassificationResult::error(format!(
                        "Failed to read {}: {}",
                        path.display(),
                        e
                    )),
                };
                (path, result)
            })
            .collect::<Vec<_>>()
    })
    .await?;

    display::display_results(&results);
    Ok(())
}

async fn serve(settings: &Settings) -> anyhow::Result<()> {
    // Checked after the model may have been fetched into the store cache.
    let classifier = build_classifier(settings).await?;
    if let Err(e) = verify(settings) {
        warn!("{}", e);
    }

    let server = ApiServer::new(classifier, settings.server.clone());
    server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("server error: {}", e))
}

fn config_dir(cli: &Cli) -> anyhow::Result<PathBuf> {
    let dir: &Path = &cli.config_dir;
    if dir.is_absolute() {
        return Ok(dir.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(dir))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::from_dir(&config_dir(&cli)?)?;
    let _guard = init_logging(&settings.logging)?;

    info!("StoolAI starting up...");
    if let Some(dir) = &settings.logging.directory {
        info!("Log directory: {}", dir.display());
    }
    info!("Settings loaded");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&settings).await,
        Command::Classify { files } => classify_files(&settings, files).await,
        Command::VerifyResources => {
            let outcome = verify(&settings);
            display::display_verification(&outcome);
            outcome.map_err(Into::into)
        }
    }
}
