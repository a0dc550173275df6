mod classify;
mod config;
mod index;
mod init;
mod library;

use crate::db::{LanceVectorStore, SqliteMetadataStore};
use crate::services::{ConfigService, ProgressEvent, ProgressSink, ProjectConfig};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "photo-insight")]
#[command(
    about = "Local photo library indexer with semantic embeddings and season classification",
    long_about = None
)]
pub struct Cli {
    /// Enable verbose output (debug logs)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a photo-insight project in the current directory
    Init(init::InitArgs),

    /// Index a directory of photos into the catalog and vector store
    Index(index::IndexArgs),

    /// Classify indexed photos into seasons
    Classify(classify::ClassifyArgs),

    /// List cataloged photos
    List(library::ListArgs),

    /// List the members of a season set
    Seasons(library::SeasonsArgs),

    /// Show catalog and vector store statistics
    Stats(library::StatsArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

/// Execute the CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init(args) => init::execute(args).await,
        Commands::Index(args) => index::execute(args).await,
        Commands::Classify(args) => classify::execute(args).await,
        Commands::List(args) => library::execute_list(args).await,
        Commands::Seasons(args) => library::execute_seasons(args).await,
        Commands::Stats(args) => library::execute_stats(args).await,
        Commands::Config(args) => config::execute(args).await,
    }
}

/// Load configuration and open both stores for a command run.
pub(crate) async fn open_stores(
) -> Result<(ProjectConfig, Arc<SqliteMetadataStore>, Arc<LanceVectorStore>)> {
    let project_root = PathBuf::from(".");
    let config_service = ConfigService::new(&project_root);

    if !config_service.exists() {
        return Err(anyhow::anyhow!(
            "photo-insight is not initialized here. Run 'photo-insight init' first."
        ));
    }

    let config = config_service.load()?;

    let metadata_path = config_service.resolve_path(&config.storage.metadata_path);
    let store = Arc::new(SqliteMetadataStore::open(&metadata_path)?);

    let vector_path = config_service.resolve_path(&config.storage.vector_path);
    let vectors = Arc::new(
        LanceVectorStore::new(
            &vector_path.to_string_lossy(),
            config.embedding.dimensions,
        )
        .await?,
    );
    vectors.init().await?;

    Ok((config, store, vectors))
}

/// Progress sink that narrates pipeline events on the console.
pub(crate) struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::IndexingStatus { message }
            | ProgressEvent::ClassificationStatus { message } => println!("{message}"),
            ProgressEvent::NewImageFound { path, status } => println!("{status}: {path}"),
            ProgressEvent::IndexingComplete { summary } => println!(
                "Indexing complete: {} indexed, {} skipped, {} failed (of {} discovered)",
                summary.indexed, summary.skipped, summary.failed, summary.discovered
            ),
            ProgressEvent::ClassificationComplete { summary } => println!(
                "Classification complete: {} labeled, {} unlabeled, {} failed (of {} examined)",
                summary.labeled, summary.unlabeled, summary.failed, summary.examined
            ),
            ProgressEvent::Error { message } => eprintln!("error: {message}"),
        }
    }
}
