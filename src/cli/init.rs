use crate::db::{LanceVectorStore, SqliteMetadataStore};
use crate::services::ConfigService;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing configuration with defaults
    #[arg(long)]
    force: bool,
}

pub async fn execute(args: InitArgs) -> Result<()> {
    let project_root = PathBuf::from(".");
    let config_service = ConfigService::new(&project_root);

    if config_service.exists() && !args.force {
        println!("photo-insight is already initialized (use --force to reset the configuration)");
        return Ok(());
    }

    let config = config_service.init()?;

    // Bootstrap both stores so the first index run starts from a valid
    // layout.
    let metadata_path = config_service.resolve_path(&config.storage.metadata_path);
    SqliteMetadataStore::open(&metadata_path)?;

    let vector_path = config_service.resolve_path(&config.storage.vector_path);
    let vectors =
        LanceVectorStore::new(&vector_path.to_string_lossy(), config.embedding.dimensions).await?;
    vectors.init().await?;

    println!("Initialized photo-insight project");
    println!("  catalog:      {}", metadata_path.display());
    println!("  vector store: {}", vector_path.display());
    println!("  config:       .photo-insight/config.toml");
    Ok(())
}
