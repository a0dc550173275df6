use super::open_stores;
use crate::db::{MetadataStore, VectorStore};
use crate::season::Season;
use anyhow::Result;
use clap::Args;

#[derive(Args)]
pub struct ListArgs {
    /// Show only fully indexed photos
    #[arg(long)]
    indexed_only: bool,
}

#[derive(Args)]
pub struct SeasonsArgs {
    /// Season set to list (spring, summer, autumn or winter)
    pub season: String,

    /// Number of rows to skip
    #[arg(long, default_value_t = 0)]
    pub offset: u64,

    /// Maximum number of rows to return
    #[arg(long, default_value_t = 50)]
    pub limit: u64,
}

#[derive(Args)]
pub struct StatsArgs {}

pub async fn execute_list(args: ListArgs) -> Result<()> {
    let (_config, store, _vectors) = open_stores().await?;

    let records = store.list_all().await?;
    let mut shown = 0usize;
    for record in &records {
        if args.indexed_only && !record.is_fully_indexed() {
            continue;
        }
        let state = if record.is_fully_indexed() {
            "indexed"
        } else {
            "pending"
        };
        println!(
            "{:>6}  {:<8}  {:>8.2} MB  {}",
            record.id, state, record.size_mb, record.path
        );
        shown += 1;
    }
    println!("{shown} photos");
    Ok(())
}

pub async fn execute_seasons(args: SeasonsArgs) -> Result<()> {
    let season: Season = args.season.parse()?;
    let (_config, store, _vectors) = open_stores().await?;

    let members = store
        .list_season_members(season, args.offset, args.limit)
        .await?;
    for record in &members {
        println!("{:>6}  {}", record.id, record.path);
    }
    println!("{} photos in the {} set", members.len(), season);
    Ok(())
}

pub async fn execute_stats(_args: StatsArgs) -> Result<()> {
    let (_config, store, vectors) = open_stores().await?;

    let total = store.count_images().await?;
    let indexed = store.count_indexed().await?;
    let stored_vectors = vectors.count().await?;

    println!("photos:        {total}");
    println!("fully indexed: {indexed}");
    println!("pending:       {}", total - indexed);
    println!("vectors:       {stored_vectors}");
    Ok(())
}
