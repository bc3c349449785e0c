use anyhow::{Context, Result};
use clap::Parser;
use songbook_store::catalog_store::SqliteCatalogStore;
use songbook_store::config::{FileConfig, DEFAULT_READ_POOL_SIZE};
use songbook_store::search::SearchEngine;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Interactive search shell over an existing songbook store")]
struct CliArgs {
    /// Directory containing the store files
    #[clap(long, default_value = ".")]
    pub db_dir: PathBuf,

    /// Optional TOML config file
    #[clap(long)]
    pub config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli_args = CliArgs::parse();
    let config = match &cli_args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };

    let db_path = config.songbook_db_path(&cli_args.db_dir);
    let store = Arc::new(
        SqliteCatalogStore::open(
            &db_path,
            config.read_pool_size.unwrap_or(DEFAULT_READ_POOL_SIZE),
        )
        .with_context(|| format!("Could not open songbook store at {:?}", db_path))?,
    );

    let catalogs = store.list_catalogs()?;
    println!(
        "Loaded {} catalogs ({} active songs).",
        catalogs.len(),
        store.active_song_count()?
    );

    let engine = SearchEngine::new(store);

    loop {
        println!("Please enter your search query (empty line to quit):");

        let mut user_input = String::new();
        io::stdin()
            .read_line(&mut user_input)
            .context("Failed to read line")?;
        let user_input = user_input.trim();
        if user_input.is_empty() {
            break;
        }

        let outcome = engine.search(user_input)?;
        if outcome.artists.is_empty() && outcome.songs.is_empty() {
            println!("No matches found for \"{}\".", user_input);
        } else {
            println!(
                "Found {} artists and {} songs for \"{}\":\n",
                outcome.artists.len(),
                outcome.songs.len(),
                user_input
            );
            for artist in &outcome.artists {
                println!("  artist  {} [{}]", artist.name, artist.database_title);
            }
            for song in &outcome.songs {
                println!(
                    "  song    {} - {} [{}]",
                    song.title, song.artist_name, song.database_title
                );
            }
        }
        println!();
    }

    Ok(())
}
