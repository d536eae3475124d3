//! Collection Tracker - personal MTG collection database
//!
//! Serves the web UI and API against a local SQLite database.

use clap::Parser;
use collection_tracker::{ScryfallClient, Store};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// MTG collection tracker - local collection database with Scryfall pricing
#[derive(Parser, Debug)]
#[command(name = "collection_tracker")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    #[arg(short, long, default_value_t = default_db_path())]
    database: String,

    /// Port for the web UI and API
    #[arg(short, long, default_value_t = 8087)]
    port: u16,
}

/// Returns the default database path: ~/.local/share/collection_tracker/collection.db
fn default_db_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("collection_tracker")
        .join("collection.db")
        .to_string_lossy()
        .to_string()
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let db_path = PathBuf::from(&args.database);

    log::info!("Starting collection_tracker...");
    log::info!("Database path: {}", db_path.display());

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.exists() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::error!("Failed to create database directory: {}", e);
                std::process::exit(1);
            }
            log::info!("Created directory: {}", parent.display());
        }
    }

    let store = match Store::open(&db_path) {
        Ok(store) => {
            log::info!("Opened database: {}", db_path.display());
            store
        }
        Err(e) => {
            log::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let store = Arc::new(Mutex::new(store));
    let scryfall = ScryfallClient::new();

    if let Err(e) = collection_tracker::web::serve(store, scryfall, args.port).await {
        log::error!("Web server error: {}", e);
        std::process::exit(1);
    }
}
