//! Fab Collection - Card Collection & Decklist Tracker
//!
//! Serves the collection API over HTTP, backed by SQLite. On startup the
//! card catalog snapshot is loaded into the database if its contents
//! changed since the last run.

use clap::Parser;
use fab_collection::{init_schema, load_catalog_if_changed, CatalogSnapshot, SessionStore};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Card collection tracker - reconciles decklists against owned printings
#[derive(Parser, Debug)]
#[command(name = "fab_collection")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    #[arg(short, long, default_value_t = default_db_path())]
    database: String,

    /// Path to the card catalog snapshot (JSON)
    #[arg(short, long, default_value = "cards.json")]
    catalog: String,

    /// Port for the HTTP API
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Deck session lifetime in minutes
    #[arg(long, default_value_t = 30)]
    session_ttl_mins: u64,

    /// Base URL of the deck-building service
    #[arg(long, default_value = fab_collection::import::DEFAULT_BASE_URL)]
    import_api: String,
}

/// Returns the default database path: ~/.local/share/fab_collection/collection.db
fn default_db_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fab_collection")
        .join("collection.db")
        .to_string_lossy()
        .to_string()
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let db_path = PathBuf::from(&args.database);

    log::info!("Starting fab_collection...");
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

    // Open database connection
    let mut conn = match Connection::open(&db_path) {
        Ok(conn) => {
            log::info!("Opened database: {}", db_path.display());
            conn
        }
        Err(e) => {
            log::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize database schema
    if let Err(e) = init_schema(&conn) {
        log::error!("Failed to initialize database schema: {}", e);
        std::process::exit(1);
    }

    // Load the catalog snapshot if its contents changed since the last run.
    // A missing snapshot is not fatal: the database keeps serving whatever
    // catalog it already holds.
    match CatalogSnapshot::load(&args.catalog) {
        Ok(snapshot) => match load_catalog_if_changed(&mut conn, &snapshot) {
            Ok(result) => {
                if result.reloaded {
                    log::info!(
                        "Loaded catalog snapshot: {} cards, {} printings",
                        result.cards,
                        result.printings
                    );
                } else {
                    log::info!("Catalog snapshot unchanged, keeping existing data");
                }
            }
            Err(e) => {
                log::error!("Failed to load catalog snapshot: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            log::warn!(
                "Catalog snapshot unavailable ({}), serving existing data",
                e
            );
        }
    }

    let db = Arc::new(Mutex::new(conn));
    let sessions = Arc::new(SessionStore::new(Duration::from_secs(
        args.session_ttl_mins * 60,
    )));

    if let Err(e) = fab_collection::web::serve(db, sessions, args.import_api, args.port).await {
        log::error!("Web server error: {}", e);
        std::process::exit(1);
    }
}
