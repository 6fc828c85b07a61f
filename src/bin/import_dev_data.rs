//! Load developers from a JSON file into the database, or delete them all.

use clap::{ArgGroup, Parser};
use devcatalog::config::database_url_from_env;
use devcatalog::model::NewDeveloper;
use devcatalog::{ensure_database_exists, ensure_tables, DeveloperStore, PgDeveloperStore};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "import-dev-data", about = "Import or delete developer fixture data", version)]
#[command(group(ArgGroup::new("action").required(true).args(["import", "delete"])))]
struct CliArgs {
    /// Insert every developer from `--file` in one transaction.
    #[arg(long)]
    import: bool,
    /// Delete every developer, secret ones included.
    #[arg(long)]
    delete: bool,
    /// JSON array of developers.
    #[arg(long, value_name = "path", default_value = "data/developers.json")]
    file: PathBuf,
    /// Database connection URL. Falls back to `DATABASE_URL` when omitted.
    #[arg(long = "database-url", value_name = "url")]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("devcatalog=info,import_dev_data=info")),
        )
        .init();

    let args = CliArgs::parse();
    let database_url = args.database_url.clone().unwrap_or_else(database_url_from_env);
    ensure_database_exists(&database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;
    ensure_tables(&pool).await?;
    let store = PgDeveloperStore::new(pool);

    if args.import {
        let raw = std::fs::read_to_string(&args.file)?;
        let developers: Vec<NewDeveloper> = serde_json::from_str(&raw)?;
        let records = developers
            .into_iter()
            .map(NewDeveloper::validate)
            .collect::<Result<Vec<_>, _>>()?;
        let inserted = store.insert_many(&records).await?;
        tracing::info!(inserted, file = %args.file.display(), "data successfully loaded");
    } else if args.delete {
        let deleted = store.delete_all().await?;
        tracing::info!(deleted, "data successfully deleted");
    }
    Ok(())
}
