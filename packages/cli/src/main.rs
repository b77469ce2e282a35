use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sea_orm::DatabaseConnection;
use slugstore::database::{connect, init_db};
use slugstore::{AppConfig, OwnerRef, SlugCache, SlugService};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "slugstore", version, about = "Inspect and maintain slug tables")]
struct Cli {
    /// Overrides `database.url` from the config file.
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the slugs table and its indexes.
    Init,
    /// Find the owner of a slug path such as `clients/fancylad`.
    Resolve { owner_type: String, path: String },
    /// Report whether a slug is the owner's current one, an old one, or neither.
    Classify {
        owner_type: String,
        owner_id: i64,
        slug: String,
    },
    /// List every slug the owner has had, oldest first.
    History { owner_type: String, owner_id: i64 },
    /// Delete all slugs of an owner.
    Purge { owner_type: String, owner_id: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load().context("Failed to load config")?;
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }

    // Only `init` issues DDL; the other commands work with a read-mostly role.
    let db = match cli.command {
        Command::Init => init_db(&config.database).await,
        _ => connect(&config.database).await,
    }
    .context("Failed to connect to database")?;
    let cache = SlugCache::from_config(&config.slugs.cache);

    run(cli.command, &db, &cache).await
}

async fn run(
    command: Command,
    db: &DatabaseConnection,
    cache: &SlugCache,
) -> anyhow::Result<ExitCode> {
    let service = SlugService::new(db, cache);

    match command {
        Command::Init => {
            info!("Schema ready");
        }
        Command::Resolve { owner_type, path } => {
            match service.try_resolve_from_path(&owner_type, &path).await? {
                Some(owner) => println!("{owner}"),
                None => {
                    eprintln!("No {owner_type} has the slug path '{path}'");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Command::Classify {
            owner_type,
            owner_id,
            slug,
        } => {
            let status = service
                .classify(&OwnerRef::new(owner_type, owner_id), &slug)
                .await?;
            println!("{status:?}");
        }
        Command::History {
            owner_type,
            owner_id,
        } => {
            let rows = service
                .history(&OwnerRef::new(owner_type, owner_id))
                .await?;
            if rows.is_empty() {
                eprintln!("No slugs recorded");
                return Ok(ExitCode::FAILURE);
            }
            for row in rows {
                let marker = if row.active { "*" } else { " " };
                let created = row
                    .created_at
                    .map(|at| at.to_rfc3339())
                    .unwrap_or_default();
                println!("{marker} {:>6}  {:<40}  {created}", row.id, row.path());
            }
        }
        Command::Purge {
            owner_type,
            owner_id,
        } => {
            let owner = OwnerRef::new(owner_type, owner_id);
            let deleted = service.delete_owner_slugs(&owner).await?;
            println!("Deleted {deleted} slug(s) of {owner}");
        }
    }

    Ok(ExitCode::SUCCESS)
}
