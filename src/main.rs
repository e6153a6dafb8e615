use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lms_data::migrate::run_migrations;
use lms_data::store::{DocumentBackend, PostgresAdapter, StoreAdapter};
use lms_data::{AppConfig, Database, StoreKey};

#[derive(Parser)]
#[command(name = "lms-data", about = "LMS data layer: routing, store adapters and cross-store sync")]
struct Cli {
    /// TOML configuration file; environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply SQL migrations to the relational store
    Migrate {
        #[arg(long, default_value = "migrations")]
        dir: PathBuf,
    },
    /// Show routing table, store connectivity and metrics
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default filter
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,lms_data=debug")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Migrate { dir } => migrate(&config, &dir).await,
        Command::Status => status(&config).await,
    }
}

async fn migrate(config: &AppConfig, dir: &std::path::Path) -> anyhow::Result<()> {
    tracing::info!(environment = %config.environment, dir = %dir.display(), "🚀 Running migrations");

    let adapter = PostgresAdapter::new(config.postgres_profile().clone());
    let pool = adapter
        .get_instance()
        .await
        .context("relational store unavailable")?;

    let result = run_migrations(&pool, dir).await;
    adapter.disconnect().await;

    let applied = result?;
    tracing::info!(applied, "🎉 Migrations complete");
    Ok(())
}

async fn status(config: &AppConfig) -> anyhow::Result<()> {
    let db = Database::build(config)?;
    db.connect_all().await;

    println!("Stores:");
    for store in StoreKey::ALL {
        let state = if db.stores().is_connected(store).await {
            "connected"
        } else {
            "unavailable"
        };
        println!("  {store:<10} {state}");
    }
    if let Some(handle) = db.stores().document.current_handle().await {
        println!("  document backend: {}", handle.kind());
    }

    println!("\nRouting:");
    for route in db.router().routed_entities() {
        let attached = if route.attached { "" } else { "  (no model attached)" };
        println!("  {:<20} -> {}{attached}", route.entity, route.store);
    }

    let sync = db.sync();
    println!("\nSync ({}):", if sync.is_enabled() { "enabled" } else { "disabled" });
    for rule in sync.rules() {
        let fields = rule
            .fields
            .as_ref()
            .map(|f| f.join(","))
            .unwrap_or_else(|| "*".to_string());
        println!("  {:<12} {} [{fields}]", rule.trigger.as_str(), rule.label());
    }

    println!("\nMetrics:\n{}", db.metrics().render());

    db.shutdown().await;
    Ok(())
}
