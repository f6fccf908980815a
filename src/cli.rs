//! Command-line interface for inspecting and mutating the local store and
//! driving sync cycles by hand. This is a diagnostics surface over the same
//! core the mobile shell uses, not a full UI.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;

use crate::config::LarderConfig;
use crate::engine::{run_periodic, SyncEngine};
use crate::model::{InventoryItem, StorageLocation};
use crate::remote::{HttpConnectivity, HttpRemoteStore};
use crate::scheduler::plan_alerts;
use crate::state::AppState;
use crate::storage::FileStore;

#[derive(Parser)]
#[command(name = "larder", about = "Local-first household inventory", version)]
pub struct Cli {
    /// Path to larder.toml (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add an inventory item
    Add {
        name: String,
        quantity: f64,
        unit: String,
        #[arg(long, value_enum, default_value = "fridge")]
        location: StorageLocation,
        /// Expiration date (YYYY-MM-DD)
        #[arg(long)]
        expires: Option<NaiveDate>,
    },
    /// List inventory items
    List,
    /// Remove an inventory item by id
    Remove { id: String },
    /// Show shopping lists
    Lists,
    /// Show saved recipes
    Recipes,
    /// Run one sync cycle now
    Sync,
    /// Sync periodically until interrupted
    Watch,
    /// Show queue depth and collection sizes
    Status,
    /// Preview the expiration alerts the scheduler would register
    Alerts,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = LarderConfig::load(cli.config.clone())?;

    let store = match &config.data_dir {
        Some(dir) => FileStore::at(dir.clone())?,
        None => FileStore::new()?,
    };
    let user_id = config
        .user_id
        .clone()
        .ok_or_else(|| crate::errors::LarderError::Config("user_id is not set".to_string()))?;
    let mut state = AppState::load(Arc::new(store), user_id)?;

    match cli.command {
        Command::Add {
            name,
            quantity,
            unit,
            location,
            expires,
        } => {
            let mut item = InventoryItem::new(state.user_id(), name, quantity, unit, location)?;
            if let Some(date) = expires {
                item = item.with_expiration(date);
            }
            let id = item.id.clone();
            state.add_item(item)?;
            println!("{} {}", "Added".green(), id);
        }
        Command::List => {
            for item in state.inventory() {
                let expires = item
                    .expires_on
                    .map(|d| format!("expires {}", d))
                    .unwrap_or_else(|| "no expiration".to_string());
                println!(
                    "{}  {} {} {} ({}, {})",
                    item.id.dimmed(),
                    item.name.bold(),
                    item.quantity,
                    item.unit,
                    item.location,
                    expires
                );
            }
        }
        Command::Remove { id } => {
            state.remove_item(&id)?;
            println!("{} {}", "Removed".green(), id);
        }
        Command::Lists => {
            for list in state.shopping_lists() {
                println!("{}  {} ({})", list.id.dimmed(), list.name.bold(), list.ownership);
                for line in &list.items {
                    let mark = if line.checked { "x" } else { " " };
                    println!("  [{}] {} {} {}", mark, line.name, line.quantity, line.unit);
                }
            }
        }
        Command::Recipes => {
            for recipe in state.saved_recipes() {
                println!(
                    "{}  {} (catalog #{})",
                    recipe.id.dimmed(),
                    recipe.title.bold(),
                    recipe.recipe_id
                );
            }
        }
        Command::Sync => {
            let remote = HttpRemoteStore::new(&config.endpoint, config.auth_token.clone())?;
            let connectivity = HttpConnectivity::new(&config.endpoint)?;
            let engine = SyncEngine::new(
                Arc::new(remote),
                Arc::new(connectivity),
                config.sync_config(),
            );
            let report = engine.sync_cycle(&mut state).await;
            println!(
                "{} {} succeeded, {} failed, pulled: {}",
                "Sync:".bold(),
                report.success.to_string().green(),
                report.failed.to_string().red(),
                report.pulled
            );
            for outcome in report.outcomes.iter().filter(|o| !o.succeeded()) {
                println!(
                    "  {} {} {} — {}",
                    "retained".yellow(),
                    outcome.kind,
                    outcome.entity_id,
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
        Command::Watch => {
            let remote = HttpRemoteStore::new(&config.endpoint, config.auth_token.clone())?;
            let connectivity = HttpConnectivity::new(&config.endpoint)?;
            let engine = Arc::new(SyncEngine::new(
                Arc::new(remote),
                Arc::new(connectivity),
                config.sync_config(),
            ));
            let state = Arc::new(tokio::sync::Mutex::new(state));

            let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    let _ = shutdown_tx.send(true);
                }
            });

            println!(
                "{} syncing every {}s, ctrl-c to stop",
                "Watching:".bold(),
                config.sync.interval_secs
            );
            run_periodic(engine, state, config.sync_interval(), shutdown_rx).await;
        }
        Command::Status => {
            println!(
                "inventory: {}  lists: {}  recipes: {}  pending ops: {}",
                state.inventory().len(),
                state.shopping_lists().len(),
                state.saved_recipes().len(),
                state.queue().len()?
            );
        }
        Command::Alerts => {
            let alerts = plan_alerts(state.inventory(), &config.alert_config(), Utc::now());
            if alerts.is_empty() {
                println!("No expiration alerts to schedule.");
            }
            for alert in alerts {
                println!(
                    "{}  {}  {:?} at {}",
                    alert.id.dimmed(),
                    alert.item_name.bold(),
                    alert.kind,
                    alert.fire_at
                );
            }
        }
    }

    Ok(())
}
