mod actions;
mod arrange;
mod cache;
mod config;
mod exclusions;
mod model;
mod os_query;
mod reconcile;
mod script_runner;
mod store;
mod switcher;
mod ui_commands;
mod ui_handler;

use actions::Action;
use anyhow::{Context, Result};
use config::{Command, Config, ListArgs, QueryArgs};
use store::LocalStore;
use switcher::Switcher;
use tokio::sync::mpsc;
use tracing::{debug, info};
use ui_handler::RenderOptions;

fn main() -> Result<()> {
    // Parse CLI arguments
    let config = Config::parse();

    // Initialize logging; stdout is reserved for list output
    let log_level = if config.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let data_dir = match &config.data_dir {
        Some(dir) => dir.clone(),
        None => LocalStore::default_dir()?,
    };
    let store = LocalStore::open(data_dir)?;

    // Everything runs on one thread; queries are awaited concurrently, never in parallel
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(run(config, store))
}

async fn run(config: Config, store: LocalStore) -> Result<()> {
    debug!("Using store at {}", store.dir().display());
    let mut switcher = Switcher::new(store, config.order);

    match config.command() {
        Command::List(args) => list(&mut switcher, args).await,
        Command::Switch { id } => perform(&mut switcher, Action::Switch, &id).await,
        Command::Close { id } => perform(&mut switcher, Action::Close, &id).await,
        Command::Minimize { id } => perform(&mut switcher, Action::Minimize, &id).await,
        Command::Hide { id } => perform(&mut switcher, Action::Hide, &id).await,
        Command::Quit { id } => perform(&mut switcher, Action::Quit, &id).await,
        Command::Actions { id } => {
            let item = resolve(&mut switcher, &id).await?;
            for action in Action::available_for(&item) {
                println!("{:<10} {}", action, action.title(&item));
            }
            println!("{:<10} Exclude App", "exclude");
            Ok(())
        }
        Command::Exclude { bundle_id } => {
            let (ui_tx, ui_rx) = mpsc::unbounded_channel();
            switcher.paint_cached(&ui_tx);
            switcher.exclude(&bundle_id, &ui_tx)?;
            drop(ui_tx);
            ui_handler::run(ui_rx, RenderOptions::default()).await?;
            Ok(())
        }
        Command::Include { bundle_id } => {
            let (ui_tx, ui_rx) = mpsc::unbounded_channel();
            switcher.paint_cached(&ui_tx);
            switcher.include(&bundle_id, &ui_tx)?;
            drop(ui_tx);
            ui_handler::run(ui_rx, RenderOptions::default()).await?;
            Ok(())
        }
        Command::Excluded { json } => {
            let excluded = switcher.describe_excluded_apps();
            if json {
                let ids: Vec<&str> = excluded.iter().map(|(id, _)| id.as_str()).collect();
                println!("{}", serde_json::to_string_pretty(&ids)?);
            } else if excluded.is_empty() {
                println!("No excluded apps");
            } else {
                for (bundle_id, name) in excluded {
                    match name {
                        Some(name) => println!("{}  ({})", name, bundle_id),
                        None => println!("{}", bundle_id),
                    }
                }
            }
            Ok(())
        }
        Command::ClearCache => {
            switcher.invalidate_cache()?;
            info!("Cleared running apps cache");
            Ok(())
        }
        Command::Query(args) => query(&mut switcher, args).await,
    }
}

/// Print one inbound query result unmerged, for diagnosing the bridge.
async fn query(switcher: &mut Switcher, args: QueryArgs) -> Result<()> {
    let output = if args.minimized {
        serde_json::to_string_pretty(&switcher.get_minimized_status().await)?
    } else if args.cached {
        serde_json::to_string_pretty(&switcher.get_cached_running_apps())?
    } else {
        serde_json::to_string_pretty(&switcher.get_running_apps().await)?
    };
    println!("{}", output);
    Ok(())
}

/// Paint the cached view (if fresh), then the live and enriched views as
/// each query lands.
async fn list(switcher: &mut Switcher, args: ListArgs) -> Result<()> {
    let options = RenderOptions {
        json: args.json,
        progressive: args.progressive,
        filter: args.filter,
    };
    let cached_only = args.cached_only;
    let (ui_tx, ui_rx) = mpsc::unbounded_channel();

    let producer = async {
        let ui_tx = ui_tx;
        if cached_only {
            if !switcher.paint_cached(&ui_tx) {
                info!("No fresh cached snapshot");
            }
        } else {
            switcher.refresh(&ui_tx).await;
        }
    };

    let ((), view) = tokio::join!(producer, ui_handler::run(ui_rx, options));
    view?;
    Ok(())
}

async fn resolve(switcher: &mut Switcher, id: &str) -> Result<model::DisplayItem> {
    switcher.resolve(id).await.with_context(|| {
        format!(
            "No app or window with id '{}'. Run `mac-alttab list` to see ids.",
            id
        )
    })
}

/// Perform one action. Failures are shown by the UI handler and returned as
/// the command's error; nothing is retried.
async fn perform(switcher: &mut Switcher, action: Action, id: &str) -> Result<()> {
    let item = resolve(switcher, id).await?;
    let (ui_tx, ui_rx) = mpsc::unbounded_channel();

    let producer = async {
        let ui_tx = ui_tx;
        switcher.perform(action, &item, &ui_tx).await
    };

    let (outcome, view) = tokio::join!(producer, ui_handler::run(ui_rx, RenderOptions::default()));
    view?;
    outcome?;
    Ok(())
}
