use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppOrder {
    /// Frontmost app first, then by name
    #[default]
    MostRecent,
    /// By name only
    Alphabetical,
}

impl AppOrder {
    /// Read a stored preference value, falling back to the default for
    /// anything unrecognised.
    pub fn from_preference(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }
}

/// Lenient `--order` parser: anything unrecognised means the default order.
fn parse_order(value: &str) -> Result<AppOrder, String> {
    Ok(AppOrder::from_preference(Some(value)))
}

impl FromStr for AppOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "most-recent" => Ok(AppOrder::MostRecent),
            "alphabetical" => Ok(AppOrder::Alphabetical),
            other => Err(format!("unknown app order: {}", other)),
        }
    }
}

impl fmt::Display for AppOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppOrder::MostRecent => "most-recent",
            AppOrder::Alphabetical => "alphabetical",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Default, clap::Args)]
pub struct ListArgs {
    /// Print the sections as JSON
    #[arg(long)]
    pub json: bool,

    /// Print every intermediate view (cached, live, enriched), not just the last
    #[arg(long)]
    pub progressive: bool,

    /// Only print the cached snapshot; do not query the system
    #[arg(long, conflicts_with = "progressive")]
    pub cached_only: bool,

    /// Only show items whose app name, window title or bundle id contains this text
    #[arg(short, long)]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Default, clap::Args)]
pub struct QueryArgs {
    /// Run the slow minimized-status query instead of the running apps query
    #[arg(long)]
    pub minimized: bool,

    /// Print the cached snapshot, if still fresh, without querying
    #[arg(long, conflicts_with = "minimized")]
    pub cached: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List running apps and their windows (default if no command specified)
    List(ListArgs),
    /// Bring an app or window to the front
    Switch { id: String },
    /// Close a window
    Close { id: String },
    /// Minimize a window
    Minimize { id: String },
    /// Hide an app
    Hide { id: String },
    /// Quit an app
    Quit { id: String },
    /// Show which actions apply to an item
    Actions { id: String },
    /// Hide an app from the switcher by bundle identifier
    Exclude { bundle_id: String },
    /// Show a previously excluded app again
    Include { bundle_id: String },
    /// List excluded apps
    Excluded {
        #[arg(long)]
        json: bool,
    },
    /// Forget the cached app snapshot
    ClearCache,
    /// Print the raw result of one OS query as JSON
    Query(QueryArgs),
}

#[derive(Debug, Clone, Parser)]
#[command(name = "mac-alttab")]
#[command(about = "Application and window switcher for macOS", long_about = None)]
pub struct Config {
    /// App ordering: most-recent or alphabetical
    #[arg(short, long, value_parser = parse_order, default_value_t = AppOrder::MostRecent)]
    pub order: AppOrder,

    /// Directory for the exclusion list and app cache
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Config {
    pub fn parse() -> Self {
        <Config as Parser>::parse()
    }

    /// Get the command, defaulting to List if none specified
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::List(ListArgs::default()))
    }
}
