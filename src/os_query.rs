//! Batched queries against System Events.
//!
//! The fast query reads everything needed to draw the list in one script:
//! process names, bundle ids, frontmost flags, resolved paths and window
//! titles. The slow query reads `AXMinimized` for every window, which costs
//! one attribute round-trip per window, and is run separately so it never
//! delays the first paint.

use serde_json::Value;
use tracing::{debug, warn};

use crate::model::{App, MinimizedMap, WindowStatus};
use crate::script_runner::{OsaScript, Script, ScriptRunner};

pub const RUNNING_APPS_LABEL: &str = "running-apps";
pub const MINIMIZED_STATUS_LABEL: &str = "minimized-status";

const RUNNING_APPS_SCRIPT: &str = r#"(() => {
  ObjC.import("AppKit");
  var workspace = $.NSWorkspace.sharedWorkspace;
  var events = Application("System Events");
  var procs = events.processes.whose({ backgroundOnly: false });
  var names = procs.name();
  var bundleIds = procs.bundleIdentifier();
  var frontmost = procs.frontmost();
  var apps = [];
  for (var i = 0; i < names.length; i++) {
    if (!bundleIds[i]) continue;
    var appPath = "";
    try {
      var url = workspace.URLForApplicationWithBundleIdentifier(bundleIds[i]);
      if (url && url.path) appPath = ObjC.unwrap(url.path);
    } catch (e) {}
    var procWindows = [];
    try { procWindows = procs[i].windows(); } catch (e) {}
    var windows = [];
    for (var j = 0; j < procWindows.length; j++) {
      var title = "";
      var number = null;
      try { title = procWindows[j].name() || ""; } catch (e) {}
      try { number = procWindows[j].attributes.byName("AXWindowNumber").value(); } catch (e) {}
      var window = { title: title, minimized: false, index: j };
      if (typeof number === "number") window.windowNumber = number;
      windows.push(window);
    }
    apps.push({
      name: names[i],
      bundleId: bundleIds[i],
      frontmost: frontmost[i],
      appPath: appPath,
      windows: windows
    });
  }
  return JSON.stringify(apps);
})()"#;

const MINIMIZED_STATUS_SCRIPT: &str = r#"(() => {
  var events = Application("System Events");
  var procs = events.processes.whose({ backgroundOnly: false });
  var bundleIds = procs.bundleIdentifier();
  var result = {};
  for (var i = 0; i < bundleIds.length; i++) {
    if (!bundleIds[i]) continue;
    try {
      var flags = procs[i].windows.attributes.byName("AXMinimized").value();
      if (!flags || flags.length === 0) continue;
      var numbers = [];
      try { numbers = procs[i].windows.attributes.byName("AXWindowNumber").value(); } catch (e) {}
      var statuses = [];
      for (var j = 0; j < flags.length; j++) {
        var status = { minimized: flags[j] === true };
        if (numbers && typeof numbers[j] === "number") status.windowNumber = numbers[j];
        statuses.push(status);
      }
      result[bundleIds[i]] = statuses;
    } catch (e) {}
  }
  return JSON.stringify(result);
})()"#;

/// Issues the two read-only queries and validates their output.
///
/// Neither query ever fails: bridge errors and malformed output degrade to an
/// empty result, which callers must read as "unknown" rather than "nothing
/// running".
pub struct OsQuery<R: ScriptRunner = OsaScript> {
    runner: R,
}

impl<R: ScriptRunner> OsQuery<R> {
    /// Create an OsQuery with a custom ScriptRunner (for testing)
    pub fn with_runner(runner: R) -> Self {
        OsQuery { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Fast path: running apps with their windows, minimized flags unset.
    pub async fn query_running_apps(&self) -> Vec<App> {
        let script = Script::javascript(RUNNING_APPS_LABEL, RUNNING_APPS_SCRIPT);
        match self.runner.run(&script).await {
            Ok(output) => parse_running_apps(&output),
            Err(e) => {
                warn!("Running apps query failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Slow path: per-window minimized statuses keyed by bundle id.
    pub async fn query_minimized_status(&self) -> MinimizedMap {
        let script = Script::javascript(MINIMIZED_STATUS_LABEL, MINIMIZED_STATUS_SCRIPT);
        match self.runner.run(&script).await {
            Ok(output) => parse_minimized_status(&output),
            Err(e) => {
                warn!("Minimized status query failed: {}", e);
                MinimizedMap::new()
            }
        }
    }
}

/// Parse the fast query's output.
///
/// Entries are validated one by one so a single odd process cannot sink the
/// whole list; anything without a bundle id is not addressable and dropped.
#[must_use]
fn parse_running_apps(output: &str) -> Vec<App> {
    let entries: Vec<Value> = match serde_json::from_str(output) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Discarding malformed running apps output: {}", e);
            return Vec::new();
        }
    };

    let apps: Vec<App> = entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<App>(entry) {
            Ok(app) if !app.bundle_id.is_empty() => Some(app),
            Ok(app) => {
                debug!("Skipping '{}': no bundle identifier", app.name);
                None
            }
            Err(e) => {
                debug!("Skipping malformed app entry: {}", e);
                None
            }
        })
        .collect();

    debug!("Fast query returned {} addressable apps", apps.len());
    apps
}

/// Parse the slow query's output. Per-process entries that do not parse are
/// omitted, exactly like processes the script itself could not read.
#[must_use]
fn parse_minimized_status(output: &str) -> MinimizedMap {
    let entries: serde_json::Map<String, Value> = match serde_json::from_str(output) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Discarding malformed minimized status output: {}", e);
            return MinimizedMap::new();
        }
    };

    entries
        .into_iter()
        .filter_map(
            |(bundle_id, statuses)| match serde_json::from_value::<Vec<WindowStatus>>(statuses) {
                Ok(statuses) => Some((bundle_id, statuses)),
                Err(e) => {
                    debug!("Skipping minimized status for {}: {}", bundle_id, e);
                    None
                }
            },
        )
        .collect()
}
