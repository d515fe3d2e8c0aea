use tracing::debug;

use crate::model::{App, MinimizedMap, Window, WindowStatus};

/// Where the current app snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    Cache,
    Live,
}

/// Merge minimized statuses from the slow query onto a fast-query snapshot.
///
/// Pure and recomputed from scratch on every call, so it can be re-run
/// whenever either input changes:
/// - no map yet: the snapshot is returned as is
/// - bundle id missing from the map: that app is left untouched
/// - otherwise each window takes its status from the map (see
///   [`status_for_window`]), defaulting to not minimized
#[must_use]
pub fn merge(apps: &[App], minimized: Option<&MinimizedMap>) -> Vec<App> {
    let Some(minimized) = minimized else {
        return apps.to_vec();
    };

    apps.iter()
        .map(|app| match minimized.get(&app.bundle_id) {
            Some(statuses) => App {
                windows: app
                    .windows
                    .iter()
                    .map(|window| Window {
                        minimized: status_for_window(window, statuses)
                            .is_some_and(|status| status.minimized()),
                        ..window.clone()
                    })
                    .collect(),
                ..app.clone()
            },
            None => app.clone(),
        })
        .collect()
}

/// Find the status belonging to `window`.
///
/// A matching OS window number wins, since it survives windows opening or
/// closing between the two queries. Otherwise the status at the window's
/// position is used, unless both sides carry window numbers that disagree,
/// which means the list shifted underneath us.
#[must_use]
fn status_for_window<'a>(window: &Window, statuses: &'a [WindowStatus]) -> Option<&'a WindowStatus> {
    if let Some(number) = window.window_number
        && let Some(status) = statuses.iter().find(|s| s.window_number() == Some(number))
    {
        return Some(status);
    }

    let positional = statuses.get(window.index)?;
    match (window.window_number, positional.window_number()) {
        (Some(ours), Some(theirs)) if ours != theirs => {
            debug!(
                "Window {} moved between queries (number {} vs {}), assuming not minimized",
                window.index, ours, theirs
            );
            None
        }
        _ => Some(positional),
    }
}

/// Holds the latest input pair for [`merge`] across a refresh cycle.
///
/// Every refresh gets a generation number. Results from anything but the
/// newest refresh are ignored instead of cancelled, and a minimized map is
/// only merged onto a snapshot from the same refresh or an older one.
#[derive(Debug, Default)]
pub struct Reconciler {
    generation: u64,
    apps: Option<(u64, SnapshotSource, Vec<App>)>,
    minimized: Option<(u64, MinimizedMap)>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new refresh cycle and return its generation.
    pub fn begin_refresh(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Record an app snapshot. Returns false if it was stale and ignored.
    ///
    /// Within one generation a live snapshot replaces a cached one, never the
    /// other way round.
    pub fn apply_apps(&mut self, generation: u64, source: SnapshotSource, apps: Vec<App>) -> bool {
        let demotes_live = matches!(
            &self.apps,
            Some((current, SnapshotSource::Live, _))
                if *current == generation && source == SnapshotSource::Cache
        );
        if generation < self.generation || demotes_live {
            debug!("Ignoring stale {:?} snapshot from generation {}", source, generation);
            return false;
        }
        self.apps = Some((generation, source, apps));
        true
    }

    /// Record a minimized map. Returns false if it was stale and ignored.
    pub fn apply_minimized(&mut self, generation: u64, minimized: MinimizedMap) -> bool {
        if generation < self.generation {
            debug!("Ignoring stale minimized map from generation {}", generation);
            return false;
        }
        self.minimized = Some((generation, minimized));
        true
    }

    pub fn source(&self) -> Option<SnapshotSource> {
        self.apps.as_ref().map(|(_, source, _)| *source)
    }

    /// The minimized map, if it is at least as new as the held snapshot.
    fn current_minimized(&self) -> Option<&MinimizedMap> {
        let (snapshot_generation, _, _) = self.apps.as_ref()?;
        let (generation, map) = self.minimized.as_ref()?;
        (generation >= snapshot_generation).then_some(map)
    }

    /// Whether the view carries minimized statuses for the held snapshot.
    pub fn is_enriched(&self) -> bool {
        self.current_minimized().is_some()
    }

    /// The merged view of the latest inputs, or None before any snapshot.
    pub fn view(&self) -> Option<Vec<App>> {
        let (_, _, apps) = self.apps.as_ref()?;
        Some(merge(apps, self.current_minimized()))
    }
}
