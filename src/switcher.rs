use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::actions::{Action, ActionError, ActionOutcome};
use crate::arrange::{Partition, arrange};
use crate::cache::ResultCache;
use crate::config::AppOrder;
use crate::exclusions::ExclusionStore;
use crate::model::{App, DisplayItem, MinimizedMap};
use crate::os_query::OsQuery;
use crate::reconcile::{Reconciler, SnapshotSource};
use crate::script_runner::{OsaScript, ScriptRunner};
use crate::store::LocalStore;
use crate::ui_commands::{NotifyStyle, UiCommand};

/// The switcher's public surface: queries, cache, exclusions and actions,
/// plus the refresh cycle that keeps the displayed view current.
pub struct Switcher<R: ScriptRunner = OsaScript> {
    query: OsQuery<R>,
    cache: ResultCache,
    exclusions: ExclusionStore,
    reconciler: Reconciler,
    order: AppOrder,
}

impl Switcher<OsaScript> {
    pub fn new(store: LocalStore, order: AppOrder) -> Self {
        Self::with_runner(OsaScript, store, order)
    }
}

impl<R: ScriptRunner> Switcher<R> {
    /// Create a Switcher with a custom ScriptRunner (for testing)
    pub fn with_runner(runner: R, store: LocalStore, order: AppOrder) -> Self {
        Switcher {
            query: OsQuery::with_runner(runner),
            cache: ResultCache::new(store.clone()),
            exclusions: ExclusionStore::new(store),
            reconciler: Reconciler::new(),
            order,
        }
    }

    /// Run the fast query. A non-empty result is written through to the
    /// cache; an empty one means "unknown" and leaves the cache alone.
    pub async fn get_running_apps(&mut self) -> Vec<App> {
        let apps = self.query.query_running_apps().await;
        remember(&mut self.cache, &apps);
        apps
    }

    pub fn get_cached_running_apps(&mut self) -> Option<Vec<App>> {
        self.cache.get()
    }

    pub async fn get_minimized_status(&self) -> MinimizedMap {
        self.query.query_minimized_status().await
    }

    pub fn get_excluded_apps(&self) -> Vec<String> {
        self.exclusions.list()
    }

    pub fn add_excluded_app(&self, bundle_id: &str) -> Result<bool> {
        self.exclusions.add(bundle_id)
    }

    pub fn remove_excluded_app(&self, bundle_id: &str) -> Result<bool> {
        self.exclusions.remove(bundle_id)
    }

    pub fn invalidate_cache(&mut self) -> Result<()> {
        self.cache.invalidate()
    }

    /// Excluded bundle ids with the app name, when any snapshot knows it.
    pub fn describe_excluded_apps(&mut self) -> Vec<(String, Option<String>)> {
        let mut known = self.cache.last_known();
        if let Some(apps) = self.reconciler.view() {
            known.extend(apps);
        }
        self.get_excluded_apps()
            .into_iter()
            .map(|bundle_id| {
                let name = known
                    .iter()
                    .find(|app| app.bundle_id == bundle_id)
                    .map(|app| app.name.clone());
                (bundle_id, name)
            })
            .collect()
    }

    /// The current sections, or None before any snapshot has arrived.
    pub fn view(&self) -> Option<Partition> {
        let apps = self.reconciler.view()?;
        Some(arrange(&apps, &self.exclusions.as_set(), self.order))
    }

    /// Paint the cached snapshot, if it is still fresh. Returns whether
    /// anything was painted.
    pub fn paint_cached(&mut self, ui_tx: &mpsc::UnboundedSender<UiCommand>) -> bool {
        let Some(cached) = self.get_cached_running_apps() else {
            debug!("No fresh cached snapshot to paint");
            return false;
        };
        let generation = self.reconciler.generation();
        if self
            .reconciler
            .apply_apps(generation, SnapshotSource::Cache, cached)
        {
            self.publish(ui_tx);
            return true;
        }
        false
    }

    /// Run both queries concurrently and re-publish the merged view each time
    /// one of them lands.
    ///
    /// The slow query may finish first. Results from a refresh that has since
    /// been superseded are dropped by the reconciler rather than cancelled.
    pub async fn refresh(&mut self, ui_tx: &mpsc::UnboundedSender<UiCommand>) {
        let generation = self.reconciler.begin_refresh();
        debug!("Starting refresh {}", generation);

        if self.reconciler.source().is_none() {
            self.paint_cached(ui_tx);
        }

        let query = &self.query;
        let running_apps = query.query_running_apps();
        let minimized_status = query.query_minimized_status();
        tokio::pin!(running_apps, minimized_status);

        let mut apps_done = false;
        let mut minimized_done = false;

        while !(apps_done && minimized_done) {
            tokio::select! {
                apps = &mut running_apps, if !apps_done => {
                    apps_done = true;
                    if apps.is_empty() {
                        warn!("Running apps query came back empty, keeping previous view");
                    } else {
                        debug!("Live snapshot with {} apps", apps.len());
                        remember(&mut self.cache, &apps);
                        if self.reconciler.apply_apps(generation, SnapshotSource::Live, apps) {
                            publish(&self.reconciler, &self.exclusions, self.order, ui_tx);
                        }
                    }
                }
                minimized = &mut minimized_status, if !minimized_done => {
                    minimized_done = true;
                    debug!("Minimized statuses for {} apps", minimized.len());
                    if self.reconciler.apply_minimized(generation, minimized) {
                        publish(&self.reconciler, &self.exclusions, self.order, ui_tx);
                    }
                }
            }
        }

        debug!("Refresh {} complete", generation);
    }

    /// Find a displayed item by id, refreshing first so the action targets
    /// live window indices.
    pub async fn resolve(&mut self, id: &str) -> Option<DisplayItem> {
        let (tx, _rx) = mpsc::unbounded_channel();
        self.refresh(&tx).await;
        self.view()?.find(id).cloned()
    }

    /// Perform a user action once. A switch dismisses the presentation; any
    /// other success notifies and refreshes; failures are reported, not
    /// retried.
    pub async fn perform(
        &mut self,
        action: Action,
        item: &DisplayItem,
        ui_tx: &mpsc::UnboundedSender<UiCommand>,
    ) -> Result<ActionOutcome, ActionError> {
        let result = action.perform(self.query.runner(), item).await;

        match &result {
            Ok(ActionOutcome::Dismiss) => send(ui_tx, UiCommand::Dismiss),
            Ok(ActionOutcome::Refresh { message }) => {
                send(
                    ui_tx,
                    UiCommand::Notify {
                        style: NotifyStyle::Success,
                        title: message.clone(),
                        message: None,
                    },
                );
                self.refresh(ui_tx).await;
            }
            Err(e) => send(
                ui_tx,
                UiCommand::Notify {
                    style: NotifyStyle::Failure,
                    title: "Action failed".to_string(),
                    message: Some(e.to_string()),
                },
            ),
        }

        result
    }

    /// Hide an app from the switcher and re-publish the view without it.
    pub fn exclude(
        &mut self,
        bundle_id: &str,
        ui_tx: &mpsc::UnboundedSender<UiCommand>,
    ) -> Result<ActionOutcome> {
        let name = self.app_name_for(bundle_id);
        let message = if self.add_excluded_app(bundle_id)? {
            format!("{} excluded", name)
        } else {
            format!("{} was already excluded", name)
        };
        Ok(self.notify_and_publish(message, ui_tx))
    }

    /// Show a previously excluded app again.
    pub fn include(
        &mut self,
        bundle_id: &str,
        ui_tx: &mpsc::UnboundedSender<UiCommand>,
    ) -> Result<ActionOutcome> {
        let name = self.app_name_for(bundle_id);
        let message = if self.remove_excluded_app(bundle_id)? {
            format!("{} restored", name)
        } else {
            format!("{} was not excluded", name)
        };
        Ok(self.notify_and_publish(message, ui_tx))
    }

    fn app_name_for(&mut self, bundle_id: &str) -> String {
        self.reconciler
            .view()
            .unwrap_or_default()
            .into_iter()
            .chain(self.cache.last_known())
            .find(|app| app.bundle_id == bundle_id)
            .map(|app| app.name)
            .unwrap_or_else(|| bundle_id.to_string())
    }

    fn notify_and_publish(
        &self,
        message: String,
        ui_tx: &mpsc::UnboundedSender<UiCommand>,
    ) -> ActionOutcome {
        send(
            ui_tx,
            UiCommand::Notify {
                style: NotifyStyle::Success,
                title: message.clone(),
                message: None,
            },
        );
        self.publish(ui_tx);
        ActionOutcome::Refresh { message }
    }

    fn publish(&self, ui_tx: &mpsc::UnboundedSender<UiCommand>) {
        publish(&self.reconciler, &self.exclusions, self.order, ui_tx);
    }
}

fn remember(cache: &mut ResultCache, apps: &[App]) {
    if apps.is_empty() {
        return;
    }
    if let Err(e) = cache.set(apps.to_vec()) {
        warn!("Failed to cache running apps: {}", e);
    }
}

fn publish(
    reconciler: &Reconciler,
    exclusions: &ExclusionStore,
    order: AppOrder,
    ui_tx: &mpsc::UnboundedSender<UiCommand>,
) {
    let (Some(apps), Some(source)) = (reconciler.view(), reconciler.source()) else {
        return;
    };
    let partition = arrange(&apps, &exclusions.as_set(), order);
    debug!(
        "Publishing {} items ({} active, {} minimized, {} windowless)",
        partition.len(),
        partition.active.len(),
        partition.minimized.len(),
        partition.windowless.len()
    );
    send(
        ui_tx,
        UiCommand::Render {
            source,
            enriched: reconciler.is_enriched(),
            partition,
        },
    );
}

fn send(ui_tx: &mpsc::UnboundedSender<UiCommand>, command: UiCommand) {
    if ui_tx.send(command).is_err() {
        error!("Failed to send UI command, receiver dropped");
    }
}
