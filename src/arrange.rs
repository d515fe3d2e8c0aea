//! Turns an enriched app list into the three sections the switcher shows.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::config::AppOrder;
use crate::model::{App, DisplayItem};

/// Items split by window state. Within each section items follow the app
/// sort order, then window index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub active: Vec<DisplayItem>,
    pub minimized: Vec<DisplayItem>,
    pub windowless: Vec<DisplayItem>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.active.len() + self.minimized.len() + self.windowless.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sections in display order with their titles.
    pub fn sections(&self) -> [(&'static str, &[DisplayItem]); 3] {
        [
            ("Active", self.active.as_slice()),
            ("Minimized", self.minimized.as_slice()),
            ("No Windows", self.windowless.as_slice()),
        ]
    }

    pub fn iter(&self) -> impl Iterator<Item = &DisplayItem> {
        self.active
            .iter()
            .chain(&self.minimized)
            .chain(&self.windowless)
    }

    pub fn find(&self, id: &str) -> Option<&DisplayItem> {
        self.iter().find(|item| item.id == id)
    }

    /// Keep only items matching `query`, preserving section order.
    #[must_use]
    pub fn filter(&self, query: &str) -> Partition {
        let keep = |items: &Vec<DisplayItem>| -> Vec<DisplayItem> {
            items.iter().filter(|item| item.matches(query)).cloned().collect()
        };
        Partition {
            active: keep(&self.active),
            minimized: keep(&self.minimized),
            windowless: keep(&self.windowless),
        }
    }
}

/// Name comparison used for sorting: case-insensitive first, with the raw
/// string as a tie-breaker so the order is total and deterministic.
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Sort apps in place for the given order.
pub fn sort_apps(apps: &mut [App], order: AppOrder) {
    match order {
        AppOrder::Alphabetical => {
            apps.sort_by(|a, b| compare_names(&a.name, &b.name));
        }
        AppOrder::MostRecent => {
            apps.sort_by(|a, b| {
                b.frontmost
                    .cmp(&a.frontmost)
                    .then_with(|| compare_names(&a.name, &b.name))
            });
        }
    }
}

/// Drop excluded apps, sort the rest and split their windows into sections.
#[must_use]
pub fn arrange(apps: &[App], excluded: &HashSet<String>, order: AppOrder) -> Partition {
    let mut visible: Vec<App> = apps
        .iter()
        .filter(|app| !excluded.contains(&app.bundle_id))
        .cloned()
        .collect();
    sort_apps(&mut visible, order);

    let mut partition = Partition::default();

    for app in &visible {
        if app.windows.is_empty() {
            partition.windowless.push(DisplayItem {
                id: DisplayItem::windowless_id(&app.bundle_id),
                app_name: app.name.clone(),
                bundle_id: app.bundle_id.clone(),
                app_path: app.app_path.clone(),
                window_title: None,
                window_index: None,
                window_number: None,
                minimized: false,
                has_windows: false,
                frontmost: app.frontmost,
            });
            continue;
        }

        // A lone window is identified well enough by the app name.
        let multi_window = app.windows.len() > 1;

        let mut windows: Vec<_> = app.windows.iter().collect();
        windows.sort_by_key(|window| window.index);

        for window in windows {
            let window_title = multi_window.then(|| {
                if window.title.is_empty() {
                    app.name.clone()
                } else {
                    window.title.clone()
                }
            });
            let item = DisplayItem {
                id: DisplayItem::window_id(&app.bundle_id, window.index),
                app_name: app.name.clone(),
                bundle_id: app.bundle_id.clone(),
                app_path: app.app_path.clone(),
                window_title,
                window_index: Some(window.index),
                window_number: window.window_number,
                minimized: window.minimized,
                has_windows: true,
                frontmost: app.frontmost && !window.minimized,
            };

            if window.minimized {
                partition.minimized.push(item);
            } else {
                partition.active.push(item);
            }
        }
    }

    partition
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Window;

    fn make_window(index: usize, title: &str, minimized: bool) -> Window {
        Window {
            title: title.to_string(),
            minimized,
            index,
            window_number: None,
        }
    }

    fn make_app(bundle_id: &str, name: &str, frontmost: bool, windows: Vec<Window>) -> App {
        App {
            name: name.to_string(),
            bundle_id: bundle_id.to_string(),
            frontmost,
            app_path: format!("/Applications/{}.app", name),
            windows,
        }
    }

    fn no_exclusions() -> HashSet<String> {
        HashSet::new()
    }

    fn bundle_order(items: &[DisplayItem]) -> Vec<&str> {
        items.iter().map(|item| item.bundle_id.as_str()).collect()
    }

    #[test]
    fn test_most_recent_puts_frontmost_first() {
        let apps = vec![
            make_app("a", "Zed", false, vec![make_window(0, "", false)]),
            make_app("b", "Ant", true, vec![make_window(0, "", false)]),
        ];

        let partition = arrange(&apps, &no_exclusions(), AppOrder::MostRecent);

        assert_eq!(bundle_order(&partition.active), vec!["b", "a"]);
    }

    #[test]
    fn test_most_recent_frontmost_beats_alphabetical() {
        let apps = vec![
            make_app("b", "Ant", false, vec![]),
            make_app("a", "Zed", true, vec![]),
            make_app("c", "Mail", false, vec![]),
        ];

        let partition = arrange(&apps, &no_exclusions(), AppOrder::MostRecent);

        assert_eq!(bundle_order(&partition.windowless), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_alphabetical_ignores_frontmost() {
        let apps = vec![
            make_app("z", "zsh", true, vec![]),
            make_app("m", "Mail", false, vec![]),
            make_app("a", "Ant", false, vec![]),
        ];

        let partition = arrange(&apps, &no_exclusions(), AppOrder::Alphabetical);

        let names: Vec<&str> = partition.windowless.iter().map(|i| i.app_name.as_str()).collect();
        assert_eq!(names, vec!["Ant", "Mail", "zsh"]);
        assert!(names.windows(2).all(|w| compare_names(w[0], w[1]) != Ordering::Greater));
    }

    #[test]
    fn test_ties_resolve_deterministically() {
        let apps = vec![
            make_app("lower", "notes", false, vec![]),
            make_app("upper", "Notes", false, vec![]),
        ];
        let reversed: Vec<App> = apps.iter().rev().cloned().collect();

        let first = arrange(&apps, &no_exclusions(), AppOrder::MostRecent);
        let second = arrange(&reversed, &no_exclusions(), AppOrder::MostRecent);

        assert_eq!(first, second);
        assert_eq!(bundle_order(&first.windowless), vec!["upper", "lower"]);
    }

    #[test]
    fn test_excluded_apps_are_dropped() {
        let apps = vec![
            make_app("a", "Alpha", true, vec![make_window(0, "", false)]),
            make_app("b", "Beta", false, vec![make_window(0, "", true)]),
            make_app("c", "Gamma", false, vec![]),
        ];
        let excluded = HashSet::from(["a".to_string(), "c".to_string()]);

        let partition = arrange(&apps, &excluded, AppOrder::MostRecent);

        assert!(partition.iter().all(|item| item.bundle_id == "b"));
        assert_eq!(partition.len(), 1);
    }

    #[test]
    fn test_partition_is_complete() {
        let apps = vec![
            make_app(
                "a",
                "Alpha",
                true,
                vec![
                    make_window(0, "one", false),
                    make_window(1, "two", true),
                    make_window(2, "three", false),
                ],
            ),
            make_app("b", "Beta", false, vec![]),
            make_app("c", "Gamma", false, vec![make_window(0, "", true)]),
        ];

        let partition = arrange(&apps, &no_exclusions(), AppOrder::MostRecent);

        assert_eq!(partition.active.len(), 2);
        assert_eq!(partition.minimized.len(), 2);
        assert_eq!(partition.windowless.len(), 1);
        assert_eq!(partition.len(), 3 + 1 + 1);

        let ids: HashSet<&str> = partition.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids.len(), partition.len());
        assert!(ids.contains("a-w1"));
        assert!(ids.contains("b-no-window"));
        assert!(partition.minimized.iter().all(|item| item.minimized));
        assert!(partition.active.iter().all(|item| !item.minimized));
    }

    #[test]
    fn test_items_follow_app_order_then_window_index() {
        let apps = vec![
            make_app("b", "Beta", false, vec![make_window(1, "b1", false), make_window(0, "b0", false)]),
            make_app("a", "Alpha", false, vec![make_window(0, "a0", false)]),
        ];

        let partition = arrange(&apps, &no_exclusions(), AppOrder::Alphabetical);

        let ids: Vec<&str> = partition.active.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["a-w0", "b-w0", "b-w1"]);
    }

    #[test]
    fn test_single_window_has_no_window_title() {
        let apps = vec![make_app("a", "Alpha", false, vec![make_window(0, "Doc", false)])];

        let partition = arrange(&apps, &no_exclusions(), AppOrder::MostRecent);

        let item = &partition.active[0];
        assert_eq!(item.window_title, None);
        assert_eq!(item.title(), "Alpha");
        assert_eq!(item.window_index, Some(0));
        assert!(item.has_windows);
    }

    #[test]
    fn test_multi_window_titles_fall_back_to_app_name() {
        let apps = vec![make_app(
            "a",
            "Alpha",
            false,
            vec![make_window(0, "Doc", false), make_window(1, "", false)],
        )];

        let partition = arrange(&apps, &no_exclusions(), AppOrder::MostRecent);

        assert_eq!(partition.active[0].window_title.as_deref(), Some("Doc"));
        assert_eq!(partition.active[1].window_title.as_deref(), Some("Alpha"));
        assert_eq!(partition.active[1].subtitle(), Some("Alpha"));
    }

    #[test]
    fn test_frontmost_flag_cleared_for_minimized_windows() {
        let apps = vec![make_app(
            "a",
            "Alpha",
            true,
            vec![make_window(0, "open", false), make_window(1, "hidden", true)],
        )];

        let partition = arrange(&apps, &no_exclusions(), AppOrder::MostRecent);

        assert!(partition.active[0].frontmost);
        assert!(!partition.minimized[0].frontmost);
    }

    #[test]
    fn test_windowless_items() {
        let apps = vec![make_app("a", "Alpha", true, vec![])];

        let partition = arrange(&apps, &no_exclusions(), AppOrder::MostRecent);

        let item = &partition.windowless[0];
        assert_eq!(item.id, "a-no-window");
        assert!(!item.has_windows);
        assert!(!item.minimized);
        assert!(item.frontmost);
        assert_eq!(item.window_index, None);
    }

    #[test]
    fn test_filter_keeps_sections() {
        let apps = vec![
            make_app(
                "com.editor",
                "Editor",
                false,
                vec![make_window(0, "report.md", false), make_window(1, "todo.md", true)],
            ),
            make_app("com.mail", "Mail", false, vec![]),
        ];
        let partition = arrange(&apps, &no_exclusions(), AppOrder::MostRecent);

        let filtered = partition.filter("todo");
        assert!(filtered.active.is_empty());
        assert_eq!(filtered.minimized.len(), 1);
        assert!(filtered.windowless.is_empty());

        let by_bundle = partition.filter("com.mail");
        assert_eq!(by_bundle.windowless.len(), 1);

        assert_eq!(partition.filter(""), partition);
    }

    #[test]
    fn test_find_by_id() {
        let apps = vec![make_app("a", "Alpha", false, vec![make_window(0, "", true)])];
        let partition = arrange(&apps, &no_exclusions(), AppOrder::MostRecent);

        assert!(partition.find("a-w0").unwrap().minimized);
        assert!(partition.find("a-no-window").is_none());
    }
}
