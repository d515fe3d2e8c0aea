use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single window as reported by the fast query.
///
/// `index` is the 0-based position inside the owning process's window list
/// for the query that produced it. It is only a join key for that query,
/// never an identity across queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Window {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub minimized: bool,
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_number: Option<i64>,
}

/// A running, addressable application. `bundle_id` is the only identity that
/// survives between queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    pub name: String,
    pub bundle_id: String,
    #[serde(default)]
    pub frontmost: bool,
    #[serde(default)]
    pub app_path: String,
    #[serde(default)]
    pub windows: Vec<Window>,
}

/// Minimized flag for one window, as returned by the slow query.
///
/// Older scripts emitted a bare boolean per window; newer ones also carry the
/// OS window number so the merge can join on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WindowStatus {
    Flag(bool),
    #[serde(rename_all = "camelCase")]
    Detailed {
        minimized: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        window_number: Option<i64>,
    },
}

impl WindowStatus {
    pub fn minimized(&self) -> bool {
        match *self {
            WindowStatus::Flag(minimized) => minimized,
            WindowStatus::Detailed { minimized, .. } => minimized,
        }
    }

    pub fn window_number(&self) -> Option<i64> {
        match *self {
            WindowStatus::Flag(_) => None,
            WindowStatus::Detailed { window_number, .. } => window_number,
        }
    }
}

impl From<bool> for WindowStatus {
    fn from(minimized: bool) -> Self {
        WindowStatus::Flag(minimized)
    }
}

/// bundleId -> per-window statuses in window enumeration order.
pub type MinimizedMap = HashMap<String, Vec<WindowStatus>>;

/// One selectable row for the presentation layer: either one window of an
/// app, or a windowless app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayItem {
    pub id: String,
    pub app_name: String,
    pub bundle_id: String,
    pub app_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_number: Option<i64>,
    pub minimized: bool,
    pub has_windows: bool,
    pub frontmost: bool,
}

impl DisplayItem {
    pub fn window_id(bundle_id: &str, index: usize) -> String {
        format!("{}-w{}", bundle_id, index)
    }

    pub fn windowless_id(bundle_id: &str) -> String {
        format!("{}-no-window", bundle_id)
    }

    /// Primary label: the window title when one is attached, else the app name.
    pub fn title(&self) -> &str {
        self.window_title.as_deref().unwrap_or(&self.app_name)
    }

    /// Secondary label, only present when the title is a window title.
    pub fn subtitle(&self) -> Option<&str> {
        self.window_title.as_ref().map(|_| self.app_name.as_str())
    }

    /// Terms a search query is matched against.
    pub fn keywords(&self) -> Vec<&str> {
        let mut keywords = vec![self.app_name.as_str()];
        if let Some(title) = self.window_title.as_deref() {
            keywords.push(title);
        }
        keywords.push(self.bundle_id.as_str());
        keywords
    }

    /// Case-insensitive substring match against any keyword. An empty query
    /// matches everything.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.keywords()
            .iter()
            .any(|keyword| keyword.to_lowercase().contains(&query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_item(window_title: Option<&str>) -> DisplayItem {
        DisplayItem {
            id: "com.example.editor-w0".to_string(),
            app_name: "Editor".to_string(),
            bundle_id: "com.example.editor".to_string(),
            app_path: "/Applications/Editor.app".to_string(),
            window_title: window_title.map(str::to_string),
            window_index: Some(0),
            window_number: None,
            minimized: false,
            has_windows: true,
            frontmost: false,
        }
    }

    #[test]
    fn test_app_deserializes_with_missing_optional_fields() {
        let json = r#"{"name":"Finder","bundleId":"com.apple.finder","windows":[{"index":0}]}"#;
        let app: App = serde_json::from_str(json).unwrap();

        assert_eq!(app.name, "Finder");
        assert!(!app.frontmost);
        assert!(app.app_path.is_empty());
        assert_eq!(app.windows.len(), 1);
        assert!(app.windows[0].title.is_empty());
        assert!(!app.windows[0].minimized);
        assert!(app.windows[0].window_number.is_none());
    }

    #[test]
    fn test_window_status_accepts_both_shapes() {
        let json = r#"[true, {"minimized": false, "windowNumber": 42}, {"minimized": true}]"#;
        let statuses: Vec<WindowStatus> = serde_json::from_str(json).unwrap();

        assert_eq!(statuses[0], WindowStatus::Flag(true));
        assert!(!statuses[1].minimized());
        assert_eq!(statuses[1].window_number(), Some(42));
        assert!(statuses[2].minimized());
        assert_eq!(statuses[2].window_number(), None);
    }

    #[test]
    fn test_display_item_ids() {
        assert_eq!(DisplayItem::window_id("com.a", 3), "com.a-w3");
        assert_eq!(DisplayItem::windowless_id("com.a"), "com.a-no-window");
    }

    #[test]
    fn test_title_and_subtitle() {
        let single = make_item(None);
        assert_eq!(single.title(), "Editor");
        assert_eq!(single.subtitle(), None);

        let multi = make_item(Some("notes.txt"));
        assert_eq!(multi.title(), "notes.txt");
        assert_eq!(multi.subtitle(), Some("Editor"));
    }

    #[test]
    fn test_matches_any_keyword_case_insensitively() {
        let item = make_item(Some("Quarterly Report"));

        assert!(item.matches("edit"));
        assert!(item.matches("QUARTERLY"));
        assert!(item.matches("com.example"));
        assert!(item.matches("   "));
        assert!(!item.matches("browser"));
    }
}
