use crate::arrange::Partition;
use crate::reconcile::SnapshotSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyStyle {
    Success,
    Failure,
}

/// Commands sent from the switcher to the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
    /// Replace the displayed sections
    Render {
        source: SnapshotSource,
        /// Whether minimized statuses have been merged in yet
        enriched: bool,
        partition: Partition,
    },
    /// A switch completed; close the switcher
    Dismiss,
    /// Show a transient notification
    Notify {
        style: NotifyStyle,
        title: String,
        message: Option<String>,
    },
}
