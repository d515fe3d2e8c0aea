use anyhow::Result;
use std::fmt::Write as _;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::arrange::Partition;
use crate::reconcile::SnapshotSource;
use crate::ui_commands::{NotifyStyle, UiCommand};

const MAX_TITLE_LENGTH: usize = 48;

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub json: bool,
    /// Print every view as it arrives instead of only the final one
    pub progressive: bool,
    pub filter: Option<String>,
}

/// Terminal stand-in for the switcher window: turns UI commands into text.
pub struct TerminalView {
    options: RenderOptions,
    last: Option<Partition>,
    dismissed: bool,
    notified: bool,
}

impl TerminalView {
    pub fn new(options: RenderOptions) -> Self {
        TerminalView {
            options,
            last: None,
            dismissed: false,
            notified: false,
        }
    }

    /// Apply one command. Returns text for stdout when something should be
    /// printed right away.
    pub fn handle(&mut self, command: UiCommand) -> Result<Option<String>> {
        match command {
            UiCommand::Render {
                source,
                enriched,
                partition,
            } => {
                let partition = match self.options.filter.as_deref() {
                    Some(query) => partition.filter(query),
                    None => partition,
                };
                debug!(
                    "Render from {:?} (enriched: {}) with {} items",
                    source,
                    enriched,
                    partition.len()
                );
                let output = if self.options.progressive {
                    Some(self.format(&partition, Some(stage_label(source, enriched)))?)
                } else {
                    None
                };
                self.last = Some(partition);
                Ok(output)
            }
            UiCommand::Dismiss => {
                info!("Switcher dismissed");
                self.dismissed = true;
                Ok(None)
            }
            UiCommand::Notify {
                style,
                title,
                message,
            } => {
                let marker = match style {
                    NotifyStyle::Success => "✓",
                    NotifyStyle::Failure => "✗",
                };
                match message {
                    Some(message) => eprintln!("{} {}: {}", marker, title, message),
                    None => eprintln!("{} {}", marker, title),
                }
                self.notified = true;
                Ok(None)
            }
        }
    }

    /// Final output once the command stream ends.
    pub fn finish(&self) -> Result<Option<String>> {
        if self.options.progressive || self.dismissed {
            return Ok(None);
        }
        match &self.last {
            Some(partition) => Ok(Some(self.format(partition, None)?)),
            // The notification already said everything there is to say.
            None if self.notified => Ok(None),
            None => Ok(Some(if self.options.json {
                serde_json::to_string_pretty(&Partition::default())?
            } else {
                "No running apps found".to_string()
            })),
        }
    }

    fn format(&self, partition: &Partition, stage: Option<&str>) -> Result<String> {
        if self.options.json {
            return Ok(serde_json::to_string_pretty(partition)?);
        }
        Ok(format_partition(partition, stage))
    }
}

fn stage_label(source: SnapshotSource, enriched: bool) -> &'static str {
    match (source, enriched) {
        (SnapshotSource::Cache, false) => "cached",
        (SnapshotSource::Cache, true) => "cached, enriched",
        (SnapshotSource::Live, false) => "live",
        (SnapshotSource::Live, true) => "live, enriched",
    }
}

/// Plain-text sections, skipping empty ones.
pub fn format_partition(partition: &Partition, stage: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(stage) = stage {
        let _ = writeln!(out, "=== {} ===", stage);
    }
    for (title, items) in partition.sections() {
        if items.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{}", title);
        for item in items {
            let marker = if item.frontmost { "*" } else { " " };
            let label = match item.subtitle() {
                Some(subtitle) => format!(
                    "{} - {}",
                    truncate_string(item.title(), MAX_TITLE_LENGTH),
                    subtitle
                ),
                None => truncate_string(item.title(), MAX_TITLE_LENGTH),
            };
            let _ = writeln!(out, " {} {}  [{}]", marker, label, item.id);
        }
    }
    if out.is_empty() || (stage.is_some() && partition.is_empty()) {
        out.push_str("No running apps found\n");
    }
    out
}

fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Drain UI commands, printing as they arrive, until the sender side closes.
pub async fn run(
    mut ui_rx: mpsc::UnboundedReceiver<UiCommand>,
    options: RenderOptions,
) -> Result<TerminalView> {
    let mut view = TerminalView::new(options);

    while let Some(command) = ui_rx.recv().await {
        if let Some(output) = view.handle(command)? {
            println!("{}", output.trim_end());
        }
    }

    if let Some(output) = view.finish()? {
        println!("{}", output.trim_end());
    }

    debug!("UI command handler stopped - channel closed");
    Ok(view)
}
