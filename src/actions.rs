//! User-triggered commands against running apps.
//!
//! Each command is sent at most once. Automation commands are not idempotent
//! (re-sending "close window 2" after the list shifted closes a different
//! window), so failures are reported and never retried here.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};

use crate::model::DisplayItem;
use crate::script_runner::{Script, ScriptRunner, escape_applescript};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Bring the app (and the item's window, restoring it if minimized) forward
    Switch,
    /// Close the item's window
    Close,
    /// Minimize the item's window
    Minimize,
    /// Hide the whole app
    Hide,
    /// Quit the whole app
    Quit,
}

/// What the presentation layer should do after a successful action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// A visible switch happened; close the switcher.
    Dismiss,
    /// Something changed; show `message` and re-run the query pipeline.
    Refresh { message: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("cannot {action} {item}: {reason}")]
    NotApplicable {
        action: Action,
        item: String,
        reason: &'static str,
    },
    #[error("failed to {action} {app}: {message}")]
    Failed {
        action: Action,
        app: String,
        message: String,
    },
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Switch,
        Action::Close,
        Action::Minimize,
        Action::Hide,
        Action::Quit,
    ];

    /// Actions offered for `item`, in menu order.
    pub fn available_for(item: &DisplayItem) -> Vec<Action> {
        Action::ALL
            .into_iter()
            .filter(|action| action.check(item).is_ok())
            .collect()
    }

    /// Menu title for this action on `item`.
    pub fn title(&self, item: &DisplayItem) -> &'static str {
        match self {
            Action::Switch if item.minimized => "Restore Window",
            Action::Switch => "Switch to App",
            Action::Close => "Close Window",
            Action::Minimize => "Minimize Window",
            Action::Hide => "Hide App",
            Action::Quit => "Quit App",
        }
    }

    fn success_message(&self) -> &'static str {
        match self {
            Action::Switch => "Switched",
            Action::Close => "Window closed",
            Action::Minimize => "Window minimized",
            Action::Hide => "App hidden",
            Action::Quit => "App quit",
        }
    }

    fn check(&self, item: &DisplayItem) -> Result<(), &'static str> {
        match self {
            Action::Close | Action::Minimize if window_number(item).is_none() => {
                Err("the app has no windows")
            }
            Action::Minimize if item.minimized => Err("the window is already minimized"),
            _ => Ok(()),
        }
    }

    /// Build the command for `item`. Window indices are 0-based here and
    /// 1-based in AppleScript.
    pub fn script(&self, item: &DisplayItem) -> Result<Script, ActionError> {
        self.check(item).map_err(|reason| ActionError::NotApplicable {
            action: *self,
            item: item.id.clone(),
            reason,
        })?;

        let name = escape_applescript(&item.app_name);
        let script = match (self, window_number(item)) {
            (Action::Switch, Some(window)) => Script::applescript(
                "switch-window",
                format!(
                    r#"tell application "System Events"
  tell process "{name}"
    set frontmost to true
    try
      set value of attribute "AXMinimized" of window {window} to false
    end try
    try
      perform action "AXRaise" of window {window}
    end try
  end tell
end tell
tell application "{name}" to activate"#
                ),
            ),
            (Action::Switch, None) => Script::applescript(
                "switch-app",
                format!(
                    r#"tell application "{name}"
  activate
  reopen
end tell
delay 0.1
tell application "System Events"
  tell process "{name}"
    if (count of windows) is 0 then
      keystroke "n" using command down
    end if
  end tell
end tell"#
                ),
            ),
            (Action::Close, Some(window)) => Script::applescript(
                "close-window",
                format!(
                    r#"tell application "System Events"
  tell process "{name}"
    try
      perform action "AXPress" of button 1 of window {window}
    on error
      set frontmost to true
      perform action "AXRaise" of window {window}
      delay 0.1
      keystroke "w" using command down
    end try
  end tell
end tell"#
                ),
            ),
            (Action::Minimize, Some(window)) => Script::applescript(
                "minimize-window",
                format!(
                    r#"tell application "System Events"
  tell process "{name}"
    set value of attribute "AXMinimized" of window {window} to true
  end tell
end tell"#
                ),
            ),
            (Action::Hide, _) => Script::applescript(
                "hide-app",
                format!(
                    r#"tell application "System Events"
  set visible of process "{name}" to false
end tell"#
                ),
            ),
            (Action::Quit, _) => Script::applescript(
                "quit-app",
                format!(r#"tell application "{name}" to quit"#),
            ),
            (Action::Close | Action::Minimize, None) => {
                return Err(ActionError::NotApplicable {
                    action: *self,
                    item: item.id.clone(),
                    reason: "the app has no windows",
                });
            }
        };
        Ok(script)
    }

    /// Run this action once against `item`.
    pub async fn perform<R: ScriptRunner>(
        &self,
        runner: &R,
        item: &DisplayItem,
    ) -> Result<ActionOutcome, ActionError> {
        let script = self.script(item)?;
        info!("Performing {} on {}", self, item.id);

        if let Err(e) = runner.run(&script).await {
            warn!("{} failed for {}: {}", self, item.id, e);
            return Err(ActionError::Failed {
                action: *self,
                app: item.app_name.clone(),
                message: e.to_string(),
            });
        }

        Ok(match self {
            Action::Switch => ActionOutcome::Dismiss,
            _ => ActionOutcome::Refresh {
                message: self.success_message().to_string(),
            },
        })
    }
}

/// 1-based AppleScript window number for the item, if it targets a window.
fn window_number(item: &DisplayItem) -> Option<usize> {
    if !item.has_windows {
        return None;
    }
    item.window_index.map(|index| index + 1)
}

/// Error returned when parsing an invalid Action string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseActionError;

impl fmt::Display for ParseActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid action")
    }
}

impl std::error::Error for ParseActionError {}

impl FromStr for Action {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "switch" => Ok(Action::Switch),
            "close" => Ok(Action::Close),
            "minimize" => Ok(Action::Minimize),
            "hide" => Ok(Action::Hide),
            "quit" => Ok(Action::Quit),
            _ => Err(ParseActionError),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Switch => "switch",
            Action::Close => "close",
            Action::Minimize => "minimize",
            Action::Hide => "hide",
            Action::Quit => "quit",
        };
        write!(f, "{}", s)
    }
}
