//! Automation bridge abstraction for testability.
//!
//! Every query and command this crate sends to the operating system is a
//! script handed to `osascript`. The [`ScriptRunner`] trait is the seam that
//! lets tests substitute canned responses for the real bridge.

use anyhow::{Context, Result};
use std::fmt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Scripting language understood by `osascript`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptLanguage {
    AppleScript,
    JavaScript,
}

impl fmt::Display for ScriptLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScriptLanguage::AppleScript => "AppleScript",
            ScriptLanguage::JavaScript => "JavaScript",
        };
        write!(f, "{}", s)
    }
}

/// A script plus a short label used in logs and by test doubles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub label: &'static str,
    pub language: ScriptLanguage,
    pub source: String,
}

impl Script {
    pub fn javascript(label: &'static str, source: impl Into<String>) -> Self {
        Script {
            label,
            language: ScriptLanguage::JavaScript,
            source: source.into(),
        }
    }

    pub fn applescript(label: &'static str, source: impl Into<String>) -> Self {
        Script {
            label,
            language: ScriptLanguage::AppleScript,
            source: source.into(),
        }
    }
}

/// Trait for running scripts against the automation bridge.
///
/// Implementations return the script's trimmed stdout, or an error carrying
/// the bridge's error text.
#[allow(async_fn_in_trait)]
pub trait ScriptRunner {
    async fn run(&self, script: &Script) -> Result<String>;
}

/// Real implementation that shells out to `osascript`.
#[derive(Debug, Clone, Default)]
pub struct OsaScript;

impl ScriptRunner for OsaScript {
    async fn run(&self, script: &Script) -> Result<String> {
        debug!("Running {} script '{}'", script.language, script.label);

        let output = Command::new("osascript")
            .arg("-l")
            .arg(script.language.to_string())
            .arg("-e")
            .arg(&script.source)
            .output()
            .await
            .with_context(|| format!("Failed to execute osascript for '{}'", script.label))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("Script '{}' failed: {}", script.label, stderr.trim());
            anyhow::bail!("{}", stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Escape text interpolated into an AppleScript string literal.
///
/// Backslashes are doubled first so the escapes added for quotes survive.
pub fn escape_applescript(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
pub mod testing {
    //! Scripted runner shared by the tests of the modules built on the bridge.

    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::time::Duration;

    #[derive(Clone)]
    pub enum Reply {
        Output(String),
        Failure(String),
    }

    /// Answers scripts by label and records every script it ran.
    #[derive(Default)]
    pub struct ScriptedRunner {
        replies: HashMap<&'static str, Reply>,
        delays: HashMap<&'static str, Duration>,
        ran: RefCell<Vec<Script>>,
    }

    impl ScriptedRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(mut self, label: &'static str, output: impl Into<String>) -> Self {
            self.replies.insert(label, Reply::Output(output.into()));
            self
        }

        pub fn fail(mut self, label: &'static str, message: impl Into<String>) -> Self {
            self.replies.insert(label, Reply::Failure(message.into()));
            self
        }

        pub fn delay(mut self, label: &'static str, delay: Duration) -> Self {
            self.delays.insert(label, delay);
            self
        }

        pub fn ran(&self) -> Vec<Script> {
            self.ran.borrow().clone()
        }
    }

    impl ScriptRunner for ScriptedRunner {
        async fn run(&self, script: &Script) -> Result<String> {
            self.ran.borrow_mut().push(script.clone());
            if let Some(delay) = self.delays.get(script.label) {
                tokio::time::sleep(*delay).await;
            }
            match self.replies.get(script.label) {
                Some(Reply::Output(output)) => Ok(output.clone()),
                Some(Reply::Failure(message)) => anyhow::bail!("{}", message),
                None => Ok(String::new()),
            }
        }
    }
}
