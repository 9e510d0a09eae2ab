//! User-facing notices.
//!
//! The adapter reports failures through a [`Notifier`] instead of raising
//! them. A UI plugs in its toast system; the default just logs.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::wasm_compat::{WasmCompatSend, WasmCompatSync};

/// How prominently a notice should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational.
    #[default]
    Info,
    /// Something failed and the user should know.
    Destructive,
}

/// A short message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Headline.
    pub title: String,
    /// Detail line.
    pub description: String,
    /// Presentation hint.
    pub severity: Severity,
}

impl Notice {
    /// Create an informational notice.
    #[must_use]
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Info,
        }
    }

    /// Create a destructive notice.
    #[must_use]
    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Destructive,
        }
    }

    /// No provider was found on the page.
    #[must_use]
    pub fn provider_missing() -> Self {
        Self::destructive("MetaMask not found", "Please install MetaMask extension")
    }

    /// Connecting failed.
    #[must_use]
    pub fn connection_failed() -> Self {
        Self::destructive("Connection Error", "Failed to connect to MetaMask")
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}

/// Sink for user-facing notices.
pub trait Notifier: fmt::Debug + WasmCompatSend + WasmCompatSync {
    /// Show `notice` to the user.
    fn notify(&self, notice: Notice);
}

/// Logs notices through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.severity {
            Severity::Info => info!(title = %notice.title, "{}", notice.description),
            Severity::Destructive => warn!(title = %notice.title, "{}", notice.description),
        }
    }
}

/// Discards every notice.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _notice: Notice) {}
}
