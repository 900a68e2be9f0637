//! Transient user notifications ("toasts").
//! Views push; the front end drains and shows them. The queue is bounded so an
//! idle front end cannot grow it without limit.

use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::AppError;

const MAX_PENDING: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: Level,
    pub text: String,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.level {
            Level::Success => "ok",
            Level::Warning => "warn",
            Level::Error => "error",
        };
        write!(f, "[{}] {}", tag, self.text)
    }
}

#[derive(Default)]
pub struct Notifier {
    pending: Mutex<VecDeque<Notice>>,
}

impl Notifier {
    pub fn new() -> Self { Self::default() }

    pub fn push(&self, level: Level, text: impl Into<String>) {
        let text = text.into();
        match level {
            Level::Error | Level::Warning => warn!(target: "notify", level = ?level, "{}", text),
            Level::Success => info!(target: "notify", "{}", text),
        }
        let mut q = self.pending.lock();
        if q.len() == MAX_PENDING {
            q.pop_front();
        }
        q.push_back(Notice { level, text });
    }

    pub fn success(&self, text: impl Into<String>) { self.push(Level::Success, text) }

    pub fn warning(&self, text: impl Into<String>) { self.push(Level::Warning, text) }

    pub fn error(&self, text: impl Into<String>) { self.push(Level::Error, text) }

    /// Success notice preferring the server's message.
    pub fn success_or(&self, server: Option<String>, fallback: &str) {
        self.success(server.filter(|m| !m.trim().is_empty()).unwrap_or_else(|| fallback.to_string()))
    }

    /// Report a failed action. Client-side validation shows as a warning.
    pub fn failure(&self, err: &AppError, fallback: &str) {
        let level = if matches!(err, AppError::UserInput { .. }) && err.server_message().is_none() {
            Level::Warning
        } else {
            Level::Error
        };
        self.push(level, err.notice_text(fallback));
    }

    pub fn drain(&self) -> Vec<Notice> { self.pending.lock().drain(..).collect() }

    pub fn latest(&self) -> Option<Notice> { self.pending.lock().back().cloned() }

    pub fn len(&self) -> usize { self.pending.lock().len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_prefers_server_message() {
        let n = Notifier::new();
        n.failure(&AppError::from_status(500, Some("Out of stock".into())), "Failed to checkout");
        n.failure(&AppError::io("network_error", "refused"), "Failed to checkout");
        n.failure(&AppError::user("quantity_invalid", "Quantity must be at least 1"), "Failed to update quantity");
        let got = n.drain();
        assert_eq!(got[0], Notice { level: Level::Error, text: "Out of stock".into() });
        assert_eq!(got[1], Notice { level: Level::Error, text: "Failed to checkout".into() });
        assert_eq!(got[2], Notice { level: Level::Warning, text: "Quantity must be at least 1".into() });
        assert!(n.is_empty());
    }

    #[test]
    fn queue_is_bounded() {
        let n = Notifier::new();
        for i in 0..(MAX_PENDING + 5) {
            n.success(format!("n{}", i));
        }
        assert_eq!(n.len(), MAX_PENDING);
        assert_eq!(n.drain()[0].text, "n5");
    }

    #[test]
    fn success_or_falls_back() {
        let n = Notifier::new();
        n.success_or(None, "Fetch data success");
        n.success_or(Some("Loaded 3 orders".into()), "Fetch data success");
        assert_eq!(n.drain().iter().map(|x| x.text.as_str()).collect::<Vec<_>>(), vec!["Fetch data success", "Loaded 3 orders"]);
    }
}
