use serde::{Deserialize, Serialize};

use crate::pagination::Page;

/// Response body shared by every endpoint: `{ success, data, message, next_page_url }`.
/// All fields are optional on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub next_page_url: Option<String>,
}

impl<T> Envelope<T> {
    pub fn empty() -> Self {
        Self { success: None, data: None, message: None, next_page_url: None }
    }

    pub fn ok(data: T) -> Self {
        Self { success: Some(true), data: Some(data), message: None, next_page_url: None }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_next(mut self, next: Option<String>) -> Self {
        self.next_page_url = next;
        self
    }
}

impl<T> Envelope<Vec<T>> {
    pub fn into_page(self) -> Page<T> {
        Page { items: self.data.unwrap_or_default(), next_page_url: self.next_page_url, message: self.message }
    }
}

/// Error payload; only `message` is relied upon.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}
