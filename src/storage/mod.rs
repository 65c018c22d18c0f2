//! Conversation storage
//!
//! One JSON file per contact under the chat directory, named
//! `chat_<digits>.json` where `<digits>` is the phone number with `+`, `-`
//! and spaces stripped. Each file holds the full ordered message log for
//! that contact; appends rewrite the whole file.
//!
//! Storage never fails its callers: reads degrade to an empty history and
//! failed appends are dropped, with the underlying error logged. There is no
//! per-contact locking, so two simultaneous appends for the same number can
//! lose one entry; at the expected per-contact volume (tens of messages)
//! this is an accepted limitation.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message direction relative to this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// One entry in a contact's conversation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub message: String,
    pub message_id: Option<String>,
}

/// File-backed conversation store.
pub struct ChatStore {
    dir: PathBuf,
}

impl ChatStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Append a message to a contact's log with a server-assigned timestamp.
    ///
    /// I/O errors are logged and the append is dropped.
    pub async fn append(
        &self,
        phone: &str,
        message: &str,
        direction: Direction,
        message_id: Option<&str>,
    ) {
        let entry = StoredMessage {
            timestamp: Utc::now(),
            direction,
            message: message.to_string(),
            message_id: message_id.map(str::to_string),
        };

        if let Err(e) = self.try_append(phone, entry).await {
            tracing::error!(phone, error = %e, "failed to save message");
        } else {
            tracing::info!(phone, ?direction, "saved message");
        }
    }

    async fn try_append(&self, phone: &str, entry: StoredMessage) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut history = self.try_load(phone).await.unwrap_or_default();
        history.push(entry);

        let body = serde_json::to_vec_pretty(&history)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        tokio::fs::write(self.chat_file(phone), body).await
    }

    /// Load the full log for a phone number, oldest first.
    ///
    /// Missing or unreadable files read as an empty history.
    pub async fn load(&self, phone: &str) -> Vec<StoredMessage> {
        match self.try_load(phone).await {
            Ok(history) => history,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                tracing::error!(phone, error = %e, "failed to load chat history");
                Vec::new()
            }
        }
    }

    async fn try_load(&self, phone: &str) -> std::io::Result<Vec<StoredMessage>> {
        let bytes = tokio::fs::read(self.chat_file(phone)).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// All phone numbers with at least one stored message, recovered from
    /// the log filenames.
    pub async fn known_numbers(&self) -> Vec<String> {
        let mut numbers = Vec::new();

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return numbers,
            Err(e) => {
                tracing::error!(error = %e, "failed to list chat directory");
                return numbers;
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(digits) = name
                .strip_prefix("chat_")
                .and_then(|rest| rest.strip_suffix(".json"))
            {
                numbers.push(restore_phone(digits));
            }
        }

        numbers
    }

    fn chat_file(&self, phone: &str) -> PathBuf {
        self.dir.join(format!("chat_{}.json", sanitize_phone(phone)))
    }
}

/// Strip the characters that make a phone number filesystem-unsafe.
pub fn sanitize_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| !matches!(c, '+' | '-' | ' '))
        .collect()
}

/// Best-effort inverse of [`sanitize_phone`] for storage keys.
fn restore_phone(digits: &str) -> String {
    if digits.len() == 11 && digits.starts_with('1') {
        format!("+{digits}")
    } else if digits.len() == 10 {
        format!("+1{digits}")
    } else {
        format!("+{digits}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn append_then_load_preserves_order_and_content() {
        let dir = TempDir::new().unwrap();
        let store = ChatStore::new(dir.path());
        let phone = "+15551234567";

        store
            .append(phone, "Tell me about the condo", Direction::Incoming, None)
            .await;
        store
            .append(phone, "Happy to help!", Direction::Outgoing, Some("m1"))
            .await;
        store
            .append(phone, "What's the price?", Direction::Incoming, Some("m2"))
            .await;

        let history = store.load(phone).await;
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].message, "Tell me about the condo");
        assert_eq!(history[0].direction, Direction::Incoming);
        assert_eq!(history[0].message_id, None);
        assert_eq!(history[1].message, "Happy to help!");
        assert_eq!(history[1].direction, Direction::Outgoing);
        assert_eq!(history[1].message_id.as_deref(), Some("m1"));
        assert_eq!(history[2].message, "What's the price?");
        assert!(history[0].timestamp <= history[2].timestamp);
    }

    #[tokio::test]
    async fn load_unknown_number_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = ChatStore::new(dir.path());

        assert!(store.load("+15550000000").await.is_empty());
    }

    #[tokio::test]
    async fn formatted_and_bare_numbers_share_one_log() {
        let dir = TempDir::new().unwrap();
        let store = ChatStore::new(dir.path());

        store
            .append("+1-555-123-4567", "hi", Direction::Incoming, None)
            .await;
        let history = store.load("+15551234567").await;
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn known_numbers_restores_phone_form() {
        let dir = TempDir::new().unwrap();
        let store = ChatStore::new(dir.path());

        store.append("+15551234567", "a", Direction::Incoming, None).await;
        store.append("5559876543", "b", Direction::Incoming, None).await;
        store.append("+447911123456", "c", Direction::Incoming, None).await;

        let mut numbers = store.known_numbers().await;
        numbers.sort();
        assert_eq!(
            numbers,
            vec!["+15551234567", "+15559876543", "+447911123456"]
        );
    }

    #[tokio::test]
    async fn known_numbers_on_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = ChatStore::new(dir.path().join("never-created"));

        assert!(store.known_numbers().await.is_empty());
    }

    #[test]
    fn sanitize_strips_formatting() {
        assert_eq!(sanitize_phone("+1-587 429-1448"), "15874291448");
        assert_eq!(sanitize_phone("5551234567"), "5551234567");
    }
}
