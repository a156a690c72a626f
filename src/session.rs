use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use thiserror::Error;
use uuid::Uuid;

use crate::document::DocumentKind;

/// Canonical comparison key; `first` is the document that was ingested earlier.
pub fn pair_key(first: &str, second: &str) -> String {
    format!("{} vs {}", first, second)
}

#[derive(Clone)]
pub struct Document {
    pub name: String,
    pub kind: DocumentKind,
    pub bytes: Vec<u8>,
    pub text: String,
    pub ingested_at: DateTime<Utc>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("bytes", &self.bytes.len())
            .field("text_chars", &self.text.chars().count())
            .field("ingested_at", &self.ingested_at)
            .finish()
    }
}

/// Insertion-ordered map whose entries are computed at most once.
#[derive(Debug, Clone)]
pub struct MemoCache<V> {
    order: Vec<String>,
    entries: HashMap<String, V>,
}

impl<V> Default for MemoCache<V> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            entries: HashMap::new(),
        }
    }
}

impl<V> MemoCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.order
            .iter()
            .filter_map(move |key| self.entries.get(key).map(|value| (key.as_str(), value)))
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    /// Stores `value` unless `key` is already present. Returns whether it was stored.
    pub fn insert_if_absent(&mut self, key: impl Into<String>, value: V) -> bool {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return false;
        }
        self.order.push(key.clone());
        self.entries.insert(key, value);
        true
    }

    /// Returns the cached value for `key`, running `compute` only on a miss.
    /// The flag is `true` when `compute` ran.
    pub async fn get_or_insert_with<F, Fut>(&mut self, key: &str, compute: F) -> (&V, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let computed = if self.entries.contains_key(key) {
            false
        } else {
            let value = compute().await;
            self.insert_if_absent(key, value)
        };
        (&self.entries[key], computed)
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "user" | "you" => Some(Speaker::User),
            "assistant" | "model" | "gemini" => Some(Speaker::Assistant),
            _ => None,
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::User => write!(f, "User"),
            Speaker::Assistant => write!(f, "Assistant"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ChatEntryError {
    #[error("Invalid chat entry: {0}")]
    Malformed(String),
    #[error("Invalid chat entry: unknown speaker '{0}'")]
    UnknownSpeaker(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub speaker: Speaker,
    pub message: String,
}

impl ChatTurn {
    pub fn new(speaker: Speaker, message: impl Into<String>) -> Self {
        Self {
            speaker,
            message: message.into(),
        }
    }

    /// Reads a `[speaker, message]` pair as stored in a saved transcript.
    pub fn try_from_value(value: &Value) -> Result<Self, ChatEntryError> {
        let pair = match value.as_array() {
            Some(items) if items.len() == 2 => items,
            _ => return Err(ChatEntryError::Malformed(value.to_string())),
        };

        let (Some(speaker), Some(message)) = (pair[0].as_str(), pair[1].as_str()) else {
            return Err(ChatEntryError::Malformed(value.to_string()));
        };

        let speaker = Speaker::from_label(speaker)
            .ok_or_else(|| ChatEntryError::UnknownSpeaker(speaker.to_string()))?;
        Ok(Self::new(speaker, message))
    }

    pub fn to_value(&self) -> Value {
        let speaker = match self.speaker {
            Speaker::User => "user",
            Speaker::Assistant => "assistant",
        };
        json!([speaker, self.message])
    }
}

/// All state owned by one user's interaction sequence.
#[derive(Debug)]
pub struct Session {
    pub(crate) documents: MemoCache<Document>,
    pub(crate) summaries: MemoCache<String>,
    pub(crate) comparisons: MemoCache<String>,
    pub(crate) suggestions: Vec<String>,
    pub(crate) chat_history: Vec<ChatTurn>,
    pub(crate) pending_question: String,
    pub(crate) suggestion_clicked: bool,
    upload_token: Uuid,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            documents: MemoCache::new(),
            summaries: MemoCache::new(),
            comparisons: MemoCache::new(),
            suggestions: Vec::new(),
            chat_history: Vec::new(),
            pending_question: String::new(),
            suggestion_clicked: false,
            upload_token: Uuid::new_v4(),
        }
    }

    pub fn documents(&self) -> &MemoCache<Document> {
        &self.documents
    }

    pub fn document_names(&self) -> Vec<String> {
        self.documents.keys().map(String::from).collect()
    }

    pub fn summaries(&self) -> &MemoCache<String> {
        &self.summaries
    }

    pub fn comparisons(&self) -> &MemoCache<String> {
        &self.comparisons
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn chat_history(&self) -> &[ChatTurn] {
        &self.chat_history
    }

    pub fn pending_question(&self) -> &str {
        &self.pending_question
    }

    pub fn suggestion_clicked(&self) -> bool {
        self.suggestion_clicked
    }

    /// Token the presentation layer keys its upload widget on.
    pub fn upload_token(&self) -> Uuid {
        self.upload_token
    }

    /// Every document's text in ingestion order, separated by blank lines.
    pub fn corpus_text(&self) -> String {
        self.documents
            .values()
            .map(|doc| doc.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Records text typed by the user. Editing the question clears the
    /// "suggestion just clicked" flag.
    pub fn set_pending_question(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text != self.pending_question {
            self.pending_question = text;
            self.suggestion_clicked = false;
        }
    }

    /// Appends the well-formed entries of a saved transcript and returns the rest as errors.
    pub fn import_transcript(&mut self, entries: &[Value]) -> Vec<ChatEntryError> {
        let mut rejected = Vec::new();
        for entry in entries {
            match ChatTurn::try_from_value(entry) {
                Ok(turn) => self.chat_history.push(turn),
                Err(e) => rejected.push(e),
            }
        }
        rejected
    }

    pub fn transcript(&self) -> Vec<Value> {
        self.chat_history.iter().map(ChatTurn::to_value).collect()
    }

    /// Drops every session-owned collection and mints a new upload token.
    pub fn reset(&mut self) {
        let previous = self.upload_token;
        *self = Session::new();
        while self.upload_token == previous {
            self.upload_token = Uuid::new_v4();
        }
    }
}
