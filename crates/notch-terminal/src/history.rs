//! Command history with Up/Down navigation.
//!
//! Entries are kept oldest first and capped; the oldest is evicted when the
//! cap is reached. The cursor indexes into the entries, with `len()` meaning
//! "past the newest" (an empty input field). Persistence goes through a
//! [`HistoryStore`] handed in by the owner.

use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TerminalError;

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// One executed command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

// =============================================================================
// STORES
// =============================================================================

/// Where history survives between sessions.
pub trait HistoryStore: Send {
    fn load(&self) -> Result<Vec<HistoryEntry>, TerminalError>;
    fn save(&self, entries: &[HistoryEntry]) -> Result<(), TerminalError>;
}

/// In-process store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistoryStore {
    entries: Arc<Mutex<Vec<HistoryEntry>>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self) -> Result<Vec<HistoryEntry>, TerminalError> {
        Ok(self.snapshot())
    }

    fn save(&self, entries: &[HistoryEntry]) -> Result<(), TerminalError> {
        *self.entries.lock().unwrap_or_else(PoisonError::into_inner) = entries.to_vec();
        Ok(())
    }
}

/// JSON file store. A missing file loads as empty history.
#[derive(Debug, Clone)]
pub struct FileHistoryStore {
    path: PathBuf,
}

impl FileHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore for FileHistoryStore {
    fn load(&self) -> Result<Vec<HistoryEntry>, TerminalError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content).map_err(|e| {
            TerminalError::History(format!("{}: {e}", self.path.display()))
        })
    }

    fn save(&self, entries: &[HistoryEntry]) -> Result<(), TerminalError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| TerminalError::History(e.to_string()))?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

// =============================================================================
// BUFFER
// =============================================================================

/// Bounded command history with a navigation cursor.
pub struct CommandHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
    cursor: usize,
    store: Option<Box<dyn HistoryStore>>,
}

impl fmt::Debug for CommandHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandHistory")
            .field("len", &self.entries.len())
            .field("capacity", &self.capacity)
            .field("cursor", &self.cursor)
            .field("persistent", &self.store.is_some())
            .finish()
    }
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl CommandHistory {
    /// Unpersisted history holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            cursor: 0,
            store: None,
        }
    }

    /// History backed by `store`, seeded from what it holds. A store that
    /// fails to load starts empty.
    pub fn with_store(capacity: usize, store: Box<dyn HistoryStore>) -> Self {
        let mut history = Self::new(capacity);
        match store.load() {
            Ok(entries) => {
                let skip = entries.len().saturating_sub(history.capacity);
                history.entries.extend(entries.into_iter().skip(skip));
            }
            Err(e) => tracing::warn!(error = %e, "failed to load command history"),
        }
        history.cursor = history.entries.len();
        history.store = Some(store);
        history
    }

    /// Add `text` unless it is empty or repeats the newest entry.
    /// Returns whether an entry was added.
    pub fn append(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        if self.entries.back().is_some_and(|last| last.text == text) {
            return false;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry::new(text));
        self.persist();
        true
    }

    /// Record an executed command and reset navigation.
    pub fn record_executed(&mut self, text: &str) {
        self.append(text);
        self.reset_cursor();
    }

    /// Step toward older entries. Stays on the oldest once reached.
    pub fn older(&mut self) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        self.cursor = self.cursor.saturating_sub(1);
        self.entries.get(self.cursor).map(|e| e.text.as_str())
    }

    /// Step toward newer entries. `None` once past the newest.
    pub fn newer(&mut self) -> Option<&str> {
        if self.cursor < self.entries.len() {
            self.cursor += 1;
        }
        self.entries.get(self.cursor).map(|e| e.text.as_str())
    }

    pub fn reset_cursor(&mut self) {
        self.cursor = self.entries.len();
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    fn persist(&self) {
        if let Some(store) = &self.store {
            let entries: Vec<HistoryEntry> = self.entries.iter().cloned().collect();
            if let Err(e) = store.save(&entries) {
                tracing::warn!(error = %e, "failed to save command history");
            }
        }
    }
}
