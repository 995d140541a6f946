//! Terminal panel settings.

use notch_common::{BackendKind, DropSubmitPolicy};
use serde::{Deserialize, Serialize};

/// Per-panel terminal behavior: which backend to launch, PTY geometry,
/// read chunking, drag-and-drop policy, and command history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub backend: BackendKind,
    /// Initial PTY columns (valid range: 10-500).
    pub cols: u16,
    /// Initial PTY rows (valid range: 5-500).
    pub rows: u16,
    /// Bytes requested per output read (valid range: 512-65536).
    pub read_chunk_bytes: u32,
    pub drop_submit: DropSubmitPolicy,
    /// Commands kept for Up/Down navigation (valid range: 1-10_000).
    pub history_capacity: u32,
    /// Keep command history across launches.
    pub persist_history: bool,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::DirectPipe,
            cols: 80,
            rows: 24,
            read_chunk_bytes: 8_192,
            drop_submit: DropSubmitPolicy::InsertOnly,
            history_capacity: 100,
            persist_history: true,
        }
    }
}
