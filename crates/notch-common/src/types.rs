use serde::{Deserialize, Serialize};
use std::fmt;

/// How a terminal panel talks to its child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// The session owns the child's PTY and streams bytes itself.
    #[default]
    DirectPipe,
    /// A terminal-over-HTTP server is spawned and the panel embeds a
    /// browser view pointed at its local port.
    HttpBridge,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::DirectPipe => write!(f, "direct-pipe"),
            BackendKind::HttpBridge => write!(f, "http-bridge"),
        }
    }
}

/// Whether a drag-and-drop into the terminal also presses Enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DropSubmitPolicy {
    /// Insert the dropped text at the prompt and wait for the user.
    #[default]
    InsertOnly,
    /// Insert the dropped text and send a newline right after it.
    InsertAndSubmit,
}
