//! Errors raised by terminal sessions.

use std::fmt;

use notch_common::{BackendKind, NotchError};

use crate::state::SessionState;

/// Why a child process could not be launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnFailureKind {
    NotFound,
    PermissionDenied,
    /// The pseudo-terminal itself could not be allocated.
    Pty,
    Other,
}

impl fmt::Display for SpawnFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SpawnFailureKind::NotFound => "not found",
            SpawnFailureKind::PermissionDenied => "permission denied",
            SpawnFailureKind::Pty => "pty unavailable",
            SpawnFailureKind::Other => "spawn error",
        };
        f.write_str(s)
    }
}

/// A launch that failed before the child ever ran. Never retried.
#[derive(Debug, Clone, thiserror::Error)]
#[error("failed to launch `{program}` ({kind}): {detail}")]
pub struct SpawnFailure {
    pub program: String,
    pub kind: SpawnFailureKind,
    pub detail: String,
}

impl SpawnFailure {
    pub fn new(program: impl Into<String>, kind: SpawnFailureKind, detail: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            kind,
            detail: detail.into(),
        }
    }
}

/// Errors originating from terminal session operations.
#[derive(Debug, thiserror::Error)]
pub enum TerminalError {
    #[error(transparent)]
    Spawn(#[from] SpawnFailure),

    #[error("terminal bridge at {url} unreachable after {attempts} attempts: {last_error}")]
    BridgeUnreachable {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("cannot {action} a session that is {state}")]
    InvalidState {
        state: SessionState,
        action: &'static str,
    },

    #[error("input channel is closed")]
    InputClosed,

    #[error("{0} sessions do not accept direct input")]
    InputUnsupported(BackendKind),

    #[error("failed to resize PTY: {0}")]
    ResizeFailed(String),

    #[error("http client error: {0}")]
    Http(String),

    #[error("history store error: {0}")]
    History(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<TerminalError> for NotchError {
    fn from(err: TerminalError) -> Self {
        match err {
            TerminalError::Io(e) => NotchError::Io(e),
            other => NotchError::Terminal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_failure_display() {
        let err = SpawnFailure::new("/no/such/shell", SpawnFailureKind::NotFound, "no such file");
        assert_eq!(
            err.to_string(),
            "failed to launch `/no/such/shell` (not found): no such file"
        );
    }

    #[test]
    fn terminal_error_from_spawn_failure() {
        let err: TerminalError =
            SpawnFailure::new("ttyd", SpawnFailureKind::PermissionDenied, "mode 0644").into();
        assert!(matches!(err, TerminalError::Spawn(ref f) if f.kind == SpawnFailureKind::PermissionDenied));
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn invalid_state_display() {
        let err = TerminalError::InvalidState {
            state: SessionState::Running,
            action: "open",
        };
        assert_eq!(err.to_string(), "cannot open a session that is running");
    }

    #[test]
    fn input_unsupported_names_backend() {
        let err = TerminalError::InputUnsupported(BackendKind::HttpBridge);
        assert_eq!(err.to_string(), "http-bridge sessions do not accept direct input");
    }

    #[test]
    fn converts_into_notch_error() {
        let err: NotchError = TerminalError::InputClosed.into();
        assert!(matches!(err, NotchError::Terminal(ref m) if m == "input channel is closed"));

        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        let err: NotchError = TerminalError::Io(io).into();
        assert!(matches!(err, NotchError::Io(_)));
    }
}
