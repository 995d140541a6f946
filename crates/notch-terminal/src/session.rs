//! Session lifecycle.
//!
//! A [`TerminalSession`] is created by a panel, opened once, and closed
//! when the panel goes away. The backend does the launching; the session
//! owns the state machine, the history, and the teardown. Background
//! threads (exit watcher, bridge probe) reach the session through a
//! [`SessionContext`].

use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use notch_common::{BackendKind, DropSubmitPolicy, SessionId, StatusLevel};
use notch_config::NotchConfig;

use crate::backend::{Attachment, SessionBackend};
use crate::error::TerminalError;
use crate::event::{EventSink, SessionEvent};
use crate::history::CommandHistory;
use crate::input::{Input, InputSender};
use crate::state::SessionState;
use crate::stream::DEFAULT_READ_CHUNK;
use crate::supervisor::{ProcessExit, ProcessHandle, DEFAULT_COLS, DEFAULT_ROWS};

// =============================================================================
// OPTIONS
// =============================================================================

/// Per-session launch settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub cols: u16,
    pub rows: u16,
    pub read_chunk: usize,
    pub drop_policy: DropSubmitPolicy,
    /// Extra variables for the child, applied over the host environment.
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            cols: DEFAULT_COLS,
            rows: DEFAULT_ROWS,
            read_chunk: DEFAULT_READ_CHUNK,
            drop_policy: DropSubmitPolicy::default(),
            env: Vec::new(),
            cwd: None,
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &NotchConfig) -> Self {
        let mut env: Vec<(String, String)> = config
            .shell
            .env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        env.sort();

        Self {
            cols: config.terminal.cols,
            rows: config.terminal.rows,
            read_chunk: config.terminal.read_chunk_bytes as usize,
            drop_policy: config.terminal.drop_submit,
            env,
            cwd: config.shell.working_directory.as_deref().map(expand_tilde),
        }
    }
}

fn expand_tilde(dir: &str) -> PathBuf {
    match (dir.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ if dir == "~" => dirs::home_dir().unwrap_or_else(|| PathBuf::from(dir)),
        _ => PathBuf::from(dir),
    }
}

// =============================================================================
// CONTEXT
// =============================================================================

struct SessionCore {
    id: SessionId,
    state: Mutex<SessionState>,
    events: EventSink,
    attachment: Mutex<Option<Attachment>>,
    port: Mutex<Option<u16>>,
}

/// Shared view of a session for backends and their background threads.
#[derive(Clone)]
pub struct SessionContext {
    core: Arc<SessionCore>,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("id", &self.core.id)
            .field("state", &self.state())
            .finish()
    }
}

impl SessionContext {
    fn new(id: SessionId, events: EventSink) -> Self {
        Self {
            core: Arc::new(SessionCore {
                id,
                state: Mutex::new(SessionState::Idle),
                events,
                attachment: Mutex::new(None),
                port: Mutex::new(None),
            }),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.core.id
    }

    pub fn events(&self) -> &EventSink {
        &self.core.events
    }

    pub fn emit(&self, event: SessionEvent) -> bool {
        self.core.events.emit(event)
    }

    pub fn state(&self) -> SessionState {
        *self.core.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move to `next` if the state machine allows it, announcing the change.
    pub fn transition(&self, next: SessionState) -> bool {
        let mut state = self.core.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.can_transition_to(next) {
            tracing::debug!(
                session_id = %self.core.id.short(),
                from = %*state,
                to = %next,
                "ignoring state transition"
            );
            return false;
        }
        tracing::info!(session_id = %self.core.id.short(), from = %*state, to = %next, "session state changed");
        *state = next;
        self.core.events.emit(SessionEvent::StateChanged(next));
        true
    }

    /// Hand the launched resources to the session. If the session already
    /// reached a final state they are released on the spot.
    pub fn attach(&self, attachment: Attachment) {
        let state = self.core.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.is_final() {
            drop(state);
            attachment.release();
            return;
        }
        *self.core.port.lock().unwrap_or_else(PoisonError::into_inner) = attachment.port();
        *self
            .core
            .attachment
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(attachment);
    }

    pub fn mark_running(&self) -> bool {
        self.transition(SessionState::Running)
    }

    /// Launch failure: `Error`, an error status, and teardown.
    pub fn mark_failed(&self, err: &TerminalError) {
        if self.transition(SessionState::Error) {
            self.core.events.status(StatusLevel::Error, err.to_string());
        }
        self.teardown();
    }

    /// The child exited on its own or after a stop.
    pub fn process_exited(&self, exit: ProcessExit) {
        if self.transition(SessionState::Terminated) {
            let text = match exit.code {
                Some(code) => format!("session ended (exit code {code})"),
                None => "session ended".to_string(),
            };
            let level = if exit.success {
                StatusLevel::Info
            } else {
                StatusLevel::Warning
            };
            self.core.events.status(level, text);
        }
        self.teardown();
    }

    /// Release attached resources. Only the first call does anything.
    fn teardown(&self) {
        let attachment = self
            .core
            .attachment
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(attachment) = attachment {
            let outcome = attachment.release();
            tracing::debug!(session_id = %self.core.id.short(), ?outcome, "session resources released");
        }
    }

    fn with_attachment<T>(&self, f: impl FnOnce(&Attachment) -> T) -> Option<T> {
        self.core
            .attachment
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(f)
    }

    fn port(&self) -> Option<u16> {
        *self.core.port.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// One terminal session, owned by the panel that created it.
pub struct TerminalSession {
    ctx: SessionContext,
    backend: Box<dyn SessionBackend>,
    options: SessionOptions,
    history: CommandHistory,
    created_at: DateTime<Utc>,
}

impl std::fmt::Debug for TerminalSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalSession")
            .field("id", self.ctx.id())
            .field("backend", &self.backend.kind())
            .field("state", &self.state())
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl TerminalSession {
    /// Create an idle session delivering events on `events_tx`.
    pub fn new(
        options: SessionOptions,
        backend: Box<dyn SessionBackend>,
        history: CommandHistory,
        events_tx: mpsc::Sender<SessionEvent>,
    ) -> Self {
        let id = SessionId::new();
        let events = EventSink::new(id.clone(), events_tx);
        Self {
            ctx: SessionContext::new(id, events),
            backend,
            options,
            history,
            created_at: Utc::now(),
        }
    }

    /// Like [`new`](Self::new), creating the event channel too.
    pub fn with_channel(
        options: SessionOptions,
        backend: Box<dyn SessionBackend>,
        history: CommandHistory,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self::new(options, backend, history, tx), rx)
    }

    pub fn id(&self) -> &SessionId {
        self.ctx.id()
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn state(&self) -> SessionState {
        self.ctx.state()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Bridge port, for HTTP bridge sessions that got as far as reserving one.
    pub fn port(&self) -> Option<u16> {
        self.ctx.port()
    }

    /// The child process while the session holds it.
    pub fn process(&self) -> Option<Arc<ProcessHandle>> {
        self.ctx.with_attachment(|a| Arc::clone(a.process()))
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Launch `command`. Spawn failures come back synchronously and leave
    /// the session in `Error`; readiness is reported through events.
    pub fn open(&mut self, command: &str, args: &[String]) -> Result<(), TerminalError> {
        let state = self.state();
        if state != SessionState::Idle || !self.ctx.transition(SessionState::Starting) {
            return Err(TerminalError::InvalidState {
                state,
                action: "open",
            });
        }

        tracing::info!(
            session_id = %self.id().short(),
            backend = %self.backend.kind(),
            command,
            "opening terminal session"
        );

        if let Err(e) = self.backend.launch(command, args, &self.options, &self.ctx) {
            tracing::warn!(session_id = %self.id().short(), error = %e, "session launch failed");
            self.ctx.mark_failed(&e);
            return Err(e);
        }
        Ok(())
    }

    /// Stop the child and release everything. Safe to call any number of
    /// times, before or after open, and after the child exited.
    pub fn close(&mut self) -> Result<(), TerminalError> {
        if self.ctx.transition(SessionState::Terminated) {
            tracing::info!(session_id = %self.id().short(), "terminal session closed");
        }
        self.ctx.teardown();
        Ok(())
    }

    /// Queue input for the child. Typed commands are recorded in history.
    pub fn send_input(&mut self, input: Input) -> Result<u64, TerminalError> {
        let sender = self.input_sender()?;
        let typed = match &input {
            Input::Typed(text) => Some(text.clone()),
            _ => None,
        };
        let order = sender.send(input)?;
        if let Some(text) = typed {
            self.history.record_executed(&text);
        }
        Ok(order)
    }

    /// A producer handle for other UI components. History is not updated
    /// for input sent this way.
    pub fn input_sender(&self) -> Result<InputSender, TerminalError> {
        if self.backend.kind() == BackendKind::HttpBridge {
            return Err(TerminalError::InputUnsupported(BackendKind::HttpBridge));
        }
        let state = self.state();
        if !state.is_live() {
            return Err(TerminalError::InvalidState {
                state,
                action: "send input to",
            });
        }
        self.ctx
            .with_attachment(Attachment::input_sender)
            .flatten()
            .ok_or(TerminalError::InputClosed)
    }

    /// Up arrow in the input field.
    pub fn history_older(&mut self) -> Option<String> {
        self.history.older().map(str::to_string)
    }

    /// Down arrow in the input field.
    pub fn history_newer(&mut self) -> Option<String> {
        self.history.newer().map(str::to_string)
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn resize(&self, cols: u16, rows: u16) -> Result<(), TerminalError> {
        match self.process() {
            Some(process) => process.resize(cols, rows),
            None => Err(TerminalError::InvalidState {
                state: self.state(),
                action: "resize",
            }),
        }
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests;
