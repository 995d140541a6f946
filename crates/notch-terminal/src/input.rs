//! Serialized input to the child process.
//!
//! Keyboard entry, control keys, drag-and-drop and programmatic commands
//! all go through one [`InputSender`]. A single writer thread owns the
//! child's input and writes each event whole, so payloads from different
//! producers never interleave.

use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;

use notch_common::DropSubmitPolicy;
use serde::Serialize;

use crate::error::TerminalError;

// =============================================================================
// INPUT TYPES
// =============================================================================

/// Where an input event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    Typed,
    ControlKey,
    DragDrop,
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InputSource::Typed => "typed",
            InputSource::ControlKey => "control key",
            InputSource::DragDrop => "drag and drop",
        };
        f.write_str(s)
    }
}

/// Keys forwarded as raw terminal sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKey {
    Up,
    Down,
    Right,
    Left,
    Escape,
    /// Ctrl-C.
    Interrupt,
    /// Ctrl-D.
    EndOfFile,
    Tab,
}

impl ControlKey {
    pub fn bytes(self) -> &'static [u8] {
        match self {
            ControlKey::Up => b"\x1b[A",
            ControlKey::Down => b"\x1b[B",
            ControlKey::Right => b"\x1b[C",
            ControlKey::Left => b"\x1b[D",
            ControlKey::Escape => b"\x1b",
            ControlKey::Interrupt => b"\x03",
            ControlKey::EndOfFile => b"\x04",
            ControlKey::Tab => b"\t",
        }
    }
}

/// Something dropped onto the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DroppedContent {
    Paths(Vec<PathBuf>),
    Text(String),
}

impl DroppedContent {
    /// Text inserted at the prompt. Paths with spaces are double-quoted.
    pub fn to_payload(&self) -> String {
        match self {
            DroppedContent::Paths(paths) => paths
                .iter()
                .map(|p| {
                    let p = p.to_string_lossy();
                    if p.contains(' ') {
                        format!("\"{p}\"")
                    } else {
                        p.into_owned()
                    }
                })
                .collect::<Vec<_>>()
                .join(" "),
            DroppedContent::Text(text) => text.clone(),
        }
    }
}

/// One unit of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// A command line; a newline is appended.
    Typed(String),
    Control(ControlKey),
    Drop(DroppedContent),
}

impl Input {
    pub fn source(&self) -> InputSource {
        match self {
            Input::Typed(_) => InputSource::Typed,
            Input::Control(_) => InputSource::ControlKey,
            Input::Drop(_) => InputSource::DragDrop,
        }
    }

    /// Bytes written to the child.
    pub fn encode(&self, drop_policy: DropSubmitPolicy) -> Vec<u8> {
        match self {
            Input::Typed(text) => {
                let mut bytes = Vec::with_capacity(text.len() + 1);
                bytes.extend_from_slice(text.as_bytes());
                bytes.push(b'\n');
                bytes
            }
            Input::Control(key) => key.bytes().to_vec(),
            Input::Drop(content) => {
                let mut bytes = content.to_payload().into_bytes();
                if drop_policy == DropSubmitPolicy::InsertAndSubmit {
                    bytes.push(b'\n');
                }
                bytes
            }
        }
    }
}

/// An encoded event waiting for the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInputEvent {
    pub payload: Vec<u8>,
    pub source: InputSource,
    /// Position in the write stream, starting at 0.
    pub order: u64,
}

/// A write that did not reach the child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFailure {
    pub source: InputSource,
    pub order: u64,
    pub message: String,
}

enum RouterMessage {
    Input(PendingInputEvent),
    Shutdown,
}

// =============================================================================
// SENDER
// =============================================================================

/// Cloneable producer handle.
#[derive(Clone)]
pub struct InputSender {
    tx: mpsc::Sender<RouterMessage>,
    next_order: Arc<Mutex<u64>>,
    drop_policy: DropSubmitPolicy,
}

impl fmt::Debug for InputSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputSender")
            .field("drop_policy", &self.drop_policy)
            .finish_non_exhaustive()
    }
}

impl InputSender {
    /// Queue `input`. Returns its order in the write stream.
    pub fn send(&self, input: Input) -> Result<u64, TerminalError> {
        let payload = input.encode(self.drop_policy);
        let source = input.source();

        // Order is assigned under the same lock as the send so that order
        // numbers match the channel's order.
        let mut next = self.next_order.lock().unwrap_or_else(PoisonError::into_inner);
        let order = *next;
        self.tx
            .send(RouterMessage::Input(PendingInputEvent {
                payload,
                source,
                order,
            }))
            .map_err(|_| TerminalError::InputClosed)?;
        *next += 1;
        Ok(order)
    }

    pub fn drop_policy(&self) -> DropSubmitPolicy {
        self.drop_policy
    }
}

// =============================================================================
// ROUTER
// =============================================================================

/// Owns the writer thread.
pub struct InputRouter {
    sender: InputSender,
    thread: Option<thread::JoinHandle<()>>,
}

impl fmt::Debug for InputRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputRouter")
            .field("running", &self.thread.is_some())
            .finish()
    }
}

impl InputRouter {
    /// Start the writer thread over `writer`.
    ///
    /// `on_failure` runs on the writer thread for every failed write. The
    /// router keeps accepting input afterwards.
    pub fn spawn<W, F>(
        mut writer: W,
        drop_policy: DropSubmitPolicy,
        on_failure: F,
    ) -> Result<Self, TerminalError>
    where
        W: Write + Send + 'static,
        F: Fn(InputFailure) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<RouterMessage>();

        let thread = thread::Builder::new()
            .name("input-router".to_string())
            .spawn(move || {
                while let Ok(message) = rx.recv() {
                    let event = match message {
                        RouterMessage::Input(event) => event,
                        RouterMessage::Shutdown => break,
                    };
                    let result = writer
                        .write_all(&event.payload)
                        .and_then(|()| writer.flush());
                    if let Err(e) = result {
                        tracing::warn!(
                            source = %event.source,
                            order = event.order,
                            error = %e,
                            "input write failed"
                        );
                        on_failure(InputFailure {
                            source: event.source,
                            order: event.order,
                            message: e.to_string(),
                        });
                    }
                }
                tracing::debug!("input router stopped");
            })?;

        Ok(Self {
            sender: InputSender {
                tx,
                next_order: Arc::new(Mutex::new(0)),
                drop_policy,
            },
            thread: Some(thread),
        })
    }

    pub fn sender(&self) -> InputSender {
        self.sender.clone()
    }

    pub fn send(&self, input: Input) -> Result<u64, TerminalError> {
        self.sender.send(input)
    }

    /// Stop after the events already queued. Later sends fail with
    /// [`TerminalError::InputClosed`] once the thread has exited.
    pub fn shutdown(&self) {
        let _ = self.sender.tx.send(RouterMessage::Shutdown);
    }

    /// Shut down and wait for queued writes to finish.
    pub fn join(mut self) {
        self.shutdown();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("input router thread panicked");
            }
        }
    }
}
