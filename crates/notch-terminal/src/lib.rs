//! Embedded terminal sessions for notch panels.
//!
//! A [`TerminalSession`] launches a shell (or a terminal-over-HTTP server)
//! as a child process, streams sanitized output to the UI over a channel,
//! and serializes keyboard and drag-and-drop input into the child.
//!
//! Leaves first: [`port`] finds a local port for the HTTP bridge,
//! [`supervisor`] spawns and watches the child, [`stream`] reads its output,
//! [`input`] writes to it, [`history`] keeps typed commands, and
//! [`session`] ties them together behind one [`SessionBackend`] per panel.

pub mod backend;
pub mod bridge;
pub mod decode;
pub mod env;
pub mod error;
pub mod event;
pub mod history;
pub mod input;
pub mod port;
pub mod sanitize;
pub mod session;
pub mod state;
pub mod stream;
pub mod supervisor;

pub use backend::{Attachment, DirectPipeBackend, HttpBridgeBackend, SessionBackend};
pub use bridge::{bridge_url, BridgePolicy, BridgeProbe, ProbeOutcome};
pub use decode::Utf8ChunkDecoder;
pub use env::ChildEnvironment;
pub use error::{SpawnFailure, SpawnFailureKind, TerminalError};
pub use event::{EventSink, SessionEvent};
pub use history::{CommandHistory, FileHistoryStore, HistoryEntry, HistoryStore, MemoryHistoryStore};
pub use input::{
    ControlKey, DroppedContent, Input, InputFailure, InputRouter, InputSender, InputSource,
    PendingInputEvent,
};
pub use port::{find_available_port, PortAllocator, PortLease};
pub use sanitize::{sanitize, AnsiRule, Sanitizer};
pub use session::{SessionContext, SessionOptions, TerminalSession};
pub use state::SessionState;
pub use stream::{DrainWatch, StreamBridge};
pub use supervisor::{
    resolve_executable, ExitWatcher, LaunchSpec, ProcessExit, ProcessHandle, ProcessSupervisor,
    StopOutcome,
};

pub use notch_common::{BackendKind, DropSubmitPolicy, SessionId};
