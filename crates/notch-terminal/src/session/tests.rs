use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{SpawnFailure, SpawnFailureKind};
use crate::history::MemoryHistoryStore;

/// Backend that never starts a process.
#[derive(Default)]
struct ScriptedBackend {
    fail_with: Option<SpawnFailureKind>,
    launches: Arc<AtomicUsize>,
}

impl SessionBackend for ScriptedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::DirectPipe
    }

    fn launch(
        &self,
        command: &str,
        _args: &[String],
        _options: &SessionOptions,
        ctx: &SessionContext,
    ) -> Result<(), TerminalError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if let Some(kind) = self.fail_with {
            return Err(SpawnFailure::new(command, kind, "scripted failure").into());
        }
        ctx.mark_running();
        Ok(())
    }
}

struct BridgeOnly;

impl SessionBackend for BridgeOnly {
    fn kind(&self) -> BackendKind {
        BackendKind::HttpBridge
    }

    fn launch(
        &self,
        _command: &str,
        _args: &[String],
        _options: &SessionOptions,
        ctx: &SessionContext,
    ) -> Result<(), TerminalError> {
        ctx.mark_running();
        Ok(())
    }
}

fn session(backend: impl SessionBackend + 'static) -> (TerminalSession, mpsc::Receiver<SessionEvent>) {
    TerminalSession::with_channel(
        SessionOptions::default(),
        Box::new(backend),
        CommandHistory::default(),
    )
}

fn states(events: &[SessionEvent]) -> Vec<SessionState> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::StateChanged(s) => Some(*s),
            _ => None,
        })
        .collect()
}

#[test]
fn new_session_is_idle() {
    let (session, rx) = session(ScriptedBackend::default());
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.backend_kind(), BackendKind::DirectPipe);
    assert!(session.port().is_none());
    assert!(session.process().is_none());
    assert!(rx.try_recv().is_err());
}

#[test]
fn open_moves_through_starting_to_running() {
    let (mut session, rx) = session(ScriptedBackend::default());
    session.open("/bin/sh", &[]).unwrap();
    assert_eq!(session.state(), SessionState::Running);
    let events: Vec<_> = rx.try_iter().collect();
    assert_eq!(states(&events), vec![SessionState::Starting, SessionState::Running]);
}

#[test]
fn spawn_failure_is_synchronous_and_final() {
    let launches = Arc::new(AtomicUsize::new(0));
    let backend = ScriptedBackend {
        fail_with: Some(SpawnFailureKind::NotFound),
        launches: Arc::clone(&launches),
    };
    let (mut session, rx) = session(backend);

    let err = session.open("/no/such/shell", &[]).unwrap_err();
    assert!(matches!(err, TerminalError::Spawn(ref f) if f.kind == SpawnFailureKind::NotFound));
    assert_eq!(session.state(), SessionState::Error);

    let events: Vec<_> = rx.try_iter().collect();
    assert_eq!(states(&events), vec![SessionState::Starting, SessionState::Error]);
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::Status { level: StatusLevel::Error, text } if text.contains("/no/such/shell")
    )));

    // No retry, and no reopening a failed session.
    assert!(matches!(
        session.open("/bin/sh", &[]),
        Err(TerminalError::InvalidState { state: SessionState::Error, .. })
    ));
    assert_eq!(launches.load(Ordering::SeqCst), 1);
}

#[test]
fn close_before_open_terminates() {
    let (mut session, rx) = session(ScriptedBackend::default());
    session.close().unwrap();
    assert_eq!(session.state(), SessionState::Terminated);
    assert_eq!(states(&rx.try_iter().collect::<Vec<_>>()), vec![SessionState::Terminated]);
    assert!(session.open("/bin/sh", &[]).is_err());
}

#[test]
fn close_is_idempotent() {
    let (mut session, rx) = session(ScriptedBackend::default());
    session.open("/bin/sh", &[]).unwrap();
    session.close().unwrap();
    session.close().unwrap();
    let events: Vec<_> = rx.try_iter().collect();
    assert_eq!(
        states(&events),
        vec![SessionState::Starting, SessionState::Running, SessionState::Terminated]
    );
}

#[test]
fn close_after_error_keeps_error() {
    let backend = ScriptedBackend {
        fail_with: Some(SpawnFailureKind::PermissionDenied),
        ..Default::default()
    };
    let (mut session, _rx) = session(backend);
    let _ = session.open("ttyd", &[]);
    session.close().unwrap();
    assert_eq!(session.state(), SessionState::Error);
}

#[test]
fn dropping_a_running_session_closes_it() {
    let (mut session, rx) = session(ScriptedBackend::default());
    session.open("/bin/sh", &[]).unwrap();
    drop(session);
    assert_eq!(states(&rx.try_iter().collect::<Vec<_>>()).last(), Some(&SessionState::Terminated));
}

#[test]
fn input_without_router_is_closed() {
    let (mut session, _rx) = session(ScriptedBackend::default());
    session.open("/bin/sh", &[]).unwrap();
    assert!(matches!(
        session.send_input(Input::Typed("ls".into())),
        Err(TerminalError::InputClosed)
    ));
    // Failed sends are not recorded.
    assert!(session.history().is_empty());
}

#[test]
fn input_before_open_is_invalid_state() {
    let (mut session, _rx) = session(ScriptedBackend::default());
    assert!(matches!(
        session.send_input(Input::Typed("ls".into())),
        Err(TerminalError::InvalidState { state: SessionState::Idle, .. })
    ));
}

#[test]
fn http_bridge_sessions_reject_direct_input() {
    let (mut session, _rx) = session(BridgeOnly);
    session.open("/bin/zsh", &[]).unwrap();
    assert!(matches!(
        session.send_input(Input::Typed("ls".into())),
        Err(TerminalError::InputUnsupported(BackendKind::HttpBridge))
    ));
}

#[test]
fn resize_without_process_is_invalid_state() {
    let (session, _rx) = session(ScriptedBackend::default());
    assert!(matches!(
        session.resize(100, 30),
        Err(TerminalError::InvalidState { action: "resize", .. })
    ));
}

#[test]
fn history_navigation_is_exposed() {
    let store = MemoryHistoryStore::new();
    let mut history = CommandHistory::with_store(10, Box::new(store.clone()));
    history.record_executed("make");
    history.record_executed("make test");

    let (mut session, _rx) = TerminalSession::with_channel(
        SessionOptions::default(),
        Box::new(ScriptedBackend::default()),
        history,
    );
    assert_eq!(session.history_older().as_deref(), Some("make test"));
    assert_eq!(session.history_older().as_deref(), Some("make"));
    assert_eq!(session.history_older().as_deref(), Some("make"));
    assert_eq!(session.history_newer().as_deref(), Some("make test"));
    assert_eq!(session.history_newer(), None);
}

#[test]
fn options_from_config() {
    let mut config = NotchConfig::default();
    config.terminal.cols = 132;
    config.terminal.rows = 43;
    config.terminal.drop_submit = DropSubmitPolicy::InsertAndSubmit;
    config.shell.working_directory = Some("/srv/project".into());
    config.shell.env.insert("EDITOR".into(), "vim".into());

    let options = SessionOptions::from_config(&config);
    assert_eq!((options.cols, options.rows), (132, 43));
    assert_eq!(options.drop_policy, DropSubmitPolicy::InsertAndSubmit);
    assert_eq!(options.cwd, Some(PathBuf::from("/srv/project")));
    assert_eq!(options.env, vec![("EDITOR".to_string(), "vim".to_string())]);
}

#[test]
fn tilde_working_directory_expands() {
    if let Some(home) = dirs::home_dir() {
        assert_eq!(expand_tilde("~/code"), home.join("code"));
        assert_eq!(expand_tilde("~"), home);
    }
    assert_eq!(expand_tilde("/abs"), PathBuf::from("/abs"));
}
