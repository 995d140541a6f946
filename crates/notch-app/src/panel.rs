//! A terminal panel rendered to stdout.
//!
//! The panel owns its session, drains the session's event channel from the
//! main loop, and keeps a status line. It plays the part a UI view plays in
//! the desktop shell: output is appended, statuses are shown until they
//! expire, and Up/Down recall history into the input field.

use std::io::Write;
use std::sync::mpsc::Receiver;

use notch_common::{StatusLevel, StatusMessage, StatusQueue};
use notch_terminal::{Input, SessionEvent, SessionState, TerminalError, TerminalSession};

use crate::commands::PanelCommand;

/// Whether the main loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct TerminalPanel<W: Write> {
    session: TerminalSession,
    events: Receiver<SessionEvent>,
    status: StatusQueue,
    /// Text recalled from history, sent by the next empty line.
    field: Option<String>,
    out: W,
}

impl<W: Write> TerminalPanel<W> {
    pub fn new(session: TerminalSession, events: Receiver<SessionEvent>, out: W) -> Self {
        Self {
            session,
            events,
            status: StatusQueue::default(),
            field: None,
            out,
        }
    }

    pub fn session(&self) -> &TerminalSession {
        &self.session
    }

    pub fn open(&mut self, command: &str, args: &[String]) -> Result<(), TerminalError> {
        let result = self.session.open(command, args);
        // A spawn failure has already queued its status event.
        self.pump();
        result
    }

    /// Apply every pending session event. Returns [`Flow::Exit`] once the
    /// session reached a final state.
    pub fn pump(&mut self) -> Flow {
        let mut flow = Flow::Continue;
        while let Ok(event) = self.events.try_recv() {
            if self.apply(event) == Flow::Exit {
                flow = Flow::Exit;
            }
        }
        let _ = self.out.flush();
        flow
    }

    fn apply(&mut self, event: SessionEvent) -> Flow {
        match event {
            SessionEvent::OutputAppended(text) => {
                let _ = self.out.write_all(text.as_bytes());
            }
            SessionEvent::StateChanged(state) => {
                tracing::debug!(session_id = %self.session.id().short(), %state, "panel saw state change");
                if state.is_final() {
                    return Flow::Exit;
                }
            }
            SessionEvent::BridgeReady { url } => {
                self.show(StatusMessage::info(format!("terminal available at {url}")));
            }
            SessionEvent::InputFailed { source, message } => {
                self.show(StatusMessage::warning(format!("{source} input not delivered: {message}")));
            }
            SessionEvent::Status { level, text } => {
                let message = match level {
                    StatusLevel::Info => StatusMessage::info(text),
                    StatusLevel::Warning => StatusMessage::warning(text),
                    StatusLevel::Error => StatusMessage::error(text),
                };
                self.show(message);
            }
        }
        Flow::Continue
    }

    fn show(&mut self, message: StatusMessage) {
        let _ = writeln!(self.out, "\n[notch] {}", message.text);
        self.status.push(message.for_session(self.session.id()));
    }

    pub fn current_status(&mut self) -> Option<&StatusMessage> {
        self.status.current()
    }

    pub fn handle(&mut self, command: PanelCommand) -> Flow {
        match command {
            PanelCommand::Quit => return Flow::Exit,
            PanelCommand::HistoryUp => {
                let recalled = self.session.history_older();
                self.recall(recalled);
            }
            PanelCommand::HistoryDown => {
                let recalled = self.session.history_newer();
                self.recall(recalled);
            }
            PanelCommand::Send(input) => {
                let input = match (input, self.field.take()) {
                    (Input::Typed(text), Some(recalled)) if text.is_empty() => Input::Typed(recalled),
                    (input, _) => input,
                };
                if let Err(e) = self.session.send_input(input) {
                    tracing::warn!(error = %e, "input rejected");
                    self.show(StatusMessage::warning(e.to_string()));
                }
            }
        }
        let _ = self.out.flush();
        Flow::Continue
    }

    fn recall(&mut self, recalled: Option<String>) {
        let _ = writeln!(self.out, "\n[notch] > {}", recalled.as_deref().unwrap_or(""));
        self.field = recalled;
    }

    /// Close the session and show what it reported on the way out.
    pub fn close(&mut self) {
        if let Err(e) = self.session.close() {
            tracing::warn!(error = %e, "failed to close session");
        }
        self.pump();
        self.status.clear_session(self.session.id());
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.session.state(),
            SessionState::Terminated | SessionState::Error
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use notch_terminal::{
        BackendKind, CommandHistory, SessionBackend, SessionContext, SessionOptions,
    };

    /// Backend that keeps the context so tests can emit events.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Option<SessionContext>>>);

    impl SessionBackend for Captured {
        fn kind(&self) -> BackendKind {
            BackendKind::DirectPipe
        }

        fn launch(
            &self,
            _command: &str,
            _args: &[String],
            _options: &SessionOptions,
            ctx: &SessionContext,
        ) -> Result<(), TerminalError> {
            *self.0.lock().unwrap() = Some(ctx.clone());
            ctx.mark_running();
            Ok(())
        }
    }

    fn panel() -> (TerminalPanel<Vec<u8>>, SessionContext) {
        let backend = Captured::default();
        let handle = backend.clone();
        let (session, rx) = TerminalSession::with_channel(
            SessionOptions::default(),
            Box::new(backend),
            CommandHistory::default(),
        );
        let mut panel = TerminalPanel::new(session, rx, Vec::new());
        panel.open("/bin/sh", &[]).unwrap();
        let ctx = handle.0.lock().unwrap().clone().unwrap();
        (panel, ctx)
    }

    fn printed(panel: &TerminalPanel<Vec<u8>>) -> String {
        String::from_utf8_lossy(&panel.out).into_owned()
    }

    #[test]
    fn output_is_printed_in_order() {
        let (mut panel, ctx) = panel();
        ctx.events().output("one ".into());
        ctx.events().output("two".into());
        assert_eq!(panel.pump(), Flow::Continue);
        assert_eq!(printed(&panel), "one two");
    }

    #[test]
    fn statuses_reach_the_status_line() {
        let (mut panel, ctx) = panel();
        ctx.events().status(StatusLevel::Error, "boom");
        panel.pump();
        assert_eq!(panel.current_status().map(|m| m.text.as_str()), Some("boom"));
        assert!(printed(&panel).contains("[notch] boom"));
    }

    #[test]
    fn bridge_ready_is_announced() {
        let (mut panel, ctx) = panel();
        ctx.emit(SessionEvent::BridgeReady {
            url: "http://127.0.0.1:7681/".into(),
        });
        panel.pump();
        assert!(printed(&panel).contains("http://127.0.0.1:7681/"));
    }

    #[test]
    fn final_state_ends_the_loop() {
        let (mut panel, ctx) = panel();
        ctx.process_exited(notch_terminal::ProcessExit {
            code: Some(0),
            success: true,
        });
        assert_eq!(panel.pump(), Flow::Exit);
        assert!(panel.is_finished());
        assert!(printed(&panel).contains("session ended"));
    }

    #[test]
    fn rejected_input_becomes_a_warning() {
        let (mut panel, _ctx) = panel();
        assert_eq!(panel.handle(PanelCommand::Send(Input::Typed("ls".into()))), Flow::Continue);
        assert_eq!(
            panel.current_status().map(|m| m.level),
            Some(StatusLevel::Warning)
        );
    }

    #[test]
    fn history_recall_is_printed() {
        let (mut panel, _ctx) = panel();
        panel.handle(PanelCommand::HistoryUp);
        assert!(printed(&panel).contains("[notch] > "));
        assert!(panel.field.is_none());
    }

    #[test]
    fn quit_exits() {
        let (mut panel, _ctx) = panel();
        assert_eq!(panel.handle(PanelCommand::Quit), Flow::Exit);
        panel.close();
        assert!(panel.is_finished());
    }
}
