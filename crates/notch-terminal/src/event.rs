//! Events a session delivers to its panel.

use std::sync::mpsc;

use notch_common::{SessionId, StatusLevel};

use crate::input::InputSource;
use crate::state::SessionState;

/// Everything the UI learns about a session arrives as one of these, in
/// order, on a single channel the UI loop drains.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Sanitized output text, in the order the child produced it.
    OutputAppended(String),
    StateChanged(SessionState),
    /// The HTTP bridge answered; the panel should load `url`.
    BridgeReady { url: String },
    /// A write to the child failed. The session keeps running.
    InputFailed { source: InputSource, message: String },
    /// Human-readable status line text.
    Status { level: StatusLevel, text: String },
}

/// Cloneable sending half of a session's event channel.
#[derive(Debug, Clone)]
pub struct EventSink {
    session: SessionId,
    tx: mpsc::Sender<SessionEvent>,
}

impl EventSink {
    pub fn new(session: SessionId, tx: mpsc::Sender<SessionEvent>) -> Self {
        Self { session, tx }
    }

    /// Create a sink and the receiver the UI loop drains.
    pub fn channel(session: SessionId) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self::new(session, tx), rx)
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Deliver an event. Returns `false` once the UI dropped its receiver.
    pub fn emit(&self, event: SessionEvent) -> bool {
        if self.tx.send(event).is_err() {
            tracing::trace!(session_id = %self.session.short(), "event receiver dropped");
            return false;
        }
        true
    }

    pub fn output(&self, text: String) -> bool {
        self.emit(SessionEvent::OutputAppended(text))
    }

    pub fn status(&self, level: StatusLevel, text: impl Into<String>) -> bool {
        self.emit(SessionEvent::Status {
            level,
            text: text.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_arrive_in_emit_order() {
        let (sink, rx) = EventSink::channel(SessionId::new());
        sink.emit(SessionEvent::StateChanged(SessionState::Running));
        sink.output("a".into());
        sink.output("b".into());

        let got: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            got,
            vec![
                SessionEvent::StateChanged(SessionState::Running),
                SessionEvent::OutputAppended("a".into()),
                SessionEvent::OutputAppended("b".into()),
            ]
        );
    }

    #[test]
    fn emit_reports_dropped_receiver() {
        let (sink, rx) = EventSink::channel(SessionId::new());
        drop(rx);
        assert!(!sink.status(StatusLevel::Info, "nobody listening"));
    }

    #[test]
    fn clones_share_the_channel() {
        let (sink, rx) = EventSink::channel(SessionId::new());
        let other = sink.clone();
        sink.output("x".into());
        other.output("y".into());
        assert_eq!(rx.try_iter().count(), 2);
        assert_eq!(other.session(), sink.session());
    }
}
