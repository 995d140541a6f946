//! Status-line messages surfaced to the user by a terminal panel.
//!
//! Spawn failures, "session ended", unreachable bridges and failed writes all
//! end up here. Messages expire so a stale error does not linger over a
//! fresh session.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::id::SessionId;

/// Severity of a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// One status-line entry, optionally tied to the session that raised it.
#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
    pub session: Option<SessionId>,
    pub created_at: Instant,
    pub ttl: Duration,
}

impl StatusMessage {
    /// Info message with a 5-second TTL.
    pub fn info(text: impl Into<String>) -> Self {
        Self::with_level(StatusLevel::Info, text, Duration::from_secs(5))
    }

    /// Warning message with an 8-second TTL.
    pub fn warning(text: impl Into<String>) -> Self {
        Self::with_level(StatusLevel::Warning, text, Duration::from_secs(8))
    }

    /// Error message with a 10-second TTL.
    pub fn error(text: impl Into<String>) -> Self {
        Self::with_level(StatusLevel::Error, text, Duration::from_secs(10))
    }

    fn with_level(level: StatusLevel, text: impl Into<String>, ttl: Duration) -> Self {
        Self {
            level,
            text: text.into(),
            session: None,
            created_at: Instant::now(),
            ttl,
        }
    }

    /// Attach the originating session.
    pub fn for_session(mut self, id: &SessionId) -> Self {
        self.session = Some(id.clone());
        self
    }

    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }
}

/// Bounded queue of status messages; expired entries are evicted lazily.
#[derive(Debug)]
pub struct StatusQueue {
    items: VecDeque<StatusMessage>,
    capacity: usize,
}

impl StatusQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a message, dropping expired entries and then the oldest if full.
    pub fn push(&mut self, message: StatusMessage) {
        self.evict_expired();
        if self.items.len() >= self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(message);
    }

    /// Most recent live message, which is what a single status line shows.
    pub fn current(&mut self) -> Option<&StatusMessage> {
        self.evict_expired();
        self.items.back()
    }

    /// Drop every message raised by `session`, e.g. when its panel closes.
    pub fn clear_session(&mut self, session: &SessionId) {
        self.items
            .retain(|m| m.session.as_ref() != Some(session));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn evict_expired(&mut self) {
        self.items.retain(|m| !m.is_expired());
    }
}

impl Default for StatusQueue {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_have_increasing_ttl() {
        let info = StatusMessage::info("a");
        let warn = StatusMessage::warning("b");
        let err = StatusMessage::error("c");
        assert_eq!(info.level, StatusLevel::Info);
        assert!(info.ttl < warn.ttl);
        assert!(warn.ttl < err.ttl);
    }

    #[test]
    fn current_returns_latest() {
        let mut queue = StatusQueue::new(4);
        queue.push(StatusMessage::info("starting"));
        queue.push(StatusMessage::error("session ended"));
        assert_eq!(queue.current().unwrap().text, "session ended");
    }

    #[test]
    fn push_evicts_oldest_at_capacity() {
        let mut queue = StatusQueue::new(2);
        queue.push(StatusMessage::info("one"));
        queue.push(StatusMessage::info("two"));
        queue.push(StatusMessage::info("three"));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.current().unwrap().text, "three");
    }

    #[test]
    fn expired_messages_are_dropped() {
        let mut queue = StatusQueue::new(4);
        let mut msg = StatusMessage::info("old");
        msg.ttl = Duration::ZERO;
        queue.push(msg);
        assert!(queue.current().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn clear_session_keeps_other_sessions() {
        let a = SessionId::new();
        let b = SessionId::new();
        let mut queue = StatusQueue::default();
        queue.push(StatusMessage::error("a failed").for_session(&a));
        queue.push(StatusMessage::info("b ok").for_session(&b));
        queue.clear_session(&a);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.current().unwrap().session.as_ref(), Some(&b));
    }
}
