//! Session lifecycle states.

use serde::Serialize;
use std::fmt;

/// Where a terminal session is in its life.
///
/// `Idle → Starting → Running → Terminated`, with `Error` reachable from
/// `Starting`. `Terminated` and `Error` are final; retrying means creating a
/// new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Starting,
    Running,
    Terminated,
    Error,
}

impl SessionState {
    /// `true` for states no transition leaves.
    pub fn is_final(self) -> bool {
        matches!(self, SessionState::Terminated | SessionState::Error)
    }

    /// `true` while a child process may be alive.
    pub fn is_live(self) -> bool {
        matches!(self, SessionState::Starting | SessionState::Running)
    }

    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Starting)
                | (Idle, Terminated)
                | (Starting, Running)
                | (Starting, Error)
                | (Starting, Terminated)
                | (Running, Terminated)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Starting => "starting",
            SessionState::Running => "running",
            SessionState::Terminated => "terminated",
            SessionState::Error => "error",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::SessionState::*;
    use super::*;

    const ALL: [SessionState; 5] = [Idle, Starting, Running, Terminated, Error];

    #[test]
    fn happy_path_is_allowed() {
        assert!(Idle.can_transition_to(Starting));
        assert!(Starting.can_transition_to(Running));
        assert!(Running.can_transition_to(Terminated));
    }

    #[test]
    fn error_only_from_starting() {
        for state in ALL {
            assert_eq!(state.can_transition_to(Error), state == Starting, "{state}");
        }
    }

    #[test]
    fn final_states_have_no_exits() {
        for from in [Terminated, Error] {
            assert!(from.is_final());
            for to in ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn running_cannot_go_back_to_starting() {
        assert!(!Running.can_transition_to(Starting));
        assert!(!Running.can_transition_to(Idle));
    }

    #[test]
    fn liveness() {
        assert!(Starting.is_live());
        assert!(Running.is_live());
        assert!(!Idle.is_live());
        assert!(!Terminated.is_live());
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Terminated).unwrap(), "\"terminated\"");
    }
}
