use crate::error::{Result, SupervisorError};
use serde::Serialize;
use std::fmt;

/// 单个服务在一次监管周期内的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerState {
    NotStarted,
    Launching,
    Probing,
    Ready,
    TimedOut,
    Stopping,
    Stopped,
}

impl ServerState {
    pub fn can_transition_to(self, next: ServerState) -> bool {
        use ServerState::*;
        match (self, next) {
            (NotStarted, Launching) => true,
            (Launching, Probing) => true,
            (Probing, Ready) | (Probing, TimedOut) => true,
            (Stopping, Stopped) => true,
            (Stopping, Stopping) | (Stopped, Stopping) => false,
            (_, Stopping) => true,
            _ => false,
        }
    }

    /// `TimedOut` is terminal too; a later stop + start begins a new cycle.
    pub fn is_terminal(self) -> bool {
        matches!(self, ServerState::Ready | ServerState::TimedOut | ServerState::Stopped)
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerState::NotStarted => "not-started",
            ServerState::Launching => "launching",
            ServerState::Probing => "probing",
            ServerState::Ready => "ready",
            ServerState::TimedOut => "timed-out",
            ServerState::Stopping => "stopping",
            ServerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// 跟踪一个服务的状态迁移
#[derive(Debug, Clone)]
pub struct Lifecycle {
    server: String,
    state: ServerState,
}

impl Lifecycle {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            state: ServerState::NotStarted,
        }
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn transition(&mut self, next: ServerState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(SupervisorError::InvalidTransition {
                server: self.server.clone(),
                from: self.state,
                to: next,
            });
        }
        if next.is_terminal() {
            log::info!("{} is {}", self.server, next);
        } else {
            log::debug!("{}: {} -> {}", self.server, self.state, next);
        }
        self.state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_path() {
        let mut lifecycle = Lifecycle::new("geoserver");
        lifecycle.transition(ServerState::Launching).unwrap();
        lifecycle.transition(ServerState::Probing).unwrap();
        lifecycle.transition(ServerState::Ready).unwrap();
        assert!(lifecycle.state().is_terminal());
    }

    #[test]
    fn test_timed_out_can_be_stopped() {
        let mut lifecycle = Lifecycle::new("geoserver");
        lifecycle.transition(ServerState::Launching).unwrap();
        lifecycle.transition(ServerState::Probing).unwrap();
        lifecycle.transition(ServerState::TimedOut).unwrap();
        lifecycle.transition(ServerState::Stopping).unwrap();
        lifecycle.transition(ServerState::Stopped).unwrap();
        assert_eq!(lifecycle.state(), ServerState::Stopped);
    }

    #[test]
    fn test_stop_from_not_started() {
        let mut lifecycle = Lifecycle::new("django");
        lifecycle.transition(ServerState::Stopping).unwrap();
        lifecycle.transition(ServerState::Stopped).unwrap();
    }

    #[test]
    fn test_illegal_transitions_are_rejected() {
        let mut lifecycle = Lifecycle::new("django");
        let err = lifecycle.transition(ServerState::Ready).unwrap_err();
        assert!(matches!(err, SupervisorError::InvalidTransition { .. }));
        assert_eq!(lifecycle.state(), ServerState::NotStarted);

        lifecycle.transition(ServerState::Stopping).unwrap();
        lifecycle.transition(ServerState::Stopped).unwrap();
        assert!(lifecycle.transition(ServerState::Stopping).is_err());
        assert!(lifecycle.transition(ServerState::Launching).is_err());
    }
}
