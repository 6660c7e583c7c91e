use crate::state::ServerState;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    /// 超时后仍有匹配进程存活
    #[error("Could not stop {name}: running processes are\n{}", .lines.join("\n"))]
    StillRunning { name: String, lines: Vec<String> },

    #[error("Failed to query the process table with `{command}`: {source}")]
    ProcessTable {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to launch {name}: {reason}")]
    Launch { name: String, reason: String },

    #[error("Pre-start hook `{command}` failed: {status}")]
    HookFailed { command: String, status: String },

    #[error("Task `{command}` failed: {status}")]
    TaskFailed { command: String, status: String },

    #[error("{name} did not become ready at {url}")]
    NotReady { name: String, url: String },

    #[error("Invalid state transition for {server}: {from} -> {to}")]
    InvalidTransition {
        server: String,
        from: ServerState,
        to: ServerState,
    },

    #[error("Unknown server '{0}'")]
    UnknownServer(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
