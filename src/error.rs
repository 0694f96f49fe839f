// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("privileged bridge is not available")]
    BridgeUnavailable,

    #[error("failed to launch command: {0}")]
    Launch(#[source] std::io::Error),

    #[error("{action} failed: {message}")]
    CommandFailed {
        action: &'static str,
        message: String,
    },

    #[error("config synchronizer has stopped")]
    SyncStopped,

    #[error("Invalid module ID: '{0}'")]
    InvalidModuleId(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The bridge itself could not be reached, as opposed to the engine
    /// answering with a failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::BridgeUnavailable | Error::Launch(_))
    }

    pub(crate) fn command_failed(action: &'static str, message: impl Into<String>) -> Self {
        Error::CommandFailed {
            action,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_and_domain_failures_are_distinguished() {
        assert!(Error::BridgeUnavailable.is_transport());
        assert!(Error::Launch(std::io::Error::other("no sh")).is_transport());
        assert!(!Error::command_failed("hot mount", "exit 1").is_transport());
        assert!(!Error::InvalidModuleId("../x".into()).is_transport());
    }

    #[test]
    fn command_failure_message_names_the_action() {
        let e = Error::command_failed("save config", "exit code 2");
        assert_eq!(e.to_string(), "save config failed: exit code 2");
    }
}
