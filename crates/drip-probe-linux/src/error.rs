//! Errors raised while running external network tools

use thiserror::Error;

/// Failure of a single external command
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The program could not be started (missing binary, permissions)
    #[error("Failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran and exited unsuccessfully
    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    /// The program's output could not be understood
    #[error("Unexpected output from `{command}`: {message}")]
    Parse { command: String, message: String },
}

impl ProbeError {
    /// Create a parse error
    pub fn parse(command: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            command: command.into(),
            message: message.to_string(),
        }
    }
}
