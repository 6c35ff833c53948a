//! Error Taxonomy
//!
//! Failures surfaced to awaiters. Parse failures never appear here: the
//! runner delegates unparseable strings to a real shell instead. A non-zero
//! exit code is a normal result unless `errexit` is set, in which case the
//! result is wrapped in [`CommandError::NonZeroExit`] after the runner's
//! `End`/`Exit` events have already been emitted.

use thiserror::Error;

use crate::runner::RunResult;

#[derive(Debug, Clone, Error)]
pub enum CommandError {
    /// errexit is set and the command finished with a non-zero code.
    /// The full result travels with the error.
    #[error("command exited with code {}", .result.code)]
    NonZeroExit { result: RunResult },

    /// Programming error at a call site (bad option name, misuse of the API).
    #[error("{0}")]
    Usage(String),
}

impl CommandError {
    /// The result carried by the error, if any.
    pub fn result(&self) -> Option<&RunResult> {
        match self {
            Self::NonZeroExit { result } => Some(result),
            Self::Usage(_) => None,
        }
    }

    /// Exit code associated with the failure.
    pub fn code(&self) -> i32 {
        match self {
            Self::NonZeroExit { result } => result.code,
            Self::Usage(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_zero_exit_carries_result() {
        let err = CommandError::NonZeroExit {
            result: RunResult {
                code: 3,
                stdout: "out".into(),
                stderr: "err".into(),
                stdin: String::new(),
            },
        };
        assert_eq!(err.code(), 3);
        assert_eq!(err.result().map(|r| r.stderr.as_str()), Some("err"));
        assert!(err.to_string().contains("code 3"));
    }

    #[test]
    fn test_usage_error() {
        let err = CommandError::Usage("pipe target is not runnable".into());
        assert_eq!(err.code(), 1);
        assert!(err.result().is_none());
    }
}
