//! Run Result
//!
//! The terminal value of a runner. A non-zero `code` is not an error by
//! itself; `errexit` decides whether it is surfaced as a typed failure.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Bytes fed to the child's stdin, when captured.
    pub stdin: String,
}

impl RunResult {
    pub fn new(code: i32, stdout: String, stderr: String) -> Self {
        Self {
            code,
            stdout,
            stderr,
            stdin: String::new(),
        }
    }

    pub fn ok() -> Self {
        Self::default()
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }
}
