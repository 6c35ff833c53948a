//! Shell Options
//!
//! Process-wide flags mirroring `set -e` / `set -x` / `set -v` / `set -u` /
//! `set -o pipefail`. Held by the engine; each runner snapshots them at
//! start, so changes never affect a runner that has already started.

use crate::error::CommandError;

/// Engine-wide shell option record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShellSettings {
    pub errexit: bool,
    pub verbose: bool,
    pub xtrace: bool,
    pub pipefail: bool,
    pub nounset: bool,
}

/// One option, resolvable from short and long spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellOption {
    Errexit,
    Verbose,
    Xtrace,
    Pipefail,
    Nounset,
}

impl ShellOption {
    /// Accepts `e`/`errexit`, `x`/`xtrace`, `v`/`verbose`, `u`/`nounset`,
    /// `pipefail`/`o pipefail`.
    pub fn parse(name: &str) -> Result<Self, CommandError> {
        match name.trim() {
            "e" | "errexit" => Ok(Self::Errexit),
            "x" | "xtrace" => Ok(Self::Xtrace),
            "v" | "verbose" => Ok(Self::Verbose),
            "u" | "nounset" => Ok(Self::Nounset),
            "pipefail" | "o pipefail" => Ok(Self::Pipefail),
            other => Err(CommandError::Usage(format!(
                "unknown shell option `{}`",
                other
            ))),
        }
    }
}

impl ShellSettings {
    /// Initial settings, honoring `COMMAND_STREAM_TRACE` and
    /// `COMMAND_STREAM_VERBOSE`.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(v) = std::env::var("COMMAND_STREAM_TRACE") {
            settings.xtrace = v == "true";
        }
        if let Ok(v) = std::env::var("COMMAND_STREAM_VERBOSE") {
            settings.verbose = v == "true";
        }
        settings
    }

    pub fn apply(&mut self, option: ShellOption, enabled: bool) {
        match option {
            ShellOption::Errexit => self.errexit = enabled,
            ShellOption::Verbose => self.verbose = enabled,
            ShellOption::Xtrace => self.xtrace = enabled,
            ShellOption::Pipefail => self.pipefail = enabled,
            ShellOption::Nounset => self.nounset = enabled,
        }
    }
}
