//! Real-Shell Oracle
//!
//! Decides whether a command string uses shell features outside the
//! structured subset and must be handed to a system shell verbatim. The
//! check is deliberately conservative: a false positive only forces the
//! delegation path, which is always correct.

/// Substrings that force delegation to a real shell.
///
/// `$` covers command substitution (`$(`), parameter expansion (`${`) and
/// plain variable references; `<<` covers heredocs and herestrings.
const REAL_SHELL_MARKERS: &[&str] = &[
    "`", "$", "~", "*", "?", "[", "2>", "&>", ">&", "<<",
];

/// Whether `command` needs a real shell rather than the in-core parser.
pub fn needs_real_shell(command: &str) -> bool {
    REAL_SHELL_MARKERS
        .iter()
        .any(|marker| command.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_expansion() {
        assert!(needs_real_shell("echo $HOME"));
        assert!(needs_real_shell("echo ${HOME}"));
        assert!(needs_real_shell("echo $(date)"));
    }

    #[test]
    fn test_backtick() {
        assert!(needs_real_shell("echo `date`"));
    }

    #[test]
    fn test_glob() {
        assert!(needs_real_shell("ls *.txt"));
        assert!(needs_real_shell("ls file?.txt"));
        assert!(needs_real_shell("ls [ab].txt"));
    }

    #[test]
    fn test_tilde() {
        assert!(needs_real_shell("ls ~/src"));
    }

    #[test]
    fn test_stderr_redirect() {
        assert!(needs_real_shell("cmd 2>/dev/null"));
        assert!(needs_real_shell("cmd &> all.log"));
        assert!(needs_real_shell("cmd >&2"));
    }

    #[test]
    fn test_heredoc_and_herestring() {
        assert!(needs_real_shell("cat << EOF"));
        assert!(needs_real_shell("cat <<< word"));
    }

    #[test]
    fn test_structured_subset_passes() {
        assert!(!needs_real_shell("echo a && echo b"));
        assert!(!needs_real_shell("false || echo fallback"));
        assert!(!needs_real_shell("a | b | c"));
        assert!(!needs_real_shell("(a && b) | c"));
        assert!(!needs_real_shell("sort < in.txt > out.txt"));
    }
}
