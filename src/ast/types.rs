//! Abstract Syntax Tree (AST) Types
//!
//! The command AST covers the structured subset the engine executes
//! in-process: simple commands, pipelines, operator sequences, and
//! subshells. Anything richer is delegated to a real shell before an AST
//! is ever built.

use std::fmt;

// =============================================================================
// WORDS & REDIRECTIONS
// =============================================================================

/// One command argument with its original quoting.
///
/// `value` is the unquoted text handed to executors; `quote_char` lets the
/// external executor re-render the argument shell-legally when delegating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
    pub value: String,
    pub quoted: bool,
    pub quote_char: Option<char>,
}

impl Arg {
    pub fn bare(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            quoted: false,
            quote_char: None,
        }
    }

    pub fn quoted(value: impl Into<String>, quote_char: char) -> Self {
        Self {
            value: value.into(),
            quoted: true,
            quote_char: Some(quote_char),
        }
    }

    /// Render the argument back into shell-legal text.
    pub fn render(&self) -> String {
        match self.quote_char {
            Some('\'') => format!("'{}'", self.value.replace('\'', "'\\''")),
            Some('"') => format!("\"{}\"", self.value.replace('"', "\\\"")),
            _ => self.value.clone(),
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    Out,    // >
    Append, // >>
    In,     // <
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub kind: RedirectKind,
    pub target: String,
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Operators joining commands in a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceOperator {
    And,  // &&
    Or,   // ||
    Semi, // ;
}

/// Union of all command shapes the engine executes structurally.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandAst {
    /// name args... with optional redirections
    Simple {
        cmd: String,
        args: Vec<Arg>,
        redirects: Vec<Redirect>,
    },
    /// cmd1 | cmd2 | cmd3 (stages are Simple)
    Pipeline { stages: Vec<CommandAst> },
    /// cmd1 && cmd2 || cmd3 ; cmd4 — `operators.len() == commands.len() - 1`
    Sequence {
        commands: Vec<CommandAst>,
        operators: Vec<SequenceOperator>,
    },
    /// ( ... )
    Subshell { body: Box<CommandAst> },
}

impl CommandAst {
    pub fn simple(cmd: impl Into<String>, args: Vec<Arg>) -> Self {
        CommandAst::Simple {
            cmd: cmd.into(),
            args,
            redirects: Vec::new(),
        }
    }

    /// Command name for Simple nodes.
    pub fn command_name(&self) -> Option<&str> {
        match self {
            CommandAst::Simple { cmd, .. } => Some(cmd.as_str()),
            _ => None,
        }
    }
}
