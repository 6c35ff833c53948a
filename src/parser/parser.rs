//! Recursive Descent Parser for Command Strings
//!
//! Consumes tokens from the lexer and produces a [`CommandAst`].
//!
//! Grammar (lowest to highest precedence):
//!   sequence  ::= pipeline ((&&|'||'|;) pipeline)*
//!   pipeline  ::= command (| command)*
//!   command   ::= subshell | simple
//!   subshell  ::= ( sequence )
//!   simple    ::= WORD+ (redirect)*
//!   redirect  ::= (>|>>|<) WORD
//!
//! A parse failure is not an error condition for the engine: the caller
//! falls back to delegating the raw string to a system shell.

use std::fmt;

use thiserror::Error;

use crate::ast::types::{Arg, CommandAst, Redirect, RedirectKind, SequenceOperator};
use crate::parser::lexer::{Lexer, Token, TokenType};

// Guards against pathological input; far above anything a command string
// legitimately needs.
pub const MAX_INPUT_SIZE: usize = 1_000_000;
pub const MAX_PARSE_ITERATIONS: usize = 100_000;

#[derive(Debug, Clone, Error)]
pub struct ParseException {
    pub message: String,
    pub position: usize,
}

impl fmt::Display for ParseException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error at offset {}: {}", self.position, self.message)
    }
}

impl ParseException {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

/// Parse a command string into an AST.
///
/// Returns `Err` when the string uses anything outside the structured
/// subset; callers treat that as "use a real shell", never as a failure
/// surfaced to the host.
pub fn parse(input: &str) -> Result<CommandAst, ParseException> {
    if input.len() > MAX_INPUT_SIZE {
        return Err(ParseException::new("input too large", 0));
    }
    let tokens = Lexer::new(input)
        .tokenize()
        .map_err(|e| ParseException::new(e.message, e.position))?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        iterations: 0,
    };
    let ast = parser.parse_sequence()?;
    parser.expect(TokenType::Eof)?;
    Ok(ast)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    iterations: usize,
}

impl Parser {
    fn current(&self) -> &Token {
        // tokenize() always appends EOF, so the clamp is safe.
        self.tokens
            .get(self.pos)
            .unwrap_or_else(|| &self.tokens[self.tokens.len() - 1])
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check_iteration_limit(&mut self) -> Result<(), ParseException> {
        self.iterations += 1;
        if self.iterations > MAX_PARSE_ITERATIONS {
            return Err(ParseException::new(
                "maximum parse iterations exceeded",
                self.current().start,
            ));
        }
        Ok(())
    }

    fn expect(&mut self, token_type: TokenType) -> Result<Token, ParseException> {
        if self.current().token_type == token_type {
            Ok(self.advance())
        } else {
            Err(ParseException::new(
                format!(
                    "expected {} but found {}",
                    token_type.as_str(),
                    self.current().token_type.as_str()
                ),
                self.current().start,
            ))
        }
    }

    /// sequence ::= pipeline ((&&|'||'|;) pipeline)*
    fn parse_sequence(&mut self) -> Result<CommandAst, ParseException> {
        // Leading separators (blank lines) are harmless.
        while self.current().token_type == TokenType::Semicolon {
            self.advance();
        }

        let mut commands = vec![self.parse_pipeline()?];
        let mut operators = Vec::new();

        loop {
            self.check_iteration_limit()?;
            let op = match self.current().token_type {
                TokenType::AndAnd => SequenceOperator::And,
                TokenType::OrOr => SequenceOperator::Or,
                TokenType::Semicolon => SequenceOperator::Semi,
                _ => break,
            };
            self.advance();
            // Trailing separator before EOF or a closing paren ends the
            // sequence; `a;` is legal.
            if matches!(
                self.current().token_type,
                TokenType::Eof | TokenType::RParen
            ) {
                if op != SequenceOperator::Semi {
                    return Err(ParseException::new(
                        "operator with no right-hand command",
                        self.current().start,
                    ));
                }
                break;
            }
            operators.push(op);
            commands.push(self.parse_pipeline()?);
        }

        match commands.len() {
            1 => Ok(commands.remove(0)),
            _ => Ok(CommandAst::Sequence {
                commands,
                operators,
            }),
        }
    }

    /// pipeline ::= command (| command)*
    fn parse_pipeline(&mut self) -> Result<CommandAst, ParseException> {
        let mut stages = vec![self.parse_command()?];
        while self.current().token_type == TokenType::Pipe {
            self.check_iteration_limit()?;
            self.advance();
            stages.push(self.parse_command()?);
        }
        match stages.len() {
            1 => Ok(stages.remove(0)),
            _ => Ok(CommandAst::Pipeline { stages }),
        }
    }

    /// command ::= subshell | simple
    fn parse_command(&mut self) -> Result<CommandAst, ParseException> {
        if self.current().token_type == TokenType::LParen {
            self.parse_subshell()
        } else {
            self.parse_simple()
        }
    }

    /// subshell ::= ( sequence )
    fn parse_subshell(&mut self) -> Result<CommandAst, ParseException> {
        self.expect(TokenType::LParen)?;
        let body = self.parse_sequence()?;
        self.expect(TokenType::RParen)?;
        Ok(CommandAst::Subshell {
            body: Box::new(body),
        })
    }

    /// simple ::= WORD+ (redirect)*
    fn parse_simple(&mut self) -> Result<CommandAst, ParseException> {
        let mut words: Vec<Arg> = Vec::new();
        let mut redirects: Vec<Redirect> = Vec::new();

        loop {
            self.check_iteration_limit()?;
            match self.current().token_type {
                TokenType::Word => {
                    let token = self.advance();
                    words.push(Arg {
                        value: token.value,
                        quoted: token.quoted,
                        quote_char: token.quote_char,
                    });
                }
                TokenType::Great | TokenType::DGreat | TokenType::Less => {
                    let kind = match self.current().token_type {
                        TokenType::Great => RedirectKind::Out,
                        TokenType::DGreat => RedirectKind::Append,
                        _ => RedirectKind::In,
                    };
                    self.advance();
                    let target = self.expect(TokenType::Word)?;
                    redirects.push(Redirect {
                        kind,
                        target: target.value,
                    });
                }
                _ => break,
            }
        }

        if words.is_empty() {
            return Err(ParseException::new(
                format!("expected command but found {}", self.current().token_type.as_str()),
                self.current().start,
            ));
        }

        let cmd = words.remove(0).value;
        Ok(CommandAst::Simple {
            cmd,
            args: words,
            redirects,
        })
    }
}
