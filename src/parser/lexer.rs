//! Lexer for Command Strings
//!
//! Tokenizes a command string into the stream the parser consumes:
//! operators, grouping, redirections, and quote-aware words. Quote
//! characters are recorded on the token so arguments can be re-rendered
//! shell-legally later.

/// Token types for the command lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Eof,
    Semicolon, // ;
    Pipe,      // |
    AndAnd,    // &&
    OrOr,      // ||
    Less,      // <
    Great,     // >
    DGreat,    // >>
    LParen,    // (
    RParen,    // )
    Word,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eof => "EOF",
            Self::Semicolon => ";",
            Self::Pipe => "|",
            Self::AndAnd => "&&",
            Self::OrOr => "||",
            Self::Less => "<",
            Self::Great => ">",
            Self::DGreat => ">>",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::Word => "WORD",
        }
    }
}

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    /// For WORD tokens: the unquoted text.
    pub value: String,
    pub start: usize,
    pub end: usize,
    /// For WORD tokens: quote information.
    pub quoted: bool,
    pub quote_char: Option<char>,
}

impl Token {
    pub fn new(token_type: TokenType, value: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            token_type,
            value: value.into(),
            start,
            end,
            quoted: false,
            quote_char: None,
        }
    }

    pub fn with_quotes(mut self, quoted: bool, quote_char: Option<char>) -> Self {
        self.quoted = quoted;
        self.quote_char = quote_char;
        self
    }
}

/// Error produced when the input contains something the reduced token set
/// cannot represent. Callers delegate such strings to a real shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub position: usize,
}

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    /// Tokenize the entire input, appending a final EOF token.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.token_type == TokenType::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        // Skip blanks; newlines separate commands like `;`.
        while matches!(self.peek(), Some(' ') | Some('\t')) {
            self.pos += 1;
        }

        let start = self.pos;
        let c = match self.peek() {
            None => return Ok(Token::new(TokenType::Eof, "", start, start)),
            Some(c) => c,
        };

        match c {
            '\n' | ';' => {
                self.pos += 1;
                Ok(Token::new(TokenType::Semicolon, ";", start, self.pos))
            }
            '|' => {
                self.pos += 1;
                if self.peek() == Some('|') {
                    self.pos += 1;
                    Ok(Token::new(TokenType::OrOr, "||", start, self.pos))
                } else if self.peek() == Some('&') {
                    Err(self.unsupported("|&", start))
                } else {
                    Ok(Token::new(TokenType::Pipe, "|", start, self.pos))
                }
            }
            '&' => {
                self.pos += 1;
                if self.peek() == Some('&') {
                    self.pos += 1;
                    Ok(Token::new(TokenType::AndAnd, "&&", start, self.pos))
                } else {
                    // Background execution and &>/&| forms are not in scope.
                    Err(self.unsupported("&", start))
                }
            }
            '<' => {
                self.pos += 1;
                if self.peek() == Some('<') {
                    Err(self.unsupported("<<", start))
                } else if self.peek() == Some('&') {
                    Err(self.unsupported("<&", start))
                } else {
                    Ok(Token::new(TokenType::Less, "<", start, self.pos))
                }
            }
            '>' => {
                self.pos += 1;
                if self.peek() == Some('>') {
                    self.pos += 1;
                    Ok(Token::new(TokenType::DGreat, ">>", start, self.pos))
                } else if self.peek() == Some('&') {
                    Err(self.unsupported(">&", start))
                } else {
                    Ok(Token::new(TokenType::Great, ">", start, self.pos))
                }
            }
            '(' => {
                self.pos += 1;
                Ok(Token::new(TokenType::LParen, "(", start, self.pos))
            }
            ')' => {
                self.pos += 1;
                Ok(Token::new(TokenType::RParen, ")", start, self.pos))
            }
            _ => self.lex_word(start),
        }
    }

    fn lex_word(&mut self, start: usize) -> Result<Token, LexError> {
        let mut value = String::new();
        let mut quoted = false;
        let mut quote_char: Option<char> = None;

        loop {
            let c = match self.peek() {
                None => break,
                Some(c) => c,
            };
            match c {
                ' ' | '\t' | '\n' | ';' | '|' | '&' | '<' | '>' | '(' | ')' => break,
                '\'' => {
                    self.pos += 1;
                    quoted = true;
                    quote_char.get_or_insert('\'');
                    loop {
                        match self.bump() {
                            None => return Err(self.unterminated('\'', start)),
                            Some('\'') => break,
                            Some(inner) => value.push(inner),
                        }
                    }
                }
                '"' => {
                    self.pos += 1;
                    quoted = true;
                    quote_char.get_or_insert('"');
                    loop {
                        match self.bump() {
                            None => return Err(self.unterminated('"', start)),
                            Some('"') => break,
                            Some('\\') => {
                                // Inside double quotes, backslash escapes the
                                // next character.
                                match self.bump() {
                                    None => return Err(self.unterminated('"', start)),
                                    Some(esc) => value.push(esc),
                                }
                            }
                            Some(inner) => value.push(inner),
                        }
                    }
                }
                '\\' => {
                    self.pos += 1;
                    match self.bump() {
                        None => return Err(LexError {
                            message: "trailing backslash".to_string(),
                            position: start,
                        }),
                        Some(esc) => value.push(esc),
                    }
                }
                _ => {
                    value.push(c);
                    self.pos += 1;
                }
            }
        }

        if value.is_empty() && !quoted {
            return Err(LexError {
                message: "empty word".to_string(),
                position: start,
            });
        }
        Ok(Token::new(TokenType::Word, value, start, self.pos).with_quotes(quoted, quote_char))
    }

    fn unsupported(&self, op: &str, position: usize) -> LexError {
        LexError {
            message: format!("unsupported operator `{}`", op),
            position,
        }
    }

    fn unterminated(&self, quote: char, position: usize) -> LexError {
        LexError {
            message: format!("unterminated {} quote", quote),
            position,
        }
    }
}
