use log::{debug, trace};
use std::fmt::{self, Display, Formatter};

use crate::error::{lex_error, Result};

pub const COMMENT_CHAR: char = '#';

/// A position in the source text. `cursor` is a byte offset, `line` and
/// `column` are 1-based and only used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileLocation {
    pub cursor: usize,
    pub line: usize,
    pub column: usize,
}

impl Display for FileLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:>3}:{:<3}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Pipe,
    Comma,
    Equal,
    Semicolon,

    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,

    Identifier(String),
    Number(f64),

    Var,
    Return,
    Func,

    Error(char),
    EOF,
}

impl TokenKind {
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::LeftParen => "LeftParen",
            TokenKind::RightParen => "RightParen",
            TokenKind::LeftBrace => "LeftBrace",
            TokenKind::RightBrace => "RightBrace",
            TokenKind::Pipe => "Pipe",
            TokenKind::Comma => "Comma",
            TokenKind::Equal => "Equal",
            TokenKind::Semicolon => "Semicolon",
            TokenKind::Plus => "Plus",
            TokenKind::Minus => "Minus",
            TokenKind::Star => "Star",
            TokenKind::StarStar => "StarStar",
            TokenKind::Slash => "Slash",
            TokenKind::SlashSlash => "SlashSlash",
            TokenKind::Identifier(_) => "Identifier",
            TokenKind::Number(_) => "Number",
            TokenKind::Var => "Var",
            TokenKind::Return => "Return",
            TokenKind::Func => "Func",
            TokenKind::Error(_) => "Error",
            TokenKind::EOF => "EOF",
        }
    }

    /// The payload carried by identifier, number and error tokens.
    pub fn value(&self) -> Option<String> {
        match self {
            TokenKind::Identifier(name) => Some(name.clone()),
            TokenKind::Number(n) => Some(n.to_string()),
            TokenKind::Error(c) => Some(c.to_string()),
            _ => None,
        }
    }

    pub fn is_keyword(&self) -> bool {
        matches!(self, TokenKind::Var | TokenKind::Return | TokenKind::Func)
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::LeftParen => write!(f, "'('"),
            TokenKind::RightParen => write!(f, "')'"),
            TokenKind::LeftBrace => write!(f, "'{{'"),
            TokenKind::RightBrace => write!(f, "'}}'"),
            TokenKind::Pipe => write!(f, "'|'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Equal => write!(f, "'='"),
            TokenKind::Semicolon => write!(f, "';'"),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::StarStar => write!(f, "'**'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::SlashSlash => write!(f, "'//'"),
            TokenKind::Identifier(name) => write!(f, "identifier '{}'", name),
            TokenKind::Number(n) => write!(f, "number {}", n),
            TokenKind::Var => write!(f, "'var'"),
            TokenKind::Return => write!(f, "'return'"),
            TokenKind::Func => write!(f, "'func'"),
            TokenKind::Error(c) => write!(f, "unexpected character '{}'", c),
            TokenKind::EOF => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: FileLocation,
}

/// Pull-based token stream with a single token of lookahead.
#[derive(Debug)]
pub struct Lexer<'src> {
    source: &'src str,
    cursor: usize,
    line: usize,
    column: usize,
    peeked: Option<Token>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            cursor: 0,
            line: 1,
            column: 1,
            peeked: None,
        }
    }

    pub fn location(&self) -> FileLocation {
        FileLocation {
            cursor: self.cursor,
            line: self.line,
            column: self.column,
        }
    }

    pub fn next(&mut self) -> Result<Token> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.scan_token(),
        }
    }

    pub fn peek(&mut self) -> Result<&Token> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.scan_token()?,
        };
        Ok(self.peeked.insert(token))
    }

    fn current(&self) -> Option<char> {
        self.source[self.cursor..].chars().next()
    }

    fn advance(&mut self) {
        let Some(c) = self.current() else {
            return;
        };
        self.cursor += c.len_utf8();

        // CR LF is a single line break, carried by the LF
        let crlf = c == '\r' && self.current() == Some('\n');
        if c == '\n' || (c == '\r' && !crlf) {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current() {
            match c {
                ' ' | '\t' | '\r' | '\n' => self.advance(),
                COMMENT_CHAR => {
                    while !matches!(self.current(), None | Some('\n') | Some('\r')) {
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn scan_token(&mut self) -> Result<Token> {
        self.skip_whitespace();
        let location = self.location();

        let Some(c) = self.current() else {
            return Ok(Token {
                kind: TokenKind::EOF,
                location,
            });
        };

        let kind = match c {
            '0'..='9' | '.' => self.scan_number().inspect_err(|err| {
                debug!("{} at {}", err, location);
            })?,
            '(' => self.single(TokenKind::LeftParen),
            ')' => self.single(TokenKind::RightParen),
            '{' => self.single(TokenKind::LeftBrace),
            '}' => self.single(TokenKind::RightBrace),
            '|' => self.single(TokenKind::Pipe),
            ',' => self.single(TokenKind::Comma),
            '=' => self.single(TokenKind::Equal),
            ';' => self.single(TokenKind::Semicolon),
            '+' => self.single(TokenKind::Plus),
            '-' => self.single(TokenKind::Minus),
            '*' => {
                self.advance();
                if self.current() == Some('*') {
                    self.single(TokenKind::StarStar)
                } else {
                    TokenKind::Star
                }
            }
            '/' => {
                self.advance();
                if self.current() == Some('/') {
                    self.single(TokenKind::SlashSlash)
                } else {
                    TokenKind::Slash
                }
            }
            c if is_identifier_start(c) => self.scan_identifier(),
            c => self.single(TokenKind::Error(c)),
        };

        trace!("{} {}", location, kind);
        Ok(Token { kind, location })
    }

    fn scan_number(&mut self) -> Result<TokenKind> {
        let start = self.cursor;
        let start_location = self.location();

        let mut decimal_set = false;
        let mut exponent_set = false;
        // true while the exponent marker or its sign still needs digits
        let mut exponent_open = false;
        let mut sign_allowed = false;

        loop {
            match self.current() {
                Some('+' | '-') if sign_allowed => {
                    sign_allowed = false;
                    self.advance();
                }
                Some('e' | 'E') => {
                    if exponent_set {
                        return lex_error("Exponent already set", self.location());
                    }
                    exponent_set = true;
                    exponent_open = true;
                    sign_allowed = true;
                    self.advance();
                }
                Some('.') => {
                    if exponent_set {
                        return lex_error("Exponent set, decimal cannot be used", self.location());
                    }
                    if decimal_set {
                        return lex_error("Decimal already set", self.location());
                    }
                    decimal_set = true;
                    self.advance();
                }
                Some(c) if c.is_ascii_digit() => {
                    exponent_open = false;
                    sign_allowed = false;
                    self.advance();
                }
                _ => break,
            }
        }

        if exponent_open {
            return lex_error("Number cannot end with exponent", self.location());
        }

        let text = &self.source[start..self.cursor];
        match text.parse::<f64>() {
            Ok(n) => Ok(TokenKind::Number(n)),
            Err(_) => lex_error(
                &format!("Invalid number literal '{}'", text),
                start_location,
            ),
        }
    }

    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.cursor;
        while self.current().is_some_and(is_identifier_part) {
            self.advance();
        }

        match &self.source[start..self.cursor] {
            "var" => TokenKind::Var,
            "return" => TokenKind::Return,
            "func" => TokenKind::Func,
            name => TokenKind::Identifier(name.to_string()),
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_part(c: char) -> bool {
    is_identifier_start(c) || c.is_ascii_digit()
}

/// Drains a lexer into a vector, up to and including the EOF token.
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();

    loop {
        let token = lexer.next()?;
        let done = token.kind == TokenKind::EOF;
        tokens.push(token);

        if done {
            return Ok(tokens);
        }
    }
}

/// Renders `message` with the source line containing `location` and a caret
/// under the offending column.
pub fn format_diagnostic(message: &str, location: FileLocation, source: &str) -> String {
    let is_break = |c: char| c == '\n' || c == '\r';

    let mut cursor = location.cursor.min(source.len());
    while !source.is_char_boundary(cursor) {
        cursor -= 1;
    }

    let line_start = source[..cursor].rfind(is_break).map_or(0, |i| i + 1);
    let line_end = source[cursor..]
        .find(is_break)
        .map_or(source.len(), |i| cursor + i);

    format!(
        "[ERROR] {}:\n{}\n{}^ On line {}, column {}\n",
        message,
        &source[line_start..line_end],
        " ".repeat(location.column.saturating_sub(1)),
        location.line,
        location.column
    )
}
