use std::fmt::{self, Display};

use miette::SourceSpan;

use crate::ast::Var;
use crate::error::{
    CompileError, CompileResult, Expected, LexSnafu, ParseSnafu, TooDeepSnafu,
};

pub struct Lexer<'de> {
    source: &'de str,
    rest: &'de str,
    current: usize,
    start: usize,
    peeked: Option<Token<'de>>,
    finished: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'de> {
    pub kind: TokenType,
    pub offset: usize,
    pub origin: &'de str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    // Single-character tokens.
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Minus,
    Plus,
    Less,
    Equal,
    Semicolon,
    // Literals.
    Identifier(Var),
    Number(i64),
    // Keywords.
    Do,
    Else,
    If,
    While,
    Eof,
}

impl Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::LeftParen => f.write_str("'('"),
            TokenType::RightParen => f.write_str("')'"),
            TokenType::LeftBrace => f.write_str("'{'"),
            TokenType::RightBrace => f.write_str("'}'"),
            TokenType::Minus => f.write_str("'-'"),
            TokenType::Plus => f.write_str("'+'"),
            TokenType::Less => f.write_str("'<'"),
            TokenType::Equal => f.write_str("'='"),
            TokenType::Semicolon => f.write_str("';'"),
            TokenType::Identifier(var) => write!(f, "identifier '{var}'"),
            TokenType::Number(n) => write!(f, "number {n}"),
            TokenType::Do => f.write_str("keyword 'do'"),
            TokenType::Else => f.write_str("keyword 'else'"),
            TokenType::If => f.write_str("keyword 'if'"),
            TokenType::While => f.write_str("keyword 'while'"),
            TokenType::Eof => f.write_str("end of input"),
        }
    }
}

impl<'de> Display for Token<'de> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let origin = self.origin;
        match self.kind {
            TokenType::Identifier(_) => write!(f, "IDENTIFIER {origin}"),
            TokenType::Number(n) => write!(f, "NUMBER {n}"),
            TokenType::LeftParen => write!(f, "LEFT_PAREN {origin}"),
            TokenType::RightParen => write!(f, "RIGHT_PAREN {origin}"),
            TokenType::LeftBrace => write!(f, "LEFT_BRACE {origin}"),
            TokenType::RightBrace => write!(f, "RIGHT_BRACE {origin}"),
            TokenType::Minus => write!(f, "MINUS {origin}"),
            TokenType::Plus => write!(f, "PLUS {origin}"),
            TokenType::Less => write!(f, "LESS {origin}"),
            TokenType::Equal => write!(f, "EQUAL {origin}"),
            TokenType::Semicolon => write!(f, "SEMICOLON {origin}"),
            TokenType::Do => write!(f, "DO {origin}"),
            TokenType::Else => write!(f, "ELSE {origin}"),
            TokenType::If => write!(f, "IF {origin}"),
            TokenType::While => write!(f, "WHILE {origin}"),
            TokenType::Eof => write!(f, "EOF"),
        }
    }
}

impl<'de> Token<'de> {
    pub fn span(&self) -> SourceSpan {
        SourceSpan::from(self.offset..self.offset + self.origin.len())
    }
}

impl<'de> Lexer<'de> {
    pub fn new(source: &'de str) -> Self {
        Lexer {
            source,
            rest: source,
            current: 0,
            start: 0,
            peeked: None,
            finished: false,
        }
    }

    fn skip_whitespace(&mut self) {
        let first_non_space = self
            .rest
            .find(|c| !matches!(c, ' ' | '\t' | '\r' | '\n'))
            .unwrap_or(self.rest.len());

        self.rest = &self.rest[first_non_space..];
        self.current += first_non_space;
    }

    fn scan_number(&mut self) -> Token<'de> {
        let first_non_digit = self
            .rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.rest.len());

        self.rest = &self.rest[first_non_digit..];
        self.current += first_non_digit;

        let number_str = &self.source[self.start..self.current];

        // Literals are unsigned and unchecked: overflow wraps.
        let value = number_str.bytes().fold(0i64, |acc, digit| {
            acc.wrapping_mul(10).wrapping_add(i64::from(digit - b'0'))
        });

        self.make_token(TokenType::Number(value), number_str)
    }

    fn scan_word(&mut self) -> CompileResult<Token<'de>> {
        let first_non_letter = self
            .rest
            .find(|c: char| !c.is_ascii_lowercase())
            .unwrap_or(self.rest.len());

        self.rest = &self.rest[first_non_letter..];
        self.current += first_non_letter;

        let word = &self.source[self.start..self.current];

        let tok_type = match word {
            "do" => TokenType::Do,
            "else" => TokenType::Else,
            "if" => TokenType::If,
            "while" => TokenType::While,
            _ => {
                let mut chars = word.chars();
                match (chars.next().and_then(Var::from_char), chars.next()) {
                    (Some(var), None) => TokenType::Identifier(var),
                    _ => {
                        return LexSnafu {
                            message: format!("unknown word '{word}'"),
                            help: Some(
                                "variables are single letters a..z and the only keywords are \
                                 'if', 'else', 'while' and 'do'"
                                    .to_string(),
                            ),
                            span: SourceSpan::from(self.start..self.current),
                            source_code: self.source,
                        }
                        .fail()
                    }
                }
            }
        };

        Ok(self.make_token(tok_type, word))
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.rest.chars().next()?;
        self.rest = &self.rest[c.len_utf8()..];
        self.current += c.len_utf8();
        Some(c)
    }

    /// Consumes and returns the next token. Once the input is exhausted every
    /// call returns an `Eof` token.
    pub fn next_token(&mut self) -> CompileResult<Token<'de>> {
        if let Some(token) = self.peeked.take() {
            return Ok(token);
        }

        self.skip_whitespace();

        self.start = self.current;

        let c = match self.advance() {
            Some(c) => c,
            None => return Ok(self.make_token(TokenType::Eof, "")),
        };

        let c_str = &self.source[self.start..self.current];

        let kind = match c {
            '(' => TokenType::LeftParen,
            ')' => TokenType::RightParen,
            '{' => TokenType::LeftBrace,
            '}' => TokenType::RightBrace,
            '-' => TokenType::Minus,
            '+' => TokenType::Plus,
            '<' => TokenType::Less,
            '=' => TokenType::Equal,
            ';' => TokenType::Semicolon,

            '0'..='9' => return Ok(self.scan_number()),
            'a'..='z' => return self.scan_word(),

            _ => {
                return LexSnafu {
                    message: format!("unexpected character '{c}' in input"),
                    help: None::<String>,
                    span: SourceSpan::from(self.start..self.current),
                    source_code: self.source,
                }
                .fail()
            }
        };

        Ok(self.make_token(kind, c_str))
    }

    /// The current lookahead token, scanned on demand.
    pub fn peek(&mut self) -> CompileResult<&Token<'de>> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.next_token()?,
        };
        Ok(self.peeked.insert(token))
    }

    pub fn peek_kind(&mut self) -> CompileResult<TokenType> {
        self.peek().map(|token| token.kind)
    }

    pub fn expect(&mut self, expected: TokenType) -> CompileResult<Token<'de>> {
        self.expect_where(|t| t.kind == expected, Expected::Token(expected))
    }

    pub fn expect_where(
        &mut self,
        mut check: impl FnMut(&Token<'de>) -> bool,
        expected: Expected,
    ) -> CompileResult<Token<'de>> {
        let token = self.next_token()?;
        if check(&token) {
            Ok(token)
        } else {
            Err(self.unexpected(&token, expected))
        }
    }

    /// Builds the error for finding `token` where `expected` should have been.
    pub fn unexpected(&self, token: &Token<'de>, expected: Expected) -> CompileError {
        ParseSnafu {
            expected,
            found: token.kind.to_string(),
            span: token.span(),
            source_code: self.source,
        }
        .build()
    }

    /// Builds the error for nesting past `limit` levels, pointing at `token`.
    pub fn nesting_too_deep(&self, token: &Token<'de>, limit: usize) -> CompileError {
        TooDeepSnafu {
            limit,
            span: token.span(),
            source_code: self.source,
        }
        .build()
    }

    fn make_token(&self, tok_type: TokenType, origin: &'de str) -> Token<'de> {
        Token {
            kind: tok_type,
            offset: self.start,
            origin,
        }
    }
}

/// Yields every token up to and including the first `Eof`, or stops after the
/// first error.
impl<'de> Iterator for Lexer<'de> {
    type Item = CompileResult<Token<'de>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let result = self.next_token();
        match &result {
            Ok(token) if token.kind == TokenType::Eof => self.finished = true,
            Err(_) => self.finished = true,
            Ok(_) => {}
        }
        Some(result)
    }
}

pub fn tokenize(source: &str) -> CompileResult<Vec<Token<'_>>> {
    Lexer::new(source).collect()
}
