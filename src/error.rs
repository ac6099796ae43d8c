//! Errors produced by the front-end.
//!
//! Only lexing and parsing can fail. Both carry the whole source and a span so
//! that miette can point at the offending input with a caret.

use std::fmt::{self, Display};

use miette::{Diagnostic, LabeledSpan, SourceCode, SourceSpan};
use snafu::Snafu;

use crate::lex::TokenType;

pub type CompileResult<T> = Result<T, CompileError>;

/// What the parser was looking for when it gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    Token(TokenType),
    Expression,
    EndOfInput,
}

impl Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Token(kind) => write!(f, "{kind}"),
            Expected::Expression => f.write_str("an expression"),
            Expected::EndOfInput => f.write_str("end of input"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lex,
    Parse,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
    #[snafu(display("{message}"))]
    Lex {
        message: String,
        help: Option<String>,
        span: SourceSpan,
        source_code: String,
    },

    #[snafu(display("expected {expected}, found {found}"))]
    Parse {
        expected: Expected,
        found: String,
        span: SourceSpan,
        source_code: String,
    },

    #[snafu(display("program nests deeper than {limit} levels"))]
    TooDeep {
        limit: usize,
        span: SourceSpan,
        source_code: String,
    },
}

impl CompileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompileError::Lex { .. } => ErrorKind::Lex,
            CompileError::Parse { .. } | CompileError::TooDeep { .. } => ErrorKind::Parse,
        }
    }

    /// Byte range of the input the error points at.
    pub fn span(&self) -> SourceSpan {
        match self {
            CompileError::Lex { span, .. }
            | CompileError::Parse { span, .. }
            | CompileError::TooDeep { span, .. } => *span,
        }
    }
}

impl Diagnostic for CompileError {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        let code = match self.kind() {
            ErrorKind::Lex => "tinyc::lex",
            ErrorKind::Parse => "tinyc::parse",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        match self {
            CompileError::Lex { help, .. } => help
                .as_ref()
                .map(|help| Box::new(help) as Box<dyn Display + 'a>),
            CompileError::Parse { .. } => None,
            CompileError::TooDeep { .. } => Some(Box::new(
                "move inner parts of the expression into their own assignments",
            ) as Box<dyn Display + 'a>),
        }
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        match self {
            CompileError::Lex { source_code, .. }
            | CompileError::Parse { source_code, .. }
            | CompileError::TooDeep { source_code, .. } => Some(source_code as &dyn SourceCode),
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let label = match self {
            CompileError::Lex { .. } => "this input",
            CompileError::Parse { .. } => "here",
            CompileError::TooDeep { .. } => "nested too deeply",
        };
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some(label.to_string()),
            self.span(),
        ))))
    }
}
