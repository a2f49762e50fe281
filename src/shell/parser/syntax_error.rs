use std::{fmt, sync::Arc};

use miette::{Diagnostic, LabeledSpan, SourceCode};
use thiserror::Error;

use super::{lexer::token::span::Span, source::Source};
use crate::P;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    /// A pipe or redirect with no command in front of it
    MissingCommand(Span),
    /// A statement ended right after a pipe
    BrokenPipe(Span),
    /// A redirect operator not followed by a file name
    MissingRedirectTarget(Span),
    UnterminatedString(Span),
}

impl SyntaxErrorKind {
    pub fn span(&self) -> Span {
        match self {
            Self::MissingCommand(span)
            | Self::BrokenPipe(span)
            | Self::MissingRedirectTarget(span)
            | Self::UnterminatedString(span) => *span,
        }
    }
}

impl fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::MissingCommand(_) => write!(f, "Missing command"),
            Self::BrokenPipe(_) => write!(f, "Broken pipe"),
            Self::MissingRedirectTarget(_) => write!(f, "Missing redirect target"),
            Self::UnterminatedString(_) => write!(f, "Unterminated string"),
        }
    }
}

#[derive(Debug, Error)]
pub struct SyntaxError {
    pub error: SyntaxErrorKind,
    pub src: Arc<Source>,
}

impl SyntaxError {
    pub fn new(error: SyntaxErrorKind, src: Arc<Source>) -> Self {
        SyntaxError { error, src }
    }
}

impl Diagnostic for SyntaxError {
    fn labels(&self) -> Option<P<dyn Iterator<Item = LabeledSpan> + '_>> {
        use SyntaxErrorKind::*;
        let text = match &self.error {
            MissingCommand(_) => "Expected a command before this",
            BrokenPipe(_) => "Expected a command after this pipe",
            MissingRedirectTarget(_) => "Expected a file name after this",
            UnterminatedString(_) => "String is never closed",
        };
        let label = LabeledSpan::new_with_span(Some(String::from(text)), self.error.span());
        Some(P::new(vec![label].into_iter()))
    }

    fn code<'a>(&'a self) -> Option<P<dyn fmt::Display + 'a>> {
        Some(P::new("Syntax Error"))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(&*self.src as &dyn SourceCode)
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        self.error.fmt(f)
    }
}
