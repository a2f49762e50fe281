use std::{fmt, io, path::PathBuf, sync::Arc};

use miette::{Diagnostic, LabeledSpan, SourceCode};
use nix::errno::Errno;
use thiserror::Error;

use super::{lexer::token::span::Span, source::Source};
use crate::P;

pub mod exit_status;

#[derive(Debug, Error)]
pub struct ShellError {
    pub error: ShellErrorKind,
    pub src: Arc<Source>,
    pub span: Option<Span>,
}

impl ShellError {
    pub fn new(error: ShellErrorKind, src: Arc<Source>) -> Self {
        ShellError {
            error,
            src,
            span: None,
        }
    }

    /// Points the diagnostic at the command that failed
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

impl fmt::Display for ShellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        self.error.fmt(f)
    }
}

#[derive(Debug, Error)]
pub enum ShellErrorKind {
    // exit is not a real error and is only used to unwind out of a pipeline
    Exit(i32),

    // real errors
    Basic(&'static str, String),
    CommandNotFound(String),
    CommandPermissionDenied(String),
    FileNotFound(String),
    FilePermissionDenied(String),
    DirectoryNotFound(String),
    Io(Option<PathBuf>, io::Error),
    Nix(#[from] Errno),
    Config(PathBuf, String),
}

impl fmt::Display for ShellErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ShellErrorKind::*;
        match self {
            Basic(_, e) => write!(f, "{e}"),
            CommandNotFound(name) => write!(f, "Command '{name}' not found"),
            CommandPermissionDenied(name) => write!(f, "Cannot run '{name}' permission denied"),
            FileNotFound(path) => write!(f, "Cannot open '{path}' file not found"),
            FilePermissionDenied(path) => write!(f, "Cannot open '{path}' permission denied"),
            DirectoryNotFound(path) => write!(f, "Directory '{path}' not found"),
            Io(path, error) => match path {
                Some(path) => write!(f, "{} {}", error, path.to_string_lossy()),
                None => write!(f, "{}", error),
            },
            Nix(errno) => write!(f, "{}", errno.desc()),
            Config(path, e) => write!(f, "Invalid config '{}': {e}", path.to_string_lossy()),
            // exit should always be handled and should therefore never be displayed
            Exit(_) => unreachable!("exit should never be printed as an error"),
        }
    }
}

impl ShellErrorKind {
    pub fn category(&self) -> &'static str {
        use ShellErrorKind::*;
        match self {
            Basic(n, _) => n,
            CommandNotFound(..) | CommandPermissionDenied(..) => "Command Error",
            FileNotFound(..) | FilePermissionDenied(..) | DirectoryNotFound(..) => "File Error",
            Config(..) => "Config Error",
            _ => "Shell Error",
        }
    }
}

impl Diagnostic for ShellErrorKind {
    fn code<'a>(&'a self) -> Option<P<dyn fmt::Display + 'a>> {
        Some(P::new(self.category()))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }
}

impl Diagnostic for ShellError {
    fn labels(&self) -> Option<P<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.span?;
        let label = LabeledSpan::new_with_span(None, span);
        Some(P::new(vec![label].into_iter()))
    }

    fn code<'a>(&'a self) -> Option<P<dyn fmt::Display + 'a>> {
        Some(P::new(self.error.category()))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(&*self.src as &dyn SourceCode)
    }
}

impl From<io::Error> for ShellErrorKind {
    fn from(error: io::Error) -> Self {
        ShellErrorKind::Io(None, error)
    }
}

/// Maps a failed open of a redirect target to the matching error kind
pub fn file_err_to_shell_err(error: io::Error, name: &str) -> ShellErrorKind {
    match error.kind() {
        io::ErrorKind::NotFound => ShellErrorKind::FileNotFound(name.to_string()),
        io::ErrorKind::PermissionDenied => ShellErrorKind::FilePermissionDenied(name.to_string()),
        _ => ShellErrorKind::Io(Some(PathBuf::from(name)), error),
    }
}
