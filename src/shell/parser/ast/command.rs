use crate::parser::lexer::token::{span::Span, Token, TokenType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    Word,
    DoubleQuoted,
    SingleQuoted,
}

impl ArgumentKind {
    pub fn from_token(token: &Token) -> Option<Self> {
        match token.token_type {
            TokenType::Word(_) => Some(Self::Word),
            TokenType::DoubleQuoted(_) => Some(Self::DoubleQuoted),
            TokenType::SingleQuoted(_) => Some(Self::SingleQuoted),
            _ => None,
        }
    }

    /// Single quoted text is never substituted
    #[inline(always)]
    pub fn substitutes(&self) -> bool {
        !matches!(self, Self::SingleQuoted)
    }
}

/// A substituted argument and the token kind it was lexed as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub value: String,
    pub kind: ArgumentKind,
}

impl Argument {
    pub fn new(value: impl Into<String>, kind: ArgumentKind) -> Self {
        Self {
            value: value.into(),
            kind,
        }
    }

    #[inline(always)]
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Stdin {
    #[default]
    Inherit,
    Pipe,
    File(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Stdout {
    #[default]
    Inherit,
    Pipe,
    File(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Stderr {
    #[default]
    Inherit,
    File(String),
}

/// One invocation inside a pipeline.
///
/// Each stream holds a single target. Assigning a new one replaces the old,
/// so a later `>` wins over an earlier pipe and the other way around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub arguments: Vec<Argument>,
    pub stdin: Stdin,
    pub stdout: Stdout,
    pub stderr: Stderr,
    pub span: Span,
}

impl Command {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
            stdin: Stdin::Inherit,
            stdout: Stdout::Inherit,
            stderr: Stderr::Inherit,
            span,
        }
    }

    pub fn push_argument(&mut self, argument: Argument, span: Span) {
        self.arguments.push(argument);
        self.span = self.span + span;
    }

    pub fn args(&self) -> impl Iterator<Item = &str> {
        self.arguments.iter().map(Argument::as_str)
    }

    /// The argument vector handed to exec, command name first
    pub fn argv(&self) -> Vec<&str> {
        let mut argv = Vec::with_capacity(self.arguments.len() + 1);
        argv.push(self.name.as_str());
        argv.extend(self.args());
        argv
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argv_starts_with_name() {
        let mut cmd = Command::new("tr", Span::new(0, 2));
        cmd.push_argument(Argument::new("a-z", ArgumentKind::Word), Span::new(3, 6));
        cmd.push_argument(Argument::new("A Z", ArgumentKind::DoubleQuoted), Span::new(7, 12));
        assert_eq!(cmd.argv(), vec!["tr", "a-z", "A Z"]);
        assert_eq!(cmd.span, Span::new(0, 12));
    }

    #[test]
    fn later_stream_target_replaces_earlier() {
        let mut cmd = Command::new("ls", Span::default());
        cmd.stdout = Stdout::File("out.txt".into());
        cmd.stdout = Stdout::Pipe;
        assert_eq!(cmd.stdout, Stdout::Pipe);
    }
}
