use std::sync::Arc;

pub mod lexer;

use lexer::{
    token::{span::Span, LexErrorKind, Token, TokenType},
    Lexer,
};

pub mod ast;

use ast::{Argument, ArgumentKind, Command, Pipeline, Stderr, Stdin, Stdout};

pub mod shell_error;
pub mod source;
pub mod syntax_error;

use source::Source;
use syntax_error::{SyntaxError, SyntaxErrorKind};

use crate::shell::variables::{expand, Substitute};

pub type P<T> = Box<T>;

pub type Result<T> = std::result::Result<T, SyntaxErrorKind>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Waiting for the first command of a statement
    Command,
    /// Waiting for the command after a pipe
    PipedCommand,
    /// A command is open and collects arguments
    Argument,
}

#[derive(Debug, Clone, Copy)]
enum Redirect {
    In(Span),
    Out(Span),
    Err(Span),
}

impl Redirect {
    fn span(&self) -> Span {
        match self {
            Redirect::In(span) | Redirect::Out(span) | Redirect::Err(span) => *span,
        }
    }
}

/// Assembles the tokens of one line into pipelines, one statement at a time.
///
/// Statements are built lazily so that a `SET` run for one statement is
/// visible to substitution in the statements after it on the same line.
pub struct Parser {
    lexer: Lexer,
}

impl Parser {
    pub fn new(name: String, src: String) -> Self {
        let lexer = Lexer::new(Source::new(name, src).into());
        Self { lexer }
    }

    pub fn named_source(&self) -> Arc<Source> {
        self.lexer.named_source()
    }

    /// Returns the next non-empty statement, or `None` once the line is used up.
    ///
    /// After an error the rest of the line is discarded.
    pub fn next_statement(
        &mut self,
        vars: &impl Substitute,
    ) -> std::result::Result<Option<Pipeline>, P<SyntaxError>> {
        match self.parse_statement(vars) {
            Ok(pipeline) => Ok(pipeline),
            Err(error) => {
                self.lexer.by_ref().for_each(drop);
                Err(P::new(SyntaxError::new(error, self.named_source())))
            }
        }
    }

    fn parse_statement(&mut self, vars: &impl Substitute) -> Result<Option<Pipeline>> {
        let mut pipeline = Pipeline::new(self.named_source());
        let mut command: Option<Command> = None;
        let mut mode = Mode::Command;
        let mut redirect: Option<Redirect> = None;
        let mut pipe_span = Span::default();

        while let Some(token) = self.lexer.next() {
            if let Some(argument) = word_argument(&token, vars) {
                if let Some(pending) = redirect.take() {
                    // redirects are only accepted while a command is open
                    if let Some(command) = command.as_mut() {
                        match pending {
                            Redirect::In(_) => command.stdin = Stdin::File(argument.value),
                            Redirect::Out(_) => command.stdout = Stdout::File(argument.value),
                            Redirect::Err(_) => command.stderr = Stderr::File(argument.value),
                        }
                    }
                } else if mode == Mode::Argument {
                    if let Some(command) = command.as_mut() {
                        command.push_argument(argument, token.span);
                    }
                } else {
                    let mut next = Command::new(argument.value, token.span);
                    if mode == Mode::PipedCommand {
                        next.stdin = Stdin::Pipe;
                    }
                    command = Some(next);
                    mode = Mode::Argument;
                }
                continue;
            }

            if let Some(pending) = redirect.take() {
                return Err(SyntaxErrorKind::MissingRedirectTarget(pending.span()));
            }

            match token.token_type {
                TokenType::Word(_) | TokenType::DoubleQuoted(_) | TokenType::SingleQuoted(_) => {
                    unreachable!("word tokens are consumed above")
                }
                TokenType::Pipe => match command.take() {
                    Some(mut finished) if mode == Mode::Argument => {
                        finished.stdout = Stdout::Pipe;
                        pipeline.push(finished);
                        pipe_span = token.span;
                        mode = Mode::PipedCommand;
                    }
                    _ => return Err(SyntaxErrorKind::MissingCommand(token.span)),
                },
                TokenType::RedirectIn | TokenType::RedirectOut | TokenType::RedirectErr => {
                    if mode != Mode::Argument {
                        return Err(SyntaxErrorKind::MissingCommand(token.span));
                    }
                    redirect = Some(match token.token_type {
                        TokenType::RedirectIn => Redirect::In(token.span),
                        TokenType::RedirectOut => Redirect::Out(token.span),
                        _ => Redirect::Err(token.span),
                    });
                }
                TokenType::SemiColon | TokenType::EndOfLine => match mode {
                    Mode::PipedCommand => return Err(SyntaxErrorKind::BrokenPipe(pipe_span)),
                    // an empty statement is allowed and ignored
                    Mode::Command => continue,
                    Mode::Argument => {
                        if let Some(finished) = command.take() {
                            pipeline.push(finished);
                        }
                        tracing::debug!(commands = pipeline.len(), "statement parsed");
                        return Ok(Some(pipeline));
                    }
                },
                TokenType::Error(LexErrorKind::UnterminatedString) => {
                    return Err(SyntaxErrorKind::UnterminatedString(token.span))
                }
            }
        }

        Ok(None)
    }
}

/// Turns a word-like token into an argument, substituting unless single quoted
fn word_argument(token: &Token, vars: &impl Substitute) -> Option<Argument> {
    let text = token.text()?;
    let kind = ArgumentKind::from_token(token)?;
    let value = if kind.substitutes() {
        expand(vars, text)
    } else {
        text.to_string()
    };
    Some(Argument::new(value, kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::variables::Variables;

    fn statements(line: &str, vars: &Variables) -> Result<Vec<Vec<Command>>> {
        let mut parser = Parser::new("test".into(), line.into());
        let mut out = Vec::new();
        loop {
            match parser.next_statement(vars) {
                Ok(Some(pipeline)) => out.push(pipeline.commands().to_vec()),
                Ok(None) => return Ok(out),
                Err(e) => return Err(e.error),
            }
        }
    }

    #[test]
    fn single_command_with_arguments() {
        let parsed = statements("ls -l \"my dir\"", &Variables::new()).unwrap();
        assert_eq!(parsed.len(), 1);
        let cmd = &parsed[0][0];
        assert_eq!(cmd.argv(), vec!["ls", "-l", "my dir"]);
        assert_eq!(cmd.arguments[1].kind, ArgumentKind::DoubleQuoted);
        assert_eq!(cmd.stdin, Stdin::Inherit);
        assert_eq!(cmd.stdout, Stdout::Inherit);
    }

    #[test]
    fn pipes_connect_neighbours() {
        let parsed = statements("cat f | grep x | wc -l", &Variables::new()).unwrap();
        let cmds = &parsed[0];
        assert_eq!(cmds.len(), 3);
        assert_eq!(cmds[0].stdin, Stdin::Inherit);
        assert_eq!(cmds[0].stdout, Stdout::Pipe);
        assert_eq!(cmds[1].stdin, Stdin::Pipe);
        assert_eq!(cmds[1].stdout, Stdout::Pipe);
        assert_eq!(cmds[2].stdin, Stdin::Pipe);
        assert_eq!(cmds[2].stdout, Stdout::Inherit);
    }

    #[test]
    fn redirect_targets_are_not_arguments() {
        let parsed =
            statements("sort < in.txt > out.txt >& err.txt -r", &Variables::new()).unwrap();
        let cmd = &parsed[0][0];
        assert_eq!(cmd.argv(), vec!["sort", "-r"]);
        assert_eq!(cmd.stdin, Stdin::File("in.txt".into()));
        assert_eq!(cmd.stdout, Stdout::File("out.txt".into()));
        assert_eq!(cmd.stderr, Stderr::File("err.txt".into()));
    }

    #[test]
    fn last_stream_target_wins() {
        let parsed = statements("ls > out.txt | wc; cat f | sort < in.txt", &Variables::new())
            .unwrap();
        assert_eq!(parsed[0][0].stdout, Stdout::Pipe);
        assert_eq!(parsed[1][1].stdin, Stdin::File("in.txt".into()));
    }

    #[test]
    fn statements_split_on_semicolon() {
        let parsed = statements("SET a hi;; LIST", &Variables::new()).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0][0].argv(), vec!["SET", "a", "hi"]);
        assert_eq!(parsed[1][0].name, "LIST");
    }

    #[test]
    fn substitution_skips_single_quotes() {
        let mut vars = Variables::new();
        vars.set("a", "hi");
        let parsed = statements("echo $a$ \"<$a$>\" '$a$' > $a$.txt", &vars).unwrap();
        let cmd = &parsed[0][0];
        assert_eq!(cmd.argv(), vec!["echo", "hi", "<hi>", "$a$"]);
        assert_eq!(cmd.stdout, Stdout::File("hi.txt".into()));
    }

    #[test]
    fn empty_lines_build_nothing() {
        assert!(statements("", &Variables::new()).unwrap().is_empty());
        assert!(statements(" ; ;", &Variables::new()).unwrap().is_empty());
        assert!(statements("# only a comment", &Variables::new())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn pipe_without_command() {
        assert!(matches!(
            statements("| wc", &Variables::new()),
            Err(SyntaxErrorKind::MissingCommand(_))
        ));
        assert!(matches!(
            statements("ls | | wc", &Variables::new()),
            Err(SyntaxErrorKind::MissingCommand(_))
        ));
        assert!(matches!(
            statements("> out.txt", &Variables::new()),
            Err(SyntaxErrorKind::MissingCommand(_))
        ));
    }

    #[test]
    fn dangling_pipe_is_broken() {
        assert!(matches!(
            statements("ls |", &Variables::new()),
            Err(SyntaxErrorKind::BrokenPipe(_))
        ));
        assert!(matches!(
            statements("ls | ; wc", &Variables::new()),
            Err(SyntaxErrorKind::BrokenPipe(_))
        ));
    }

    #[test]
    fn redirect_needs_a_target() {
        assert!(matches!(
            statements("ls >", &Variables::new()),
            Err(SyntaxErrorKind::MissingRedirectTarget(_))
        ));
        assert!(matches!(
            statements("ls > | wc", &Variables::new()),
            Err(SyntaxErrorKind::MissingRedirectTarget(_))
        ));
    }

    #[test]
    fn unterminated_quote_aborts_the_line() {
        let mut parser = Parser::new("test".into(), "echo \"abc".into());
        let err = parser.next_statement(&Variables::new()).unwrap_err();
        assert!(matches!(err.error, SyntaxErrorKind::UnterminatedString(_)));
        assert!(parser.next_statement(&Variables::new()).unwrap().is_none());
    }

    #[test]
    fn error_discards_rest_of_line() {
        let mut parser = Parser::new("test".into(), "ls | ; echo after".into());
        assert!(parser.next_statement(&Variables::new()).is_err());
        assert!(parser.next_statement(&Variables::new()).unwrap().is_none());
    }

    #[test]
    fn earlier_statements_survive_a_later_error() {
        let mut parser = Parser::new("test".into(), "echo ok; echo \"abc".into());
        let first = parser.next_statement(&Variables::new()).unwrap().unwrap();
        assert_eq!(first.commands()[0].argv(), vec!["echo", "ok"]);
        assert!(parser.next_statement(&Variables::new()).is_err());
    }
}
