use std::sync::Arc;

use crate::{
    parser::{shell_error::ShellError, source::Source},
    shell::{exec, Shell},
};

pub mod command;
pub use command::{Argument, ArgumentKind, Command, Stderr, Stdin, Stdout};

use super::shell_error::exit_status::ExitStatus;

/// An ordered chain of commands joined by pipes.
///
/// Built for a single statement, executed once and then dropped.
#[derive(Debug)]
pub struct Pipeline {
    commands: Vec<Command>,
    src: Arc<Source>,
}

impl Pipeline {
    pub fn new(src: Arc<Source>) -> Self {
        Self {
            commands: Vec::new(),
            src,
        }
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn src(&self) -> &Arc<Source> {
        &self.src
    }

    pub fn eval(self, shell: &mut Shell) -> Result<ExitStatus, ShellError> {
        exec::run_pipeline(shell, &self)
    }
}
