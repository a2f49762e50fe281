use std::{
    env, fs,
    ops::ControlFlow,
    path::{Path, PathBuf},
};

use miette::Report;
use nix::sys::signal::{signal, SigHandler, Signal};
use rustyline::{error::ReadlineError, DefaultEditor};

pub mod builtins;
pub mod config;
pub mod exec;
pub mod parser;
pub mod stream;
pub mod variables;

use config::Config;
use parser::{
    shell_error::{exit_status::ExitStatus, file_err_to_shell_err, ShellErrorKind},
    Parser,
};
use variables::Variables;

/// Longest input line accepted, longer lines are cut
pub const MAX_LINE_LENGTH: usize = 500;

/// Cuts `line` to at most `MAX_LINE_LENGTH` bytes without splitting a char
pub fn truncate_line(line: &str) -> &str {
    if line.len() <= MAX_LINE_LENGTH {
        return line;
    }
    let mut end = MAX_LINE_LENGTH;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

/// Renders `dir` with a leading `home` shortened to `~`
pub fn display_dir(dir: &Path, home: Option<&Path>) -> String {
    match home.and_then(|home| dir.strip_prefix(home).ok()) {
        Some(rest) if rest.as_os_str().is_empty() => String::from("~"),
        Some(rest) => format!("~/{}", rest.to_string_lossy()),
        None => dir.to_string_lossy().into_owned(),
    }
}

pub struct Shell {
    variables: Variables,
    report_status: bool,
    /// Working directory as shown in the prompt
    dir: String,
    status: ExitStatus,
    config: Config,
}

impl Shell {
    pub fn new(config: Config) -> Self {
        let mut shell = Shell {
            variables: Variables::new(),
            report_status: config.report_status,
            dir: String::new(),
            status: ExitStatus::SUCCESS,
            config,
        };
        shell.refresh_dir();
        shell
    }

    /// Reads and runs lines from the terminal until `EXIT` or end of input
    pub fn run(&mut self) -> i32 {
        let mut editor = match DefaultEditor::new() {
            Ok(editor) => editor,
            Err(err) => {
                eprintln!("{:?}", Report::msg(format!("cannot start line editor: {err}")));
                return 1;
            }
        };

        // a running pipeline still gets Ctrl-C, the shell itself keeps going
        // SAFETY: no handler function is installed
        if let Err(err) = unsafe { signal(Signal::SIGINT, SigHandler::SigIgn) } {
            tracing::warn!(%err, "cannot ignore SIGINT");
        }

        let history = self.config.history_path();
        if let Some(path) = &history {
            if let Err(err) = editor.load_history(path) {
                tracing::debug!(path = %path.display(), %err, "no history loaded");
            }
        }

        let code = loop {
            match editor.readline(&self.prompt()) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = editor.add_history_entry(line.as_str());
                    }
                    if let ControlFlow::Break(code) = self.run_src(String::from("shell"), line) {
                        break code;
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break 0,
                Err(err) => {
                    eprintln!("{:?}", Report::msg(format!("cannot read line: {err}")));
                    break 1;
                }
            }
        };

        if let Some(path) = &history {
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            if let Err(err) = editor.save_history(path) {
                tracing::warn!(path = %path.display(), %err, "cannot save history");
            }
        }

        code
    }

    /// Runs every line of the file at `path`
    pub fn run_script(&mut self, path: &Path) -> Result<i32, ShellErrorKind> {
        let name = path.to_string_lossy();
        let script = fs::read_to_string(path).map_err(|err| file_err_to_shell_err(err, &name))?;

        for (number, line) in script.lines().enumerate() {
            let source = format!("{}:{}", name, number + 1);
            if let ControlFlow::Break(code) = self.run_src(source, line.to_string()) {
                return Ok(code);
            }
        }
        Ok(0)
    }

    /// Parses and runs one input line statement by statement.
    ///
    /// Errors are reported and the shell keeps going. `Break` carries the code
    /// of an `EXIT`.
    pub fn run_src(&mut self, name: String, mut src: String) -> ControlFlow<i32> {
        let length = truncate_line(&src).len();
        src.truncate(length);

        let mut parser = Parser::new(name, src);
        loop {
            let pipeline = match parser.next_statement(&self.variables) {
                Ok(Some(pipeline)) => pipeline,
                Ok(None) => break,
                Err(error) => {
                    eprintln!("{:?}", Report::new(*error));
                    break;
                }
            };

            match pipeline.eval(self) {
                Ok(status) => self.status = status,
                Err(error) => {
                    if let ShellErrorKind::Exit(code) = error.error {
                        return ControlFlow::Break(code);
                    }
                    eprintln!("{:?}", Report::new(error));
                }
            }
        }
        ControlFlow::Continue(())
    }

    fn prompt(&self) -> String {
        format!("{}$$ ", self.dir())
    }

    pub fn status(&self) -> i32 {
        self.status.code()
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn variables_mut(&mut self) -> &mut Variables {
        &mut self.variables
    }

    pub fn report_status(&self) -> bool {
        self.report_status
    }

    pub fn set_report_status(&mut self, report_status: bool) {
        self.report_status = report_status;
    }

    pub fn home_dir(&self) -> Option<PathBuf> {
        env::var_os("HOME")
            .filter(|home| !home.is_empty())
            .map(PathBuf::from)
    }

    pub fn dir(&self) -> &str {
        &self.dir
    }

    /// Recomputes the prompt directory after the working directory changed
    pub fn refresh_dir(&mut self) {
        self.dir = match env::current_dir() {
            Ok(dir) => display_dir(&dir, self.home_dir().as_deref()),
            Err(err) => {
                tracing::warn!(%err, "working directory is unreadable");
                String::from("?")
            }
        };
    }
}
