use std::{
    ffi::CString,
    fs::File,
    io::{self, Write},
    os::fd::OwnedFd,
};

use miette::Report;
use nix::{
    errno::Errno,
    libc,
    sys::{
        signal::{signal, SigHandler, Signal},
        wait::wait,
    },
    unistd::{self, execvp, fork, ForkResult, Pid},
};

use super::{
    builtins::{self, BuiltinFn},
    stream::{self, Descriptor, Stdio, StdioGuard},
    Shell,
};
use crate::parser::{
    ast::{Command, Pipeline, Stdout},
    shell_error::{
        exit_status::{ExitStatus, ExitStatusExt},
        ShellError, ShellErrorKind,
    },
};

/// Exit code of a child whose program could not be found
const EXIT_NOT_FOUND: i32 = 127;
/// Exit code of a child whose program could not be executed
const EXIT_NOT_EXECUTABLE: i32 = 126;
/// Status of a last command that was never launched
const EXIT_SKIPPED: i32 = 1;

/// What became of the last command in the pipeline
enum Last {
    Skipped,
    Builtin,
    Child(Pid),
}

/// Runs every command of `pipeline` and waits for the children it spawned.
///
/// Commands are launched left to right. A command whose redirect cannot be
/// opened is reported and skipped while the rest of the pipeline still runs.
/// `EXIT` stops any further launches; the children already running are reaped
/// before the exit unwinds as an error.
pub fn run_pipeline(shell: &mut Shell, pipeline: &Pipeline) -> Result<ExitStatus, ShellError> {
    if pipeline.is_empty() {
        return Ok(ExitStatus::SUCCESS);
    }

    let mut children = Vec::with_capacity(pipeline.len());
    let mut last = Last::Skipped;
    let mut upstream: Option<OwnedFd> = None;
    let mut interrupted: Option<ShellError> = None;

    for (index, command) in pipeline.commands().iter().enumerate() {
        let is_last = index + 1 == pipeline.len();

        let (next_upstream, downstream) = if command.stdout == Stdout::Pipe && !is_last {
            match stream::pipe() {
                Ok((read, write)) => (Some(read), Some(write)),
                Err(err) => {
                    interrupted = Some(error_at(pipeline, command, err));
                    break;
                }
            }
        } else {
            (None, None)
        };

        let stdio = match Stdio::resolve(command, upstream.take(), downstream) {
            Ok(stdio) => stdio,
            Err((err, stderr)) => {
                tracing::warn!(command = %command.name, %err, "redirection failed");
                report_to(pipeline, command, err, stderr);
                upstream = next_upstream;
                if is_last {
                    last = Last::Skipped;
                }
                continue;
            }
        };
        upstream = next_upstream;

        if let Some(builtin) = builtins::get_builtin(&command.name) {
            if is_last {
                last = Last::Builtin;
            }
            if let Err(code) = run_builtin(shell, builtin, pipeline, command, &stdio) {
                interrupted = Some(error_at(pipeline, command, ShellErrorKind::Exit(code)));
                break;
            }
            continue;
        }

        match spawn(command, &stdio) {
            Ok(pid) => {
                children.push(pid);
                if is_last {
                    last = Last::Child(pid);
                }
            }
            Err(err) => {
                interrupted = Some(error_at(pipeline, command, err));
                break;
            }
        }
        // the parent's copies of the child's pipe ends and files close here
        drop(stdio);
    }
    // an early break can leave the read end of the last pipe behind
    drop(upstream);

    let reaped = reap(&children);

    if let Some(err) = interrupted {
        return Err(err);
    }

    let status = match last {
        Last::Builtin => ExitStatus::Builtin,
        Last::Skipped => ExitStatus::Exited(EXIT_SKIPPED),
        Last::Child(pid) => reaped
            .iter()
            .find(|(reaped_pid, _)| *reaped_pid == pid)
            .map(|(_, status)| *status)
            .unwrap_or(ExitStatus::Exited(EXIT_SKIPPED)),
    };

    if shell.report_status() {
        let _ = writeln!(io::stderr(), ">> Done: Exit {}", status.code());
    }

    Ok(status)
}

fn error_at(pipeline: &Pipeline, command: &Command, error: ShellErrorKind) -> ShellError {
    ShellError::new(error, pipeline.src().clone()).with_span(command.span)
}

fn report(pipeline: &Pipeline, command: &Command, error: ShellErrorKind, out: &mut dyn Write) {
    let report = Report::new(error_at(pipeline, command, error));
    let _ = writeln!(out, "{report:?}");
}

fn report_to(pipeline: &Pipeline, command: &Command, error: ShellErrorKind, stderr: Descriptor) {
    match stderr {
        Descriptor::Owned(fd) => report(pipeline, command, error, &mut File::from(fd)),
        Descriptor::Inherit => report(pipeline, command, error, &mut io::stderr()),
    }
}

/// Runs a builtin in-process with the standard streams bound to `stdio`.
///
/// Errors are reported on the builtin's own stderr. `Err` carries the code of
/// an `EXIT`.
fn run_builtin(
    shell: &mut Shell,
    builtin: BuiltinFn,
    pipeline: &Pipeline,
    command: &Command,
    stdio: &Stdio,
) -> Result<(), i32> {
    tracing::debug!(command = %command.name, "running builtin");
    let _guard = match StdioGuard::redirect(stdio) {
        Ok(guard) => guard,
        Err(err) => {
            report(pipeline, command, err, &mut io::stderr());
            return Ok(());
        }
    };

    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    match builtin(shell, &command.arguments, &mut stdout, &mut stderr) {
        Ok(()) => Ok(()),
        Err(ShellErrorKind::Exit(code)) => Err(code),
        Err(err) => {
            report(pipeline, command, err, &mut stderr);
            Ok(())
        }
    }
}

/// Forks and execs `command` with its streams bound to `stdio`.
///
/// Everything the child needs is allocated before the fork. The child only
/// rebinds descriptors, execs and on failure writes a prepared message.
fn spawn(command: &Command, stdio: &Stdio) -> Result<Pid, ShellErrorKind> {
    let argv = command
        .argv()
        .into_iter()
        .map(CString::new)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| {
            ShellErrorKind::Basic(
                "Command Error",
                format!("Arguments of '{}' contain a NUL byte", command.name),
            )
        })?;
    let not_found = format!("{}\n", ShellErrorKind::CommandNotFound(command.name.clone()));
    let denied = format!(
        "{}\n",
        ShellErrorKind::CommandPermissionDenied(command.name.clone())
    );

    let _ = io::stdout().flush();
    let _ = io::stderr().flush();

    // SAFETY: the child only calls async-signal-safe functions before exec or _exit
    match unsafe { fork() }? {
        ForkResult::Parent { child } => {
            tracing::debug!(pid = child.as_raw(), command = %command.name, "child spawned");
            Ok(child)
        }
        ForkResult::Child => {
            // the shell ignores both, an ignored disposition would survive exec
            for signo in [Signal::SIGINT, Signal::SIGPIPE] {
                // SAFETY: restoring the default disposition is async-signal-safe
                let _ = unsafe { signal(signo, SigHandler::SigDfl) };
            }
            if stdio.install().is_err() {
                // SAFETY: _exit skips the parent's atexit handlers and buffers
                unsafe { libc::_exit(EXIT_NOT_EXECUTABLE) };
            }

            let (message, code) = match exec_argv(&argv) {
                Errno::EACCES | Errno::EPERM | Errno::ENOEXEC | Errno::EISDIR => {
                    (denied, EXIT_NOT_EXECUTABLE)
                }
                _ => (not_found, EXIT_NOT_FOUND),
            };
            let _ = unistd::write(io::stderr(), message.as_bytes());
            // SAFETY: see above
            unsafe { libc::_exit(code) }
        }
    }
}

/// Replaces the process image, returning only the reason it failed
fn exec_argv(argv: &[CString]) -> Errno {
    match execvp(&argv[0], argv) {
        Ok(never) => match never {},
        Err(errno) => errno,
    }
}

/// Waits until every pid in `children` has terminated.
///
/// Each `wait` result is matched back to its pid, whatever order the children
/// finish in.
fn reap(children: &[Pid]) -> Vec<(Pid, ExitStatus)> {
    let mut pending = children.to_vec();
    let mut reaped = Vec::with_capacity(children.len());

    while !pending.is_empty() {
        match wait() {
            Ok(status) => {
                let (Some(pid), Some(exit)) = (status.pid(), status.exit_status()) else {
                    continue;
                };
                match pending.iter().position(|child| *child == pid) {
                    Some(index) => {
                        pending.swap_remove(index);
                        tracing::debug!(pid = pid.as_raw(), status = exit.code(), "child reaped");
                        reaped.push((pid, exit));
                    }
                    None => tracing::warn!(pid = pid.as_raw(), "reaped a child from no pipeline"),
                }
            }
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => {
                tracing::warn!(missing = pending.len(), "children vanished before being reaped");
                break;
            }
            Err(err) => {
                tracing::error!(%err, "wait failed");
                break;
            }
        }
    }

    reaped
}
