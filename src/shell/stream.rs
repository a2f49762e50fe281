use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    os::fd::{AsFd, AsRawFd, OwnedFd, RawFd},
};

use nix::{
    fcntl::{fcntl, FcntlArg, FdFlag},
    libc::{STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO},
    unistd::{self, dup2},
};

use crate::parser::{
    ast::{Command, Stderr, Stdin, Stdout},
    shell_error::{file_err_to_shell_err, ShellErrorKind},
};

/// Where one standard stream of a command is bound once resolved
#[derive(Debug, Default)]
pub enum Descriptor {
    #[default]
    Inherit,
    Owned(OwnedFd),
}

impl Descriptor {
    #[cfg(test)]
    pub fn is_inherit(&self) -> bool {
        matches!(self, Descriptor::Inherit)
    }
}

impl From<File> for Descriptor {
    fn from(file: File) -> Self {
        Descriptor::Owned(file.into())
    }
}

impl From<OwnedFd> for Descriptor {
    fn from(fd: OwnedFd) -> Self {
        Descriptor::Owned(fd)
    }
}

/// Creates a pipe whose ends are not inherited across exec.
///
/// Only the copies placed on 0/1/2 in a child survive its exec.
pub fn pipe() -> Result<(OwnedFd, OwnedFd), ShellErrorKind> {
    let (read, write) = unistd::pipe()?;
    for fd in [&read, &write] {
        fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    }
    tracing::trace!(read = read.as_raw_fd(), write = write.as_raw_fd(), "pipe created");
    Ok((read, write))
}

pub fn open_input(path: &str) -> Result<Descriptor, ShellErrorKind> {
    File::open(path)
        .map(Descriptor::from)
        .map_err(|err| file_err_to_shell_err(err, path))
}

/// Opens a redirect target for writing, creating it or truncating it
pub fn open_output(path: &str) -> Result<Descriptor, ShellErrorKind> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map(Descriptor::from)
        .map_err(|err| file_err_to_shell_err(err, path))
}

/// The three resolved standard streams of one command.
///
/// Dropping it closes the parent's copies of every pipe end and file it holds.
#[derive(Debug, Default)]
pub struct Stdio {
    pub stdin: Descriptor,
    pub stdout: Descriptor,
    pub stderr: Descriptor,
}

impl Stdio {
    /// Resolves the streams of `command`.
    ///
    /// `upstream` is the read end of the pipe from the previous command and
    /// `downstream` the write end of the pipe to the next one. Whichever of
    /// them the command does not use is closed when the returned value (or
    /// the error path) drops it. stderr is resolved first so that a failure
    /// on the other streams can still be reported where the command's errors go.
    pub fn resolve(
        command: &Command,
        upstream: Option<OwnedFd>,
        downstream: Option<OwnedFd>,
    ) -> Result<Stdio, (ShellErrorKind, Descriptor)> {
        let stderr = match &command.stderr {
            Stderr::Inherit => Descriptor::Inherit,
            Stderr::File(path) => open_output(path).map_err(|err| (err, Descriptor::Inherit))?,
        };

        let stdin = match (&command.stdin, upstream) {
            (Stdin::File(path), _) => match open_input(path) {
                Ok(descriptor) => descriptor,
                Err(err) => return Err((err, stderr)),
            },
            (Stdin::Pipe, Some(read)) => Descriptor::Owned(read),
            _ => Descriptor::Inherit,
        };

        let stdout = match (&command.stdout, downstream) {
            (Stdout::File(path), _) => match open_output(path) {
                Ok(descriptor) => descriptor,
                Err(err) => return Err((err, stderr)),
            },
            (Stdout::Pipe, Some(write)) => Descriptor::Owned(write),
            _ => Descriptor::Inherit,
        };

        Ok(Stdio {
            stdin,
            stdout,
            stderr,
        })
    }

    fn bindings(&self) -> [(&Descriptor, RawFd); 3] {
        [
            (&self.stdin, STDIN_FILENO),
            (&self.stdout, STDOUT_FILENO),
            (&self.stderr, STDERR_FILENO),
        ]
    }

    /// Places the resolved descriptors on 0/1/2 of the current process.
    ///
    /// Meant for a freshly forked child: the originals are close-on-exec and
    /// vanish with the exec that follows.
    pub fn install(&self) -> nix::Result<()> {
        for (descriptor, target) in self.bindings() {
            let Descriptor::Owned(fd) = descriptor else {
                continue;
            };
            if fd.as_raw_fd() == target {
                fcntl(target, FcntlArg::F_SETFD(FdFlag::empty()))?;
            } else {
                dup2(fd.as_raw_fd(), target)?;
            }
        }
        Ok(())
    }
}

/// Temporarily rebinds the process's own standard streams.
///
/// Builtins run in-process, so the engine brackets them with this guard to
/// make their output land wherever the pipeline wiring points. The original
/// descriptors come back when the guard drops, on every exit path.
pub struct StdioGuard {
    saved: Vec<(RawFd, OwnedFd)>,
}

impl StdioGuard {
    pub fn redirect(stdio: &Stdio) -> Result<StdioGuard, ShellErrorKind> {
        flush_std();
        let mut guard = StdioGuard { saved: Vec::new() };
        for (descriptor, target) in stdio.bindings() {
            let Descriptor::Owned(fd) = descriptor else {
                continue;
            };
            let saved = saved_copy(target).map_err(|err| ShellErrorKind::Io(None, err))?;
            guard.saved.push((target, saved));
            dup2(fd.as_raw_fd(), target)?;
        }
        Ok(guard)
    }
}

impl Drop for StdioGuard {
    fn drop(&mut self) {
        flush_std();
        while let Some((target, saved)) = self.saved.pop() {
            if let Err(err) = dup2(saved.as_raw_fd(), target) {
                tracing::error!(fd = target, %err, "failed to restore standard stream");
            }
        }
    }
}

fn saved_copy(target: RawFd) -> io::Result<OwnedFd> {
    match target {
        STDIN_FILENO => io::stdin().as_fd().try_clone_to_owned(),
        STDOUT_FILENO => io::stdout().as_fd().try_clone_to_owned(),
        _ => io::stderr().as_fd().try_clone_to_owned(),
    }
}

fn flush_std() {
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
}

#[cfg(test)]
mod tests {
    use std::{fs, io::Read};

    use serial_test::serial;

    use super::*;
    use crate::parser::lexer::token::span::Span;

    #[test]
    fn missing_input_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nofile.txt");
        let err = open_input(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ShellErrorKind::FileNotFound(_)));
    }

    #[test]
    fn output_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        fs::write(&path, "old content that is long").unwrap();
        let Descriptor::Owned(fd) = open_output(path.to_str().unwrap()).unwrap() else {
            panic!("expected an owned descriptor");
        };
        let mut file = File::from(fd);
        file.write_all(b"new").unwrap();
        drop(file);
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    #[serial]
    fn pipe_ends_are_close_on_exec() {
        let (read, write) = pipe().unwrap();
        for fd in [&read, &write] {
            let flags = fcntl(fd.as_raw_fd(), FcntlArg::F_GETFD).unwrap();
            assert!(FdFlag::from_bits_truncate(flags).contains(FdFlag::FD_CLOEXEC));
        }
    }

    #[test]
    #[serial]
    fn unused_pipe_ends_are_dropped() {
        let (read, write) = pipe().unwrap();
        let mut command = Command::new("cat", Span::default());
        command.stdin = Stdin::Pipe;
        let stdio = Stdio::resolve(&command, Some(read), Some(write)).unwrap();
        assert!(!stdio.stdin.is_inherit());
        // stdout stayed inherited so the write end was closed already
        assert!(stdio.stdout.is_inherit());
    }

    #[test]
    fn failed_input_keeps_resolved_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let mut command = Command::new("cat", Span::default());
        command.stdin = Stdin::File(dir.path().join("nofile.txt").to_string_lossy().into());
        command.stderr = Stderr::File(dir.path().join("err.txt").to_string_lossy().into());
        let (err, stderr) = Stdio::resolve(&command, None, None).unwrap_err();
        assert!(matches!(err, ShellErrorKind::FileNotFound(_)));
        assert!(!stderr.is_inherit());
    }

    #[test]
    #[serial]
    fn guard_restores_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guarded.txt");
        let stdio = Stdio {
            stderr: open_output(path.to_str().unwrap()).unwrap(),
            ..Default::default()
        };
        let before = io::stderr().as_fd().try_clone_to_owned().unwrap();
        {
            let _guard = StdioGuard::redirect(&stdio).unwrap();
            write!(io::stderr(), "inside").unwrap();
        }
        drop(stdio);
        // fd 2 points back at the original stream, not at the file
        let after = nix::sys::stat::fstat(STDERR_FILENO).unwrap();
        let original = nix::sys::stat::fstat(before.as_raw_fd()).unwrap();
        assert_eq!((after.st_dev, after.st_ino), (original.st_dev, original.st_ino));
        let mut contents = String::new();
        File::open(&path)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "inside");
    }
}
