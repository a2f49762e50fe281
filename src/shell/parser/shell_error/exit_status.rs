use std::fmt;

use nix::sys::wait::WaitStatus;

/// The outcome of a finished pipeline, as reported to `STATUS` and `$?`-like consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Exited(i32),
    Signaled(i32),
    /// The last command was a builtin, which has no numeric outcome of its own
    Builtin,
}

impl ExitStatus {
    pub const SUCCESS: ExitStatus = ExitStatus::Exited(0);

    pub fn code(&self) -> i32 {
        match self {
            ExitStatus::Exited(code) => *code,
            ExitStatus::Signaled(signal) => 128 + *signal,
            ExitStatus::Builtin => 0,
        }
    }

    pub fn success(&self) -> bool {
        self.code() == 0
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

pub trait ExitStatusExt {
    /// `None` while the child has not terminated
    fn exit_status(&self) -> Option<ExitStatus>;
}

impl ExitStatusExt for WaitStatus {
    fn exit_status(&self) -> Option<ExitStatus> {
        match self {
            WaitStatus::Exited(_, code) => Some(ExitStatus::Exited(*code)),
            WaitStatus::Signaled(_, signal, _) => Some(ExitStatus::Signaled(*signal as i32)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use nix::{sys::signal::Signal, unistd::Pid};

    use super::*;

    #[test]
    fn signal_maps_above_128() {
        let status = WaitStatus::Signaled(Pid::from_raw(1), Signal::SIGPIPE, false);
        assert_eq!(status.exit_status().unwrap().code(), 141);
    }

    #[test]
    fn builtin_counts_as_success() {
        assert!(ExitStatus::Builtin.success());
        assert_eq!(ExitStatus::Exited(3).to_string(), "3");
        assert_eq!(WaitStatus::StillAlive.exit_status(), None);
    }
}
