use std::io::Write;

use phf::*;

use super::Shell;
use crate::parser::{ast::Argument, shell_error::ShellErrorKind};

mod cd;
mod exit;
mod list;
mod pwd;
mod set;
mod status;

/// An in-process command.
///
/// Handlers write to the two streams they are given, which the engine binds
/// to whatever the pipeline wiring resolved for the command.
pub type BuiltinFn =
    fn(&mut Shell, &[Argument], &mut dyn Write, &mut dyn Write) -> Result<(), ShellErrorKind>;

static BUILTINS: phf::Map<&'static str, BuiltinFn> = phf_map! {
    "SET" => set::set,
    "LIST" => list::list,
    "EXIT" => exit::exit,
    "STATUS" => status::status,
    "CD" => cd::cd,
    "PWD" => pwd::pwd,
};

/// Looks up a builtin, ignoring case
pub fn get_builtin(command: &str) -> Option<BuiltinFn> {
    BUILTINS.get(command.to_ascii_uppercase().as_str()).copied()
}

#[cfg(test)]
pub fn get_builtins() -> Vec<&'static str> {
    let mut names: Vec<_> = BUILTINS.keys().copied().collect();
    names.sort_unstable();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        assert!(get_builtin("set").is_some());
        assert!(get_builtin("Pwd").is_some());
        assert!(get_builtin("STATUS").is_some());
        assert!(get_builtin("ls").is_none());
    }

    #[test]
    fn builtin_table() {
        assert_eq!(
            get_builtins(),
            vec!["CD", "EXIT", "LIST", "PWD", "SET", "STATUS"]
        );
    }
}
