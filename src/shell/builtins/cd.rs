use std::{io::Write, path::PathBuf};

use crate::{
    parser::{
        ast::Argument,
        shell_error::{file_err_to_shell_err, ShellErrorKind},
    },
    shell::Shell,
};

/// `CD [path]`, defaults to `HOME` and then to `/`
pub fn cd(
    shell: &mut Shell,
    args: &[Argument],
    _: &mut dyn Write,
    _: &mut dyn Write,
) -> Result<(), ShellErrorKind> {
    let dir = match args.first() {
        Some(arg) => PathBuf::from(arg.as_str()),
        None => shell.home_dir().unwrap_or_else(|| PathBuf::from("/")),
    };

    let name = dir.to_string_lossy().into_owned();
    std::env::set_current_dir(&dir).map_err(|err| match file_err_to_shell_err(err, &name) {
        ShellErrorKind::FileNotFound(name) => ShellErrorKind::DirectoryNotFound(name),
        err => err,
    })?;
    tracing::debug!(dir = %dir.display(), "working directory changed");
    shell.refresh_dir();
    Ok(())
}
