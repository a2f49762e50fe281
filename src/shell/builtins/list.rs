use std::io::Write;

use crate::{
    parser::{ast::Argument, shell_error::ShellErrorKind},
    shell::Shell,
};

pub fn list(
    shell: &mut Shell,
    _: &[Argument],
    out: &mut dyn Write,
    _: &mut dyn Write,
) -> Result<(), ShellErrorKind> {
    for (name, value) in shell.variables().iter() {
        writeln!(out, "{name}: {value}")?;
    }
    out.flush()?;
    Ok(())
}
