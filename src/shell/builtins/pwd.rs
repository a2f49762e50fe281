use std::io::Write;

use crate::{
    parser::{ast::Argument, shell_error::ShellErrorKind},
    shell::{display_dir, Shell},
};

pub fn pwd(
    shell: &mut Shell,
    _: &[Argument],
    out: &mut dyn Write,
    _: &mut dyn Write,
) -> Result<(), ShellErrorKind> {
    let dir = std::env::current_dir()?;
    writeln!(out, "{}", display_dir(&dir, shell.home_dir().as_deref()))?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;
    use crate::shell::config::Config;

    #[test]
    #[serial]
    fn prints_working_directory() {
        let mut shell = Shell::new(Config::default());
        let mut out = Vec::new();
        pwd(&mut shell, &[], &mut out, &mut Vec::new()).unwrap();
        let cwd = std::env::current_dir().unwrap();
        let expected = display_dir(&cwd, shell.home_dir().as_deref());
        assert_eq!(String::from_utf8(out).unwrap(), format!("{expected}\n"));
    }
}
