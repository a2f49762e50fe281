use std::io::Write;

use crate::{
    parser::{ast::Argument, shell_error::ShellErrorKind},
    shell::Shell,
};

/// `STATUS [ON|OFF]`, toggles pipeline status reporting without an argument
pub fn status(
    shell: &mut Shell,
    args: &[Argument],
    _: &mut dyn Write,
    _: &mut dyn Write,
) -> Result<(), ShellErrorKind> {
    let report = match args.first().map(Argument::as_str) {
        None => !shell.report_status(),
        Some(arg) if arg.eq_ignore_ascii_case("on") => true,
        Some(arg) if arg.eq_ignore_ascii_case("off") => false,
        Some(_) => return Ok(()),
    };
    shell.set_report_status(report);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser::ast::ArgumentKind, shell::config::Config};

    fn run(shell: &mut Shell, args: &[&str]) {
        let args: Vec<_> = args
            .iter()
            .map(|arg| Argument::new(*arg, ArgumentKind::Word))
            .collect();
        status(shell, &args, &mut Vec::new(), &mut Vec::new()).unwrap();
    }

    #[test]
    fn toggle_and_set() {
        let mut shell = Shell::new(Config::default());
        assert!(!shell.report_status());
        run(&mut shell, &["ON"]);
        assert!(shell.report_status());
        run(&mut shell, &["on"]);
        assert!(shell.report_status());
        run(&mut shell, &[]);
        assert!(!shell.report_status());
        run(&mut shell, &[]);
        assert!(shell.report_status());
        run(&mut shell, &["OFF"]);
        assert!(!shell.report_status());
    }

    #[test]
    fn unknown_argument_is_ignored() {
        let mut shell = Shell::new(Config::default());
        run(&mut shell, &["maybe"]);
        assert!(!shell.report_status());
    }
}
