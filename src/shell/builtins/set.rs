use std::io::Write;

use crate::{
    parser::{ast::Argument, shell_error::ShellErrorKind},
    shell::Shell,
};

/// `SET name [value]`, the value defaults to the empty string
pub fn set(
    shell: &mut Shell,
    args: &[Argument],
    _: &mut dyn Write,
    _: &mut dyn Write,
) -> Result<(), ShellErrorKind> {
    let Some(name) = args.first() else {
        return Ok(());
    };
    let value = args.get(1).map(Argument::as_str).unwrap_or_default();
    tracing::trace!(name = name.as_str(), value, "variable set");
    shell.variables_mut().set(name.as_str(), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser::ast::ArgumentKind, shell::config::Config};

    fn words(words: &[&str]) -> Vec<Argument> {
        words
            .iter()
            .map(|word| Argument::new(*word, ArgumentKind::Word))
            .collect()
    }

    #[test]
    fn set_inserts_and_overwrites() {
        let mut shell = Shell::new(Config::default());
        let (mut out, mut err) = (Vec::new(), Vec::new());
        set(&mut shell, &words(&["a", "1"]), &mut out, &mut err).unwrap();
        set(&mut shell, &words(&["a", "2"]), &mut out, &mut err).unwrap();
        assert_eq!(shell.variables().get("a"), Some("2"));
        assert!(out.is_empty() && err.is_empty());
    }

    #[test]
    fn missing_value_is_empty() {
        let mut shell = Shell::new(Config::default());
        set(&mut shell, &words(&["empty"]), &mut Vec::new(), &mut Vec::new()).unwrap();
        assert_eq!(shell.variables().get("empty"), Some(""));
    }

    #[test]
    fn no_name_does_nothing() {
        let mut shell = Shell::new(Config::default());
        set(&mut shell, &[], &mut Vec::new(), &mut Vec::new()).unwrap();
        assert!(shell.variables().is_empty());
    }
}
