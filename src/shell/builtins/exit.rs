use std::io::Write;

use crate::{
    parser::{ast::Argument, shell_error::ShellErrorKind},
    shell::Shell,
};

/// `EXIT [code]` unwinds the running pipeline and ends the shell
pub fn exit(
    _: &mut Shell,
    args: &[Argument],
    _: &mut dyn Write,
    _: &mut dyn Write,
) -> Result<(), ShellErrorKind> {
    let code = args.first().map(|arg| parse_code(arg.as_str())).unwrap_or(0);
    Err(ShellErrorKind::Exit(code))
}

/// Reads the leading integer of `text` the way `atoi` does.
///
/// Leading whitespace and one sign are accepted, parsing stops at the first
/// non-digit and text without digits is 0. Overflow wraps.
fn parse_code(text: &str) -> i32 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i32, |acc, digit| {
            acc.wrapping_mul(10).wrapping_add(i32::from(digit - b'0'))
        });
    if negative {
        magnitude.wrapping_neg()
    } else {
        magnitude
    }
}
