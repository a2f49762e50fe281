pub mod span;

use span::Span;

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub span: Span,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub enum TokenType {
    /// A run of characters up to whitespace or an operator
    Word(String),
    /// "text", eligible for variable substitution
    DoubleQuoted(String),
    /// 'text', taken literally
    SingleQuoted(String),
    /// |
    Pipe,
    /// ;
    SemiColon,
    /// <
    RedirectIn,
    /// >
    RedirectOut,
    /// >&
    RedirectErr,
    EndOfLine,
    Error(LexErrorKind),
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum LexErrorKind {
    UnterminatedString,
}

impl Token {
    #[inline(always)]
    pub fn new(token_type: TokenType, span: Span) -> Self {
        Self { token_type, span }
    }

    /// Returns the text carried by word-like tokens
    pub fn text(&self) -> Option<&str> {
        match &self.token_type {
            TokenType::Word(text) | TokenType::DoubleQuoted(text) | TokenType::SingleQuoted(text) => {
                Some(text)
            }
            _ => None,
        }
    }
}
