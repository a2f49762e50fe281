pub mod token;

use std::sync::Arc;

use memchr::memchr;
use token::{span::Span, LexErrorKind, Token, TokenType};

use super::source::Source;

const OPERATORS: &[u8] = b"|;<>";

#[inline(always)]
fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\r')
}

/// Splits one input line into tokens.
///
/// The stream always ends with exactly one `EndOfLine` or `Error` token and
/// is exhausted afterwards.
pub struct Lexer {
    src: Arc<Source>,
    index: usize,
    done: bool,
}

impl Lexer {
    pub fn new(src: Arc<Source>) -> Self {
        Self {
            src,
            index: 0,
            done: false,
        }
    }

    pub fn named_source(&self) -> Arc<Source> {
        self.src.clone()
    }

    #[inline(always)]
    pub fn src(&self) -> &str {
        &self.src.code
    }

    #[inline(always)]
    fn current(&self) -> Option<u8> {
        self.src.code.as_bytes().get(self.index).copied()
    }

    #[inline(always)]
    fn peek(&self, offset: usize) -> Option<u8> {
        self.src.code.as_bytes().get(self.index + offset).copied()
    }

    #[inline(always)]
    fn advance_with(&mut self, token_type: TokenType, length: usize) -> Token {
        assert!(length > 0);
        let start = self.index;
        self.index += length;
        Token::new(token_type, Span::new(start, self.index))
    }

    fn finish(&mut self, token_type: TokenType, start: usize) -> Token {
        self.done = true;
        let end = self.src.code.len();
        self.index = end;
        Token::new(token_type, Span::new(start.min(end), end))
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.current(), Some(c) if is_whitespace(c)) {
            self.index += 1;
        }
    }

    fn parse_word(&mut self) -> Token {
        let start = self.index;
        while let Some(c) = self.current() {
            if is_whitespace(c) || OPERATORS.contains(&c) {
                break;
            }
            self.index += 1;
        }
        let end = self.index;
        let value = self.src()[start..end].to_string();
        Token::new(TokenType::Word(value), Span::new(start, end))
    }

    fn parse_string(&mut self, quote: u8) -> Token {
        let start = self.index;
        let body = start + 1;
        match memchr(quote, &self.src.code.as_bytes()[body..]) {
            Some(offset) => {
                let value = self.src()[body..body + offset].to_string();
                self.index = body + offset + 1;
                let token_type = if quote == b'"' {
                    TokenType::DoubleQuoted(value)
                } else {
                    TokenType::SingleQuoted(value)
                };
                Token::new(token_type, Span::new(start, self.index))
            }
            None => self.finish(TokenType::Error(LexErrorKind::UnterminatedString), start),
        }
    }
}

impl Iterator for Lexer {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.done {
            return None;
        }

        self.skip_whitespace();

        let token = match self.current() {
            // a comment runs to the end of the line
            None | Some(b'#') => self.finish(TokenType::EndOfLine, self.index),
            Some(b'|') => self.advance_with(TokenType::Pipe, 1),
            Some(b';') => self.advance_with(TokenType::SemiColon, 1),
            Some(b'<') => self.advance_with(TokenType::RedirectIn, 1),
            Some(b'>') => {
                if self.peek(1) == Some(b'&') {
                    self.advance_with(TokenType::RedirectErr, 2)
                } else {
                    self.advance_with(TokenType::RedirectOut, 1)
                }
            }
            Some(quote @ (b'"' | b'\'')) => self.parse_string(quote),
            Some(_) => self.parse_word(),
        };
        Some(token)
    }
}
