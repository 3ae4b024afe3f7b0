use crate::source::CharSource;
use crate::token::{Token, TokenKind};

const TWO_CHAR_OPERATORS: &str = "+-|&=!><";

/// Converts characters to a stream of tokens, one at a time (no queue). `next()` is the
/// only entry point; it skips whitespace and comments, then classifies and consumes
/// exactly one token.
pub struct Lexer {
    src: CharSource,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_cont(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            src: CharSource::new(source),
        }
    }

    pub fn eof(&self) -> bool {
        self.src.eof()
    }

    pub fn next(&mut self) -> Token {
        loop {
            while matches!(self.src.peek(), ' ' | '\r' | '\n' | '\t') {
                self.src.next_char();
            }

            if self.src.peek() == '#' {
                self.skip_to_eol();
                continue;
            }

            if self.src.peek() == '/' {
                self.src.next_char();
                if self.src.peek() == '/' {
                    self.skip_to_eol();
                    continue;
                }
                // Not a line comment after all; push the slash back so it is
                // classified normally below.
                self.src.prev_char();
            }

            break;
        }

        let line = self.src.curln();

        if self.src.eof() {
            return Token::eof(line);
        }

        let c = self.src.peek();

        if is_ident_start(c) {
            let mut lexeme = String::new();
            lexeme.push(self.src.next_char());
            while is_ident_cont(self.src.peek()) {
                lexeme.push(self.src.next_char());
            }
            return Token {
                kind: TokenKind::Ident,
                lexeme,
                line,
            };
        }

        if c.is_ascii_digit() {
            let mut lexeme = String::new();
            while self.src.peek().is_ascii_digit() {
                lexeme.push(self.src.next_char());
            }
            return Token {
                kind: TokenKind::Int,
                lexeme,
                line,
            };
        }

        if c == '\'' || c == '"' {
            let delim = c;
            let mut lexeme = String::new();
            lexeme.push(self.src.next_char());
            loop {
                if self.src.eof() {
                    break;
                }
                let ch = self.src.next_char();
                lexeme.push(ch);
                if ch == '\\' {
                    if !self.src.eof() {
                        lexeme.push(self.src.next_char());
                    }
                    continue;
                }
                if ch == delim {
                    break;
                }
            }
            let kind = if delim == '\'' {
                TokenKind::Char
            } else {
                TokenKind::Str
            };
            return Token { kind, lexeme, line };
        }

        if TWO_CHAR_OPERATORS.contains(c) {
            let mut lexeme = String::new();
            lexeme.push(self.src.next_char());
            let c2 = self.src.peek();
            if (c2 == c && c != '!') || c2 == '=' {
                lexeme.push(self.src.next_char());
            }
            return Token {
                kind: TokenKind::Other,
                lexeme,
                line,
            };
        }

        let mut lexeme = String::new();
        lexeme.push(self.src.next_char());
        Token {
            kind: TokenKind::Other,
            lexeme,
            line,
        }
    }

    fn skip_to_eol(&mut self) {
        while self.src.peek() != '\n' && !self.src.eof() {
            self.src.next_char();
        }
    }
}
