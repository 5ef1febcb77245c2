//! The Zwerg tokenizer.

use crate::constant::{Constant, Value64};
use crate::error::{LexerError, Span};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Const(Constant),
    Str(Vec<u8>),
    Ident(String),
    /// `?NAME` / `!NAME` positive/negative predicate-applied-builtin form.
    PredName { name: String, negate: bool },
    /// `?N` / `!N` position predicate literal.
    PredPos { value: u64, negate: bool },
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    /// `?(` / `!(`
    PredLParen { negate: bool },
    /// `?{` / `!{`
    PredLBrace { negate: bool },
    Comma,
    Semicolon,
    Colon,
    Star,
    Plus,
    Question,
    OrOr,
    Assign, // `:=`
    Let,
    If,
    Then,
    Else,
    Dollar,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src: src.as_bytes(), pos: 0 }
    }

    pub fn tokenize(src: &str) -> Result<Vec<Token>, LexerError> {
        let mut lexer = Lexer::new(src);
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token()?;
            let done = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if done {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn skip_ws_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => {
                    self.pos += 1;
                }
                Some(b'#') => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn err(&self, start: usize, message: impl Into<String>) -> LexerError {
        LexerError { message: message.into(), span: Span::new(start, self.pos) }
    }

    pub fn next_token(&mut self) -> Result<Token, LexerError> {
        self.skip_ws_and_comments();
        let start = self.pos;
        let Some(b) = self.peek() else {
            return Ok(Token { kind: TokenKind::Eof, span: Span::point(start) });
        };

        let kind = match b {
            b'(' => {
                self.bump();
                TokenKind::LParen
            }
            b')' => {
                self.bump();
                TokenKind::RParen
            }
            b'[' => {
                self.bump();
                TokenKind::LBracket
            }
            b']' => {
                self.bump();
                TokenKind::RBracket
            }
            b'{' => {
                self.bump();
                TokenKind::LBrace
            }
            b'}' => {
                self.bump();
                TokenKind::RBrace
            }
            b',' => {
                self.bump();
                TokenKind::Comma
            }
            b';' => {
                self.bump();
                TokenKind::Semicolon
            }
            b'*' => {
                self.bump();
                TokenKind::Star
            }
            b'+' => {
                self.bump();
                TokenKind::Plus
            }
            b'$' => {
                self.bump();
                TokenKind::Dollar
            }
            b':' => {
                self.bump();
                if self.peek() == Some(b'=') {
                    self.bump();
                    TokenKind::Assign
                } else {
                    TokenKind::Colon
                }
            }
            b'?' => {
                self.bump();
                self.lex_predicate_head(start, false)?
            }
            b'!' => {
                self.bump();
                self.lex_predicate_head(start, true)?
            }
            b'|' => {
                self.bump();
                if self.peek() == Some(b'|') {
                    self.bump();
                    TokenKind::OrOr
                } else {
                    return Err(self.err(start, "unexpected `|` (did you mean `||`?)"));
                }
            }
            b'"' => {
                self.bump();
                TokenKind::Str(self.lex_quoted_string(start, false)?)
            }
            b'r' if self.peek_at(1) == Some(b'"') => {
                self.bump();
                self.bump();
                TokenKind::Str(self.lex_quoted_string(start, true)?)
            }
            b'0'..=b'9' => self.lex_number(start)?,
            b'-' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.lex_number(start)?,
            c if is_ident_start(c) => self.lex_ident_or_keyword(start),
            other => {
                return Err(self.err(start, format!("byte {other:#x} outside valid source range")));
            }
        };
        Ok(Token { kind, span: Span::new(start, self.pos) })
    }

    fn lex_predicate_head(&mut self, start: usize, negate: bool) -> Result<TokenKind, LexerError> {
        match self.peek() {
            Some(b'(') => {
                self.bump();
                Ok(TokenKind::PredLParen { negate })
            }
            Some(b'{') => {
                self.bump();
                Ok(TokenKind::PredLBrace { negate })
            }
            Some(b'0'..=b'9') => {
                let digits_start = self.pos;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
                let text = std::str::from_utf8(&self.src[digits_start..self.pos]).unwrap();
                let value: u64 = text.parse().map_err(|_| self.err(start, "malformed position literal"))?;
                Ok(TokenKind::PredPos { value, negate })
            }
            Some(c) if is_ident_start(c) => {
                let name_start = self.pos;
                while self.peek().is_some_and(is_ident_continue) {
                    self.bump();
                }
                let name = std::str::from_utf8(&self.src[name_start..self.pos]).unwrap().to_string();
                Ok(TokenKind::PredName { name, negate })
            }
            _ if !negate => Ok(TokenKind::Question),
            _ => Err(self.err(start, "expected `(`, `{`, a name, or a number after `!`")),
        }
    }

    fn lex_ident_or_keyword(&mut self, start: usize) -> TokenKind {
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
        match text {
            "let" => TokenKind::Let,
            "if" => TokenKind::If,
            "then" => TokenKind::Then,
            "else" => TokenKind::Else,
            _ => TokenKind::Ident(text.to_string()),
        }
    }

    fn lex_number(&mut self, start: usize) -> Result<TokenKind, LexerError> {
        let neg = if self.peek() == Some(b'-') {
            self.bump();
            true
        } else {
            false
        };
        let digits_start = self.pos;

        let (radix, domain): (u32, &str) = if self.peek() == Some(b'0')
            && matches!(self.peek_at(1), Some(b'x') | Some(b'X'))
        {
            self.bump();
            self.bump();
            (16, "hex")
        } else if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'o') | Some(b'O')) {
            self.bump();
            self.bump();
            (8, "oct")
        } else if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'b') | Some(b'B')) {
            self.bump();
            self.bump();
            (2, "bin")
        } else if self.peek() == Some(b'0') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            (8, "oct")
        } else {
            (10, "dec")
        };

        let body_start = self.pos;
        while self.peek().is_some_and(|c| (c as char).is_digit(radix) || c == b'_') {
            self.bump();
        }
        if self.pos == body_start {
            return Err(self.err(start, "ambiguous or empty number literal"));
        }
        if self.peek().is_some_and(is_ident_continue) {
            return Err(self.err(start, "ambiguous number literal (trailing identifier characters)"));
        }

        let digits: String = std::str::from_utf8(&self.src[body_start..self.pos])
            .unwrap()
            .chars()
            .filter(|c| *c != '_')
            .collect();
        let magnitude = u64::from_str_radix(&digits, radix)
            .map_err(|_| self.err(start, "number literal out of range"))?;
        let _ = digits_start;

        let constant = match domain {
            "dec" => {
                if neg {
                    let v = i64::try_from(magnitude)
                        .map_err(|_| self.err(start, "number literal out of range"))?;
                    Constant::decimal(-v)
                } else {
                    Constant::unsigned_decimal(magnitude)
                }
            }
            "hex" => Constant::hex(if neg {
                Value64::from_signed(-(magnitude as i64))
            } else {
                Value64::from_unsigned(magnitude)
            }),
            "oct" => Constant::new(
                if neg { Value64::from_signed(-(magnitude as i64)) } else { Value64::from_unsigned(magnitude) },
                crate::domain::octal(),
            ),
            "bin" => Constant::new(
                if neg { Value64::from_signed(-(magnitude as i64)) } else { Value64::from_unsigned(magnitude) },
                crate::domain::binary(),
            ),
            _ => unreachable!(),
        };
        Ok(TokenKind::Const(constant))
    }

    fn lex_quoted_string(&mut self, start: usize, raw: bool) -> Result<Vec<u8>, LexerError> {
        let mut out = Vec::new();
        loop {
            match self.bump() {
                None => return Err(self.err(start, "unterminated string literal")),
                Some(b'"') => break,
                Some(b'\\') if !raw => {
                    let esc = self.bump().ok_or_else(|| self.err(start, "unterminated escape sequence"))?;
                    match esc {
                        b'n' => out.push(b'\n'),
                        b't' => out.push(b'\t'),
                        b'r' => out.push(b'\r'),
                        b'0' => out.push(0),
                        b'"' => out.push(b'"'),
                        b'\\' => out.push(b'\\'),
                        b'x' => {
                            let hi = self.bump().ok_or_else(|| self.err(start, "truncated \\x escape"))?;
                            let lo = self.bump().ok_or_else(|| self.err(start, "truncated \\x escape"))?;
                            let byte = hex_pair(hi, lo).ok_or_else(|| self.err(start, "invalid \\x escape"))?;
                            out.push(byte);
                        }
                        b'\n' => {
                            // trailing backslash before newline: string continuation,
                            // no byte is emitted for either character.
                            while self.peek().is_some_and(|c| c.is_ascii_whitespace() && c != b'"') {
                                self.bump();
                            }
                        }
                        other => return Err(self.err(start, format!("invalid escape `\\{}`", other as char))),
                    }
                }
                Some(b'\\') if raw => out.push(b'\\'),
                Some(b) => out.push(b),
            }
        }
        // Continuation: a literal `\` immediately after the closing quote
        // joins this literal with the next one, e.g.
        // "con\t"\   "i\nued" (examples/original_source/libzwerg/test-parser.cc:282).
        // Two adjacent quoted strings with no `\` between them are two
        // separate tokens, not a merge.
        if self.peek() == Some(b'\\') {
            self.bump();
            self.skip_ws_and_comments();
            if self.peek() != Some(b'"') {
                return Err(self.err(start, "expected a string literal after continuation `\\`"));
            }
            self.bump();
            let rest = self.lex_quoted_string(start, raw)?;
            out.extend(rest);
        }
        Ok(out)
    }
}

fn hex_pair(hi: u8, lo: u8) -> Option<u8> {
    let h = (hi as char).to_digit(16)?;
    let l = (lo as char).to_digit(16)?;
    Some(((h << 4) | l) as u8)
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'-'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn decimal_and_hex_literals() {
        let ks = kinds("17 0x37");
        match &ks[0] {
            TokenKind::Const(c) => assert_eq!(c.value.to_i128(), 17),
            _ => panic!("expected const"),
        }
        match &ks[1] {
            TokenKind::Const(c) => assert_eq!(c.value.to_i128(), 0x37),
            _ => panic!("expected const"),
        }
    }

    #[test]
    fn quoted_string_with_escape() {
        let ks = kinds(r#""foo\nbar""#);
        assert_eq!(ks[0], TokenKind::Str(b"foo\nbar".to_vec()));
    }

    #[test]
    fn whitespace_adjacent_strings_stay_separate() {
        let ks = kinds(r#""foo" "bar""#);
        assert_eq!(ks[0], TokenKind::Str(b"foo".to_vec()));
        assert_eq!(ks[1], TokenKind::Str(b"bar".to_vec()));
    }

    #[test]
    fn backslash_joined_strings_concatenate() {
        let ks = kinds(r#""foo"\ "bar""#);
        assert_eq!(ks[0], TokenKind::Str(b"foobar".to_vec()));
    }

    #[test]
    fn dangling_continuation_backslash_is_an_error() {
        assert!(Lexer::tokenize(r#""foo"\ 1"#).is_err());
    }

    #[test]
    fn predicate_forms() {
        let ks = kinds("?match !eq ?(1) !{1} ?0");
        assert_eq!(ks[0], TokenKind::PredName { name: "match".into(), negate: false });
        assert_eq!(ks[1], TokenKind::PredName { name: "eq".into(), negate: true });
        assert_eq!(ks[2], TokenKind::PredLParen { negate: false });
        assert_eq!(ks[3], TokenKind::PredLBrace { negate: true });
        assert_eq!(ks[4], TokenKind::PredPos { value: 0, negate: false });
    }

    #[test]
    fn bare_question_mark_is_postfix_optional() {
        let ks = kinds("1?");
        assert!(matches!(ks[0], TokenKind::Const(_)));
        assert_eq!(ks[1], TokenKind::Question);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(Lexer::tokenize("\"abc").is_err());
    }
}
