//! Raw character-level scanner (`spec.md` §4.5.2), producing a flat token
//! stream with comments stripped and whitespace collapsed. This is the
//! stage the preprocessor (`preprocessor.rs`) consumes.

use glsl_utils::span::Span;

use crate::token::{Keyword, Operator, Token, TokenKind};

pub struct Scanner<'src> {
    src: &'src str,
    bytes: &'src [u8],
    pos: usize,
    line: u32,
}

impl<'src> Scanner<'src> {
    pub fn new(src: &'src str) -> Self {
        Self { src, bytes: src.as_bytes(), pos: 0, line: 1 }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn is_ident_start(c: u8) -> bool {
        c.is_ascii_alphabetic() || c == b'_' || c == b'$'
    }

    fn is_ident_continue(c: u8) -> bool {
        c.is_ascii_alphanumeric() || c == b'_' || c == b'$'
    }

    /// Skips spaces/tabs and `/* */`/`// ...` comments, stopping at the
    /// first newline, `#`, or significant character. Newlines inside
    /// block comments are counted so line numbers stay correct.
    fn skip_insignificant(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') => {
                    self.pos += 1;
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while !matches!(self.peek(), None | Some(b'\n')) {
                        self.pos += 1;
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    self.pos += 2;
                    while let Some(c) = self.peek() {
                        if c == b'*' && self.peek_at(1) == Some(b'/') {
                            self.pos += 2;
                            break;
                        }
                        if c == b'\n' {
                            self.line += 1;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_insignificant();
        let start = self.pos;
        let line = self.line;

        let Some(c) = self.peek() else {
            return Token { kind: TokenKind::Eof, span: Span::new(start as u32, start as u32), line };
        };

        if c == b'\n' {
            self.pos += 1;
            self.line += 1;
            return Token { kind: TokenKind::Eol, span: self.span(start), line };
        }

        if c == b'#' {
            self.pos += 1;
            return Token { kind: TokenKind::Hash, span: self.span(start), line };
        }

        if Self::is_ident_start(c) {
            return self.scan_identifier(start, line);
        }

        if c.is_ascii_digit() || (c == b'.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit())) {
            return self.scan_number(start, line);
        }

        self.scan_operator(start, line)
    }

    fn span(&self, start: usize) -> Span {
        Span::new(start as u32, self.pos as u32)
    }

    fn scan_identifier(&mut self, start: usize, line: u32) -> Token {
        while self.peek().is_some_and(Self::is_ident_continue) {
            self.pos += 1;
        }
        let text = &self.src[start..self.pos];
        let kind = if let Some(suffix) = text.strip_prefix("__asm") {
            TokenKind::AsmOp(suffix.to_string())
        } else if text == "__retval" {
            TokenKind::Retval
        } else if let Some(kw) = Keyword::lookup(text) {
            TokenKind::Keyword(kw)
        } else {
            TokenKind::Identifier(text.to_string())
        };
        Token { kind, span: self.span(start), line }
    }

    /// Integer prefixes `0x`/`0X` (hex), leading `0` (octal), decimal;
    /// `.` continuations promote to float; optional exponent
    /// (`spec.md` §4.5.2).
    fn scan_number(&mut self, start: usize, line: u32) -> Token {
        let mut is_float = false;
        if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x') | Some(b'X')) {
            self.pos += 2;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            let text = &self.src[start + 2..self.pos];
            let value = i64::from_str_radix(text, 16).unwrap_or(0);
            return Token { kind: TokenKind::IntConstant(value), span: self.span(start), line };
        }

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some(b'.') {
            is_float = true;
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            let mut lookahead = self.pos + 1;
            if matches!(self.bytes.get(lookahead), Some(b'+') | Some(b'-')) {
                lookahead += 1;
            }
            if self.bytes.get(lookahead).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.pos = lookahead;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }

        let text = &self.src[start..self.pos];
        if is_float {
            Token {
                kind: TokenKind::FloatConstant(text.parse().unwrap_or(0.0)),
                span: self.span(start),
                line,
            }
        } else if text.starts_with('0') && text.len() > 1 && text.bytes().all(|c| (b'0'..=b'7').contains(&c)) {
            let value = i64::from_str_radix(text, 8).unwrap_or(0);
            Token { kind: TokenKind::IntConstant(value), span: self.span(start), line }
        } else {
            Token { kind: TokenKind::IntConstant(text.parse().unwrap_or(0)), span: self.span(start), line }
        }
    }

    fn scan_operator(&mut self, start: usize, line: u32) -> Token {
        use Operator::*;
        let two = |s: &mut Self, op: Operator| {
            s.pos += 2;
            Token { kind: TokenKind::Operator(op), span: s.span(start), line }
        };
        let one = |s: &mut Self, op: Operator| {
            s.pos += 1;
            Token { kind: TokenKind::Operator(op), span: s.span(start), line }
        };
        let c = self.bytes[self.pos];
        let c1 = self.peek_at(1);
        match (c, c1) {
            (b'+', Some(b'+')) => two(self, PlusPlus),
            (b'-', Some(b'-')) => two(self, MinusMinus),
            (b'+', Some(b'=')) => two(self, PlusEq),
            (b'-', Some(b'=')) => two(self, MinusEq),
            (b'*', Some(b'=')) => two(self, StarEq),
            (b'/', Some(b'=')) => two(self, SlashEq),
            (b'=', Some(b'=')) => two(self, EqEq),
            (b'!', Some(b'=')) => two(self, NotEq),
            (b'<', Some(b'=')) => two(self, Le),
            (b'>', Some(b'=')) => two(self, Ge),
            (b'&', Some(b'&')) => two(self, AndAnd),
            (b'|', Some(b'|')) => two(self, OrOr),
            (b'^', Some(b'^')) => two(self, XorXor),
            (b'<', Some(b'<')) => two(self, Shl),
            (b'>', Some(b'>')) => two(self, Shr),
            (b'&', _) => one(self, Amp),
            (b'|', _) => one(self, Pipe),
            (b'^', _) => one(self, Caret),
            (b'~', _) => one(self, Tilde),
            (b'+', _) => one(self, Plus),
            (b'-', _) => one(self, Minus),
            (b'*', _) => one(self, Star),
            (b'/', _) => one(self, Slash),
            (b'%', _) => one(self, Percent),
            (b'=', _) => one(self, Assign),
            (b'<', _) => one(self, Lt),
            (b'>', _) => one(self, Gt),
            (b'!', _) => one(self, Not),
            (b'(', _) => one(self, LParen),
            (b')', _) => one(self, RParen),
            (b'{', _) => one(self, LBrace),
            (b'}', _) => one(self, RBrace),
            (b'[', _) => one(self, LBracket),
            (b']', _) => one(self, RBracket),
            (b';', _) => one(self, Semi),
            (b',', _) => one(self, Comma),
            (b'.', _) => one(self, Dot),
            (b'?', _) => one(self, Question),
            (b':', _) => one(self, Colon),
            _ => {
                self.pos += 1;
                Token {
                    kind: TokenKind::Error(format!("unexpected character `{}`", c as char)),
                    span: self.span(start),
                    line,
                }
            }
        }
    }
}
