//! The hand-written tokenizer.
//!
//! Lexical rules: identifiers `[A-Za-z_][A-Za-z_0-9]*`; numbers with an
//! optional fraction and an `[eE][-]?digits` exponent (no `+`); `1..3` lexes
//! as three tokens; `"…"`/`'…'` strings where a backslash keeps the next
//! character literal; `#` comments to end of line; `..`, `...`, and the
//! eight two-character operators.

use tpath_core::Location;

use crate::token::{Token, TokenKind};

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    col: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            src: source.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.src.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;

        self.pos += 1;

        if b == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }

        Some(b)
    }

    fn loc(&self) -> Location {
        Location::new(self.line, self.col)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                    self.bump();
                }
                Some(b'#') => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn is_digit(b: u8) -> bool {
        b.is_ascii_digit()
    }

    fn is_ident_start(b: u8) -> bool {
        b == b'_' || b.is_ascii_alphabetic()
    }

    fn is_ident_tail(b: u8) -> bool {
        b == b'_' || b.is_ascii_alphanumeric()
    }

    /// Consume digits, fraction, and exponent. The result may still fail to
    /// parse as a number ("1e-" stops at a non-digit).
    fn lex_number(&mut self, text: &mut String) -> TokenKind {
        while self.peek().is_some_and(Self::is_digit) {
            text.push(self.bump().unwrap_or(b'0') as char);
        }

        // "1..3" is "1" ".." "3".
        if self.peek() == Some(b'.') && self.peek_at(1) != Some(b'.') {
            text.push(self.bump().unwrap_or(b'.') as char);

            while self.peek().is_some_and(Self::is_digit) {
                text.push(self.bump().unwrap_or(b'0') as char);
            }
        }

        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            text.push(self.bump().unwrap_or(b'e') as char);

            if self.peek() == Some(b'-') {
                text.push(self.bump().unwrap_or(b'-') as char);
            }

            while self.peek().is_some_and(Self::is_digit) {
                text.push(self.bump().unwrap_or(b'0') as char);
            }
        }

        TokenKind::Number
    }

    fn lex_string(&mut self, quote: u8, text: &mut String) -> TokenKind {
        text.push(quote as char);

        loop {
            match self.peek() {
                None => return TokenKind::UnterminatedStr,

                Some(b) if b == quote => {
                    text.push(self.bump().unwrap_or(quote) as char);
                    return TokenKind::Str;
                }

                Some(b'\\') => {
                    text.push(self.bump().unwrap_or(b'\\') as char);

                    if let Some(b) = self.bump() {
                        text.push(b as char);
                    }
                }

                Some(_) => {
                    if let Some(b) = self.bump() {
                        text.push(b as char);
                    }
                }
            }
        }
    }

    fn keyword(text: &str) -> Option<TokenKind> {
        match text {
            "import" => Some(TokenKind::Import),
            "def" => Some(TokenKind::Def),
            "if" => Some(TokenKind::If),
            "else" => Some(TokenKind::Else),
            "for" => Some(TokenKind::For),
            "turtle" => Some(TokenKind::Turtle),
            "unique" => Some(TokenKind::Unique),
            "breakpoint" => Some(TokenKind::Breakpoint),
            _ => None,
        }
    }

    /// The two-character operators, checked before single punctuation.
    fn two_char_op(a: u8, b: u8) -> Option<TokenKind> {
        match (a, b) {
            (b'=', b'>') => Some(TokenKind::EqArrow),
            (b'=', b'=') => Some(TokenKind::EqEq),
            (b'!', b'=') => Some(TokenKind::NotEq),
            (b'|', b'|') => Some(TokenKind::OrOr),
            (b'&', b'&') => Some(TokenKind::AndAnd),
            (b'>', b'=') => Some(TokenKind::Ge),
            (b'<', b'=') => Some(TokenKind::Le),
            (b'*', b'*') => Some(TokenKind::Pow),
            _ => None,
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        let loc = self.loc();

        let Some(b) = self.peek() else {
            return Token {
                kind: TokenKind::Eof,
                text: String::new(),
                loc,
            };
        };

        let mut text = String::new();

        // Numbers, including ".5" (but not "..").
        if Self::is_digit(b) || (b == b'.' && self.peek_at(1).is_some_and(Self::is_digit)) {
            let kind = self.lex_number(&mut text);
            return Token { kind, text, loc };
        }

        if b == b'"' || b == b'\'' {
            self.bump();
            let kind = self.lex_string(b, &mut text);
            return Token { kind, text, loc };
        }

        if Self::is_ident_start(b) {
            while self.peek().is_some_and(Self::is_ident_tail) {
                text.push(self.bump().unwrap_or(b'_') as char);
            }

            let kind = Self::keyword(&text).unwrap_or(TokenKind::Ident);
            return Token { kind, text, loc };
        }

        // `..` and `...`
        if b == b'.' {
            self.bump();
            text.push('.');

            if self.peek() == Some(b'.') {
                self.bump();
                text.push('.');

                if self.peek() == Some(b'.') {
                    self.bump();
                    text.push('.');
                    return Token {
                        kind: TokenKind::Ellipsis,
                        text,
                        loc,
                    };
                }

                return Token {
                    kind: TokenKind::DotDot,
                    text,
                    loc,
                };
            }

            return Token {
                kind: TokenKind::Punct('.'),
                text,
                loc,
            };
        }

        if let Some(next) = self.peek_at(1) {
            if let Some(kind) = Self::two_char_op(b, next) {
                self.bump();
                self.bump();
                text.push(b as char);
                text.push(next as char);
                return Token { kind, text, loc };
            }
        }

        self.bump();
        text.push(b as char);

        Token {
            kind: TokenKind::Punct(b as char),
            text,
            loc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut lex = Lexer::new(source);
        let mut out = Vec::new();

        loop {
            let t = lex.next_token();
            let done = t.kind == TokenKind::Eof;
            out.push(t.kind);
            if done {
                break;
            }
        }

        out
    }

    fn texts(source: &str) -> Vec<String> {
        let mut lex = Lexer::new(source);
        let mut out = Vec::new();

        loop {
            let t = lex.next_token();
            if t.kind == TokenKind::Eof {
                break;
            }
            out.push(t.text);
        }

        out
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("def square for x if_"),
            vec![
                TokenKind::Def,
                TokenKind::Ident,
                TokenKind::For,
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn range_does_not_eat_numbers() {
        assert_eq!(texts("1..3"), vec!["1", "..", "3"]);
        assert_eq!(
            kinds("1..3"),
            vec![
                TokenKind::Number,
                TokenKind::DotDot,
                TokenKind::Number,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn number_forms() {
        assert_eq!(texts("1 1.5 .5 2. 1e5 1.5e-3 1e-"), vec![
            "1", "1.5", ".5", "2.", "1e5", "1.5e-3", "1e-",
        ]);
    }

    #[test]
    fn ellipsis_is_its_own_token() {
        assert_eq!(
            kinds("... .. ."),
            vec![
                TokenKind::Ellipsis,
                TokenKind::DotDot,
                TokenKind::Punct('.'),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn two_char_operators() {
        assert_eq!(
            kinds("== != || && >= <= ** => = >"),
            vec![
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::OrOr,
                TokenKind::AndAnd,
                TokenKind::Ge,
                TokenKind::Le,
                TokenKind::Pow,
                TokenKind::EqArrow,
                TokenKind::Punct('='),
                TokenKind::Punct('>'),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn strings_and_escapes() {
        assert_eq!(texts(r#""abc" 'd' "a\"b""#), vec![
            r#""abc""#,
            "'d'",
            r#""a\"b""#,
        ]);

        assert_eq!(
            kinds("\"unterminated"),
            vec![TokenKind::UnterminatedStr, TokenKind::Eof]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("f 1 # trailing comment\ng"),
            vec![
                TokenKind::Ident,
                TokenKind::Number,
                TokenKind::Ident,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn locations_are_one_indexed() {
        let mut lex = Lexer::new("ab\n  cd");

        let t = lex.next_token();
        assert_eq!((t.loc.line, t.loc.col), (1, 1));

        let t = lex.next_token();
        assert_eq!((t.loc.line, t.loc.col), (2, 3));
    }
}
