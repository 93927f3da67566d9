use tpath_core::Location;

/// Token kinds.
///
/// Single-character punctuation rides in `Punct`; everything multi-character
/// or classified gets its own kind.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TokenKind {
    Eof,
    Ident,
    Number,
    Str,
    UnterminatedStr,

    /// `..`
    DotDot,
    /// `...` — lexed and reserved, currently unused by the grammar.
    Ellipsis,
    /// `=>`
    EqArrow,
    EqEq,
    NotEq,
    OrOr,
    AndAnd,
    Ge,
    Le,
    /// `**`
    Pow,

    Import,
    Def,
    If,
    Else,
    For,
    Turtle,
    Unique,
    Breakpoint,

    Punct(char),
}

impl TokenKind {
    /// Human-readable description for error messages.
    pub fn description(self) -> String {
        match self {
            TokenKind::Eof => "end of file".to_string(),
            TokenKind::Ident => "an identifier".to_string(),
            TokenKind::Number => "a numerical constant".to_string(),
            TokenKind::Str => "a string constant".to_string(),
            TokenKind::UnterminatedStr => "an unterminated string constant".to_string(),
            TokenKind::DotDot => "'..'".to_string(),
            TokenKind::Ellipsis => "'...'".to_string(),
            TokenKind::EqArrow => "'=>'".to_string(),
            TokenKind::EqEq => "'=='".to_string(),
            TokenKind::NotEq => "'!='".to_string(),
            TokenKind::OrOr => "'||'".to_string(),
            TokenKind::AndAnd => "'&&'".to_string(),
            TokenKind::Ge => "'>='".to_string(),
            TokenKind::Le => "'<='".to_string(),
            TokenKind::Pow => "'**'".to_string(),
            TokenKind::Import => "'import'".to_string(),
            TokenKind::Def => "'def'".to_string(),
            TokenKind::If => "'if'".to_string(),
            TokenKind::Else => "'else'".to_string(),
            TokenKind::For => "'for'".to_string(),
            TokenKind::Turtle => "'turtle'".to_string(),
            TokenKind::Unique => "'unique'".to_string(),
            TokenKind::Breakpoint => "'breakpoint'".to_string(),
            TokenKind::Punct(c) => format!("'{}'", c),
        }
    }
}

/// A lexed token: kind, source text, and start location.
#[derive(Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub loc: Location,
}

impl Token {
    pub fn eof() -> Self {
        Self {
            kind: TokenKind::Eof,
            text: String::new(),
            loc: Location::NONE,
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}
