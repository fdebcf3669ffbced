use crate::value::Value;

/// Tokens are simple things like numbers, operators, parentheses, and so on.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// A numeric literal. Radix, engineering-suffix and imaginary forms are
    /// resolved here at lex time, so the parser only ever sees a value.
    Num(Value),

    /// A name left for later resolution: a function when followed by `(`,
    /// otherwise an environment lookup at eval time.
    Ident(String),

    Plus,
    Minus,
    Times,
    Slash,
    Hat,
    Ampersand,
    Percent,
    Bang,
    Comma,
    OpenParen,
    CloseParen,

    /// The two-character `//` parallel-combination operator.
    Parallel,
}

impl TokenKind {
    pub fn from_single_char(c: char) -> Option<TokenKind> {
        Some(match c {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Times,
            '/' => TokenKind::Slash,
            '^' => TokenKind::Hat,
            '&' => TokenKind::Ampersand,
            '%' => TokenKind::Percent,
            '!' => TokenKind::Bang,
            ',' => TokenKind::Comma,
            '(' => TokenKind::OpenParen,
            ')' => TokenKind::CloseParen,
            _ => return None,
        })
    }

    /// True for every token that cannot start an operand. Used to decide
    /// whether a `%` is the postfix percent operator or binary modulo.
    pub fn is_operator(&self) -> bool {
        !matches!(
            self,
            TokenKind::Num(_) | TokenKind::Ident(_) | TokenKind::OpenParen
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,

    /// The index of the first character of the token
    pub index: usize,
}
