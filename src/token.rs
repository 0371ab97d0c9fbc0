use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Def,
    If,
    Then,
    Else,
    Ident(String),
    Number(u32),
    LParen,
    RParen,
    Comma,
    /// Any other single character; binary operators are looked up by it.
    Kwd(char),
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Def => write!(f, "`def`"),
            Token::If => write!(f, "`if`"),
            Token::Then => write!(f, "`then`"),
            Token::Else => write!(f, "`else`"),
            Token::Ident(id) => write!(f, "identifier `{}`", id),
            Token::Number(n) => write!(f, "number `{}`", n),
            Token::LParen => write!(f, "`(`"),
            Token::RParen => write!(f, "`)`"),
            Token::Comma => write!(f, "`,`"),
            Token::Kwd(c) => write!(f, "`{}`", c),
            Token::Eof => write!(f, "end of input"),
        }
    }
}
