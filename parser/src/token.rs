use core::fmt;

/// Lexical tokens of the source language.
///
/// Keywords are uppercase in source; identifiers are lowercase with
/// underscores. The lexer keeps numbers as `u64`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Declare,
    In,
    End,
    If,
    Then,
    Else,
    EndIf,
    While,
    EndWhile,
    Do,
    EndDo,
    For,
    From,
    To,
    DownTo,
    EndFor,
    Read,
    Write,
    Assign,
    Semicolon,
    Colon,
    LParen,
    RParen,
    Plus,
    Minus,
    Times,
    Divide,
    Modulo,
    Eq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,
    Pid(String),
    Num(u64),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Declare => "DECLARE",
            TokenKind::In => "IN",
            TokenKind::End => "END",
            TokenKind::If => "IF",
            TokenKind::Then => "THEN",
            TokenKind::Else => "ELSE",
            TokenKind::EndIf => "ENDIF",
            TokenKind::While => "WHILE",
            TokenKind::EndWhile => "ENDWHILE",
            TokenKind::Do => "DO",
            TokenKind::EndDo => "ENDDO",
            TokenKind::For => "FOR",
            TokenKind::From => "FROM",
            TokenKind::To => "TO",
            TokenKind::DownTo => "DOWNTO",
            TokenKind::EndFor => "ENDFOR",
            TokenKind::Read => "READ",
            TokenKind::Write => "WRITE",
            TokenKind::Assign => ":=",
            TokenKind::Semicolon => ";",
            TokenKind::Colon => ":",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Times => "*",
            TokenKind::Divide => "/",
            TokenKind::Modulo => "%",
            TokenKind::Eq => "=",
            TokenKind::Neq => "!=",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::Le => "<=",
            TokenKind::Ge => ">=",
            TokenKind::Pid(name) => return f.write_str(name),
            TokenKind::Num(n) => return write!(f, "{n}"),
        };
        f.write_str(text)
    }
}

/// A token together with the source line it started on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}
