use crate::parser::ParseError;
use crate::token::{Token, TokenKind};

/// Hand-rolled lexer over raw source bytes.
///
/// Comments are bracketed `[ ... ]` and may span lines; they do not nest.
/// Identifiers are lowercase letters and underscores, keywords are the
/// fixed uppercase words, and everything else is a single- or two-byte
/// operator.
pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
            line: 1,
        }
    }

    /// Lex the whole input.
    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        if byte == b'\n' {
            self.line += 1;
        }
        Some(byte)
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n') => {
                    self.bump();
                }
                Some(b'[') => {
                    let start = self.line;
                    self.bump();
                    loop {
                        match self.bump() {
                            Some(b']') => break,
                            Some(_) => {}
                            None => {
                                return Err(ParseError::new(
                                    "unterminated comment",
                                    start,
                                ));
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        self.skip_trivia()?;
        let line = self.line;
        let Some(byte) = self.peek() else {
            return Ok(None);
        };

        let kind = match byte {
            b'a'..=b'z' | b'_' => self.lex_word(),
            b'A'..=b'Z' => self.lex_keyword()?,
            b'0'..=b'9' => self.lex_number()?,
            b';' => {
                self.bump();
                TokenKind::Semicolon
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
            b'(' => {
                self.bump();
                TokenKind::LParen
            }
            b')' => {
                self.bump();
                TokenKind::RParen
            }
            b'+' => {
                self.bump();
                TokenKind::Plus
            }
            b'-' => {
                self.bump();
                TokenKind::Minus
            }
            b'*' => {
                self.bump();
                TokenKind::Times
            }
            b'/' => {
                self.bump();
                TokenKind::Divide
            }
            b'%' => {
                self.bump();
                TokenKind::Modulo
            }
            b'=' => {
                self.bump();
                TokenKind::Eq
            }
            b'!' => {
                self.bump();
                if self.peek() == Some(b'=') {
                    self.bump();
                    TokenKind::Neq
                } else {
                    return Err(ParseError::new("expected '=' after '!'", line));
                }
            }
            b'<' => {
                self.bump();
                if self.peek() == Some(b'=') {
                    self.bump();
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            b'>' => {
                self.bump();
                if self.peek() == Some(b'=') {
                    self.bump();
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            other => {
                return Err(ParseError::new(
                    format!("unexpected character '{}'", other as char),
                    line,
                ));
            }
        };

        Ok(Some(Token { kind, line }))
    }

    fn lex_word(&mut self) -> TokenKind {
        let start = self.pos;
        while matches!(self.peek(), Some(b'a'..=b'z' | b'_')) {
            self.bump();
        }
        // Identifier characters are ASCII, so the slice is valid UTF-8.
        let text = std::str::from_utf8(&self.src[start..self.pos])
            .unwrap_or_default();
        TokenKind::Pid(text.to_owned())
    }

    fn lex_keyword(&mut self) -> Result<TokenKind, ParseError> {
        let line = self.line;
        let start = self.pos;
        while matches!(self.peek(), Some(b'A'..=b'Z')) {
            self.bump();
        }
        let text =
            std::str::from_utf8(&self.src[start..self.pos]).unwrap_or_default();
        let kind = match text {
            "DECLARE" => TokenKind::Declare,
            "IN" => TokenKind::In,
            "END" => TokenKind::End,
            "IF" => TokenKind::If,
            "THEN" => TokenKind::Then,
            "ELSE" => TokenKind::Else,
            "ENDIF" => TokenKind::EndIf,
            "WHILE" => TokenKind::While,
            "ENDWHILE" => TokenKind::EndWhile,
            "DO" => TokenKind::Do,
            "ENDDO" => TokenKind::EndDo,
            "FOR" => TokenKind::For,
            "FROM" => TokenKind::From,
            "TO" => TokenKind::To,
            "DOWNTO" => TokenKind::DownTo,
            "ENDFOR" => TokenKind::EndFor,
            "READ" => TokenKind::Read,
            "WRITE" => TokenKind::Write,
            other => {
                return Err(ParseError::new(
                    format!("unknown keyword '{other}'"),
                    line,
                ));
            }
        };
        Ok(kind)
    }

    fn lex_number(&mut self) -> Result<TokenKind, ParseError> {
        let line = self.line;
        let mut value: u64 = 0;
        while let Some(byte @ b'0'..=b'9') = self.peek() {
            self.bump();
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u64::from(byte - b'0')))
                .ok_or_else(|| {
                    ParseError::new("number literal out of range", line)
                })?;
        }
        Ok(TokenKind::Num(value))
    }
}
