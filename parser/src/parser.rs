use core::fmt;

use crate::ast::{
    ArithOp, Condition, Decl, Expr, Ident, Index, Program, RelOp, Stmt, Value,
};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

/// A lexing or parsing failure, with the source line it occurred on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        Self { message: message.into(), line }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at line {}", self.message, self.line)
    }
}

impl std::error::Error for ParseError {}

/// Parse a complete source program.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse_program()
}

/// Recursive-descent parser over the token list.
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    /// Line of the current token, or of the last token at end of input.
    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |t| t.line)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        let line = self.line();
        match self.advance() {
            Some(token) if token.kind == kind => Ok(token),
            Some(token) => Err(ParseError::new(
                format!("expected '{kind}', found '{}'", token.kind),
                token.line,
            )),
            None => Err(ParseError::new(
                format!("expected '{kind}', found end of input"),
                line,
            )),
        }
    }

    fn expect_pid(&mut self) -> Result<(String, usize), ParseError> {
        let line = self.line();
        match self.advance() {
            Some(Token { kind: TokenKind::Pid(name), line }) => {
                Ok((name, line))
            }
            Some(token) => Err(ParseError::new(
                format!("expected identifier, found '{}'", token.kind),
                token.line,
            )),
            None => Err(ParseError::new(
                "expected identifier, found end of input",
                line,
            )),
        }
    }

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        self.expect(TokenKind::Declare)?;
        let decls = self.parse_declarations()?;
        self.expect(TokenKind::In)?;
        let body = self.parse_commands(&[TokenKind::End])?;
        self.expect(TokenKind::End)?;
        if let Some(kind) = self.peek() {
            return Err(ParseError::new(
                format!("unexpected '{kind}' after END"),
                self.line(),
            ));
        }
        Ok(Program { decls, body })
    }

    fn parse_declarations(&mut self) -> Result<Vec<Decl>, ParseError> {
        let mut decls = Vec::new();
        while let Some(TokenKind::Pid(_)) = self.peek() {
            let (name, line) = self.expect_pid()?;
            let decl = if self.peek() == Some(&TokenKind::LParen) {
                self.advance();
                let from = self.expect_num()?;
                self.expect(TokenKind::Colon)?;
                let to = self.expect_num()?;
                self.expect(TokenKind::RParen)?;
                Decl::Array { name, line, from, to }
            } else {
                Decl::Scalar { name, line }
            };
            self.expect(TokenKind::Semicolon)?;
            decls.push(decl);
        }
        Ok(decls)
    }

    fn expect_num(&mut self) -> Result<u64, ParseError> {
        let line = self.line();
        match self.advance() {
            Some(Token { kind: TokenKind::Num(n), .. }) => Ok(n),
            Some(token) => Err(ParseError::new(
                format!("expected number, found '{}'", token.kind),
                token.line,
            )),
            None => {
                Err(ParseError::new("expected number, found end of input", line))
            }
        }
    }

    /// Parse commands until one of `stop` is the current token. At least
    /// one command is required.
    fn parse_commands(
        &mut self,
        stop: &[TokenKind],
    ) -> Result<Vec<Stmt>, ParseError> {
        let mut commands = vec![self.parse_command()?];
        loop {
            match self.peek() {
                Some(kind) if stop.contains(kind) => break,
                Some(_) => commands.push(self.parse_command()?),
                None => {
                    return Err(ParseError::new(
                        "unexpected end of input inside command block",
                        self.line(),
                    ));
                }
            }
        }
        Ok(commands)
    }

    fn parse_command(&mut self) -> Result<Stmt, ParseError> {
        match self.peek() {
            Some(TokenKind::Pid(_)) => {
                let target = self.parse_identifier()?;
                self.expect(TokenKind::Assign)?;
                let expr = self.parse_expression()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Assign { target, expr })
            }
            Some(TokenKind::Read) => {
                self.advance();
                let target = self.parse_identifier()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Read { target })
            }
            Some(TokenKind::Write) => {
                self.advance();
                let value = self.parse_value()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Write { value })
            }
            Some(TokenKind::If) => self.parse_if(),
            Some(TokenKind::While) => self.parse_while(),
            Some(TokenKind::Do) => self.parse_do_while(),
            Some(TokenKind::For) => self.parse_for(),
            Some(kind) => Err(ParseError::new(
                format!("expected command, found '{kind}'"),
                self.line(),
            )),
            None => Err(ParseError::new(
                "expected command, found end of input",
                self.line(),
            )),
        }
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::If)?;
        let cond = self.parse_condition()?;
        self.expect(TokenKind::Then)?;
        let then_body =
            self.parse_commands(&[TokenKind::Else, TokenKind::EndIf])?;
        if self.peek() == Some(&TokenKind::Else) {
            self.advance();
            let else_body = self.parse_commands(&[TokenKind::EndIf])?;
            self.expect(TokenKind::EndIf)?;
            Ok(Stmt::IfElse { cond, then_body, else_body })
        } else {
            self.expect(TokenKind::EndIf)?;
            Ok(Stmt::If { cond, body: then_body })
        }
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::While)?;
        let cond = self.parse_condition()?;
        self.expect(TokenKind::Do)?;
        let body = self.parse_commands(&[TokenKind::EndWhile])?;
        self.expect(TokenKind::EndWhile)?;
        Ok(Stmt::While { cond, body })
    }

    /// `DO commands WHILE condition ENDDO`.
    ///
    /// A `WHILE` inside the body is ambiguous: it may open a nested while
    /// loop or close this one. Look ahead past the condition; `DO` there
    /// means a nested loop, anything else means the closing test.
    fn parse_do_while(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::Do)?;
        let mut body = Vec::new();
        loop {
            if self.peek() == Some(&TokenKind::While) {
                let saved = self.pos;
                self.advance();
                let cond = self.parse_condition()?;
                if self.peek() == Some(&TokenKind::Do) {
                    self.pos = saved;
                } else {
                    self.expect(TokenKind::EndDo)?;
                    if body.is_empty() {
                        return Err(ParseError::new(
                            "empty DO body",
                            self.line(),
                        ));
                    }
                    return Ok(Stmt::DoWhile { body, cond });
                }
            }
            body.push(self.parse_command()?);
        }
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::For)?;
        let (iter, _) = self.expect_pid()?;
        self.expect(TokenKind::From)?;
        let from = self.parse_value()?;
        let downto = match self.advance() {
            Some(Token { kind: TokenKind::To, .. }) => false,
            Some(Token { kind: TokenKind::DownTo, .. }) => true,
            Some(token) => {
                return Err(ParseError::new(
                    format!("expected 'TO' or 'DOWNTO', found '{}'", token.kind),
                    token.line,
                ));
            }
            None => {
                return Err(ParseError::new(
                    "expected 'TO' or 'DOWNTO', found end of input",
                    self.line(),
                ));
            }
        };
        let to = self.parse_value()?;
        self.expect(TokenKind::Do)?;
        let body = self.parse_commands(&[TokenKind::EndFor])?;
        self.expect(TokenKind::EndFor)?;
        if downto {
            Ok(Stmt::ForDownTo { iter, from, to, body })
        } else {
            Ok(Stmt::For { iter, from, to, body })
        }
    }

    fn parse_condition(&mut self) -> Result<Condition, ParseError> {
        let lhs = self.parse_value()?;
        let op = match self.advance() {
            Some(Token { kind: TokenKind::Lt, .. }) => RelOp::Lt,
            Some(Token { kind: TokenKind::Gt, .. }) => RelOp::Gt,
            Some(Token { kind: TokenKind::Le, .. }) => RelOp::Le,
            Some(Token { kind: TokenKind::Ge, .. }) => RelOp::Ge,
            Some(Token { kind: TokenKind::Eq, .. }) => RelOp::Eq,
            Some(Token { kind: TokenKind::Neq, .. }) => RelOp::Ne,
            Some(token) => {
                return Err(ParseError::new(
                    format!(
                        "expected comparison operator, found '{}'",
                        token.kind
                    ),
                    token.line,
                ));
            }
            None => {
                return Err(ParseError::new(
                    "expected comparison operator, found end of input",
                    self.line(),
                ));
            }
        };
        let rhs = self.parse_value()?;
        Ok(Condition { lhs, op, rhs })
    }

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.parse_value()?;
        let op = match self.peek() {
            Some(TokenKind::Plus) => ArithOp::Add,
            Some(TokenKind::Minus) => ArithOp::Sub,
            Some(TokenKind::Times) => ArithOp::Mul,
            Some(TokenKind::Divide) => ArithOp::Div,
            Some(TokenKind::Modulo) => ArithOp::Mod,
            _ => return Ok(Expr::Value(lhs)),
        };
        self.advance();
        let rhs = self.parse_value()?;
        Ok(Expr::Binary { lhs, op, rhs })
    }

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        match self.peek() {
            Some(TokenKind::Num(_)) => {
                let n = self.expect_num()?;
                Ok(Value::Literal(n))
            }
            _ => Ok(Value::Ident(self.parse_identifier()?)),
        }
    }

    fn parse_identifier(&mut self) -> Result<Ident, ParseError> {
        let (name, _) = self.expect_pid()?;
        if self.peek() != Some(&TokenKind::LParen) {
            return Ok(Ident::Scalar(name));
        }
        self.advance();
        let index = match self.advance() {
            Some(Token { kind: TokenKind::Num(n), .. }) => Index::Literal(n),
            Some(Token { kind: TokenKind::Pid(pid), .. }) => {
                Index::Variable(pid)
            }
            Some(token) => {
                return Err(ParseError::new(
                    format!("expected array index, found '{}'", token.kind),
                    token.line,
                ));
            }
            None => {
                return Err(ParseError::new(
                    "expected array index, found end of input",
                    self.line(),
                ));
            }
        };
        self.expect(TokenKind::RParen)?;
        Ok(Ident::Element { array: name, index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_declarations_and_assignment() {
        let program = parse(
            "DECLARE a; t(1:5); IN a := 3; t(2) := a + 1; END",
        )
        .unwrap();
        let names: Vec<_> = program.decls.iter().map(Decl::name).collect();
        assert_eq!(names, ["a", "t"]);
        assert_eq!(
            program.decls[1],
            Decl::Array { name: "t".into(), line: 1, from: 1, to: 5 }
        );
        assert_eq!(
            program.body[0],
            Stmt::Assign {
                target: Ident::Scalar("a".into()),
                expr: Expr::Value(Value::Literal(3)),
            }
        );
        assert_eq!(
            program.body[1],
            Stmt::Assign {
                target: Ident::Element {
                    array: "t".into(),
                    index: Index::Literal(2),
                },
                expr: Expr::Binary {
                    lhs: Value::Ident(Ident::Scalar("a".into())),
                    op: ArithOp::Add,
                    rhs: Value::Literal(1),
                },
            }
        );
    }

    #[test]
    fn parses_if_else() {
        let program = parse(
            "DECLARE a; IN IF a > 1 THEN WRITE a; ELSE WRITE 0; ENDIF END",
        )
        .unwrap();
        match &program.body[0] {
            Stmt::IfElse { cond, then_body, else_body } => {
                assert_eq!(cond.op, RelOp::Gt);
                assert_eq!(then_body.len(), 1);
                assert_eq!(else_body.len(), 1);
            }
            other => panic!("expected IfElse, got {other:?}"),
        }
    }

    #[test]
    fn parses_for_and_downto() {
        let program = parse(
            "DECLARE s; IN \
             FOR i FROM 1 TO 3 DO WRITE i; ENDFOR \
             FOR j FROM 3 DOWNTO 0 DO WRITE j; ENDFOR \
             END",
        )
        .unwrap();
        assert!(matches!(&program.body[0], Stmt::For { iter, .. } if iter == "i"));
        assert!(
            matches!(&program.body[1], Stmt::ForDownTo { iter, .. } if iter == "j")
        );
    }

    #[test]
    fn do_while_tail_is_not_a_nested_loop() {
        let program = parse(
            "DECLARE a; IN DO a := a - 1; WHILE a > 0 ENDDO END",
        )
        .unwrap();
        match &program.body[0] {
            Stmt::DoWhile { body, cond } => {
                assert_eq!(body.len(), 1);
                assert_eq!(cond.op, RelOp::Gt);
            }
            other => panic!("expected DoWhile, got {other:?}"),
        }
    }

    #[test]
    fn nested_while_inside_do_is_a_loop() {
        let program = parse(
            "DECLARE a; b; IN \
             DO \
               WHILE b > 0 DO b := b - 1; ENDWHILE \
               a := a - 1; \
             WHILE a > 0 ENDDO \
             END",
        )
        .unwrap();
        match &program.body[0] {
            Stmt::DoWhile { body, cond } => {
                assert_eq!(body.len(), 2);
                assert!(matches!(body[0], Stmt::While { .. }));
                assert_eq!(cond.op, RelOp::Gt);
            }
            other => panic!("expected DoWhile, got {other:?}"),
        }
    }

    #[test]
    fn read_write_and_variable_index() {
        let program = parse(
            "DECLARE t(0:9); i; IN READ i; WRITE t(i); END",
        )
        .unwrap();
        assert_eq!(
            program.body[1],
            Stmt::Write {
                value: Value::Ident(Ident::Element {
                    array: "t".into(),
                    index: Index::Variable("i".into()),
                }),
            }
        );
    }

    #[test]
    fn trailing_tokens_after_end_are_rejected() {
        let err = parse("DECLARE a; IN a := 1; END WRITE a;").unwrap_err();
        assert!(err.message.contains("after END"));
    }

    #[test]
    fn missing_semicolon_is_reported_with_line() {
        let err = parse("DECLARE a;\nIN\na := 1\nEND").unwrap_err();
        assert_eq!(err.line, 4);
    }
}
