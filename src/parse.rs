use crate::ast::{BinOp, Expr, Stmt};
use crate::error::{CompileResult, Expected};
use crate::lex::{Lexer, TokenType};

/// Deepest syntax tree the parser will build. Code generation, printing and
/// dropping all recurse over the tree, so this also bounds their stack use.
pub const MAX_DEPTH: usize = 256;

/// Recursive-descent parser, one method per grammar rule.
pub struct Parser<'de> {
    lexer: Lexer<'de>,
    depth: usize,
}

impl<'de> Parser<'de> {
    pub fn new(source: &'de str) -> Self {
        Parser {
            lexer: Lexer::new(source),
            depth: 0,
        }
    }

    /// `<program> ::= <statement>`, followed by the end of input.
    pub fn parse(mut self) -> CompileResult<Stmt> {
        let program = self.statement()?;
        self.lexer
            .expect_where(|t| t.kind == TokenType::Eof, Expected::EndOfInput)?;
        Ok(program)
    }

    /// Goes one level deeper into the tree, failing past `MAX_DEPTH`.
    fn descend(&mut self) -> CompileResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            let token = *self.lexer.peek()?;
            return Err(self.lexer.nesting_too_deep(&token, MAX_DEPTH));
        }
        Ok(())
    }

    fn statement(&mut self) -> CompileResult<Stmt> {
        self.descend()?;
        let stmt = self.statement_kind();
        self.depth -= 1;
        stmt
    }

    fn statement_kind(&mut self) -> CompileResult<Stmt> {
        match self.lexer.peek_kind()? {
            TokenType::If => {
                self.lexer.next_token()?;
                let cond = self.paren_expr()?;
                let then_branch = self.statement()?;
                // The else binds to the innermost if that is still open.
                let else_branch = if self.lexer.peek_kind()? == TokenType::Else {
                    self.lexer.next_token()?;
                    Some(self.statement()?)
                } else {
                    None
                };
                Ok(Stmt::if_else(cond, then_branch, else_branch))
            }

            TokenType::While => {
                self.lexer.next_token()?;
                let cond = self.paren_expr()?;
                let body = self.statement()?;
                Ok(Stmt::while_loop(cond, body))
            }

            TokenType::Do => {
                self.lexer.next_token()?;
                let body = self.statement()?;
                self.lexer.expect(TokenType::While)?;
                let cond = self.paren_expr()?;
                self.lexer.expect(TokenType::Semicolon)?;
                Ok(Stmt::do_while(body, cond))
            }

            TokenType::Semicolon => {
                self.lexer.next_token()?;
                Ok(Stmt::Empty)
            }

            TokenType::LeftBrace => {
                self.lexer.next_token()?;
                let mut stmts = Vec::new();
                loop {
                    match self.lexer.peek_kind()? {
                        TokenType::RightBrace => break,
                        TokenType::Eof => {
                            let token = self.lexer.next_token()?;
                            return Err(self
                                .lexer
                                .unexpected(&token, Expected::Token(TokenType::RightBrace)));
                        }
                        _ => stmts.push(self.statement()?),
                    }
                }
                self.lexer.next_token()?;
                Ok(Stmt::Sequence(stmts))
            }

            _ => {
                let expr = self.expr()?;
                self.lexer.expect(TokenType::Semicolon)?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    /// `<paren_expr> ::= "(" <expr> ")"`
    fn paren_expr(&mut self) -> CompileResult<Expr> {
        self.lexer.expect(TokenType::LeftParen)?;
        let expr = self.expr()?;
        self.lexer.expect(TokenType::RightParen)?;
        Ok(expr)
    }

    /// `<expr> ::= <test> | <id> "=" <expr>`
    fn expr(&mut self) -> CompileResult<Expr> {
        self.descend()?;
        let expr = self.assignment();
        self.depth -= 1;
        expr
    }

    fn assignment(&mut self) -> CompileResult<Expr> {
        let starts_with_id = matches!(self.lexer.peek_kind()?, TokenType::Identifier(_));
        let test = self.test()?;

        // A test that began with an identifier and is still a bare variable
        // consumed exactly that identifier, so `=` makes it an assignment.
        if let Expr::Var(target) = test {
            if starts_with_id && self.lexer.peek_kind()? == TokenType::Equal {
                self.lexer.next_token()?;
                let value = self.expr()?;
                return Ok(Expr::assign(target, value));
            }
        }
        Ok(test)
    }

    /// `<test> ::= <sum> | <sum> "<" <sum>`
    fn test(&mut self) -> CompileResult<Expr> {
        let left = self.sum()?;
        if self.lexer.peek_kind()? == TokenType::Less {
            self.lexer.next_token()?;
            let right = self.sum()?;
            return Ok(Expr::binary(BinOp::Less, left, right));
        }
        Ok(left)
    }

    /// `<sum> ::= <term> | <sum> "+" <term> | <sum> "-" <term>`
    fn sum(&mut self) -> CompileResult<Expr> {
        let mut lhs = self.term()?;
        // Each operator nests everything parsed so far one level deeper.
        let mut levels = 0;
        loop {
            let op = match self.lexer.peek_kind()? {
                TokenType::Plus => BinOp::Add,
                TokenType::Minus => BinOp::Sub,
                _ => break,
            };
            self.lexer.next_token()?;
            self.descend()?;
            levels += 1;
            let rhs = self.term()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        self.depth -= levels;
        Ok(lhs)
    }

    /// `<term> ::= <id> | <int> | <paren_expr>`
    fn term(&mut self) -> CompileResult<Expr> {
        match self.lexer.peek_kind()? {
            TokenType::Identifier(var) => {
                self.lexer.next_token()?;
                Ok(Expr::Var(var))
            }
            TokenType::Number(n) => {
                self.lexer.next_token()?;
                Ok(Expr::Const(n))
            }
            TokenType::LeftParen => self.paren_expr(),
            _ => {
                let token = self.lexer.next_token()?;
                Err(self.lexer.unexpected(&token, Expected::Expression))
            }
        }
    }
}

pub fn parse(source: &str) -> CompileResult<Stmt> {
    Parser::new(source).parse()
}
