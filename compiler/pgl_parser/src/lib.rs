// SPDX-License-Identifier: MIT
// Copyright (c) 2023 Kagati Foundation

use pgl_ast::*;
use pgl_errors::code::ErrCode;
use pgl_errors::diagnostic::Diagnostic;
use pgl_token::{Token, TokenKind, TokenPos};

pub type ParseResult<T> = Result<T, Diagnostic>;

/// Token-stream parser producing one `Program` per source file. The
/// token list must end with a `T_EOF` sentinel.
pub struct Parser {
    file: String,
    tokens: Vec<Token>,
    index: usize,
}

impl Parser {
    pub fn new(file: impl Into<String>, tokens: Vec<Token>) -> Self {
        Self {
            file: file.into(),
            tokens,
            index: 0,
        }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.tokens[(self.index + 1).min(self.tokens.len() - 1)]
    }

    fn eat_token(&mut self) -> Token {
        let token = self.current().clone();
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
        token
    }

    fn expect_token(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.current().kind != kind {
            return Err(self.error(format!(
                "expected {:?}, but found {}",
                kind,
                self.current()
            )));
        }
        Ok(self.eat_token())
    }

    pub fn parse(mut self) -> ParseResult<Program> {
        let mut functions = Vec::new();
        while self.current().kind != TokenKind::T_EOF {
            match self.current().kind {
                TokenKind::KW_FN => functions.push(self.expect_function()?),
                _ => {
                    return Err(self.error(format!("unexpected token {}", self.current())));
                }
            }
        }
        Ok(Program { functions })
    }

    /// `fn name(a: i32, b: i32) = r: i32 { ... }`. Returns may be
    /// named (`r: i32`) or bare type names, comma-separated.
    fn expect_function(&mut self) -> ParseResult<Function> {
        self.expect_token(TokenKind::KW_FN)?;
        let name = self.expect_token(TokenKind::T_IDENT)?.lexeme;

        let mut args = Vec::new();
        self.expect_token(TokenKind::T_LPAREN)?;
        while self.current().kind != TokenKind::T_RPAREN {
            if !args.is_empty() {
                self.expect_token(TokenKind::T_COMMA)?;
            }
            args.push(self.expect_named_decl()?);
        }
        self.expect_token(TokenKind::T_RPAREN)?;

        let mut rets = Vec::new();
        if self.current().kind == TokenKind::T_EQUAL {
            self.expect_token(TokenKind::T_EQUAL)?;
            while self.current().kind != TokenKind::T_LBRACE {
                if !rets.is_empty() {
                    self.expect_token(TokenKind::T_COMMA)?;
                }
                if self.peek().kind == TokenKind::T_COLON {
                    // named return
                    rets.push(self.expect_named_decl()?);
                } else {
                    let type_name = self.expect_type_identifier()?;
                    rets.push(TypedDecl {
                        name: None,
                        type_name,
                        ty: None,
                    });
                }
            }
        }

        let body = self.expect_statement_block()?;
        Ok(Function {
            name,
            args,
            rets,
            body,
            scope: None,
        })
    }

    fn expect_named_decl(&mut self) -> ParseResult<TypedDecl> {
        let name = self.expect_token(TokenKind::T_IDENT)?.lexeme;
        self.expect_token(TokenKind::T_COLON)?;
        let type_name = self.expect_type_identifier()?;
        Ok(TypedDecl {
            name: Some(name),
            type_name,
            ty: None,
        })
    }

    fn expect_type_identifier(&mut self) -> ParseResult<String> {
        if self.current().kind == TokenKind::T_IDENT || self.current().kind.is_type_keyword() {
            return Ok(self.eat_token().lexeme);
        }
        Err(self.error(format!(
            "expected a type name, but found {}",
            self.current()
        )))
    }

    fn expect_statement_block(&mut self) -> ParseResult<StmtBlock> {
        self.expect_token(TokenKind::T_LBRACE)?;
        let mut statements = Vec::new();
        while self.current().kind != TokenKind::T_RBRACE {
            if self.current().kind == TokenKind::T_EOF {
                return Err(self.error("unterminated statement block"));
            }
            statements.push(self.expect_statement()?);
        }
        self.expect_token(TokenKind::T_RBRACE)?;
        Ok(StmtBlock::new(statements))
    }

    fn expect_statement(&mut self) -> ParseResult<Stmt> {
        match self.current().kind {
            TokenKind::KW_RETURN => {
                self.expect_token(TokenKind::KW_RETURN)?;
                let expr = self.expect_expression()?;
                self.expect_token(TokenKind::T_SEMICOLON)?;
                Ok(Stmt::Return(ReturnStmt { expr }))
            }
            TokenKind::T_LBRACE => Ok(Stmt::Block(self.expect_statement_block()?)),
            TokenKind::T_IDENT => {
                if self.peek().kind == TokenKind::T_COLON {
                    // `name : [type]? = expr ;`
                    let name = self.expect_token(TokenKind::T_IDENT)?.lexeme;
                    self.expect_token(TokenKind::T_COLON)?;
                    let type_name = if self.current().kind != TokenKind::T_EQUAL {
                        Some(self.expect_type_identifier()?)
                    } else {
                        None
                    };
                    self.expect_token(TokenKind::T_EQUAL)?;
                    let expr = self.expect_expression()?;
                    self.expect_token(TokenKind::T_SEMICOLON)?;
                    Ok(Stmt::VarAssign(VarAssignStmt {
                        name,
                        type_name,
                        expr,
                    }))
                } else {
                    let expr = self.expect_call_expression()?;
                    self.expect_token(TokenKind::T_SEMICOLON)?;
                    Ok(Stmt::Expr(ExprStmt { expr }))
                }
            }
            _ => Err(self.error(format!(
                "cannot resolve statement at {}",
                self.current()
            ))),
        }
    }

    fn expect_expression(&mut self) -> ParseResult<Expr> {
        if self.current().kind == TokenKind::T_STRLIT {
            return self.expect_term_expression();
        }
        self.expect_binary_expression()
    }

    fn is_operator(&self, kind: TokenKind) -> bool {
        kind.is_binary_operator()
    }

    fn is_arithmetic_token(&self, token: &Token) -> bool {
        token.kind == TokenKind::T_IDENT
            || token.kind.is_binary_operator()
            || token.kind == TokenKind::T_LPAREN
            || token.kind == TokenKind::T_INTLIT
            || token.kind == TokenKind::T_FLOATLIT
    }

    fn expect_binary_operator(&mut self) -> ParseResult<BinOp> {
        let op = match self.current().kind {
            TokenKind::T_PLUS => BinOp::Addition,
            TokenKind::T_MINUS => BinOp::Subtraction,
            TokenKind::T_STAR => BinOp::Multiplication,
            TokenKind::T_SLASH => BinOp::Division,
            _ => {
                return Err(self.error(format!(
                    "unexpected binary operator {}",
                    self.current()
                )))
            }
        };
        self.eat_token();
        Ok(op)
    }

    /// The two-stack operator/term algorithm: terms accumulate on one
    /// stack, operators on the other. An incoming operator reduces the
    /// stacks while the stacked operator has `>=` rank, so ties fold
    /// left-to-right and `*`/`/` bind before `+`/`-`.
    fn expect_binary_expression(&mut self) -> ParseResult<Expr> {
        let mut terms: Vec<Expr> = Vec::new();
        let mut operators: Vec<BinOp> = Vec::new();

        while self.is_arithmetic_token(self.current()) {
            // The stacks alternate term, operator, term, ...; equal
            // depths mean a term is due, so a `-` here is a negation.
            let expecting_term = terms.len() == operators.len();
            if self.is_operator(self.current().kind) && !expecting_term {
                let op = self.expect_binary_operator()?;

                while let Some(&top) = operators.last() {
                    if !top.is_higher_precedence_than(op) {
                        break;
                    }
                    Self::reduce(&mut terms, &mut operators, self)?;
                }
                operators.push(op);
            } else if self.current().kind == TokenKind::T_LPAREN {
                self.expect_token(TokenKind::T_LPAREN)?;
                terms.push(self.expect_binary_expression()?);
                self.expect_token(TokenKind::T_RPAREN)?;
            } else {
                terms.push(self.expect_term_expression()?);
            }
        }

        while terms.len() > 1 {
            Self::reduce(&mut terms, &mut operators, self)?;
        }

        terms
            .pop()
            .ok_or_else(|| self.error("expected an expression"))
    }

    fn reduce(terms: &mut Vec<Expr>, operators: &mut Vec<BinOp>, parser: &Parser) -> ParseResult<()> {
        let (Some(right), Some(op), Some(left)) = (terms.pop(), operators.pop(), terms.pop())
        else {
            return Err(parser.error("malformed arithmetic expression"));
        };
        terms.push(Expr::Binary(BinExpr {
            left: Box::new(left),
            op,
            right: Box::new(right),
            ty: None,
        }));
        Ok(())
    }

    fn expect_term_expression(&mut self) -> ParseResult<Expr> {
        match self.current().kind {
            TokenKind::T_MINUS => {
                self.expect_token(TokenKind::T_MINUS)?;
                let term = self.expect_term_expression()?;
                Ok(Expr::UnaryNeg(UnaryNegExpr {
                    expr: Box::new(term),
                    ty: None,
                }))
            }
            TokenKind::T_INTLIT => {
                let token = self.eat_token();
                Ok(Expr::IntLit(IntLitExpr {
                    text: token.lexeme,
                    ty: None,
                }))
            }
            TokenKind::T_FLOATLIT => {
                let token = self.eat_token();
                Ok(Expr::FloatLit(FloatLitExpr {
                    text: token.lexeme,
                    ty: None,
                }))
            }
            TokenKind::T_STRLIT => {
                let token = self.eat_token();
                Ok(Expr::StrLit(StrLitExpr {
                    text: token.lexeme,
                    ty: None,
                }))
            }
            TokenKind::T_IDENT => {
                if self.peek().kind == TokenKind::T_LPAREN {
                    self.expect_call_expression()
                } else {
                    let token = self.eat_token();
                    Ok(Expr::Ident(IdentExpr {
                        name: token.lexeme,
                        ty: None,
                    }))
                }
            }
            _ => Err(self.error(format!(
                "unexpected term expression at {}",
                self.current()
            ))),
        }
    }

    fn expect_call_expression(&mut self) -> ParseResult<Expr> {
        let name = self.expect_token(TokenKind::T_IDENT)?.lexeme;
        self.expect_token(TokenKind::T_LPAREN)?;
        let mut args = Vec::new();
        while self.current().kind != TokenKind::T_RPAREN {
            if !args.is_empty() {
                self.expect_token(TokenKind::T_COMMA)?;
            }
            args.push(self.expect_expression()?);
        }
        self.expect_token(TokenKind::T_RPAREN)?;
        Ok(Expr::Call(CallExpr {
            name,
            args,
            ty: None,
        }))
    }

    fn error(&self, message: impl Into<String>) -> Diagnostic {
        let TokenPos { line, column } = self.current().pos;
        Diagnostic::error(ErrCode::SYN1001, self.file.clone(), line, column, message)
    }
}
