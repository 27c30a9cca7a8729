// SPDX-License-Identifier: MIT
// Copyright (c) 2023 Kagati Foundation

use std::fmt::Display;

use itertools::Itertools;

use pgl_scope::ScopeId;
use pgl_types::PglType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Subtraction,
    Addition,
    Division,
    Multiplication,
}

impl BinOp {
    /// Operator rank: multiplicative operators bind tighter than
    /// additive ones.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Addition | Self::Subtraction => 1,
            Self::Multiplication | Self::Division => 2,
        }
    }

    /// Ordinal `>=` on ranks. Equal-precedence operators compare as
    /// higher so that ties reduce left-to-right instead of rotating
    /// the tree rightwards.
    pub fn is_higher_precedence_than(&self, other: BinOp) -> bool {
        self.precedence() >= other.precedence()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subtraction => "-",
            Self::Addition => "+",
            Self::Division => "/",
            Self::Multiplication => "*",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinExpr {
    pub left: Box<Expr>,
    pub op: BinOp,
    pub right: Box<Expr>,
    pub ty: Option<PglType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntLitExpr {
    pub text: String,
    pub ty: Option<PglType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloatLitExpr {
    pub text: String,
    pub ty: Option<PglType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrLitExpr {
    pub text: String,
    pub ty: Option<PglType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentExpr {
    pub name: String,
    pub ty: Option<PglType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryNegExpr {
    pub expr: Box<Expr>,
    pub ty: Option<PglType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub name: String,
    pub args: Vec<Expr>,
    pub ty: Option<PglType>,
}

/// Expression node. The `ty` slot of every variant is unset at parse
/// time, written exactly once by semantic analysis, and read-only for
/// code generation.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Binary(BinExpr),
    IntLit(IntLitExpr),
    FloatLit(FloatLitExpr),
    StrLit(StrLitExpr),
    Ident(IdentExpr),
    UnaryNeg(UnaryNegExpr),
    Call(CallExpr),
}

impl Expr {
    pub fn ty(&self) -> Option<&PglType> {
        match self {
            Self::Binary(e) => e.ty.as_ref(),
            Self::IntLit(e) => e.ty.as_ref(),
            Self::FloatLit(e) => e.ty.as_ref(),
            Self::StrLit(e) => e.ty.as_ref(),
            Self::Ident(e) => e.ty.as_ref(),
            Self::UnaryNeg(e) => e.ty.as_ref(),
            Self::Call(e) => e.ty.as_ref(),
        }
    }

    /// A terminal is an expression that can become an instruction
    /// operand directly, without going through a scratch register.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::IntLit(_) | Self::FloatLit(_) | Self::Ident(_) | Self::UnaryNeg(_)
        )
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Binary(e) => write!(f, "{} {} {}", e.left, e.op.as_str(), e.right),
            Self::IntLit(e) => write!(f, "{}", e.text),
            Self::FloatLit(e) => write!(f, "{}", e.text),
            Self::StrLit(e) => write!(f, "\"{}\"", e.text),
            Self::Ident(e) => write!(f, "{}", e.name),
            Self::UnaryNeg(e) => write!(f, "-{}", e.expr),
            Self::Call(e) => {
                write!(f, "{}({})", e.name, e.args.iter().map(|a| a.to_string()).join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarAssignStmt {
    pub name: String,
    /// Explicit type annotation, absent for implicit typing.
    pub type_name: Option<String>,
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprStmt {
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Return(ReturnStmt),
    VarAssign(VarAssignStmt),
    Expr(ExprStmt),
    Block(StmtBlock),
}

/// A `{ ... }` region. Analysis assigns it its own scope; code
/// generation resolves symbols through that scope id.
#[derive(Debug, Clone, PartialEq)]
pub struct StmtBlock {
    pub statements: Vec<Stmt>,
    pub scope: Option<ScopeId>,
}

impl StmtBlock {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self {
            statements,
            scope: None,
        }
    }
}

/// A declared parameter or return slot: `name: type`. Return slots may
/// be anonymous in source; analysis synthesizes `ret{i}` names for
/// them before symbol registration.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedDecl {
    pub name: Option<String>,
    pub type_name: String,
    pub ty: Option<PglType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub args: Vec<TypedDecl>,
    pub rets: Vec<TypedDecl>,
    pub body: StmtBlock,
    /// Root scope holding the argument and return symbols.
    pub scope: Option<ScopeId>,
}

impl Function {
    /// Display signature used for `Function` marker instructions and
    /// listings, e.g. `fn add(a: i32, b: i32) = r: i32`.
    pub fn signature(&self) -> String {
        let args = self
            .args
            .iter()
            .map(|a| format!("{}: {}", a.name.as_deref().unwrap_or("_"), a.type_name))
            .join(", ");
        let mut sig = format!("fn {}({})", self.name, args);
        if !self.rets.is_empty() {
            let rets = self
                .rets
                .iter()
                .map(|r| match &r.name {
                    Some(name) => format!("{}: {}", name, r.type_name),
                    None => r.type_name.clone(),
                })
                .join(", ");
            sig.push_str(&format!(" = {}", rets));
        }
        sig
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub functions: Vec<Function>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_ranks() {
        assert!(BinOp::Multiplication.is_higher_precedence_than(BinOp::Addition));
        assert!(!BinOp::Addition.is_higher_precedence_than(BinOp::Multiplication));
        // Ties compare as higher: equal-precedence reduces left-to-right.
        assert!(BinOp::Addition.is_higher_precedence_than(BinOp::Subtraction));
        assert!(BinOp::Subtraction.is_higher_precedence_than(BinOp::Addition));
        assert!(BinOp::Division.is_higher_precedence_than(BinOp::Multiplication));
    }

    #[test]
    fn signature_display() {
        let func = Function {
            name: "add".to_string(),
            args: vec![
                TypedDecl {
                    name: Some("a".to_string()),
                    type_name: "i32".to_string(),
                    ty: None,
                },
                TypedDecl {
                    name: Some("b".to_string()),
                    type_name: "i32".to_string(),
                    ty: None,
                },
            ],
            rets: vec![TypedDecl {
                name: None,
                type_name: "i32".to_string(),
                ty: None,
            }],
            body: StmtBlock::new(vec![]),
            scope: None,
        };
        assert_eq!(func.signature(), "fn add(a: i32, b: i32) = i32");
    }
}
