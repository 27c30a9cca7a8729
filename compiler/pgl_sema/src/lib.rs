// SPDX-License-Identifier: MIT
// Copyright (c) 2023 Kagati Foundation

use indexmap::IndexMap;

use pgl_ast::*;
use pgl_errors::CompileError;
use pgl_scope::{ScopeId, ScopeManager};
use pgl_types::{PglType, TypeRegistry};

pub type SemaResult<T> = Result<T, CompileError>;

#[derive(Debug, Clone)]
struct FuncSig {
    params: Vec<PglType>,
    ret: Option<PglType>,
}

/// Single top-to-bottom pass over the AST. Resolves a type for every
/// expression node (written into its `ty` slot), builds the scope tree
/// with stack offsets, and validates congruence at assignment, call
/// and return sites. The first fatal condition aborts the enclosing
/// function; there is no partial recovery.
pub struct SemanticAnalyzer<'t> {
    types: &'t TypeRegistry,
    scopes: &'t mut ScopeManager,
    functions: IndexMap<String, FuncSig>,
}

impl<'t> SemanticAnalyzer<'t> {
    pub fn new(types: &'t TypeRegistry, scopes: &'t mut ScopeManager) -> Self {
        Self {
            types,
            scopes,
            functions: IndexMap::new(),
        }
    }

    pub fn analyze_program(&mut self, program: &mut Program) -> SemaResult<()> {
        self.collect_signatures(program)?;
        for function in &mut program.functions {
            self.analyze_function(function)?;
        }
        Ok(())
    }

    /// Callee signatures must be visible before any body is analyzed
    /// so calls can resolve regardless of declaration order.
    fn collect_signatures(&mut self, program: &Program) -> SemaResult<()> {
        for function in &program.functions {
            let mut params = Vec::new();
            for arg in &function.args {
                params.push(self.types.lookup(&arg.type_name)?);
            }
            let ret = match function.rets.first() {
                Some(ret) => Some(self.types.lookup(&ret.type_name)?),
                None => None,
            };
            let sig = FuncSig { params, ret };
            if self.functions.insert(function.name.clone(), sig).is_some() {
                return Err(CompileError::DuplicateSymbol {
                    name: function.name.clone(),
                });
            }
        }
        Ok(())
    }

    fn analyze_function(&mut self, function: &mut Function) -> SemaResult<()> {
        let root = self.scopes.create_root();
        function.scope = Some(root);

        for arg in &mut function.args {
            let ty = self.types.lookup(&arg.type_name)?;
            arg.ty = Some(ty.clone());
            let name = arg.name.clone().ok_or_else(|| CompileError::UnsupportedConstruct {
                what: format!("unnamed parameter of function '{}'", function.name),
            })?;
            self.scopes.register(root, &name, ty)?;
        }

        for (index, ret) in function.rets.iter_mut().enumerate() {
            let ty = self.types.lookup(&ret.type_name)?;
            ret.ty = Some(ty.clone());
            let name = ret
                .name
                .get_or_insert_with(|| format!("ret{index}"))
                .clone();
            self.scopes.register(root, &name, ty)?;
        }

        let ret_ty = function.rets.first().and_then(|r| r.ty.clone());
        let body_scope = self.scopes.create_child(root);
        self.analyze_block(body_scope, &mut function.body, ret_ty.as_ref())
    }

    fn analyze_block(
        &mut self,
        scope: ScopeId,
        block: &mut StmtBlock,
        ret_ty: Option<&PglType>,
    ) -> SemaResult<()> {
        block.scope = Some(scope);
        for stmt in &mut block.statements {
            self.analyze_stmt(scope, stmt, ret_ty)?;
        }
        Ok(())
    }

    fn analyze_stmt(
        &mut self,
        scope: ScopeId,
        stmt: &mut Stmt,
        ret_ty: Option<&PglType>,
    ) -> SemaResult<()> {
        match stmt {
            Stmt::Return(ret) => {
                let found = self.resolve_expr(scope, &mut ret.expr)?;
                let expected = ret_ty.ok_or_else(|| CompileError::UnsupportedConstruct {
                    what: "return statement in a function with no declared returns".to_string(),
                })?;
                if &found != expected {
                    return Err(CompileError::TypeMismatch {
                        expected: expected.name().to_string(),
                        found: found.name().to_string(),
                        site: "return value",
                    });
                }
                Ok(())
            }

            Stmt::VarAssign(assign) => {
                let found = self.resolve_expr(scope, &mut assign.expr)?;
                if let Some(type_name) = &assign.type_name {
                    let declared = self.types.lookup(type_name)?;
                    if declared != found {
                        return Err(CompileError::TypeMismatch {
                            expected: declared.name().to_string(),
                            found: found.name().to_string(),
                            site: "variable declaration",
                        });
                    }
                }
                self.scopes.register(scope, &assign.name, found)?;
                Ok(())
            }

            Stmt::Expr(stmt) => {
                self.resolve_expr(scope, &mut stmt.expr)?;
                Ok(())
            }

            Stmt::Block(block) => {
                let child = self.scopes.create_child(scope);
                self.analyze_block(child, block, ret_ty)
            }
        }
    }

    fn resolve_expr(&mut self, scope: ScopeId, expr: &mut Expr) -> SemaResult<PglType> {
        match expr {
            Expr::Binary(bin) => {
                let left = self.resolve_expr(scope, &mut bin.left)?;
                let right = self.resolve_expr(scope, &mut bin.right)?;
                // No implicit numeric promotion: operand types must be
                // the same registered instance.
                if left != right {
                    return Err(CompileError::TypeMismatch {
                        expected: left.name().to_string(),
                        found: right.name().to_string(),
                        site: "binary operand",
                    });
                }
                bin.ty = Some(left.clone());
                Ok(left)
            }

            Expr::IntLit(lit) => {
                let ty = self.classify_integer(&lit.text, false)?;
                lit.ty = Some(ty.clone());
                Ok(ty)
            }

            Expr::FloatLit(lit) => {
                let ty = self.classify_float(&lit.text)?;
                lit.ty = Some(ty.clone());
                Ok(ty)
            }

            Expr::StrLit(_) => Err(CompileError::UnsupportedConstruct {
                what: "string literal in value position".to_string(),
            }),

            Expr::Ident(ident) => {
                let sym = self.scopes.lookup(scope, &ident.name)?;
                ident.ty = Some(sym.ty.clone());
                Ok(sym.ty.clone())
            }

            Expr::UnaryNeg(neg) => {
                let ty = match &mut *neg.expr {
                    Expr::IntLit(lit) => {
                        let ty = self.classify_integer(&lit.text, true)?;
                        lit.ty = Some(ty.clone());
                        ty
                    }
                    Expr::FloatLit(lit) => {
                        let ty = self.classify_float(&lit.text)?;
                        lit.ty = Some(ty.clone());
                        ty
                    }
                    _ => {
                        return Err(CompileError::UnsupportedConstruct {
                            what: "unary negation of a non-literal expression".to_string(),
                        })
                    }
                };
                neg.ty = Some(ty.clone());
                Ok(ty)
            }

            Expr::Call(call) => {
                let sig = self
                    .functions
                    .get(&call.name)
                    .cloned()
                    .ok_or_else(|| CompileError::UnknownSymbol {
                        name: call.name.clone(),
                    })?;
                if call.args.len() != sig.params.len() {
                    return Err(CompileError::ArgumentCountMismatch {
                        name: call.name.clone(),
                        expected: sig.params.len(),
                        found: call.args.len(),
                    });
                }
                for (arg, param) in call.args.iter_mut().zip(&sig.params) {
                    let found = self.resolve_expr(scope, arg)?;
                    if &found != param {
                        return Err(CompileError::TypeMismatch {
                            expected: param.name().to_string(),
                            found: found.name().to_string(),
                            site: "call argument",
                        });
                    }
                }
                let ret = sig.ret.ok_or_else(|| CompileError::UnsupportedConstruct {
                    what: format!("call to '{}', which returns nothing, in value position", call.name),
                })?;
                call.ty = Some(ret.clone());
                Ok(ret)
            }
        }
    }

    /// Width minimality: the smallest {8,16,32,64}-bit type whose
    /// representable range covers the value. Non-negative literals take
    /// the unsigned variant; a negated literal folds its sign in and
    /// takes the signed variant.
    fn classify_integer(&self, text: &str, negated: bool) -> SemaResult<PglType> {
        let magnitude: u64 = text.parse().map_err(|_| CompileError::UnsupportedConstruct {
            what: format!("integer literal `{text}` does not fit in 64 bits"),
        })?;

        let name = if !negated {
            if magnitude <= u8::MAX as u64 {
                "u8"
            } else if magnitude <= u16::MAX as u64 {
                "u16"
            } else if magnitude <= u32::MAX as u64 {
                "u32"
            } else {
                "u64"
            }
        } else {
            let value = -(magnitude as i128);
            if value >= i8::MIN as i128 {
                "i8"
            } else if value >= i16::MIN as i128 {
                "i16"
            } else if value >= i32::MIN as i128 {
                "i32"
            } else if value >= i64::MIN as i128 {
                "i64"
            } else {
                return Err(CompileError::UnsupportedConstruct {
                    what: format!("integer literal `-{text}` does not fit in 64 bits"),
                });
            }
        };
        self.types.lookup(name)
    }

    /// A literal that parses identically at 32-bit precision is `f32`;
    /// one that loses precision is `f64`.
    fn classify_float(&self, text: &str) -> SemaResult<PglType> {
        let wide: f64 = text.parse().map_err(|_| CompileError::UnsupportedConstruct {
            what: format!("malformed float literal `{text}`"),
        })?;
        let narrow: f32 = text.parse().map_err(|_| CompileError::UnsupportedConstruct {
            what: format!("malformed float literal `{text}`"),
        })?;

        let name = if narrow as f64 == wide { "f32" } else { "f64" };
        self.types.lookup(name)
    }
}
