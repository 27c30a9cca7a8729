// SPDX-License-Identifier: MIT
// Copyright (c) 2023 Kagati Foundation

use pgl_ast::*;
use pgl_errors::CompileError;
use pgl_ir::{InstructionUnit, Opcode, Operand, Register};
use pgl_scope::{ScopeId, ScopeManager};
use pgl_types::PglType;

pub type CodegenResult<T> = Result<T, CompileError>;

/// Lowers the type-annotated, symbol-resolved AST into a linear
/// instruction sequence. Expression results land in the requested
/// destination register; nested binary operands are computed through
/// the `RTmp1`/`RTmp2` scratch registers, which never survive a
/// statement boundary.
///
/// The analyzer must have run first: every expression's `ty` slot and
/// every block's scope id is read here, and a missing one is a
/// pipeline-ordering bug, not an input error.
pub struct CodeGenerator<'t> {
    scopes: &'t ScopeManager,
    unit: InstructionUnit,
}

impl<'t> CodeGenerator<'t> {
    pub fn new(scopes: &'t ScopeManager) -> Self {
        Self {
            scopes,
            unit: InstructionUnit::new(),
        }
    }

    pub fn generate(mut self, program: &Program) -> CodegenResult<InstructionUnit> {
        for function in &program.functions {
            self.gen_function(function)?;
        }
        Ok(self.unit)
    }

    fn gen_function(&mut self, function: &Function) -> CodegenResult<()> {
        self.unit.func(function.signature());
        self.gen_block(&function.body, function)
    }

    fn gen_block(&mut self, block: &StmtBlock, function: &Function) -> CodegenResult<()> {
        let scope = block.scope.expect("analyzer must assign block scopes before codegen");
        for stmt in &block.statements {
            self.gen_stmt(scope, stmt, function)?;
        }
        Ok(())
    }

    fn gen_stmt(&mut self, scope: ScopeId, stmt: &Stmt, function: &Function) -> CodegenResult<()> {
        match stmt {
            Stmt::Expr(stmt) => {
                // Result computed into R1 and discarded.
                self.lower_expr(scope, Register::R1, &stmt.expr)
            }

            Stmt::Return(ret) => {
                let dest = Register::R1;
                self.lower_expr(scope, dest, &ret.expr)?;

                let ret_name = function
                    .rets
                    .first()
                    .and_then(|r| r.name.as_deref())
                    .expect("analyzer must name return slots before codegen");
                let sym = self.scopes.lookup(scope, ret_name)?;
                let width = sym.ty.byte_size();
                self.unit.mov(
                    Operand::RelAddr {
                        base: Register::RSP,
                        offset: sym.stack_offset as i32,
                        width,
                    },
                    Operand::Reg { reg: dest, width },
                    format!("{ret_name} = {dest}"),
                );
                self.unit.ret();
                Ok(())
            }

            Stmt::VarAssign(assign) => {
                let dest = Register::R1;
                self.lower_expr(scope, dest, &assign.expr)?;

                let sym = self.scopes.lookup(scope, &assign.name)?;
                let width = sym.ty.byte_size();
                self.unit.mov(
                    Operand::RelAddr {
                        base: Register::RSP,
                        offset: sym.stack_offset as i32,
                        width,
                    },
                    Operand::Reg { reg: dest, width },
                    format!("{} = {dest}", assign.name),
                );
                Ok(())
            }

            Stmt::Block(block) => self.gen_block(block, function),
        }
    }

    fn lower_expr(&mut self, scope: ScopeId, dest: Register, expr: &Expr) -> CodegenResult<()> {
        match expr {
            Expr::Binary(bin) => self.lower_binary(scope, dest, bin),

            _ if expr.is_terminal() => {
                let operand = self.term_operand(scope, expr)?;
                let width = operand.width();
                self.unit.mov(
                    Operand::Reg { reg: dest, width },
                    operand,
                    format!("{dest} = {expr}"),
                );
                Ok(())
            }

            Expr::Call(call) => Err(CompileError::UnsupportedConstruct {
                what: format!("lowering of call to '{}'", call.name),
            }),

            _ => Err(CompileError::UnsupportedConstruct {
                what: format!("lowering of expression `{expr}`"),
            }),
        }
    }

    fn lower_binary(&mut self, scope: ScopeId, dest: Register, bin: &BinExpr) -> CodegenResult<()> {
        let left_ty = expr_ty(&bin.left);
        let right_ty = expr_ty(&bin.right);

        // The analyzer already proved type congruence; disagreeing
        // widths here are an internal fault.
        if left_ty.byte_size() != right_ty.byte_size() {
            return Err(CompileError::WidthMismatch {
                left: left_ty.byte_size(),
                right: right_ty.byte_size(),
            });
        }
        let width = left_ty.byte_size();

        let (left_operand, left_desc) = if bin.left.is_terminal() {
            (self.term_operand(scope, &bin.left)?, bin.left.to_string())
        } else {
            self.lower_expr(scope, Register::RTmp1, &bin.left)?;
            let reg = Register::RTmp1;
            (Operand::Reg { reg, width }, reg.to_string())
        };

        let (right_operand, right_desc) = if bin.right.is_terminal() {
            (self.term_operand(scope, &bin.right)?, bin.right.to_string())
        } else {
            self.lower_expr(scope, Register::RTmp2, &bin.right)?;
            let reg = Register::RTmp2;
            (Operand::Reg { reg, width }, reg.to_string())
        };

        let comment = format!("{left_desc} {} {right_desc}", bin.op.as_str());
        let opcode = select_opcode(bin.op, left_ty, right_ty)?;
        match opcode {
            Opcode::Addi => self.unit.addi(dest, left_operand, right_operand, width, comment),
            Opcode::Addu => self.unit.addu(dest, left_operand, right_operand, width, comment),
            Opcode::Addf => self.unit.addf(dest, left_operand, right_operand, width, comment),
            Opcode::Subi => self.unit.subi(dest, left_operand, right_operand, width, comment),
            Opcode::Subu => self.unit.subu(dest, left_operand, right_operand, width, comment),
            Opcode::Subf => self.unit.subf(dest, left_operand, right_operand, width, comment),
            Opcode::Muli => self.unit.muli(dest, left_operand, right_operand, width, comment),
            Opcode::Mulu => self.unit.mulu(dest, left_operand, right_operand, width, comment),
            Opcode::Mulf => self.unit.mulf(dest, left_operand, right_operand, width, comment),
            Opcode::Divi => self.unit.divi(dest, left_operand, right_operand, width, comment),
            Opcode::Divu => self.unit.divu(dest, left_operand, right_operand, width, comment),
            Opcode::Divf => self.unit.divf(dest, left_operand, right_operand, width, comment),
            _ => unreachable!("select_opcode only returns arithmetic opcodes"),
        };
        Ok(())
    }

    /// Terminals become operands directly, without consuming a
    /// register: literals as immediates, variable references as
    /// stack-relative addresses, negated literals as signed
    /// immediates with the sign folded into the text.
    fn term_operand(&mut self, scope: ScopeId, expr: &Expr) -> CodegenResult<Operand> {
        match expr {
            Expr::IntLit(lit) => {
                let ty = lit.ty.as_ref().expect("analyzer must type literals before codegen");
                Ok(Operand::ImmInt {
                    signed: ty.is_signed_integer(),
                    width: ty.byte_size(),
                    text: lit.text.clone(),
                })
            }

            Expr::FloatLit(lit) => {
                let ty = lit.ty.as_ref().expect("analyzer must type literals before codegen");
                Ok(Operand::ImmFloat {
                    width: ty.byte_size(),
                    text: lit.text.clone(),
                })
            }

            Expr::UnaryNeg(neg) => {
                let ty = neg.ty.as_ref().expect("analyzer must type literals before codegen");
                match &*neg.expr {
                    Expr::IntLit(lit) => Ok(Operand::ImmInt {
                        signed: true,
                        width: ty.byte_size(),
                        text: format!("-{}", lit.text),
                    }),
                    Expr::FloatLit(lit) => Ok(Operand::ImmFloat {
                        width: ty.byte_size(),
                        text: format!("-{}", lit.text),
                    }),
                    _ => Err(CompileError::UnsupportedConstruct {
                        what: "unary negation of a non-literal expression".to_string(),
                    }),
                }
            }

            Expr::Ident(ident) => {
                let sym = self.scopes.lookup(scope, &ident.name)?;
                Ok(Operand::RelAddr {
                    base: Register::RSP,
                    offset: sym.stack_offset as i32,
                    width: sym.ty.byte_size(),
                })
            }

            _ => Err(CompileError::UnsupportedConstruct {
                what: format!("`{expr}` cannot be used as an instruction operand"),
            }),
        }
    }
}

fn expr_ty(expr: &Expr) -> &PglType {
    expr.ty().expect("analyzer must type expressions before codegen")
}

/// Opcode selection precedence: both operands signed integer, then
/// both integer, then both real; anything else has no opcode.
fn select_opcode(op: BinOp, left: &PglType, right: &PglType) -> CodegenResult<Opcode> {
    let selected = if left.is_signed_integer() && right.is_signed_integer() {
        match op {
            BinOp::Addition => Opcode::Addi,
            BinOp::Subtraction => Opcode::Subi,
            BinOp::Multiplication => Opcode::Muli,
            BinOp::Division => Opcode::Divi,
        }
    } else if left.is_integer() && right.is_integer() {
        match op {
            BinOp::Addition => Opcode::Addu,
            BinOp::Subtraction => Opcode::Subu,
            BinOp::Multiplication => Opcode::Mulu,
            BinOp::Division => Opcode::Divu,
        }
    } else if left.is_real() && right.is_real() {
        match op {
            BinOp::Addition => Opcode::Addf,
            BinOp::Subtraction => Opcode::Subf,
            BinOp::Multiplication => Opcode::Mulf,
            BinOp::Division => Opcode::Divf,
        }
    } else {
        return Err(CompileError::IncompatibleOperandTypes {
            op: op.as_str(),
            left: left.name().to_string(),
            right: right.name().to_string(),
        });
    };
    Ok(selected)
}
