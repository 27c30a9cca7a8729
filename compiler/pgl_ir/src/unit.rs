// SPDX-License-Identifier: MIT
// Copyright (c) 2023 Kagati Foundation

use crate::instr::{Instruction, Opcode};
use crate::operand::Operand;
use crate::reg::Register;

macro_rules! arith_emit_impl {
    ($fn_name:ident, $opcode:ident) => {
        pub fn $fn_name(
            &mut self,
            dest: Register,
            left: Operand,
            right: Operand,
            width: usize,
            comment: String,
        ) -> &mut Self {
            self.instructions.push(Instruction {
                op: Opcode::$opcode,
                dest: Some(dest),
                left: Some(left),
                right: Some(right),
                width,
                comment: Some(comment),
            });
            self
        }
    };
}

/// Ordered, append-only instruction sequence for one compiled file.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct InstructionUnit {
    pub instructions: Vec<Instruction>,
}

impl InstructionUnit {
    pub fn new() -> Self {
        Self {
            instructions: Vec::new(),
        }
    }

    arith_emit_impl!(addi, Addi);
    arith_emit_impl!(addu, Addu);
    arith_emit_impl!(addf, Addf);
    arith_emit_impl!(subi, Subi);
    arith_emit_impl!(subu, Subu);
    arith_emit_impl!(subf, Subf);
    arith_emit_impl!(muli, Muli);
    arith_emit_impl!(mulu, Mulu);
    arith_emit_impl!(mulf, Mulf);
    arith_emit_impl!(divi, Divi);
    arith_emit_impl!(divu, Divu);
    arith_emit_impl!(divf, Divf);

    /// `Mov` stores the destination in the left operand slot and the
    /// data source in the right; the destination register field stays
    /// empty.
    pub fn mov(&mut self, dest: Operand, src: Operand, comment: String) -> &mut Self {
        let width = dest.width();
        self.instructions.push(Instruction {
            op: Opcode::Mov,
            dest: None,
            left: Some(dest),
            right: Some(src),
            width,
            comment: Some(comment),
        });
        self
    }

    pub fn func(&mut self, signature: String) -> &mut Self {
        self.instructions.push(Instruction {
            op: Opcode::Function,
            dest: None,
            left: None,
            right: None,
            width: 0,
            comment: Some(signature),
        });
        self
    }

    pub fn ret(&mut self) -> &mut Self {
        self.instructions.push(Instruction {
            op: Opcode::Return,
            dest: None,
            left: None,
            right: None,
            width: 0,
            comment: None,
        });
        self
    }

    pub fn nop(&mut self) -> &mut Self {
        self.instructions.push(Instruction {
            op: Opcode::Nop,
            dest: None,
            left: None,
            right: None,
            width: 0,
            comment: None,
        });
        self
    }

    /// Human-readable listing: one line per instruction, with
    /// `Function` markers rendered as a blank line followed by the
    /// function's signature.
    pub fn listing(&self) -> String {
        let mut out = String::new();
        for instr in &self.instructions {
            if instr.op == Opcode::Function {
                out.push('\n');
                out.push_str(instr.comment.as_deref().unwrap_or(""));
                out.push('\n');
            } else {
                out.push_str(&instr.to_string());
                out.push('\n');
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imm(text: &str, width: usize) -> Operand {
        Operand::ImmInt {
            signed: true,
            width,
            text: text.to_string(),
        }
    }

    #[test]
    fn arithmetic_lines_render_dest_and_operands() {
        let mut unit = InstructionUnit::new();
        unit.addi(Register::R1, imm("2", 4), imm("3", 4), 4, "2 + 3".to_string());
        assert_eq!(
            unit.instructions[0].to_string(),
            "Addi R1, 2, 3   ; 2 + 3"
        );
    }

    #[test]
    fn mov_renders_target_operand_first() {
        let mut unit = InstructionUnit::new();
        unit.mov(
            Operand::RelAddr {
                base: Register::RSP,
                offset: 8,
                width: 4,
            },
            Operand::Reg {
                reg: Register::R1,
                width: 4,
            },
            "r = R1".to_string(),
        );
        assert_eq!(
            unit.instructions[0].to_string(),
            "Mov [RSP, 8], R1   ; r = R1"
        );
    }

    #[test]
    fn listing_renders_function_markers_as_headers() {
        let mut unit = InstructionUnit::new();
        unit.func("fn add(a: i32, b: i32) = r: i32".to_string());
        unit.addi(
            Register::R1,
            Operand::RelAddr {
                base: Register::RSP,
                offset: 0,
                width: 4,
            },
            Operand::RelAddr {
                base: Register::RSP,
                offset: 4,
                width: 4,
            },
            4,
            "a + b".to_string(),
        );
        unit.ret();

        let listing = unit.listing();
        assert_eq!(
            listing,
            "\nfn add(a: i32, b: i32) = r: i32\n\
             Addi R1, [RSP, 0], [RSP, 4]   ; a + b\n\
             Return\n"
        );
    }
}
