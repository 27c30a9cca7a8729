// SPDX-License-Identifier: MIT
// Copyright (c) 2023 Kagati Foundation

use std::fmt::Display;

use itertools::Itertools;

use crate::operand::Operand;
use crate::reg::Register;

/// Width- and signedness-specialized opcodes. The `i`/`u`/`f`
/// suffixes select signed-integer, unsigned-integer and float
/// arithmetic; the operand byte width rides on the instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Nop,

    Addi,
    Addu,
    Addf,
    Subi,
    Subu,
    Subf,
    Muli,
    Mulu,
    Mulf,
    Divi,
    Divu,
    Divf,

    /// Function label marker. Not executed; carries the display
    /// signature in the comment slot.
    Function,

    /// Logical end of a function's instruction run. The return value
    /// was already stored to its stack slot by a preceding `Mov`.
    Return,

    /// Does not use the destination register slot: the left operand
    /// is the destination and the right operand is the data source.
    Mov,
}

impl Opcode {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::Nop => "Nop",
            Self::Addi => "Addi",
            Self::Addu => "Addu",
            Self::Addf => "Addf",
            Self::Subi => "Subi",
            Self::Subu => "Subu",
            Self::Subf => "Subf",
            Self::Muli => "Muli",
            Self::Mulu => "Mulu",
            Self::Mulf => "Mulf",
            Self::Divi => "Divi",
            Self::Divu => "Divu",
            Self::Divf => "Divf",
            Self::Function => "Function",
            Self::Return => "Return",
            Self::Mov => "Mov",
        }
    }
}

/// One IR instruction. Instructions are append-only and never mutated
/// after emission; together they form the executable unit for one
/// compiled file.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub op: Opcode,
    pub dest: Option<Register>,
    pub left: Option<Operand>,
    pub right: Option<Operand>,
    pub width: usize,
    pub comment: Option<String>,
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields = [
            self.dest.map(|d| d.to_string()),
            self.left.as_ref().map(|o| o.to_string()),
            self.right.as_ref().map(|o| o.to_string()),
        ];
        let operands = fields.into_iter().flatten().join(", ");

        if operands.is_empty() {
            write!(f, "{}", self.op.mnemonic())?;
        } else {
            write!(f, "{} {}", self.op.mnemonic(), operands)?;
        }
        if let Some(comment) = &self.comment {
            write!(f, "   ; {comment}")?;
        }
        Ok(())
    }
}
