// SPDX-License-Identifier: MIT
// Copyright (c) 2023 Kagati Foundation

pub mod instr;
pub mod operand;
pub mod reg;
pub mod unit;

pub use instr::{Instruction, Opcode};
pub use operand::Operand;
pub use reg::Register;
pub use unit::InstructionUnit;
