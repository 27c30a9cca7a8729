// SPDX-License-Identifier: MIT
// Copyright (c) 2023 Kagati Foundation

use std::fmt::Display;

/// The fixed register set. `RTmp1`/`RTmp2` never carry a value across
/// a statement boundary; `RIP` counts executed instructions; `RSP` is
/// the base for all stack-relative addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
    R8,
    RTmp1,
    RTmp2,
    RIP,
    RSP,
}

impl Register {
    pub const ALL: [Register; 12] = [
        Register::R1,
        Register::R2,
        Register::R3,
        Register::R4,
        Register::R5,
        Register::R6,
        Register::R7,
        Register::R8,
        Register::RTmp1,
        Register::RTmp2,
        Register::RIP,
        Register::RSP,
    ];

    /// Index into the register file's backing array.
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::R1 => "R1",
            Self::R2 => "R2",
            Self::R3 => "R3",
            Self::R4 => "R4",
            Self::R5 => "R5",
            Self::R6 => "R6",
            Self::R7 => "R7",
            Self::R8 => "R8",
            Self::RTmp1 => "RTmp1",
            Self::RTmp2 => "RTmp2",
            Self::RIP => "RIP",
            Self::RSP => "RSP",
        }
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
