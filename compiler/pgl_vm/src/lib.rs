// SPDX-License-Identifier: MIT
// Copyright (c) 2023 Kagati Foundation

use byteorder::{ByteOrder, LittleEndian};

use pgl_errors::CompileError;
use pgl_ir::{Instruction, InstructionUnit, Opcode, Operand, Register};

pub type ExecResult<T> = Result<T, CompileError>;

/// Interprets an instruction sequence against a register file and one
/// flat byte-addressable memory region. All multi-byte values are
/// little-endian. Arithmetic is performed at the instruction's
/// declared byte width with wraparound semantics; integer division by
/// zero is a fatal structured error while float division follows
/// IEEE. Addresses are not bounds-checked against the memory size;
/// an out-of-range access is a host-level fault.
pub struct VirtualMachine {
    registers: Vec<Vec<u8>>,
    memory: Vec<u8>,
    word_size: usize,
}

impl VirtualMachine {
    pub fn new(word_size: usize, memory_size: usize) -> Self {
        Self {
            registers: vec![vec![0u8; word_size]; Register::ALL.len()],
            memory: vec![0u8; memory_size],
            word_size,
        }
    }

    pub fn execute(&mut self, unit: &InstructionUnit) -> ExecResult<()> {
        for (index, instr) in unit.instructions.iter().enumerate() {
            self.execute_instruction(index, instr)?;
            self.bump_rip();
        }
        Ok(())
    }

    fn execute_instruction(&mut self, index: usize, instr: &Instruction) -> ExecResult<()> {
        match instr.op {
            // Markers only; nothing happens at execution time. The
            // return value of a function was stored to its stack slot
            // by a preceding Mov.
            Opcode::Nop | Opcode::Function | Opcode::Return => Ok(()),

            Opcode::Mov => {
                let src = self.read_operand(operand(instr.right.as_ref(), instr, index)?)?;
                self.write_operand(operand(instr.left.as_ref(), instr, index)?, &src)
            }

            Opcode::Addi | Opcode::Subi | Opcode::Muli | Opcode::Divi => {
                self.exec_signed_arith(index, instr)
            }
            Opcode::Addu | Opcode::Subu | Opcode::Mulu | Opcode::Divu => {
                self.exec_unsigned_arith(index, instr)
            }
            Opcode::Addf | Opcode::Subf | Opcode::Mulf | Opcode::Divf => {
                self.exec_float_arith(index, instr)
            }
        }
    }

    fn exec_signed_arith(&mut self, index: usize, instr: &Instruction) -> ExecResult<()> {
        let width = instr.width;
        if !matches!(width, 1 | 2 | 4 | 8) {
            return Err(CompileError::UnsupportedOperandWidth { width, index });
        }

        let left = self.read_int_operand(operand(instr.left.as_ref(), instr, index)?, true)?;
        let right = self.read_int_operand(operand(instr.right.as_ref(), instr, index)?, true)?;
        if matches!(instr.op, Opcode::Divi) && right == 0 {
            return Err(CompileError::DivisionByZero { index });
        }

        macro_rules! at_width {
            ($ty:ty) => {{
                let (a, b) = (left as $ty, right as $ty);
                (match instr.op {
                    Opcode::Addi => a.wrapping_add(b),
                    Opcode::Subi => a.wrapping_sub(b),
                    Opcode::Muli => a.wrapping_mul(b),
                    Opcode::Divi => a.wrapping_div(b),
                    _ => unreachable!(),
                }) as i64
            }};
        }
        let result = match width {
            1 => at_width!(i8),
            2 => at_width!(i16),
            4 => at_width!(i32),
            _ => at_width!(i64),
        };

        let dest = destination(instr, index)?;
        self.write_int_register(dest, result as u64, width);
        Ok(())
    }

    fn exec_unsigned_arith(&mut self, index: usize, instr: &Instruction) -> ExecResult<()> {
        let width = instr.width;
        if !matches!(width, 1 | 2 | 4 | 8) {
            return Err(CompileError::UnsupportedOperandWidth { width, index });
        }

        let left = self.read_int_operand(operand(instr.left.as_ref(), instr, index)?, false)? as u64;
        let right = self.read_int_operand(operand(instr.right.as_ref(), instr, index)?, false)? as u64;
        if matches!(instr.op, Opcode::Divu) && right == 0 {
            return Err(CompileError::DivisionByZero { index });
        }

        macro_rules! at_width {
            ($ty:ty) => {{
                let (a, b) = (left as $ty, right as $ty);
                (match instr.op {
                    Opcode::Addu => a.wrapping_add(b),
                    Opcode::Subu => a.wrapping_sub(b),
                    Opcode::Mulu => a.wrapping_mul(b),
                    Opcode::Divu => a.wrapping_div(b),
                    _ => unreachable!(),
                }) as u64
            }};
        }
        let result = match width {
            1 => at_width!(u8),
            2 => at_width!(u16),
            4 => at_width!(u32),
            _ => at_width!(u64),
        };

        let dest = destination(instr, index)?;
        self.write_int_register(dest, result, width);
        Ok(())
    }

    fn exec_float_arith(&mut self, index: usize, instr: &Instruction) -> ExecResult<()> {
        let width = instr.width;
        if !matches!(width, 4 | 8) {
            return Err(CompileError::UnsupportedOperandWidth { width, index });
        }

        let left = self.read_float_operand(operand(instr.left.as_ref(), instr, index)?, width)?;
        let right = self.read_float_operand(operand(instr.right.as_ref(), instr, index)?, width)?;
        let result = match instr.op {
            Opcode::Addf => left + right,
            Opcode::Subf => left - right,
            Opcode::Mulf => left * right,
            Opcode::Divf => left / right,
            _ => unreachable!(),
        };

        let dest = destination(instr, index)?;
        let buf = &mut self.registers[dest.index()];
        buf.fill(0);
        if width == 4 {
            LittleEndian::write_f32(&mut buf[..4], result as f32);
        } else {
            LittleEndian::write_f64(&mut buf[..8], result);
        }
        Ok(())
    }

    /// Materialize an operand as its byte span at the operand's
    /// declared width.
    fn read_operand(&self, op: &Operand) -> ExecResult<Vec<u8>> {
        match op {
            Operand::ImmInt {
                signed,
                width,
                text,
            } => {
                let mut buf = vec![0u8; *width];
                if *signed {
                    let value = parse_imm::<i64>(text)?;
                    LittleEndian::write_int(&mut buf, value, *width);
                } else {
                    let value = parse_imm::<u64>(text)?;
                    LittleEndian::write_uint(&mut buf, value, *width);
                }
                Ok(buf)
            }

            Operand::ImmFloat { width, text } => {
                let mut buf = vec![0u8; *width];
                if *width == 4 {
                    LittleEndian::write_f32(&mut buf, parse_imm::<f32>(text)?);
                } else {
                    LittleEndian::write_f64(&mut buf, parse_imm::<f64>(text)?);
                }
                Ok(buf)
            }

            Operand::Reg { reg, width } => Ok(self.registers[reg.index()][..*width].to_vec()),

            Operand::RelAddr {
                base,
                offset,
                width,
            } => {
                let addr = self.effective_address(*base, *offset);
                Ok(self.memory[addr..addr + width].to_vec())
            }
        }
    }

    fn write_operand(&mut self, op: &Operand, bytes: &[u8]) -> ExecResult<()> {
        match op {
            Operand::Reg { reg, width } => {
                let width = *width;
                let buf = &mut self.registers[reg.index()];
                buf.fill(0);
                buf[..width].copy_from_slice(&bytes[..width]);
                Ok(())
            }

            Operand::RelAddr {
                base,
                offset,
                width,
            } => {
                let addr = self.effective_address(*base, *offset);
                self.memory[addr..addr + width].copy_from_slice(&bytes[..*width]);
                Ok(())
            }

            Operand::ImmInt { text, .. } | Operand::ImmFloat { text, .. } => {
                Err(CompileError::UnsupportedConstruct {
                    what: format!("immediate `{text}` as a Mov destination"),
                })
            }
        }
    }

    fn read_int_operand(&self, op: &Operand, signed: bool) -> ExecResult<i64> {
        let bytes = self.read_operand(op)?;
        Ok(if signed {
            LittleEndian::read_int(&bytes, bytes.len())
        } else {
            LittleEndian::read_uint(&bytes, bytes.len()) as i64
        })
    }

    fn read_float_operand(&self, op: &Operand, width: usize) -> ExecResult<f64> {
        let bytes = self.read_operand(op)?;
        Ok(if width == 4 {
            LittleEndian::read_f32(&bytes[..4]) as f64
        } else {
            LittleEndian::read_f64(&bytes[..8])
        })
    }

    /// Effective address: the base register read as an unsigned word
    /// plus the signed operand offset.
    fn effective_address(&self, base: Register, offset: i32) -> usize {
        let base_value = LittleEndian::read_uint(&self.registers[base.index()], self.word_size);
        base_value.wrapping_add_signed(offset as i64) as usize
    }

    fn write_int_register(&mut self, reg: Register, value: u64, width: usize) {
        let buf = &mut self.registers[reg.index()];
        buf.fill(0);
        LittleEndian::write_uint(&mut buf[..width], value & width_mask(width), width);
    }

    fn bump_rip(&mut self) {
        let buf = &mut self.registers[Register::RIP.index()];
        let count = LittleEndian::read_uint(buf, buf.len());
        let len = buf.len();
        LittleEndian::write_uint(buf, count.wrapping_add(1), len);
    }

    pub fn read_register(&self, reg: Register) -> &[u8] {
        &self.registers[reg.index()]
    }

    pub fn write_register(&mut self, reg: Register, bytes: &[u8]) {
        let buf = &mut self.registers[reg.index()];
        buf.fill(0);
        let len = bytes.len().min(buf.len());
        buf[..len].copy_from_slice(&bytes[..len]);
    }

    pub fn read_memory(&self, addr: usize, len: usize) -> &[u8] {
        &self.memory[addr..addr + len]
    }

    pub fn write_memory(&mut self, addr: usize, bytes: &[u8]) {
        self.memory[addr..addr + bytes.len()].copy_from_slice(bytes);
    }

    /// One line per register: right-padded name, then the register's
    /// bytes in hex.
    pub fn register_dump(&self) -> String {
        let mut out = String::new();
        for reg in Register::ALL {
            let bytes = &self.registers[reg.index()];
            let hex: Vec<String> = bytes.iter().map(|b| format!("{b:02x}")).collect();
            out.push_str(&format!("{:<6} {}\n", reg.name(), hex.join(" ")));
        }
        out
    }
}

fn operand<'i>(
    op: Option<&'i Operand>,
    instr: &Instruction,
    index: usize,
) -> ExecResult<&'i Operand> {
    op.ok_or_else(|| CompileError::UnsupportedInstruction {
        opcode: format!("{} with a missing operand", instr.op.mnemonic()),
        index,
    })
}

fn destination(instr: &Instruction, index: usize) -> ExecResult<Register> {
    instr
        .dest
        .ok_or_else(|| CompileError::UnsupportedInstruction {
            opcode: format!("{} with no destination register", instr.op.mnemonic()),
            index,
        })
}

fn parse_imm<T: std::str::FromStr>(text: &str) -> ExecResult<T> {
    text.parse().map_err(|_| CompileError::UnsupportedConstruct {
        what: format!("malformed immediate `{text}`"),
    })
}

fn width_mask(width: usize) -> u64 {
    if width >= 8 {
        u64::MAX
    } else {
        (1u64 << (width * 8)) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgl_ir::InstructionUnit;

    fn imm_i(text: &str, width: usize) -> Operand {
        Operand::ImmInt {
            signed: true,
            width,
            text: text.to_string(),
        }
    }

    fn imm_u(text: &str, width: usize) -> Operand {
        Operand::ImmInt {
            signed: false,
            width,
            text: text.to_string(),
        }
    }

    fn reg(reg: Register, width: usize) -> Operand {
        Operand::Reg { reg, width }
    }

    fn mem(offset: i32, width: usize) -> Operand {
        Operand::RelAddr {
            base: Register::RSP,
            offset,
            width,
        }
    }

    fn run(unit: &InstructionUnit) -> VirtualMachine {
        let mut vm = VirtualMachine::new(8, 256);
        vm.execute(unit).unwrap();
        vm
    }

    fn r1_i64(vm: &VirtualMachine) -> i64 {
        LittleEndian::read_int(vm.read_register(Register::R1), 8)
    }

    #[test]
    fn signed_addition_at_each_width() {
        for width in [1usize, 2, 4, 8] {
            let mut unit = InstructionUnit::new();
            unit.addi(Register::R1, imm_i("-2", width), imm_i("5", width), width, String::new());
            let vm = run(&unit);
            assert_eq!(r1_i64(&vm), 3, "width {width}");
        }
    }

    #[test]
    fn unsigned_arithmetic_wraps_at_its_width() {
        let mut unit = InstructionUnit::new();
        unit.addu(Register::R1, imm_u("200", 1), imm_u("100", 1), 1, String::new());
        let vm = run(&unit);
        // 300 wraps to 44 in 8 bits.
        assert_eq!(vm.read_register(Register::R1)[0], 44);
    }

    #[test]
    fn signed_subtraction_can_go_negative() {
        let mut unit = InstructionUnit::new();
        unit.subi(Register::R1, imm_i("3", 4), imm_i("5", 4), 4, String::new());
        let vm = run(&unit);
        let raw = LittleEndian::read_int(&vm.read_register(Register::R1)[..4], 4);
        assert_eq!(raw as i32, -2);
    }

    #[test]
    fn float_arithmetic_at_both_widths() {
        let mut unit = InstructionUnit::new();
        unit.mulf(
            Register::R1,
            Operand::ImmFloat { width: 4, text: "1.5".to_string() },
            Operand::ImmFloat { width: 4, text: "2.0".to_string() },
            4,
            String::new(),
        );
        let vm = run(&unit);
        assert_eq!(LittleEndian::read_f32(&vm.read_register(Register::R1)[..4]), 3.0);

        let mut unit = InstructionUnit::new();
        unit.divf(
            Register::R1,
            Operand::ImmFloat { width: 8, text: "1.0".to_string() },
            Operand::ImmFloat { width: 8, text: "8.0".to_string() },
            8,
            String::new(),
        );
        let vm = run(&unit);
        assert_eq!(LittleEndian::read_f64(vm.read_register(Register::R1)), 0.125);
    }

    #[test]
    fn float_division_by_zero_follows_ieee() {
        let mut unit = InstructionUnit::new();
        unit.divf(
            Register::R1,
            Operand::ImmFloat { width: 8, text: "1.0".to_string() },
            Operand::ImmFloat { width: 8, text: "0.0".to_string() },
            8,
            String::new(),
        );
        let vm = run(&unit);
        assert!(LittleEndian::read_f64(vm.read_register(Register::R1)).is_infinite());
    }

    #[test]
    fn integer_division_by_zero_is_fatal() {
        let mut unit = InstructionUnit::new();
        unit.divi(Register::R1, imm_i("1", 4), imm_i("0", 4), 4, String::new());
        let mut vm = VirtualMachine::new(8, 256);
        let err = vm.execute(&unit).unwrap_err();
        assert!(matches!(err, CompileError::DivisionByZero { index: 0 }));
    }

    #[test]
    fn unsupported_width_is_fatal() {
        let mut unit = InstructionUnit::new();
        unit.addi(Register::R1, imm_i("1", 3), imm_i("2", 3), 3, String::new());
        let mut vm = VirtualMachine::new(8, 256);
        let err = vm.execute(&unit).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedOperandWidth { width: 3, .. }));

        let mut unit = InstructionUnit::new();
        unit.addf(
            Register::R1,
            Operand::ImmFloat { width: 2, text: "1.0".to_string() },
            Operand::ImmFloat { width: 2, text: "2.0".to_string() },
            2,
            String::new(),
        );
        let mut vm = VirtualMachine::new(8, 256);
        assert!(matches!(
            vm.execute(&unit).unwrap_err(),
            CompileError::UnsupportedOperandWidth { width: 2, .. }
        ));
    }

    #[test]
    fn mov_moves_bytes_between_immediates_registers_and_memory() {
        let mut unit = InstructionUnit::new();
        unit.mov(reg(Register::R2, 4), imm_u("7", 4), String::new());
        unit.mov(mem(16, 4), reg(Register::R2, 4), String::new());
        unit.mov(reg(Register::R3, 4), mem(16, 4), String::new());
        let vm = run(&unit);
        assert_eq!(LittleEndian::read_u32(&vm.read_register(Register::R3)[..4]), 7);
        assert_eq!(vm.read_memory(16, 4), [7, 0, 0, 0]);
    }

    #[test]
    fn addressing_is_relative_to_the_base_register() {
        let mut vm = VirtualMachine::new(8, 256);
        let mut rsp = [0u8; 8];
        LittleEndian::write_uint(&mut rsp, 64, 8);
        vm.write_register(Register::RSP, &rsp);

        let mut unit = InstructionUnit::new();
        unit.mov(mem(4, 1), imm_u("9", 1), String::new());
        vm.execute(&unit).unwrap();
        assert_eq!(vm.read_memory(68, 1), [9]);

        // Negative offsets subtract from the base.
        let mut unit = InstructionUnit::new();
        unit.mov(mem(-8, 1), imm_u("3", 1), String::new());
        vm.execute(&unit).unwrap();
        assert_eq!(vm.read_memory(56, 1), [3]);
    }

    #[test]
    fn rip_counts_executed_instructions() {
        let mut unit = InstructionUnit::new();
        unit.nop();
        unit.nop();
        unit.nop();
        let vm = run(&unit);
        assert_eq!(LittleEndian::read_uint(vm.read_register(Register::RIP), 8), 3);
    }

    #[test]
    fn register_dump_pads_names_and_prints_hex() {
        let mut unit = InstructionUnit::new();
        unit.mov(reg(Register::R1, 1), imm_u("255", 1), String::new());
        let vm = run(&unit);
        let dump = vm.register_dump();
        let first = dump.lines().next().unwrap();
        assert_eq!(first, "R1     ff 00 00 00 00 00 00 00");
        assert!(dump.lines().any(|l| l.starts_with("RTmp1 ")));
        assert_eq!(dump.lines().count(), Register::ALL.len());
    }
}
