// SPDX-License-Identifier: MIT
// Copyright (c) 2023 Kagati Foundation

use pgl_errors::CompileError;
use pgl_ir::{Opcode, Register};
use pgl_vm::VirtualMachine;
use pglc::compiler::{CompiledUnit, CompilerPipeline, PipelineError};
use pglc::config::Configuration;
use pglc::logger::LogLevel;

fn pipeline() -> CompilerPipeline {
    let config = Configuration {
        log_level: LogLevel::None,
        ..Configuration::default()
    };
    CompilerPipeline::new(config)
}

fn compile(source: &str) -> CompiledUnit {
    pipeline().compile_source("test.pgl", source).unwrap()
}

fn compile_err(source: &str) -> CompileError {
    match pipeline().compile_source("test.pgl", source) {
        Err(PipelineError::Compile(err)) => err,
        other => panic!("expected a compile error, got {other:?}"),
    }
}

fn opcodes(compiled: &CompiledUnit) -> Vec<Opcode> {
    compiled.unit.instructions.iter().map(|i| i.op).collect()
}

#[test]
fn scenario_one_add_compiles_and_runs() {
    let compiled = compile("fn add(a: i32, b: i32) = r: i32 { return a + b; }");

    // Exactly one Addi at width 4, the store to the return slot, and
    // the Return marker.
    assert_eq!(
        opcodes(&compiled),
        vec![Opcode::Function, Opcode::Addi, Opcode::Mov, Opcode::Return]
    );
    assert_eq!(compiled.unit.instructions[1].width, 4);

    let mut vm = VirtualMachine::new(8, 1024);
    vm.write_memory(0, &2i32.to_le_bytes());
    vm.write_memory(4, &3i32.to_le_bytes());
    vm.execute(&compiled.unit).unwrap();

    let r1 = vm.read_register(Register::R1);
    assert_eq!(i32::from_le_bytes(r1[..4].try_into().unwrap()), 5);
    // The return slot sits above the two arguments.
    assert_eq!(
        i32::from_le_bytes(vm.read_memory(8, 4).try_into().unwrap()),
        5
    );
}

#[test]
fn scenario_two_inferred_width_clashes_with_i8() {
    // 300 infers a 16-bit integer type for x; using x against an i8
    // fails during analysis, before code generation.
    let err = compile_err("fn f(a: i8) = r: i16 { x := 300; return x + a; }");
    assert!(matches!(
        err,
        CompileError::TypeMismatch { site: "binary operand", .. }
    ));
}

#[test]
fn scenario_three_redeclaration_and_shadowing() {
    let err = compile_err("fn f() = r: u8 { x := 1; x := 2; return x; }");
    assert!(matches!(err, CompileError::DuplicateSymbol { name } if name == "x"));

    // Shadowing an enclosing block's name is allowed, and the inner
    // block resolves to the inner declaration (its own stack slot).
    let compiled = compile("fn f() = r: u8 { x := 7; { x := 9; } return x; }");
    let stores: Vec<_> = compiled
        .unit
        .instructions
        .iter()
        .filter(|i| i.op == Opcode::Mov)
        .collect();
    // x -> R1 -> outer slot, 9 -> R1 -> inner slot, x -> R1 -> ret slot
    let offsets: Vec<String> = stores.iter().map(|i| i.left.as_ref().unwrap().to_string()).collect();
    assert!(offsets.windows(2).all(|w| w[0] != w[1]), "distinct slots: {offsets:?}");

    let mut vm = VirtualMachine::new(8, 1024);
    vm.execute(&compiled.unit).unwrap();
    // ret0 lives at offset 0; outer x (7) is what the return reads.
    assert_eq!(vm.read_memory(0, 1), [7]);
}

#[test]
fn idempotence_fresh_instances_produce_identical_ir() {
    let source = "fn f(a: u32, b: u32) = r: u32 { x := a * b; return x + a; }";
    let first = pipeline().compile_source("test.pgl", source).unwrap();
    let second = pipeline().compile_source("test.pgl", source).unwrap();
    assert_eq!(first.unit, second.unit);
}

#[test]
fn float_pipeline_end_to_end() {
    let compiled = compile("fn ratio(x: f64, y: f64) = r: f64 { return x / y; }");
    assert!(compiled
        .unit
        .instructions
        .iter()
        .any(|i| i.op == Opcode::Divf && i.width == 8));

    let mut vm = VirtualMachine::new(8, 1024);
    vm.write_memory(0, &5.0f64.to_le_bytes());
    vm.write_memory(8, &2.0f64.to_le_bytes());
    vm.execute(&compiled.unit).unwrap();
    let r1 = vm.read_register(Register::R1);
    assert_eq!(f64::from_le_bytes(r1[..8].try_into().unwrap()), 2.5);
}

#[test]
fn integer_division_by_zero_faults_at_execution() {
    let compiled = compile("fn f(a: u8, b: u8) = r: u8 { return a / b; }");
    let mut vm = VirtualMachine::new(8, 1024);
    vm.write_memory(0, &[8]);
    // b stays zero.
    let err = vm.execute(&compiled.unit).unwrap_err();
    assert!(matches!(err, CompileError::DivisionByZero { .. }));
}

#[test]
fn listing_is_human_readable() {
    let compiled = compile("fn add(a: i32, b: i32) = r: i32 { return a + b; }");
    let listing = compiled.unit.listing();
    assert!(listing.contains("fn add(a: i32, b: i32) = r: i32"));
    assert!(listing.contains("Addi R1, [RSP, 0], [RSP, 4]   ; a + b"));
    assert!(listing.contains("Mov [RSP, 8], R1   ; r = R1"));
}

#[test]
fn register_dump_after_execution() {
    let compiled = compile("fn f() = r: u8 { return 255; }");
    let vm = pipeline().execute(&compiled.unit).unwrap();
    let dump = vm.register_dump();
    assert!(dump.starts_with("R1     ff 00 00 00 00 00 00 00\n"));
    assert!(dump.lines().any(|l| l.starts_with("RSP")));
}

#[test]
fn unknown_type_aborts_the_function() {
    let err = compile_err("fn f(a: quux) = r: u8 { return 1; }");
    assert!(matches!(err, CompileError::UnknownType { name } if name == "quux"));
}

#[test]
fn word_size_flows_from_configuration() {
    let config = Configuration {
        log_level: LogLevel::None,
        target_word_size: 4,
        ..Configuration::default()
    };
    let pipeline = CompilerPipeline::new(config);
    let compiled = pipeline
        .compile_source("test.pgl", "fn f(a: int, b: int) = r: int { return a + b; }")
        .unwrap();
    // int is 4 bytes on a 4-byte word target.
    assert!(compiled
        .unit
        .instructions
        .iter()
        .any(|i| i.op == Opcode::Addi && i.width == 4));
}
