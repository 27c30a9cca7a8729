// SPDX-License-Identifier: MIT
// Copyright (c) 2023 Kagati Foundation

use std::fmt::Display;
use std::fs;

use pgl_ast::Program;
use pgl_codegen::CodeGenerator;
use pgl_errors::diagnostic::Diagnostic;
use pgl_errors::CompileError;
use pgl_ir::InstructionUnit;
use pgl_lexer::Tokenizer;
use pgl_parser::Parser;
use pgl_scope::ScopeManager;
use pgl_sema::SemanticAnalyzer;
use pgl_types::TypeRegistry;
use pgl_vm::VirtualMachine;

use crate::config::Configuration;
use crate::logger::{LogLevel, Logger, Stage};

#[derive(Debug)]
pub enum PipelineError {
    Io(std::io::Error),
    /// Positioned lexer/parser error.
    Frontend(Diagnostic),
    /// Fatal condition from analysis, code generation or execution.
    Compile(CompileError),
}

impl Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Frontend(diag) => write!(f, "{diag}"),
            Self::Compile(err) => write!(f, "[{}] {err}", err.code() as u32),
        }
    }
}

impl From<CompileError> for PipelineError {
    fn from(err: CompileError) -> Self {
        Self::Compile(err)
    }
}

#[derive(Debug)]
pub struct CompiledUnit {
    pub program: Program,
    pub unit: InstructionUnit,
}

/// Runs one source file through the whole pipeline: lex, parse,
/// analyze, generate, then interpret the generated unit on a fresh
/// virtual machine. Processing aborts on the first fatal error.
pub struct CompilerPipeline {
    config: Configuration,
    logger: Logger,
}

impl CompilerPipeline {
    pub fn new(config: Configuration) -> Self {
        let logger = Logger::new(config.log_level);
        Self { config, logger }
    }

    /// Compile already-loaded source text down to an instruction unit.
    pub fn compile_source(&self, file: &str, source: &str) -> Result<CompiledUnit, PipelineError> {
        let tokens = Tokenizer::new(file, source)
            .tokenize()
            .map_err(PipelineError::Frontend)?;

        let mut program = Parser::new(file, tokens)
            .parse()
            .map_err(PipelineError::Frontend)?;

        let registry = TypeRegistry::new(self.config.target_word_size);
        let mut scopes = ScopeManager::new();
        SemanticAnalyzer::new(&registry, &mut scopes).analyze_program(&mut program)?;

        let unit = CodeGenerator::new(&scopes).generate(&program)?;
        Ok(CompiledUnit { program, unit })
    }

    /// Interpret a generated unit on a fresh VM and hand the machine
    /// back for register/memory inspection.
    pub fn execute(&self, unit: &InstructionUnit) -> Result<VirtualMachine, PipelineError> {
        let mut vm = VirtualMachine::new(self.config.target_word_size, self.config.memory_size);
        vm.execute(unit)?;
        Ok(vm)
    }

    /// The whole pipeline for one file, with stage logging, the
    /// instruction listing and the post-run register dump on stdout.
    pub fn compile_file(&self, path: &str) -> Result<(), PipelineError> {
        self.logger.info(Stage::Startup, &format!("compiling {path}"));

        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                self.logger
                    .error(Stage::Startup, &format!("cannot read {path}: {err}"));
                return Err(PipelineError::Io(err));
            }
        };

        let compiled = match self.compile_source(path, &source) {
            Ok(compiled) => compiled,
            Err(err) => {
                self.report(&err, &source);
                return Err(err);
            }
        };

        self.logger.info(
            Stage::CodeGeneration,
            &format!("{} instruction(s) generated", compiled.unit.instructions.len()),
        );
        if self.config.log_level >= LogLevel::Info {
            println!("{}", compiled.unit.listing());
        }

        self.logger.info(Stage::Execution, "running generated unit");
        match self.execute(&compiled.unit) {
            Ok(vm) => {
                println!("{}", vm.register_dump());
                Ok(())
            }
            Err(err) => {
                self.report(&err, &source);
                Err(err)
            }
        }
    }

    fn report(&self, err: &PipelineError, source: &str) {
        match err {
            PipelineError::Frontend(diag) => {
                eprintln!("{}", diag.render(source));
            }
            PipelineError::Compile(inner) => {
                self.logger
                    .error(Stage::SemanticAnalysis, &format!("[{}] {inner}", inner.code() as u32));
            }
            PipelineError::Io(inner) => {
                self.logger.error(Stage::Startup, &inner.to_string());
            }
        }
    }
}
