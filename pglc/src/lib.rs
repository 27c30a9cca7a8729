// SPDX-License-Identifier: MIT
// Copyright (c) 2023 Kagati Foundation

pub mod compiler;
pub mod config;
pub mod logger;

use compiler::{CompilerPipeline, PipelineError};
use config::Configuration;

pub fn compile_file(file_name: &str) -> Result<(), PipelineError> {
    let mut config = Configuration::default();
    config.source_files.push(file_name.to_string());
    CompilerPipeline::new(config).compile_file(file_name)
}
