// SPDX-License-Identifier: MIT
// Copyright (c) 2023 Kagati Foundation

use pglc::compiler::CompilerPipeline;
use pglc::config::Configuration;
use pglc::logger::LogLevel;

fn main() {
    let mut config = Configuration {
        log_level: LogLevel::Info,
        ..Configuration::default()
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut index = 0;
    while index < args.len() {
        let arg = &args[index];
        match arg.as_str() {
            "-q" => config.log_level = LogLevel::Error,
            "-w" => {
                index += 1;
                match args.get(index).and_then(|v| v.parse().ok()) {
                    Some(bytes) => config.target_word_size = bytes,
                    None => {
                        eprintln!("-w expects a word size in bytes");
                        std::process::exit(1);
                    }
                }
            }
            "-m" => {
                index += 1;
                match args.get(index).and_then(|v| v.parse().ok()) {
                    Some(bytes) => config.memory_size = bytes,
                    None => {
                        eprintln!("-m expects a memory size in bytes");
                        std::process::exit(1);
                    }
                }
            }
            flag if flag.starts_with('-') => {
                eprintln!("unknown flag: {flag}");
                std::process::exit(1);
            }
            file => config.source_files.push(file.to_string()),
        }
        index += 1;
    }

    if config.source_files.is_empty() {
        eprintln!("usage: pglc [-q] [-w <word bytes>] [-m <memory bytes>] <file>...");
        std::process::exit(1);
    }

    let files = config.source_files.clone();
    let pipeline = CompilerPipeline::new(config);

    let mut failed = false;
    for file in &files {
        if pipeline.compile_file(file).is_err() {
            failed = true;
        }
    }
    if failed {
        std::process::exit(1);
    }
}
