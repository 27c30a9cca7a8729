// SPDX-License-Identifier: MIT
// Copyright (c) 2023 Kagati Foundation

use crate::logger::LogLevel;

/// Target word size used for `int`/`uint`/`float` and the register
/// buffers when nothing else is configured.
pub const DEFAULT_WORD_SIZE: usize = 8;

/// Default size of the virtual machine's flat memory buffer, in bytes.
pub const DEFAULT_MEMORY_SIZE: usize = 1024;

#[derive(Debug, Clone)]
pub struct Configuration {
    pub log_level: LogLevel,
    pub target_word_size: usize,
    pub memory_size: usize,
    pub source_files: Vec<String>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            target_word_size: DEFAULT_WORD_SIZE,
            memory_size: DEFAULT_MEMORY_SIZE,
            source_files: Vec::new(),
        }
    }
}
