// SPDX-License-Identifier: MIT
// Copyright (c) 2023 Kagati Foundation

use std::fmt::Display;

use crate::code::ErrCode;
use crate::terminal::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Help,
}

/// A positioned front-end error. The lexer and parser report through
/// this so the offending line can be rendered with a caret; core
/// stages report `CompileError` values without positions instead.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: ErrCode,
    pub severity: Severity,
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl Diagnostic {
    pub fn error(
        code: ErrCode,
        file: impl Into<String>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            severity: Severity::Error,
            file: file.into(),
            line,
            column,
            message: message.into(),
        }
    }

    /// Render the diagnostic against its source text: severity and
    /// message, file:line:column, then the source line with a caret
    /// under the offending column.
    pub fn render(&self, source: &str) -> String {
        let color = match self.severity {
            Severity::Error => ANSI_COLOR_RED,
            Severity::Warning => ANSI_COLOR_YELLOW,
            Severity::Help => ANSI_COLOR_CYAN,
        };

        let mut out = String::new();
        out.push_str(&format!(
            "{color}{:?}[{}]{ANSI_COLOR_RESET}: {}\n",
            self.severity, self.code as u32, self.message
        ));
        out.push_str(&format!(" --> {}:{}:{}\n", self.file, self.line, self.column));
        out.push_str("  |\n");

        let source_line = source.lines().nth(self.line.saturating_sub(1)).unwrap_or("");
        out.push_str(&format!("{: >4} | {}\n", self.line, source_line));

        let caret_line = " ".repeat(self.column.saturating_sub(1)) + "^";
        out.push_str(&format!("     | {}\n", caret_line));
        out
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?}[{}] {}:{}:{}: {}",
            self.severity, self.code as u32, self.file, self.line, self.column, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_points_at_offending_column() {
        let source = "fn main() {\n    x ?= 3;\n}\n";
        let diag = Diagnostic::error(ErrCode::LEX1000, "main.pgl", 2, 7, "unexpected character '?'");
        let rendered = diag.render(source);

        assert!(rendered.contains("main.pgl:2:7"));
        assert!(rendered.contains("   2 |     x ?= 3;"));
        assert!(rendered.contains("     |       ^"));
    }
}
