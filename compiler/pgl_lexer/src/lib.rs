// SPDX-License-Identifier: MIT
// Copyright (c) 2023 Kagati Foundation

use std::collections::HashMap;

use lazy_static::lazy_static;

use pgl_errors::code::ErrCode;
use pgl_errors::diagnostic::Diagnostic;
use pgl_token::{Token, TokenKind, TokenPos};

lazy_static! {
    static ref KEYWORDS: HashMap<&'static str, TokenKind> = {
        let mut keys: HashMap<&'static str, TokenKind> = HashMap::new();
        keys.insert("fn", TokenKind::KW_FN);
        keys.insert("return", TokenKind::KW_RETURN);
        keys.insert("true", TokenKind::KW_TRUE);
        keys.insert("false", TokenKind::KW_FALSE);
        keys.insert("int", TokenKind::KW_INT);
        keys.insert("i8", TokenKind::KW_I8);
        keys.insert("i16", TokenKind::KW_I16);
        keys.insert("i32", TokenKind::KW_I32);
        keys.insert("i64", TokenKind::KW_I64);
        keys.insert("uint", TokenKind::KW_UINT);
        keys.insert("u8", TokenKind::KW_U8);
        keys.insert("u16", TokenKind::KW_U16);
        keys.insert("u32", TokenKind::KW_U32);
        keys.insert("u64", TokenKind::KW_U64);
        keys.insert("float", TokenKind::KW_FLOAT);
        keys.insert("f32", TokenKind::KW_F32);
        keys.insert("f64", TokenKind::KW_F64);
        keys.insert("bool", TokenKind::KW_BOOL);
        keys
    };
}

/// Cursor-based scanner turning one source file into a token list.
pub struct Tokenizer {
    file: String,
    chars: Vec<char>,
    index: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
}

pub type LexResult = Result<Vec<Token>, Diagnostic>;

impl Tokenizer {
    pub fn new(file: impl Into<String>, source: &str) -> Self {
        Self {
            file: file.into(),
            chars: source.chars().collect(),
            index: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
        }
    }

    fn current(&self) -> char {
        self.chars.get(self.index).copied().unwrap_or('\0')
    }

    fn peek(&self) -> char {
        self.chars.get(self.index + 1).copied().unwrap_or('\0')
    }

    fn at_end(&self) -> bool {
        self.index >= self.chars.len()
    }

    fn eat_char(&mut self) {
        if self.current() == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.index += 1;
    }

    fn eat_whitespace(&mut self) {
        while !self.at_end() && self.current().is_whitespace() {
            self.eat_char();
        }
    }

    fn eat_line(&mut self) {
        while !self.at_end() && self.current() != '\n' {
            self.eat_char();
        }
        if !self.at_end() {
            self.eat_char();
        }
    }

    fn eat_block_comment(&mut self) {
        // positioned on the '*' of "/*"
        self.eat_char();
        while !self.at_end() {
            if self.current() == '*' && self.peek() == '/' {
                self.eat_char();
                self.eat_char();
                return;
            }
            self.eat_char();
        }
    }

    fn push_token(&mut self, kind: TokenKind, lexeme: impl Into<String>, line: usize, column: usize) {
        self.tokens.push(Token::new(kind, lexeme, TokenPos { line, column }));
    }

    fn eat_and_push_token(&mut self, kind: TokenKind) {
        let (line, column) = (self.line, self.column);
        let lexeme = self.current().to_string();
        self.push_token(kind, lexeme, line, column);
        self.eat_char();
    }

    fn read_numeric_literal(&mut self) {
        let (line, column) = (self.line, self.column);
        let start = self.index;
        let mut decimal_found = false;

        while !self.at_end() {
            if self.current() == '.' {
                if decimal_found {
                    break;
                }
                decimal_found = true;
            } else if !self.current().is_ascii_digit() {
                break;
            }
            self.eat_char();
        }

        let lit: String = self.chars[start..self.index].iter().collect();
        let kind = if decimal_found {
            TokenKind::T_FLOATLIT
        } else {
            TokenKind::T_INTLIT
        };
        self.push_token(kind, lit, line, column);
    }

    fn read_string_literal(&mut self) -> Result<(), Diagnostic> {
        let (line, column) = (self.line, self.column);
        self.eat_char(); // opening quote

        let start = self.index;
        while !self.at_end() && self.current() != '"' {
            if self.current() == '\n' {
                return Err(self.error("string literal wraps the line"));
            }
            self.eat_char();
        }
        if self.at_end() {
            return Err(self.error("unterminated string literal"));
        }

        let lit: String = self.chars[start..self.index].iter().collect();
        self.eat_char(); // closing quote
        self.push_token(TokenKind::T_STRLIT, lit, line, column);
        Ok(())
    }

    fn read_identifier(&mut self) {
        let (line, column) = (self.line, self.column);
        let start = self.index;

        while !self.at_end()
            && (self.current().is_alphanumeric() || self.current() == '_')
        {
            self.eat_char();
        }

        let ident: String = self.chars[start..self.index].iter().collect();
        let kind = KEYWORDS
            .get(ident.as_str())
            .copied()
            .unwrap_or(TokenKind::T_IDENT);
        self.push_token(kind, ident, line, column);
    }

    pub fn tokenize(mut self) -> LexResult {
        while !self.at_end() {
            self.eat_whitespace();
            if self.at_end() {
                break;
            }

            if self.current().is_alphabetic() || self.current() == '_' {
                self.read_identifier();
                continue;
            }
            if self.current().is_ascii_digit() {
                self.read_numeric_literal();
                continue;
            }
            if self.current() == '"' {
                self.read_string_literal()?;
                continue;
            }

            match self.current() {
                '+' => self.eat_and_push_token(TokenKind::T_PLUS),
                '-' => self.eat_and_push_token(TokenKind::T_MINUS),
                '*' => self.eat_and_push_token(TokenKind::T_STAR),
                '/' => {
                    if self.peek() == '/' {
                        self.eat_line();
                    } else if self.peek() == '*' {
                        self.eat_char();
                        self.eat_block_comment();
                    } else {
                        self.eat_and_push_token(TokenKind::T_SLASH);
                    }
                }
                '=' => self.eat_and_push_token(TokenKind::T_EQUAL),
                ',' => self.eat_and_push_token(TokenKind::T_COMMA),
                '.' => self.eat_and_push_token(TokenKind::T_DOT),
                ':' => self.eat_and_push_token(TokenKind::T_COLON),
                ';' => self.eat_and_push_token(TokenKind::T_SEMICOLON),
                '(' => self.eat_and_push_token(TokenKind::T_LPAREN),
                ')' => self.eat_and_push_token(TokenKind::T_RPAREN),
                '[' => self.eat_and_push_token(TokenKind::T_LBRACKET),
                ']' => self.eat_and_push_token(TokenKind::T_RBRACKET),
                '{' => self.eat_and_push_token(TokenKind::T_LBRACE),
                '}' => self.eat_and_push_token(TokenKind::T_RBRACE),
                '<' => self.eat_and_push_token(TokenKind::T_LTHAN),
                '>' => self.eat_and_push_token(TokenKind::T_GTHAN),
                other => {
                    return Err(self.error(format!("unexpected character '{other}'")));
                }
            }
        }

        self.tokens.push(Token::eof(TokenPos {
            line: self.line,
            column: self.column,
        }));
        Ok(self.tokens)
    }

    fn error(&self, message: impl Into<String>) -> Diagnostic {
        Diagnostic::error(ErrCode::LEX1000, self.file.clone(), self.line, self.column, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Tokenizer::new("test.pgl", source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn scans_a_function_header() {
        use TokenKind::*;
        assert_eq!(
            kinds("fn add(a: i32, b: i32) = r: i32 {"),
            vec![
                KW_FN, T_IDENT, T_LPAREN, T_IDENT, T_COLON, KW_I32, T_COMMA, T_IDENT,
                T_COLON, KW_I32, T_RPAREN, T_EQUAL, T_IDENT, T_COLON, KW_I32, T_LBRACE,
                T_EOF,
            ]
        );
    }

    #[test]
    fn distinguishes_integer_and_fractional_literals() {
        use TokenKind::*;
        assert_eq!(kinds("1 1.5 200"), vec![T_INTLIT, T_FLOATLIT, T_INTLIT, T_EOF]);
    }

    #[test]
    fn skips_line_and_block_comments() {
        use TokenKind::*;
        let src = "a // comment\n/* block\ncomment */ b";
        assert_eq!(kinds(src), vec![T_IDENT, T_IDENT, T_EOF]);
    }

    #[test]
    fn tracks_line_and_column() {
        let tokens = Tokenizer::new("test.pgl", "x\n  y := 1;")
            .tokenize()
            .unwrap();
        assert_eq!(tokens[0].pos, TokenPos { line: 1, column: 1 });
        assert_eq!(tokens[1].pos, TokenPos { line: 2, column: 3 });
        assert_eq!(tokens[1].lexeme, "y");
    }

    #[test]
    fn string_literal_may_not_wrap_the_line() {
        let err = Tokenizer::new("test.pgl", "\"abc\ndef\"")
            .tokenize()
            .unwrap_err();
        assert!(err.message.contains("wraps the line"));
    }

    #[test]
    fn rejects_unknown_characters() {
        let err = Tokenizer::new("test.pgl", "a ? b").tokenize().unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 3);
    }
}
