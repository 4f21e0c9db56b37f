use nu_ansi_term::{Color, Style};
use reedline::{
    Highlighter, Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus,
    StyledText, ValidationResult, Validator,
};
use std::borrow::Cow;

use crate::tokenizer::{Lexer, TokenKind, COMMENT_CHAR};

#[derive(Clone)]
pub struct REPLPrompt;

impl Prompt for REPLPrompt {
    fn render_prompt_left(&self) -> Cow<str> {
        Cow::Borrowed("slate")
    }

    fn render_prompt_right(&self) -> Cow<str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _edit_mode: PromptEditMode) -> Cow<str> {
        Cow::Borrowed("❯ ")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<str> {
        Cow::Borrowed("  ... ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!(
            "({}reverse-search: {}) ",
            prefix, history_search.term
        ))
    }
}

/// Keeps the editor open while brackets, braces or abs bars are unbalanced,
/// or while the input ends in a binary operator.
pub struct REPLValidator;

impl Validator for REPLValidator {
    fn validate(&self, line: &str) -> ValidationResult {
        if line.trim_end().is_empty() {
            return ValidationResult::Complete;
        }

        let mut delimiters = Vec::new();
        let mut bars = 0;
        let mut in_comment = false;
        let mut last = None;

        for c in line.chars() {
            match c {
                '\n' | '\r' => {
                    in_comment = false;
                    continue;
                }
                _ if in_comment => continue,
                COMMENT_CHAR => {
                    in_comment = true;
                    continue;
                }

                '{' | '(' => delimiters.push(c),
                '}' => {
                    if delimiters.pop() != Some('{') {
                        return ValidationResult::Complete;
                    }
                }
                ')' => {
                    if delimiters.pop() != Some('(') {
                        return ValidationResult::Complete;
                    }
                }
                '|' => bars += 1,
                _ => {}
            }

            if !c.is_whitespace() {
                last = Some(c);
            }
        }

        let dangling_operator = matches!(last, Some('+' | '-' | '*' | '/' | '=' | ','));

        if delimiters.is_empty() && bars % 2 == 0 && !dangling_operator {
            ValidationResult::Complete
        } else {
            ValidationResult::Incomplete
        }
    }
}

pub static KEYWORD_COLOR: Color = Color::LightBlue;
pub static LITERAL_COLOR: Color = Color::Yellow;
pub static DEFAULT_COLOR: Color = Color::White;
pub static OPERATOR_COLOR: Color = Color::DarkGray;
pub static ERROR_COLOR: Color = Color::Red;

pub struct SyntaxHighlighter;

impl Highlighter for SyntaxHighlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut styled_text = StyledText::new();
        let mut lexer = Lexer::new(line);
        let mut written = 0;

        // A malformed number stops highlighting; the rest stays plain
        while let Ok(token) = lexer.next() {
            if token.kind == TokenKind::EOF {
                break;
            }

            let start = token.location.cursor;
            let end = lexer.location().cursor;

            // whitespace and comments between tokens
            if start > written {
                styled_text.push((Style::new().fg(DEFAULT_COLOR), line[written..start].to_string()));
            }

            let color = match &token.kind {
                kind if kind.is_keyword() => KEYWORD_COLOR,
                TokenKind::Number(_) => LITERAL_COLOR,
                TokenKind::Identifier(_) => DEFAULT_COLOR,
                TokenKind::Error(_) => ERROR_COLOR,
                _ => OPERATOR_COLOR,
            };

            styled_text.push((Style::new().fg(color), line[start..end].to_string()));
            written = end;
        }

        if written < line.len() {
            styled_text.push((Style::new().fg(DEFAULT_COLOR), line[written..].to_string()));
        }

        styled_text
    }
}
