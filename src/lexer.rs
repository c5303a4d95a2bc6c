use crate::{Lexer, Position, Span, Token, Vocabulary};
use regex::Regex;
use std::rc::Rc;

impl Lexer {
    pub fn new(vocabulary: Rc<Vocabulary>) -> Self {
        Self {
            vocabulary,
            name: Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*").expect("static pattern"),
            number: Regex::new(r"^[0-9]+(\.[0-9]+)?").expect("static pattern"),
            string: Regex::new(r#"^('([^'\\\n]|\\.)*'|"([^"\\\n]|\\.)*")"#)
                .expect("static pattern"),
            comment: Regex::new(r"^#[^\n]*").expect("static pattern"),
        }
    }

    /// Split the input into tokens, terminated by an ENDMARKER sentinel.
    ///
    /// Newlines inside open brackets and on lines without a preceding
    /// significant token are NL (non-syntactic); others are NEWLINE. No
    /// synthetic NEWLINE is produced for input that does not end in one.
    /// Unrecognizable characters become ERRORTOKEN and scanning continues.
    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        let lines: Vec<Rc<str>> = text.split_inclusive('\n').map(Rc::from).collect();
        let mut tokens = Vec::new();
        let mut depth = 0usize;
        let mut end_line = 1usize;
        let mut end_column = 1usize;

        for (line_index, line) in lines.iter().enumerate() {
            let line_no = line_index + 1;
            let mut column = 1usize;
            let mut rest: &str = line;
            let mut line_has_token = false;

            while !rest.is_empty() {
                if let Some(stripped) = rest.strip_prefix('\n') {
                    let kind = if depth > 0 || !line_has_token {
                        Vocabulary::NL
                    } else {
                        Vocabulary::NEWLINE
                    };
                    tokens.push(self.emit(kind, "\n", line_no, column, line));
                    column += 1;
                    rest = stripped;
                    continue;
                }

                let first = rest.chars().next().expect("rest is non-empty");
                if first == ' ' || first == '\t' || first == '\r' {
                    column += 1;
                    rest = &rest[first.len_utf8()..];
                    continue;
                }

                let (kind, matched) = if let Some(found) = self.comment.find(rest) {
                    (Vocabulary::COMMENT, found.as_str())
                } else if let Some(found) = self.string.find(rest) {
                    (Vocabulary::STRING, found.as_str())
                } else if let Some(found) = self.number.find(rest) {
                    (Vocabulary::NUMBER, found.as_str())
                } else if let Some(found) = self.name.find(rest) {
                    (Vocabulary::NAME, found.as_str())
                } else if let Some(kind) = self.vocabulary.punctuation.get(&first) {
                    match first {
                        '(' | '[' | '{' => depth += 1,
                        ')' | ']' | '}' => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                    (*kind, &rest[..first.len_utf8()])
                } else {
                    (Vocabulary::ERRORTOKEN, &rest[..first.len_utf8()])
                };

                if kind != Vocabulary::COMMENT {
                    line_has_token = true;
                }
                tokens.push(self.emit(kind, matched, line_no, column, line));
                column += matched.chars().count();
                rest = &rest[matched.len()..];
            }

            if line.ends_with('\n') {
                end_line = line_no + 1;
                end_column = 1;
            } else {
                end_line = line_no;
                end_column = column;
            }
        }

        let end_line_text: Rc<str> = if end_line <= lines.len() {
            lines[end_line - 1].clone()
        } else {
            Rc::from("")
        };
        let end = Position::new(end_line, end_column);
        tokens.push(Token::new(
            Vocabulary::ENDMARKER,
            String::new(),
            Span::new(end, end, end_line_text),
        ));
        tokens
    }

    fn emit(
        &self,
        kind: crate::TokenKind,
        text: &str,
        line_no: usize,
        column: usize,
        line: &Rc<str>,
    ) -> Token {
        let start = Position::new(line_no, column);
        let end = Position::new(line_no, column + text.chars().count());
        Token::new(kind, text.to_string(), Span::new(start, end, line.clone()))
    }
}
