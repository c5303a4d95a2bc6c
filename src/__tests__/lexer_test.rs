use crate::{Lexer, Position, TokenKind, Vocabulary};
use std::rc::Rc;

fn tokenize(text: &str) -> Vec<(TokenKind, String)> {
    Lexer::new(Rc::new(Vocabulary::core()))
        .tokenize(text)
        .into_iter()
        .map(|token| (token.kind, token.string))
        .collect()
}

#[test]
fn token_kinds_test() {
    assert_eq!(
        tokenize("x = 12 'str'\n"),
        vec![
            (Vocabulary::NAME, "x".to_string()),
            (Vocabulary::OP, "=".to_string()),
            (Vocabulary::NUMBER, "12".to_string()),
            (Vocabulary::STRING, "'str'".to_string()),
            (Vocabulary::NEWLINE, "\n".to_string()),
            (Vocabulary::ENDMARKER, "".to_string()),
        ]
    );
}

#[test]
fn bracketed_newline_is_nl_test() {
    let kinds: Vec<TokenKind> = tokenize("(1\n2)\n").into_iter().map(|(k, _)| k).collect();
    assert_eq!(
        kinds,
        vec![
            Vocabulary::OP,
            Vocabulary::NUMBER,
            Vocabulary::NL,
            Vocabulary::NUMBER,
            Vocabulary::OP,
            Vocabulary::NEWLINE,
            Vocabulary::ENDMARKER,
        ]
    );
}

#[test]
fn blank_and_comment_lines_test() {
    assert_eq!(
        tokenize("# note\n\nx\n"),
        vec![
            (Vocabulary::COMMENT, "# note".to_string()),
            (Vocabulary::NL, "\n".to_string()),
            (Vocabulary::NL, "\n".to_string()),
            (Vocabulary::NAME, "x".to_string()),
            (Vocabulary::NEWLINE, "\n".to_string()),
            (Vocabulary::ENDMARKER, "".to_string()),
        ]
    );
}

#[test]
fn span_test() {
    let tokens = Lexer::new(Rc::new(Vocabulary::core())).tokenize("ab cd\n");
    let second = &tokens[1];
    assert_eq!(second.string, "cd");
    assert_eq!(second.span.start, Position::new(1, 4));
    assert_eq!(second.span.end, Position::new(1, 6));
    assert_eq!(&*second.span.line, "ab cd\n");
}

#[test]
fn error_token_test() {
    let tokens = tokenize("a ` b\n");
    assert_eq!(tokens[1], (Vocabulary::ERRORTOKEN, "`".to_string()));
}

#[test]
fn no_trailing_newline_test() {
    assert_eq!(
        tokenize("abc"),
        vec![
            (Vocabulary::NAME, "abc".to_string()),
            (Vocabulary::ENDMARKER, "".to_string()),
        ]
    );
}
