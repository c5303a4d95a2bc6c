mod common;
mod emit_test;
mod lexer_test;
mod parsing_test;
