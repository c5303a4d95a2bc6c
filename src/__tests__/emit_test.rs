use super::common::grammar;
use crate::{GrammarError, ParserEmitter, Vocabulary};
use std::rc::Rc;

fn generate(source: &str) -> String {
    let grammar = grammar(source);
    ParserEmitter::new(&grammar, Rc::new(Vocabulary::core()))
        .unwrap()
        .generate()
}

fn emitter_error(source: &str) -> GrammarError {
    let grammar = grammar(source);
    match ParserEmitter::new(&grammar, Rc::new(Vocabulary::core())) {
        Ok(_) => panic!("emission should have been rejected"),
        Err(error) => error,
    }
}

#[test]
fn scaffolding_test() {
    let code = generate("start: NUMBER NEWLINE\n");
    assert!(code.contains("pub struct GeneratedParser"));
    assert!(code.contains("pub fn parse(&mut self) -> Result<ParseValue, ParseError>"));
    assert!(code.contains("const T_ENDMARKER: TokenKind = TokenKind::new(0);"));
    assert!(code.contains("const T_NEWLINE: TokenKind = TokenKind::new(4);"));
    assert!(code.contains("const T_NUMBER: TokenKind = TokenKind::new(2);"));
    assert!(code.contains("use peg_pt::"));
}

#[test]
fn rule_dispatch_test() {
    let code = generate("start: expr NEWLINE\nexpr: expr '+' term | term\nterm: NUMBER\n");
    // A leader grows its seed, ordinary rules memoize.
    assert!(code.contains("self.grow(K_EXPR, Self::expr_body)"));
    assert!(code.contains("self.memoized(K_START, Self::start_body)"));
    assert!(code.contains("self.memoized(K_TERM, Self::term_body)"));
    assert!(code.contains("/// expr: expr '+' term | term"));
}

#[test]
fn non_leader_is_not_memoized_test() {
    let code = generate("start: foo 'E'\nfoo: bar 'A' | 'B'\nbar: foo 'C' | 'D'\n");
    assert!(code.contains("self.grow(K_BAR, Self::bar_body)"));
    assert!(code.contains("    pub fn foo(&mut self) -> Option<ParseValue> {\n        self.foo_body()\n    }"));
    assert!(!code.contains("K_FOO"));
}

#[test]
fn alternative_shape_test() {
    let code = generate("start: term '+' term NEWLINE\nterm: NUMBER\n");
    assert!(code.contains("let Some(term) = self.term() else {"));
    assert!(code.contains("let Some(literal) = self.expect_literal(\"+\") else {"));
    // The second occurrence of the same binding gets a numbered name.
    assert!(code.contains("let Some(term_1) = self.term() else {"));
    assert!(code.contains("return Some(ParseValue::seq(vec![term, literal, term_1, newline]));"));
}

#[test]
fn helper_synthesis_test() {
    let code = generate("start: term ('+' term)* NEWLINE\nterm: NUMBER\n");
    assert!(code.contains("fn _loop0_1(&mut self) -> Option<ParseValue> {"));
    assert!(code.contains("fn _tmp_2(&mut self) -> Option<ParseValue> {"));
    assert!(code.contains("self.memoized(K__LOOP0_1, Self::_loop0_1_body)"));
}

#[test]
fn gather_helper_test() {
    let code = generate("start: ','.thing+ NEWLINE\nthing: NUMBER\n");
    assert!(code.contains("fn _gather_1(&mut self) -> Option<ParseValue> {"));
    assert!(code.contains("let mut children = vec![first];"));
    assert!(code.contains("self.expect_literal(\",\")"));
}

#[test]
fn repeat1_helper_test() {
    let code = generate("start: thing+ NEWLINE\nthing: NUMBER\n");
    assert!(code.contains("fn _loop1_1(&mut self) -> Option<ParseValue> {"));
    assert!(code.contains("if children.is_empty() {"));
}

#[test]
fn optional_inline_test() {
    let code = generate("start: term '+' ? NEWLINE\nterm: NUMBER\n");
    assert!(code.contains("let literal = self.expect_literal(\"+\").unwrap_or(ParseValue::Absent);"));
}

#[test]
fn lookahead_emission_test() {
    let code = generate(
        "start: expr_stmt NEWLINE\nexpr_stmt: !(target '=') NUMBER\ntarget: NAME\n",
    );
    assert!(code.contains("if !self.lookahead(false, Self::_tmp_1) {"));
    assert!(code.contains("fn _tmp_1(&mut self) -> Option<ParseValue> {"));
}

#[test]
fn cut_emission_test() {
    let code = generate("start: '(' ~ NUMBER ')'\n");
    assert!(code.contains("let mut cut = false;"));
    assert!(code.contains("cut = true;"));
    assert!(code.contains("if cut {\n            return None;\n        }"));
}

#[test]
fn action_verbatim_test() {
    let code = generate("start: n=NUMBER NEWLINE { make_number(n) }\n");
    assert!(code.contains("let Some(n) = self.expect_kind(T_NUMBER) else {"));
    assert!(code.contains("return Some(make_number(n));"));
}

#[test]
fn helper_reuse_test() {
    let code = generate("start: ('x' 'y') ('x' 'y') NEWLINE\n");
    assert_eq!(code.matches("fn _tmp_1(&mut self)").count(), 1);
    assert_eq!(code.matches("self._tmp_1()").count(), 2);
    assert!(!code.contains("_tmp_2"));
}

#[test]
fn deterministic_output_test() {
    let source = "start: expr NEWLINE\nexpr: expr '+' term | term\nterm: NUMBER\n";
    assert_eq!(generate(source), generate(source));
}

#[test]
fn rejects_invalid_grammars_test() {
    assert_eq!(
        emitter_error("start: foo ENDMARKER\nfoo: bar NAME\n"),
        GrammarError::DanglingReference("bar".to_string())
    );
    assert_eq!(
        emitter_error("foo: NAME\n"),
        GrammarError::MissingStart
    );
    assert_eq!(
        emitter_error("start: foo\nfoo: NAMEE\n"),
        GrammarError::UnknownToken("NAMEE".to_string())
    );
    assert_eq!(
        emitter_error("start: foo=!'x' NAME\n"),
        GrammarError::InvalidNamedLookahead("foo".to_string())
    );
    assert!(emitter_error(
        "start: foo\n\
         foo: bar '+' | baz '+' | '+'\n\
         bar: baz '-' | foo '-' | '-'\n\
         baz: foo '*' | bar '*' | '*'\n"
    )
    .is_no_leader());
}

#[test]
fn keyword_rule_name_is_escaped_test() {
    let code = generate("start: loop NEWLINE\nloop: NUMBER\n");
    assert!(code.contains("pub fn loop_(&mut self) -> Option<ParseValue> {"));
    assert!(code.contains("let Some(loop_) = self.loop_() else {"));
}
