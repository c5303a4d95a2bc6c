use crate::{Grammar, GrammarError, ParseError, ParseValue, Parser, Vocabulary};
use serde_json::Value;
use std::rc::Rc;

pub fn grammar(source: &str) -> Grammar {
    crate::meta::parse_grammar(source).expect("grammar source parses")
}

pub fn analyzed(source: &str) -> Grammar {
    let grammar = grammar(source);
    grammar
        .analyze(&Vocabulary::core())
        .expect("grammar analyzes");
    grammar
}

pub fn analysis_error(source: &str) -> GrammarError {
    grammar(source)
        .analyze(&Vocabulary::core())
        .expect_err("analysis should fail")
}

pub fn run(grammar_source: &str, input: &str) -> Result<ParseValue, ParseError> {
    let grammar = grammar(grammar_source);
    let parser = Parser::new(&grammar, Rc::new(Vocabulary::core())).expect("grammar is valid");
    parser.parse(input)
}

/// Structural snapshot of a parse value: tokens as `KIND:text` strings,
/// sequences as arrays, absent optionals as null.
pub fn shape(value: &ParseValue) -> Value {
    fn convert(value: &ParseValue, vocabulary: &Vocabulary) -> Value {
        match value {
            ParseValue::Token(token) => Value::String(format!(
                "{}:{}",
                vocabulary.name_of(token.kind),
                token.string
            )),
            ParseValue::Seq(values) => Value::Array(
                values
                    .iter()
                    .map(|value| convert(value, vocabulary))
                    .collect(),
            ),
            ParseValue::Absent => Value::Null,
        }
    }
    convert(value, &Vocabulary::core())
}
