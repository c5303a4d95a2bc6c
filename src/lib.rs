//! peg_pt is a library to build and generate [PEG](https://en.wikipedia.org/wiki/Parsing_expression_grammar)
//! parsers with packrat memoization and support for direct and indirect left recursion.
//!
//! # Overview
//! A parsing expression grammar describes a language by ordered choice: the first
//! alternative that matches at a position wins, and matching never reconsiders a
//! committed choice. Combined with packrat memoization this gives linear-time
//! recursive-descent parsing, but plain PEG cannot express left-recursive rules
//! like `expr: expr '+' term | term`. This library closes that gap: it analyzes
//! the grammar for left-recursive rule groups, elevates one rule per group as the
//! leader, and parses leader rules with an iterative "grow the seed" procedure
//! that accepts their longest parse.
//!
//! # Design
//! A grammar is a [Grammar] value, either constructed directly from [Rule]s or
//! read from the grammar meta-language with [meta::parse_grammar]. The analyzer
//! annotates every rule with its nullability and left-recursion classification.
//! The same annotated grammar then drives two interchangeable back ends:
//!
//! * [Parser] interprets the grammar over a [TokenStream], honoring the packrat
//!   runtime contract directly, and
//! * [ParserEmitter] renders Rust source text for a standalone parser whose
//!   per-rule methods follow the identical contract.
//!
//! # Example
//! ```
//! use peg_pt::{Parser, ParserEmitter, Vocabulary};
//! use std::rc::Rc;
//!
//! let grammar = peg_pt::meta::parse_grammar(
//!     "start: expr NEWLINE\n\
//!      expr: expr '+' term | term\n\
//!      term: NUMBER\n",
//! )
//! .unwrap();
//!
//! let vocabulary = Rc::new(Vocabulary::core());
//!
//! // Interpret the grammar directly. The parse is left-leaning even though
//! // `expr` is left-recursive.
//! let parser = Parser::new(&grammar, vocabulary.clone()).unwrap();
//! let value = parser.parse("1 + 2 + 3\n").unwrap();
//! value.print(&vocabulary).unwrap();
//!
//! // Or render the equivalent standalone parser as Rust source text.
//! let emitter = ParserEmitter::new(&grammar, vocabulary).unwrap();
//! let source = emitter.generate();
//! assert!(source.contains("pub struct GeneratedParser"));
//! ```

mod analysis;
mod cache;
mod emit;
mod error;
mod grammar;
mod lexer;
pub mod meta;
mod parsing;
mod stream;
mod token;
mod value;
mod vocabulary;

#[cfg(test)]
mod __tests__;

use once_cell::unsync::OnceCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
/// Numeric token kind from the [Vocabulary] universe.
pub struct TokenKind(u16);

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
/// The line and column of a code point, both 1-based.
pub struct Position {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Source extent of a token: start and end positions plus the text of the
/// line the token starts on.
pub struct Span {
    pub start: Position,
    pub end: Position,
    pub line: Rc<str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A single lexical token. Tokens are immutable once produced.
pub struct Token {
    pub kind: TokenKind,
    pub string: String,
    pub span: Span,
}

/// The token-kind universe a grammar is resolved against: the well-known
/// kinds, the single-character punctuation map, and user-declared keywords.
pub struct Vocabulary {
    kind_names: Vec<String>,
    by_name: HashMap<String, TokenKind>,
    punctuation: HashMap<char, TokenKind>,
    keywords: HashMap<String, TokenKind>,
}

/// A regex-driven tokenizer producing the [Token] stream a generated or
/// interpreted parser consumes.
pub struct Lexer {
    vocabulary: Rc<Vocabulary>,
    name: regex::Regex,
    number: regex::Regex,
    string: regex::Regex,
    comment: regex::Regex,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
/// Opaque cursor snapshot into a [TokenStream], supporting O(1) reset.
pub struct Mark(usize);

/// Cursor over a cached, filtered token sequence.
///
/// Tokens are pulled from the producer on demand; comment tokens,
/// non-syntactic newlines and whitespace error tokens are dropped before they
/// become visible, and NAME tokens matching an installed keyword table are
/// re-tagged at first materialization. Marks taken from the stream stay valid
/// for its whole lifetime.
pub struct TokenStream {
    producer: Box<dyn Iterator<Item = Token>>,
    vocabulary: Rc<Vocabulary>,
    cached: Vec<Token>,
    index: usize,
    keywords: HashMap<String, TokenKind>,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
/// A unique key to save and retrieve parsed results for the packrat cache.
pub struct CacheKey(usize);

/// The packrat memo table: parsed results keyed by rule and position, plus
/// the furthest position any token match was attempted and failed at.
pub struct Cache {
    entries: HashMap<(CacheKey, Mark), (Option<ParseValue>, Mark)>,
    furthest: Mark,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Result value of a parse, shaped as the runtime contract prescribes:
/// alternatives yield the sequence of their significant item values, failed
/// optionals yield [ParseValue::Absent].
pub enum ParseValue {
    Token(Token),
    Seq(Vec<ParseValue>),
    Absent,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
/// Index of a rule within its [Grammar], stable across analysis.
pub struct RuleId(usize);

/// A grammar: rules keyed by name, insertion order preserved for
/// deterministic analysis and emission.
pub struct Grammar {
    rules: Vec<Rule>,
    index: HashMap<String, RuleId>,
    analyzed: OnceCell<()>,
}

/// A named rule with its alternatives and write-once analysis flags.
///
/// The `nullable`, `left_recursive` and `leader` flags are undefined until
/// [Grammar::analyze] has run and immutable afterwards.
pub struct Rule {
    name: String,
    result_type: Option<String>,
    rhs: Rhs,
    nullable: OnceCell<bool>,
    left_recursive: OnceCell<bool>,
    leader: OnceCell<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// The ordered, non-empty alternatives of a rule. PEG semantics: the first
/// alternative to match at a position wins.
pub struct Rhs {
    pub alts: Vec<Alt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One alternative: a sequence of items plus an optional opaque action.
pub struct Alt {
    pub items: Vec<NamedItem>,
    pub action: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// An item together with its optional binding name for action expressions.
pub struct NamedItem {
    pub name: Option<String>,
    pub item: Item,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A parsing expression.
pub enum Item {
    /// Reference to a rule, or to a token kind when the name is all-uppercase
    /// and known to the vocabulary.
    NameLeaf(String),
    /// Matches a token whose text equals the literal.
    StringLeaf(String),
    /// Parenthesized sub-expression.
    Group(Rhs),
    /// Optional: succeeds with [ParseValue::Absent] when the inner item fails.
    Opt(Box<Item>),
    /// Greedy zero-or-more repetition.
    Repeat0(Box<Item>),
    /// Greedy one-or-more repetition.
    Repeat1(Box<Item>),
    /// One-or-more elements separated by a separator; separators are
    /// discarded from the result.
    Gather {
        separator: Box<Item>,
        element: Box<Item>,
    },
    /// Positive or negative lookahead; consumes no input.
    Lookahead { positive: bool, atom: Box<Item> },
    /// Commits the enclosing alternative.
    Cut,
}

/// The interpreting packrat parser. Validates and analyzes the grammar on
/// construction, then parses any number of inputs against it.
pub struct Parser<'g> {
    grammar: &'g Grammar,
    vocabulary: Rc<Vocabulary>,
    log: OnceCell<Log<&'static str>>,
}

/// Renders a [Grammar] into Rust source text for a standalone parser that
/// honors the packrat runtime contract.
pub struct ParserEmitter<'g> {
    grammar: &'g Grammar,
    vocabulary: Rc<Vocabulary>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A static grammar defect, fatal to analysis and emission.
pub enum GrammarError {
    /// No rule named `start`.
    MissingStart,
    /// A lowercase name that resolves to no rule.
    DanglingReference(String),
    /// An uppercase name that is neither a known token kind nor a rule.
    UnknownToken(String),
    /// A lookahead item carrying a binding name.
    InvalidNamedLookahead(String),
    /// A left-recursive rule group in which no rule lies on every cycle.
    NoLeader(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A dynamic parse failure, carrying the furthest position reached.
pub struct ParseError {
    pub position: Position,
    pub message: String,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
/// Trace levels assignable to a [Parser] for verbose runs. Variants are
/// declared from quietest to noisiest, so the derived ordering compares
/// verbosity: `Success` traces matched rules, `Result` also traces
/// mismatches, `Verbose` additionally traces every rule entry.
pub enum Log<T> {
    None,
    Default(T),
    Success(T),
    Result(T),
    Verbose(T),
}
