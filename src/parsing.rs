use crate::{
    Alt, Cache, CacheKey, Grammar, GrammarError, Item, Log, ParseError, ParseValue, Parser, Rhs,
    Rule, RuleId, TokenKind, TokenStream, Vocabulary,
};
use once_cell::unsync::OnceCell;
use std::rc::Rc;

impl<'g> Parser<'g> {
    /// Validate and analyze the grammar, then build a parser for it. The
    /// grammar is read-only afterwards; one parser can run any number of
    /// parses.
    pub fn new(grammar: &'g Grammar, vocabulary: Rc<Vocabulary>) -> Result<Self, GrammarError> {
        grammar.analyze(&vocabulary)?;
        Ok(Self {
            grammar,
            vocabulary,
            log: OnceCell::new(),
        })
    }

    /// Set a trace label for verbose runs.
    pub fn set_log(&self, log: Log<&'static str>) -> Result<(), String> {
        self.log
            .set(log)
            .map_err(|_| "A trace label is already assigned for this parser.".to_string())
    }

    /// Tokenize the text and parse it from the `start` rule.
    pub fn parse(&self, text: &str) -> Result<ParseValue, ParseError> {
        self.parse_stream(TokenStream::from_text(text, self.vocabulary.clone()))
    }

    /// Parse an already-tokenized stream from the `start` rule. The parse
    /// succeeds only if the cursor rests on ENDMARKER afterwards; otherwise
    /// the error reports the furthest position reached.
    pub fn parse_stream(&self, stream: TokenStream) -> Result<ParseValue, ParseError> {
        let mut run = ParseRun {
            grammar: self.grammar,
            vocabulary: self.vocabulary.clone(),
            stream,
            cache: Cache::root(),
            log: self.log.get().copied().unwrap_or(Log::None),
            level: 0,
        };
        run.run()
    }
}

/// Per-parse state: the cursor, the memo table and the trace nesting depth.
/// Dropped as one unit when the parse ends.
struct ParseRun<'g> {
    grammar: &'g Grammar,
    vocabulary: Rc<Vocabulary>,
    stream: TokenStream,
    cache: Cache,
    log: Log<&'static str>,
    level: usize,
}

enum AltOutcome {
    Matched(ParseValue),
    Failed { committed: bool },
}

impl<'g> ParseRun<'g> {
    fn run(&mut self) -> Result<ParseValue, ParseError> {
        let _ = self.stream.peek();
        let start = self
            .grammar
            .rule_id("start")
            .expect("validated grammar has a start rule");
        match self.apply_rule(start) {
            Some(value) if self.stream.peek().kind == Vocabulary::ENDMARKER => Ok(value),
            Some(_) => {
                let position = self.stream.mark();
                self.cache.note_failure(position);
                Err(self.syntax_error())
            }
            None => Err(self.syntax_error()),
        }
    }

    fn syntax_error(&mut self) -> ParseError {
        let mark = self.cache.furthest().max(self.stream.mark());
        let token = self.stream.get(mark);
        let message = if token.kind == Vocabulary::ENDMARKER {
            "Unexpected end of input".to_string()
        } else {
            format!("Unexpected '{}'", token.string)
        };
        ParseError::new(token.span.start, message)
    }

    fn apply_rule(&mut self, id: RuleId) -> Option<ParseValue> {
        let grammar: &'g Grammar = self.grammar;
        let rule = grammar.rule(id);
        self.log_enter(rule.name());
        self.level += 1;
        let result = if rule.is_leader() {
            self.apply_leader(id, rule)
        } else if rule.is_left_recursive() {
            // Non-leader members of a left-recursive group are never
            // memoized: each growth iteration must re-enter them against the
            // leader's updated cache entry.
            self.eval_rule_body(rule)
        } else {
            self.apply_memoized(id, rule)
        };
        self.level -= 1;
        self.log_result(rule.name(), &result);
        result
    }

    fn apply_memoized(&mut self, id: RuleId, rule: &'g Rule) -> Option<ParseValue> {
        let key = CacheKey::new(id.index());
        let position = self.stream.mark();
        if let Some((value, end)) = self.cache.lookup(key, position) {
            self.stream.reset(end);
            return value;
        }
        let value = self.eval_rule_body(rule);
        let end = self.stream.mark();
        self.cache.insert(key, position, value.clone(), end);
        value
    }

    /// Leader invocation: seed the cache with failure, then repeatedly
    /// re-parse the body. Recursive applications inside each iteration hit
    /// the seed, so every round sees the previous round's parse and the
    /// accepted parse grows until a round stops improving.
    fn apply_leader(&mut self, id: RuleId, rule: &'g Rule) -> Option<ParseValue> {
        let key = CacheKey::new(id.index());
        let position = self.stream.mark();
        if let Some((value, end)) = self.cache.lookup(key, position) {
            self.stream.reset(end);
            return value;
        }
        self.cache.insert(key, position, None, position);
        loop {
            self.stream.reset(position);
            let parsed = self.eval_rule_body(rule);
            let end = self.stream.mark();
            let (_, best_end) = self
                .cache
                .lookup(key, position)
                .expect("seed entry is present");
            if parsed.is_none() || end <= best_end {
                break;
            }
            self.cache.insert(key, position, parsed, end);
        }
        let (value, end) = self
            .cache
            .lookup(key, position)
            .expect("seed entry is present");
        self.stream.reset(end);
        value
    }

    fn eval_rule_body(&mut self, rule: &'g Rule) -> Option<ParseValue> {
        let position = self.stream.mark();
        match self.eval_rhs(rule.flat_rhs()) {
            Some(value) => Some(value),
            None => {
                self.stream.reset(position);
                None
            }
        }
    }

    fn eval_rhs(&mut self, rhs: &'g Rhs) -> Option<ParseValue> {
        for alt in &rhs.alts {
            match self.eval_alt(alt) {
                AltOutcome::Matched(value) => return Some(value),
                AltOutcome::Failed { committed: true } => return None,
                AltOutcome::Failed { committed: false } => {}
            }
        }
        None
    }

    /// Evaluate one alternative. The value is the sequence of significant
    /// item values; user actions are opaque to the interpreter and the
    /// default shape is produced instead (the emitter reproduces them
    /// verbatim).
    fn eval_alt(&mut self, alt: &'g Alt) -> AltOutcome {
        let position = self.stream.mark();
        let mut committed = false;
        let mut values = Vec::new();
        for named in &alt.items {
            match &named.item {
                Item::Cut => {
                    committed = true;
                }
                item @ Item::Lookahead { .. } => {
                    if self.eval_item(item).is_none() {
                        self.stream.reset(position);
                        return AltOutcome::Failed { committed };
                    }
                }
                item => match self.eval_item(item) {
                    Some(value) => values.push(value),
                    None => {
                        self.stream.reset(position);
                        return AltOutcome::Failed { committed };
                    }
                },
            }
        }
        AltOutcome::Matched(ParseValue::Seq(values))
    }

    fn eval_item(&mut self, item: &'g Item) -> Option<ParseValue> {
        match item {
            Item::NameLeaf(name) => match self.vocabulary.token_kind(name) {
                Some(kind) => self.expect_kind(kind),
                None => {
                    let id = self
                        .grammar
                        .rule_id(name)
                        .expect("validated rule reference");
                    self.apply_rule(id)
                }
            },
            Item::StringLeaf(literal) => self.expect_literal(literal),
            Item::Group(rhs) => self.eval_rhs(rhs),
            Item::Opt(inner) => Some(self.eval_item(inner).unwrap_or(ParseValue::Absent)),
            Item::Repeat0(inner) => Some(self.repeat(inner)),
            Item::Repeat1(inner) => {
                let value = self.repeat(inner);
                if value.children().is_empty() {
                    None
                } else {
                    Some(value)
                }
            }
            Item::Gather { separator, element } => self.gather(separator, element),
            Item::Lookahead { positive, atom } => {
                let position = self.stream.mark();
                let matched = self.eval_item(atom).is_some();
                self.stream.reset(position);
                if matched == *positive {
                    Some(ParseValue::Absent)
                } else {
                    None
                }
            }
            // Commit is handled at the alternative level.
            Item::Cut => Some(ParseValue::Absent),
        }
    }

    /// Greedy repetition. Each element is shaped as a one-item alternative
    /// of a synthesized rule. A zero-width element is accepted once and the
    /// loop stops.
    fn repeat(&mut self, inner: &'g Item) -> ParseValue {
        let mut values = Vec::new();
        loop {
            let position = self.stream.mark();
            match self.eval_item(inner) {
                Some(value) => {
                    values.push(ParseValue::Seq(vec![value]));
                    if self.stream.mark() == position {
                        break;
                    }
                }
                None => {
                    self.stream.reset(position);
                    break;
                }
            }
        }
        ParseValue::Seq(values)
    }

    fn gather(&mut self, separator: &'g Item, element: &'g Item) -> Option<ParseValue> {
        let first = self.eval_item(element)?;
        let mut values = vec![first];
        loop {
            let position = self.stream.mark();
            if self.eval_item(separator).is_none() {
                self.stream.reset(position);
                break;
            }
            match self.eval_item(element) {
                Some(value) => values.push(value),
                None => {
                    self.stream.reset(position);
                    break;
                }
            }
        }
        Some(ParseValue::Seq(values))
    }

    fn expect_kind(&mut self, kind: TokenKind) -> Option<ParseValue> {
        let position = self.stream.mark();
        match self.stream.expect_kind(kind) {
            Some(token) => Some(ParseValue::Token(token)),
            None => {
                self.cache.note_failure(position);
                None
            }
        }
    }

    fn expect_literal(&mut self, literal: &str) -> Option<ParseValue> {
        let position = self.stream.mark();
        match self.stream.expect_literal(literal) {
            Some(token) => Some(ParseValue::Token(token)),
            None => {
                self.cache.note_failure(position);
                None
            }
        }
    }

    fn log_enter(&mut self, _name: &str) {
        #[cfg(debug_assertions)]
        if self.log >= Log::Verbose("") {
            let at = format!("{}", self.stream.peek());
            println!("{}Entering '{}' at {}", "  ".repeat(self.level), _name, at);
        }
    }

    fn log_result(&mut self, _name: &str, _result: &Option<ParseValue>) {
        #[cfg(debug_assertions)]
        match _result {
            Some(_) => {
                if self.log >= Log::Success("") {
                    println!(
                        "{}Parsed '{}' up to {}",
                        "  ".repeat(self.level),
                        _name,
                        self.stream.peek().span.start
                    );
                }
            }
            None => {
                if self.log >= Log::Result("") {
                    println!(
                        "{}Rule '{}' did not match at {}",
                        "  ".repeat(self.level),
                        _name,
                        self.stream.peek().span.start
                    );
                }
            }
        }
    }
}
