use crate::{Alt, Grammar, GrammarError, Item, ParserEmitter, Rhs, Rule, TokenKind, Vocabulary};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

impl<'g> ParserEmitter<'g> {
    /// Validate and analyze the grammar; a grammar that violates any static
    /// invariant is rejected here, before anything is rendered.
    pub fn new(grammar: &'g Grammar, vocabulary: Rc<Vocabulary>) -> Result<Self, GrammarError> {
        grammar.analyze(&vocabulary)?;
        Ok(Self {
            grammar,
            vocabulary,
        })
    }

    /// Render the parser source. Output is deterministic: rules in insertion
    /// order, helpers in synthesis order, token-kind constants sorted by
    /// name.
    pub fn generate(&self) -> String {
        let mut state = EmitterState {
            vocabulary: &self.vocabulary,
            helpers: Vec::new(),
            reuse: HashMap::new(),
            counter: 0,
            next_key: self.grammar.rules().len(),
            kinds: BTreeMap::new(),
        };
        state.require_kind("ENDMARKER");

        let mut methods = String::new();
        for (index, rule) in self.grammar.rules().iter().enumerate() {
            state.emit_rule(&mut methods, index, rule);
        }
        // Emitting a helper body may synthesize further helpers; drain until
        // the queue stops growing.
        let mut next = 0;
        while next < state.helpers.len() {
            let helper = state.helpers[next].clone();
            state.emit_helper(&mut methods, &helper);
            next += 1;
        }

        let mut out = String::new();
        out.push_str("// @generated by peg-pt. Do not edit by hand.\n\n");
        out.push_str(
            "use peg_pt::{Cache, CacheKey, Mark, ParseError, ParseValue, TokenKind, TokenStream};\n\n",
        );
        for (index, rule) in self.grammar.rules().iter().enumerate() {
            // Left-recursive non-leaders never touch the cache and get no key.
            if rule.is_left_recursive() && !rule.is_leader() {
                continue;
            }
            out.push_str(&format!(
                "const {}: CacheKey = CacheKey::new({});\n",
                key_const(rule.name()),
                index
            ));
        }
        for helper in &state.helpers {
            out.push_str(&format!(
                "const {}: CacheKey = CacheKey::new({});\n",
                key_const(&helper.name),
                helper.key
            ));
        }
        for (name, kind) in &state.kinds {
            out.push_str(&format!(
                "const T_{}: TokenKind = TokenKind::new({});\n",
                name,
                kind.value()
            ));
        }
        out.push('\n');
        out.push_str(SCAFFOLDING_OPEN);
        out.push_str(&methods);
        out.push_str("}\n");
        out
    }
}

const SCAFFOLDING_OPEN: &str = r#"pub struct GeneratedParser {
    stream: TokenStream,
    cache: Cache,
}

impl GeneratedParser {
    pub fn new(stream: TokenStream) -> Self {
        Self {
            stream,
            cache: Cache::root(),
        }
    }

    /// Parse from the `start` rule. The input must be consumed up to the
    /// ENDMARKER sentinel; otherwise the error reports the furthest
    /// position reached.
    pub fn parse(&mut self) -> Result<ParseValue, ParseError> {
        if let Some(value) = self.start() {
            if self.stream.peek().kind == T_ENDMARKER {
                return Ok(value);
            }
            let position = self.mark();
            self.cache.note_failure(position);
        }
        Err(self.syntax_error())
    }

    fn syntax_error(&mut self) -> ParseError {
        let mark = self.cache.furthest().max(self.mark());
        let token = self.stream.get(mark).clone();
        let message = if token.kind == T_ENDMARKER {
            "Unexpected end of input".to_string()
        } else {
            format!("Unexpected '{}'", token.string)
        };
        ParseError::new(token.span.start, message)
    }

    fn mark(&self) -> Mark {
        self.stream.mark()
    }

    fn reset(&mut self, mark: Mark) {
        self.stream.reset(mark);
    }

    fn expect_kind(&mut self, kind: TokenKind) -> Option<ParseValue> {
        let position = self.mark();
        match self.stream.expect_kind(kind) {
            Some(token) => Some(ParseValue::Token(token)),
            None => {
                self.cache.note_failure(position);
                None
            }
        }
    }

    fn expect_literal(&mut self, literal: &str) -> Option<ParseValue> {
        let position = self.mark();
        match self.stream.expect_literal(literal) {
            Some(token) => Some(ParseValue::Token(token)),
            None => {
                self.cache.note_failure(position);
                None
            }
        }
    }

    fn lookahead(&mut self, positive: bool, body: fn(&mut Self) -> Option<ParseValue>) -> bool {
        let position = self.mark();
        let matched = body(self).is_some();
        self.reset(position);
        matched == positive
    }

    fn memoized(
        &mut self,
        key: CacheKey,
        body: fn(&mut Self) -> Option<ParseValue>,
    ) -> Option<ParseValue> {
        let position = self.mark();
        if let Some((value, end)) = self.cache.lookup(key, position) {
            self.reset(end);
            return value;
        }
        let value = body(self);
        let end = self.mark();
        self.cache.insert(key, position, value.clone(), end);
        value
    }

    fn grow(
        &mut self,
        key: CacheKey,
        body: fn(&mut Self) -> Option<ParseValue>,
    ) -> Option<ParseValue> {
        let position = self.mark();
        if let Some((value, end)) = self.cache.lookup(key, position) {
            self.reset(end);
            return value;
        }
        self.cache.insert(key, position, None, position);
        loop {
            self.reset(position);
            let parsed = body(self);
            let end = self.mark();
            let best = self
                .cache
                .lookup(key, position)
                .map(|(_, end)| end)
                .unwrap_or(position);
            if parsed.is_none() || end <= best {
                break;
            }
            self.cache.insert(key, position, parsed, end);
        }
        let (value, end) = self
            .cache
            .lookup(key, position)
            .unwrap_or((None, position));
        self.reset(end);
        value
    }

"#;

/// A synthesized rule for an inline sub-expression, owning its fragment of
/// the grammar.
#[derive(Clone)]
struct Helper {
    name: String,
    key: usize,
    body: HelperBody,
}

#[derive(Clone)]
enum HelperBody {
    Alts(Rhs),
    Loop0(Item),
    Loop1(Item),
    Gather { separator: Item, element: Item },
}

struct EmitterState<'v> {
    vocabulary: &'v Vocabulary,
    helpers: Vec<Helper>,
    reuse: HashMap<String, String>,
    counter: usize,
    next_key: usize,
    kinds: BTreeMap<String, TokenKind>,
}

impl<'v> EmitterState<'v> {
    fn emit_rule(&mut self, out: &mut String, _index: usize, rule: &Rule) {
        let method = safe_name(rule.name());
        let head = match rule.result_type() {
            Some(t) => format!("{}[{}]", rule.name(), t),
            None => rule.name().to_string(),
        };
        out.push_str(&format!("    /// {}: {}\n", head, rule.rhs()));
        out.push_str(&format!(
            "    pub fn {}(&mut self) -> Option<ParseValue> {{\n",
            method
        ));
        if rule.is_leader() {
            out.push_str(&format!(
                "        self.grow({}, Self::{}_body)\n",
                key_const(rule.name()),
                method
            ));
        } else if rule.is_left_recursive() {
            // Left-recursive non-leaders stay unmemoized so every growth
            // iteration of their leader re-evaluates them.
            out.push_str(&format!("        self.{}_body()\n", method));
        } else {
            out.push_str(&format!(
                "        self.memoized({}, Self::{}_body)\n",
                key_const(rule.name()),
                method
            ));
        }
        out.push_str("    }\n\n");
        self.emit_alts_body(out, &format!("{}_body", method), rule.flat_rhs());
    }

    fn emit_helper(&mut self, out: &mut String, helper: &Helper) {
        let method = &helper.name;
        out.push_str(&format!(
            "    fn {}(&mut self) -> Option<ParseValue> {{\n",
            method
        ));
        out.push_str(&format!(
            "        self.memoized({}, Self::{}_body)\n",
            key_const(method),
            method
        ));
        out.push_str("    }\n\n");
        match &helper.body {
            HelperBody::Alts(rhs) => {
                let rhs = rhs.clone();
                self.emit_alts_body(out, &format!("{}_body", method), &rhs);
            }
            HelperBody::Loop0(inner) => {
                let call = self.call_expr(inner);
                out.push_str(&loop_body(method, &call, false));
            }
            HelperBody::Loop1(inner) => {
                let call = self.call_expr(inner);
                out.push_str(&loop_body(method, &call, true));
            }
            HelperBody::Gather { separator, element } => {
                let separator_call = self.call_expr(separator);
                let element_call = self.call_expr(element);
                out.push_str(&format!(
                    r#"    fn {method}_body(&mut self) -> Option<ParseValue> {{
        let Some(first) = {element_call} else {{
            return None;
        }};
        let mut children = vec![first];
        loop {{
            let position = self.mark();
            if {separator_call}.is_none() {{
                self.reset(position);
                break;
            }}
            let Some(next) = {element_call} else {{
                self.reset(position);
                break;
            }};
            children.push(next);
        }}
        Some(ParseValue::seq(children))
    }}

"#,
                ));
            }
        }
    }

    fn emit_alts_body(&mut self, out: &mut String, fn_name: &str, rhs: &Rhs) {
        out.push_str(&format!(
            "    fn {}(&mut self) -> Option<ParseValue> {{\n",
            fn_name
        ));
        out.push_str("        let position = self.mark();\n");
        for (index, alt) in rhs.alts.iter().enumerate() {
            self.emit_alt(out, index, alt);
        }
        out.push_str("        None\n    }\n\n");
    }

    fn emit_alt(&mut self, out: &mut String, index: usize, alt: &Alt) {
        let label = format!("'alt{}", index);
        let has_cut = alt.items.iter().any(|n| matches!(n.item, Item::Cut));
        out.push_str(&format!("        // {}\n", alt));
        if has_cut {
            out.push_str("        let mut cut = false;\n");
        }
        out.push_str(&format!("        {}: {{\n", label));

        let mut allocated: HashMap<String, usize> = HashMap::new();
        let mut values: Vec<String> = Vec::new();
        for named in &alt.items {
            match &named.item {
                Item::Cut => {
                    out.push_str("            cut = true;\n");
                }
                Item::Lookahead { positive, atom } => {
                    let target = self.callable(atom.as_ref());
                    out.push_str(&format!(
                        "            if !self.lookahead({}, {}) {{\n                break {};\n            }}\n",
                        positive, target, label
                    ));
                }
                Item::Opt(inner) => {
                    let (call, base) = self.call_with_name(inner.as_ref());
                    let variable = fresh(&mut allocated, &named.name, &base);
                    out.push_str(&format!(
                        "            let {} = {}.unwrap_or(ParseValue::Absent);\n",
                        variable, call
                    ));
                    values.push(variable);
                }
                item => {
                    let (call, base) = self.call_with_name(item);
                    let variable = fresh(&mut allocated, &named.name, &base);
                    out.push_str(&format!(
                        "            let Some({}) = {} else {{\n                break {};\n            }};\n",
                        variable, call, label
                    ));
                    values.push(variable);
                }
            }
        }

        match &alt.action {
            Some(action) => {
                out.push_str(&format!("            return Some({});\n", action));
            }
            None => {
                out.push_str(&format!(
                    "            return Some(ParseValue::seq(vec![{}]));\n",
                    values.join(", ")
                ));
            }
        }
        out.push_str("        }\n");
        out.push_str("        self.reset(position);\n");
        if has_cut {
            out.push_str("        if cut {\n            return None;\n        }\n");
        }
    }

    /// The call expression for an item plus the canonical base name its
    /// value binds to.
    fn call_with_name(&mut self, item: &Item) -> (String, String) {
        match item {
            Item::NameLeaf(name) => match self.vocabulary.token_kind(name) {
                Some(_) => {
                    self.require_kind(name);
                    (
                        format!("self.expect_kind(T_{})", name),
                        name.to_ascii_lowercase(),
                    )
                }
                None => {
                    let method = safe_name(name);
                    (format!("self.{}()", method), method)
                }
            },
            Item::StringLeaf(literal) => (
                format!("self.expect_literal({:?})", literal),
                "literal".to_string(),
            ),
            Item::Group(rhs) => {
                let name = self.alts_helper(rhs);
                (format!("self.{}()", name), name)
            }
            Item::Opt(_) => {
                // Only reached when an optional nests inside another
                // compound item; the synthesized rule restores the plain
                // optional shape.
                let name = self.alts_helper(&Rhs::new(vec![Alt::new(
                    vec![crate::NamedItem::bare(item.clone())],
                    None,
                )]));
                (format!("self.{}()", name), name)
            }
            Item::Repeat0(inner) => {
                let name = self.item_helper("loop0", &format!("{}", item), |_| {
                    HelperBody::Loop0((**inner).clone())
                });
                (format!("self.{}()", name), name)
            }
            Item::Repeat1(inner) => {
                let name = self.item_helper("loop1", &format!("{}", item), |_| {
                    HelperBody::Loop1((**inner).clone())
                });
                (format!("self.{}()", name), name)
            }
            Item::Gather { separator, element } => {
                let name = self.item_helper("gather", &format!("{}", item), |_| {
                    HelperBody::Gather {
                        separator: (**separator).clone(),
                        element: (**element).clone(),
                    }
                });
                (format!("self.{}()", name), name)
            }
            Item::Lookahead { .. } | Item::Cut => {
                unreachable!("handled at the alternative level")
            }
        }
    }

    fn call_expr(&mut self, item: &Item) -> String {
        match item {
            Item::Opt(inner) => {
                let (call, _) = self.call_with_name(inner.as_ref());
                format!("{}.unwrap_or(ParseValue::Absent)", call)
            }
            _ => self.call_with_name(item).0,
        }
    }

    /// Method path usable as a `fn(&mut Self)` reference; any atom that is
    /// not a bare rule reference gets a synthesized rule.
    fn callable(&mut self, atom: &Item) -> String {
        match atom {
            Item::NameLeaf(name) if self.vocabulary.token_kind(name).is_none() => {
                format!("Self::{}", safe_name(name))
            }
            Item::Group(rhs) => {
                let rhs = rhs.clone();
                format!("Self::{}", self.alts_helper(&rhs))
            }
            other => {
                let name = self.alts_helper(&Rhs::new(vec![Alt::new(
                    vec![crate::NamedItem::bare(other.clone())],
                    None,
                )]));
                format!("Self::{}", name)
            }
        }
    }

    fn alts_helper(&mut self, rhs: &Rhs) -> String {
        let rhs = rhs.clone();
        self.item_helper("tmp", &format!("({})", rhs), move |_| {
            HelperBody::Alts(rhs.clone())
        })
    }

    /// Synthesize (or reuse) a helper rule. Reuse is keyed by the rendered
    /// source of the sub-expression, so identical fragments share one rule.
    fn item_helper(
        &mut self,
        prefix: &str,
        display: &str,
        build: impl Fn(&Self) -> HelperBody,
    ) -> String {
        let reuse_key = format!("{}:{}", prefix, display);
        if let Some(name) = self.reuse.get(&reuse_key) {
            return name.clone();
        }
        self.counter += 1;
        let name = format!("_{}_{}", prefix, self.counter);
        let helper = Helper {
            name: name.clone(),
            key: self.next_key,
            body: build(self),
        };
        self.next_key += 1;
        self.reuse.insert(reuse_key, name.clone());
        self.helpers.push(helper);
        name
    }

    fn require_kind(&mut self, name: &str) {
        let kind = self
            .vocabulary
            .token_kind(name)
            .expect("validated token reference");
        self.kinds.insert(name.to_string(), kind);
    }
}

fn loop_body(method: &str, call: &str, at_least_one: bool) -> String {
    let tail = if at_least_one {
        "        if children.is_empty() {\n            return None;\n        }\n        Some(ParseValue::seq(children))\n"
    } else {
        "        Some(ParseValue::seq(children))\n"
    };
    format!(
        r#"    fn {method}_body(&mut self) -> Option<ParseValue> {{
        let mut children = Vec::new();
        loop {{
            let position = self.mark();
            match {call} {{
                Some(value) => {{
                    children.push(ParseValue::seq(vec![value]));
                    if self.mark() == position {{
                        break;
                    }}
                }}
                None => {{
                    self.reset(position);
                    break;
                }}
            }}
        }}
{tail}    }}

"#,
    )
}

fn fresh(allocated: &mut HashMap<String, usize>, explicit: &Option<String>, base: &str) -> String {
    let base = match explicit {
        Some(name) => safe_name(name),
        None => safe_name(base),
    };
    let count = allocated.entry(base.clone()).or_insert(0);
    let name = if *count == 0 {
        base.clone()
    } else {
        format!("{}_{}", base, count)
    };
    *count += 1;
    name
}

/// Rule and binding names that would collide with Rust keywords or the
/// generated scaffolding get a trailing underscore.
fn safe_name(name: &str) -> String {
    const RESERVED: &[&str] = &[
        "as", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern", "false",
        "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub",
        "ref", "return", "self", "static", "struct", "super", "trait", "true", "type", "unsafe",
        "use", "where", "while", "async", "await", "box", "new", "parse", "syntax_error", "mark",
        "reset", "expect_kind", "expect_literal", "lookahead", "memoized", "grow", "position",
        "cut",
    ];
    if RESERVED.contains(&name) {
        format!("{}_", name)
    } else {
        name.to_string()
    }
}

fn key_const(name: &str) -> String {
    format!("K_{}", name.to_ascii_uppercase())
}
