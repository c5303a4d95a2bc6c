use crate::{Alt, Grammar, Item, NamedItem, Rhs, Rule, RuleId};
use once_cell::unsync::OnceCell;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

impl Grammar {
    /// Collect rules into a grammar. Insertion order is preserved; a rule
    /// re-using an earlier name replaces the earlier rule at its position.
    pub fn new(rules: Vec<Rule>) -> Self {
        let mut ordered: Vec<Rule> = Vec::with_capacity(rules.len());
        let mut index: HashMap<String, RuleId> = HashMap::new();
        for rule in rules {
            match index.get(&rule.name) {
                Some(id) => ordered[id.0] = rule,
                None => {
                    index.insert(rule.name.clone(), RuleId(ordered.len()));
                    ordered.push(rule);
                }
            }
        }
        Self {
            rules: ordered,
            index,
            analyzed: OnceCell::new(),
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.0]
    }

    pub fn rule_id(&self, name: &str) -> Option<RuleId> {
        self.index.get(name).copied()
    }

    pub fn rule_named(&self, name: &str) -> Option<&Rule> {
        self.rule_id(name).map(|id| self.rule(id))
    }
}

impl RuleId {
    pub(crate) fn index(&self) -> usize {
        self.0
    }
}

impl Rule {
    pub fn new(name: impl Into<String>, result_type: Option<String>, rhs: Rhs) -> Self {
        Self {
            name: name.into(),
            result_type,
            rhs,
            nullable: OnceCell::new(),
            left_recursive: OnceCell::new(),
            leader: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The opaque result-type annotation, reproduced in emission.
    pub fn result_type(&self) -> Option<&str> {
        self.result_type.as_deref()
    }

    pub fn rhs(&self) -> &Rhs {
        &self.rhs
    }

    /// A rule whose whole right-hand side is one bare parenthesized group is
    /// parsed as if the parentheses were absent.
    pub fn flat_rhs(&self) -> &Rhs {
        if let [alt] = self.rhs.alts.as_slice() {
            if let ([only], None) = (alt.items.as_slice(), &alt.action) {
                if let (None, Item::Group(rhs)) = (&only.name, &only.item) {
                    return rhs;
                }
            }
        }
        &self.rhs
    }

    /// Whether the rule can succeed consuming zero tokens. Defined only
    /// after [Grammar::analyze].
    pub fn is_nullable(&self) -> bool {
        *self.nullable.get().expect("grammar analysis has not run")
    }

    /// Whether the rule lies on a cycle of the left-recursion graph.
    /// Defined only after [Grammar::analyze].
    pub fn is_left_recursive(&self) -> bool {
        *self
            .left_recursive
            .get()
            .expect("grammar analysis has not run")
    }

    /// Whether the rule is the elected representative of its left-recursive
    /// group. Defined only after [Grammar::analyze].
    pub fn is_leader(&self) -> bool {
        *self.leader.get().expect("grammar analysis has not run")
    }

    pub(crate) fn set_nullable(&self, value: bool) {
        let _ = self.nullable.set(value);
    }

    pub(crate) fn set_left_recursive(&self, value: bool) {
        let _ = self.left_recursive.set(value);
    }

    pub(crate) fn set_leader(&self, value: bool) {
        let _ = self.leader.set(value);
    }
}

impl Rhs {
    pub fn new(alts: Vec<Alt>) -> Self {
        Self { alts }
    }
}

impl Alt {
    pub fn new(items: Vec<NamedItem>, action: Option<String>) -> Self {
        Self { items, action }
    }
}

impl NamedItem {
    pub fn new(name: Option<String>, item: Item) -> Self {
        Self { name, item }
    }

    pub fn bare(item: Item) -> Self {
        Self { name: None, item }
    }

    /// The name an action expression sees this item's value under: the
    /// explicit binding if present, else the item's canonical default.
    /// Compound items have no default here; the emitter binds them to the
    /// synthesized helper rule's name.
    pub fn visible_name(&self) -> Option<String> {
        match &self.name {
            Some(name) => Some(name.clone()),
            None => self.item.default_binding(),
        }
    }
}

impl Item {
    /// Canonical default binding: the referenced rule's name, the lowercased
    /// token name, or `literal` for string leaves.
    pub fn default_binding(&self) -> Option<String> {
        match self {
            Item::NameLeaf(name) => Some(name.to_ascii_lowercase()),
            Item::StringLeaf(_) => Some("literal".to_string()),
            _ => None,
        }
    }
}

impl Display for Grammar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for rule in &self.rules {
            if !first {
                writeln!(f)?;
            }
            first = false;
            write!(f, "{}", rule)?;
        }
        Ok(())
    }
}

impl Display for Rule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let head = match &self.result_type {
            Some(t) => format!("{}[{}]", self.name, t),
            None => self.name.clone(),
        };
        let flat = format!("{}: {}", head, self.rhs);
        if flat.len() < 88 {
            write!(f, "{}", flat)
        } else {
            writeln!(f, "{}:", head)?;
            let mut first = true;
            for alt in &self.rhs.alts {
                if !first {
                    writeln!(f)?;
                }
                first = false;
                write!(f, "    | {}", alt)?;
            }
            Ok(())
        }
    }
}

impl Display for Rhs {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for alt in &self.alts {
            if !first {
                write!(f, " | ")?;
            }
            first = false;
            write!(f, "{}", alt)?;
        }
        Ok(())
    }
}

impl Display for Alt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for item in &self.items {
            if !first {
                write!(f, " ")?;
            }
            first = false;
            write!(f, "{}", item)?;
        }
        Ok(())
    }
}

impl Display for NamedItem {
    // Bindings are elided from the surface rendering, like actions.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.item)
    }
}

impl Display for Item {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Item::NameLeaf(name) => write!(f, "{}", name),
            Item::StringLeaf(value) => write!(f, "'{}'", value),
            Item::Group(rhs) => write!(f, "({})", rhs),
            Item::Opt(inner) => match inner.as_ref() {
                Item::Group(rhs) => write!(f, "[{}]", rhs),
                _ => write!(f, "{}?", inner),
            },
            Item::Repeat0(inner) => write!(f, "{}*", inner),
            Item::Repeat1(inner) => write!(f, "{}+", inner),
            Item::Gather { separator, element } => {
                write!(f, "{}.{}+", separator, element)
            }
            Item::Lookahead { positive, atom } => {
                write!(f, "{}{}", if *positive { '&' } else { '!' }, atom)
            }
            Item::Cut => write!(f, "~"),
        }
    }
}
