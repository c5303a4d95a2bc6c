use crate::{Alt, Grammar, GrammarError, Item, NamedItem, Rhs, Vocabulary};
use std::collections::BTreeSet;

impl Grammar {
    /// Validate the grammar against the vocabulary and run the two analysis
    /// passes: nullability to its least fixed point, then left-recursion
    /// classification with leader election per strongly connected group.
    ///
    /// Idempotent: re-running on an already analyzed grammar is a no-op.
    pub fn analyze(&self, vocabulary: &Vocabulary) -> Result<(), GrammarError> {
        if self.analyzed.get().is_some() {
            return Ok(());
        }
        validate(self, vocabulary)?;
        compute_nullables(self, vocabulary);
        compute_left_recursion(self, vocabulary)?;
        let _ = self.analyzed.set(());
        Ok(())
    }
}

/// Static invariants: a `start` rule exists, every name resolves, and no
/// lookahead item carries a binding.
fn validate(grammar: &Grammar, vocabulary: &Vocabulary) -> Result<(), GrammarError> {
    if grammar.rule_id("start").is_none() {
        return Err(GrammarError::MissingStart);
    }
    for rule in grammar.rules() {
        validate_rhs(rule.rhs(), grammar, vocabulary)?;
    }
    Ok(())
}

fn validate_rhs(rhs: &Rhs, grammar: &Grammar, vocabulary: &Vocabulary) -> Result<(), GrammarError> {
    for alt in &rhs.alts {
        for named in &alt.items {
            validate_named(named, grammar, vocabulary)?;
        }
    }
    Ok(())
}

fn validate_named(
    named: &NamedItem,
    grammar: &Grammar,
    vocabulary: &Vocabulary,
) -> Result<(), GrammarError> {
    if let (Some(name), Item::Lookahead { .. }) = (&named.name, &named.item) {
        return Err(GrammarError::InvalidNamedLookahead(name.clone()));
    }
    validate_item(&named.item, grammar, vocabulary)
}

fn validate_item(
    item: &Item,
    grammar: &Grammar,
    vocabulary: &Vocabulary,
) -> Result<(), GrammarError> {
    match item {
        Item::NameLeaf(name) => {
            if vocabulary.token_kind(name).is_some() || grammar.rule_id(name).is_some() {
                Ok(())
            } else if name.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
                Err(GrammarError::UnknownToken(name.clone()))
            } else {
                Err(GrammarError::DanglingReference(name.clone()))
            }
        }
        Item::StringLeaf(_) | Item::Cut => Ok(()),
        Item::Group(rhs) => validate_rhs(rhs, grammar, vocabulary),
        Item::Opt(inner) | Item::Repeat0(inner) | Item::Repeat1(inner) => {
            validate_item(inner, grammar, vocabulary)
        }
        Item::Gather { separator, element } => {
            validate_item(separator, grammar, vocabulary)?;
            validate_item(element, grammar, vocabulary)
        }
        Item::Lookahead { atom, .. } => validate_item(atom, grammar, vocabulary),
    }
}

/// Pass 1: sweep every rule until a full sweep changes nothing. The state
/// lattice is finite and the step monotone, so this terminates at the least
/// fixed point.
fn compute_nullables(grammar: &Grammar, vocabulary: &Vocabulary) {
    let mut state = vec![false; grammar.rules().len()];
    loop {
        let mut changed = false;
        for (index, rule) in grammar.rules().iter().enumerate() {
            if !state[index] && rhs_nullable(rule.rhs(), grammar, vocabulary, &state) {
                state[index] = true;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    for (rule, nullable) in grammar.rules().iter().zip(state) {
        rule.set_nullable(nullable);
    }
}

fn rhs_nullable(rhs: &Rhs, grammar: &Grammar, vocabulary: &Vocabulary, state: &[bool]) -> bool {
    rhs.alts
        .iter()
        .any(|alt| alt_nullable(alt, grammar, vocabulary, state))
}

fn alt_nullable(alt: &Alt, grammar: &Grammar, vocabulary: &Vocabulary, state: &[bool]) -> bool {
    alt.items
        .iter()
        .all(|named| item_nullable(&named.item, grammar, vocabulary, state))
}

fn item_nullable(item: &Item, grammar: &Grammar, vocabulary: &Vocabulary, state: &[bool]) -> bool {
    match item {
        Item::NameLeaf(name) => {
            if vocabulary.token_kind(name).is_some() {
                false
            } else {
                match grammar.rule_id(name) {
                    Some(id) => state[id.index()],
                    None => false,
                }
            }
        }
        Item::StringLeaf(_) => false,
        Item::Group(rhs) => rhs_nullable(rhs, grammar, vocabulary, state),
        Item::Opt(_) | Item::Repeat0(_) | Item::Lookahead { .. } | Item::Cut => true,
        Item::Repeat1(inner) => item_nullable(inner, grammar, vocabulary, state),
        Item::Gather { element, .. } => item_nullable(element, grammar, vocabulary, state),
    }
}

/// Pass 2: build the graph with an edge from a rule to every rule that can
/// appear first in one of its parses, find its strongly connected
/// components, and elect a leader for each left-recursive component.
fn compute_left_recursion(grammar: &Grammar, vocabulary: &Vocabulary) -> Result<(), GrammarError> {
    let count = grammar.rules().len();
    let state: Vec<bool> = grammar.rules().iter().map(|r| r.is_nullable()).collect();

    let graph: Vec<Vec<usize>> = grammar
        .rules()
        .iter()
        .map(|rule| {
            let mut names = BTreeSet::new();
            rhs_initial(rule.rhs(), grammar, vocabulary, &state, &mut names);
            names.into_iter().collect()
        })
        .collect();

    let mut left_recursive = vec![false; count];
    let mut leader = vec![false; count];

    for scc in strongly_connected_components(count, &graph) {
        if scc.len() > 1 {
            for &index in &scc {
                left_recursive[index] = true;
            }
            // A leader must lie on every cycle of the group, so that every
            // other member reaches the seed through it.
            let members: BTreeSet<usize> = scc.iter().copied().collect();
            let mut candidates = members.clone();
            for &start in &scc {
                for cycle in find_cycles(&graph, &members, start) {
                    candidates.retain(|index| cycle.contains(index));
                    if candidates.is_empty() {
                        let mut names: Vec<String> = members
                            .iter()
                            .map(|&i| grammar.rules()[i].name().to_string())
                            .collect();
                        names.sort();
                        return Err(GrammarError::NoLeader(names));
                    }
                }
            }
            let elected = candidates
                .iter()
                .copied()
                .min_by_key(|&i| grammar.rules()[i].name())
                .expect("candidate set is non-empty");
            leader[elected] = true;
        } else {
            // A single-rule component is left-recursive only through a
            // self-edge, and is then its own leader.
            let index = scc[0];
            if graph[index].contains(&index) {
                left_recursive[index] = true;
                leader[index] = true;
            }
        }
    }

    for (index, rule) in grammar.rules().iter().enumerate() {
        rule.set_left_recursive(left_recursive[index]);
        rule.set_leader(leader[index]);
    }
    Ok(())
}

fn rhs_initial(
    rhs: &Rhs,
    grammar: &Grammar,
    vocabulary: &Vocabulary,
    state: &[bool],
    out: &mut BTreeSet<usize>,
) {
    for alt in &rhs.alts {
        for named in &alt.items {
            item_initial(&named.item, grammar, vocabulary, state, out);
            if !item_nullable(&named.item, grammar, vocabulary, state) {
                break;
            }
        }
    }
}

/// Rules that may appear first in a parse of the item.
fn item_initial(
    item: &Item,
    grammar: &Grammar,
    vocabulary: &Vocabulary,
    state: &[bool],
    out: &mut BTreeSet<usize>,
) {
    match item {
        Item::NameLeaf(name) => {
            if vocabulary.token_kind(name).is_none() {
                if let Some(id) = grammar.rule_id(name) {
                    out.insert(id.index());
                }
            }
        }
        Item::StringLeaf(_) | Item::Cut => {}
        Item::Group(rhs) => rhs_initial(rhs, grammar, vocabulary, state, out),
        Item::Opt(inner) | Item::Repeat0(inner) | Item::Repeat1(inner) => {
            item_initial(inner, grammar, vocabulary, state, out)
        }
        Item::Gather { element, .. } => item_initial(element, grammar, vocabulary, state, out),
        Item::Lookahead { atom, .. } => item_initial(atom, grammar, vocabulary, state, out),
    }
}

/// Iterative Tarjan over the rule graph. Components come out in reverse
/// topological order; node order is the deterministic rule order.
fn strongly_connected_components(count: usize, graph: &[Vec<usize>]) -> Vec<Vec<usize>> {
    const UNVISITED: usize = usize::MAX;
    let mut index = vec![UNVISITED; count];
    let mut low = vec![0usize; count];
    let mut on_stack = vec![false; count];
    let mut stack: Vec<usize> = Vec::new();
    let mut next_index = 0usize;
    let mut components = Vec::new();

    for root in 0..count {
        if index[root] != UNVISITED {
            continue;
        }
        // Explicit work stack of (node, next edge offset).
        let mut work: Vec<(usize, usize)> = vec![(root, 0)];
        while let Some(&(node, edge)) = work.last() {
            if edge == 0 {
                index[node] = next_index;
                low[node] = next_index;
                next_index += 1;
                stack.push(node);
                on_stack[node] = true;
            }
            if let Some(&next) = graph[node].get(edge) {
                work.last_mut().expect("work stack is non-empty").1 += 1;
                if index[next] == UNVISITED {
                    work.push((next, 0));
                } else if on_stack[next] {
                    low[node] = low[node].min(index[next]);
                }
            } else {
                work.pop();
                if let Some(&(parent, _)) = work.last() {
                    low[parent] = low[parent].min(low[node]);
                }
                if low[node] == index[node] {
                    let mut component = Vec::new();
                    loop {
                        let member = stack.pop().expect("tarjan stack underflow");
                        on_stack[member] = false;
                        component.push(member);
                        if member == node {
                            break;
                        }
                    }
                    component.sort_unstable();
                    components.push(component);
                }
            }
        }
    }
    components
}

/// Enumerate the cycles reachable from `start` inside one component by
/// walking simple paths; a step onto a node already on the path closes a
/// cycle.
fn find_cycles(graph: &[Vec<usize>], members: &BTreeSet<usize>, start: usize) -> Vec<Vec<usize>> {
    fn walk(
        node: usize,
        graph: &[Vec<usize>],
        members: &BTreeSet<usize>,
        path: &mut Vec<usize>,
        cycles: &mut Vec<Vec<usize>>,
    ) {
        if let Some(position) = path.iter().position(|&n| n == node) {
            cycles.push(path[position..].to_vec());
            return;
        }
        path.push(node);
        for &next in &graph[node] {
            if members.contains(&next) {
                walk(next, graph, members, path, cycles);
            }
        }
        path.pop();
    }

    let mut cycles = Vec::new();
    walk(start, graph, members, &mut Vec::new(), &mut cycles);
    cycles
}
