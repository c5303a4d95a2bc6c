use crate::{Cache, CacheKey, Mark, ParseValue};
use std::collections::HashMap;

impl CacheKey {
    pub const fn new(value: usize) -> Self {
        CacheKey(value)
    }
}

impl Mark {
    pub const fn new(value: usize) -> Self {
        Mark(value)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl Cache {
    pub fn root() -> Self {
        Self {
            entries: HashMap::new(),
            furthest: Mark::new(0),
        }
    }

    /// Memoized result for a rule at a position: the value (which may be the
    /// failure sentinel `None`) and the cursor position after it.
    pub fn lookup(&self, key: CacheKey, position: Mark) -> Option<(Option<ParseValue>, Mark)> {
        self.entries.get(&(key, position)).cloned()
    }

    /// Store a result, overwriting any previous entry at the same key. The
    /// seed-growing loop relies on the overwrite.
    pub fn insert(&mut self, key: CacheKey, position: Mark, value: Option<ParseValue>, end: Mark) {
        self.entries.insert((key, position), (value, end));
    }

    /// Record a failed token match; the furthest such position is what a
    /// syntax error reports.
    pub fn note_failure(&mut self, position: Mark) {
        if self.furthest < position {
            self.furthest = position;
        }
    }

    pub fn furthest(&self) -> Mark {
        self.furthest
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::root()
    }
}
