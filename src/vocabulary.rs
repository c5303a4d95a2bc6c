use crate::{TokenKind, Vocabulary};
use std::collections::HashMap;

/// Characters recognized as single-character punctuation by [Vocabulary::core].
const PUNCTUATION: &str = "+-*/%@&|^~<>=.,:;!?()[]{}$";

impl Vocabulary {
    pub const ENDMARKER: TokenKind = TokenKind::new(0);
    pub const NAME: TokenKind = TokenKind::new(1);
    pub const NUMBER: TokenKind = TokenKind::new(2);
    pub const STRING: TokenKind = TokenKind::new(3);
    pub const NEWLINE: TokenKind = TokenKind::new(4);
    pub const NL: TokenKind = TokenKind::new(5);
    pub const COMMENT: TokenKind = TokenKind::new(6);
    pub const OP: TokenKind = TokenKind::new(7);
    pub const ERRORTOKEN: TokenKind = TokenKind::new(8);

    /// Build the core vocabulary: the well-known kinds plus the
    /// single-character punctuation map (every punctuation literal maps to
    /// the OP kind).
    pub fn core() -> Self {
        let kind_names: Vec<String> = [
            "ENDMARKER",
            "NAME",
            "NUMBER",
            "STRING",
            "NEWLINE",
            "NL",
            "COMMENT",
            "OP",
            "ERRORTOKEN",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let by_name = kind_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), TokenKind::new(i as u16)))
            .collect();

        let punctuation = PUNCTUATION.chars().map(|c| (c, Self::OP)).collect();

        Self {
            kind_names,
            by_name,
            punctuation,
            keywords: HashMap::new(),
        }
    }

    /// Resolve a token-kind name like `NUMBER`. Only all-uppercase names are
    /// token references; anything else belongs to the rule namespace.
    pub fn token_kind(&self, name: &str) -> Option<TokenKind> {
        if !name.is_empty() && name.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
            self.by_name.get(name).copied()
        } else {
            None
        }
    }

    /// Kind of a single-character punctuation literal.
    pub fn punctuation_kind(&self, literal: &str) -> Option<TokenKind> {
        let mut chars = literal.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => self.punctuation.get(&c).copied(),
            _ => None,
        }
    }

    /// Declare a keyword, allocating a fresh kind for it. Declaring the same
    /// word twice returns the kind allocated first.
    pub fn declare_keyword(&mut self, word: &str) -> TokenKind {
        if let Some(kind) = self.keywords.get(word) {
            return *kind;
        }
        let kind = TokenKind::new(self.kind_names.len() as u16);
        self.kind_names.push(word.to_string());
        self.keywords.insert(word.to_string(), kind);
        kind
    }

    /// The installed keyword table.
    pub fn keywords(&self) -> &HashMap<String, TokenKind> {
        &self.keywords
    }

    pub fn is_keyword_kind(&self, kind: TokenKind) -> bool {
        self.keywords.values().any(|k| *k == kind)
    }

    /// Display name of a kind; numeric fallback for kinds outside the
    /// universe.
    pub fn name_of(&self, kind: TokenKind) -> String {
        match self.kind_names.get(kind.value() as usize) {
            Some(name) => name.clone(),
            None => format!("<{}>", kind.value()),
        }
    }

    /// Whether tokens of this kind reach the parser. Comments, non-syntactic
    /// newlines and whitespace error tokens are filtered by the stream.
    pub fn is_significant(&self, kind: TokenKind) -> bool {
        kind != Self::COMMENT && kind != Self::NL
    }
}
