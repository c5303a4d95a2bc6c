use crate::{GrammarError, ParseError, Position};
use std::fmt::{Display, Formatter};

impl GrammarError {
    pub fn is_no_leader(&self) -> bool {
        matches!(self, GrammarError::NoLeader(_))
    }
}

impl Display for GrammarError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GrammarError::MissingStart => {
                write!(f, "GrammarError: grammar has no rule named 'start'.")
            }
            GrammarError::DanglingReference(name) => {
                write!(
                    f,
                    "GrammarError: rule '{}' is referenced but never defined.",
                    name
                )
            }
            GrammarError::UnknownToken(name) => {
                write!(
                    f,
                    "GrammarError: '{}' is not a known token kind or rule.",
                    name
                )
            }
            GrammarError::InvalidNamedLookahead(name) => {
                write!(
                    f,
                    "GrammarError: lookahead item may not carry the binding '{}'.",
                    name
                )
            }
            GrammarError::NoLeader(names) => {
                write!(
                    f,
                    "GrammarError: left-recursion too complex, group {{{}}} has no leader.",
                    names.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for GrammarError {}

impl ParseError {
    pub fn new(position: Position, message: String) -> Self {
        Self { position, message }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SyntaxError: {} at {}.", self.message, self.position)
    }
}

impl std::error::Error for ParseError {}
