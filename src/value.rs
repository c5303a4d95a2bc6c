use crate::{ParseValue, Token, Vocabulary};
use ptree::{print_tree, Style, TreeItem};
use std::borrow::Cow;
use std::io;

impl ParseValue {
    pub fn seq(values: Vec<ParseValue>) -> Self {
        ParseValue::Seq(values)
    }

    pub fn token(&self) -> Option<&Token> {
        match self {
            ParseValue::Token(token) => Some(token),
            _ => None,
        }
    }

    pub fn children(&self) -> &[ParseValue] {
        match self {
            ParseValue::Seq(values) => values,
            _ => &[],
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, ParseValue::Absent)
    }

    /// Print the value as a tree, resolving token kinds against the
    /// vocabulary.
    pub fn print(&self, vocabulary: &Vocabulary) -> io::Result<()> {
        print_tree(&ValueTree {
            value: self,
            vocabulary,
        })
    }
}

#[derive(Clone)]
struct ValueTree<'a> {
    value: &'a ParseValue,
    vocabulary: &'a Vocabulary,
}

impl<'a> TreeItem for ValueTree<'a> {
    type Child = Self;

    fn write_self<W: io::Write>(&self, f: &mut W, _: &Style) -> io::Result<()> {
        match self.value {
            ParseValue::Token(token) => write!(
                f,
                "{} {:?} # {}-{}",
                self.vocabulary.name_of(token.kind),
                token.string,
                token.span.start,
                token.span.end
            ),
            ParseValue::Seq(values) => write!(f, "[{}]", values.len()),
            ParseValue::Absent => write!(f, "-"),
        }
    }

    fn children(&self) -> Cow<[Self::Child]> {
        match self.value {
            ParseValue::Seq(values) => Cow::Owned(
                values
                    .iter()
                    .map(|value| ValueTree {
                        value,
                        vocabulary: self.vocabulary,
                    })
                    .collect(),
            ),
            _ => Cow::Owned(Vec::new()),
        }
    }
}
