//! Reader for the grammar meta-language.
//!
//! Rules have the shape `name[opt-type]: alt (| alt)*`, one logical line per
//! rule; newlines inside parentheses and brackets do not terminate a rule.
//! Items are literals `'…'`, names, `(…)` groups, `[…]` optional groups,
//! postfix `?` `*` `+`, `sep.elem+` gather, `&`/`!` lookahead, `~` cut and
//! `name=item` bindings; `$` abbreviates ENDMARKER. A trailing `{ … }` block
//! is captured verbatim as the alternative's action.

use crate::{
    Alt, Grammar, Item, NamedItem, ParseError, Rhs, Rule, Token, TokenStream, Vocabulary,
};
use std::rc::Rc;

/// Read a grammar from meta-language text.
pub fn parse_grammar(source: &str) -> Result<Grammar, ParseError> {
    let vocabulary = Rc::new(Vocabulary::core());
    let mut reader = GrammarReader {
        stream: TokenStream::from_text(source, vocabulary),
    };
    reader.grammar()
}

struct GrammarReader {
    stream: TokenStream,
}

impl GrammarReader {
    fn grammar(&mut self) -> Result<Grammar, ParseError> {
        let mut rules = Vec::new();
        loop {
            while self.stream.expect_kind(Vocabulary::NEWLINE).is_some() {}
            if self.stream.peek().kind == Vocabulary::ENDMARKER {
                break;
            }
            rules.push(self.rule()?);
        }
        if rules.is_empty() {
            let position = self.stream.peek().span.start;
            return Err(ParseError::new(
                position,
                "Expected at least one rule".to_string(),
            ));
        }
        Ok(Grammar::new(rules))
    }

    fn rule(&mut self) -> Result<Rule, ParseError> {
        let name = match self.stream.expect_kind(Vocabulary::NAME) {
            Some(token) => token.string,
            None => return Err(self.unexpected("a rule name")),
        };
        let result_type = if self.eat("[") {
            Some(self.bracketed_text()?)
        } else {
            None
        };
        if !self.eat(":") {
            return Err(self.unexpected("':'"));
        }
        let rhs = self.rhs()?;
        if self.stream.expect_kind(Vocabulary::NEWLINE).is_none()
            && self.stream.peek().kind != Vocabulary::ENDMARKER
        {
            return Err(self.unexpected("the end of the rule"));
        }
        Ok(Rule::new(name, result_type, rhs))
    }

    fn rhs(&mut self) -> Result<Rhs, ParseError> {
        // A leading bar before the first alternative is tolerated.
        self.eat("|");
        let mut alts = vec![self.alt()?];
        while self.eat("|") {
            alts.push(self.alt()?);
        }
        Ok(Rhs::new(alts))
    }

    fn alt(&mut self) -> Result<Alt, ParseError> {
        let mut items = vec![self.named_item()?];
        while !self.at_alt_end() {
            items.push(self.named_item()?);
        }
        let action = if self.eat("{") {
            Some(self.action_text()?)
        } else {
            None
        };
        Ok(Alt::new(items, action))
    }

    fn at_alt_end(&mut self) -> bool {
        let token = self.stream.peek();
        if token.kind == Vocabulary::NEWLINE || token.kind == Vocabulary::ENDMARKER {
            return true;
        }
        token.kind == Vocabulary::OP && matches!(token.string.as_str(), "|" | ")" | "]" | "{")
    }

    fn named_item(&mut self) -> Result<NamedItem, ParseError> {
        let position = self.stream.mark();
        if let Some(name) = self.stream.expect_kind(Vocabulary::NAME) {
            if self.eat("=") {
                let item = self.item()?;
                return Ok(NamedItem::new(Some(name.string), item));
            }
            self.stream.reset(position);
        }
        Ok(NamedItem::bare(self.item()?))
    }

    fn item(&mut self) -> Result<Item, ParseError> {
        if self.eat("&") {
            return Ok(Item::Lookahead {
                positive: true,
                atom: Box::new(self.atom()?),
            });
        }
        if self.eat("!") {
            return Ok(Item::Lookahead {
                positive: false,
                atom: Box::new(self.atom()?),
            });
        }
        if self.eat("~") {
            return Ok(Item::Cut);
        }
        let atom = self.atom()?;
        if self.eat(".") {
            let element = self.atom()?;
            if !self.eat("+") {
                return Err(self.unexpected("'+' after the gather element"));
            }
            return Ok(Item::Gather {
                separator: Box::new(atom),
                element: Box::new(element),
            });
        }
        if self.eat("?") {
            return Ok(Item::Opt(Box::new(atom)));
        }
        if self.eat("*") {
            return Ok(Item::Repeat0(Box::new(atom)));
        }
        if self.eat("+") {
            return Ok(Item::Repeat1(Box::new(atom)));
        }
        Ok(atom)
    }

    fn atom(&mut self) -> Result<Item, ParseError> {
        if let Some(name) = self.stream.expect_kind(Vocabulary::NAME) {
            return Ok(Item::NameLeaf(name.string));
        }
        if let Some(string) = self.stream.expect_kind(Vocabulary::STRING) {
            return Ok(Item::StringLeaf(unquote(&string)));
        }
        if self.eat("(") {
            let rhs = self.rhs()?;
            if !self.eat(")") {
                return Err(self.unexpected("')'"));
            }
            return Ok(Item::Group(rhs));
        }
        if self.eat("[") {
            let rhs = self.rhs()?;
            if !self.eat("]") {
                return Err(self.unexpected("']'"));
            }
            return Ok(Item::Opt(Box::new(Item::Group(rhs))));
        }
        if self.eat("$") {
            return Ok(Item::NameLeaf("ENDMARKER".to_string()));
        }
        Err(self.unexpected("an item"))
    }

    /// Opaque text between balanced brackets, joined without separators
    /// (type annotations like `T[int]` round-trip).
    fn bracketed_text(&mut self) -> Result<String, ParseError> {
        let mut depth = 1usize;
        let mut parts: Vec<String> = Vec::new();
        loop {
            if self.stream.peek().kind == Vocabulary::ENDMARKER {
                return Err(self.unexpected("']'"));
            }
            let token = self.stream.advance();
            if token.kind == Vocabulary::OP && token.string == "[" {
                depth += 1;
            } else if token.kind == Vocabulary::OP && token.string == "]" {
                depth -= 1;
                if depth == 0 {
                    return Ok(parts.concat());
                }
            }
            parts.push(token.string);
        }
    }

    /// Opaque action text between balanced braces. A single-line action is
    /// sliced verbatim from its source line; one spanning filtered newlines
    /// falls back to space-joined token texts.
    fn action_text(&mut self) -> Result<String, ParseError> {
        let mut depth = 1usize;
        let mut tokens: Vec<Token> = Vec::new();
        loop {
            if self.stream.peek().kind == Vocabulary::ENDMARKER {
                return Err(self.unexpected("'}'"));
            }
            let token = self.stream.advance();
            if token.kind == Vocabulary::OP && token.string == "{" {
                depth += 1;
            } else if token.kind == Vocabulary::OP && token.string == "}" {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            tokens.push(token);
        }
        let (first, last) = match (tokens.first(), tokens.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Ok(String::new()),
        };
        if first.span.start.line == last.span.end.line {
            let chars: Vec<char> = first.span.line.chars().collect();
            let text: String = chars[first.span.start.column - 1..last.span.end.column - 1]
                .iter()
                .collect();
            Ok(text.trim().to_string())
        } else {
            let parts: Vec<&str> = tokens.iter().map(|t| t.string.as_str()).collect();
            Ok(parts.join(" "))
        }
    }

    fn eat(&mut self, literal: &str) -> bool {
        self.stream.expect_literal(literal).is_some()
    }

    fn unexpected(&mut self, expected: &str) -> ParseError {
        let token = self.stream.peek();
        let found = if token.kind == Vocabulary::ENDMARKER {
            "end of input".to_string()
        } else {
            format!("'{}'", token.string)
        };
        ParseError::new(
            token.span.start,
            format!("Expected {}, found {}", expected, found),
        )
    }
}

fn unquote(token: &Token) -> String {
    let text = &token.string;
    text[1..text.len() - 1].to_string()
}
