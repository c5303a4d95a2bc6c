use crate::{Lexer, Mark, Token, TokenKind, TokenStream, Vocabulary};
use std::collections::HashMap;
use std::rc::Rc;

impl TokenStream {
    /// Wrap a token producer. The stream takes ownership of the producer and
    /// closes it when dropped. The producer must be terminated by an
    /// ENDMARKER token; after it the stream clamps instead of advancing.
    pub fn new(producer: Box<dyn Iterator<Item = Token>>, vocabulary: Rc<Vocabulary>) -> Self {
        Self {
            producer,
            vocabulary,
            cached: Vec::new(),
            index: 0,
            keywords: HashMap::new(),
        }
    }

    /// Tokenize a text with a fresh [Lexer] and stream the result.
    pub fn from_text(text: &str, vocabulary: Rc<Vocabulary>) -> Self {
        let tokens = Lexer::new(vocabulary.clone()).tokenize(text);
        Self::new(Box::new(tokens.into_iter()), vocabulary)
    }

    /// Install the keyword table. Must happen before any token has been
    /// materialized; re-tagging is applied on entry to the cache only, so
    /// marks into the cache stay stable.
    pub fn install_keywords(&mut self, keywords: HashMap<String, TokenKind>) -> Result<(), String> {
        if !self.cached.is_empty() {
            return Err(
                "Keyword table must be installed before any token is read from the stream."
                    .to_string(),
            );
        }
        self.keywords = keywords;
        Ok(())
    }

    fn materialize(&mut self, upto: usize) {
        while self.cached.len() <= upto {
            let token = match self.producer.next() {
                Some(token) => token,
                None => break,
            };
            if !self.vocabulary.is_significant(token.kind) {
                continue;
            }
            if token.kind == Vocabulary::ERRORTOKEN && token.string.trim().is_empty() {
                continue;
            }
            let token = if token.kind == Vocabulary::NAME {
                match self.keywords.get(&token.string) {
                    Some(kind) => token.retagged(*kind),
                    None => token,
                }
            } else {
                token
            };
            self.cached.push(token);
        }
    }

    fn clamped(&self, index: usize) -> &Token {
        if index < self.cached.len() {
            &self.cached[index]
        } else {
            self.cached
                .last()
                .expect("token producer ended without an ENDMARKER")
        }
    }

    /// The current token, without advancing.
    pub fn peek(&mut self) -> &Token {
        self.materialize(self.index);
        self.clamped(self.index)
    }

    /// Return the current token and advance.
    pub fn advance(&mut self) -> Token {
        self.materialize(self.index);
        let token = self.clamped(self.index).clone();
        if self.index < self.cached.len() {
            self.index += 1;
        }
        token
    }

    pub fn mark(&self) -> Mark {
        Mark::new(self.index)
    }

    /// O(1), unconditional. Resetting backwards never discards cached
    /// tokens.
    pub fn reset(&mut self, mark: Mark) {
        self.index = mark.index();
    }

    /// The cached token at a mark previously reached.
    pub fn get(&self, mark: Mark) -> &Token {
        self.clamped(mark.index())
    }

    /// Advance over the current token if its kind matches.
    pub fn expect_kind(&mut self, kind: TokenKind) -> Option<Token> {
        if self.peek().kind == kind {
            Some(self.advance())
        } else {
            None
        }
    }

    /// Advance over the current token if its text equals the literal.
    /// Structural and string tokens never match a literal.
    pub fn expect_literal(&mut self, literal: &str) -> Option<Token> {
        let token = self.peek();
        let excluded = token.kind == Vocabulary::NEWLINE
            || token.kind == Vocabulary::ENDMARKER
            || token.kind == Vocabulary::STRING;
        if !excluded && token.string == literal {
            Some(self.advance())
        } else {
            None
        }
    }
}
