//! A token-level Earley parser and morphology-aware grammar algebra for
//! rule-based information extraction over tagged token streams.
//!
//! # Overview
//!
//! Text is assumed already split into [`Token`](token::Token)s, each
//! carrying zero or more morphological readings
//! ([`MorphForm`](token::MorphForm)). A grammar is built from
//! [`Predicate`](predicate::Predicate)s (token-level tests) composed into
//! [`Rule`](grammar::Rule)s via the builder functions in [`grammar`] —
//! `rule`, `or_rule`, `optional`, `repeatable`, `forward`/`define` for
//! recursive grammars. [`earley::Parser`] then runs this grammar against a
//! token slice and locates every non-overlapping match
//! ([`tree::Match`]) within it, filtering out matches whose
//! agreement-tagged subtrees disagree in gender, number, or case
//! ([`agreement`]). Each match can be turned into a structured
//! [`Fact`](fact::Fact) by attaching [`interpret::Spec`]s to rules and
//! running [`tree::Match::fact`].
//!
//! # Example
//!
//! ```
//! use earley_yargy::earley::Parser;
//! use earley_yargy::grammar::{rule, Term};
//! use earley_yargy::predicate::eq;
//! use earley_yargy::token::{Token, TokenKind};
//!
//! let street = rule(vec![
//!     Term::predicate(eq("улица")),
//!     Term::predicate(eq("Ленина")),
//! ]);
//! let parser = Parser::new(street);
//!
//! let tokens = vec![
//!     Token::new("улица", TokenKind::Word, 0, 5),
//!     Token::new("Ленина", TokenKind::Word, 6, 12),
//! ];
//! let matches = parser.findall(&tokens);
//! assert_eq!(matches.len(), 1);
//! ```
//!
//! # Non-goals
//!
//! Tokenization and morphological analysis are out of scope: callers supply
//! already-tokenized, already-tagged [`Token`]s (typically via a
//! [`MorphService`](morph::MorphService) implementation backed by an actual
//! morphological dictionary).

pub mod agreement;
pub mod earley;
pub mod error;
pub mod fact;
pub mod grammar;
pub mod interpret;
pub mod morph;
pub mod predicate;
pub mod token;
pub mod tree;

pub use earley::{Parser, PartialMatch};
pub use error::{ConstructionError, InterpretError};
pub use fact::{AttrDef, AttrSlot, Fact, FactOutcome, Schema, SchemaRegistry, Value};
pub use grammar::{
    define, forward, interpretation, match_rule, named, optional, or_rule, repeatable, rule,
    rule_alts, AgreementFn, Production, RepeatBound, Rule, Term,
};
pub use interpret::Spec;
pub use morph::{DictionaryMorphService, MorphService, Parse};
pub use predicate::Predicate;
pub use token::{MorphForm, Token, TokenKind};
pub use tree::{Match, Tree};

/// A graduated debug-logging level, optionally carrying a payload of `T`.
///
/// Variants are ordered `None < Default < Success < Result < Verbose` by
/// [`order`](Log::order); a caller picks one level and every call site that
/// would log at an equal or lower tier fires. There is no logging crate in
/// the dependency stack — this type is the whole of it, gated behind
/// `cfg(debug_assertions)` at every call site so it costs nothing in a
/// release build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Log<T> {
    #[default]
    None,
    Default(T),
    Success(T),
    Result(T),
    Verbose(T),
}

impl<T> Log<T> {
    pub(crate) fn order(&self) -> u8 {
        match self {
            Log::None => 0,
            Log::Default(_) => 1,
            Log::Success(_) => 2,
            Log::Result(_) => 3,
            Log::Verbose(_) => 4,
        }
    }
}
