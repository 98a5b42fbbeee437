//! The morphological-analyzer collaborator.
//!
//! This is an external interface the parser core never calls directly —
//! only the interpretation engine's `inflected`/`normalized` specs and the
//! agreement validator consume it. Those two do need a concrete
//! implementation to run against in tests, so this module adds a small
//! in-memory reference implementation alongside the trait.
use crate::token::MorphForm;
use std::collections::{BTreeSet, HashMap};

/// One morphological analysis of a word, as returned by `parse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parse {
    pub normal_form: String,
    pub grams: BTreeSet<String>,
}

impl Parse {
    pub fn has_gram(&self, g: &str) -> bool {
        self.grams.contains(g)
    }
}

/// The morphological analyzer collaborator. Real morphological analysis is
/// out of scope for this crate; this trait exists so the rest of the
/// pipeline can depend on an interface rather than a concrete dictionary.
pub trait MorphService {
    fn parse(&self, word: &str) -> Vec<Parse>;

    /// Deduplicated lemmas for `word`.
    fn normal_forms(&self, word: &str) -> Vec<String> {
        let mut seen = Vec::new();
        for p in self.parse(word) {
            if !seen.contains(&p.normal_form) {
                seen.push(p.normal_form);
            }
        }
        seen
    }

    /// Best-effort inflection of `parse` towards `target_grams`. `None` if no
    /// inflected form is available — callers fall back to the original
    /// token value, this is not an error.
    fn inflect(&self, parse: &Parse, target_grams: &BTreeSet<String>) -> Option<String>;
}

/// A tiny in-memory [`MorphService`] used by tests and doctests.
///
/// Keyed by lowercase surface form; each entry carries every known parse and
/// an inflection table keyed by the target grammeme set. Not meant to model
/// real Russian morphology, only to exercise the interpretation engine and
/// agreement validator deterministically.
#[derive(Debug, Default)]
pub struct DictionaryMorphService {
    entries: HashMap<String, Vec<Parse>>,
    inflections: HashMap<(String, BTreeSet<String>), String>,
}

impl DictionaryMorphService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_parse(&mut self, surface: impl Into<String>, parse: Parse) -> &mut Self {
        self.entries
            .entry(surface.into().to_lowercase())
            .or_default()
            .push(parse);
        self
    }

    pub fn add_inflection(
        &mut self,
        surface: impl Into<String>,
        target_grams: impl IntoIterator<Item = String>,
        inflected: impl Into<String>,
    ) -> &mut Self {
        self.inflections.insert(
            (surface.into().to_lowercase(), target_grams.into_iter().collect()),
            inflected.into(),
        );
        self
    }
}

impl MorphService for DictionaryMorphService {
    fn parse(&self, word: &str) -> Vec<Parse> {
        self.entries
            .get(&word.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    fn inflect(&self, parse: &Parse, target_grams: &BTreeSet<String>) -> Option<String> {
        self.inflections
            .get(&(parse.normal_form.to_lowercase(), target_grams.clone()))
            .cloned()
    }
}

impl From<&MorphForm> for Parse {
    fn from(f: &MorphForm) -> Self {
        Parse {
            normal_form: f.normalized.clone(),
            grams: f.grams.clone(),
        }
    }
}
