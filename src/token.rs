use std::collections::BTreeSet;

/// The coarse lexical class of a [`Token`].
///
/// The parser never inspects this beyond what [`Predicate::type_`](crate::predicate::Predicate)
/// asks of it; tokenization itself is out of scope for this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenKind {
    Word,
    Int,
    Punct,
    Other,
}

/// One morphological reading of a token's surface form.
///
/// `grams` is an OpenCorpora-style grammeme tag set (`"NOUN"`, `"masc"`,
/// `"sing"`, `"nomn"`, ...). A `BTreeSet` is used rather than a `HashSet` so
/// that `MorphForm` is `Hash`/`Ord` and forms can be deterministically
/// deduplicated by the morph service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MorphForm {
    pub normalized: String,
    pub grams: BTreeSet<String>,
}

impl MorphForm {
    pub fn new(normalized: impl Into<String>, grams: impl IntoIterator<Item = String>) -> Self {
        Self {
            normalized: normalized.into(),
            grams: grams.into_iter().collect(),
        }
    }

    pub fn has_gram(&self, g: &str) -> bool {
        self.grams.contains(g)
    }
}

/// A single morphologically tagged input token.
///
/// Tokens are produced externally (tokenizer + morphological analyzer); the
/// parser never constructs or mutates one. `forms` may be empty, in which
/// case every morphology-aware predicate (`gram`, `normalized`, ...) simply
/// fails to match, as if the token carried no morphological information.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub value: String,
    pub kind: TokenKind,
    pub start: usize,
    pub stop: usize,
    pub forms: Vec<MorphForm>,
}

impl Token {
    pub fn new(value: impl Into<String>, kind: TokenKind, start: usize, stop: usize) -> Self {
        Self {
            value: value.into(),
            kind,
            start,
            stop,
            forms: Vec::new(),
        }
    }

    pub fn with_forms(mut self, forms: Vec<MorphForm>) -> Self {
        self.forms = forms;
        self
    }

    /// Parses `value` as an integer, used by the `gte`/`lte` predicates.
    /// Only meaningful for `TokenKind::Int` tokens.
    pub fn as_int(&self) -> Option<i64> {
        if self.kind != TokenKind::Int {
            return None;
        }
        self.value.parse::<i64>().ok()
    }

    pub fn char_len(&self) -> usize {
        self.value.chars().count()
    }

    pub fn is_upper(&self) -> bool {
        self.value.chars().all(|c| !c.is_alphabetic() || c.is_uppercase())
    }

    pub fn is_lower(&self) -> bool {
        self.value.chars().all(|c| !c.is_alphabetic() || c.is_lowercase())
    }

    pub fn is_capitalized(&self) -> bool {
        match self.value.chars().next() {
            Some(c) => c.is_uppercase(),
            None => false,
        }
    }

    pub fn is_title(&self) -> bool {
        let mut chars = self.value.chars();
        match chars.next() {
            Some(first) if first.is_uppercase() => {
                chars.all(|c| !c.is_alphabetic() || c.is_lowercase())
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_parsing_requires_int_kind() {
        let t = Token::new("15", TokenKind::Int, 0, 2);
        assert_eq!(t.as_int(), Some(15));
        let p = Token::new("15", TokenKind::Punct, 0, 2);
        assert_eq!(p.as_int(), None);
    }

    #[test]
    fn capitalized_title_upper_lower() {
        assert!(Token::new("Иван", TokenKind::Word, 0, 4).is_capitalized());
        assert!(Token::new("Иван", TokenKind::Word, 0, 4).is_title());
        assert!(!Token::new("ИВАН", TokenKind::Word, 0, 4).is_title());
        assert!(Token::new("ИВАН", TokenKind::Word, 0, 4).is_upper());
        assert!(Token::new("иван", TokenKind::Word, 0, 4).is_lower());
    }

    #[test]
    fn empty_value_is_not_capitalized() {
        assert!(!Token::new("", TokenKind::Other, 0, 0).is_capitalized());
    }
}
