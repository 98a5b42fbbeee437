//! Token-level boolean tests and their logical combinators.
//!
//! A [`Predicate`] is a pure function `Token -> bool`. The closed set of
//! constructors below is represented as a tuple-style enum variant rather
//! than a boxed closure (the one exception being [`Predicate::Custom`]) so
//! that predicates stay inspectable and comparable by construction instead
//! of hiding behind `Fn` trait objects.
use crate::token::{Token, TokenKind};
use std::collections::HashSet;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

#[derive(Clone)]
pub enum Predicate {
    Eq(String),
    Caseless(String),
    In(HashSet<String>),
    InCaseless(HashSet<String>),
    Type(TokenKind),
    LengthEq(usize),
    Gte(i64),
    Lte(i64),
    Gram(String),
    Normalized(String),
    NormalizedIn(HashSet<String>),
    Capitalized,
    Upper,
    Lower,
    Title,
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    Custom(Rc<dyn Fn(&Token) -> bool>),
}

impl Debug for Predicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Predicate::Eq(v) => write!(f, "eq({:?})", v),
            Predicate::Caseless(v) => write!(f, "caseless({:?})", v),
            Predicate::In(s) => write!(f, "in_({:?})", s),
            Predicate::InCaseless(s) => write!(f, "in_caseless({:?})", s),
            Predicate::Type(k) => write!(f, "type({:?})", k),
            Predicate::LengthEq(n) => write!(f, "length_eq({})", n),
            Predicate::Gte(n) => write!(f, "gte({})", n),
            Predicate::Lte(n) => write!(f, "lte({})", n),
            Predicate::Gram(g) => write!(f, "gram({:?})", g),
            Predicate::Normalized(w) => write!(f, "normalized({:?})", w),
            Predicate::NormalizedIn(s) => write!(f, "normalized_in({:?})", s),
            Predicate::Capitalized => write!(f, "capitalized"),
            Predicate::Upper => write!(f, "upper"),
            Predicate::Lower => write!(f, "lower"),
            Predicate::Title => write!(f, "title"),
            Predicate::And(ps) => write!(f, "and_({:?})", ps),
            Predicate::Or(ps) => write!(f, "or_({:?})", ps),
            Predicate::Not(p) => write!(f, "not_({:?})", p),
            Predicate::Custom(_) => write!(f, "custom(<fn>)"),
        }
    }
}

fn lower(s: &str) -> String {
    s.to_lowercase()
}

impl Predicate {
    pub fn test(&self, t: &Token) -> bool {
        match self {
            Predicate::Eq(v) => &t.value == v,
            Predicate::Caseless(v) => lower(&t.value) == lower(v),
            Predicate::In(s) => s.contains(&t.value),
            Predicate::InCaseless(s) => s.contains(&lower(&t.value)),
            Predicate::Type(k) => &t.kind == k,
            Predicate::LengthEq(n) => t.char_len() == *n,
            Predicate::Gte(n) => t.as_int().map(|v| v >= *n).unwrap_or(false),
            Predicate::Lte(n) => t.as_int().map(|v| v <= *n).unwrap_or(false),
            Predicate::Gram(g) => t.forms.iter().any(|f| f.has_gram(g)),
            Predicate::Normalized(w) => t
                .forms
                .iter()
                .any(|f| lower(&f.normalized) == lower(w)),
            Predicate::NormalizedIn(s) => t
                .forms
                .iter()
                .any(|f| s.contains(&lower(&f.normalized))),
            Predicate::Capitalized => t.is_capitalized() && lower(&t.value) != t.value,
            Predicate::Upper => t.is_upper(),
            Predicate::Lower => t.is_lower(),
            Predicate::Title => t.is_title(),
            Predicate::And(ps) => ps.iter().all(|p| p.test(t)),
            Predicate::Or(ps) => ps.iter().any(|p| p.test(t)),
            Predicate::Not(p) => !p.test(t),
            Predicate::Custom(f) => f(t),
        }
    }
}

pub fn eq(v: impl Into<String>) -> Predicate {
    Predicate::Eq(v.into())
}
pub fn caseless(v: impl Into<String>) -> Predicate {
    Predicate::Caseless(v.into())
}
pub fn in_(values: impl IntoIterator<Item = impl Into<String>>) -> Predicate {
    Predicate::In(values.into_iter().map(Into::into).collect())
}
pub fn in_caseless(values: impl IntoIterator<Item = impl Into<String>>) -> Predicate {
    Predicate::InCaseless(values.into_iter().map(|v| lower(&v.into())).collect())
}
pub fn type_(k: TokenKind) -> Predicate {
    Predicate::Type(k)
}
pub fn length_eq(n: usize) -> Predicate {
    Predicate::LengthEq(n)
}
pub fn gte(n: i64) -> Predicate {
    Predicate::Gte(n)
}
pub fn lte(n: i64) -> Predicate {
    Predicate::Lte(n)
}
pub fn gram(g: impl Into<String>) -> Predicate {
    Predicate::Gram(g.into())
}
pub fn normalized(w: impl Into<String>) -> Predicate {
    Predicate::Normalized(w.into())
}
pub fn normalized_in(values: impl IntoIterator<Item = impl Into<String>>) -> Predicate {
    Predicate::NormalizedIn(values.into_iter().map(|v| lower(&v.into())).collect())
}
/// Alias for [`normalized_in`] under the more domain-specific name `dictionary`.
pub fn dictionary(values: impl IntoIterator<Item = impl Into<String>>) -> Predicate {
    normalized_in(values)
}
pub fn capitalized() -> Predicate {
    Predicate::Capitalized
}
pub fn upper() -> Predicate {
    Predicate::Upper
}
pub fn lower_() -> Predicate {
    Predicate::Lower
}
pub fn title() -> Predicate {
    Predicate::Title
}

/// Flattens nested `And` at construction time so chained `and_(and_(a, b), c)`
/// builds one flat variant instead of a tree of singletons.
pub fn and_(preds: impl IntoIterator<Item = Predicate>) -> Predicate {
    let mut flat = Vec::new();
    for p in preds {
        match p {
            Predicate::And(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }
    Predicate::And(flat)
}
pub fn or_(preds: impl IntoIterator<Item = Predicate>) -> Predicate {
    let mut flat = Vec::new();
    for p in preds {
        match p {
            Predicate::Or(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }
    Predicate::Or(flat)
}
pub fn not_(p: Predicate) -> Predicate {
    Predicate::Not(Box::new(p))
}
pub fn custom(f: impl Fn(&Token) -> bool + 'static) -> Predicate {
    Predicate::Custom(Rc::new(f))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(v: &str) -> Token {
        Token::new(v, TokenKind::Word, 0, v.chars().count())
    }

    #[test]
    fn eq_and_caseless() {
        assert!(eq("ст").test(&word("ст")));
        assert!(!eq("ст").test(&word("Ст")));
        assert!(caseless("СТ").test(&word("ст")));
    }

    #[test]
    fn gte_lte_guard_non_int() {
        let n = Token::new("15", TokenKind::Int, 0, 2);
        assert!(gte(10).test(&n));
        assert!(lte(20).test(&n));
        assert!(!gte(20).test(&n));
        let w = word("15");
        assert!(!gte(0).test(&w));
        assert!(!lte(100).test(&w));
    }

    #[test]
    fn gram_requires_forms() {
        use crate::token::MorphForm;
        let mut t = word("иванов");
        assert!(!gram("Surn").test(&t));
        t.forms = vec![MorphForm::new("иванов", ["Surn".to_string(), "masc".to_string()])];
        assert!(gram("Surn").test(&t));
        assert!(!gram("Name").test(&t));
    }

    #[test]
    fn and_or_not_flatten_and_combine() {
        let p = and_([eq("a"), or_([eq("b"), eq("c")])]);
        assert!(!p.test(&word("a")));
        let p2 = and_([and_([eq("a")]), not_(eq("b"))]);
        match &p2 {
            Predicate::And(v) => assert_eq!(v.len(), 2),
            _ => panic!("expected flattened And"),
        }
        assert!(p2.test(&word("a")));
    }

    #[test]
    fn custom_predicate() {
        let p = custom(|t: &Token| t.value.len() % 2 == 0);
        assert!(p.test(&word("ст")));
        assert!(!p.test(&word("с")));
    }
}
