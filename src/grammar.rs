//! Composable grammar values: [`Rule`], [`Production`], [`Term`], and the
//! builder functions that combine them.
//!
//! A [`Rule`] is a node, not a value: the same `Rule` handle may be
//! referenced from many productions, and two rules built from identical
//! terms are still distinct rules — `Rc`-shared structures compared by
//! pointer identity. A [`forward`] reference's productions are filled in
//! later through a `OnceCell`, an explicit one-shot publish step rather
//! than a `RefCell` that could be mutated again after the grammar is
//! already in use.
use crate::error::ConstructionError;
use crate::interpret::Spec;
use crate::predicate::Predicate;
use once_cell::unsync::OnceCell;
use std::cell::RefCell;
use std::fmt::{Display, Formatter};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_RULE_ID: AtomicUsize = AtomicUsize::new(0);

fn next_rule_id() -> usize {
    NEXT_RULE_ID.fetch_add(1, Ordering::Relaxed)
}

/// A two-argument predicate over grammeme sets, used by [`match_rule`] to
/// attach an agreement constraint to a rule.
pub type AgreementFn = Rc<dyn Fn(&std::collections::BTreeSet<String>, &std::collections::BTreeSet<String>) -> bool>;

/// One term of a [`Production`]: either a terminal [`Predicate`] or a
/// non-terminal [`Rule`] reference.
#[derive(Clone)]
pub enum Term {
    Predicate(Predicate),
    Rule(Rule),
}

impl Term {
    pub fn rule(r: &Rule) -> Term {
        Term::Rule(r.clone())
    }
    pub fn predicate(p: Predicate) -> Term {
        Term::Predicate(p)
    }
}

/// One alternative of a rule: an ordered sequence of terms plus the index of
/// the "head" term used by relation anchoring.
#[derive(Clone)]
pub struct Production {
    pub terms: Vec<Term>,
    pub main: usize,
}

impl Production {
    pub fn new(terms: Vec<Term>) -> Self {
        Self { terms, main: 0 }
    }
    pub fn with_main(terms: Vec<Term>, main: usize) -> Self {
        Self { terms, main }
    }
    pub fn empty() -> Self {
        Self { terms: Vec::new(), main: 0 }
    }
}

struct RuleInner {
    id: usize,
    name: RefCell<Option<String>>,
    productions: OnceCell<Vec<Production>>,
    interpretation: RefCell<Option<Spec>>,
    relation: RefCell<Option<AgreementFn>>,
    pipeline_key: RefCell<Option<String>>,
}

/// A grammar rule: an `Rc`-identified node carrying an ordered list of
/// alternative [`Production`]s, plus optional metadata (name, relation,
/// interpretation, pipeline key) attached by the builder functions below.
///
/// Equality and hashing are by `Rc` identity, not by structural content — two
/// separately-built rules with identical productions are different rules.
#[derive(Clone)]
pub struct Rule(Rc<RuleInner>);

impl Rule {
    fn new_with(productions: Option<Vec<Production>>) -> Self {
        let cell = OnceCell::new();
        if let Some(p) = productions {
            let _ = cell.set(p);
        }
        Rule(Rc::new(RuleInner {
            id: next_rule_id(),
            name: RefCell::new(None),
            productions: cell,
            interpretation: RefCell::new(None),
            relation: RefCell::new(None),
            pipeline_key: RefCell::new(None),
        }))
    }

    /// A stable numeric identity, usable as a dedup/lookup key. Two `Rule`
    /// handles produced by `.clone()` of the same value share this id.
    pub fn id(&self) -> usize {
        self.0.id
    }

    pub fn name(&self) -> Option<String> {
        self.0.name.borrow().clone()
    }

    /// The rule's alternatives, or an empty slice if this is an undefined
    /// [`forward`] reference — matching nothing rather than panicking.
    pub fn productions(&self) -> &[Production] {
        match self.0.productions.get() {
            Some(p) => p.as_slice(),
            None => &[],
        }
    }

    pub fn is_defined(&self) -> bool {
        self.0.productions.get().is_some()
    }

    pub fn interpretation(&self) -> Option<Spec> {
        self.0.interpretation.borrow().clone()
    }

    pub fn relation(&self) -> Option<AgreementFn> {
        self.0.relation.borrow().clone()
    }

    pub fn pipeline_key(&self) -> Option<String> {
        self.0.pipeline_key.borrow().clone()
    }

    pub fn set_pipeline_key(&self, key: impl Into<String>) {
        *self.0.pipeline_key.borrow_mut() = Some(key.into());
    }

    /// A BNF-style text dump of this rule and every rule it transitively
    /// references, one line per rule. Purely a debugging aid; has no effect
    /// on recognition.
    pub fn build_grammar(&self) -> String {
        let mut out = String::new();
        let mut visited = std::collections::HashSet::new();
        self.write_grammar(&mut out, &mut visited);
        out
    }

    /// Writes this rule's line, then recurses into every rule its
    /// productions reference, skipping ids already in `visited` so a
    /// recursive grammar (built via `forward`/`define`) terminates instead
    /// of looping forever.
    fn write_grammar(&self, out: &mut String, visited: &mut std::collections::HashSet<usize>) {
        if !visited.insert(self.id()) {
            return;
        }
        use std::fmt::Write as _;
        let _ = write!(out, "{} ->", self);
        for (i, p) in self.productions().iter().enumerate() {
            if i > 0 {
                let _ = write!(out, " |");
            }
            if p.terms.is_empty() {
                let _ = write!(out, " ε");
            }
            for t in &p.terms {
                match t {
                    Term::Predicate(pred) => {
                        let _ = write!(out, " {:?}", pred);
                    }
                    Term::Rule(r) => {
                        let _ = write!(out, " {}", r);
                    }
                }
            }
        }
        let _ = writeln!(out);

        for p in self.productions() {
            for t in &p.terms {
                if let Term::Rule(r) = t {
                    r.write_grammar(out, visited);
                }
            }
        }
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Rule {}
impl std::hash::Hash for Rule {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl Display for Rule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(n) => write!(f, "{}", n),
            None => write!(f, "#{}", self.id()),
        }
    }
}

/// `rule(terms)` — one production over `terms`.
pub fn rule(terms: Vec<Term>) -> Rule {
    Rule::new_with(Some(vec![Production::new(terms)]))
}

/// `rule([terms1, terms2, ...])` — one production per alternative.
pub fn rule_alts(alts: Vec<Vec<Term>>) -> Rule {
    Rule::new_with(Some(alts.into_iter().map(Production::new).collect()))
}

/// `or_rule([r...])` — a rule whose productions are the concatenation of
/// every input rule's productions, with nested `or_rule`s inlined so an
/// `or_rule` of `or_rule`s flattens to one alternative list instead of a
/// tree.
pub fn or_rule(rules: Vec<Rule>) -> Rule {
    let mut productions = Vec::new();
    for r in rules {
        productions.extend(r.productions().iter().cloned());
    }
    Rule::new_with(Some(productions))
}

/// `optional(r)` — a new rule with all of `r`'s productions plus an empty
/// alternative.
pub fn optional(r: &Rule) -> Rule {
    let mut productions: Vec<Production> = r.productions().to_vec();
    productions.push(Production::empty());
    Rule::new_with(Some(productions))
}

/// Bound for [`repeatable`]'s `max` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatBound {
    Bounded(usize),
    Unbounded,
}

/// `repeatable(r, min, max)` — `r` repeated between `min` and `max` times.
///
/// * Unbounded `(1, inf)` is built as a forward-referencing rule
///   `R' -> r | r R'` (right recursion).
/// * Unbounded with `min == 0` wraps that in [`optional`].
/// * A bounded range is unrolled into one alternative per repeat count from
///   `min` to `max`, each alternative being `r` repeated `k` times. Earley's
///   own ambiguity handling (multiple completed states of different spans)
///   plus non-overlap resolution's longest-first tie-break gives "longest
///   match wins" behavior without needing a separate chain of defined rules.
pub fn repeatable(r: &Rule, min: usize, max: RepeatBound) -> Result<Rule, ConstructionError> {
    match max {
        RepeatBound::Bounded(max) => {
            if max < 1 || min > max {
                return Err(ConstructionError::InvalidRepetition { min, max: Some(max) });
            }
            let mut productions = Vec::new();
            for k in min..=max {
                let terms = (0..k).map(|_| Term::rule(r)).collect();
                productions.push(Production::new(terms));
            }
            Ok(Rule::new_with(Some(productions)))
        }
        RepeatBound::Unbounded => {
            if min == 0 {
                let at_least_one = repeatable_unbounded_one_or_more(r);
                Ok(optional(&at_least_one))
            } else if min == 1 {
                Ok(repeatable_unbounded_one_or_more(r))
            } else {
                // min > 1, unbounded: min-1 mandatory copies followed by 1+.
                let tail = repeatable_unbounded_one_or_more(r);
                let mut terms: Vec<Term> = (0..min - 1).map(|_| Term::rule(r)).collect();
                terms.push(Term::rule(&tail));
                Ok(rule(terms))
            }
        }
    }
}

fn repeatable_unbounded_one_or_more(r: &Rule) -> Rule {
    let fwd = forward();
    let productions = vec![
        Production::new(vec![Term::rule(r)]),
        Production::new(vec![Term::rule(r), Term::rule(&fwd)]),
    ];
    publish(&fwd, productions, None);
    fwd
}

/// `forward()` — a placeholder with stable identity and no productions yet.
pub fn forward() -> Rule {
    Rule::new_with(None)
}

fn publish(fwd: &Rule, productions: Vec<Production>, name: Option<String>) {
    // `define` publishes exactly once per placeholder; a second publish is a
    // construction-time logic error in caller code, not a recoverable one,
    // so silently ignoring it here would hide a bug. OnceCell enforces this.
    let _ = fwd.0.productions.set(productions);
    if name.is_some() {
        *fwd.0.name.borrow_mut() = name;
    }
}

/// `define(fwd, r)` — publishes `r`'s productions (and name, if any) into
/// `fwd`'s identity. Every `Term::Rule(fwd.clone())` already stored in other
/// productions observes the new productions immediately, since they share
/// the same `Rc`.
pub fn define(fwd: &Rule, r: Rule) {
    publish(fwd, r.productions().to_vec(), r.name());
}

/// `named(r, name)` — attaches a display/identity tag in place; does not
/// change recognition semantics or identity.
pub fn named(r: &Rule, name: impl Into<String>) -> Rule {
    *r.0.name.borrow_mut() = Some(name.into());
    r.clone()
}

/// `interpretation(r, spec)` — attaches an interpretation [`Spec`] in place.
pub fn interpretation(r: &Rule, spec: Spec) -> Rule {
    *r.0.interpretation.borrow_mut() = Some(spec);
    r.clone()
}

/// `match(r, agreementFn)` — attaches an agreement relation in place. Named
/// `match_rule` because `match` is a reserved keyword in Rust.
pub fn match_rule(r: &Rule, relation: AgreementFn) -> Rule {
    *r.0.relation.borrow_mut() = Some(relation);
    r.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::eq;

    #[test]
    fn rule_identity_not_structural_equality() {
        let a = rule(vec![Term::predicate(eq("x"))]);
        let b = rule(vec![Term::predicate(eq("x"))]);
        assert_ne!(a.id(), b.id());
        assert!(a != b);
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn or_rule_flattens_nested_or_rule() {
        let a = rule(vec![Term::predicate(eq("a"))]);
        let b = rule(vec![Term::predicate(eq("b"))]);
        let ab = or_rule(vec![a, b]);
        let c = rule(vec![Term::predicate(eq("c"))]);
        let abc = or_rule(vec![ab, c]);
        assert_eq!(abc.productions().len(), 3);
    }

    #[test]
    fn optional_adds_empty_alternative() {
        let a = rule(vec![Term::predicate(eq("a"))]);
        let opt = optional(&a);
        assert_eq!(opt.productions().len(), 2);
        assert!(opt.productions().iter().any(|p| p.terms.is_empty()));
    }

    #[test]
    fn forward_reference_resolves_after_define() {
        let fwd = forward();
        assert!(!fwd.is_defined());
        assert_eq!(fwd.productions().len(), 0);

        let real = rule(vec![Term::predicate(eq("x"))]);
        define(&fwd, real);
        assert!(fwd.is_defined());
        assert_eq!(fwd.productions().len(), 1);
    }

    #[test]
    fn bounded_repetition_rejects_bad_bounds() {
        let a = rule(vec![Term::predicate(eq("a"))]);
        assert!(repeatable(&a, 3, RepeatBound::Bounded(2)).is_err());
        assert!(repeatable(&a, 0, RepeatBound::Bounded(0)).is_err());
        assert!(repeatable(&a, 2, RepeatBound::Bounded(3)).is_ok());
    }

    #[test]
    fn bounded_repetition_unrolls_linear_chain() {
        let a = rule(vec![Term::predicate(eq("a"))]);
        let r = repeatable(&a, 2, RepeatBound::Bounded(3)).unwrap();
        assert_eq!(r.productions().len(), 2);
        assert_eq!(r.productions()[0].terms.len(), 2);
        assert_eq!(r.productions()[1].terms.len(), 3);
    }

    #[test]
    fn unbounded_one_or_more_is_right_recursive() {
        let a = rule(vec![Term::predicate(eq("a"))]);
        let r = repeatable(&a, 1, RepeatBound::Unbounded).unwrap();
        assert_eq!(r.productions().len(), 2);
        assert_eq!(r.productions()[1].terms.len(), 2);
    }

    #[test]
    fn build_grammar_lists_referenced_rules_once_each() {
        let leaf = named(&rule(vec![Term::predicate(eq("a"))]), "leaf");
        let top = named(&rule_alts(vec![vec![Term::rule(&leaf)], vec![Term::rule(&leaf)]]), "top");
        let dump = top.build_grammar();
        assert_eq!(dump.matches("top ->").count(), 1);
        assert_eq!(dump.matches("leaf ->").count(), 1);
    }

    #[test]
    fn build_grammar_terminates_on_recursive_rule() {
        let fwd = forward();
        define(&fwd, rule_alts(vec![vec![Term::predicate(eq("a"))], vec![Term::predicate(eq("a")), Term::rule(&fwd)]]));
        let dump = named(&fwd, "rec").build_grammar();
        assert_eq!(dump.matches("rec ->").count(), 1);
    }
}
