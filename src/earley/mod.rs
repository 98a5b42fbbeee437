//! The token-level Earley recognizer: chart construction, match assembly,
//! non-overlap resolution, and the public [`Parser`] API.
mod chart;
mod state;

use crate::grammar::{Rule, Term};
use crate::predicate::Predicate;
use crate::token::Token;
use crate::tree::{Match, Tree};
use crate::Log;
use chart::Chart;
use state::{Child, EarleyState};
use std::cell::Cell;

/// Column growth recorded by one pass of chart construction, the payload a
/// [`Trace`] level carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColumnGrowth {
    pub column: usize,
    pub predicted: usize,
    pub scanned: usize,
    pub completed: usize,
}

impl ColumnGrowth {
    fn total(&self) -> usize {
        self.predicted + self.scanned + self.completed
    }
}

/// A [`Log`] level settable on a [`Parser`] to trace chart construction.
/// `Log::None` (the default) emits nothing; `Log::Default` prints one line
/// per column that grew; `Log::Verbose` prints one line per column
/// regardless of growth. All printing happens only in `cfg(debug_assertions)`
/// builds, so the release build pays nothing for an unset or set trace.
pub type Trace = Log<ColumnGrowth>;

/// Parses a token stream against a single root [`Rule`] and locates
/// non-overlapping matches anywhere within it.
///
/// The chart seeds the root rule's productions at *every* column, not just
/// column 0 — this is what makes `findall` a search over the whole token
/// stream rather than an anchored full-string parse, recognizing the root
/// rule anywhere it occurs rather than requiring it to span the entire
/// input.
pub struct Parser {
    root: Rule,
    trace: Cell<Trace>,
}

impl Parser {
    pub fn new(root: Rule) -> Self {
        Parser { root, trace: Cell::new(Log::None) }
    }

    /// Sets the chart-construction trace level. Takes effect on the next
    /// `findall`/`find`/`partial_matches` call.
    pub fn set_trace(&mut self, trace: Trace) {
        self.trace.set(trace);
    }

    fn build_chart(&self, tokens: &[Token]) -> Chart {
        let n = tokens.len();
        let mut chart = Chart::new(n + 1);

        for col in 0..=n {
            self.seed_root(&mut chart, col);

            #[cfg(debug_assertions)]
            let mut growth = ColumnGrowth { column: col, ..ColumnGrowth::default() };

            let mut idx = 0;
            while idx < chart.columns[col].states.len() {
                let state = chart.columns[col].states[idx].clone();
                if state.is_complete() {
                    let added = self.complete(&mut chart, col, idx, &state);
                    #[cfg(debug_assertions)]
                    {
                        growth.completed += added;
                    }
                } else {
                    let term = state.rule.productions()[state.production_idx].terms[state.dot].clone();
                    match term {
                        Term::Predicate(p) => {
                            let added = self.scan(&mut chart, col, &state, &p, tokens, n);
                            #[cfg(debug_assertions)]
                            {
                                growth.scanned += added;
                            }
                        }
                        Term::Rule(r) => {
                            let added = self.predict(&mut chart, col, &r);
                            #[cfg(debug_assertions)]
                            {
                                growth.predicted += added;
                            }
                        }
                    }
                }
                idx += 1;
            }

            #[cfg(debug_assertions)]
            self.emit_trace(growth);
        }
        chart
    }

    #[cfg(debug_assertions)]
    fn emit_trace(&self, growth: ColumnGrowth) {
        let trace = self.trace.get();
        if trace.order() >= Log::Verbose(ColumnGrowth::default()).order() {
            println!(
                "[column {}] predicted={} scanned={} completed={}",
                growth.column, growth.predicted, growth.scanned, growth.completed
            );
        } else if trace.order() >= Log::Default(ColumnGrowth::default()).order() && growth.total() > 0 {
            println!("[column {}] grew by {} states", growth.column, growth.total());
        }
    }

    fn seed_root(&self, chart: &mut Chart, col: usize) {
        for (p_idx, _) in self.root.productions().iter().enumerate() {
            chart.columns[col].add(EarleyState {
                rule: self.root.clone(),
                production_idx: p_idx,
                dot: 0,
                start: col,
                stop: col,
                children: Vec::new(),
            });
        }
    }

    fn predict(&self, chart: &mut Chart, col: usize, r: &Rule) -> usize {
        let mut added = 0;
        for (p_idx, _) in r.productions().iter().enumerate() {
            if chart.columns[col]
                .add(EarleyState {
                    rule: r.clone(),
                    production_idx: p_idx,
                    dot: 0,
                    start: col,
                    stop: col,
                    children: Vec::new(),
                })
                .is_some()
            {
                added += 1;
            }
        }
        added
    }

    fn scan(
        &self,
        chart: &mut Chart,
        col: usize,
        state: &EarleyState,
        pred: &Predicate,
        tokens: &[Token],
        n: usize,
    ) -> usize {
        if col >= n || !pred.test(&tokens[col]) {
            return 0;
        }
        let mut children = state.children.clone();
        children.push(Child::Leaf(tokens[col].clone()));
        let added = chart.columns[col + 1].add(EarleyState {
            rule: state.rule.clone(),
            production_idx: state.production_idx,
            dot: state.dot + 1,
            start: state.start,
            stop: col + 1,
            children,
        });
        added.is_some() as usize
    }

    fn complete(&self, chart: &mut Chart, col: usize, state_idx: usize, state: &EarleyState) -> usize {
        let waiting = chart.columns[state.start].waiting_for(state.rule.id()).to_vec();
        let mut added = 0;
        for parent_idx in waiting {
            let parent = chart.columns[state.start].states[parent_idx].clone();
            let mut children = parent.children.clone();
            children.push(Child::Node(col, state_idx));
            if chart.columns[col]
                .add(EarleyState {
                    rule: parent.rule.clone(),
                    production_idx: parent.production_idx,
                    dot: parent.dot + 1,
                    start: parent.start,
                    stop: col,
                    children,
                })
                .is_some()
            {
                added += 1;
            }
        }
        added
    }

    fn completed_root_matches(&self, chart: &Chart, tokens: &[Token]) -> Vec<Match> {
        let mut out = Vec::new();
        for column in &chart.columns {
            for state in &column.states {
                if state.rule == self.root && state.is_complete() {
                    let tree = assemble_tree(chart, state);
                    out.push(Match {
                        rule: state.rule.clone(),
                        tokens: tokens[state.start..state.stop].to_vec(),
                        start: state.start,
                        stop: state.stop,
                        tree,
                    });
                }
            }
        }
        out
    }

    /// `findall` — every non-overlapping match, agreement-filtered, ordered
    /// by start position. Candidates are sorted by `(start asc, span length
    /// desc)` and accepted greedily, skipping any candidate overlapping an
    /// already-accepted match.
    pub fn findall(&self, tokens: &[Token]) -> Vec<Match> {
        let chart = self.build_chart(tokens);
        let mut candidates: Vec<Match> = self
            .completed_root_matches(&chart, tokens)
            .into_iter()
            .filter(Match::valid_relations)
            .collect();

        candidates.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then((b.stop - b.start).cmp(&(a.stop - a.start)))
        });

        let mut accepted: Vec<Match> = Vec::new();
        for m in candidates {
            let overlaps = accepted
                .iter()
                .any(|acc| m.start < acc.stop && acc.start < m.stop);
            if !overlaps {
                accepted.push(m);
            }
        }
        accepted
    }

    /// `find` — the first accepted match, if any.
    pub fn find(&self, tokens: &[Token]) -> Option<Match> {
        self.findall(tokens).into_iter().next()
    }

    /// `partial_matches` — non-completed root-rule states across the whole
    /// chart, ranked by completion ratio (`dot / |terms|`, most complete
    /// first) and deduplicated by rule name. An auxiliary diagnostic for
    /// incremental/autocomplete use; does not affect `findall`.
    pub fn partial_matches(&self, tokens: &[Token]) -> Vec<PartialMatch> {
        let chart = self.build_chart(tokens);
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();

        for column in &chart.columns {
            for state in &column.states {
                if state.rule != self.root || state.is_complete() {
                    continue;
                }
                let name = state.rule.name();
                if !seen.insert(name.clone()) {
                    continue;
                }
                out.push(PartialMatch {
                    rule_name: name,
                    start: state.start,
                    stop: state.stop,
                    dot: state.dot,
                    terms_len: state.terms_len(),
                });
            }
        }

        out.sort_by(|a, b| {
            let ratio = |p: &PartialMatch| p.dot as f64 / p.terms_len.max(1) as f64;
            ratio(b)
                .partial_cmp(&ratio(a))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        out
    }
}

/// One non-completed root-rule derivation surfaced by [`Parser::partial_matches`].
#[derive(Debug, Clone)]
pub struct PartialMatch {
    pub rule_name: Option<String>,
    pub start: usize,
    pub stop: usize,
    pub dot: usize,
    pub terms_len: usize,
}

fn assemble_tree(chart: &Chart, state: &EarleyState) -> Tree {
    let children = state
        .children
        .iter()
        .map(|c| match c {
            Child::Leaf(t) => Tree::Leaf(t.clone()),
            Child::Node(col, idx) => assemble_tree(chart, &chart.columns[*col].states[*idx]),
        })
        .collect();
    Tree::Node { rule: state.rule.clone(), children }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{named, optional, or_rule, rule, RepeatBound};
    use crate::predicate::{caseless, eq};
    use crate::token::TokenKind;

    fn word(v: &str, start: usize, stop: usize) -> Token {
        Token::new(v, TokenKind::Word, start, stop)
    }

    fn toks(values: &[&str]) -> Vec<Token> {
        let mut out = Vec::new();
        let mut pos = 0;
        for v in values {
            out.push(word(v, pos, pos + v.chars().count()));
            pos += v.chars().count() + 1;
        }
        out
    }

    #[test]
    fn exact_two_token_sequence() {
        let r = rule(vec![
            Term::predicate(caseless("улица")),
            Term::predicate(eq("Ленина")),
        ]);
        let parser = Parser::new(r);
        let input = toks(&["улица", "Ленина"]);
        let matches = parser.findall(&input);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].tokens.len(), 2);
    }

    #[test]
    fn alternation_with_optional() {
        let a = rule(vec![Term::predicate(eq("дом"))]);
        let b = rule(vec![Term::predicate(eq("строение"))]);
        let alt = or_rule(vec![a, b]);
        let number = rule(vec![Term::predicate(eq("5"))]);
        let opt_number = optional(&number);
        let r = rule(vec![Term::rule(&alt), Term::rule(&opt_number)]);
        let parser = Parser::new(r);

        let with_number = toks(&["дом", "5"]);
        assert_eq!(parser.findall(&with_number).len(), 1);

        let without_number = toks(&["строение"]);
        assert_eq!(parser.findall(&without_number).len(), 1);
    }

    #[test]
    fn bounded_repetition_prefers_longest_match() {
        let digit = rule(vec![Term::predicate(eq("1"))]);
        let r = crate::grammar::repeatable(&digit, 1, RepeatBound::Bounded(3)).unwrap();
        let parser = Parser::new(r);
        let input = toks(&["1", "1", "1"]);
        let matches = parser.findall(&input);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].tokens.len(), 3);
    }

    #[test]
    fn unbounded_repetition_matches_run_of_tokens() {
        let digit = rule(vec![Term::predicate(eq("1"))]);
        let r = crate::grammar::repeatable(&digit, 1, RepeatBound::Unbounded).unwrap();
        let parser = Parser::new(r);
        let input = toks(&["1", "1", "1", "1"]);
        let matches = parser.findall(&input);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].tokens.len(), 4);
    }

    #[test]
    fn non_overlap_resolution_prefers_earlier_longer_match() {
        let a = rule(vec![Term::predicate(eq("x")), Term::predicate(eq("y"))]);
        let b = rule(vec![Term::predicate(eq("y")), Term::predicate(eq("z"))]);
        let r = named(&or_rule(vec![a, b]), "xy_or_yz");
        let parser = Parser::new(r);
        let input = toks(&["x", "y", "z"]);
        let matches = parser.findall(&input);
        assert_eq!(matches.len(), 1);
        assert_eq!((matches[0].start, matches[0].stop), (0usize, 2usize));
    }

    #[test]
    fn recursive_forward_rule_matches_nested_structure() {
        let fwd = crate::grammar::forward();
        let atom = rule(vec![Term::predicate(eq("a"))]);
        let wrapped = rule(vec![
            Term::predicate(eq("(")),
            Term::rule(&fwd),
            Term::predicate(eq(")")),
        ]);
        crate::grammar::define(&fwd, or_rule(vec![atom, wrapped]));

        let parser = Parser::new(fwd);
        let input = toks(&["(", "(", "a", ")", ")"]);
        let matches = parser.findall(&input);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].tokens.len(), 5);
    }

    #[test]
    fn find_returns_first_of_findall() {
        let r = rule(vec![Term::predicate(eq("a"))]);
        let parser = Parser::new(r);
        let input = toks(&["a", "b", "a"]);
        let first = parser.find(&input).unwrap();
        assert_eq!(first.start, 0);
    }

    #[test]
    fn no_match_returns_empty() {
        let r = rule(vec![Term::predicate(eq("zzz"))]);
        let parser = Parser::new(r);
        let input = toks(&["a", "b"]);
        assert!(parser.findall(&input).is_empty());
    }

    #[test]
    fn set_trace_does_not_change_findall_results() {
        let r = rule(vec![Term::predicate(eq("a")), Term::predicate(eq("b"))]);
        let mut parser = Parser::new(r);
        let input = toks(&["a", "b"]);
        parser.set_trace(Log::Verbose(ColumnGrowth::default()));
        let matches = parser.findall(&input);
        assert_eq!(matches.len(), 1);
    }
}
