use super::state::EarleyState;
use crate::grammar::Term;
use std::collections::HashMap;

type StateKey = (usize, usize, usize, usize, usize);

fn key_of(s: &EarleyState) -> StateKey {
    (s.rule.id(), s.production_idx, s.dot, s.start, s.stop)
}

/// One column of the chart: an append-only list of states plus the dedup
/// index and the waiting-parent index used by COMPLETE.
pub(crate) struct Column {
    pub states: Vec<EarleyState>,
    seen: HashMap<StateKey, usize>,
    waiting: HashMap<usize, Vec<usize>>,
}

impl Column {
    fn new() -> Self {
        Column { states: Vec::new(), seen: HashMap::new(), waiting: HashMap::new() }
    }

    /// Appends `state` unless an equal `(rule, production, dot, start, stop)`
    /// is already present in this column. Registers the new state as a
    /// waiting parent if its next term is a rule reference, regardless of
    /// whether it arrived via seeding, PREDICT, SCAN, or COMPLETE.
    pub fn add(&mut self, state: EarleyState) -> Option<usize> {
        let key = key_of(&state);
        if self.seen.contains_key(&key) {
            return None;
        }
        let idx = self.states.len();
        self.seen.insert(key, idx);

        if let Some(prod) = state.rule.productions().get(state.production_idx) {
            if let Some(Term::Rule(r)) = prod.terms.get(state.dot) {
                self.waiting.entry(r.id()).or_default().push(idx);
            }
        }

        self.states.push(state);
        Some(idx)
    }

    pub fn waiting_for(&self, rule_id: usize) -> &[usize] {
        self.waiting.get(&rule_id).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

pub(crate) struct Chart {
    pub columns: Vec<Column>,
}

impl Chart {
    pub fn new(columns: usize) -> Self {
        Chart { columns: (0..columns).map(|_| Column::new()).collect() }
    }
}
