//! Subset construction over the resolved automaton.
//!
//! Edge labels are treated as opaque alphabet symbols: two edges carry the
//! same symbol iff their rendered labels are equal. Overlapping regex
//! fragments therefore stay separate symbols, which cannot shrink the
//! accepted language, so the result remains an over-approximation of the
//! ε-NFA's language.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use log::debug;

use crate::nfa::Nfa;
use crate::types::StateId;

/// A deterministic automaton over rendered-label symbols.
#[derive(Debug)]
pub struct Dfa {
    states: Vec<DfaState>,
    start: usize,
}

#[derive(Debug)]
pub struct DfaState {
    pub is_accepting: bool,
    /// Transitions sorted by symbol, one successor per symbol.
    pub transitions: Vec<(String, usize)>,
}

impl Dfa {
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn states(&self) -> &[DfaState] {
        &self.states
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }
}

pub fn determinize(nfa: &Nfa) -> Dfa {
    let closure = |set: &BTreeSet<StateId>| -> BTreeSet<StateId> {
        let mut out = set.clone();
        let mut stack: Vec<StateId> = out.iter().copied().collect();
        while let Some(s) = stack.pop() {
            for edge in nfa.state(s).edges() {
                if edge.label.is_epsilon() && out.insert(edge.target) {
                    stack.push(edge.target);
                }
            }
        }
        out
    };

    let start_set = closure(&BTreeSet::from([nfa.start()]));
    let mut index_of: BTreeMap<BTreeSet<StateId>, usize> = BTreeMap::new();
    let mut states: Vec<DfaState> = Vec::new();
    let mut queue: VecDeque<BTreeSet<StateId>> = VecDeque::new();

    index_of.insert(start_set.clone(), 0);
    states.push(DfaState {
        is_accepting: start_set.contains(&nfa.accept()),
        transitions: Vec::new(),
    });
    queue.push_back(start_set);

    while let Some(set) = queue.pop_front() {
        let index = index_of[&set];
        // Group targets by rendered label.
        let mut by_symbol: BTreeMap<String, BTreeSet<StateId>> = BTreeMap::new();
        for &s in &set {
            for edge in nfa.state(s).edges() {
                if edge.label.is_epsilon() {
                    continue;
                }
                by_symbol
                    .entry(edge.label.render())
                    .or_default()
                    .insert(edge.target);
            }
        }
        let mut transitions = Vec::new();
        for (symbol, targets) in by_symbol {
            let target_set = closure(&targets);
            let next = match index_of.get(&target_set) {
                Some(&i) => i,
                None => {
                    let i = states.len();
                    index_of.insert(target_set.clone(), i);
                    states.push(DfaState {
                        is_accepting: target_set.contains(&nfa.accept()),
                        transitions: Vec::new(),
                    });
                    queue.push_back(target_set);
                    i
                }
            };
            transitions.push((symbol, next));
        }
        states[index].transitions = transitions;
    }

    debug!("determinize: {} -> {} states", nfa.num_states(), states.len());
    Dfa { states, start: 0 }
}
