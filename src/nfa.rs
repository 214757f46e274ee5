//! The ε-NFA produced by the automaton construction.
//!
//! States live in an arena indexed by [`StateId`]; edges are stored on
//! their source state in insertion order, which keeps taint lists
//! reproducible. The automaton also owns the taint registry: each
//! [`TaintId`] names one occurrence of a string operation encountered
//! during construction, in introduction order.

use log::debug;

use crate::ops::Operation;
use crate::pattern::quote_literal;
use crate::types::{StateId, TaintId};

/// An edge label: ε, a quoted literal, or a raw regex fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    Epsilon,
    Literal(String),
    Pattern(String),
}

impl Label {
    pub fn is_epsilon(&self) -> bool {
        matches!(self, Label::Epsilon)
    }

    /// Renders the label in the pattern dialect: literals are quoted with
    /// `\Q…\E`, ε stays the ε marker, fragments pass through.
    pub fn render(&self) -> String {
        match self {
            Label::Epsilon => "ε".to_string(),
            Label::Literal(v) => quote_literal(v),
            Label::Pattern(p) => p.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub label: Label,
    pub target: StateId,
    /// Ancestor chain of operation taints: taints introduced deeper in the
    /// construction appear later in the list.
    pub taints: Vec<TaintId>,
}

#[derive(Debug, Clone)]
pub struct State {
    id: StateId,
    pub is_start: bool,
    pub is_accepting: bool,
    edges: Vec<Edge>,
    taints: Vec<TaintId>,
}

impl State {
    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn taints(&self) -> &[TaintId] {
        &self.taints
    }
}

#[derive(Debug)]
pub struct Nfa {
    states: Vec<State>,
    start: StateId,
    accept: StateId,
    taint_ops: Vec<Operation>,
}

impl Nfa {
    /// Creates an automaton holding only its start and accept states.
    pub fn new() -> Self {
        let mut nfa = Nfa {
            states: Vec::new(),
            start: StateId::new(0),
            accept: StateId::new(1),
            taint_ops: Vec::new(),
        };
        let start = nfa.add_state();
        let accept = nfa.add_state();
        nfa.states[start.index()].is_start = true;
        nfa.states[accept.index()].is_accepting = true;
        nfa.start = start;
        nfa.accept = accept;
        nfa
    }

    pub fn start(&self) -> StateId {
        self.start
    }

    pub fn accept(&self) -> StateId {
        self.accept
    }

    pub fn add_state(&mut self) -> StateId {
        let id = StateId::new(self.states.len() as u32);
        self.states.push(State {
            id,
            is_start: false,
            is_accepting: false,
            edges: Vec::new(),
            taints: Vec::new(),
        });
        id
    }

    pub fn state(&self, id: StateId) -> &State {
        &self.states[id.index()]
    }

    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.states.iter()
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn num_edges(&self) -> usize {
        self.states.iter().map(|s| s.edges.len()).sum()
    }

    pub fn add_edge(&mut self, from: StateId, label: Label, to: StateId, taints: Vec<TaintId>) {
        self.states[from.index()].edges.push(Edge {
            label,
            target: to,
            taints,
        });
    }

    pub fn edges_mut(&mut self, id: StateId) -> &mut Vec<Edge> {
        &mut self.states[id.index()].edges
    }

    /// Records the taint chain on a state, appending the taints that are
    /// not present yet in chain order.
    pub fn mark_taints(&mut self, id: StateId, chain: &[TaintId]) {
        let state = &mut self.states[id.index()];
        for &t in chain {
            if !state.taints.contains(&t) {
                state.taints.push(t);
            }
        }
    }

    /// Registers a fresh operation occurrence and returns its taint id.
    pub fn register_taint(&mut self, op: Operation) -> TaintId {
        let id = TaintId::new(self.taint_ops.len() as u32);
        self.taint_ops.push(op);
        id
    }

    pub fn taint_op(&self, t: TaintId) -> &Operation {
        &self.taint_ops[t.index()]
    }

    pub fn num_taints(&self) -> usize {
        self.taint_ops.len()
    }

    /// All states carrying the given taint, in id order.
    pub fn states_with_taint(&self, t: TaintId) -> Vec<StateId> {
        self.states
            .iter()
            .filter(|s| s.taints.contains(&t))
            .map(|s| s.id)
            .collect()
    }

    /// Drops every state unreachable from the start state and compacts the
    /// arena, remapping state ids. The accept state is always kept so the
    /// automaton invariant of one start and one accept state survives even
    /// when the accepted language becomes empty.
    pub fn remove_unreachable(&mut self) {
        let mut reachable = vec![false; self.states.len()];
        let mut stack = vec![self.start];
        reachable[self.start.index()] = true;
        while let Some(s) = stack.pop() {
            for edge in &self.states[s.index()].edges {
                if !reachable[edge.target.index()] {
                    reachable[edge.target.index()] = true;
                    stack.push(edge.target);
                }
            }
        }
        reachable[self.accept.index()] = true;

        if reachable.iter().all(|&r| r) {
            return;
        }

        // Remap: new_id[old] = new index for kept states.
        let mut new_id = vec![usize::MAX; self.states.len()];
        let mut next = 0usize;
        for (old, &keep) in reachable.iter().enumerate() {
            if keep {
                new_id[old] = next;
                next += 1;
            }
        }
        debug!(
            "remove_unreachable: {} -> {} states",
            self.states.len(),
            next
        );

        let old_states = std::mem::take(&mut self.states);
        for (old, mut state) in old_states.into_iter().enumerate() {
            if !reachable[old] {
                continue;
            }
            state.id = StateId::new(new_id[old] as u32);
            state.edges.retain(|e| reachable[e.target.index()]);
            for edge in &mut state.edges {
                edge.target = StateId::new(new_id[edge.target.index()] as u32);
            }
            self.states.push(state);
        }
        self.start = StateId::new(new_id[self.start.index()] as u32);
        self.accept = StateId::new(new_id[self.accept.index()] as u32);
    }
}

impl Default for Nfa {
    fn default() -> Self {
        Nfa::new()
    }
}
