//! Replaying the deferred string operations over the automaton.
//!
//! Taints were introduced in descent order during construction, so
//! resolving them in reverse id order works innermost-first, which matches
//! the evaluation order of the original expression: `reverse(lower(x))`
//! lowercases the sub-automaton before reversing it.

use log::debug;

use crate::nfa::Nfa;
use crate::types::TaintId;

pub fn resolve_operations(nfa: &mut Nfa) {
    for index in (0..nfa.num_taints()).rev() {
        let taint = TaintId::new(index as u32);
        let states = nfa.states_with_taint(taint);
        if states.is_empty() {
            continue;
        }
        let op = nfa.taint_op(taint).clone();
        debug!("resolving {} ({}) over {} states", taint, op, states.len());
        op.automaton_transform(nfa, &states, taint);
    }
}
