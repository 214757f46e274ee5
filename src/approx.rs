//! Character-set approximation over the grammar.
//!
//! Computes, for every nonterminal, an upper bound on the characters any
//! string derivable from it may contain, then eliminates cycles that cross
//! operation productions: a cyclic operation occurrence is replaced by a
//! terminal matching any string over the character set the operation
//! produces. Without this, replaying operations over the automaton would
//! not terminate on e.g. `A → replace[a,b](A) | a`.

use std::collections::{BTreeMap, VecDeque};

use log::debug;

use crate::charset::CharSet;
use crate::grammar::{Grammar, Production};
use crate::scc;
use crate::terminal::Terminal;
use crate::types::NtId;

/// Runs the full pass: fix-point charsets, then operation-cycle breaking.
/// Returns the per-nonterminal character sets. An empty grammar is left
/// unchanged.
pub fn charset_approximation(grammar: &mut Grammar) -> BTreeMap<NtId, CharSet> {
    if grammar.is_empty() {
        return BTreeMap::new();
    }
    let charsets = fixpoint_charsets(grammar);
    break_operation_cycles(grammar, &charsets);
    charsets
}

/// Kleene iteration per component, components in reverse topological order
/// so successors are stable before a component starts.
pub fn fixpoint_charsets(grammar: &Grammar) -> BTreeMap<NtId, CharSet> {
    let mut charsets: BTreeMap<NtId, CharSet> = BTreeMap::new();
    let predecessors = grammar.all_predecessors();
    let components = scc::condense(grammar);

    for comp in &components {
        let mut worklist: VecDeque<NtId> = comp.members.iter().copied().collect();
        for &id in &comp.members {
            charsets.insert(id, CharSet::empty());
        }
        while let Some(id) = worklist.pop_front() {
            let mut cs = CharSet::empty();
            for p in grammar.nonterminal(id).productions() {
                cs = cs.union(&production_charset(p, &charsets));
            }
            if charsets.get(&id) != Some(&cs) {
                debug!("charset({}) = {}", id, cs);
                charsets.insert(id, cs);
                if let Some(preds) = predecessors.get(&id) {
                    for &p in preds {
                        if comp.members.contains(&p) && !worklist.contains(&p) {
                            worklist.push_back(p);
                        }
                    }
                }
            }
        }
    }
    charsets
}

fn production_charset(p: &Production, charsets: &BTreeMap<NtId, CharSet>) -> CharSet {
    let of = |id: &NtId| charsets.get(id).cloned().unwrap_or_else(CharSet::empty);
    match p {
        Production::Terminal(t) => t.charset().clone(),
        Production::Unit(a) => of(a),
        Production::Concat(a, b) => of(a).union(&of(b)),
        Production::UnaryOp(op, a) => op.charset_transform(&of(a), None),
        Production::BinaryOp(op, a, b) => op.charset_transform(&of(a), Some(&of(b))),
    }
}

/// Repeatedly replaces the highest-priority operation production that
/// targets its own component by a terminal over the character set the
/// operation produces, recomputing components after every replacement. On
/// return no operation production participates in any cycle.
fn break_operation_cycles(grammar: &mut Grammar, charsets: &BTreeMap<NtId, CharSet>) {
    loop {
        let components = scc::condense(grammar);
        let component_of = scc::component_map(&components);

        // Highest priority first; ties resolved by id order.
        let mut candidate: Option<(NtId, usize, u8)> = None;
        for id in grammar.ids() {
            for (i, p) in grammar.nonterminal(id).productions().iter().enumerate() {
                let Some(op) = p.operation() else { continue };
                let cyclic = p
                    .targets()
                    .iter()
                    .any(|t| component_of.get(t) == component_of.get(&id));
                if !cyclic {
                    continue;
                }
                let priority = op.priority();
                if candidate.map_or(true, |(_, _, best)| priority > best) {
                    candidate = Some((id, i, priority));
                }
            }
        }

        let Some((id, index, _)) = candidate else { break };
        let production = grammar.nonterminal_mut(id).remove_production(index);
        let produced = production_charset(&production, charsets);
        debug!(
            "breaking operation cycle at {}: {:?} -> terminal over {}",
            id, production, produced
        );
        grammar
            .nonterminal_mut(id)
            .add_production(Production::Terminal(Terminal::from_charset(&produced)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::parser::parse_grammar;

    fn named(g: &Grammar, label: &str) -> NtId {
        g.ids()
            .find(|&id| g.nonterminal(id).label() == Some(label))
            .unwrap()
    }

    #[test]
    fn test_fixpoint_simple() {
        let g = parse_grammar("A -> a | B\nB -> Ab\n").unwrap();
        let cs = fixpoint_charsets(&g);
        let a = named(&g, "A");
        assert_eq!(cs[&a], CharSet::from_chars(['a', 'b']));
    }

    #[test]
    fn test_fixpoint_through_operation() {
        let g = parse_grammar("A -> F | replace[f,x](F)\nF -> fF | f\n").unwrap();
        let cs = fixpoint_charsets(&g);
        assert_eq!(cs[&named(&g, "F")], CharSet::from_chars(['f']));
        assert_eq!(cs[&named(&g, "A")], CharSet::from_chars(['f', 'x']));
    }

    #[test]
    fn test_breaks_operation_cycle() {
        // toUpperCase is on a cycle through A
        let mut g = parse_grammar("A -> toUpperCase(A) | a\n").unwrap();
        let a = named(&g, "A");
        let cs = charset_approximation(&mut g);
        assert_eq!(cs[&a], CharSet::from_chars(['a', 'A']));
        // the op production is gone, replaced by a terminal
        assert!(g
            .nonterminal(a)
            .productions()
            .iter()
            .all(|p| p.operation().is_none()));
        let comps = scc::condense(&g);
        assert!(comps.iter().all(|c| c.members.len() == 1));
    }

    #[test]
    fn test_acyclic_operations_survive() {
        let mut g = parse_grammar("A -> replace[f,x](F)\nF -> f\n").unwrap();
        let a = named(&g, "A");
        charset_approximation(&mut g);
        assert!(g.nonterminal(a).productions()[0].operation().is_some());
    }

    #[test]
    fn test_priority_picks_widest_first() {
        // Both ops are cyclic; replace at priority 4 goes before
        // toUpperCase at 2, and the loop keeps going until no operation
        // production is cyclic.
        let mut g = parse_grammar("A -> toUpperCase(A) | replace[a,b](A) | a\n").unwrap();
        let a = named(&g, "A");
        charset_approximation(&mut g);
        assert!(g
            .nonterminal(a)
            .productions()
            .iter()
            .all(|p| p.operation().is_none()));
    }

    #[test]
    fn test_empty_grammar_unchanged() {
        let mut g = Grammar::new();
        assert!(charset_approximation(&mut g).is_empty());
    }
}
