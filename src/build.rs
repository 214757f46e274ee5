//! Automaton construction from a strongly regular grammar.
//!
//! The construction is a recursive procedure `build(q0, α, q1, taints)`
//! adding transitions from `q0` to `q1` that accept the language of the
//! sentential form α. Non-recursive nonterminals are expanded inline;
//! a recursive component gets one port state per member, with exit and
//! recursion productions placed according to the component's recursion
//! direction, and a final ε-edge wiring the chosen member into the outer
//! frame.
//!
//! Every descent into an operation production appends a fresh taint to the
//! chain carried by the call; all states and edges touched by the subcall
//! record that chain. The taint registry order is the introduction order,
//! which the resolver later replays backwards.

use std::collections::BTreeMap;

use log::debug;

use crate::errors::{Error, Result};
use crate::grammar::{Grammar, Production};
use crate::nfa::{Label, Nfa};
use crate::scc::{self, Component, Recursion};
use crate::terminal::Terminal;
use crate::types::{NtId, StateId, TaintId};

/// A symbol of a sentential form.
#[derive(Debug, Clone)]
enum Sym {
    Terminal(Terminal),
    Nonterminal(NtId),
}

/// Builds the ε-NFA for the grammar's start nonterminal.
///
/// Expects the grammar to be strongly regular already: every component
/// LEFT-, RIGHT- or NONE-recursive. Fails with [`Error::MissingStart`] when
/// no start nonterminal is designated.
pub fn build_nfa(grammar: &Grammar) -> Result<Nfa> {
    let start = grammar.start().ok_or(Error::MissingStart)?;
    let components = scc::condense(grammar);
    let component_of = scc::component_map(&components);

    let mut builder = Builder {
        grammar,
        components,
        component_of,
        nfa: Nfa::new(),
    };
    let (q0, q1) = (builder.nfa.start(), builder.nfa.accept());
    builder.build(q0, &[Sym::Nonterminal(start)], q1, &[]);
    Ok(builder.nfa)
}

struct Builder<'g> {
    grammar: &'g Grammar,
    components: Vec<Component>,
    component_of: BTreeMap<NtId, usize>,
    nfa: Nfa,
}

impl<'g> Builder<'g> {
    fn build(&mut self, q0: StateId, alpha: &[Sym], q1: StateId, taints: &[TaintId]) {
        self.nfa.mark_taints(q0, taints);
        self.nfa.mark_taints(q1, taints);

        // Empty or all-ε sentential form: a single ε-edge.
        if alpha
            .iter()
            .all(|s| matches!(s, Sym::Terminal(t) if t.is_epsilon()))
        {
            self.nfa.add_edge(q0, Label::Epsilon, q1, taints.to_vec());
            return;
        }

        if alpha.len() > 1 {
            let q = self.nfa.add_state();
            self.build(q0, &alpha[..1], q, taints);
            self.build(q, &alpha[1..], q1, taints);
            return;
        }

        match &alpha[0] {
            Sym::Terminal(t) => {
                let label = if t.is_epsilon() {
                    Label::Epsilon
                } else if t.is_literal() {
                    Label::Literal(t.value().to_string())
                } else {
                    Label::Pattern(t.value().to_string())
                };
                self.nfa.add_edge(q0, label, q1, taints.to_vec());
            }
            Sym::Nonterminal(a) => self.build_nonterminal(q0, *a, q1, taints),
        }
    }

    fn build_nonterminal(&mut self, q0: StateId, a: NtId, q1: StateId, taints: &[TaintId]) {
        let grammar = self.grammar;
        let comp_index = self.component_of[&a];
        let recursive = {
            let comp = &self.components[comp_index];
            scc::is_component_recursive(grammar, &comp.members, a)
        };
        if !recursive {
            for p in grammar.nonterminal(a).productions() {
                let chain = self.extend_chain(taints, p);
                let gamma = sentential_form(p);
                self.build(q0, &gamma, q1, &chain);
            }
            return;
        }

        let comp = self.components[comp_index].clone();
        // A unit-only cycle carries no concat, so either placement is
        // sound; treat it as right recursion.
        let recursion = match comp.recursion {
            Recursion::Left => Recursion::Left,
            Recursion::Both => unreachable!("BOTH component after regular approximation"),
            _ => Recursion::Right,
        };
        debug!("build {}: recursive component, {:?}", a, recursion);

        // One port state per member.
        let mut port: BTreeMap<NtId, StateId> = BTreeMap::new();
        for &member in &comp.members {
            let q = self.nfa.add_state();
            self.nfa.mark_taints(q, taints);
            port.insert(member, q);
        }

        for &c in &comp.members {
            for p in grammar.nonterminal(c).productions() {
                let chain = self.extend_chain(taints, p);
                let gamma = sentential_form(p);
                let in_comp: Vec<usize> = gamma
                    .iter()
                    .enumerate()
                    .filter_map(|(i, s)| match s {
                        Sym::Nonterminal(n) if comp.members.contains(n) => Some(i),
                        _ => None,
                    })
                    .collect();
                match in_comp.as_slice() {
                    [] => {
                        // Exit production.
                        match recursion {
                            Recursion::Left => self.build(q0, &gamma, port[&c], &chain),
                            _ => self.build(port[&c], &gamma, q1, &chain),
                        }
                    }
                    [i] => {
                        let d = match gamma[*i] {
                            Sym::Nonterminal(n) => n,
                            Sym::Terminal(_) => unreachable!(),
                        };
                        match recursion {
                            Recursion::Left => {
                                assert_eq!(*i, 0, "member not leftmost in a left-recursive component");
                                self.build(port[&d], &gamma[1..], port[&c], &chain);
                            }
                            _ => {
                                assert_eq!(
                                    *i,
                                    gamma.len() - 1,
                                    "member not rightmost in a right-recursive component"
                                );
                                self.build(port[&c], &gamma[..gamma.len() - 1], port[&d], &chain);
                            }
                        }
                    }
                    _ => unreachable!("two component members in one production after regular approximation"),
                }
            }
        }

        // Wire the requested member into the outer frame.
        match recursion {
            Recursion::Left => self.nfa.add_edge(port[&a], Label::Epsilon, q1, taints.to_vec()),
            _ => self.nfa.add_edge(q0, Label::Epsilon, port[&a], taints.to_vec()),
        }
    }

    fn extend_chain(&mut self, taints: &[TaintId], p: &Production) -> Vec<TaintId> {
        let mut chain = taints.to_vec();
        if let Some(op) = p.operation() {
            let taint = self.nfa.register_taint(op.clone());
            debug!("taint {} for {}", taint, op);
            chain.push(taint);
        }
        chain
    }
}

/// The sentential form generated by a production. The aux operand of a
/// binary operation does not appear: replace does not concatenate its
/// operands, the aux side only feeds the operation transform.
fn sentential_form(p: &Production) -> Vec<Sym> {
    match p {
        Production::Terminal(t) => vec![Sym::Terminal(t.clone())],
        Production::Unit(a) => vec![Sym::Nonterminal(*a)],
        Production::Concat(a, b) => vec![Sym::Nonterminal(*a), Sym::Nonterminal(*b)],
        Production::UnaryOp(_, a) => vec![Sym::Nonterminal(*a)],
        Production::BinaryOp(_, a, _) => vec![Sym::Nonterminal(*a)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::parser::parse_grammar;

    #[test]
    fn test_missing_start() {
        let g = Grammar::new();
        assert_eq!(build_nfa(&g).unwrap_err(), Error::MissingStart);
    }

    #[test]
    fn test_left_recursive_shape() {
        // A -> a | B; B -> Ab: four states, an `a`-edge, a `b`-loop back
        // through an ε, and the ε into the accept state.
        let g = parse_grammar("A -> a | B\nB -> Ab\n").unwrap();
        let nfa = build_nfa(&g).unwrap();
        assert_eq!(nfa.num_states(), 4);
        assert_eq!(nfa.num_edges(), 4);
    }

    #[test]
    fn test_nederhof_example_shape() {
        // S -> Aa; A -> SB | Bb; B -> Bc | d
        let g = parse_grammar("S -> Aa\nA -> SB | Bb\nB -> Bc | d\n").unwrap();
        let nfa = build_nfa(&g).unwrap();
        assert_eq!(nfa.num_states(), 7);
        assert_eq!(nfa.num_edges(), 9);
    }

    #[test]
    fn test_taint_chains_are_nested() {
        let g = parse_grammar("A -> reverse(B)\nB -> toUpperCase(C)\nC -> c\n").unwrap();
        let nfa = build_nfa(&g).unwrap();
        assert_eq!(nfa.num_taints(), 2);
        // the literal edge carries the outer taint before the inner one
        let edge_taints: Vec<Vec<TaintId>> = nfa
            .states()
            .flat_map(|s| s.edges().iter().map(|e| e.taints.clone()))
            .filter(|t| !t.is_empty())
            .collect();
        assert!(!edge_taints.is_empty());
        for taints in edge_taints {
            let mut sorted = taints.clone();
            sorted.sort();
            assert_eq!(taints, sorted, "taint list must be an ancestor chain");
        }
    }

    #[test]
    fn test_one_start_one_accept() {
        use std::collections::BTreeSet;

        let mut g = parse_grammar("S -> TS | a\nT -> SP\nP -> +\n").unwrap();
        let hotspots = BTreeSet::from([g.start().unwrap()]);
        crate::regular::regular_approximation(&mut g, &hotspots);
        let nfa = build_nfa(&g).unwrap();
        assert_eq!(nfa.states().filter(|s| s.is_start).count(), 1);
        assert_eq!(nfa.states().filter(|s| s.is_accepting).count(), 1);
    }
}
