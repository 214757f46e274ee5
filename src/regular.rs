//! Mohri–Nederhof regular approximation.
//!
//! Every component that is recursive in both directions is rewritten into a
//! purely right-recursive form using primed counterparts: `A′` generates
//! whatever may follow a use of `A` inside the component. An ε-production
//! on `A′` is attached only where the component's language is actually
//! observed, i.e. at the hotspot or where a predecessor outside the
//! component reads the result; everywhere else the ε would only loosen the
//! approximation.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::grammar::{Grammar, Production};
use crate::scc::{self, Recursion};
use crate::terminal::Terminal;
use crate::types::NtId;

/// Rewrites every BOTH-recursive component. `hotspots` is the externally
/// supplied set of nonterminal ids that must keep ε on their primed
/// counterpart.
pub fn regular_approximation(grammar: &mut Grammar, hotspots: &BTreeSet<NtId>) {
    let components = scc::condense(grammar);
    let component_of = scc::component_map(&components);

    for (index, comp) in components.iter().enumerate() {
        if comp.recursion != Recursion::Both {
            continue;
        }
        debug!(
            "regular approximation of component {:?}",
            comp.members.iter().map(|m| m.to_string()).collect::<Vec<_>>()
        );

        // Predecessors on the current grammar: rewrites of earlier
        // components may already reference members of this one.
        let predecessors = grammar.all_predecessors();
        let needs_epsilon: BTreeSet<NtId> = comp
            .members
            .iter()
            .copied()
            .filter(|id| {
                hotspots.contains(id)
                    || predecessors.get(id).map_or(false, |preds| {
                        preds.iter().any(|p| component_of.get(p) != Some(&index))
                    })
            })
            .collect();

        // Mint all primes first; rewrites reference primes of other
        // members.
        let mut primed: BTreeMap<NtId, NtId> = BTreeMap::new();
        for &id in &comp.members {
            let label = grammar.nonterminal(id).label().map(|l| format!("{}'", l));
            let prime = grammar.create_new();
            if let Some(label) = label {
                grammar.nonterminal_mut(prime).set_label(label);
            }
            primed.insert(id, prime);
        }
        for &id in &needs_epsilon {
            debug!("{} keeps ε on its primed counterpart", id);
            grammar
                .nonterminal_mut(primed[&id])
                .add_production(Production::Terminal(Terminal::epsilon()));
        }

        // Snapshot and empty every member, then re-emit.
        let saved: BTreeMap<NtId, Vec<Production>> = comp
            .members
            .iter()
            .map(|&id| (id, grammar.nonterminal_mut(id).take_productions()))
            .collect();

        let in_comp = |id: &NtId| comp.members.contains(id);
        for (&a, productions) in &saved {
            let a_prime = primed[&a];
            for p in productions {
                match p {
                    Production::Unit(b) if in_comp(b) => {
                        grammar.nonterminal_mut(a).add_production(Production::Unit(*b));
                        grammar
                            .nonterminal_mut(primed[b])
                            .add_production(Production::Unit(a_prime));
                    }
                    Production::Unit(x) => {
                        grammar
                            .nonterminal_mut(a)
                            .add_production(Production::Concat(*x, a_prime));
                    }
                    Production::Concat(b, c) if in_comp(b) && in_comp(c) => {
                        grammar.nonterminal_mut(a).add_production(Production::Unit(*b));
                        grammar
                            .nonterminal_mut(primed[b])
                            .add_production(Production::Unit(*c));
                        grammar
                            .nonterminal_mut(primed[c])
                            .add_production(Production::Unit(a_prime));
                    }
                    Production::Concat(b, x) if in_comp(b) => {
                        grammar.nonterminal_mut(a).add_production(Production::Unit(*b));
                        grammar
                            .nonterminal_mut(primed[b])
                            .add_production(Production::Concat(*x, a_prime));
                    }
                    Production::Concat(x, b) if in_comp(b) => {
                        grammar
                            .nonterminal_mut(a)
                            .add_production(Production::Concat(*x, *b));
                        grammar
                            .nonterminal_mut(primed[b])
                            .add_production(Production::Unit(a_prime));
                    }
                    // Everything else generates no member of the component:
                    // wrap it in a helper so A becomes right-recursive.
                    other => {
                        let helper = grammar.create_new();
                        grammar
                            .nonterminal_mut(a)
                            .add_production(Production::Concat(helper, a_prime));
                        grammar.nonterminal_mut(helper).add_production(other.clone());
                    }
                }
            }
        }
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

    fn approximate(input: &str) -> Grammar {
        let mut g = parse_grammar(input).unwrap();
        let hotspots = BTreeSet::from([g.start().unwrap()]);
        regular_approximation(&mut g, &hotspots);
        g
    }

    #[test]
    fn test_no_both_components_left() {
        let g = approximate("S -> TS | a\nT -> SP\nP -> +\n");
        for comp in scc::condense(&g) {
            assert_ne!(comp.recursion, Recursion::Both, "component {:?}", comp.members);
        }
    }

    #[test]
    fn test_left_and_right_components_untouched() {
        let input = "A -> a | B\nB -> Ab\n";
        let g = approximate(input);
        let before = parse_grammar(input).unwrap();
        assert_eq!(g.print_grammar(), before.print_grammar());
    }

    #[test]
    fn test_hotspot_prime_gets_epsilon() {
        let g = approximate("S -> TS | a\nT -> SP\nP -> +\n");
        let s_prime = named(&g, "S'");
        assert!(g
            .nonterminal(s_prime)
            .productions()
            .iter()
            .any(|p| matches!(p, Production::Terminal(t) if t.is_epsilon())));
        // T is only read from inside the component: no ε
        let t_prime = named(&g, "T'");
        assert!(!g
            .nonterminal(t_prime)
            .productions()
            .iter()
            .any(|p| matches!(p, Production::Terminal(t) if t.is_epsilon())));
    }

    #[test]
    fn test_primes_have_fresh_ids() {
        let input = "S -> TS | a\nT -> SP\nP -> +\n";
        let before = parse_grammar(input).unwrap();
        let max_before = before.ids().max().unwrap();
        let g = approximate(input);
        assert!(named(&g, "S'") > max_before);
        assert!(named(&g, "T'") > max_before);
    }

    #[test]
    fn test_cross_component_reader_gets_epsilon() {
        // X reads A from outside A's component, so A' must have ε even
        // though A is not the hotspot.
        let g = approximate("X -> Ax\nA -> BA | a\nB -> AB | b\n");
        let a_prime = named(&g, "A'");
        assert!(g
            .nonterminal(a_prime)
            .productions()
            .iter()
            .any(|p| matches!(p, Production::Terminal(t) if t.is_epsilon())));
    }
}
