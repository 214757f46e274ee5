//! # strapprox-rs: regular approximation of string values
//!
//! **`strapprox-rs`** computes a regular language that over-approximates
//! the set of strings a program expression may evaluate to at runtime. It
//! is designed for static analysis: given a data-flow grammar for a
//! *hotspot* (say, a value flowing into an SQL query), the engine emits a
//! concrete regular expression pattern usable to verify sanitisation
//! properties or to check for leaks of untrusted content.
//!
//! ## The pipeline
//!
//! 1. A context-free [`Grammar`][grammar::Grammar] models one nonterminal
//!    per program expression; string operations (`replace`, `reverse`,
//!    case mapping, `trim`) appear as operation productions.
//! 2. [`approx`] propagates a per-nonterminal character set through the
//!    grammar and eliminates cycles that cross operation productions.
//! 3. [`regular`] applies Mohri–Nederhof regular approximation, rewriting
//!    every component that is recursive in both directions into a purely
//!    right-recursive form.
//! 4. [`build`] constructs an ε-NFA from the now strongly regular grammar,
//!    attaching operation *taints* to the edges and states produced inside
//!    each operation's scope.
//! 5. [`resolve`] replays the deferred operations over the tainted
//!    sub-automata, innermost first.
//! 6. [`determinize`] (optional) and [`pattern`] turn the automaton into a
//!    regular expression via subset construction and state elimination.
//!
//! The result is always a superset of the language derivable from the
//! grammar: every widening in the engine errs toward accepting more.
//!
//! ## Basic usage
//!
//! ```rust
//! use strapprox_rs::parser::parse_grammar;
//!
//! // A -> a | B; B -> Ab derives a, ab, abb, …
//! let mut grammar = parse_grammar("A -> a | B\nB -> Ab\n").unwrap();
//! let pattern = strapprox_rs::approximate_to_pattern(&mut grammar).unwrap();
//! let re = regex::Regex::new(&format!(
//!     "^(?:{})$",
//!     strapprox_rs::pattern::compilable(&pattern)
//! ))
//! .unwrap();
//! assert!(re.is_match("abb"));
//! assert!(!re.is_match("b"));
//! ```
//!
//! ## Core components
//!
//! - **[`charset`]**: finite and Σ-complement character sets.
//! - **[`grammar`]**: nonterminals, productions, the grammar arena.
//! - **[`ops`]**: the string-operation catalogue with its charset and
//!   automaton transformers.
//! - **[`scc`]**: Tarjan condensation and recursion classification.
//! - **[`nfa`]**: the tainted ε-NFA.

pub mod approx;
pub mod build;
pub mod charset;
pub mod determinize;
pub mod dot;
pub mod errors;
pub mod grammar;
pub mod nfa;
pub mod ops;
pub mod parser;
pub mod pattern;
pub mod regular;
pub mod resolve;
pub mod scc;
pub mod terminal;
pub mod types;

use std::collections::BTreeSet;

pub use crate::errors::{Error, Result};
pub use crate::types::{NtId, StateId, TaintId};

/// Runs the whole approximation pipeline and returns the resolved ε-NFA.
///
/// `hotspots` are the nonterminal ids whose value is observed by the
/// caller; the start nonterminal is always included.
pub fn approximate(
    grammar: &mut grammar::Grammar,
    hotspots: &BTreeSet<NtId>,
) -> Result<nfa::Nfa> {
    let _charsets = approx::charset_approximation(grammar);
    let mut observed = hotspots.clone();
    if let Some(start) = grammar.start() {
        observed.insert(start);
    }
    regular::regular_approximation(grammar, &observed);
    let mut nfa = build::build_nfa(grammar)?;
    resolve::resolve_operations(&mut nfa);
    Ok(nfa)
}

/// Convenience wrapper: pipeline, then state elimination to a pattern in
/// the engine dialect. The start nonterminal is the only hotspot.
pub fn approximate_to_pattern(grammar: &mut grammar::Grammar) -> Result<String> {
    let nfa = approximate(grammar, &BTreeSet::new())?;
    Ok(pattern::from_nfa(&nfa))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::parser::parse_grammar;

    #[test]
    fn test_pipeline_smoke() {
        let mut g = parse_grammar("A -> a\n").unwrap();
        let pattern = approximate_to_pattern(&mut g).unwrap();
        assert_eq!(pattern, "\\Qa\\E");
    }

    #[test]
    fn test_pipeline_missing_start() {
        let mut g = grammar::Grammar::new();
        assert_eq!(
            approximate(&mut g, &BTreeSet::new()).unwrap_err(),
            Error::MissingStart
        );
    }
}
