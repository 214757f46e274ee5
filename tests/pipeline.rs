//! End-to-end scenarios: grammar text in, pattern out, matched against
//! sample strings with the `regex` crate.

use std::collections::BTreeSet;

use regex::Regex;

use strapprox_rs::charset::CharSet;
use strapprox_rs::grammar::{Grammar, Production};
use strapprox_rs::parser::parse_grammar;
use strapprox_rs::pattern::compilable;
use strapprox_rs::terminal::Terminal;
use strapprox_rs::{approximate, approximate_to_pattern};

fn matcher_for(grammar_text: &str) -> Regex {
    let mut grammar = parse_grammar(grammar_text).unwrap();
    let pattern = approximate_to_pattern(&mut grammar).unwrap();
    anchored(&pattern)
}

fn anchored(pattern: &str) -> Regex {
    let converted = compilable(pattern);
    Regex::new(&format!("^(?:{})$", converted))
        .unwrap_or_else(|e| panic!("pattern {:?} does not compile: {}", converted, e))
}

#[test]
fn s1_left_recursion() {
    let re = matcher_for("A -> a | B\nB -> Ab\n");
    for sample in ["a", "ab", "abb", "abbbbb"] {
        assert!(re.is_match(sample), "expected match: {:?}", sample);
    }
    for sample in ["", "b", "ba", "aab"] {
        assert!(!re.is_match(sample), "expected reject: {:?}", sample);
    }
}

#[test]
fn s2_both_recursive_arithmetic() {
    let re = matcher_for("S -> TS | a\nT -> SP\nP -> +\n");
    for sample in ["a", "a+a", "a+a+a+a"] {
        assert!(re.is_match(sample), "expected match: {:?}", sample);
    }
    for sample in ["", "a+a+", "+a+a", "aa"] {
        assert!(!re.is_match(sample), "expected reject: {:?}", sample);
    }
}

#[test]
fn s3_nederhof_example() {
    let re = matcher_for("S -> Aa\nA -> SB | Bb\nB -> Bc | d\n");
    for sample in ["dba", "dccba", "dcbada", "dcbadccca"] {
        assert!(re.is_match(sample), "expected match: {:?}", sample);
    }
    for sample in ["a", "dcb", "dbad"] {
        assert!(!re.is_match(sample), "expected reject: {:?}", sample);
    }
}

#[test]
fn s4_arithmetic_with_parentheses() {
    // Simulates a program assembling expressions like ((((1*12)*3)*123):
    //   E -> D | P;  P -> ( E op E );  D a number;  op in {+, *}
    // with the parenthesised form flattened into binary concatenations.
    let mut g = Grammar::new();
    let e = g.create_new();
    let d = g.create_new();
    let p = g.create_new();
    let p1 = g.create_new();
    let p2 = g.create_new();
    let p3 = g.create_new();
    let op = g.create_new();
    let lp = g.create_new();
    let rp = g.create_new();

    g.nonterminal_mut(e).add_production(Production::Unit(d));
    g.nonterminal_mut(e).add_production(Production::Unit(p));
    g.nonterminal_mut(d)
        .add_production(Production::Terminal(Terminal::from_type("int")));
    g.nonterminal_mut(p).add_production(Production::Concat(lp, p1));
    g.nonterminal_mut(p1).add_production(Production::Concat(e, p2));
    g.nonterminal_mut(p2).add_production(Production::Concat(op, p3));
    g.nonterminal_mut(p3).add_production(Production::Concat(e, rp));
    g.nonterminal_mut(op)
        .add_production(Production::Terminal(Terminal::literal("+")));
    g.nonterminal_mut(op)
        .add_production(Production::Terminal(Terminal::literal("*")));
    g.nonterminal_mut(lp)
        .add_production(Production::Terminal(Terminal::literal("(")));
    g.nonterminal_mut(rp)
        .add_production(Production::Terminal(Terminal::literal(")")));
    g.set_start(e);

    let pattern = approximate_to_pattern(&mut g).unwrap();
    let re = anchored(&pattern);
    for sample in ["42", "(0+1)", "((((1*12)*3)*123)"] {
        assert!(re.is_match(sample), "expected match: {:?}", sample);
    }
    for sample in ["((((1*12)*3)*123)4", "()"] {
        assert!(!re.is_match(sample), "expected reject: {:?}", sample);
    }
}

#[test]
fn s5_replace_with_known_pair() {
    let re = matcher_for("A -> F | replace[f,x](F)\nF -> fF | f\n");
    // the tainted branch produces x-runs, the untainted branch f-runs
    for sample in ["x", "xx", "xxx", "f", "ff", "fff"] {
        assert!(re.is_match(sample), "expected match: {:?}", sample);
    }
    for sample in ["", "fx", "xf"] {
        assert!(!re.is_match(sample), "expected reject: {:?}", sample);
    }
}

#[test]
fn s6_charset_sanity() {
    let letters = CharSet::from_chars('a'..='z');
    let digits = CharSet::from_chars('0'..='9');
    assert_eq!(letters.union(&digits).intersect(&digits), digits);
    assert_eq!(letters.intersect(&digits), CharSet::empty());
    let mut dotted = CharSet::sigma();
    dotted.remove('q');
    assert_ne!(dotted, CharSet::sigma());
}

#[test]
fn case_mapping_end_to_end() {
    let re = matcher_for("A -> toUpperCase(F)\nF -> fF | f\n");
    for sample in ["F", "FF", "FFF"] {
        assert!(re.is_match(sample), "expected match: {:?}", sample);
    }
    assert!(!re.is_match("f"));
}

#[test]
fn reverse_end_to_end() {
    // ab reversed is ba
    let re = matcher_for("A -> reverse(B)\nB -> CD\nC -> a\nD -> b\n");
    assert!(re.is_match("ba"));
    assert!(!re.is_match("ab"));
}

#[test]
fn sanitisation_query_stays_clean() {
    // A quoting hotspot: the user-controlled part F is sanitised with
    // replace[',_] before being embedded between quotes. No produced
    // string may contain a quote inside the quoted region.
    let re = matcher_for(concat!(
        "Q -> LR\n",
        "L -> 'S\n",
        "S -> replace[',_](F)\n",
        "R -> '\n",
        "F -> aF | 'F | a | '\n",
    ));
    for sample in ["'a'", "'aa'", "'_a'", "'a_a'"] {
        assert!(re.is_match(sample), "expected match: {:?}", sample);
    }
    for sample in ["'a'a'", "'''"] {
        assert!(!re.is_match(sample), "expected reject: {:?}", sample);
    }
}

#[test]
fn hotspot_ids_reach_regular_approximation() {
    // Passing the hotspot set through the public entry point must not
    // fail even when it names inner nonterminals.
    let mut grammar = parse_grammar("S -> TS | a\nT -> SP\nP -> +\n").unwrap();
    let inner: BTreeSet<_> = grammar.ids().collect();
    let nfa = approximate(&mut grammar, &inner).unwrap();
    assert!(nfa.num_states() > 0);
}

#[test]
fn replace_with_unknown_side_widens() {
    // replace(F, 'f', N) where the replacement string comes from another
    // expression: the engine cannot know it, so the tainted branch widens
    // to Σ* rather than excluding anything it should not.
    use strapprox_rs::ops::Operation;

    let mut g = Grammar::new();
    let a = g.create_new();
    let f = g.create_new();
    let n = g.create_new();
    g.nonterminal_mut(a).add_production(Production::BinaryOp(
        Operation::ReplaceOldKnown { old: 'f' },
        f,
        n,
    ));
    g.nonterminal_mut(f)
        .add_production(Production::Terminal(Terminal::literal("f")));
    g.nonterminal_mut(n)
        .add_production(Production::Terminal(Terminal::literal("n")));
    g.set_start(a);

    let pattern = approximate_to_pattern(&mut g).unwrap();
    let re = anchored(&pattern);
    for sample in ["", "f", "n", "zzz"] {
        assert!(re.is_match(sample), "expected match: {:?}", sample);
    }
}

#[test]
fn determinized_pattern_agrees_on_samples() {
    let mut grammar = parse_grammar("A -> a | B\nB -> Ab\n").unwrap();
    let nfa = approximate(&mut grammar, &BTreeSet::new()).unwrap();
    let dfa = strapprox_rs::determinize::determinize(&nfa);
    let pattern = strapprox_rs::pattern::from_dfa(&dfa);
    let re = anchored(&pattern);
    for sample in ["a", "ab", "abb"] {
        assert!(re.is_match(sample), "expected match: {:?}", sample);
    }
    for sample in ["", "b"] {
        assert!(!re.is_match(sample), "expected reject: {:?}", sample);
    }
}
