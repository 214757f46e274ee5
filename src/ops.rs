//! The string-operation catalogue.
//!
//! Each operation carries a priority (how eagerly a cyclic occurrence is
//! eliminated during the charset approximation), a total character-set
//! transformer, and an automaton transformer replayed over the tainted
//! sub-automaton after construction.
//!
//! The replace family covers the four knowledge combinations of its two
//! arguments. Only the known characters are payload here; an unknown side
//! is fed by the aux operand of a
//! [`BinaryOp`][crate::grammar::Production::BinaryOp] production.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::debug;

use crate::charset::CharSet;
use crate::nfa::{Label, Nfa};
use crate::pattern::{escape_class_char, escape_regex_char};
use crate::types::{StateId, TaintId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Reverse,
    Trim,
    ToUpperCase,
    ToLowerCase,
    ReplaceBothKnown { old: char, new: char },
    ReplaceOldKnown { old: char },
    ReplaceNewKnown { new: char },
    ReplaceNoneKnown,
}

impl Operation {
    /// How eagerly a cyclic occurrence of this operation is eliminated:
    /// higher priority is eliminated first.
    pub fn priority(&self) -> u8 {
        match self {
            Operation::Reverse | Operation::Trim => 1,
            Operation::ToUpperCase | Operation::ToLowerCase => 2,
            Operation::ReplaceBothKnown { .. } => 4,
            Operation::ReplaceOldKnown { .. } => 3,
            Operation::ReplaceNewKnown { .. } => 2,
            Operation::ReplaceNoneKnown => 5,
        }
    }

    /// Upper bound on the characters the operation result can contain,
    /// given bounds for its operands. `aux` is the character set of the
    /// second operand of a binary occurrence, if any.
    pub fn charset_transform(&self, subject: &CharSet, aux: Option<&CharSet>) -> CharSet {
        let _ = aux;
        match self {
            Operation::Reverse | Operation::Trim => subject.clone(),
            Operation::ToLowerCase => match subject {
                CharSet::Finite(set) => {
                    CharSet::Finite(set.iter().flat_map(|c| c.to_lowercase()).collect())
                }
                CharSet::Complement(removed) => {
                    let mut removed: BTreeSet<char> = removed.clone();
                    removed.extend('A'..='Z');
                    CharSet::Complement(removed)
                }
            },
            Operation::ToUpperCase => match subject {
                CharSet::Finite(set) => {
                    CharSet::Finite(set.iter().flat_map(|c| c.to_uppercase()).collect())
                }
                CharSet::Complement(removed) => {
                    let mut removed: BTreeSet<char> = removed.clone();
                    removed.extend('a'..='z');
                    CharSet::Complement(removed)
                }
            },
            Operation::ReplaceBothKnown { old, new } => {
                if subject.contains(*old) {
                    let mut cs = subject.clone();
                    cs.remove(*old);
                    cs.add(*new);
                    cs
                } else {
                    subject.clone()
                }
            }
            Operation::ReplaceOldKnown { old } => {
                if subject.contains(*old) {
                    CharSet::sigma()
                } else {
                    subject.clone()
                }
            }
            Operation::ReplaceNewKnown { new } => {
                let mut cs = subject.clone();
                cs.add(*new);
                cs
            }
            Operation::ReplaceNoneKnown => CharSet::sigma(),
        }
    }

    /// Rewrites the tainted sub-automaton in place. `states` is the set of
    /// states carrying `taint`, in id order.
    pub fn automaton_transform(&self, nfa: &mut Nfa, states: &[StateId], taint: TaintId) {
        match self {
            Operation::Reverse => reverse_region(nfa, states, taint),
            // The precise edge rewriting for trim is still open
            // (leading/trailing whitespace transitions would have to be
            // split off); leaving the edges untouched widens.
            Operation::Trim => {}
            Operation::ToLowerCase => {
                map_tainted_literals(nfa, states, taint, |v| v.to_lowercase())
            }
            Operation::ToUpperCase => {
                map_tainted_literals(nfa, states, taint, |v| v.to_uppercase())
            }
            Operation::ReplaceBothKnown { old, new } => {
                let (old, new) = (*old, *new);
                for &s in states {
                    for edge in nfa.edges_mut(s) {
                        if !edge.taints.contains(&taint) {
                            continue;
                        }
                        match &mut edge.label {
                            Label::Literal(v) => {
                                *v = v.replace(old, &new.to_string());
                            }
                            Label::Pattern(p) => {
                                *p = rewrite_fragment(p, old, new);
                            }
                            Label::Epsilon => {}
                        }
                    }
                }
            }
            Operation::ReplaceOldKnown { .. }
            | Operation::ReplaceNewKnown { .. }
            | Operation::ReplaceNoneKnown => {
                // One side of the replacement is only known as a node
                // reference; widen the tainted edges to Σ*.
                for &s in states {
                    for edge in nfa.edges_mut(s) {
                        if edge.taints.contains(&taint) && !edge.label.is_epsilon() {
                            edge.label = Label::Pattern(CharSet::sigma().to_regex_pattern());
                        }
                    }
                }
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Reverse => write!(f, "reverse"),
            Operation::Trim => write!(f, "trim"),
            Operation::ToUpperCase => write!(f, "toUpperCase"),
            Operation::ToLowerCase => write!(f, "toLowerCase"),
            Operation::ReplaceBothKnown { old, new } => write!(f, "replace[{},{}]", old, new),
            Operation::ReplaceOldKnown { old } => write!(f, "replace[{},?]", old),
            Operation::ReplaceNewKnown { new } => write!(f, "replace[?,{}]", new),
            Operation::ReplaceNoneKnown => write!(f, "replace[?,?]"),
        }
    }
}

fn map_tainted_literals(
    nfa: &mut Nfa,
    states: &[StateId],
    taint: TaintId,
    map: impl Fn(&str) -> String,
) {
    for &s in states {
        for edge in nfa.edges_mut(s) {
            if !edge.taints.contains(&taint) {
                continue;
            }
            if let Label::Literal(v) = &mut edge.label {
                *v = map(v);
            }
        }
    }
}

/// Reverses the tainted region in place.
///
/// The region's internal edges are exactly those carrying `taint`. Entry
/// ports are the sources of the tainted edge subgraph (tainted out-edges but
/// no tainted in-edges), exit ports its sinks. The region is cloned with
/// every edge flipped, the clone is spliced between the ports with ε-edges
/// (entry to reversed start, reversed end to exit), the forward internal
/// edges are dropped, and states left unreachable are pruned.
fn reverse_region(nfa: &mut Nfa, states: &[StateId], taint: TaintId) {
    let in_region: BTreeSet<StateId> = states.iter().copied().collect();

    // (source, edge index) pairs of the internal edges.
    let mut internal: Vec<(StateId, usize)> = Vec::new();
    let mut tainted_in: BTreeSet<StateId> = BTreeSet::new();
    let mut tainted_out: BTreeSet<StateId> = BTreeSet::new();
    for &s in states {
        for (i, edge) in nfa.state(s).edges().iter().enumerate() {
            if edge.taints.contains(&taint) && in_region.contains(&edge.target) {
                internal.push((s, i));
                tainted_out.insert(s);
                tainted_in.insert(edge.target);
            }
        }
    }
    if internal.is_empty() {
        return;
    }

    let entries: Vec<StateId> = states
        .iter()
        .copied()
        .filter(|s| tainted_out.contains(s) && !tainted_in.contains(s))
        .collect();
    let exits: Vec<StateId> = states
        .iter()
        .copied()
        .filter(|s| tainted_in.contains(s) && !tainted_out.contains(s))
        .collect();
    if entries.is_empty() || exits.is_empty() {
        // A purely cyclic region has no identifiable ports; leaving it
        // unchanged widens.
        debug!("reverse {}: no ports found, skipping", taint);
        return;
    }

    // Clone every region state; clones inherit the state taints so outer
    // operations still see them.
    let mut clone_of: BTreeMap<StateId, StateId> = BTreeMap::new();
    for &s in states {
        let c = nfa.add_state();
        let chain = nfa.state(s).taints().to_vec();
        nfa.mark_taints(c, &chain);
        clone_of.insert(s, c);
    }

    // Flipped internal edges between clones.
    for &(src, i) in &internal {
        let edge = nfa.state(src).edges()[i].clone();
        nfa.add_edge(clone_of[&edge.target], edge.label, clone_of[&src], edge.taints);
    }

    // Drop the forward internal edges.
    for &s in states {
        let keep: Vec<bool> = nfa
            .state(s)
            .edges()
            .iter()
            .map(|e| !(e.taints.contains(&taint) && in_region.contains(&e.target)))
            .collect();
        let edges = nfa.edges_mut(s);
        let mut i = 0;
        edges.retain(|_| {
            let k = keep[i];
            i += 1;
            k
        });
    }

    // Splice: a forward path entry→…→exit reading w becomes the clone path
    // clone(exit)→…→clone(entry) reading reverse(w).
    let bridge_taints: Vec<TaintId> = nfa.state(entries[0]).taints().to_vec();
    for &en in &entries {
        for &ex in &exits {
            nfa.add_edge(en, Label::Epsilon, clone_of[&ex], bridge_taints.clone());
            nfa.add_edge(clone_of[&en], Label::Epsilon, ex, bridge_taints.clone());
        }
    }

    nfa.remove_unreachable();
}

/// Conservative rewrite of a regex fragment so that `old` can no longer be
/// produced and `new` is produced in its place.
///
/// Plain characters, escaped characters, `\d`, positive and negative
/// character classes, and the wildcard are handled; ranges inside classes
/// are left untouched, which keeps the result an over-approximation.
pub(crate) fn rewrite_fragment(fragment: &str, old: char, new: char) -> String {
    let chars: Vec<char> = fragment.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                let esc = chars[i + 1];
                if esc == 'd' && old.is_ascii_digit() {
                    // \d with the old character a digit: spell the class out
                    // without it and offer the replacement instead.
                    let mut class = String::from("[");
                    for d in '0'..='9' {
                        if d != old {
                            class.push(d);
                        }
                    }
                    class.push(']');
                    out.push_str(&format!("({}|{})", class, escape_regex_char(new)));
                } else if esc == old {
                    out.push_str(&escape_regex_char(new));
                } else {
                    out.push('\\');
                    out.push(esc);
                }
                i += 2;
            }
            '[' => {
                let (class, next) = scan_class(&chars, i);
                out.push_str(&rewrite_class(&class, old, new));
                i = next;
            }
            '.' => {
                out.push_str(&format!(
                    "([^{}]|{})",
                    escape_class_char(old),
                    escape_regex_char(new)
                ));
                i += 1;
            }
            c if c == old => {
                out.push_str(&escape_regex_char(new));
                i += 1;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

// Scans a bracketed class starting at `start` (which holds '['); returns
// the members between the brackets and the index just past ']'.
fn scan_class(chars: &[char], start: usize) -> (Vec<char>, usize) {
    let mut members = Vec::new();
    let mut i = start + 1;
    while i < chars.len() && chars[i] != ']' {
        if chars[i] == '\\' && i + 1 < chars.len() {
            members.push(chars[i]);
            members.push(chars[i + 1]);
            i += 2;
        } else {
            members.push(chars[i]);
            i += 1;
        }
    }
    (members, (i + 1).min(chars.len()))
}

fn rewrite_class(members: &[char], old: char, new: char) -> String {
    let negated = members.first() == Some(&'^');
    let body = if negated { &members[1..] } else { members };

    if negated {
        if body.contains(&old) {
            // old is already excluded; nothing can produce it.
            let mut out = String::from("[^");
            out.extend(body.iter());
            out.push(']');
            return out;
        }
        // Exclude old as well, and allow the replacement instead.
        let mut class = String::from("[^");
        class.extend(body.iter());
        class.push_str(&escape_class_char(old));
        class.push(']');
        format!("({}|{})", class, escape_regex_char(new))
    } else {
        let mut out = String::from("[");
        let mut i = 0;
        while i < body.len() {
            // Ranges pass through unchanged.
            if i + 2 < body.len() && body[i + 1] == '-' {
                out.push(body[i]);
                out.push('-');
                out.push(body[i + 2]);
                i += 3;
            } else if body[i] == old {
                out.push_str(&escape_class_char(new));
                i += 1;
            } else {
                out.push(body[i]);
                i += 1;
            }
        }
        out.push(']');
        out
    }
}
