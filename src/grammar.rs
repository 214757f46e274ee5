//! The context-free grammar model.
//!
//! Each nonterminal models one program expression; productions are the
//! data-flow edges between them. The grammar owns its nonterminals in an
//! id-indexed arena and iterates them in id-ascending order, which every
//! fix-point in the engine relies on for reproducibility.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use log::debug;

use crate::ops::Operation;
use crate::terminal::Terminal;
use crate::types::NtId;

/// A single production of a nonterminal.
///
/// Concatenations longer than two symbols must be flattened upstream.
/// Binary operation productions carry `(op, subject, aux)`: the subject is
/// the string being transformed, the aux operand feeds the unknown side of
/// a replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Production {
    Terminal(Terminal),
    Unit(NtId),
    Concat(NtId, NtId),
    UnaryOp(Operation, NtId),
    BinaryOp(Operation, NtId, NtId),
}

impl Production {
    /// All nonterminals mentioned on the right-hand side, in position
    /// order. Operation operands count: the grammar graph must see the
    /// cycle even when only the operation result flows onward.
    pub fn targets(&self) -> Vec<NtId> {
        match self {
            Production::Terminal(_) => Vec::new(),
            Production::Unit(a) => vec![*a],
            Production::Concat(a, b) => vec![*a, *b],
            Production::UnaryOp(_, a) => vec![*a],
            Production::BinaryOp(_, a, b) => vec![*a, *b],
        }
    }

    pub fn operation(&self) -> Option<&Operation> {
        match self {
            Production::UnaryOp(op, _) | Production::BinaryOp(op, _, _) => Some(op),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Nonterminal {
    id: NtId,
    label: Option<String>,
    productions: Vec<Production>,
}

impl Nonterminal {
    pub fn new(id: NtId) -> Self {
        Nonterminal {
            id,
            label: None,
            productions: Vec::new(),
        }
    }

    pub fn id(&self) -> NtId {
        self.id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = Some(label.into());
    }

    /// The label if present, the id otherwise.
    pub fn display_name(&self) -> String {
        match &self.label {
            Some(l) => l.clone(),
            None => format!("{}", self.id),
        }
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    /// Adds a production; exact duplicates are dropped so the production
    /// list behaves as a set.
    pub fn add_production(&mut self, p: Production) {
        if !self.productions.contains(&p) {
            self.productions.push(p);
        }
    }

    pub fn remove_production(&mut self, index: usize) -> Production {
        self.productions.remove(index)
    }

    pub fn take_productions(&mut self) -> Vec<Production> {
        std::mem::take(&mut self.productions)
    }
}

/// A context-free grammar: an id-indexed arena of nonterminals plus a
/// designated start nonterminal.
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    nonterminals: BTreeMap<NtId, Nonterminal>,
    start: Option<NtId>,
    max_id: u32,
}

impl Grammar {
    pub fn new() -> Self {
        Grammar::default()
    }

    pub fn start(&self) -> Option<NtId> {
        self.start
    }

    pub fn set_start(&mut self, id: NtId) {
        self.start = Some(id);
    }

    pub fn len(&self) -> usize {
        self.nonterminals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nonterminals.is_empty()
    }

    /// Ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = NtId> + '_ {
        self.nonterminals.keys().copied()
    }

    pub fn nonterminal(&self, id: NtId) -> &Nonterminal {
        &self.nonterminals[&id]
    }

    pub fn nonterminal_mut(&mut self, id: NtId) -> &mut Nonterminal {
        self.nonterminals.get_mut(&id).expect("unknown nonterminal id")
    }

    /// Adds a nonterminal under its own id, keeping the minting watermark
    /// above every id seen so far.
    pub fn add_nonterminal(&mut self, nt: Nonterminal) {
        self.max_id = self.max_id.max(nt.id.id() + 1);
        self.nonterminals.insert(nt.id, nt);
    }

    /// The nonterminal with the given id, created on first use.
    pub fn get_or_create(&mut self, id: NtId) -> &mut Nonterminal {
        self.max_id = self.max_id.max(id.id() + 1);
        self.nonterminals.entry(id).or_insert_with(|| Nonterminal::new(id))
    }

    /// Mints a nonterminal with a fresh id, strictly greater than any id
    /// previously seen by this grammar.
    pub fn create_new(&mut self) -> NtId {
        let id = NtId::new(self.max_id);
        self.max_id += 1;
        debug!("create_new: minting {}", id);
        self.nonterminals.insert(id, Nonterminal::new(id));
        id
    }

    /// The nonterminal successors of `id`: its productions flattened, with
    /// terminals dropped.
    pub fn successors_of(&self, id: NtId) -> Vec<NtId> {
        let mut out = Vec::new();
        for p in self.nonterminal(id).productions() {
            out.extend(p.targets());
        }
        out
    }

    /// Predecessors of every nonterminal, in one pass over all productions.
    pub fn all_predecessors(&self) -> BTreeMap<NtId, BTreeSet<NtId>> {
        let mut preds: BTreeMap<NtId, BTreeSet<NtId>> = BTreeMap::new();
        for (&id, nt) in &self.nonterminals {
            for p in nt.productions() {
                for target in p.targets() {
                    preds.entry(target).or_default().insert(id);
                }
            }
        }
        preds
    }

    /// Is `nt` a synthetic single-character terminal wrapper, as introduced
    /// by the grammar text parser? If so, returns the character.
    pub fn synthetic_terminal_char(nt: &Nonterminal) -> Option<char> {
        if nt.productions.len() != 1 {
            return None;
        }
        match &nt.productions[0] {
            Production::Terminal(t) if t.is_literal() && t.value().chars().count() == 1 => {
                let c = t.value().chars().next().unwrap();
                match nt.label() {
                    Some(l) if l == format!("T{}", c).as_str() => Some(c),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Prints the grammar in the text-input dialect, one rule per
    /// nonterminal, synthetic terminal wrappers inlined back to their
    /// character.
    pub fn print_grammar(&self) -> String {
        let mut out = String::new();
        let name = |id: NtId| -> String {
            let nt = self.nonterminal(id);
            match Self::synthetic_terminal_char(nt) {
                Some(c) => c.to_string(),
                None => nt.display_name(),
            }
        };
        for (&id, nt) in &self.nonterminals {
            if Self::synthetic_terminal_char(nt).is_some() {
                continue;
            }
            let mut alts = Vec::new();
            for p in nt.productions() {
                let alt = match p {
                    Production::Terminal(t) => format!("{}", t),
                    Production::Unit(a) => name(*a),
                    Production::Concat(a, b) => format!("{}{}", name(*a), name(*b)),
                    Production::UnaryOp(op, a) => format!("{}({})", op, name(*a)),
                    Production::BinaryOp(op, a, b) => {
                        format!("{}({}, {})", op, name(*a), name(*b))
                    }
                };
                alts.push(alt);
            }
            if alts.is_empty() {
                continue;
            }
            let _ = writeln!(out, "{} -> {}", name(id), alts.join(" | "));
        }
        out
    }
}
