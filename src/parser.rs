//! Parser for the ASCII grammar-rule format.
//!
//! ```text
//! A -> symbol_sequence
//! A -> rhs1 | rhs2 | …
//! A -> replace[o,n](B)
//! A -> reverse(B) | trim(B) | toUpperCase(B) | toLowerCase(B)
//! ```
//!
//! An identifier beginning with an uppercase letter denotes a nonterminal;
//! any other character is a terminal. For each distinct terminal `c` a
//! synthetic nonterminal labelled `Tc` is introduced holding a single
//! literal production, so that every rule body mentions nonterminals only.
//! `ε` denotes the epsilon terminal. The first nonterminal mentioned
//! becomes the start nonterminal.

use std::collections::BTreeMap;

use log::debug;

use crate::errors::{Error, Result};
use crate::grammar::{Grammar, Production};
use crate::ops::Operation;
use crate::terminal::Terminal;
use crate::types::NtId;

pub fn parse_grammar(input: &str) -> Result<Grammar> {
    let mut parser = Parser {
        grammar: Grammar::new(),
        named: BTreeMap::new(),
        terminals: BTreeMap::new(),
    };
    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        parser.rule(line)?;
    }
    Ok(parser.grammar)
}

struct Parser {
    grammar: Grammar,
    named: BTreeMap<String, NtId>,
    terminals: BTreeMap<char, NtId>,
}

impl Parser {
    fn rule(&mut self, line: &str) -> Result<()> {
        let (lhs, rhs) = line
            .split_once("->")
            .ok_or_else(|| Error::InvalidProduction { line: line.to_string() })?;
        let lhs = lhs.trim();
        if !is_nonterminal_name(lhs) {
            return Err(Error::InvalidProduction { line: line.to_string() });
        }
        let id = self.named_nonterminal(lhs);
        if self.grammar.start().is_none() {
            self.grammar.set_start(id);
        }
        for alt in split_alternatives(rhs) {
            let alt = alt.trim();
            if alt.is_empty() {
                return Err(Error::InvalidProduction { line: line.to_string() });
            }
            let production = self.alternative(alt, line)?;
            debug!("rule {}: {:?}", lhs, production);
            self.grammar.nonterminal_mut(id).add_production(production);
        }
        Ok(())
    }

    fn alternative(&mut self, alt: &str, line: &str) -> Result<Production> {
        if alt == "ε" {
            return Ok(Production::Terminal(Terminal::epsilon()));
        }
        if looks_like_operation(alt) {
            return self.operation(alt, line);
        }
        let symbols = self.symbols(alt);
        match symbols.len() {
            1 => Ok(Production::Unit(symbols[0])),
            2 => Ok(Production::Concat(symbols[0], symbols[1])),
            _ => Err(Error::InvalidProduction { line: line.to_string() }),
        }
    }

    fn operation(&mut self, alt: &str, line: &str) -> Result<Production> {
        let open = alt.find('(').expect("operation shape checked");
        let head = &alt[..open];
        let args = alt[open + 1..]
            .strip_suffix(')')
            .ok_or_else(|| Error::InvalidProduction { line: line.to_string() })?
            .trim();
        if !is_nonterminal_name(args) {
            return Err(Error::InvalidProduction { line: line.to_string() });
        }
        let target = self.named_nonterminal(args);

        let op = if let Some(bracket) = head.find('[') {
            let name = &head[..bracket];
            if name != "replace" {
                return Err(Error::UnknownOperation { name: name.to_string() });
            }
            let inner = head[bracket + 1..]
                .strip_suffix(']')
                .ok_or_else(|| Error::InvalidProduction { line: line.to_string() })?;
            let parts: Vec<&str> = inner.split(',').collect();
            let chars: Vec<Vec<char>> = parts.iter().map(|p| p.chars().collect()).collect();
            if chars.len() != 2 || chars.iter().any(|c| c.len() != 1) {
                return Err(Error::InvalidReplaceArity { args: inner.to_string() });
            }
            Operation::ReplaceBothKnown {
                old: chars[0][0],
                new: chars[1][0],
            }
        } else {
            match head {
                "reverse" => Operation::Reverse,
                "trim" => Operation::Trim,
                "toUpperCase" => Operation::ToUpperCase,
                "toLowerCase" => Operation::ToLowerCase,
                "replace" => {
                    return Err(Error::InvalidReplaceArity { args: String::new() });
                }
                _ => {
                    return Err(Error::UnknownOperation { name: head.to_string() });
                }
            }
        };
        Ok(Production::UnaryOp(op, target))
    }

    /// Tokenizes a symbol sequence: an uppercase letter with trailing
    /// digits is a nonterminal reference, anything else a terminal.
    fn symbols(&mut self, alt: &str) -> Vec<NtId> {
        let chars: Vec<char> = alt.chars().collect();
        let mut out = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c.is_whitespace() {
                i += 1;
            } else if c.is_ascii_uppercase() {
                let mut name = String::from(c);
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    name.push(chars[i]);
                    i += 1;
                }
                out.push(self.named_nonterminal(&name));
            } else {
                out.push(self.terminal_nonterminal(c));
                i += 1;
            }
        }
        out
    }

    fn named_nonterminal(&mut self, name: &str) -> NtId {
        if let Some(&id) = self.named.get(name) {
            return id;
        }
        let id = self.grammar.create_new();
        self.grammar.nonterminal_mut(id).set_label(name);
        self.named.insert(name.to_string(), id);
        id
    }

    fn terminal_nonterminal(&mut self, c: char) -> NtId {
        if let Some(&id) = self.terminals.get(&c) {
            return id;
        }
        let id = self.grammar.create_new();
        let nt = self.grammar.nonterminal_mut(id);
        nt.set_label(format!("T{}", c));
        nt.add_production(Production::Terminal(Terminal::literal(c.to_string())));
        self.terminals.insert(c, id);
        id
    }
}

fn is_nonterminal_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_digit())
}

/// An alternative looks like an operation call when it has the shape
/// `name(…)` or `name[…](…)` with a lowercase head.
fn looks_like_operation(alt: &str) -> bool {
    let mut chars = alt.chars();
    if !matches!(chars.next(), Some(c) if c.is_ascii_lowercase()) {
        return false;
    }
    let head_len = alt
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_alphabetic())
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let rest = &alt[head_len..];
    (rest.starts_with('(') || rest.starts_with('[')) && rest.ends_with(')')
}

/// Splits on `|` at bracket depth zero, so replace arguments stay intact.
fn split_alternatives(rhs: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in rhs.char_indices() {
        match c {
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.saturating_sub(1),
            '|' if depth == 0 => {
                out.push(&rhs[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&rhs[start..]);
    out
}
