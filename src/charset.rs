//! Character sets over the full alphabet Σ.
//!
//! A [`CharSet`] is either a finite set of characters or a Σ-complement
//! `Σ ∖ R` for a finite removed set `R`. The two representations are never
//! normalised into each other: equality is by representation, so `Σ ∖ ∅`
//! and a finite set holding every character are distinct values.
//!
//! Union and intersection follow the set-algebraic laws:
//!
//! ```text
//! finite ∪ finite   = finite
//! finite ∪ (Σ∖R)    = Σ ∖ (R ∖ finite)
//! (Σ∖R1) ∪ (Σ∖R2)   = Σ ∖ (R1 ∩ R2)
//!
//! finite ∩ finite   = finite
//! finite ∩ (Σ∖R)    = finite ∖ R
//! (Σ∖R1) ∩ (Σ∖R2)   = Σ ∖ (R1 ∪ R2)
//! ```

use std::collections::BTreeSet;
use std::fmt;

use crate::pattern::{escape_class_char, escape_regex_char};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharSet {
    /// A finite set of characters.
    Finite(BTreeSet<char>),
    /// Σ without the given finite set of characters.
    Complement(BTreeSet<char>),
}

impl CharSet {
    /// The empty set ∅.
    pub fn empty() -> Self {
        CharSet::Finite(BTreeSet::new())
    }

    /// The full alphabet Σ.
    pub fn sigma() -> Self {
        CharSet::Complement(BTreeSet::new())
    }

    /// The singleton set {c}.
    pub fn singleton(c: char) -> Self {
        CharSet::Finite(BTreeSet::from([c]))
    }

    /// A finite set built from the given characters.
    pub fn from_chars(chars: impl IntoIterator<Item = char>) -> Self {
        CharSet::Finite(chars.into_iter().collect())
    }

    pub fn contains(&self, c: char) -> bool {
        match self {
            CharSet::Finite(set) => set.contains(&c),
            CharSet::Complement(removed) => !removed.contains(&c),
        }
    }

    /// An empty finite set. `Σ ∖ ∅` is not considered empty even when the
    /// removed set is exhaustive; representations are not normalised.
    pub fn is_empty(&self) -> bool {
        matches!(self, CharSet::Finite(set) if set.is_empty())
    }

    pub fn union(&self, other: &CharSet) -> CharSet {
        match (self, other) {
            (CharSet::Finite(a), CharSet::Finite(b)) => {
                CharSet::Finite(a.union(b).copied().collect())
            }
            (CharSet::Finite(a), CharSet::Complement(r))
            | (CharSet::Complement(r), CharSet::Finite(a)) => {
                CharSet::Complement(r.difference(a).copied().collect())
            }
            (CharSet::Complement(r1), CharSet::Complement(r2)) => {
                CharSet::Complement(r1.intersection(r2).copied().collect())
            }
        }
    }

    pub fn intersect(&self, other: &CharSet) -> CharSet {
        match (self, other) {
            (CharSet::Finite(a), CharSet::Finite(b)) => {
                CharSet::Finite(a.intersection(b).copied().collect())
            }
            (CharSet::Finite(a), CharSet::Complement(r))
            | (CharSet::Complement(r), CharSet::Finite(a)) => {
                CharSet::Finite(a.difference(r).copied().collect())
            }
            (CharSet::Complement(r1), CharSet::Complement(r2)) => {
                CharSet::Complement(r1.union(r2).copied().collect())
            }
        }
    }

    /// Adds `c`: a finite set grows, a Σ-complement un-removes `c`.
    pub fn add(&mut self, c: char) {
        match self {
            CharSet::Finite(set) => {
                set.insert(c);
            }
            CharSet::Complement(removed) => {
                removed.remove(&c);
            }
        }
    }

    /// Removes `c`: a finite set shrinks, a Σ-complement removes `c`.
    pub fn remove(&mut self, c: char) {
        match self {
            CharSet::Finite(set) => {
                set.remove(&c);
            }
            CharSet::Complement(removed) => {
                removed.insert(c);
            }
        }
    }

    /// Emits a character-class regex fragment matching any string over this
    /// set.
    ///
    /// - `Σ ∖ R` becomes `[^r1r2…]*` (`[\s\S]*` when `R` is empty, since a
    ///   bare empty negated class is not portable);
    /// - a finite set becomes `(\d|c1|c2|…)*`, with the `\d` shorthand
    ///   collapsing the digits when all of `0..9` are members;
    /// - the empty finite set derives only the empty string and emits `ε`.
    pub fn to_regex_pattern(&self) -> String {
        match self {
            CharSet::Complement(removed) => {
                if removed.is_empty() {
                    "[\\s\\S]*".to_string()
                } else {
                    let mut out = String::from("[^");
                    for &c in removed {
                        out.push_str(&escape_class_char(c));
                    }
                    out.push_str("]*");
                    out
                }
            }
            CharSet::Finite(set) => {
                if set.is_empty() {
                    return "ε".to_string();
                }
                let digits_covered = ('0'..='9').all(|d| set.contains(&d));
                let mut parts: Vec<String> = Vec::new();
                if digits_covered {
                    parts.push("\\d".to_string());
                }
                for &c in set {
                    if digits_covered && c.is_ascii_digit() {
                        continue;
                    }
                    parts.push(escape_regex_char(c));
                }
                format!("({})*", parts.join("|"))
            }
        }
    }
}

impl fmt::Display for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharSet::Finite(set) => {
                write!(f, "{{")?;
                for (i, c) in set.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", c)?;
                }
                write!(f, "}}")
            }
            CharSet::Complement(removed) => {
                write!(f, "Σ∖{{")?;
                for (i, c) in removed.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", c)?;
                }
                write!(f, "}}")
            }
        }
    }
}
