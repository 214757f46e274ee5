//! Terminal symbols.
//!
//! A terminal carries the fragment of the final pattern it contributes:
//! literals match exactly their value, the epsilon terminal matches the
//! empty string, and non-literal terminals hold a regex fragment derived
//! from a source-language type or from a character set. Every terminal also
//! carries the character set bounding the characters it can produce, which
//! feeds the charset approximation.

use std::fmt;

use crate::charset::CharSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terminal {
    value: String,
    literal: bool,
    epsilon: bool,
    charset: CharSet,
}

impl Terminal {
    /// A literal terminal matching exactly `value`.
    pub fn literal(value: impl Into<String>) -> Self {
        let value = value.into();
        let charset = CharSet::from_chars(value.chars());
        Terminal {
            value,
            literal: true,
            epsilon: false,
            charset,
        }
    }

    /// The epsilon terminal, matching the empty string.
    pub fn epsilon() -> Self {
        Terminal {
            value: String::new(),
            literal: false,
            epsilon: true,
            charset: CharSet::empty(),
        }
    }

    /// A non-literal terminal holding a regex fragment for a value of the
    /// given source-language type. Unknown types widen to Σ.
    pub fn from_type(type_name: &str) -> Self {
        let (value, charset) = match type_name {
            "int" | "long" | "short" | "byte" => (
                "0|(-?[1-9][0-9]*)".to_string(),
                CharSet::from_chars(('0'..='9').chain(['-'])),
            ),
            "boolean" => (
                "true|false".to_string(),
                CharSet::from_chars("truefals".chars()),
            ),
            _ => (CharSet::sigma().to_regex_pattern(), CharSet::sigma()),
        };
        Terminal {
            value,
            literal: false,
            epsilon: false,
            charset,
        }
    }

    /// A non-literal terminal matching any string over the given character
    /// set. The empty set degenerates to the epsilon terminal.
    pub fn from_charset(charset: &CharSet) -> Self {
        if charset.is_empty() {
            return Terminal::epsilon();
        }
        Terminal {
            value: charset.to_regex_pattern(),
            literal: false,
            epsilon: false,
            charset: charset.clone(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_literal(&self) -> bool {
        self.literal
    }

    pub fn is_epsilon(&self) -> bool {
        self.epsilon
    }

    pub fn charset(&self) -> &CharSet {
        &self.charset
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epsilon {
            write!(f, "ε")
        } else {
            write!(f, "{}", self.value)
        }
    }
}
