//! Error codes surfaced by the engine.
//!
//! Only conditions that make further processing meaningless are fatal; every
//! other irregularity is handled by widening, i.e. the result silently
//! becomes a coarser over-approximation.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The grammar has no designated start nonterminal.
    ///
    /// The automaton construction needs a start symbol to anchor the
    /// initial and accepting states.
    #[error("grammar has no start nonterminal")]
    MissingStart,

    /// The grammar text parser rejected a malformed rule.
    #[error("invalid production: {line:?}")]
    InvalidProduction { line: String },

    /// The grammar text parser encountered an operation name outside the
    /// supported catalogue.
    #[error("unknown operation: {name:?}")]
    UnknownOperation { name: String },

    /// `replace[..]` received something other than two single-character
    /// arguments.
    #[error("replace expects two single-character arguments, got [{args}]")]
    InvalidReplaceArity { args: String },
}

pub type Result<T> = std::result::Result<T, Error>;
