//! Error types for grammar construction, resolution and parsing.
//!
//! This module provides [ParseError], the structured diagnostic of a failed
//! match, and [ParseFailure], the error returned by
//! [Rule::parse](crate::grammar::Rule::parse), which additionally carries the
//! non-recoverable failures that abort a parse.

use crate::stream::StreamError;
use thiserror::Error;

// =#========================================================================#=
// PARSE ERROR
// =#========================================================================€=
/// A match failure with position and the chain of rules that led to it.
///
/// Created by the failing literal and re-wrapped by every enclosing
/// sequence, choice and repetition, each prepending its name to the rule path.
/// Offset and message are never altered on the way up.
///
/// # Example
/// ```
/// use forkparse::grammar::ParseError;
///
/// let err = ParseError::new(4, "'hello'", "expected 'o' found 'g'").within("Sequence");
/// assert_eq!(
///     err.to_string(),
///     "error at offset 4 in rule Sequence>'hello'. expected 'o' found 'g'"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("error at offset {offset} in rule {path}. {message}", path = .rule_path.join(">"))]
pub struct ParseError {
    offset: usize,
    rule_path: Vec<String>,
    message: String,
}

impl ParseError {
    /// Creates an error raised by the rule named `rule`.
    ///
    /// # Arguments
    /// * `offset` - Logical offset where the failure was detected
    /// * `rule` - Name of the failing rule
    /// * `message` - Description of the failure
    pub fn new(offset: usize, rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            offset,
            rule_path: vec![rule.into()],
            message: message.into(),
        }
    }

    /// Prepends an enclosing rule's name to the rule path.
    pub fn within(mut self, rule: impl Into<String>) -> Self {
        self.rule_path.insert(0, rule.into());
        self
    }

    /// Get the offset where the failure was detected
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Get the rule names from outermost to innermost
    pub fn rule_path(&self) -> &[String] {
        &self.rule_path
    }

    /// Get the failure description
    pub fn message(&self) -> &str {
        &self.message
    }
}

// =#========================================================================#=
// PARSE FAILURE
// =#========================================================================€=
/// Error returned by a parse attempt.
///
/// Only [Mismatch](ParseFailure::Mismatch) is recoverable: it drives
/// backtracking in choices and ends greedy repetitions. Every other variant
/// aborts the attempt and passes through all rule layers unchanged.
#[derive(Debug, Error)]
pub enum ParseFailure {
    /// The input did not match the grammar.
    #[error(transparent)]
    Mismatch(#[from] ParseError),

    /// The byte source failed.
    #[error(transparent)]
    Source(#[from] StreamError),

    /// A placeholder was parsed before being bound to a rule.
    #[error("placeholder '{name}' is not resolved")]
    UnresolvedPlaceholder { name: String },
}

impl ParseFailure {
    /// Prepends `rule` to the rule path of a mismatch; other failures pass through.
    pub fn within(self, rule: impl Into<String>) -> Self {
        match self {
            ParseFailure::Mismatch(err) => ParseFailure::Mismatch(err.within(rule)),
            other => other,
        }
    }

    /// Returns the match diagnostic, if this is a mismatch.
    pub fn as_mismatch(&self) -> Option<&ParseError> {
        match self {
            ParseFailure::Mismatch(err) => Some(err),
            _ => None,
        }
    }
}

// =#========================================================================#=
// GRAMMAR ERROR
// =#========================================================================€=
/// A rule that cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("sequence needs at least one rule")]
    EmptySequence,

    #[error("choice needs at least one alternative")]
    EmptyChoice,

    #[error("byte set needs at least one byte")]
    EmptyByteSet,

    #[error("repetition bounds are inverted: min {min} > max {max}")]
    InvalidBounds { min: usize, max: usize },
}

// =#========================================================================#=
// RESOLVE ERROR
// =#========================================================================€=
/// Failure to bind placeholders of a grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No rule carries the names the listed placeholders refer to.
    #[error("couldn't find rule(s) for placeholder(s): {}", .names.join(", "))]
    Unresolved { names: Vec<String> },
}
