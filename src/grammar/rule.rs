//! The rule graph and its parse contract.
//!
//! A [Rule] is a cheap, shareable handle to an immutable node. Nodes are one
//! of the closed set of [RuleKind]s and refer to their children through
//! further handles, so one rule may appear in many places of a grammar.
//! Recursion is expressed through placeholders, which are bound by
//! [resolve](crate::grammar::resolve). A bound placeholder owns its target,
//! so a recursive grammar is a reference cycle that stays usable through any
//! of its rules until [Grammar::release](crate::grammar::Grammar::release)
//! breaks it.

use crate::grammar::parsing_error::{ParseError, ParseFailure};
use crate::stream::Cursor;
use log::warn;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

// =#========================================================================#=
// RULE KIND
// =#========================================================================#=
/// The kinds of rules a grammar is built from.
pub enum RuleKind {
    /// Matches exactly the given bytes.
    Literal(Vec<u8>),
    /// Matches all children one after another.
    Sequence(Vec<Rule>),
    /// Matches the first child that succeeds, trying them in order.
    Choice(Vec<Rule>),
    /// Matches `child` at least `min` and at most `max` times.
    ///
    /// The first `min` matches are required; the rest are taken greedily
    /// and never cause a failure.
    Repeat {
        child: Rule,
        min: usize,
        max: Option<usize>,
    },
    /// Forward reference to the rule carrying this placeholder's name.
    Placeholder(PlaceholderSlot),
}

/// Binding of a placeholder, set by resolution and cleared only on release.
#[derive(Default)]
pub struct PlaceholderSlot {
    target: RwLock<Option<Rule>>,
}

impl PlaceholderSlot {
    fn target(&self) -> Option<Rule> {
        self.target
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn bind(&self, target: &Rule) -> bool {
        let mut slot = self.target.write().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return false;
        }
        *slot = Some(target.clone());
        true
    }

    fn unbind(&self) -> bool {
        self.target
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }
}

// =#========================================================================#=
// RULE
// =#========================================================================#=
struct RuleNode {
    name: RwLock<String>,
    kind: RuleKind,
}

/// Shared handle to a node of a rule graph.
///
/// Cloning the handle does not copy the rule. Rules are read-only during
/// parsing and may be used by many parses at once, from several threads.
#[derive(Clone)]
pub struct Rule(Arc<RuleNode>);

impl Rule {
    /// Creates a rule. Validation of children happens in the
    /// [builders](crate::grammar::builders).
    pub(crate) fn new(name: impl Into<String>, kind: RuleKind) -> Rule {
        Rule(Arc::new(RuleNode {
            name: RwLock::new(name.into()),
            kind,
        }))
    }

    /// Returns the kind of this rule.
    pub fn kind(&self) -> &RuleKind {
        &self.0.kind
    }

    /// Returns the diagnostic name of this rule.
    ///
    /// A bound placeholder reports the name of its target.
    pub fn name(&self) -> String {
        if let Some(target) = self.bound_target() {
            return target.name();
        }
        self.0
            .name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Changes the diagnostic name of this rule, returning the same handle.
    ///
    /// Placeholder resolution looks rules up by their name at resolution time.
    /// Renaming a bound placeholder renames its target; renaming an unbound
    /// one changes the name it will be resolved against.
    ///
    /// # Example
    /// ```
    /// use forkparse::grammar::{literal, sequence};
    ///
    /// let greeting = sequence([literal("hi"), literal("!")]).unwrap().rename("Greeting");
    /// assert_eq!(greeting.name(), "Greeting");
    /// ```
    pub fn rename(&self, name: impl Into<String>) -> Rule {
        match self.bound_target() {
            Some(target) => {
                target.rename(name);
            }
            None => {
                *self.0.name.write().unwrap_or_else(PoisonError::into_inner) = name.into();
            }
        }
        self.clone()
    }

    /// Returns the direct children of this rule.
    ///
    /// A bound placeholder reports the children of its target; an unbound one
    /// has none.
    pub fn child_rules(&self) -> Vec<Rule> {
        match &self.0.kind {
            RuleKind::Literal(_) => Vec::new(),
            RuleKind::Sequence(children) | RuleKind::Choice(children) => children.clone(),
            RuleKind::Repeat { child, .. } => vec![child.clone()],
            RuleKind::Placeholder(slot) => slot
                .target()
                .map(|target| target.child_rules())
                .unwrap_or_default(),
        }
    }

    /// Returns `true` if this rule is a placeholder (bound or not).
    pub fn is_placeholder(&self) -> bool {
        matches!(self.0.kind, RuleKind::Placeholder(_))
    }

    /// Returns `true` if this rule is a placeholder bound to a target.
    pub fn is_bound(&self) -> bool {
        self.bound_target().is_some()
    }

    /// Returns `true` if both handles refer to the same node.
    pub fn ptr_eq(&self, other: &Rule) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Identity of the node, stable while any handle is alive.
    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Binds an unbound placeholder to `target`.
    ///
    /// # Returns
    /// `true` if the binding was made, `false` if this is not a placeholder
    /// or it was bound already.
    pub(crate) fn bind(&self, target: &Rule) -> bool {
        match &self.0.kind {
            RuleKind::Placeholder(slot) => slot.bind(target),
            _ => false,
        }
    }

    /// Clears the binding of a placeholder.
    ///
    /// # Returns
    /// `true` if a binding was removed.
    pub(crate) fn unbind(&self) -> bool {
        match &self.0.kind {
            RuleKind::Placeholder(slot) => slot.unbind(),
            _ => false,
        }
    }

    /// Name this placeholder is resolved against (its own name, ignoring any binding).
    pub(crate) fn own_name(&self) -> String {
        self.0
            .name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn bound_target(&self) -> Option<Rule> {
        match &self.0.kind {
            RuleKind::Placeholder(slot) => slot.target(),
            _ => None,
        }
    }

    // =#====================================================================#=
    // PARSING
    // =#====================================================================#=
    /// Parses this rule at the cursor's position.
    ///
    /// On success the cursor is positioned just past the match. On failure
    /// the cursor's position is unspecified; callers that need to retry
    /// parse on a [branch](Cursor::branch).
    ///
    /// # Arguments
    /// * `cursor` - Where to start matching
    ///
    /// # Errors
    /// * [ParseFailure::Mismatch] - The input does not match; carries the
    ///   deepest diagnostic found
    /// * [ParseFailure::Source] - The byte source failed
    /// * [ParseFailure::UnresolvedPlaceholder] - A placeholder was reached
    ///   that was never bound, or whose grammar was released
    pub fn parse(&self, cursor: &mut Cursor) -> Result<(), ParseFailure> {
        match &self.0.kind {
            RuleKind::Literal(expected) => self.parse_literal(expected, cursor),
            RuleKind::Sequence(children) => self.parse_sequence(children, cursor),
            RuleKind::Choice(children) => self.parse_choice(children, cursor),
            RuleKind::Repeat { child, min, max } => self.parse_repeat(child, *min, *max, cursor),
            RuleKind::Placeholder(slot) => match slot.target() {
                Some(target) => target.parse(cursor),
                None => Err(ParseFailure::UnresolvedPlaceholder {
                    name: self.own_name(),
                }),
            },
        }
    }

    fn parse_literal(&self, expected: &[u8], cursor: &mut Cursor) -> Result<(), ParseFailure> {
        let mut matched = 0;

        // A short chunk is either end of data or bytes that arrived before a
        // source failure; compare them before asking the source again.
        while matched < expected.len() {
            let chunk = cursor.read(expected.len() - matched)?;
            let found = chunk.bytes();
            let wanted = &expected[matched..];

            if let Some(i) = wanted.iter().zip(found).position(|(e, f)| e != f) {
                let message = format!(
                    "expected '{}' found '{}'",
                    display_byte(wanted[i]),
                    display_byte(found[i])
                );
                return Err(ParseError::new(chunk.start() + i, self.name(), message).into());
            }

            matched += found.len();
            if matched < expected.len() && (chunk.is_eof() || found.is_empty()) {
                return Err(ParseError::new(chunk.start() + found.len(), self.name(), "EOF").into());
            }
        }

        Ok(())
    }

    fn parse_sequence(&self, children: &[Rule], cursor: &mut Cursor) -> Result<(), ParseFailure> {
        for child in children {
            child.parse(cursor).map_err(|e| e.within(self.name()))?;
        }
        Ok(())
    }

    fn parse_choice(&self, children: &[Rule], cursor: &mut Cursor) -> Result<(), ParseFailure> {
        let mut deepest: Option<ParseError> = None;

        for child in children {
            let mut branch = cursor.branch()?;
            match child.parse(&mut branch) {
                Ok(()) => {
                    cursor.commit(branch)?;
                    return Ok(());
                }
                // Strictly greater: on ties the earlier alternative wins
                Err(ParseFailure::Mismatch(err)) => {
                    if deepest.as_ref().is_none_or(|d| err.offset() > d.offset()) {
                        deepest = Some(err);
                    }
                }
                Err(other) => return Err(other),
            }
        }

        let err = match deepest {
            Some(err) => err.within(self.name()),
            None => ParseError::new(cursor.offset()?, self.name(), "no alternatives"),
        };
        Err(err.into())
    }

    fn parse_repeat(
        &self,
        child: &Rule,
        min: usize,
        max: Option<usize>,
        cursor: &mut Cursor,
    ) -> Result<(), ParseFailure> {
        // Required matches, in place
        for _ in 0..min {
            child.parse(cursor).map_err(|e| e.within(self.name()))?;
        }

        // Optional matches, each on a branch that is committed on success
        let extra = max.map(|max| max.saturating_sub(min));
        let mut count = 0;
        while extra.is_none_or(|extra| count < extra) {
            let before = cursor.offset()?;
            let mut branch = cursor.branch()?;
            match child.parse(&mut branch) {
                Ok(()) => {
                    let progressed = branch.offset()? > before;
                    cursor.commit(branch)?;
                    count += 1;
                    // Bounded repetitions run out on their own
                    if !progressed && extra.is_none() {
                        warn!(
                            "rule {} stopped repeating: {} matched without consuming input",
                            self.name(),
                            child.name()
                        );
                        break;
                    }
                }
                Err(ParseFailure::Mismatch(_)) => break,
                Err(other) => return Err(other),
            }
        }

        Ok(())
    }
}

/// Renders a byte for diagnostics: printable ASCII as is, anything else escaped.
pub(crate) fn display_byte(byte: u8) -> String {
    if byte.is_ascii_graphic() || byte == b' ' {
        char::from(byte).to_string()
    } else {
        byte.escape_ascii().to_string()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Children are left out; the graph may be cyclic
        let kind = match &self.0.kind {
            RuleKind::Literal(_) => "Literal",
            RuleKind::Sequence(_) => "Sequence",
            RuleKind::Choice(_) => "Choice",
            RuleKind::Repeat { .. } => "Repeat",
            RuleKind::Placeholder(_) => "Placeholder",
        };
        f.debug_struct("Rule")
            .field("name", &self.name())
            .field("kind", &kind)
            .finish()
    }
}
