//! Constructors for rules.
//!
//! Each function creates a rule with a default diagnostic name, which can be
//! changed with [Rule::rename]. Constructors that can be given malformed input
//! (empty sequences and choices, inverted bounds) return a [GrammarError].
//!
//! | Constructor | Default name | Matches |
//! |-------------|--------------|---------|
//! | [literal] | `'<bytes>'` | the bytes exactly |
//! | [sequence] | `Sequence` | all rules in order |
//! | [choice] | `Choice` | the first rule that matches |
//! | [one_of_bytes] | `{a\|b\|c}` | any single listed byte |
//! | [repeat] | `Repeat` | `min..=max` times, greedy beyond `min` |
//! | [at_least] | `AtLeast` | exactly `n` required matches |
//! | [as_many_as] | `AsManyAs` | up to `n` matches, never fails |
//! | [zero_or_more] | `ZeroOrMore` | any number of matches |
//! | [one_or_more] | `OneOrMore` | one required, then greedy |
//! | [zero_or_one] | `ZeroOrOne` | optional match |
//! | [placeholder] | target name | the rule bound by [resolve](crate::grammar::resolve) |

use crate::grammar::parsing_error::GrammarError;
use crate::grammar::rule::{PlaceholderSlot, Rule, RuleKind, display_byte};

/// Creates a rule matching exactly `bytes`.
///
/// # Example
/// ```
/// use forkparse::grammar::literal;
///
/// assert_eq!(literal("BEGIN").name(), "'BEGIN'");
/// ```
pub fn literal(bytes: impl AsRef<[u8]>) -> Rule {
    let bytes = bytes.as_ref().to_vec();
    let name = format!("'{}'", String::from_utf8_lossy(&bytes));
    Rule::new(name, RuleKind::Literal(bytes))
}

/// Creates a rule matching all `rules` one after another.
///
/// # Errors
/// [GrammarError::EmptySequence] if `rules` is empty.
pub fn sequence(rules: impl IntoIterator<Item = Rule>) -> Result<Rule, GrammarError> {
    let rules: Vec<Rule> = rules.into_iter().collect();
    if rules.is_empty() {
        return Err(GrammarError::EmptySequence);
    }
    Ok(Rule::new("Sequence", RuleKind::Sequence(rules)))
}

/// Creates a rule matching the first of `rules` that succeeds.
///
/// If all fail, the failure that got furthest into the input is reported.
///
/// # Errors
/// [GrammarError::EmptyChoice] if `rules` is empty.
pub fn choice(rules: impl IntoIterator<Item = Rule>) -> Result<Rule, GrammarError> {
    let rules: Vec<Rule> = rules.into_iter().collect();
    if rules.is_empty() {
        return Err(GrammarError::EmptyChoice);
    }
    Ok(Rule::new("Choice", RuleKind::Choice(rules)))
}

/// Creates a rule matching any single byte of `bytes`, named like `{0|1|2}`.
///
/// # Errors
/// [GrammarError::EmptyByteSet] if `bytes` is empty.
///
/// # Example
/// ```
/// use forkparse::grammar::one_of_bytes;
///
/// assert_eq!(one_of_bytes(b"+-").unwrap().name(), "{+|-}");
/// ```
pub fn one_of_bytes(bytes: &[u8]) -> Result<Rule, GrammarError> {
    if bytes.is_empty() {
        return Err(GrammarError::EmptyByteSet);
    }
    let name = bytes
        .iter()
        .map(|b| display_byte(*b))
        .collect::<Vec<_>>()
        .join("|");
    let alternatives = bytes.iter().map(|b| literal([*b])).collect();
    Ok(Rule::new(format!("{{{name}}}"), RuleKind::Choice(alternatives)))
}

/// Creates a rule matching `rule` at least `min` and at most `max` times
/// (`None` for unbounded).
///
/// The first `min` matches are required and parsed in place. Further matches
/// are attempted greedily on branches and stop at the first failure, which is
/// not an error.
///
/// # Errors
/// [GrammarError::InvalidBounds] if `max < min`.
pub fn repeat(rule: Rule, min: usize, max: Option<usize>) -> Result<Rule, GrammarError> {
    if let Some(max) = max.filter(|&max| max < min) {
        return Err(GrammarError::InvalidBounds { min, max });
    }
    Ok(repetition("Repeat", rule, min, max))
}

/// Creates a rule requiring exactly `n` consecutive matches of `rule`.
pub fn at_least(rule: Rule, n: usize) -> Rule {
    repetition("AtLeast", rule, n, Some(n))
}

/// Creates a rule taking up to `n` consecutive matches of `rule`. Never fails.
pub fn as_many_as(rule: Rule, n: usize) -> Rule {
    repetition("AsManyAs", rule, 0, Some(n))
}

/// Creates a rule taking any number of consecutive matches of `rule`. Never fails.
pub fn zero_or_more(rule: Rule) -> Rule {
    repetition("ZeroOrMore", rule, 0, None)
}

/// Creates a rule requiring one match of `rule`, then taking any number more.
pub fn one_or_more(rule: Rule) -> Rule {
    repetition("OneOrMore", rule, 1, None)
}

/// Creates a rule taking an optional match of `rule`. Never fails.
pub fn zero_or_one(rule: Rule) -> Rule {
    repetition("ZeroOrOne", rule, 0, Some(1))
}

/// Creates a forward reference to the rule named `target`.
///
/// The reference is bound by [resolve](crate::grammar::resolve); parsing it
/// before that fails with
/// [UnresolvedPlaceholder](crate::grammar::ParseFailure::UnresolvedPlaceholder).
pub fn placeholder(target: impl Into<String>) -> Rule {
    Rule::new(target, RuleKind::Placeholder(PlaceholderSlot::default()))
}

fn repetition(name: &str, rule: Rule, min: usize, max: Option<usize>) -> Rule {
    Rule::new(
        name,
        RuleKind::Repeat {
            child: rule,
            min,
            max,
        },
    )
}
