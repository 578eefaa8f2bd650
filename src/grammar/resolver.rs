//! Binding of placeholders to named rules.
//!
//! Grammars are built in two phases: first the rule graph is constructed with
//! [placeholder](crate::grammar::placeholder)s standing in for rules that are
//! not available yet (typically because they contain the placeholder
//! themselves), then [resolve] binds every placeholder to the rule of the same
//! name found anywhere in the graph.

use crate::grammar::parsing_error::ResolveError;
use crate::grammar::rule::Rule;
use log::debug;
use std::collections::{HashMap, HashSet};

// =#========================================================================#=
// GRAMMAR
// =#========================================================================#=
/// A resolved rule graph.
///
/// Bound placeholders own their targets, so rules of the grammar stay usable
/// after the [Grammar] itself is dropped. For recursive grammars this is a
/// reference cycle; call [release](Grammar::release) to free it.
#[derive(Debug, Clone)]
pub struct Grammar {
    roots: Vec<Rule>,
    rules: HashMap<String, Rule>,
    placeholders: Vec<Rule>,
}

impl Grammar {
    /// Returns the roots the grammar was resolved from.
    pub fn roots(&self) -> &[Rule] {
        &self.roots
    }

    /// Looks up a rule by the name it had at resolution time.
    ///
    /// If several rules shared a name, the first one found is returned.
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    /// Returns the names of all rules found during resolution, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Unbinds every placeholder found during resolution.
    ///
    /// This breaks the reference cycles of a recursive grammar so its rules
    /// can be freed. Rules still held elsewhere keep working where they do
    /// not reach a placeholder; reaching one fails with
    /// [UnresolvedPlaceholder](crate::grammar::ParseFailure::UnresolvedPlaceholder)
    /// until the rules are resolved again.
    ///
    /// # Returns
    /// Number of placeholders that were unbound
    pub fn release(self) -> usize {
        let released = self.placeholders.iter().filter(|p| p.unbind()).count();
        debug!("released grammar: {released} placeholders unbound");
        released
    }
}

// =#========================================================================#=
// RESOLVE
// =#========================================================================#=
/// Binds all placeholders reachable from `roots`.
///
/// The graph is walked depth-first from each root in order. Every
/// non-placeholder rule is recorded under its current name (the first rule
/// seen wins for duplicate names); placeholders are collected but not
/// followed. Each placeholder is then bound to the rule recorded under its
/// name.
///
/// Running it again over an already resolved graph is harmless: bound
/// placeholders are left as they are.
///
/// # Arguments
/// * `roots` - Rules to start the walk from
///
/// # Returns
/// A [Grammar] owning `roots`
///
/// # Errors
/// [ResolveError::Unresolved] naming every placeholder target that was not
/// found. In that case no placeholder is bound.
///
/// # Example
/// ```
/// use forkparse::grammar::{choice, literal, placeholder, resolve, sequence};
/// use forkparse::parse_bytes;
///
/// // Nested parentheses: Parens ::= '(' Parens ')' | 'x'
/// let parens = choice([
///     sequence([literal("("), placeholder("Parens"), literal(")")]).unwrap(),
///     literal("x"),
/// ])
/// .unwrap()
/// .rename("Parens");
///
/// let grammar = resolve([parens.clone()]).unwrap();
/// assert_eq!(parse_bytes(&parens, "((x))").unwrap(), 5);
/// assert!(grammar.rule("Parens").is_some());
/// ```
pub fn resolve(roots: impl IntoIterator<Item = Rule>) -> Result<Grammar, ResolveError> {
    let roots: Vec<Rule> = roots.into_iter().collect();

    let mut rules: HashMap<String, Rule> = HashMap::new();
    let mut placeholders: Vec<Rule> = Vec::new();
    let mut visited: HashSet<usize> = HashSet::new();

    // Depth-first, children pushed in reverse to visit them in order
    let mut stack: Vec<Rule> = roots.iter().rev().cloned().collect();
    while let Some(rule) = stack.pop() {
        if !visited.insert(rule.addr()) {
            continue;
        }
        if rule.is_placeholder() {
            placeholders.push(rule);
            continue;
        }
        rules.entry(rule.name()).or_insert_with(|| rule.clone());
        stack.extend(rule.child_rules().into_iter().rev());
    }

    // Check everything before binding anything
    let mut missing: Vec<String> = Vec::new();
    let mut bindings: Vec<(&Rule, &Rule)> = Vec::new();
    for placeholder in placeholders.iter().filter(|p| !p.is_bound()) {
        let name = placeholder.own_name();
        match rules.get(&name) {
            Some(target) => bindings.push((placeholder, target)),
            None if !missing.contains(&name) => missing.push(name),
            None => {}
        }
    }
    if !missing.is_empty() {
        return Err(ResolveError::Unresolved { names: missing });
    }

    let mut bound = 0;
    for (placeholder, target) in bindings {
        if placeholder.bind(target) {
            bound += 1;
        }
    }
    debug!(
        "resolved grammar: {} named rules, {} placeholders, {} newly bound",
        rules.len(),
        placeholders.len(),
        bound
    );

    Ok(Grammar {
        roots,
        rules,
        placeholders,
    })
}
