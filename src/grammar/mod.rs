//! Rule graphs and the parse engine.
//!
//! # Building grammars
//! Rules are created with the functions in [builders] and combined into a
//! graph. Recursive grammars use [placeholder]s, which are bound to their
//! targets by [resolve]:
//!
//! ```
//! use forkparse::grammar::*;
//! use forkparse::parse_bytes;
//!
//! // Sentence ::= Word (' ' Word)* '!'
//! // Word     ::= [a-z]+ | '\'' Sentence '\''
//! let letter = one_of_bytes(b"abcdefghijklmnopqrstuvwxyz").unwrap();
//! let word = choice([
//!     one_or_more(letter),
//!     sequence([literal("'"), placeholder("Sentence"), literal("'")]).unwrap(),
//! ])
//! .unwrap()
//! .rename("Word");
//! let sentence = sequence([
//!     word.clone(),
//!     zero_or_more(sequence([literal(" "), word]).unwrap()),
//!     literal("!"),
//! ])
//! .unwrap()
//! .rename("Sentence");
//!
//! let _grammar = resolve([sentence.clone()]).unwrap();
//! assert_eq!(parse_bytes(&sentence, "she said 'hi there!'!").unwrap(), 21);
//! ```
//!
//! # Parsing
//! [Rule::parse] consumes a [Cursor](crate::stream::Cursor). Choices and
//! repetitions branch the cursor to try alternatives and commit the branch
//! that succeeded, so backtracking never needs a seekable source.
//!
//! # Diagnostics
//! A failed parse yields one [ParseError] holding the offset, the path of rule
//! names from the outermost rule to the failing literal, and a message. When
//! all alternatives of a choice fail, the one that got furthest is reported.

pub mod builders;
pub mod parsing_error;
pub mod resolver;
pub mod rule;

pub use builders::*;
pub use parsing_error::{GrammarError, ParseError, ParseFailure, ResolveError};
pub use resolver::{Grammar, resolve};
pub use rule::{PlaceholderSlot, Rule, RuleKind};
