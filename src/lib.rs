//! sexpr-plus - reader for a Lisp-family surface syntax
//!
//! This crate turns source text into a tree of position-annotated nodes. It is a pure
//! front end: nothing is evaluated, expanded or analysed.
//!
//! ## Syntax
//!
//! ```scheme
//! #!/usr/bin/env interp      ; optional shebang, first line only
//! (define greeting "hi\n")   ; lists, atoms, strings with escapes
//! '(a b)                     ; read as (quote (a b))
//! `(a ,b ,@c)                ; quasiquote, unquote, unquote-splicing
//! weird\ atom\(1\)           ; reserved characters escaped inside atoms
//! ```
//!
//! Numbers are not interpreted: `42` and `-1.5e3` are atoms like any other.
//!
//! ## Reading
//!
//! ```
//! use sexpr_plus::{parse, ast::{atom, list, quoted, QuoteKind}};
//!
//! let nodes = parse("(a 'b) ; trailing comment").unwrap();
//! assert_eq!(nodes.len(), 1);
//! assert_eq!(
//!     nodes[0].without_spans(),
//!     list([atom("a"), quoted(QuoteKind::Quote, atom("b"))]),
//! );
//! ```
//!
//! Failures are all-or-nothing and report the furthest position the reader reached:
//!
//! ```
//! let err = sexpr_plus::parse("(a (b)").unwrap_err();
//! assert_eq!(err.to_string(), "line 1, column 7: expected closing paren");
//! ```
//!
//! ## Modules
//!
//! - `ast`: node, span and position types, helpers and the re-escaping printer
//! - `reader`: the expression grammar and the public entry points
//! - `json`: conversion to and from the `{type, content, location}` JSON shape

use thiserror::Error;

/// Default limit on nesting of lists and quote sugar.
/// Keeps hostile input from exhausting the stack during the recursive descent.
pub const MAX_PARSE_DEPTH: usize = 256;

/// Longest source snippet attached to a [`ParseError`]
const MAX_CONTEXT: usize = 100;

/// Reader options. The grammar itself is fixed; these only bound and tweak the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseConfig {
    /// Deepest nesting of lists and quote markers accepted
    pub max_depth: usize,
    /// Skip a `#!` line at the very start of input
    pub allow_shebang: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        ParseConfig {
            max_depth: MAX_PARSE_DEPTH,
            allow_shebang: true,
        }
    }
}

/// Categorizes the different kinds of parsing errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// Escape-introducer not followed by a character it can escape
    InvalidEscape,
    /// String or list still open at end of input
    Unterminated,
    /// Nothing in the grammar matches at this position
    UnexpectedCharacter,
    /// Material left over after the last complete top-level expression
    TrailingContent,
    /// Nesting exceeded [`ParseConfig::max_depth`]
    TooDeeplyNested,
}

/// A structured error describing where and why reading stopped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{position}: expected {expected}{}", found_suffix(.found))]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// Label of the rule that could not be satisfied, e.g. "closing paren"
    pub expected: &'static str,
    pub position: Position,
    /// The character at `position`, `None` at end of input
    pub found: Option<char>,
    /// Snippet of the input around the failure (max 100 chars)
    pub context: Option<String>,
}

fn found_suffix(found: &Option<char>) -> String {
    match found {
        Some(c) => format!(", found {c:?}"),
        None => String::new(),
    }
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, expected: &'static str, position: Position) -> Self {
        ParseError {
            kind,
            expected,
            position,
            found: None,
            context: None,
        }
    }

    /// Fill in `found` and `context` from the input the error was raised against
    pub fn with_source(mut self, input: &str) -> Self {
        let rest = input.get(self.position.offset..).unwrap_or_default();
        self.found = rest.chars().next();

        // Show some of what came before the failure, then the rest up to the limit
        let error_char = input[..input.len() - rest.len()].chars().count();
        let context_start = error_char.saturating_sub(20);
        let context_str: String = input
            .chars()
            .skip(context_start)
            .take(MAX_CONTEXT)
            .collect();

        let mut display_context = String::new();
        if context_start > 0 {
            display_context.push_str("[...]");
        }
        display_context.push_str(&context_str);
        if context_start + context_str.chars().count() < input.chars().count() {
            display_context.push_str("[...]");
        }

        self.context = Some(display_context.replace('\n', "\\n").replace('\r', ""));
        self
    }

    /// Line and column, both 1-based
    pub fn line_column(&self) -> (usize, usize) {
        (self.position.line, self.position.column)
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;

pub mod ast;
mod lexical;
pub mod reader;

#[cfg(feature = "json")]
pub mod json;

pub use ast::{Node, NodeKind, Position, QuoteKind, Span};
pub use reader::{parse, parse_atom, parse_expression, parse_string, parse_with_config};
