//! This module defines the syntax tree produced by the reader. The main type, [`Node`],
//! pairs a [`NodeKind`] (atom, string or list) with the half-open [`Span`] of source it
//! was read from. Quote sugar has no node kind of its own: `'x` is read as the list
//! `(quote x)`, and [`Node::quote_form`] recognises that shape again for consumers.
//! Helper functions such as [`atom`], [`string`] and [`list`] build span-less nodes for
//! code and tests, and [`Node::without_spans`] erases spans so that trees read from
//! different sources can be compared structurally. The `Display` impl prints a node back
//! as source text with every reserved character re-escaped, so printed output reads back
//! to an equal tree.

use std::fmt;

use crate::lexical::{ESCAPE, needs_escape};

/// A location in the source text.
///
/// `offset` is a byte offset; `line` and `column` are 1-based, with columns counted in
/// characters rather than bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// The position of the first character of any input.
    pub const START: Position = Position {
        offset: 0,
        line: 1,
        column: 1,
    };
}

impl Default for Position {
    fn default() -> Self {
        Position::START
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Half-open source range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        debug_assert!(start <= end, "span ends before it starts");
        Span { start, end }
    }

    /// True if `other` lies entirely inside this span.
    pub fn encloses(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }
}

/// The three shapes a node can take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Bare token text with escapes resolved (symbols, numbers, anything undelimited)
    Atom(String),
    /// Contents of a string literal with escapes resolved
    String(String),
    /// Parenthesised sequence, possibly empty
    List(Vec<Node>),
}

/// A node of the syntax tree together with the source it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

/// The four quote-sugar markers and the head atoms they expand to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuoteKind {
    Quote,
    Quasiquote,
    Unquote,
    UnquoteSplicing,
}

impl QuoteKind {
    pub const ALL: [QuoteKind; 4] = [
        QuoteKind::Quote,
        QuoteKind::Quasiquote,
        QuoteKind::Unquote,
        QuoteKind::UnquoteSplicing,
    ];

    /// Name of the head atom in the expanded list form.
    pub fn name(self) -> &'static str {
        match self {
            QuoteKind::Quote => "quote",
            QuoteKind::Quasiquote => "quasiquote",
            QuoteKind::Unquote => "unquote",
            QuoteKind::UnquoteSplicing => "unquote-splicing",
        }
    }

    /// The shorthand marker as written in source.
    pub fn marker(self) -> &'static str {
        match self {
            QuoteKind::Quote => "'",
            QuoteKind::Quasiquote => "`",
            QuoteKind::Unquote => ",",
            QuoteKind::UnquoteSplicing => ",@",
        }
    }

    pub fn from_name(name: &str) -> Option<QuoteKind> {
        QuoteKind::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Node { kind, span }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn as_atom(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Atom(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::String(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Node]> {
        match &self.kind {
            NodeKind::List(children) => Some(children),
            _ => None,
        }
    }

    /// Check if this is an atom spelled exactly `name`
    pub fn is_atom(&self, name: &str) -> bool {
        self.as_atom() == Some(name)
    }

    /// Recognise the two-element `(quote x)`-family shape, whether it came from sugar
    /// or was written out explicitly.
    pub fn quote_form(&self) -> Option<(QuoteKind, &Node)> {
        match self.as_list()? {
            [head, body] => {
                let kind = QuoteKind::from_name(head.as_atom()?)?;
                Some((kind, body))
            }
            _ => None,
        }
    }

    /// Copy of this tree with every span reset, for comparisons that ignore location.
    pub fn without_spans(&self) -> Node {
        let kind = match &self.kind {
            NodeKind::List(children) => {
                NodeKind::List(children.iter().map(Node::without_spans).collect())
            }
            other => other.clone(),
        };
        Node::new(kind, Span::default())
    }
}

/// Helper for building atom nodes with an empty span
pub fn atom<S: AsRef<str>>(text: S) -> Node {
    Node::new(NodeKind::Atom(text.as_ref().to_owned()), Span::default())
}

/// Helper for building string nodes with an empty span
pub fn string<S: AsRef<str>>(text: S) -> Node {
    Node::new(NodeKind::String(text.as_ref().to_owned()), Span::default())
}

/// Helper for building list nodes with an empty span
pub fn list<I: IntoIterator<Item = Node>>(children: I) -> Node {
    Node::new(NodeKind::List(children.into_iter().collect()), Span::default())
}

/// Helper for building the expanded form of a quote-sugar marker
pub fn quoted(kind: QuoteKind, body: Node) -> Node {
    list([atom(kind.name()), body])
}

/// Prints the node in source form, re-escaping reserved characters in atoms and
/// escape-table characters in strings, so that reading the output gives the same tree.
///
/// One exception: an atom spelled `#!...` printed as the first thing in a program reads
/// back as a shebang line under [`crate::parse`], and `#` has no escape. Such atoms
/// round-trip through [`crate::parse_expression`], or with shebang skipping turned off.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Atom(text) => {
                for ch in text.chars() {
                    if needs_escape(ch) {
                        write!(f, "{ESCAPE}")?;
                    }
                    write!(f, "{ch}")?;
                }
                Ok(())
            }
            NodeKind::String(text) => {
                write!(f, "\"")?;
                for ch in text.chars() {
                    match ch {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\u{8}' => write!(f, "\\b")?,
                        '\u{c}' => write!(f, "\\f")?,
                        '\n' => write!(f, "\\n")?,
                        '\r' => write!(f, "\\r")?,
                        '\t' => write!(f, "\\t")?,
                        '\u{b}' => write!(f, "\\v")?,
                        '\0' => write!(f, "\\0")?,
                        c => write!(f, "{c}")?,
                    }
                }
                write!(f, "\"")
            }
            NodeKind::List(children) => {
                write!(f, "(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_data_driven() {
        let test_cases = vec![
            (atom("foo"), "foo"),
            (atom("42"), "42"),
            (atom("a(b)c"), r"a\(b\)c"),
            (atom("semi;colon"), r"semi\;colon"),
            (atom("two words"), r"two\ words"),
            (atom("it's"), r"it\'s"),
            (atom(",@x"), r"\,@x"),
            (atom("back\\slash"), r"back\\slash"),
            (string(""), "\"\""),
            (string("hello"), "\"hello\""),
            (string("a\nb"), r#""a\nb""#),
            (string("say \"hi\""), r#""say \"hi\"""#),
            (string("\u{8}\u{c}\r\t\u{b}\0"), r#""\b\f\r\t\v\0""#),
            (string("(not an atom)"), "\"(not an atom)\""),
            (list([]), "()"),
            (list([atom("a"), string("b"), list([atom("c")])]), "(a \"b\" (c))"),
            (quoted(QuoteKind::Quote, atom("x")), "(quote x)"),
        ];

        for (i, (node, expected)) in test_cases.iter().enumerate() {
            assert_eq!(node.to_string(), *expected, "Display case #{}", i + 1);
        }
    }

    #[test]
    fn test_quote_form_recognition() {
        for kind in QuoteKind::ALL {
            let node = quoted(kind, atom("x"));
            let (found, body) = node.quote_form().unwrap_or_else(|| panic!("{kind:?}"));
            assert_eq!(found, kind);
            assert_eq!(body, &atom("x"));
            assert_eq!(QuoteKind::from_name(kind.name()), Some(kind));
        }

        // Wrong arity or a non-atom head is just a list
        assert_eq!(list([atom("quote")]).quote_form(), None);
        assert_eq!(list([atom("quote"), atom("a"), atom("b")]).quote_form(), None);
        assert_eq!(list([string("quote"), atom("a")]).quote_form(), None);
        assert_eq!(list([atom("quotation"), atom("a")]).quote_form(), None);
        assert_eq!(atom("quote").quote_form(), None);
    }

    #[test]
    fn test_without_spans_erases_nested_locations() {
        let here = Position {
            offset: 3,
            line: 1,
            column: 4,
        };
        let there = Position {
            offset: 5,
            line: 1,
            column: 6,
        };
        let span = Span::new(here, there);
        let node = Node::new(
            NodeKind::List(vec![Node::new(NodeKind::Atom("a".into()), span)]),
            span,
        );
        assert_ne!(node, list([atom("a")]));
        assert_eq!(node.without_spans(), list([atom("a")]));
    }

    #[test]
    fn test_span_helpers() {
        let a = Position::START;
        let b = Position {
            offset: 2,
            line: 1,
            column: 3,
        };
        let c = Position {
            offset: 7,
            line: 2,
            column: 1,
        };
        let outer = Span::new(a, c);
        let inner = Span::new(b, c);
        assert!(outer.encloses(&inner));
        assert!(!inner.encloses(&outer));
        assert!(Span::new(b, b).is_empty());
        assert_eq!(c.to_string(), "line 2, column 1");
    }

    #[test]
    fn test_accessors() {
        assert_eq!(atom("a").as_atom(), Some("a"));
        assert_eq!(atom("a").as_string(), None);
        assert_eq!(string("s").as_string(), Some("s"));
        assert_eq!(list([atom("a")]).as_list().map(<[Node]>::len), Some(1));
        assert!(atom("quote").is_atom("quote"));
        assert!(!string("quote").is_atom("quote"));
    }
}
