use std::cell::Cell;

use nom::error::{ParseError as _, context};
use nom::{Parser, branch::alt, character::complete::char, combinator::opt};
use tracing::{debug, trace};

use crate::ast::{Node, NodeKind, Position, Span};
use crate::lexical::{
    GrammarError, PResult, atom_text, lexeme, quote_marker, shebang_line, skip_insignificant,
    string_text,
};
use crate::{ParseConfig, ParseError, ParseErrorKind, Result};

/// Byte offsets of every line start, for turning offsets into line/column pairs.
///
/// Columns on ASCII-only lines are a byte difference. Elsewhere they are counted from the
/// previous lookup on the same line, so walking a long line costs its length once.
#[derive(Debug)]
struct LineIndex {
    starts: Vec<usize>,
    ascii: Vec<bool>,
    last: Cell<Position>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let starts: Vec<usize> = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        let ascii = starts
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let end = starts.get(i + 1).copied().unwrap_or(source.len());
                source[start..end].is_ascii()
            })
            .collect();
        LineIndex {
            starts,
            ascii,
            last: Cell::new(Position::START),
        }
    }

    fn position(&self, source: &str, offset: usize) -> Position {
        let line = self.starts.partition_point(|&start| start <= offset);
        let line_start = self.starts[line - 1];
        let last = self.last.get();
        let column = if self.ascii[line - 1] {
            offset - line_start + 1
        } else if last.line != line {
            source[line_start..offset].chars().count() + 1
        } else if last.offset <= offset {
            last.column + source[last.offset..offset].chars().count()
        } else {
            last.column - source[offset..last.offset].chars().count()
        };
        let position = Position {
            offset,
            line,
            column,
        };
        self.last.set(position);
        position
    }
}

/// Grammar state for one call. Positions are recovered from how much input is left,
/// so the rules themselves only ever see immutable `&str` slices.
#[derive(Debug)]
struct Reader<'src> {
    source: &'src str,
    lines: LineIndex,
    config: ParseConfig,
}

impl<'src> Reader<'src> {
    fn new(source: &'src str, config: ParseConfig) -> Self {
        Reader {
            source,
            lines: LineIndex::new(source),
            config,
        }
    }

    fn position(&self, rest: &str) -> Position {
        self.lines.position(self.source, self.source.len() - rest.len())
    }

    fn span(&self, start: &str, end: &str) -> Span {
        Span::new(self.position(start), self.position(end))
    }

    /// Enter one more level of nesting, failing hard once the limit is passed
    fn descend(
        &self,
        input: &'src str,
        depth: usize,
    ) -> std::result::Result<usize, nom::Err<GrammarError<'src>>> {
        if depth >= self.config.max_depth {
            return Err(nom::Err::Failure(GrammarError::new(
                input,
                "shallower nesting",
                ParseErrorKind::TooDeeplyNested,
            )));
        }
        Ok(depth + 1)
    }

    /// Parse an atom, string, list or quoted form. Tried in that order: the atom rule
    /// refuses every character the other three start with, so none can shadow another.
    fn expression(&self, input: &'src str, depth: usize) -> PResult<'src, Node> {
        alt((
            |i| self.list(i, depth),
            |i| self.atom(i),
            |i| self.string(i),
            |i| self.quoted(i, depth),
        ))
        .parse(input)
        .map_err(|e| match e {
            nom::Err::Error(err) => nom::Err::Error(err.stalled_at(input, "expression")),
            other => other,
        })
    }

    fn atom(&self, input: &'src str) -> PResult<'src, Node> {
        let (rest, text) = atom_text(input)?;
        let node = Node::new(NodeKind::Atom(text), self.span(input, rest));
        let (rest, ()) = skip_insignificant(rest)?;
        Ok((rest, node))
    }

    fn string(&self, input: &'src str) -> PResult<'src, Node> {
        let (rest, text) = string_text(input)?;
        let node = Node::new(NodeKind::String(text), self.span(input, rest));
        let (rest, ()) = skip_insignificant(rest)?;
        Ok((rest, node))
    }

    fn list(&self, input: &'src str, depth: usize) -> PResult<'src, Node> {
        let (mut rest, _) = context("opening paren", lexeme(char('('))).parse(input)?;
        let depth = self.descend(input, depth)?;

        let mut children = Vec::new();
        let stall = loop {
            match self.expression(rest, depth) {
                Ok((next, child)) => {
                    children.push(child);
                    rest = next;
                }
                Err(nom::Err::Error(err)) => break err,
                Err(err) => return Err(err),
            }
        };

        // Whatever stopped the children is reported if it got further than the paren
        let (after, _) = match context("closing paren", char(')')).parse(rest) {
            Ok(ok) => ok,
            Err(nom::Err::Error(err)) => return Err(nom::Err::Failure(stall.or(err))),
            Err(err) => return Err(err),
        };
        let node = Node::new(NodeKind::List(children), self.span(input, after));
        let (rest, ()) = skip_insignificant(after)?;
        Ok((rest, node))
    }

    /// `'x` becomes `(quote x)`, and likewise for the other markers. The head atom spans
    /// the marker; the list spans from the marker to the end of the quoted expression.
    fn quoted(&self, input: &'src str, depth: usize) -> PResult<'src, Node> {
        let (after_marker, kind) = context("quoted expression", quote_marker).parse(input)?;
        let head = Node::new(
            NodeKind::Atom(kind.name().to_owned()),
            self.span(input, after_marker),
        );
        let (rest, ()) = skip_insignificant(after_marker)?;
        let depth = self.descend(input, depth)?;
        let (rest, body) = self.expression(rest, depth)?;

        let span = Span::new(head.span.start, body.span.end);
        Ok((rest, Node::new(NodeKind::List(vec![head, body]), span)))
    }

    /// Optional shebang, insignificant material, then expressions up to end of input.
    fn program(&self, input: &'src str) -> PResult<'src, Vec<Node>> {
        let (mut rest, shebang) = if self.config.allow_shebang {
            opt(shebang_line).parse(input)?
        } else {
            (input, None)
        };
        if let Some(line) = shebang {
            trace!(line = line.trim_end(), "skipped shebang line");
        }
        (rest, _) = skip_insignificant(rest)?;

        let mut nodes = Vec::new();
        let stall = loop {
            match self.expression(rest, 0) {
                Ok((next, node)) => {
                    nodes.push(node);
                    rest = next;
                }
                Err(nom::Err::Error(err)) => break err,
                Err(err) => return Err(err),
            }
        };

        if rest.is_empty() {
            Ok((rest, nodes))
        } else {
            Err(nom::Err::Error(trailing(stall, rest)))
        }
    }

    /// One node read by `rule`, with nothing but insignificant material around it.
    fn sole<F>(&self, input: &'src str, rule: F) -> PResult<'src, Node>
    where
        F: FnOnce(&Self, &'src str) -> PResult<'src, Node>,
    {
        let (rest, ()) = skip_insignificant(input)?;
        let (rest, node) = rule(self, rest)?;
        if rest.is_empty() {
            Ok((rest, node))
        } else {
            Err(nom::Err::Error(GrammarError::new(
                rest,
                "end of input",
                ParseErrorKind::TrailingContent,
            )))
        }
    }

    fn to_parse_error(&self, err: nom::Err<GrammarError<'src>>) -> ParseError {
        let err = match err {
            nom::Err::Error(err) | nom::Err::Failure(err) => err,
            nom::Err::Incomplete(_) => {
                GrammarError::new("", "end of input", ParseErrorKind::Unterminated)
            }
        };
        let expected = err.expected.unwrap_or("expression");
        let kind = err
            .kind
            .unwrap_or_else(|| classify(expected, err.remaining.is_empty()));
        ParseError::new(kind, expected, self.position(err.remaining)).with_source(self.source)
    }
}

/// Leftover input after the last top-level expression. A failure that got further into
/// the leftovers than their first character explains more than "trailing content" does.
fn trailing<'src>(stall: GrammarError<'src>, rest: &'src str) -> GrammarError<'src> {
    if stall.remaining.len() < rest.len() {
        stall
    } else {
        GrammarError::new(
            rest,
            stall.expected.unwrap_or("end of input"),
            ParseErrorKind::TrailingContent,
        )
    }
}

fn classify(expected: &str, at_end: bool) -> ParseErrorKind {
    match expected {
        "string-terminator" | "closing paren" if at_end => ParseErrorKind::Unterminated,
        "escape sequence" => ParseErrorKind::InvalidEscape,
        _ => ParseErrorKind::UnexpectedCharacter,
    }
}

/// Parse a complete source text into its top-level expressions.
///
/// Empty input, or input holding only whitespace, comments and a shebang line, yields an
/// empty vector.
pub fn parse(input: &str) -> Result<Vec<Node>> {
    parse_with_config(input, ParseConfig::default())
}

pub fn parse_with_config(input: &str, config: ParseConfig) -> Result<Vec<Node>> {
    debug!(len = input.len(), ?config, "reading source");
    let reader = Reader::new(input, config);
    match reader.program(input) {
        Ok((_, nodes)) => {
            debug!(count = nodes.len(), "read top-level expressions");
            Ok(nodes)
        }
        Err(e) => {
            let err = reader.to_parse_error(e);
            debug!(%err, kind = ?err.kind, "read failed");
            Err(err)
        }
    }
}

/// Parse exactly one expression, optionally surrounded by whitespace and comments.
pub fn parse_expression(input: &str) -> Result<Node> {
    read_sole(input, |reader, rest| reader.expression(rest, 0))
}

/// Parse exactly one atom. Lists, strings and quote sugar are rejected with the label
/// `atom`.
pub fn parse_atom(input: &str) -> Result<Node> {
    read_sole(input, Reader::atom)
}

/// Parse exactly one string literal.
pub fn parse_string(input: &str) -> Result<Node> {
    read_sole(input, Reader::string)
}

fn read_sole<'src, F>(input: &'src str, rule: F) -> Result<Node>
where
    F: FnOnce(&Reader<'src>, &'src str) -> PResult<'src, Node>,
{
    let reader = Reader::new(input, ParseConfig::default());
    reader
        .sole(input, rule)
        .map(|(_, node)| node)
        .map_err(|e| reader.to_parse_error(e))
}
