//! Token-level rules shared by the reader: insignificant material (whitespace and
//! end-of-line comments), escape decoding, the reserved-character set, and the leaf
//! tokens (atom text, string literal text, quote markers, shebang line).
//!
//! Everything here is a plain nom parser over `&str` using [`GrammarError`], which keeps
//! the furthest failure seen and the label of the innermost rule that produced it.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, none_of, satisfy},
    combinator::{cut, eof, recognize, value},
    error::{ContextError, ErrorKind, context},
    multi::{fold_many0, fold_many1, many0_count},
    sequence::terminated,
};

use crate::ParseErrorKind;
use crate::ast::QuoteKind;

pub(crate) const ESCAPE: char = '\\';
pub(crate) const COMMENT: char = ';';
pub(crate) const STRING_DELIMITER: char = '"';

pub(crate) type PResult<'a, T> = IResult<&'a str, T, GrammarError<'a>>;

/// Characters that may only appear in an atom when escaped
pub(crate) fn needs_escape(c: char) -> bool {
    matches!(
        c,
        COMMENT | STRING_DELIMITER | '\'' | '`' | ',' | ESCAPE | '(' | ')'
    ) || is_blank(c)
}

/// Unicode whitespace, plus the byte-order mark so a leading BOM is skipped like a space
pub(crate) fn is_blank(c: char) -> bool {
    c.is_whitespace() || c == '\u{feff}'
}

/// Decode the character after an escape-introducer in a string literal.
pub(crate) fn unescape(c: char) -> Option<char> {
    match c {
        'b' => Some('\u{8}'),
        'f' => Some('\u{c}'),
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        'v' => Some('\u{b}'),
        '0' => Some('\0'),
        ESCAPE => Some(ESCAPE),
        STRING_DELIMITER => Some(STRING_DELIMITER),
        _ => None,
    }
}

/// Failure type threaded through every rule.
///
/// `remaining` is the unconsumed input where matching stalled, which is all that is needed
/// to recover a position against the full source later.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GrammarError<'a> {
    pub(crate) remaining: &'a str,
    pub(crate) expected: Option<&'static str>,
    pub(crate) kind: Option<ParseErrorKind>,
}

impl<'a> GrammarError<'a> {
    pub(crate) fn new(remaining: &'a str, expected: &'static str, kind: ParseErrorKind) -> Self {
        GrammarError {
            remaining,
            expected: Some(expected),
            kind: Some(kind),
        }
    }

    /// Attach `label` if nothing was consumed between `start` and the failure.
    pub(crate) fn stalled_at(mut self, start: &str, label: &'static str) -> Self {
        if self.remaining.len() == start.len() {
            self.expected = Some(label);
            self.kind = None;
        }
        self
    }
}

impl<'a> nom::error::ParseError<&'a str> for GrammarError<'a> {
    fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
        GrammarError {
            remaining: input,
            expected: None,
            kind: None,
        }
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }

    // Prefer whichever alternative got further; on a tie the later rule wins.
    fn or(self, other: Self) -> Self {
        if self.remaining.len() < other.remaining.len() {
            self
        } else {
            other
        }
    }
}

impl<'a> ContextError<&'a str> for GrammarError<'a> {
    fn add_context(_input: &'a str, ctx: &'static str, mut other: Self) -> Self {
        if other.expected.is_none() {
            other.expected = Some(ctx);
        }
        other
    }
}

pub(crate) fn whitespace(input: &str) -> PResult<'_, &str> {
    context("whitespace", take_while1(is_blank)).parse(input)
}

pub(crate) fn comment(input: &str) -> PResult<'_, &str> {
    context(
        "end-of-line comment",
        recognize((
            char(COMMENT),
            take_while(|c: char| c != '\n'),
            alt((tag("\n"), eof)),
        )),
    )
    .parse(input)
}

/// Zero or more runs of whitespace or comments
pub(crate) fn skip_insignificant(input: &str) -> PResult<'_, ()> {
    value((), many0_count(alt((whitespace, comment)))).parse(input)
}

/// Wrap a token parser so that insignificant material after it is consumed too.
pub(crate) fn lexeme<'a, P>(
    parser: P,
) -> impl Parser<&'a str, Output = P::Output, Error = GrammarError<'a>>
where
    P: Parser<&'a str, Error = GrammarError<'a>>,
{
    terminated(parser, skip_insignificant)
}

pub(crate) fn shebang_line(input: &str) -> PResult<'_, &str> {
    context(
        "shebang line",
        recognize((
            tag("#!"),
            take_while(|c: char| c != '\n'),
            alt((tag("\n"), eof)),
        )),
    )
    .parse(input)
}

fn atom_escape(input: &str) -> PResult<'_, char> {
    let (after, _) = char(ESCAPE).parse(input)?;
    match after.chars().next() {
        Some(c) if needs_escape(c) => Ok((&after[c.len_utf8()..], c)),
        _ => Err(nom::Err::Failure(GrammarError::new(
            after,
            "escape sequence",
            ParseErrorKind::InvalidEscape,
        ))),
    }
}

/// One or more atom characters, decoded. Stops before the first reserved character.
pub(crate) fn atom_text(input: &str) -> PResult<'_, String> {
    context(
        "atom",
        fold_many1(
            alt((atom_escape, satisfy(|c| !needs_escape(c)))),
            String::new,
            |mut text, c| {
                text.push(c);
                text
            },
        ),
    )
    .parse(input)
}

fn string_escape(input: &str) -> PResult<'_, char> {
    let (after, _) = char(ESCAPE).parse(input)?;
    let mut chars = after.chars();
    match chars.next() {
        Some(c) => match unescape(c) {
            Some(decoded) => Ok((chars.as_str(), decoded)),
            None => Err(nom::Err::Failure(GrammarError::new(
                after,
                "string-terminator",
                ParseErrorKind::InvalidEscape,
            ))),
        },
        None => Err(nom::Err::Failure(GrammarError::new(
            after,
            "string-terminator",
            ParseErrorKind::Unterminated,
        ))),
    }
}

/// A delimited string literal, decoded. Once the opening delimiter matches, any later
/// failure is final.
pub(crate) fn string_text(input: &str) -> PResult<'_, String> {
    let (rest, _) = context("string-opener", char(STRING_DELIMITER)).parse(input)?;
    let (rest, text) = fold_many0(
        alt((string_escape, none_of("\"\\"))),
        String::new,
        |mut text, c| {
            text.push(c);
            text
        },
    )
    .parse(rest)?;
    let (rest, _) = cut(context("string-terminator", char(STRING_DELIMITER))).parse(rest)?;
    Ok((rest, text))
}

/// `,@` is tried before `,` so the shared prefix resolves to splicing.
pub(crate) fn quote_marker(input: &str) -> PResult<'_, QuoteKind> {
    alt((
        value(QuoteKind::Quote, char('\'')),
        value(QuoteKind::Quasiquote, char('`')),
        value(QuoteKind::UnquoteSplicing, tag(",@")),
        value(QuoteKind::Unquote, char(',')),
    ))
    .parse(input)
}
