//! End-to-end checks of the reader's public API against the documented behaviours.
#![expect(clippy::unwrap_used)] // test code OK

use sexpr_plus::ast::{QuoteKind, atom, list, quoted, string};
use sexpr_plus::{Node, ParseErrorKind, parse, parse_atom, parse_expression, parse_string};

fn read(input: &str) -> Vec<Node> {
    parse(input)
        .unwrap_or_else(|e| panic!("{input:?} failed: {e}"))
        .iter()
        .map(Node::without_spans)
        .collect()
}

#[test]
fn atoms_strings_and_lists() {
    assert_eq!(read("abc"), vec![atom("abc")]);
    assert_eq!(read("\"abc\""), vec![string("abc")]);
    assert_eq!(read(r#""a\nb""#), vec![string("a\nb")]);
    assert_eq!(read(r#""a\nb""#)[0].as_string().map(|s| s.chars().count()), Some(3));
    assert_eq!(read("()"), vec![list([])]);
    assert_eq!(
        read("(1 2 3)"),
        vec![list([atom("1"), atom("2"), atom("3")])]
    );
}

#[test]
fn escaped_atoms_read_back_identically() {
    let first = parse_expression(r"a\(b").unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(first.as_atom(), Some("a(b"));

    let printed = first.to_string();
    assert_eq!(printed, r"a\(b");
    let second = parse_expression(&printed).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(first, second);
}

#[test]
fn quote_sugar_matches_explicit_forms() {
    assert_eq!(read("'x"), read("(quote x)"));
    assert_eq!(read(",@x"), read("(unquote-splicing x)"));
    assert_eq!(read("`x"), read("(quasiquote x)"));
    assert_eq!(read(",x"), read("(unquote x)"));
    assert_eq!(
        read("`(a ,b)"),
        vec![quoted(
            QuoteKind::Quasiquote,
            list([atom("a"), quoted(QuoteKind::Unquote, atom("b"))])
        )]
    );

    let node = parse_expression("`(a ,b)").unwrap_or_else(|e| panic!("{e}"));
    let (kind, body) = node.quote_form().unwrap_or_else(|| panic!("{node:?}"));
    assert_eq!(kind, QuoteKind::Quasiquote);
    assert_eq!(body.as_list().map(<[Node]>::len), Some(2));
}

#[test]
fn comments_and_shebang_are_transparent() {
    assert_eq!(read("(a ; comment\n b)"), read("(a b)"));
    assert_eq!(read("#!/usr/bin/env interp\n(a)"), read("(a)"));
    assert_eq!(read("   ; just a comment\n"), Vec::<Node>::new());
    assert_eq!(read(""), Vec::<Node>::new());
}

#[test]
fn failures_report_kind_and_position() {
    let err = parse("\"abc").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Unterminated);
    assert_eq!(err.expected, "string-terminator");
    assert_eq!(err.position.offset, 4);

    let err = parse("(a (b)").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Unterminated);
    assert_eq!(err.expected, "closing paren");
    assert_eq!(err.to_string(), "line 1, column 7: expected closing paren");

    let err = parse("(a) )").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::TrailingContent);
    assert_eq!(err.position.offset, 4);
    assert_eq!(err.found, Some(')'));
}

#[test]
fn spans_nest() {
    fn check(node: &Node) {
        assert!(node.span.start <= node.span.end, "{node:?}");
        for child in node.as_list().unwrap_or_default() {
            assert!(node.span.encloses(&child.span), "{child:?} escapes {node:?}");
            check(child);
        }
    }

    let source = "(define (f x)\n  ; doc\n  `(g ,x ,@(h \"s\\\"\" 'y)))\n(z)";
    for node in parse(source).unwrap_or_else(|e| panic!("{e}")) {
        check(&node);
    }
}

#[test]
fn independent_calls_run_in_parallel() {
    let handles: Vec<_> = (0..4)
        .map(|i| {
            std::thread::spawn(move || {
                let source = format!("(thread {i} \"text\" '(nested {i}))");
                parse(&source).map(|nodes| nodes.len())
            })
        })
        .collect();

    for handle in handles {
        let result = handle.join().unwrap_or_else(|_| panic!("reader thread panicked"));
        assert_eq!(result, Ok(1));
    }
}

#[test]
fn hash_bang_atoms_read_back_as_single_expressions() {
    let printed = atom("#!x").to_string();
    assert_eq!(printed, "#!x");
    assert!(parse_expression(&printed).unwrap().is_atom("#!x"));
    // At the start of a program the same text is a shebang line
    assert_eq!(read(&printed), Vec::<Node>::new());
    assert_eq!(read(&format!("a {printed}")), vec![atom("a"), atom("#!x")]);
}

#[test]
fn atom_and_string_entry_points() {
    assert_eq!(parse_atom(" foo ").unwrap().without_spans(), atom("foo"));
    assert_eq!(parse_string("\"foo\"").unwrap().without_spans(), string("foo"));
    assert_eq!(parse_atom("\"foo\"").unwrap_err().expected, "atom");
    assert_eq!(parse_string("foo").unwrap_err().expected, "string-opener");
}
