//! Property-based tests for the reader.
//!
//! Generated trees are printed with escapes re-applied and read back; the result must
//! match the original tree once spans are ignored.

use proptest::prelude::*;
use sexpr_plus::ast::{atom, list, string};
use sexpr_plus::{Node, parse, parse_expression};

/// Atom text containing no reserved characters
fn plain_atom() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9!$%&*+./:<=>?@^_~#-]{1,12}"
}

fn any_atom() -> impl Strategy<Value = String> {
    proptest::collection::vec(any::<char>(), 1..12).prop_map(|chars| chars.into_iter().collect())
}

fn any_string() -> impl Strategy<Value = String> {
    proptest::collection::vec(any::<char>(), 0..12).prop_map(|chars| chars.into_iter().collect())
}

fn tree() -> impl Strategy<Value = Node> {
    let leaf = prop_oneof![any_atom().prop_map(atom), any_string().prop_map(string)];
    leaf.prop_recursive(4, 32, 6, |inner| {
        proptest::collection::vec(inner, 0..6).prop_map(list)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn plain_atoms_read_verbatim(text in plain_atom()) {
        // A leading "#!" would be taken for a shebang line by the top-level driver
        prop_assume!(!text.starts_with("#!"));
        let nodes = parse(&text).unwrap_or_default();
        prop_assert_eq!(nodes.len(), 1);
        prop_assert_eq!(nodes[0].as_atom(), Some(text.as_str()));
    }

    #[test]
    fn printed_trees_read_back(node in tree()) {
        let printed = node.to_string();
        let reread = parse_expression(&printed);
        prop_assert!(reread.is_ok(), "{:?} failed: {:?}", printed, reread);
        let reread = reread.unwrap_or_else(|_| unreachable!());
        prop_assert_eq!(reread.without_spans(), node);
    }

    #[test]
    fn escaping_is_idempotent(text in any_atom()) {
        let first = parse_expression(&atom(&text).to_string()).map(|n| n.without_spans());
        prop_assert_eq!(first.as_ref().ok(), Some(&atom(&text)));
        let second = first.map(|n| n.to_string()).and_then(|s| parse_expression(&s));
        prop_assert_eq!(second.map(|n| n.without_spans()).ok(), Some(atom(&text)));
    }

    #[test]
    fn whitespace_and_comments_are_transparent(
        atoms in proptest::collection::vec(plain_atom(), 0..6),
        comment in "[^\n]{0,20}",
    ) {
        let plain = format!("({})", atoms.join(" "));
        let padded = format!("( \t{} ;{comment}\n )  ;{comment}", atoms.join(" \n ; note\n"));
        let strip = |nodes: Vec<Node>| -> Vec<Node> { nodes.iter().map(Node::without_spans).collect() };
        prop_assert_eq!(
            parse(&plain).map(strip),
            parse(&padded).map(strip)
        );
    }

    #[test]
    fn comment_only_input_is_empty(lines in proptest::collection::vec("[^\n]{0,20}", 0..5)) {
        let source: String = lines.iter().map(|l| format!("  ;{l}\n")).collect();
        prop_assert_eq!(parse(&source).map(|nodes| nodes.len()), Ok(0));
    }
}
