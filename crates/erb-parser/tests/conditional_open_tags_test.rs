//! Recognition of open tags chosen among conditional branches.

use erb_parser::ast::Node;
use erb_parser::Parser;
use rstest::rstest;

fn parse(source: &str) -> erb_parser::ast::DocumentNode {
    Parser::new(source).parse()
}

#[test]
fn test_if_else_branches_fold_into_conditional_open_tag() {
    let source = concat!(
        "<% if flag %><section class=\"on\"><% else %><section class=\"off\"><% end %>",
        "inner</section>",
    );
    let document = parse(source);

    assert_eq!(document.children.len(), 1);

    let element = match &document.children[0] {
        Node::HtmlElement(element) => element,
        other => {
            assert!(false, "expected HtmlElement, got {}", other.to_sexp());
            return;
        }
    };

    assert_eq!(element.tag_name.value.as_ref(), "section");
    assert!(element.close_tag.is_some());
    assert_eq!(element.body.len(), 1);
    assert!(matches!(&element.body[0], Node::HtmlText(text) if text.content == "inner"));

    let conditional = match element.open_tag.as_ref() {
        Node::HtmlConditionalOpenTag(conditional) => conditional,
        other => {
            assert!(false, "expected HtmlConditionalOpenTag, got {}", other.to_sexp());
            return;
        }
    };

    assert!(matches!(conditional.conditional.as_ref(), Node::ErbIf(if_node)
        if if_node.subsequent.is_some()));
    assert!(document.all_errors().is_empty());
}

#[test]
fn test_elsif_branches_qualify() {
    let source = concat!(
        "<% if a %><div id=\"a\"><% elsif b %><div id=\"b\"><% else %><div id=\"c\"><% end %>",
        "x</div>",
    );
    let document = parse(source);

    assert!(matches!(&document.children[0], Node::HtmlElement(element)
        if matches!(element.open_tag.as_ref(), Node::HtmlConditionalOpenTag(_))));
    assert!(document.all_errors().is_empty());
}

#[test]
fn test_unless_else_branches_qualify() {
    let source =
        "<% unless compact %><table><% else %><table><% end %>rows</table>";
    let document = parse(source);

    assert!(matches!(&document.children[0], Node::HtmlElement(element)
        if element.tag_name.value.as_ref() == "table"));
    assert!(matches!(&document.children[0], Node::HtmlElement(element)
        if matches!(element.open_tag.as_ref(), Node::HtmlConditionalOpenTag(_))));
}

#[test]
fn test_chain_without_else_does_not_qualify() {
    let document = parse("<% if flag %><section><% end %>inner</section>");

    assert!(!document
        .children
        .iter()
        .any(|node| matches!(node, Node::HtmlElement(element)
            if matches!(element.open_tag.as_ref(), Node::HtmlConditionalOpenTag(_)))));
    assert!(document.children.iter().any(|node| matches!(node, Node::ErbIf(_))));
}

#[test]
fn test_branches_with_different_tags_do_not_qualify() {
    let document =
        parse("<% if flag %><section><% else %><article><% end %>x</section>");

    assert!(!document
        .children
        .iter()
        .any(|node| matches!(node, Node::HtmlElement(element)
            if matches!(element.open_tag.as_ref(), Node::HtmlConditionalOpenTag(_)))));
}

#[rstest]
#[case("<% if flag %><div><p><% else %><div><% end %>x</div>", false)]
#[case("<% if a %><div><% elsif b %><div><p><% else %><div><% end %>x</div>", true)]
fn test_branch_with_multiple_tags_reports_error(#[case] source: &str, #[case] on_elsif: bool) {
    let document = parse(source);

    let if_node = match &document.children[0] {
        Node::ErbIf(if_node) => if_node,
        other => {
            assert!(false, "expected ErbIf, got {}", other.to_sexp());
            return;
        }
    };

    let multiple_tags = |errors: &[erb_error::AnalyzeError]| {
        errors
            .iter()
            .filter(|error| error.kind() == "CONDITIONAL_ELEMENT_MULTIPLE_TAGS")
            .count()
    };

    let on_if = multiple_tags(&if_node.errors);
    let on_elsif_branch = match if_node.subsequent.as_deref() {
        Some(Node::ErbIf(elsif_node)) => multiple_tags(&elsif_node.errors),
        _ => 0,
    };

    // The diagnostic belongs to the branch that holds the surplus tag.
    if on_elsif {
        assert_eq!(on_if, 0, "leading if branch is clean for {:?}", source);
        assert_eq!(on_elsif_branch, 1, "elsif branch carries the error for {:?}", source);
    } else {
        assert_eq!(on_if, 1, "leading if branch carries the error for {:?}", source);
        assert_eq!(on_elsif_branch, 0);
    }
}

#[test]
fn test_close_tag_search_skips_nested_identical_tags() {
    let source = concat!(
        "<% if flag %><div class=\"a\"><% else %><div class=\"b\"><% end %>",
        "<div>inner</div>",
        "</div>",
    );
    let document = parse(source);

    let element = match &document.children[0] {
        Node::HtmlElement(element) => element,
        other => {
            assert!(false, "expected HtmlElement, got {}", other.to_sexp());
            return;
        }
    };

    assert!(matches!(element.open_tag.as_ref(), Node::HtmlConditionalOpenTag(_)));

    // The nested <div>inner</div> pairs up inside the body; the outer
    // close belongs to the conditional open tag.
    assert!(element.body.iter().any(|node| matches!(node, Node::HtmlElement(inner)
        if inner.close_tag.is_some() && inner.tag_name.value.as_ref() == "div")));
    assert!(element.close_tag.is_some());
}

#[test]
fn test_tag_names_match_case_insensitively() {
    let document =
        parse("<% if flag %><DIV><% else %><div><% end %>x</div>");

    assert!(matches!(&document.children[0], Node::HtmlElement(element)
        if matches!(element.open_tag.as_ref(), Node::HtmlConditionalOpenTag(_))));
}
