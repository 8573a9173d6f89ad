//! Recognition of tag pairs wrapped in matching conditionals.

use erb_parser::ast::Node;
use erb_parser::Parser;

fn parse(source: &str) -> erb_parser::ast::DocumentNode {
    Parser::new(source).parse()
}

#[test]
fn test_matching_if_wrappers_fold_into_conditional_element() {
    let document = parse("<% if ok %><div><% end %>hello<% if ok %></div><% end %>");

    assert_eq!(document.children.len(), 1);

    let conditional = match &document.children[0] {
        Node::HtmlConditionalElement(conditional) => conditional,
        other => {
            assert!(false, "expected HtmlConditionalElement, got {}", other.to_sexp());
            return;
        }
    };

    assert_eq!(conditional.condition, "ok");
    assert_eq!(conditional.tag_name.value.as_ref(), "div");
    assert_eq!(conditional.body.len(), 1);
    assert!(matches!(&conditional.body[0], Node::HtmlText(text) if text.content == "hello"));
    assert!(matches!(conditional.open_tag.as_ref(), Node::HtmlOpenTag(_)));
    assert!(matches!(conditional.close_tag.as_ref(), Node::HtmlCloseTag(_)));
    assert!(document.all_errors().is_empty());
}

#[test]
fn test_condition_mismatch_keeps_wrappers_and_reports() {
    let document = parse("<% if a %><div><% end %>x<% if b %></div><% end %>");

    // Both wrappers survive untouched around the text.
    assert!(document
        .children
        .iter()
        .filter(|node| matches!(node, Node::ErbIf(_)))
        .count()
        == 2);

    let errors = document.all_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), "CONDITIONAL_ELEMENT_CONDITION_MISMATCH");
}

#[test]
fn test_condition_mismatch_carries_both_conditions() {
    let document = parse("<% if a %><div><% end %>x<% if b %></div><% end %>");

    let errors = document.all_errors();
    let rendered = format!("{}", errors[0]);

    assert!(rendered.contains("`a`"));
    assert!(rendered.contains("`b`"));
    assert!(rendered.contains("div"));
}

#[test]
fn test_unless_wrappers_fold() {
    let document = parse("<% unless hidden %><div><% end %>x<% unless hidden %></div><% end %>");

    assert!(matches!(&document.children[0], Node::HtmlConditionalElement(conditional)
        if conditional.condition == "hidden"));
    assert!(document.all_errors().is_empty());
}

#[test]
fn test_if_and_unless_do_not_pair() {
    let document = parse("<% if cond %><div><% end %>x<% unless cond %></div><% end %>");

    assert!(!document
        .children
        .iter()
        .any(|node| matches!(node, Node::HtmlConditionalElement(_))));
}

#[test]
fn test_tag_names_match_case_insensitively() {
    let document = parse("<% if ok %><DIV><% end %>x<% if ok %></div><% end %>");

    assert!(matches!(&document.children[0], Node::HtmlConditionalElement(conditional)
        if conditional.tag_name.value.as_ref() == "DIV"));
}

#[test]
fn test_multiple_tags_in_wrapper_pair_reported() {
    let document =
        parse("<% if ok %><div><span><% end %>x<% if ok %></span></div><% end %>");

    let errors = document.all_errors();
    assert!(errors
        .iter()
        .any(|error| error.kind() == "CONDITIONAL_ELEMENT_MULTIPLE_TAGS"));

    // The wrappers are not rewritten.
    assert!(!document
        .children
        .iter()
        .any(|node| matches!(node, Node::HtmlConditionalElement(_))));
}

#[test]
fn test_wrapper_with_void_tag_is_not_a_candidate() {
    let document = parse("<% if ok %><br><% end %>x<% if ok %></div><% end %>");

    assert!(!document
        .children
        .iter()
        .any(|node| matches!(node, Node::HtmlConditionalElement(_))));
}

#[test]
fn test_conditional_element_inside_element_body() {
    let document =
        parse("<section><% if ok %><div><% end %>x<% if ok %></div><% end %></section>");

    let section = match &document.children[0] {
        Node::HtmlElement(section) => section,
        other => {
            assert!(false, "expected HtmlElement, got {}", other.to_sexp());
            return;
        }
    };

    assert!(matches!(&section.body[0], Node::HtmlConditionalElement(_)));
    assert!(document.all_errors().is_empty());
}

#[test]
fn test_whitespace_in_wrappers_is_ignored() {
    let document = parse("<% if ok %> <div> <% end %>x<% if ok %> </div> <% end %>");

    assert!(matches!(&document.children[0], Node::HtmlConditionalElement(_)));
}

#[test]
fn test_chained_wrapper_is_not_simple() {
    let document =
        parse("<% if ok %><div><% else %><span><% end %>x<% if ok %></div><% end %>");

    // A wrapper with an else branch is not a simple wrapper, so nothing
    // folds into a conditional element here.
    assert!(!document
        .children
        .iter()
        .any(|node| matches!(node, Node::HtmlConditionalElement(_))));
}
