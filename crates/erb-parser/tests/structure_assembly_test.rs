//! Assembly of flat fragment runs into compound control nodes.

use erb_parser::ast::Node;
use erb_parser::Parser;

fn parse(source: &str) -> erb_parser::ast::DocumentNode {
    Parser::new(source).parse()
}

fn text_content(node: &Node) -> &str {
    match node {
        Node::HtmlText(text) => &text.content,
        _ => "",
    }
}

#[test]
fn test_if_else_end() {
    let document = parse("<% if x %>A<% else %>B<% end %>");

    assert_eq!(document.children.len(), 1);

    let if_node = match &document.children[0] {
        Node::ErbIf(if_node) => if_node,
        other => {
            assert!(false, "expected ErbIf, got {}", other.to_sexp());
            return;
        }
    };

    assert_eq!(if_node.statements.len(), 1);
    assert_eq!(text_content(&if_node.statements[0]), "A");

    let else_node = match if_node.subsequent.as_deref() {
        Some(Node::ErbElse(else_node)) => else_node,
        other => {
            assert!(false, "expected ErbElse subsequent, got {:?}", other.map(|n| n.to_sexp()));
            return;
        }
    };

    assert_eq!(else_node.statements.len(), 1);
    assert_eq!(text_content(&else_node.statements[0]), "B");

    assert!(if_node.end_node.is_some());
    assert!(document.all_errors().is_empty());
}

#[test]
fn test_if_without_else() {
    let document = parse("<% if logged_in? %>welcome<% end %>");

    assert!(matches!(&document.children[0], Node::ErbIf(if_node)
        if if_node.subsequent.is_none() && if_node.end_node.is_some()));
    assert!(document.all_errors().is_empty());
}

#[test]
fn test_elsif_chain() {
    let document = parse("<% if a %>A<% elsif b %>B<% else %>C<% end %>");

    let if_node = match &document.children[0] {
        Node::ErbIf(if_node) => if_node,
        _ => {
            assert!(false, "expected ErbIf");
            return;
        }
    };

    let elsif = match if_node.subsequent.as_deref() {
        Some(Node::ErbIf(elsif)) => elsif,
        _ => {
            assert!(false, "expected elsif link");
            return;
        }
    };

    assert_eq!(text_content(&elsif.statements[0]), "B");
    assert!(elsif.end_node.is_none());

    assert!(matches!(elsif.subsequent.as_deref(), Some(Node::ErbElse(else_node))
        if text_content(&else_node.statements[0]) == "C"));

    // The end belongs to the outermost node of the chain.
    assert!(if_node.end_node.is_some());
    assert!(document.all_errors().is_empty());
}

#[test]
fn test_unless_with_else() {
    let document = parse("<% unless hidden %>shown<% else %>hidden<% end %>");

    assert!(matches!(&document.children[0], Node::ErbUnless(unless_node)
        if unless_node.else_clause.is_some() && unless_node.end_node.is_some()));
    assert!(document.all_errors().is_empty());
}

#[test]
fn test_while_loop() {
    let document = parse("<% while queue.any? %>tick<% end %>");

    assert!(matches!(&document.children[0], Node::ErbWhile(while_node)
        if while_node.end_node.is_some() && while_node.statements.len() == 1));
    assert!(document.all_errors().is_empty());
}

#[test]
fn test_until_loop() {
    let document = parse("<% until done? %>tick<% end %>");

    assert!(matches!(&document.children[0], Node::ErbUntil(until_node)
        if until_node.end_node.is_some()));
    assert!(document.all_errors().is_empty());
}

#[test]
fn test_for_loop() {
    let document = parse("<% for item in items %>row<% end %>");

    assert!(matches!(&document.children[0], Node::ErbFor(for_node)
        if for_node.end_node.is_some()));
    assert!(document.all_errors().is_empty());
}

#[test]
fn test_do_block() {
    let document = parse("<% items.each do |item| %>row<% end %>");

    assert!(matches!(&document.children[0], Node::ErbBlock(block_node)
        if block_node.end_node.is_some() && block_node.body.len() == 1));
    assert!(document.all_errors().is_empty());
}

#[test]
fn test_brace_block_with_brace_close() {
    let document = parse("<% items.map { |item| %>row<% } %>");

    assert!(matches!(&document.children[0], Node::ErbBlock(block_node)
        if block_node.end_node.is_some()));
    assert!(document.all_errors().is_empty());
}

#[test]
fn test_begin_rescue_ensure_end() {
    let document = parse("<% begin %>X<% rescue %>Y<% ensure %>Z<% end %>");

    let begin_node = match &document.children[0] {
        Node::ErbBegin(begin_node) => begin_node,
        _ => {
            assert!(false, "expected ErbBegin");
            return;
        }
    };

    assert_eq!(text_content(&begin_node.statements[0]), "X");

    assert!(matches!(begin_node.rescue_clause.as_deref(), Some(rescue)
        if text_content(&rescue.statements[0]) == "Y"));
    assert!(matches!(begin_node.ensure_clause.as_deref(), Some(ensure)
        if text_content(&ensure.statements[0]) == "Z"));
    assert!(begin_node.end_node.is_some());
    assert!(document.all_errors().is_empty());
}

#[test]
fn test_chained_rescues() {
    let document =
        parse("<% begin %>X<% rescue ArgumentError %>A<% rescue KeyError %>B<% end %>");

    let begin_node = match &document.children[0] {
        Node::ErbBegin(begin_node) => begin_node,
        _ => {
            assert!(false, "expected ErbBegin");
            return;
        }
    };

    let first = match begin_node.rescue_clause.as_deref() {
        Some(rescue) => rescue,
        None => {
            assert!(false, "expected rescue clause");
            return;
        }
    };

    assert_eq!(text_content(&first.statements[0]), "A");
    assert!(matches!(first.subsequent.as_deref(), Some(second)
        if text_content(&second.statements[0]) == "B"));
    assert!(document.all_errors().is_empty());
}

#[test]
fn test_case_with_when_arms() {
    let document = parse("<% case status %><% when :a %>A<% when :b %>B<% else %>C<% end %>");

    let case_node = match &document.children[0] {
        Node::ErbCase(case_node) => case_node,
        _ => {
            assert!(false, "expected ErbCase");
            return;
        }
    };

    assert_eq!(case_node.conditions.len(), 2);
    assert_eq!(text_content(&case_node.conditions[0].statements[0]), "A");
    assert_eq!(text_content(&case_node.conditions[1].statements[0]), "B");
    assert!(case_node.else_clause.is_some());
    assert!(case_node.end_node.is_some());
    assert!(document.all_errors().is_empty());
}

#[test]
fn test_inline_case_when_synthesizes_first_arm() {
    let document = parse("<% case status when :a %>A<% when :b %>B<% end %>");

    let case_node = match &document.children[0] {
        Node::ErbCase(case_node) => case_node,
        _ => {
            assert!(false, "expected ErbCase");
            return;
        }
    };

    assert_eq!(case_node.conditions.len(), 2);
    // The first arm is synthetic: it has no tokens of its own.
    assert!(case_node.conditions[0].tag_opening.is_none());
    assert_eq!(text_content(&case_node.conditions[0].statements[0]), "A");
    assert!(case_node.conditions[1].tag_opening.is_some());
}

#[test]
fn test_case_match_with_in_arms() {
    let document = parse("<% case value %><% in [a] %>A<% end %>");

    let case_node = match &document.children[0] {
        Node::ErbCaseMatch(case_node) => case_node,
        other => {
            assert!(false, "expected ErbCaseMatch, got {}", other.to_sexp());
            return;
        }
    };

    assert_eq!(case_node.conditions.len(), 1);
    assert_eq!(text_content(&case_node.conditions[0].statements[0]), "A");
    assert!(case_node.end_node.is_some());
}

#[test]
fn test_case_keeps_html_before_first_arm() {
    let document = parse("<% case status %>lead<% when :a %>A<% end %>");

    let case_node = match &document.children[0] {
        Node::ErbCase(case_node) => case_node,
        _ => {
            assert!(false, "expected ErbCase");
            return;
        }
    };

    assert_eq!(text_content(&case_node.children[0]), "lead");
    assert_eq!(case_node.conditions.len(), 1);
}

#[test]
fn test_nested_if() {
    let document = parse("<% if a %><% if b %>X<% end %><% end %>");

    let outer = match &document.children[0] {
        Node::ErbIf(outer) => outer,
        _ => {
            assert!(false, "expected outer ErbIf");
            return;
        }
    };

    assert!(matches!(&outer.statements[0], Node::ErbIf(inner)
        if inner.end_node.is_some() && text_content(&inner.statements[0]) == "X"));
    assert!(outer.end_node.is_some());
    assert!(document.all_errors().is_empty());
}

#[test]
fn test_nested_yield_becomes_node() {
    let document = parse("<% if a %><%= yield %><% end %>");

    let if_node = match &document.children[0] {
        Node::ErbIf(if_node) => if_node,
        _ => {
            assert!(false, "expected ErbIf");
            return;
        }
    };

    assert!(matches!(&if_node.statements[0], Node::ErbYield(_)));
}

#[test]
fn test_top_level_yield_becomes_node() {
    let document = parse("<%= yield %>");

    assert!(matches!(&document.children[0], Node::ErbYield(_)));
    assert!(document.all_errors().is_empty());
}

#[test]
fn test_unterminated_if_keeps_following_siblings_outside() {
    let document = parse("<% if x %>A");

    let if_node = match &document.children[0] {
        Node::ErbIf(if_node) => if_node,
        _ => {
            assert!(false, "expected ErbIf");
            return;
        }
    };

    assert!(if_node.end_node.is_none());
    assert!(if_node
        .errors
        .iter()
        .any(|error| error.kind() == "MISSING_ERB_END"));
}

#[test]
fn test_stray_end_passes_through() {
    let document = parse("<% end %>");

    assert!(matches!(&document.children[0], Node::ErbContent(_)));
}

#[test]
fn test_html_between_fragments_nests_into_statements() {
    let document = parse("<ul><% if any? %><li>x</li><% end %></ul>");

    let element = match &document.children[0] {
        Node::HtmlElement(element) => element,
        other => {
            assert!(false, "expected HtmlElement, got {}", other.to_sexp());
            return;
        }
    };

    assert_eq!(element.tag_name.value.as_ref(), "ul");

    let if_node = match &element.body[0] {
        Node::ErbIf(if_node) => if_node,
        other => {
            assert!(false, "expected ErbIf in body, got {}", other.to_sexp());
            return;
        }
    };

    assert!(matches!(&if_node.statements[0], Node::HtmlElement(li)
        if li.tag_name.value.as_ref() == "li"));
    assert!(document.all_errors().is_empty());
}
