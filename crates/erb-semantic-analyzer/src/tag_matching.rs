//! Post-analyze HTML tag matching.
//!
//! The parser leaves every tag bare so the rewrite passes can reason
//! about asymmetric template wrapping. Once those passes are done, the
//! bare tags that remain pair up into elements here: depth-aware and
//! case-insensitive within each sibling sequence. An open tag with no
//! close becomes an unclosed element with a missing-closing-tag error —
//! but only in document or element context, where real HTML structure is
//! expected; tags living inside template control arms were already
//! vetted by the conditional-element passes and stay as they are.

use erb_ast::{DocumentNode, ElementSource, HtmlElementNode, Node};
use erb_error::AnalyzeError;
use erb_position_tracking::Location;
use erb_token::TokenKind;

/// Runs tag matching over the whole document.
pub fn match_tags(document: &mut DocumentNode) {
    let children = std::mem::take(&mut document.children);
    document.children = pair_array(children, true);
}

fn pair_array(mut nodes: Vec<Node>, emit_errors: bool) -> Vec<Node> {
    for node in &mut nodes {
        recurse(node);
    }

    pair_bare_tags(nodes, emit_errors)
}

fn recurse(node: &mut Node) {
    match node {
        Node::HtmlElement(element) => {
            element.body = pair_array(std::mem::take(&mut element.body), true);
        }
        Node::HtmlConditionalElement(conditional) => {
            conditional.body = pair_array(std::mem::take(&mut conditional.body), true);
            recurse(&mut conditional.open_conditional);
            recurse(&mut conditional.close_conditional);
        }
        Node::HtmlConditionalOpenTag(tag) => recurse(&mut tag.conditional),
        Node::ErbIf(if_node) => {
            if_node.statements = pair_array(std::mem::take(&mut if_node.statements), false);
            if let Some(subsequent) = &mut if_node.subsequent {
                recurse(subsequent);
            }
        }
        Node::ErbElse(else_node) => {
            else_node.statements = pair_array(std::mem::take(&mut else_node.statements), false);
        }
        Node::ErbUnless(unless_node) => {
            unless_node.statements =
                pair_array(std::mem::take(&mut unless_node.statements), false);
            if let Some(else_clause) = &mut unless_node.else_clause {
                else_clause.statements =
                    pair_array(std::mem::take(&mut else_clause.statements), false);
            }
        }
        Node::ErbCase(case_node) => {
            case_node.children = pair_array(std::mem::take(&mut case_node.children), false);
            for condition in &mut case_node.conditions {
                condition.statements =
                    pair_array(std::mem::take(&mut condition.statements), false);
            }
            if let Some(else_clause) = &mut case_node.else_clause {
                else_clause.statements =
                    pair_array(std::mem::take(&mut else_clause.statements), false);
            }
        }
        Node::ErbCaseMatch(case_node) => {
            case_node.children = pair_array(std::mem::take(&mut case_node.children), false);
            for condition in &mut case_node.conditions {
                condition.statements =
                    pair_array(std::mem::take(&mut condition.statements), false);
            }
            if let Some(else_clause) = &mut case_node.else_clause {
                else_clause.statements =
                    pair_array(std::mem::take(&mut else_clause.statements), false);
            }
        }
        Node::ErbWhen(when_node) => {
            when_node.statements = pair_array(std::mem::take(&mut when_node.statements), false);
        }
        Node::ErbIn(in_node) => {
            in_node.statements = pair_array(std::mem::take(&mut in_node.statements), false);
        }
        Node::ErbWhile(while_node) => {
            while_node.statements =
                pair_array(std::mem::take(&mut while_node.statements), false);
        }
        Node::ErbUntil(until_node) => {
            until_node.statements =
                pair_array(std::mem::take(&mut until_node.statements), false);
        }
        Node::ErbFor(for_node) => {
            for_node.statements = pair_array(std::mem::take(&mut for_node.statements), false);
        }
        Node::ErbBlock(block_node) => {
            block_node.body = pair_array(std::mem::take(&mut block_node.body), false);
        }
        Node::ErbBegin(begin_node) => {
            begin_node.statements =
                pair_array(std::mem::take(&mut begin_node.statements), false);
            if let Some(rescue) = &mut begin_node.rescue_clause {
                recurse_rescue(rescue);
            }
            if let Some(else_clause) = &mut begin_node.else_clause {
                else_clause.statements =
                    pair_array(std::mem::take(&mut else_clause.statements), false);
            }
            if let Some(ensure) = &mut begin_node.ensure_clause {
                ensure.statements = pair_array(std::mem::take(&mut ensure.statements), false);
            }
        }
        Node::ErbRescue(rescue_node) => recurse_rescue(rescue_node),
        Node::ErbEnsure(ensure_node) => {
            ensure_node.statements =
                pair_array(std::mem::take(&mut ensure_node.statements), false);
        }
        _ => {}
    }
}

fn recurse_rescue(rescue: &mut erb_ast::ErbRescueNode) {
    rescue.statements = pair_array(std::mem::take(&mut rescue.statements), false);
    if let Some(subsequent) = &mut rescue.subsequent {
        recurse_rescue(subsequent);
    }
}

fn pair_bare_tags(nodes: Vec<Node>, emit_errors: bool) -> Vec<Node> {
    let mut slots: Vec<Option<Node>> = nodes.into_iter().map(Some).collect();

    for index in 0..slots.len() {
        let (tag_name, self_contained) = match &slots[index] {
            Some(Node::HtmlOpenTag(tag)) => {
                (tag.tag_name.value.to_string(), tag.is_void || is_self_closing(tag))
            }
            _ => continue,
        };

        let open_tag = match slots[index].take() {
            Some(Node::HtmlOpenTag(tag)) => tag,
            _ => continue,
        };

        if self_contained {
            let location = open_tag.location;
            let tag_name_token = open_tag.tag_name.clone();

            slots[index] = Some(Node::HtmlElement(HtmlElementNode {
                open_tag: Box::new(Node::HtmlOpenTag(open_tag)),
                tag_name: tag_name_token,
                body: Vec::new(),
                close_tag: None,
                is_void: true,
                source: ElementSource::Html,
                location,
                errors: Vec::new(),
            }));
            continue;
        }

        match find_matching_close(&slots, index, &tag_name) {
            Some(close_index) => {
                let mut body = Vec::new();
                for slot in slots.iter_mut().take(close_index).skip(index + 1) {
                    if let Some(node) = slot.take() {
                        body.push(node);
                    }
                }

                // Same-name pairs captured into the body pair up among
                // themselves.
                let body = pair_bare_tags(body, emit_errors);

                let close_tag = match slots[close_index].take() {
                    Some(node) => node,
                    None => continue,
                };

                let location = Location::new(open_tag.location.start, close_tag.location().end);
                let tag_name_token = open_tag.tag_name.clone();

                slots[index] = Some(Node::HtmlElement(HtmlElementNode {
                    open_tag: Box::new(Node::HtmlOpenTag(open_tag)),
                    tag_name: tag_name_token,
                    body,
                    close_tag: Some(Box::new(close_tag)),
                    is_void: false,
                    source: ElementSource::Html,
                    location,
                    errors: Vec::new(),
                }));
            }
            None => {
                let location = open_tag.location;
                let tag_name_token = open_tag.tag_name.clone();
                let mut errors = Vec::new();

                if emit_errors {
                    errors.push(AnalyzeError::MissingClosingTag {
                        tag_name: tag_name_token.value.to_string(),
                        location,
                    });
                }

                slots[index] = Some(Node::HtmlElement(HtmlElementNode {
                    open_tag: Box::new(Node::HtmlOpenTag(open_tag)),
                    tag_name: tag_name_token,
                    body: Vec::new(),
                    close_tag: None,
                    is_void: false,
                    source: ElementSource::Html,
                    location,
                    errors,
                }));
            }
        }
    }

    slots.into_iter().flatten().collect()
}

fn is_self_closing(tag: &erb_ast::HtmlOpenTagNode) -> bool {
    tag.tag_closing
        .as_ref()
        .is_some_and(|token| token.kind == TokenKind::HtmlTagSelfClose)
}

/// Depth-aware close-tag search among bare tags in the sequence.
fn find_matching_close(slots: &[Option<Node>], start: usize, tag_name: &str) -> Option<usize> {
    let mut depth = 0usize;

    for (index, slot) in slots.iter().enumerate().skip(start + 1) {
        match slot {
            Some(Node::HtmlOpenTag(tag)) => {
                if !tag.is_void && tag.tag_name.value.eq_ignore_ascii_case(tag_name) {
                    depth += 1;
                }
            }
            Some(Node::HtmlCloseTag(tag)) => {
                if tag.tag_name.value.eq_ignore_ascii_case(tag_name) {
                    if depth == 0 {
                        return Some(index);
                    }
                    depth -= 1;
                }
            }
            _ => {}
        }
    }

    None
}
