//! Surface parse-error attachment.
//!
//! After the structural passes, the concatenated embedded code is parsed
//! once as a whole (separated by `;` at each region closer). Diagnostics
//! that point at a synthetic separator are re-checked against the
//! enclosing fragment alone; everything else lands on the document root
//! with its position mapped back to the source.

use crate::extract;
use erb_ast::{DocumentNode, ErbContentNode, Node};
use erb_error::AnalyzeError;
use erb_position_tracking::{LineIndex, Location};

/// Runs the lift over the whole document.
pub fn analyze(document: &mut DocumentNode, source: &str) {
    let extracted = extract::ruby_with_semicolons(source);

    if extracted.trim().is_empty() {
        return;
    }

    let result = erb_ruby::parse_partial(&extracted);
    let line_index = LineIndex::new(&extracted);
    let source_bytes = source.as_bytes();
    let extracted_bytes = extracted.as_bytes();

    for diagnostic in &result.diagnostics {
        let offset = diagnostic.span.start;

        // A complaint about a separator we inserted is not a complaint
        // about the source; re-parse the fragment it terminates on its
        // own and let the fragment carry the verdict.
        if diagnostic.message.contains("unexpected ';'")
            && extracted_bytes.get(offset) == Some(&b';')
            && source_bytes.get(offset) != Some(&b';')
        {
            if let Some(fragment) = find_fragment_at(&mut document.children, offset) {
                attach_fragment_errors(fragment);
                continue;
            }
        }

        let location = Location::new(
            line_index.position_at(diagnostic.span.start),
            line_index.position_at(diagnostic.span.end),
        );

        let error = AnalyzeError::RubyParseError { message: diagnostic.message.clone(), location };

        if !document.errors.contains(&error) {
            document.errors.push(error);
        }
    }
}

/// Re-parses one fragment in partial-script mode and attaches its first
/// diagnostic.
fn attach_fragment_errors(fragment: &mut ErbContentNode) {
    let code = match &fragment.content {
        Some(token) if !token.value.is_empty() => token.value.clone(),
        _ => return,
    };

    let result = erb_ruby::parse_partial(&code);

    if let Some(first) = result.diagnostics.first() {
        let error = AnalyzeError::RubyParseError {
            message: first.message.clone(),
            location: fragment.location,
        };

        if !fragment.errors.contains(&error) {
            fragment.errors.push(error);
        }
    }
}

/// Byte span a fragment covers, from its opener through its closer.
fn fragment_span_contains(fragment: &ErbContentNode, offset: usize) -> bool {
    let start = fragment.tag_opening.span.start;
    let end = fragment
        .tag_closing
        .as_ref()
        .map(|token| token.span.end)
        .or_else(|| fragment.content.as_ref().map(|token| token.span.end))
        .unwrap_or(fragment.tag_opening.span.end);

    offset >= start && offset < end
}

fn find_fragment_at(nodes: &mut [Node], offset: usize) -> Option<&mut ErbContentNode> {
    for node in nodes.iter_mut() {
        if let Some(found) = find_in_node(node, offset) {
            return Some(found);
        }
    }
    None
}

fn find_in_node(node: &mut Node, offset: usize) -> Option<&mut ErbContentNode> {
    match node {
        Node::ErbContent(content) => {
            if fragment_span_contains(content, offset) {
                Some(content)
            } else {
                None
            }
        }
        Node::HtmlElement(element) => find_fragment_at(&mut element.body, offset),
        Node::HtmlConditionalElement(conditional) => {
            if let Some(found) = find_in_node(&mut conditional.open_conditional, offset) {
                return Some(found);
            }
            if let Some(found) = find_fragment_at(&mut conditional.body, offset) {
                return Some(found);
            }
            find_in_node(&mut conditional.close_conditional, offset)
        }
        Node::HtmlConditionalOpenTag(tag) => find_in_node(&mut tag.conditional, offset),
        Node::ErbIf(if_node) => {
            if let Some(found) = find_fragment_at(&mut if_node.statements, offset) {
                return Some(found);
            }
            if_node
                .subsequent
                .as_deref_mut()
                .and_then(|subsequent| find_in_node(subsequent, offset))
        }
        Node::ErbElse(else_node) => find_fragment_at(&mut else_node.statements, offset),
        Node::ErbUnless(unless_node) => {
            if let Some(found) = find_fragment_at(&mut unless_node.statements, offset) {
                return Some(found);
            }
            unless_node
                .else_clause
                .as_deref_mut()
                .and_then(|else_clause| find_fragment_at(&mut else_clause.statements, offset))
        }
        Node::ErbCase(case_node) => {
            if let Some(found) = find_fragment_at(&mut case_node.children, offset) {
                return Some(found);
            }
            for condition in &mut case_node.conditions {
                if let Some(found) = find_fragment_at(&mut condition.statements, offset) {
                    return Some(found);
                }
            }
            case_node
                .else_clause
                .as_deref_mut()
                .and_then(|else_clause| find_fragment_at(&mut else_clause.statements, offset))
        }
        Node::ErbCaseMatch(case_node) => {
            if let Some(found) = find_fragment_at(&mut case_node.children, offset) {
                return Some(found);
            }
            for condition in &mut case_node.conditions {
                if let Some(found) = find_fragment_at(&mut condition.statements, offset) {
                    return Some(found);
                }
            }
            case_node
                .else_clause
                .as_deref_mut()
                .and_then(|else_clause| find_fragment_at(&mut else_clause.statements, offset))
        }
        Node::ErbWhen(when_node) => find_fragment_at(&mut when_node.statements, offset),
        Node::ErbIn(in_node) => find_fragment_at(&mut in_node.statements, offset),
        Node::ErbWhile(while_node) => find_fragment_at(&mut while_node.statements, offset),
        Node::ErbUntil(until_node) => find_fragment_at(&mut until_node.statements, offset),
        Node::ErbFor(for_node) => find_fragment_at(&mut for_node.statements, offset),
        Node::ErbBlock(block_node) => find_fragment_at(&mut block_node.body, offset),
        Node::ErbBegin(begin_node) => {
            if let Some(found) = find_fragment_at(&mut begin_node.statements, offset) {
                return Some(found);
            }
            if let Some(rescue) = &mut begin_node.rescue_clause {
                if let Some(found) = find_in_rescue(rescue, offset) {
                    return Some(found);
                }
            }
            if let Some(else_clause) = &mut begin_node.else_clause {
                if let Some(found) = find_fragment_at(&mut else_clause.statements, offset) {
                    return Some(found);
                }
            }
            begin_node
                .ensure_clause
                .as_deref_mut()
                .and_then(|ensure| find_fragment_at(&mut ensure.statements, offset))
        }
        Node::ErbRescue(rescue_node) => find_in_rescue(rescue_node, offset),
        Node::ErbEnsure(ensure_node) => find_fragment_at(&mut ensure_node.statements, offset),
        _ => None,
    }
}

fn find_in_rescue(rescue: &mut erb_ast::ErbRescueNode, offset: usize) -> Option<&mut ErbContentNode> {
    if let Some(found) = find_fragment_at(&mut rescue.statements, offset) {
        return Some(found);
    }
    rescue
        .subsequent
        .as_deref_mut()
        .and_then(|subsequent| find_in_rescue(subsequent, offset))
}
