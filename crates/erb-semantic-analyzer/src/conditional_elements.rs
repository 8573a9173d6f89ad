//! Conditional-element recognition (pass 3).
//!
//! Detects matching open/close HTML tags wrapped in `if`/`unless`
//! fragments that share the same condition, and folds both wrappers plus
//! everything between them into an [`HtmlConditionalElementNode`].
//! Wrappers whose conditions differ stay untouched and raise a
//! condition-mismatch diagnostic on the document instead.

use erb_ast::{DocumentNode, ElementSource, HtmlConditionalElementNode, Node};
use erb_error::AnalyzeError;
use erb_position_tracking::Location;

/// Runs the pass over every sibling sequence in the document.
pub fn transform(document: &mut DocumentNode) {
    let DocumentNode { children, errors, .. } = document;
    transform_array(children, errors);
}

fn transform_array(nodes: &mut Vec<Node>, errors: &mut Vec<AnalyzeError>) {
    for child in nodes.iter_mut() {
        transform_node(child, errors);
    }

    rewrite_conditional_elements(nodes, errors);
}

fn transform_node(node: &mut Node, errors: &mut Vec<AnalyzeError>) {
    match node {
        Node::HtmlElement(element) => transform_array(&mut element.body, errors),
        Node::HtmlConditionalElement(conditional) => transform_array(&mut conditional.body, errors),
        Node::ErbIf(if_node) => {
            transform_array(&mut if_node.statements, errors);
            if let Some(subsequent) = &mut if_node.subsequent {
                transform_node(subsequent, errors);
            }
        }
        Node::ErbElse(else_node) => transform_array(&mut else_node.statements, errors),
        Node::ErbUnless(unless_node) => {
            transform_array(&mut unless_node.statements, errors);
            if let Some(else_clause) = &mut unless_node.else_clause {
                transform_array(&mut else_clause.statements, errors);
            }
        }
        Node::ErbBlock(block_node) => transform_array(&mut block_node.body, errors),
        Node::ErbWhile(while_node) => transform_array(&mut while_node.statements, errors),
        Node::ErbUntil(until_node) => transform_array(&mut until_node.statements, errors),
        Node::ErbFor(for_node) => transform_array(&mut for_node.statements, errors),
        Node::ErbCase(case_node) => {
            transform_array(&mut case_node.children, errors);
            for condition in &mut case_node.conditions {
                transform_array(&mut condition.statements, errors);
            }
            if let Some(else_clause) = &mut case_node.else_clause {
                transform_array(&mut else_clause.statements, errors);
            }
        }
        Node::ErbCaseMatch(case_node) => {
            transform_array(&mut case_node.children, errors);
            for condition in &mut case_node.conditions {
                transform_array(&mut condition.statements, errors);
            }
            if let Some(else_clause) = &mut case_node.else_clause {
                transform_array(&mut else_clause.statements, errors);
            }
        }
        Node::ErbWhen(when_node) => transform_array(&mut when_node.statements, errors),
        Node::ErbIn(in_node) => transform_array(&mut in_node.statements, errors),
        Node::ErbBegin(begin_node) => {
            transform_array(&mut begin_node.statements, errors);
            if let Some(rescue) = &mut begin_node.rescue_clause {
                transform_rescue(rescue, errors);
            }
            if let Some(else_clause) = &mut begin_node.else_clause {
                transform_array(&mut else_clause.statements, errors);
            }
            if let Some(ensure) = &mut begin_node.ensure_clause {
                transform_array(&mut ensure.statements, errors);
            }
        }
        Node::ErbRescue(rescue_node) => transform_rescue_inner(rescue_node, errors),
        Node::ErbEnsure(ensure_node) => transform_array(&mut ensure_node.statements, errors),
        _ => {}
    }
}

fn transform_rescue(rescue: &mut erb_ast::ErbRescueNode, errors: &mut Vec<AnalyzeError>) {
    transform_rescue_inner(rescue, errors);
}

fn transform_rescue_inner(rescue: &mut erb_ast::ErbRescueNode, errors: &mut Vec<AnalyzeError>) {
    transform_array(&mut rescue.statements, errors);
    if let Some(subsequent) = &mut rescue.subsequent {
        transform_rescue_inner(subsequent, errors);
    }
}

/// A wrapper on the open stack: an `if`/`unless` whose statements hold
/// exactly one open tag.
struct OpenEntry {
    index: usize,
    tag_name: String,
    condition: Option<String>,
    is_if: bool,
}

fn rewrite_conditional_elements(nodes: &mut Vec<Node>, errors: &mut Vec<AnalyzeError>) {
    if nodes.is_empty() {
        return;
    }

    report_multiple_tag_pairs(nodes, errors);

    let mut slots: Vec<Option<Node>> =
        std::mem::take(nodes).into_iter().map(Some).collect();

    // Left-to-right stack of wrappers that contain a single open tag.
    let mut open_stack: Vec<OpenEntry> = Vec::new();

    for (index, slot) in slots.iter().enumerate() {
        let node = match slot {
            Some(node) => node,
            None => continue,
        };

        if !is_simple_conditional(node) {
            continue;
        }

        let statements = match conditional_statements(node) {
            Some(statements) => statements,
            None => continue,
        };

        if let Some(tag_index) = single_open_tag_index(statements) {
            let tag_name = match &statements[tag_index] {
                Node::HtmlOpenTag(tag) => tag.tag_name.value.to_string(),
                _ => continue,
            };
            let (is_if, condition) = extract_condition(node);
            open_stack.push(OpenEntry { index, tag_name, condition, is_if });
        }
    }

    for node_index in 0..slots.len() {
        let (close_tag_name, close_is_if, close_condition) = {
            let node = match &slots[node_index] {
                Some(node) => node,
                None => continue,
            };

            if !is_simple_conditional(node) {
                continue;
            }

            let statements = match conditional_statements(node) {
                Some(statements) => statements,
                None => continue,
            };

            let close_index = match single_close_tag_index(statements) {
                Some(close_index) => close_index,
                None => continue,
            };

            let tag_name = match &statements[close_index] {
                Node::HtmlCloseTag(tag) => tag.tag_name.value.to_string(),
                _ => continue,
            };

            let (is_if, condition) = extract_condition(node);
            (tag_name, is_if, condition)
        };

        let mut matched: Option<usize> = None;
        let mut mismatched: Option<usize> = None;

        for stack_index in (0..open_stack.len()).rev() {
            let entry = &open_stack[stack_index];

            if !entry.tag_name.eq_ignore_ascii_case(&close_tag_name) {
                continue;
            }

            if entry.is_if != close_is_if {
                continue;
            }

            let equivalent = match (&entry.condition, &close_condition) {
                (Some(open), Some(close)) => open == close,
                _ => false,
            };

            if !equivalent {
                if mismatched.is_none() && entry.index < node_index {
                    mismatched = Some(stack_index);
                }
                continue;
            }

            mismatched = None;

            if entry.index >= node_index {
                continue;
            }

            matched = Some(stack_index);
            break;
        }

        if matched.is_none() {
            if let Some(stack_index) = mismatched {
                let entry = &open_stack[stack_index];
                let open_location = slots[entry.index]
                    .as_ref()
                    .map(|node| node.location())
                    .unwrap_or_default();
                let close_location = slots[node_index]
                    .as_ref()
                    .map(|node| node.location())
                    .unwrap_or_default();

                let error = AnalyzeError::ConditionalElementConditionMismatch {
                    tag_name: entry.tag_name.clone(),
                    open_condition: entry.condition.clone().unwrap_or_default(),
                    open_position: open_location.start,
                    close_condition: close_condition.clone().unwrap_or_default(),
                    close_position: close_location.start,
                    location: Location::new(open_location.start, close_location.end),
                };
                if !errors.contains(&error) {
                    errors.push(error);
                }
            }
            continue;
        }

        let stack_index = match matched {
            Some(stack_index) => stack_index,
            None => continue,
        };

        // Pop the matched entry and everything above it: wrappers above
        // the match are consumed into the rewritten body.
        let entry = open_stack.swap_remove(stack_index);
        open_stack.truncate(stack_index);

        let mut open_conditional = match slots[entry.index].take() {
            Some(node) => node,
            None => continue,
        };

        let open_tag = match take_single_open_tag(&mut open_conditional) {
            Some(open_tag) => open_tag,
            None => {
                slots[entry.index] = Some(open_conditional);
                continue;
            }
        };

        let mut body = Vec::new();
        for slot in slots.iter_mut().take(node_index).skip(entry.index + 1) {
            if let Some(node) = slot.take() {
                body.push(node);
            }
        }

        let mut close_conditional = match slots[node_index].take() {
            Some(node) => node,
            None => continue,
        };
        let close_tag = match take_single_close_tag(&mut close_conditional) {
            Some(close_tag) => close_tag,
            None => {
                slots[node_index] = Some(close_conditional);
                continue;
            }
        };

        let tag_name = match &open_tag {
            Node::HtmlOpenTag(tag) => tag.tag_name.clone(),
            _ => continue,
        };

        let location =
            Location::new(open_conditional.location().start, close_conditional.location().end);

        slots[entry.index] = Some(Node::HtmlConditionalElement(HtmlConditionalElementNode {
            condition: entry.condition.unwrap_or_default(),
            open_conditional: Box::new(open_conditional),
            open_tag: Box::new(open_tag),
            body,
            close_tag: Box::new(close_tag),
            close_conditional: Box::new(close_conditional),
            tag_name,
            source: ElementSource::Html,
            location,
            errors: Vec::new(),
        }));
    }

    *nodes = slots.into_iter().flatten().collect();
}

/// Two simple wrappers that share kind and condition but each hold
/// several open tags: flagged once per pair, without preventing later
/// rewrites.
fn report_multiple_tag_pairs(nodes: &[Node], errors: &mut Vec<AnalyzeError>) {
    for open_index in 0..nodes.len() {
        let open_node = &nodes[open_index];

        if !is_simple_conditional(open_node) {
            continue;
        }

        let open_statements = match conditional_statements(open_node) {
            Some(statements) => statements,
            None => continue,
        };

        let open_tag_count = count_open_tags(open_statements);
        if open_tag_count < 2 {
            continue;
        }
        if open_tag_count <= count_close_tags(open_statements) {
            continue;
        }

        let (open_is_if, open_condition) = extract_condition(open_node);
        let open_condition = match open_condition {
            Some(condition) => condition,
            None => continue,
        };

        for close_node in nodes.iter().skip(open_index + 1) {
            if !is_simple_conditional(close_node) {
                continue;
            }

            let close_statements = match conditional_statements(close_node) {
                Some(statements) => statements,
                None => continue,
            };

            let close_tag_count = count_close_tags(close_statements);
            if close_tag_count < 2 {
                continue;
            }
            if close_tag_count <= count_open_tags(close_statements) {
                continue;
            }

            let (close_is_if, close_condition) = extract_condition(close_node);
            let close_condition = match close_condition {
                Some(condition) => condition,
                None => continue,
            };

            if open_is_if == close_is_if && open_condition == close_condition {
                let location = open_node.location();
                let error = AnalyzeError::ConditionalElementMultipleTags {
                    line: location.start.line,
                    column: location.start.column,
                    location,
                };
                if !errors.contains(&error) {
                    errors.push(error);
                }
                break;
            }
        }
    }
}

/// A wrapper with no chain: an `if` without subsequent branches or an
/// `unless` without an `else`.
pub(crate) fn is_simple_conditional(node: &Node) -> bool {
    match node {
        Node::ErbIf(if_node) => if_node.subsequent.is_none(),
        Node::ErbUnless(unless_node) => unless_node.else_clause.is_none(),
        _ => false,
    }
}

pub(crate) fn conditional_statements(node: &Node) -> Option<&Vec<Node>> {
    match node {
        Node::ErbIf(if_node) => Some(&if_node.statements),
        Node::ErbUnless(unless_node) => Some(&unless_node.statements),
        _ => None,
    }
}

fn conditional_statements_mut(node: &mut Node) -> Option<&mut Vec<Node>> {
    match node {
        Node::ErbIf(if_node) => Some(&mut if_node.statements),
        Node::ErbUnless(unless_node) => Some(&mut unless_node.statements),
        _ => None,
    }
}

/// The stripped condition text of a wrapper, plus whether it is an `if`.
pub(crate) fn extract_condition(node: &Node) -> (bool, Option<String>) {
    let (is_if, content) = match node {
        Node::ErbIf(if_node) => (true, &if_node.content),
        Node::ErbUnless(unless_node) => (false, &unless_node.content),
        _ => return (true, None),
    };

    let content = match content {
        Some(token) => token.value.as_ref(),
        None => return (is_if, None),
    };

    let mut text = content.trim_start();
    let keyword = if is_if { "if" } else { "unless" };

    if let Some(rest) = text.strip_prefix(keyword) {
        if rest.starts_with(char::is_whitespace) {
            text = rest;
        }
    }

    let text = text.trim();

    if text.is_empty() {
        (is_if, None)
    } else {
        (is_if, Some(text.to_string()))
    }
}

pub(crate) fn is_insignificant(node: &Node) -> bool {
    match node {
        Node::Whitespace(_) => true,
        Node::HtmlText(text) => text.content.chars().all(char::is_whitespace),
        _ => false,
    }
}

/// Index of the statement holding the wrapper's single non-void open
/// tag, when the statements contain exactly one and nothing else
/// significant.
fn single_open_tag_index(statements: &[Node]) -> Option<usize> {
    if statements.is_empty() {
        return None;
    }

    let mut found = None;

    for (index, child) in statements.iter().enumerate() {
        if is_insignificant(child) {
            continue;
        }

        match child {
            Node::HtmlOpenTag(tag) => {
                if tag.is_void || found.is_some() {
                    return None;
                }
                found = Some(index);
            }
            _ => return None,
        }
    }

    found
}

/// Index of the statement holding the wrapper's single close tag.
fn single_close_tag_index(statements: &[Node]) -> Option<usize> {
    if statements.is_empty() {
        return None;
    }

    let mut found = None;

    for (index, child) in statements.iter().enumerate() {
        if is_insignificant(child) {
            continue;
        }

        match child {
            Node::HtmlCloseTag(_) => {
                if found.is_some() {
                    return None;
                }
                found = Some(index);
            }
            _ => return None,
        }
    }

    found
}

fn count_open_tags(statements: &[Node]) -> usize {
    statements
        .iter()
        .filter(|node| matches!(node, Node::HtmlOpenTag(tag) if !tag.is_void))
        .count()
}

fn count_close_tags(statements: &[Node]) -> usize {
    statements.iter().filter(|node| matches!(node, Node::HtmlCloseTag(_))).count()
}

fn take_single_open_tag(wrapper: &mut Node) -> Option<Node> {
    let statements = conditional_statements_mut(wrapper)?;
    let index = single_open_tag_index(statements)?;
    Some(statements.remove(index))
}

fn take_single_close_tag(wrapper: &mut Node) -> Option<Node> {
    let statements = conditional_statements_mut(wrapper)?;
    let index = single_close_tag_index(statements)?;
    Some(statements.remove(index))
}
