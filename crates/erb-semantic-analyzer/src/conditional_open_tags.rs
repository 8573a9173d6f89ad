//! Conditional-open-tag recognition (pass 4).
//!
//! Detects `if/elsif*/else` (or `unless/else`) chains where every branch
//! contributes exactly one open tag of the same name, finds the matching
//! unconditional close tag later in the sibling sequence, and folds the
//! whole span into an element whose opener is the conditional chain.
//! Runs after conditional-element recognition, so tags that pass already
//! consumed are out of reach.

use erb_ast::{
    DocumentNode, ElementSource, ErbIfNode, ErbUnlessNode, HtmlConditionalOpenTagNode,
    HtmlElementNode, Node,
};
use erb_error::AnalyzeError;
use erb_position_tracking::Location;
use erb_token::Token;

/// Runs the pass over every sibling sequence in the document.
pub fn transform(document: &mut DocumentNode) {
    transform_array(&mut document.children);
}

fn transform_array(nodes: &mut Vec<Node>) {
    for child in nodes.iter_mut() {
        transform_node(child);
    }

    rewrite_conditional_open_tags(nodes);
}

fn transform_node(node: &mut Node) {
    match node {
        Node::HtmlElement(element) => transform_array(&mut element.body),
        Node::HtmlConditionalElement(conditional) => transform_array(&mut conditional.body),
        Node::ErbIf(if_node) => {
            transform_array(&mut if_node.statements);
            if let Some(subsequent) = &mut if_node.subsequent {
                transform_node(subsequent);
            }
        }
        Node::ErbElse(else_node) => transform_array(&mut else_node.statements),
        Node::ErbUnless(unless_node) => {
            transform_array(&mut unless_node.statements);
            if let Some(else_clause) = &mut unless_node.else_clause {
                transform_array(&mut else_clause.statements);
            }
        }
        Node::ErbBlock(block_node) => transform_array(&mut block_node.body),
        Node::ErbWhile(while_node) => transform_array(&mut while_node.statements),
        Node::ErbUntil(until_node) => transform_array(&mut until_node.statements),
        Node::ErbFor(for_node) => transform_array(&mut for_node.statements),
        Node::ErbCase(case_node) => {
            transform_array(&mut case_node.children);
            for condition in &mut case_node.conditions {
                transform_array(&mut condition.statements);
            }
            if let Some(else_clause) = &mut case_node.else_clause {
                transform_array(&mut else_clause.statements);
            }
        }
        Node::ErbCaseMatch(case_node) => {
            transform_array(&mut case_node.children);
            for condition in &mut case_node.conditions {
                transform_array(&mut condition.statements);
            }
            if let Some(else_clause) = &mut case_node.else_clause {
                transform_array(&mut else_clause.statements);
            }
        }
        Node::ErbWhen(when_node) => transform_array(&mut when_node.statements),
        Node::ErbIn(in_node) => transform_array(&mut in_node.statements),
        Node::ErbBegin(begin_node) => {
            transform_array(&mut begin_node.statements);
            if let Some(rescue) = &mut begin_node.rescue_clause {
                transform_rescue(rescue);
            }
            if let Some(else_clause) = &mut begin_node.else_clause {
                transform_array(&mut else_clause.statements);
            }
            if let Some(ensure) = &mut begin_node.ensure_clause {
                transform_array(&mut ensure.statements);
            }
        }
        Node::ErbRescue(rescue_node) => transform_rescue(rescue_node),
        Node::ErbEnsure(ensure_node) => transform_array(&mut ensure_node.statements),
        _ => {}
    }
}

fn transform_rescue(rescue: &mut erb_ast::ErbRescueNode) {
    transform_array(&mut rescue.statements);
    if let Some(subsequent) = &mut rescue.subsequent {
        transform_rescue(subsequent);
    }
}

/// Result of scanning one branch for its single open tag.
#[derive(Debug, Default)]
struct SingleTagScan {
    /// Index of the branch's single qualifying open tag
    tag_index: Option<usize>,
    /// Index of the disqualifying second tag, when present
    second_index: Option<usize>,
    has_multiple: bool,
}

fn rewrite_conditional_open_tags(nodes: &mut Vec<Node>) {
    if nodes.is_empty() {
        return;
    }

    let mut slots: Vec<Option<Node>> = std::mem::take(nodes).into_iter().map(Some).collect();

    for index in 0..slots.len() {
        let tag_name = {
            let node = match slots[index].as_mut() {
                Some(node) => node,
                None => continue,
            };

            match node {
                Node::ErbIf(if_node) => match check_if_chain(if_node) {
                    Some(name) => Some(name),
                    None => {
                        report_multiple_tags_in_if(if_node);
                        None
                    }
                },
                Node::ErbUnless(unless_node) => match check_unless_chain(unless_node) {
                    Some(name) => Some(name),
                    None => {
                        report_multiple_tags_in_unless(unless_node);
                        None
                    }
                },
                _ => None,
            }
        };

        let tag_name = match tag_name {
            Some(tag_name) => tag_name,
            None => continue,
        };

        let tag_name_token = match slots[index].as_ref().and_then(first_branch_tag_token) {
            Some(token) => token,
            None => continue,
        };

        let close_index = match find_matching_close_tag(&slots, index, &tag_name) {
            Some(close_index) => close_index,
            None => continue,
        };

        let conditional_node = match slots[index].take() {
            Some(node) => node,
            None => continue,
        };

        let mut body = Vec::new();
        for slot in slots.iter_mut().take(close_index).skip(index + 1) {
            if let Some(node) = slot.take() {
                body.push(node);
            }
        }

        let close_tag = match slots[close_index].take() {
            Some(node) => node,
            None => continue,
        };

        let start_position = conditional_node.location().start;
        let end_position = close_tag.location().end;

        let conditional_open_tag = Node::HtmlConditionalOpenTag(HtmlConditionalOpenTagNode {
            tag_name: tag_name_token.clone(),
            is_void: false,
            location: conditional_node.location(),
            conditional: Box::new(conditional_node),
            errors: Vec::new(),
        });

        slots[index] = Some(Node::HtmlElement(HtmlElementNode {
            open_tag: Box::new(conditional_open_tag),
            tag_name: tag_name_token,
            body,
            close_tag: Some(Box::new(close_tag)),
            is_void: false,
            source: ElementSource::Html,
            location: Location::new(start_position, end_position),
            errors: Vec::new(),
        }));
    }

    *nodes = slots.into_iter().flatten().collect();
}

/// Scans a branch body for exactly one non-void open tag, ignoring
/// whitespace and anything that is not tag structure. A tag that finds
/// its own close inside the branch is self-contained and disqualified.
fn scan_single_open_tag(statements: &[Node]) -> SingleTagScan {
    let mut scan = SingleTagScan::default();

    if statements.is_empty() {
        return scan;
    }

    let mut tag_count = 0usize;
    let mut first_index = 0usize;

    for (index, node) in statements.iter().enumerate() {
        match node {
            Node::HtmlText(text) => {
                if text.content.chars().all(char::is_whitespace) {
                    continue;
                }

                // Meaningful text after a self-contained tag pair keeps
                // the branch out of consideration without flagging it.
                if scan.tag_index.is_some() {
                    if let Some(name) = open_tag_name(&statements[first_index]) {
                        if has_matching_close_in(statements, first_index, name) {
                            scan.tag_index = None;
                            scan.second_index = None;
                            scan.has_multiple = false;
                        }
                    }
                }

                return scan;
            }
            node if is_non_void_open_tag(node) => {
                tag_count += 1;

                if tag_count == 1 {
                    scan.tag_index = Some(index);
                    first_index = index;
                } else if tag_count == 2 {
                    scan.second_index = Some(index);
                    scan.has_multiple = true;
                }
            }
            _ => {}
        }
    }

    if tag_count != 1 {
        scan.tag_index = None;

        if scan.has_multiple && scan.second_index.is_some() {
            if let Some(name) = open_tag_name(&statements[first_index]) {
                if has_matching_close_in(statements, first_index, name) {
                    scan.has_multiple = false;
                    scan.second_index = None;
                }
            }
        }
    }

    if let Some(tag_index) = scan.tag_index {
        if let Some(name) = open_tag_name(&statements[tag_index]) {
            if has_matching_close_in(statements, tag_index, name) {
                scan.tag_index = None;
            }
        }
    }

    scan
}

fn is_non_void_open_tag(node: &Node) -> bool {
    matches!(node, Node::HtmlOpenTag(tag) if !tag.is_void)
}

fn open_tag_name(node: &Node) -> Option<&str> {
    match node {
        Node::HtmlOpenTag(tag) => Some(tag.tag_name.value.as_ref()),
        _ => None,
    }
}

/// Depth-aware search for a close of `tag_name` within the same
/// statement list, past `open_index`.
fn has_matching_close_in(statements: &[Node], open_index: usize, tag_name: &str) -> bool {
    let mut depth = 0usize;

    for node in statements.iter().skip(open_index + 1) {
        match node {
            Node::HtmlOpenTag(tag) => {
                if tag.tag_name.value.eq_ignore_ascii_case(tag_name) {
                    depth += 1;
                }
            }
            Node::HtmlCloseTag(tag) => {
                if tag.tag_name.value.eq_ignore_ascii_case(tag_name) {
                    if depth == 0 {
                        return true;
                    }
                    depth -= 1;
                }
            }
            _ => {}
        }
    }

    false
}

/// The shared tag name when every branch of the chain holds exactly one
/// open tag of the same name and the chain ends in `else`.
fn check_if_chain(if_node: &ErbIfNode) -> Option<String> {
    if_node.subsequent.as_ref()?;

    let scan = scan_single_open_tag(&if_node.statements);
    let tag_index = scan.tag_index?;
    let common_name = open_tag_name(&if_node.statements[tag_index])?.to_string();

    let mut current = if_node.subsequent.as_deref();
    let mut ends_with_else = false;

    while let Some(node) = current {
        let (statements, next) = match node {
            Node::ErbIf(elsif_node) => (&elsif_node.statements, elsif_node.subsequent.as_deref()),
            Node::ErbElse(else_node) => {
                ends_with_else = true;
                (&else_node.statements, None)
            }
            _ => return None,
        };

        let branch_scan = scan_single_open_tag(statements);
        let branch_index = branch_scan.tag_index?;
        let branch_name = open_tag_name(&statements[branch_index])?;

        if !common_name.eq_ignore_ascii_case(branch_name) {
            return None;
        }

        current = next;
    }

    // A chain without an `else` can fall through to no tag at all, so
    // it never qualifies.
    if !ends_with_else {
        return None;
    }

    Some(common_name)
}

fn check_unless_chain(unless_node: &ErbUnlessNode) -> Option<String> {
    let else_clause = unless_node.else_clause.as_ref()?;

    let scan = scan_single_open_tag(&unless_node.statements);
    let tag_index = scan.tag_index?;
    let common_name = open_tag_name(&unless_node.statements[tag_index])?.to_string();

    let else_scan = scan_single_open_tag(&else_clause.statements);
    let else_index = else_scan.tag_index?;
    let else_name = open_tag_name(&else_clause.statements[else_index])?;

    if !common_name.eq_ignore_ascii_case(else_name) {
        return None;
    }

    Some(common_name)
}

fn first_branch_tag_token(node: &Node) -> Option<Token> {
    let statements = match node {
        Node::ErbIf(if_node) => &if_node.statements,
        Node::ErbUnless(unless_node) => &unless_node.statements,
        _ => return None,
    };

    let scan = scan_single_open_tag(statements);
    let tag_index = scan.tag_index?;

    match &statements[tag_index] {
        Node::HtmlOpenTag(tag) => Some(tag.tag_name.clone()),
        _ => None,
    }
}

fn multiple_tags_error(branch_location: Location, second_tag_location: Location) -> AnalyzeError {
    AnalyzeError::ConditionalElementMultipleTags {
        line: second_tag_location.start.line,
        column: second_tag_location.start.column,
        location: branch_location,
    }
}

fn push_unique(errors: &mut Vec<AnalyzeError>, error: AnalyzeError) {
    if !errors.contains(&error) {
        errors.push(error);
    }
}

fn report_multiple_tags_in_if(if_node: &mut ErbIfNode) {
    if if_node.subsequent.is_none() {
        return;
    }

    let scan = scan_single_open_tag(&if_node.statements);

    if scan.has_multiple {
        if let Some(second_index) = scan.second_index {
            let second_location = if_node.statements[second_index].location();
            let location = if_node.location;
            push_unique(&mut if_node.errors, multiple_tags_error(location, second_location));
        }
        return;
    }

    if scan.tag_index.is_none() {
        return;
    }

    let mut current = if_node.subsequent.as_deref_mut();

    while let Some(node) = current {
        match node {
            Node::ErbIf(elsif_node) => {
                let scan = scan_single_open_tag(&elsif_node.statements);

                if scan.has_multiple {
                    if let Some(second_index) = scan.second_index {
                        let second_location = elsif_node.statements[second_index].location();
                        let location = elsif_node.location;
                        push_unique(&mut elsif_node.errors, multiple_tags_error(location, second_location));
                    }
                    return;
                }
                if scan.tag_index.is_none() {
                    return;
                }

                current = elsif_node.subsequent.as_deref_mut();
            }
            Node::ErbElse(else_node) => {
                let scan = scan_single_open_tag(&else_node.statements);

                if scan.has_multiple {
                    if let Some(second_index) = scan.second_index {
                        let second_location = else_node.statements[second_index].location();
                        let location = else_node.location;
                        push_unique(&mut else_node.errors, multiple_tags_error(location, second_location));
                    }
                }
                return;
            }
            _ => return,
        }
    }
}

fn report_multiple_tags_in_unless(unless_node: &mut ErbUnlessNode) {
    if unless_node.else_clause.is_none() {
        return;
    }

    let scan = scan_single_open_tag(&unless_node.statements);

    if scan.has_multiple {
        if let Some(second_index) = scan.second_index {
            let second_location = unless_node.statements[second_index].location();
            let location = unless_node.location;
            push_unique(&mut unless_node.errors, multiple_tags_error(location, second_location));
        }
        return;
    }

    if scan.tag_index.is_none() {
        return;
    }

    if let Some(else_clause) = &mut unless_node.else_clause {
        let scan = scan_single_open_tag(&else_clause.statements);

        if scan.has_multiple {
            if let Some(second_index) = scan.second_index {
                let second_location = else_clause.statements[second_index].location();
                let location = else_clause.location;
                push_unique(&mut else_clause.errors, multiple_tags_error(location, second_location));
            }
        }
    }
}

/// Finds the matching close tag for the chain in the sibling sequence,
/// stepping over nested identical bare tags.
fn find_matching_close_tag(slots: &[Option<Node>], start: usize, tag_name: &str) -> Option<usize> {
    let mut depth = 0usize;

    for (index, slot) in slots.iter().enumerate().skip(start + 1) {
        let node = match slot {
            Some(node) => node,
            None => continue,
        };

        match node {
            Node::HtmlOpenTag(tag) => {
                if tag.tag_name.value.eq_ignore_ascii_case(tag_name) {
                    depth += 1;
                }
            }
            Node::HtmlCloseTag(tag) => {
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
