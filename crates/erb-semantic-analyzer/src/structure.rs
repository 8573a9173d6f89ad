//! Compound-structure assembly (pass 2).
//!
//! Folds flat runs of control-flow fragments into compound nodes:
//! `if/elsif/else/end` chains, `case/when/in/else/end`,
//! `begin/rescue/else/ensure/end`, loops, and blocks. Each sibling
//! sequence is rebuilt into a fresh vector; consumed fragments donate
//! their tokens and errors to the node built from them.

use crate::builders::{build_end_node, create_control_node, erb_content_end_position};
use crate::control_type::{
    detect_control_type, is_compound_control_type, is_subsequent_type, is_terminator_type,
    ControlType,
};
use erb_ast::{
    DocumentNode, ErbCaseMatchNode, ErbCaseNode, ErbContentNode, ErbElseNode, ErbEndNode,
    ErbInNode, ErbWhenNode, Node,
};
use erb_position_tracking::Location;

/// Runs the pass: every sibling sequence in the document is rewritten,
/// depth-first into the nodes each rewrite produces.
pub fn rewrite(document: &mut DocumentNode) {
    let children = std::mem::take(&mut document.children);
    document.children = rewrite_array_deep(children);
}

fn rewrite_array_deep(nodes: Vec<Node>) -> Vec<Node> {
    let mut nodes = rewrite_node_array(nodes);

    for node in &mut nodes {
        rewrite_node_children(node);
    }

    nodes
}

/// Recurses into every child array of an already-assembled node.
fn rewrite_node_children(node: &mut Node) {
    match node {
        Node::HtmlElement(element) => {
            element.body = rewrite_array_deep(std::mem::take(&mut element.body));
        }
        Node::ErbIf(if_node) => {
            if_node.statements = rewrite_array_deep(std::mem::take(&mut if_node.statements));
            if let Some(subsequent) = &mut if_node.subsequent {
                rewrite_node_children(subsequent);
            }
        }
        Node::ErbElse(else_node) => {
            else_node.statements = rewrite_array_deep(std::mem::take(&mut else_node.statements));
        }
        Node::ErbUnless(unless_node) => {
            unless_node.statements =
                rewrite_array_deep(std::mem::take(&mut unless_node.statements));
            if let Some(else_clause) = &mut unless_node.else_clause {
                else_clause.statements =
                    rewrite_array_deep(std::mem::take(&mut else_clause.statements));
            }
        }
        Node::ErbCase(case_node) => {
            case_node.children = rewrite_array_deep(std::mem::take(&mut case_node.children));
            for condition in &mut case_node.conditions {
                condition.statements =
                    rewrite_array_deep(std::mem::take(&mut condition.statements));
            }
            if let Some(else_clause) = &mut case_node.else_clause {
                else_clause.statements =
                    rewrite_array_deep(std::mem::take(&mut else_clause.statements));
            }
        }
        Node::ErbCaseMatch(case_node) => {
            case_node.children = rewrite_array_deep(std::mem::take(&mut case_node.children));
            for condition in &mut case_node.conditions {
                condition.statements =
                    rewrite_array_deep(std::mem::take(&mut condition.statements));
            }
            if let Some(else_clause) = &mut case_node.else_clause {
                else_clause.statements =
                    rewrite_array_deep(std::mem::take(&mut else_clause.statements));
            }
        }
        Node::ErbWhile(while_node) => {
            while_node.statements = rewrite_array_deep(std::mem::take(&mut while_node.statements));
        }
        Node::ErbUntil(until_node) => {
            until_node.statements = rewrite_array_deep(std::mem::take(&mut until_node.statements));
        }
        Node::ErbFor(for_node) => {
            for_node.statements = rewrite_array_deep(std::mem::take(&mut for_node.statements));
        }
        Node::ErbBlock(block_node) => {
            block_node.body = rewrite_array_deep(std::mem::take(&mut block_node.body));
        }
        Node::ErbBegin(begin_node) => {
            begin_node.statements =
                rewrite_array_deep(std::mem::take(&mut begin_node.statements));
            if let Some(rescue) = &mut begin_node.rescue_clause {
                rewrite_rescue_children(rescue);
            }
            if let Some(else_clause) = &mut begin_node.else_clause {
                else_clause.statements =
                    rewrite_array_deep(std::mem::take(&mut else_clause.statements));
            }
            if let Some(ensure) = &mut begin_node.ensure_clause {
                ensure.statements = rewrite_array_deep(std::mem::take(&mut ensure.statements));
            }
        }
        Node::ErbRescue(rescue_node) => rewrite_rescue_children_inner(rescue_node),
        Node::ErbEnsure(ensure_node) => {
            ensure_node.statements =
                rewrite_array_deep(std::mem::take(&mut ensure_node.statements));
        }
        _ => {}
    }
}

fn rewrite_rescue_children(rescue: &mut erb_ast::ErbRescueNode) {
    rewrite_rescue_children_inner(rescue);
}

fn rewrite_rescue_children_inner(rescue: &mut erb_ast::ErbRescueNode) {
    rescue.statements = rewrite_array_deep(std::mem::take(&mut rescue.statements));
    if let Some(subsequent) = &mut rescue.subsequent {
        rewrite_rescue_children_inner(subsequent);
    }
}

/// Cursor over a sibling sequence being consumed left to right.
struct Cursor {
    slots: Vec<Option<Node>>,
    index: usize,
}

impl Cursor {
    fn new(nodes: Vec<Node>) -> Self {
        Cursor { slots: nodes.into_iter().map(Some).collect(), index: 0 }
    }

    fn at_end(&self) -> bool {
        self.index >= self.slots.len()
    }

    fn peek(&self) -> Option<&Node> {
        self.slots.get(self.index).and_then(|slot| slot.as_ref())
    }

    /// Control type of the fragment at the cursor, if it is one.
    fn peek_control_type(&self) -> Option<ControlType> {
        match self.peek() {
            Some(Node::ErbContent(content)) => Some(detect_control_type(content)),
            _ => None,
        }
    }

    fn take(&mut self) -> Option<Node> {
        let node = self.slots.get_mut(self.index).and_then(|slot| slot.take());
        self.index += 1;
        node
    }

    fn take_erb_content(&mut self) -> Option<ErbContentNode> {
        match self.take() {
            Some(Node::ErbContent(content)) => Some(content),
            Some(other) => {
                // Not a fragment after all; put it back untouched.
                self.index -= 1;
                self.slots[self.index] = Some(other);
                None
            }
            None => None,
        }
    }
}

/// Rewrites one sibling sequence, folding compound fragments.
pub fn rewrite_node_array(nodes: Vec<Node>) -> Vec<Node> {
    let mut cursor = Cursor::new(nodes);
    let mut output = Vec::with_capacity(cursor.slots.len());

    while !cursor.at_end() {
        let control_type = cursor.peek_control_type();

        match control_type {
            Some(control_type) if is_compound_control_type(control_type) => {
                process_control_structure(&mut cursor, &mut output, control_type);
            }
            Some(ControlType::Yield) => {
                if let Some(donor) = cursor.take_erb_content() {
                    match create_control_node(donor, Vec::new(), None, None, ControlType::Yield) {
                        Some(node) => output.push(node),
                        None => {}
                    }
                }
            }
            _ => {
                if let Some(node) = cursor.take() {
                    output.push(node);
                }
            }
        }
    }

    output
}

fn process_control_structure(cursor: &mut Cursor, output: &mut Vec<Node>, control_type: ControlType) {
    match control_type {
        ControlType::Case | ControlType::CaseMatch => process_case_structure(cursor, output),
        ControlType::Begin => process_begin_structure(cursor, output),
        _ => process_generic_structure(cursor, output, control_type),
    }
}

/// Assembles the body of a structure up to a terminator of
/// `parent_type`, folding nested compounds along the way.
fn process_block_children(cursor: &mut Cursor, parent_type: ControlType) -> Vec<Node> {
    let mut children = Vec::new();

    while !cursor.at_end() {
        let child_type = match cursor.peek_control_type() {
            Some(child_type) => child_type,
            None => {
                match cursor.peek() {
                    Some(_) => {
                        if let Some(node) = cursor.take() {
                            children.push(node);
                        }
                        continue;
                    }
                    None => break,
                }
            }
        };

        if is_terminator_type(parent_type, child_type) {
            break;
        }

        if is_compound_control_type(child_type) {
            process_control_structure(cursor, &mut children, child_type);
            continue;
        }

        if let Some(node) = cursor.take() {
            children.push(node);
        }
    }

    children
}

/// Builds the subsequent clause (elsif/else/rescue/ensure arm) starting
/// at the cursor, chaining further clauses where the grammar allows.
fn process_subsequent_block(cursor: &mut Cursor, parent_type: ControlType) -> Option<Node> {
    let clause_type = cursor.peek_control_type()?;
    let donor = cursor.take_erb_content()?;

    let children = process_block_children(cursor, parent_type);
    let mut node = create_control_node(donor, children, None, None, clause_type)?;

    if let Some(next_type) = cursor.peek_control_type() {
        let chainable = is_subsequent_type(parent_type, next_type)
            && !(clause_type == ControlType::Rescue
                && matches!(next_type, ControlType::Else | ControlType::Ensure));

        if chainable {
            match clause_type {
                ControlType::Elsif => {
                    if let Node::ErbIf(if_node) = &mut node {
                        if_node.subsequent =
                            process_subsequent_block(cursor, parent_type).map(Box::new);
                    }
                }
                ControlType::Rescue if next_type == ControlType::Rescue => {
                    if let Node::ErbRescue(rescue_node) = &mut node {
                        if let Some(Node::ErbRescue(next_rescue)) =
                            process_subsequent_block(cursor, parent_type)
                        {
                            rescue_node.subsequent = Some(Box::new(next_rescue));
                        }
                    }
                }
                _ => {}
            }
        }
    }

    Some(node)
}

fn consume_end_node(cursor: &mut Cursor, allowed: &[ControlType]) -> Option<Box<ErbEndNode>> {
    let candidate_type = cursor.peek_control_type()?;

    if !allowed.contains(&candidate_type) {
        return None;
    }

    cursor.take_erb_content().map(build_end_node)
}

fn process_generic_structure(cursor: &mut Cursor, output: &mut Vec<Node>, initial_type: ControlType) {
    let donor = match cursor.take_erb_content() {
        Some(donor) => donor,
        None => return,
    };

    let children = process_block_children(cursor, initial_type);

    let subsequent = match cursor.peek_control_type() {
        Some(next_type) if is_subsequent_type(initial_type, next_type) => {
            process_subsequent_block(cursor, initial_type)
        }
        _ => None,
    };

    let end_node = if initial_type == ControlType::Block {
        consume_end_node(cursor, &[ControlType::BlockClose, ControlType::End])
    } else {
        consume_end_node(cursor, &[ControlType::End])
    };

    if let Some(node) = create_control_node(donor, children, subsequent, end_node, initial_type) {
        output.push(node);
    }
}

fn process_case_structure(cursor: &mut Cursor, output: &mut Vec<Node>) {
    let donor = match cursor.take_erb_content() {
        Some(donor) => donor,
        None => return,
    };

    let (has_inline_when, has_inline_in) = match &donor.analyzed {
        Some(analyzed) => (
            analyzed.case_count > 0 && analyzed.when_count > 0,
            analyzed.case_match_count > 0 && analyzed.in_count > 0,
        ),
        None => (false, false),
    };

    let mut when_conditions: Vec<ErbWhenNode> = Vec::new();
    let mut in_conditions: Vec<ErbInNode> = Vec::new();
    let mut pre_children: Vec<Node> = Vec::new();

    // Children between `case …` and the first arm.
    collect_children_until(
        cursor,
        &mut pre_children,
        &[ControlType::When, ControlType::In, ControlType::End],
    );

    // An inline `case x when y` opener already carries its first arm;
    // the children collected so far belong to that synthetic arm.
    if has_inline_when || has_inline_in {
        let statements = std::mem::take(&mut pre_children);

        let start_position = donor
            .tag_closing
            .as_ref()
            .map(|token| token.location.end)
            .or_else(|| donor.content.as_ref().map(|token| token.location.end))
            .unwrap_or(donor.tag_opening.location.end);
        let end_position = statements
            .last()
            .map(|node| node.location().end)
            .unwrap_or(start_position);
        let location = Location::new(start_position, end_position);

        if has_inline_when {
            when_conditions.push(ErbWhenNode {
                tag_opening: None,
                content: None,
                tag_closing: None,
                then_keyword: None,
                statements,
                location,
                errors: Vec::new(),
            });
        } else {
            in_conditions.push(ErbInNode {
                tag_opening: None,
                content: None,
                tag_closing: None,
                then_keyword: None,
                statements,
                location,
                errors: Vec::new(),
            });
        }
    }

    loop {
        let next_type = match cursor.peek_control_type() {
            Some(next_type) => next_type,
            None => {
                // Stray non-fragment siblings between arms stay with the
                // case node's own children.
                match cursor.take() {
                    Some(node) => {
                        pre_children.push(node);
                        continue;
                    }
                    None => break,
                }
            }
        };

        if next_type == ControlType::When || next_type == ControlType::In {
            let arm_donor = match cursor.take_erb_content() {
                Some(arm_donor) => arm_donor,
                None => break,
            };

            let statements = process_block_children(cursor, next_type);
            let then_keyword = crate::builders::compute_then_keyword(&arm_donor, next_type);
            let start = arm_donor.tag_opening.location.start;
            let end = erb_content_end_position(&arm_donor);
            let location = Location::new(start, end);

            let ErbContentNode { tag_opening, content, tag_closing, errors, .. } = arm_donor;

            if next_type == ControlType::When {
                when_conditions.push(ErbWhenNode {
                    tag_opening: Some(tag_opening),
                    content,
                    tag_closing,
                    then_keyword,
                    statements,
                    location,
                    errors,
                });
            } else {
                in_conditions.push(ErbInNode {
                    tag_opening: Some(tag_opening),
                    content,
                    tag_closing,
                    then_keyword,
                    statements,
                    location,
                    errors,
                });
            }
            continue;
        }

        if next_type == ControlType::Else || next_type == ControlType::End {
            break;
        }

        if let Some(node) = cursor.take() {
            pre_children.push(node);
        }
    }

    let else_clause = if cursor.peek_control_type() == Some(ControlType::Else) {
        cursor.take_erb_content().map(|else_donor| {
            let statements = process_block_children(cursor, ControlType::Case);
            let start = else_donor.tag_opening.location.start;
            let end = erb_content_end_position(&else_donor);
            let ErbContentNode { tag_opening, content, tag_closing, errors, .. } = else_donor;

            Box::new(ErbElseNode {
                tag_opening,
                content,
                tag_closing,
                statements,
                location: Location::new(start, end),
                errors,
            })
        })
    } else {
        None
    };

    let end_node = consume_end_node(cursor, &[ControlType::End]);

    let start_position = donor.tag_opening.location.start;
    let mut end_position = erb_content_end_position(&donor);

    if let Some(end) = &end_node {
        end_position = end.location.end;
    } else if let Some(else_clause) = &else_clause {
        end_position = else_clause.location.end;
    } else if let Some(last_when) = when_conditions.last() {
        end_position = last_when.location.end;
    } else if let Some(last_in) = in_conditions.last() {
        end_position = last_in.location.end;
    }

    let location = Location::new(start_position, end_position);
    let ErbContentNode { tag_opening, content, tag_closing, errors, .. } = donor;

    if !in_conditions.is_empty() {
        output.push(Node::ErbCaseMatch(ErbCaseMatchNode {
            tag_opening,
            content,
            tag_closing,
            children: pre_children,
            conditions: in_conditions,
            else_clause,
            end_node,
            location,
            errors,
        }));
    } else {
        output.push(Node::ErbCase(ErbCaseNode {
            tag_opening,
            content,
            tag_closing,
            children: pre_children,
            conditions: when_conditions,
            else_clause,
            end_node,
            location,
            errors,
        }));
    }
}

fn process_begin_structure(cursor: &mut Cursor, output: &mut Vec<Node>) {
    let donor = match cursor.take_erb_content() {
        Some(donor) => donor,
        None => return,
    };

    let children = process_block_children(cursor, ControlType::Begin);

    let rescue_clause = if cursor.peek_control_type() == Some(ControlType::Rescue) {
        match process_subsequent_block(cursor, ControlType::Begin) {
            Some(Node::ErbRescue(rescue)) => Some(Box::new(rescue)),
            _ => None,
        }
    } else {
        None
    };

    let else_clause = if cursor.peek_control_type() == Some(ControlType::Else) {
        cursor.take_erb_content().map(|else_donor| {
            let statements = process_block_children(cursor, ControlType::Begin);
            let start = else_donor.tag_opening.location.start;
            let end = erb_content_end_position(&else_donor);
            let ErbContentNode { tag_opening, content, tag_closing, errors, .. } = else_donor;

            Box::new(ErbElseNode {
                tag_opening,
                content,
                tag_closing,
                statements,
                location: Location::new(start, end),
                errors,
            })
        })
    } else {
        None
    };

    let ensure_clause = if cursor.peek_control_type() == Some(ControlType::Ensure) {
        cursor.take_erb_content().map(|ensure_donor| {
            let mut statements = Vec::new();
            collect_children_until(cursor, &mut statements, &[ControlType::End]);

            let start = ensure_donor.tag_opening.location.start;
            let end = erb_content_end_position(&ensure_donor);
            let ErbContentNode { tag_opening, content, tag_closing, errors, .. } = ensure_donor;

            Box::new(erb_ast::ErbEnsureNode {
                tag_opening,
                content,
                tag_closing,
                statements,
                location: Location::new(start, end),
                errors,
            })
        })
    } else {
        None
    };

    let end_node = consume_end_node(cursor, &[ControlType::End]);

    let start_position = donor.tag_opening.location.start;
    let mut end_position = erb_content_end_position(&donor);

    if let Some(end) = &end_node {
        end_position = end.location.end;
    } else if let Some(ensure) = &ensure_clause {
        end_position = ensure.location.end;
    } else if let Some(else_clause) = &else_clause {
        end_position = else_clause.location.end;
    } else if let Some(rescue) = &rescue_clause {
        end_position = rescue.location.end;
    }

    let location = Location::new(start_position, end_position);
    let ErbContentNode { tag_opening, content, tag_closing, errors, .. } = donor;

    output.push(Node::ErbBegin(erb_ast::ErbBeginNode {
        tag_opening,
        content,
        tag_closing,
        statements: children,
        rescue_clause,
        else_clause,
        ensure_clause,
        end_node,
        location,
        errors,
    }));
}

/// Collects siblings verbatim until a fragment of one of `stop_types`
/// (nested compounds are left unfolded for the deep rewrite).
fn collect_children_until(cursor: &mut Cursor, destination: &mut Vec<Node>, stop_types: &[ControlType]) {
    while !cursor.at_end() {
        if let Some(child_type) = cursor.peek_control_type() {
            if stop_types.contains(&child_type) {
                break;
            }
        }

        match cursor.take() {
            Some(node) => destination.push(node),
            None => break,
        }
    }
}
