//! Structural diagnostics (pass 5).
//!
//! Walks the assembled tree with loop- and rescue-depth counters,
//! flagging scope keywords used outside their valid scope and compound
//! nodes that never saw their `<% end %>`.

use erb_ast::{DocumentNode, ErbContentNode, ErbEndNode, Node};
use erb_ast::AnalyzedRuby;
use erb_error::AnalyzeError;
use erb_position_tracking::Location;
use erb_ruby::messages;

#[derive(Debug, Default)]
struct InvalidContext {
    loop_depth: usize,
    rescue_depth: usize,
}

/// Runs the pass over the whole document.
pub fn detect(document: &mut DocumentNode) {
    let mut context = InvalidContext::default();

    for child in &mut document.children {
        visit(child, &mut context);
    }
}

fn visit(node: &mut Node, context: &mut InvalidContext) {
    match node {
        Node::ErbContent(content) => check_content(content, context),
        Node::HtmlElement(element) => {
            for child in &mut element.body {
                visit(child, context);
            }
        }
        Node::HtmlConditionalElement(conditional) => {
            visit(&mut conditional.open_conditional, context);
            for child in &mut conditional.body {
                visit(child, context);
            }
            visit(&mut conditional.close_conditional, context);
        }
        Node::HtmlConditionalOpenTag(tag) => visit(&mut tag.conditional, context),
        Node::ErbIf(_) => visit_if_chain(node, context),
        Node::ErbElse(else_node) => {
            for child in &mut else_node.statements {
                visit(child, context);
            }
        }
        Node::ErbUnless(unless_node) => {
            check_missing_end(&unless_node.end_node, unless_node.location, &mut unless_node.errors);
            for child in &mut unless_node.statements {
                visit(child, context);
            }
            if let Some(else_clause) = &mut unless_node.else_clause {
                for child in &mut else_clause.statements {
                    visit(child, context);
                }
            }
        }
        Node::ErbCase(case_node) => {
            check_missing_end(&case_node.end_node, case_node.location, &mut case_node.errors);
            for child in &mut case_node.children {
                visit(child, context);
            }
            for condition in &mut case_node.conditions {
                for child in &mut condition.statements {
                    visit(child, context);
                }
            }
            if let Some(else_clause) = &mut case_node.else_clause {
                for child in &mut else_clause.statements {
                    visit(child, context);
                }
            }
        }
        Node::ErbCaseMatch(case_node) => {
            check_missing_end(&case_node.end_node, case_node.location, &mut case_node.errors);
            for child in &mut case_node.children {
                visit(child, context);
            }
            for condition in &mut case_node.conditions {
                for child in &mut condition.statements {
                    visit(child, context);
                }
            }
            if let Some(else_clause) = &mut case_node.else_clause {
                for child in &mut else_clause.statements {
                    visit(child, context);
                }
            }
        }
        Node::ErbWhen(when_node) => {
            for child in &mut when_node.statements {
                visit(child, context);
            }
        }
        Node::ErbIn(in_node) => {
            for child in &mut in_node.statements {
                visit(child, context);
            }
        }
        Node::ErbWhile(while_node) => {
            check_missing_end(&while_node.end_node, while_node.location, &mut while_node.errors);
            context.loop_depth += 1;
            for child in &mut while_node.statements {
                visit(child, context);
            }
            context.loop_depth -= 1;
        }
        Node::ErbUntil(until_node) => {
            check_missing_end(&until_node.end_node, until_node.location, &mut until_node.errors);
            context.loop_depth += 1;
            for child in &mut until_node.statements {
                visit(child, context);
            }
            context.loop_depth -= 1;
        }
        Node::ErbFor(for_node) => {
            check_missing_end(&for_node.end_node, for_node.location, &mut for_node.errors);
            context.loop_depth += 1;
            for child in &mut for_node.statements {
                visit(child, context);
            }
            context.loop_depth -= 1;
        }
        Node::ErbBlock(block_node) => {
            check_missing_end(&block_node.end_node, block_node.location, &mut block_node.errors);
            context.loop_depth += 1;
            for child in &mut block_node.body {
                visit(child, context);
            }
            context.loop_depth -= 1;
        }
        Node::ErbBegin(begin_node) => {
            check_missing_end(&begin_node.end_node, begin_node.location, &mut begin_node.errors);
            context.rescue_depth += 1;
            for child in &mut begin_node.statements {
                visit(child, context);
            }
            if let Some(rescue) = &mut begin_node.rescue_clause {
                visit_rescue(rescue, context);
            }
            if let Some(else_clause) = &mut begin_node.else_clause {
                for child in &mut else_clause.statements {
                    visit(child, context);
                }
            }
            if let Some(ensure) = &mut begin_node.ensure_clause {
                for child in &mut ensure.statements {
                    visit(child, context);
                }
            }
            context.rescue_depth -= 1;
        }
        Node::ErbRescue(rescue_node) => visit_rescue(rescue_node, context),
        Node::ErbEnsure(ensure_node) => {
            for child in &mut ensure_node.statements {
                visit(child, context);
            }
        }
        _ => {}
    }
}

/// The `if` chain is walked manually: only the outermost node owns the
/// `end`, so chained `elsif`/`else` links never get a missing-end check
/// of their own.
fn visit_if_chain(node: &mut Node, context: &mut InvalidContext) {
    let if_node = match node {
        Node::ErbIf(if_node) => if_node,
        _ => return,
    };

    check_missing_end(&if_node.end_node, if_node.location, &mut if_node.errors);

    for child in &mut if_node.statements {
        visit(child, context);
    }

    let mut subsequent = if_node.subsequent.as_deref_mut();

    while let Some(link) = subsequent {
        match link {
            Node::ErbIf(elsif_node) => {
                for child in &mut elsif_node.statements {
                    visit(child, context);
                }
                subsequent = elsif_node.subsequent.as_deref_mut();
            }
            Node::ErbElse(else_node) => {
                for child in &mut else_node.statements {
                    visit(child, context);
                }
                break;
            }
            _ => break,
        }
    }
}

fn visit_rescue(rescue: &mut erb_ast::ErbRescueNode, context: &mut InvalidContext) {
    for child in &mut rescue.statements {
        visit(child, context);
    }
    if let Some(subsequent) = &mut rescue.subsequent {
        visit_rescue(subsequent, context);
    }
}

fn check_missing_end(
    end_node: &Option<Box<ErbEndNode>>,
    location: Location,
    errors: &mut Vec<AnalyzeError>,
) {
    if end_node.is_none() {
        let error = AnalyzeError::MissingErbEnd { location };
        if !errors.contains(&error) {
            errors.push(error);
        }
    }
}

/// Checks one irreducible fragment against the current scope.
fn check_content(content: &mut ErbContentNode, context: &InvalidContext) {
    if !content.parsed || content.valid {
        return;
    }

    let analyzed = match &content.analyzed {
        Some(analyzed) => analyzed,
        None => return,
    };

    // `=begin`/`=end` document markers are not control flow.
    if analyzed.has_error_message(messages::EMBEDDED_DOCUMENT_EOF) {
        return;
    }
    if analyzed.has_error_message(messages::UNEXPECTED_EQUALS)
        && analyzed.has_error_message(messages::UNEXPECTED_END)
    {
        return;
    }

    let mut keyword: Option<&'static str> = None;

    if context.loop_depth == 0 {
        if analyzed.has_error_message(messages::INVALID_BREAK) {
            keyword = Some("`<% break %>`");
        } else if analyzed.has_error_message(messages::INVALID_NEXT) {
            keyword = Some("`<% next %>`");
        } else if analyzed.has_error_message(messages::INVALID_REDO) {
            keyword = Some("`<% redo %>`");
        }
    } else if analyzed.has_error_message(messages::INVALID_BREAK)
        || analyzed.has_error_message(messages::INVALID_NEXT)
        || analyzed.has_error_message(messages::INVALID_REDO)
    {
        // Inside a template-level loop the jump is legitimate.
        return;
    }

    if keyword.is_none() {
        if analyzed.has_error_message(messages::INVALID_RETRY) {
            if context.rescue_depth > 0 {
                return;
            }
            keyword = Some("`<% retry %>`");
        }
    }

    if keyword.is_none() {
        keyword = erb_keyword_from_analyzed_ruby(analyzed);
    }

    let has_closer = content
        .tag_closing
        .as_ref()
        .is_some_and(|token| !token.value.is_empty());

    if let Some(keyword) = keyword {
        if has_closer {
            let error = AnalyzeError::ErbControlFlowScope {
                keyword: keyword.to_string(),
                location: content.location,
            };
            if !content.errors.contains(&error) {
                content.errors.push(error);
            }
        }
    }
}

/// Renders the stray keyword a leftover fragment contains, if any.
fn erb_keyword_from_analyzed_ruby(analyzed: &AnalyzedRuby) -> Option<&'static str> {
    if analyzed.elsif_count > 0 {
        Some("`<% elsif %>`")
    } else if analyzed.else_count > 0 {
        Some("`<% else %>`")
    } else if analyzed.end_count > 0 {
        Some("`<% end %>`")
    } else if analyzed.when_count > 0 && analyzed.case_count == 0 {
        Some("`<% when %>`")
    } else if analyzed.in_count > 0 && analyzed.case_match_count == 0 {
        Some("`<% in %>`")
    } else if analyzed.rescue_count > 0 {
        Some("`<% rescue %>`")
    } else if analyzed.ensure_count > 0 {
        Some("`<% ensure %>`")
    } else if analyzed.block_closing_count > 0 {
        Some("`<% } %>`")
    } else {
        None
    }
}
