//! Embedded-code analysis (pass 1).
//!
//! Sub-parses every executable template region, fills the counter record
//! the classifier reads, and raises the region-level diagnostics that
//! depend only on a single fragment.

use crate::AnalyzeOptions;
use erb_ast::{AnalyzedRuby, DocumentNode, ErbContentNode, Node};
use erb_error::AnalyzeError;
use erb_ruby::{messages, RubyNode, RubyNodeKind};

/// Openers whose content is literal text, a comment, or a foreign
/// language: never sub-parsed.
const LITERAL_OPENERS: [&str; 4] = ["<%%", "<%%=", "<%#", "<%graphql"];

/// Runs the pass over the whole document.
pub fn analyze(document: &mut DocumentNode, options: &AnalyzeOptions) {
    for child in &mut document.children {
        analyze_node(child, options);
    }
}

fn analyze_node(node: &mut Node, options: &AnalyzeOptions) {
    if let Node::ErbContent(content) = node {
        analyze_content(content, options);
        return;
    }

    // Pre-assembly trees are flat, but the pass stays total so re-running
    // it over an assembled tree is a no-op rather than a surprise.
    match node {
        Node::HtmlElement(element) => {
            analyze_node(&mut element.open_tag, options);
            for child in &mut element.body {
                analyze_node(child, options);
            }
        }
        Node::HtmlConditionalElement(conditional) => {
            analyze_node(&mut conditional.open_conditional, options);
            for child in &mut conditional.body {
                analyze_node(child, options);
            }
            analyze_node(&mut conditional.close_conditional, options);
        }
        Node::HtmlConditionalOpenTag(tag) => analyze_node(&mut tag.conditional, options),
        Node::ErbIf(if_node) => {
            for child in &mut if_node.statements {
                analyze_node(child, options);
            }
            if let Some(subsequent) = &mut if_node.subsequent {
                analyze_node(subsequent, options);
            }
        }
        Node::ErbElse(else_node) => {
            for child in &mut else_node.statements {
                analyze_node(child, options);
            }
        }
        Node::ErbUnless(unless_node) => {
            for child in &mut unless_node.statements {
                analyze_node(child, options);
            }
            if let Some(else_clause) = &mut unless_node.else_clause {
                for child in &mut else_clause.statements {
                    analyze_node(child, options);
                }
            }
        }
        Node::ErbCase(case_node) => {
            for child in &mut case_node.children {
                analyze_node(child, options);
            }
            for condition in &mut case_node.conditions {
                for child in &mut condition.statements {
                    analyze_node(child, options);
                }
            }
            if let Some(else_clause) = &mut case_node.else_clause {
                for child in &mut else_clause.statements {
                    analyze_node(child, options);
                }
            }
        }
        Node::ErbCaseMatch(case_node) => {
            for child in &mut case_node.children {
                analyze_node(child, options);
            }
            for condition in &mut case_node.conditions {
                for child in &mut condition.statements {
                    analyze_node(child, options);
                }
            }
            if let Some(else_clause) = &mut case_node.else_clause {
                for child in &mut else_clause.statements {
                    analyze_node(child, options);
                }
            }
        }
        Node::ErbWhen(when_node) => {
            for child in &mut when_node.statements {
                analyze_node(child, options);
            }
        }
        Node::ErbIn(in_node) => {
            for child in &mut in_node.statements {
                analyze_node(child, options);
            }
        }
        Node::ErbWhile(while_node) => {
            for child in &mut while_node.statements {
                analyze_node(child, options);
            }
        }
        Node::ErbUntil(until_node) => {
            for child in &mut until_node.statements {
                analyze_node(child, options);
            }
        }
        Node::ErbFor(for_node) => {
            for child in &mut for_node.statements {
                analyze_node(child, options);
            }
        }
        Node::ErbBlock(block_node) => {
            for child in &mut block_node.body {
                analyze_node(child, options);
            }
        }
        Node::ErbBegin(begin_node) => {
            for child in &mut begin_node.statements {
                analyze_node(child, options);
            }
            if let Some(rescue) = &mut begin_node.rescue_clause {
                analyze_rescue(rescue, options);
            }
            if let Some(else_clause) = &mut begin_node.else_clause {
                for child in &mut else_clause.statements {
                    analyze_node(child, options);
                }
            }
            if let Some(ensure) = &mut begin_node.ensure_clause {
                for child in &mut ensure.statements {
                    analyze_node(child, options);
                }
            }
        }
        Node::ErbRescue(rescue_node) => {
            for child in &mut rescue_node.statements {
                analyze_node(child, options);
            }
            if let Some(subsequent) = &mut rescue_node.subsequent {
                analyze_rescue(subsequent, options);
            }
        }
        Node::ErbEnsure(ensure_node) => {
            for child in &mut ensure_node.statements {
                analyze_node(child, options);
            }
        }
        _ => {}
    }
}

fn analyze_rescue(rescue: &mut erb_ast::ErbRescueNode, options: &AnalyzeOptions) {
    for child in &mut rescue.statements {
        analyze_node(child, options);
    }
    if let Some(subsequent) = &mut rescue.subsequent {
        analyze_rescue(subsequent, options);
    }
}

fn analyze_content(node: &mut ErbContentNode, options: &AnalyzeOptions) {
    // A second run over the same tree must not re-parse or re-diagnose.
    if node.parsed {
        return;
    }

    let opening = node.tag_opening.value.as_ref();

    if LITERAL_OPENERS.contains(&opening) {
        node.parsed = false;
        node.valid = true;
        node.analyzed = None;
        return;
    }

    let code = node.content.as_ref().map(|token| token.value.as_ref()).unwrap_or("");
    let analyzed = analyze_ruby(code);

    node.parsed = true;
    node.valid = analyzed.valid;

    let invalid = !analyzed.valid;
    let multiple_openers = analyzed.unclosed_control_flow_count >= 2;
    let inline_case = analyzed.has_inline_case_condition();

    node.analyzed = Some(analyzed);

    if invalid && multiple_openers {
        node.errors.push(AnalyzeError::ErbMultipleBlocksInTag { location: node.location });
    }

    if options.strict && invalid && inline_case {
        node.errors.push(AnalyzeError::ErbCaseWithConditions { location: node.location });
    }
}

/// Sub-parses one fragment and fills every counter.
pub fn analyze_ruby(code: &str) -> AnalyzedRuby {
    let result = erb_ruby::parse(code);

    let mut analyzed = AnalyzedRuby {
        valid: result.diagnostics.is_empty(),
        diagnostics: result.diagnostics,
        ..AnalyzedRuby::default()
    };

    count_tree_nodes(&result.root, &mut analyzed);
    count_diagnostic_keywords(&mut analyzed);

    if !analyzed.valid {
        count_unclosed_control_flows(&result.root, &mut analyzed);
    }

    analyzed.root = Some(result.root);
    analyzed
}

fn count_tree_nodes(root: &RubyNode, analyzed: &mut AnalyzedRuby) {
    root.visit(&mut |node| match &node.kind {
        RubyNodeKind::If { end_keyword, postfix, then_keyword, .. } => {
            if !*postfix && end_keyword.is_some() {
                analyzed.if_count += 1;
            }
            if then_keyword.is_some() {
                analyzed.then_keyword_count += 1;
            }
        }
        RubyNodeKind::Unless { end_keyword, postfix, then_keyword, .. } => {
            if !*postfix && end_keyword.is_some() {
                analyzed.unless_count += 1;
            }
            if then_keyword.is_some() {
                analyzed.then_keyword_count += 1;
            }
        }
        RubyNodeKind::Case { .. } => analyzed.case_count += 1,
        RubyNodeKind::CaseMatch { .. } => analyzed.case_match_count += 1,
        RubyNodeKind::When { then_keyword, .. } => {
            analyzed.when_count += 1;
            if then_keyword.is_some() {
                analyzed.then_keyword_count += 1;
            }
        }
        RubyNodeKind::In { .. } | RubyNodeKind::MatchPredicate { .. } => analyzed.in_count += 1,
        RubyNodeKind::While { .. } => analyzed.while_count += 1,
        RubyNodeKind::Until { .. } => analyzed.until_count += 1,
        RubyNodeKind::For { .. } => analyzed.for_count += 1,
        RubyNodeKind::Begin { .. } => analyzed.begin_count += 1,
        RubyNodeKind::Yield { .. } => analyzed.yield_count += 1,
        RubyNodeKind::Block { closing: None, .. } | RubyNodeKind::Lambda { closing: None, .. } => {
            analyzed.block_count += 1;
        }
        _ => {}
    });
}

/// Keywords the embedded parser drops entirely surface only through its
/// diagnostics; fold those into the counters.
fn count_diagnostic_keywords(analyzed: &mut AnalyzedRuby) {
    if analyzed.has_error_message(messages::UNEXPECTED_ELSIF) {
        analyzed.elsif_count += 1;
    }
    if analyzed.has_error_message(messages::UNEXPECTED_ELSE) {
        analyzed.else_count += 1;
    }
    if analyzed.has_error_message(messages::UNEXPECTED_END)
        && !analyzed.has_error_message(messages::UNEXPECTED_EQUALS)
    {
        // `=end` reports both; that pair is an embedded-document marker,
        // not a block terminator.
        analyzed.end_count += 1;
    }
    if analyzed.has_error_message(messages::UNEXPECTED_BRACE) {
        analyzed.block_closing_count += 1;
    }
    if analyzed.has_error_message(messages::UNEXPECTED_WHEN) {
        analyzed.when_count += 1;
    }
    if analyzed.has_error_message(messages::UNEXPECTED_IN) {
        analyzed.in_count += 1;
    }
    if analyzed.has_error_message(messages::UNEXPECTED_RESCUE) {
        analyzed.rescue_count += 1;
    }
    if analyzed.has_error_message(messages::UNEXPECTED_ENSURE) {
        analyzed.ensure_count += 1;
    }
}

fn count_unclosed_control_flows(root: &RubyNode, analyzed: &mut AnalyzedRuby) {
    root.visit(&mut |node| {
        // Two is all the multiple-openers diagnostic needs.
        if analyzed.unclosed_control_flow_count >= 2 {
            return;
        }

        let unclosed = match &node.kind {
            RubyNodeKind::If { end_keyword, postfix, .. }
            | RubyNodeKind::Unless { end_keyword, postfix, .. } => {
                end_keyword.is_none() && !*postfix
            }
            RubyNodeKind::Case { end_keyword, .. }
            | RubyNodeKind::CaseMatch { end_keyword, .. }
            | RubyNodeKind::For { end_keyword, .. }
            | RubyNodeKind::Begin { end_keyword, .. } => end_keyword.is_none(),
            RubyNodeKind::While { closing, .. } | RubyNodeKind::Until { closing, .. } => {
                closing.is_none()
            }
            RubyNodeKind::Block { closing, .. } | RubyNodeKind::Lambda { closing, .. } => {
                closing.is_none()
            }
            _ => false,
        };

        if unclosed {
            analyzed.unclosed_control_flow_count += 1;
        }
    });
}
