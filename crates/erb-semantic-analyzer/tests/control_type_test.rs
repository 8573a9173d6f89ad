//! Fragment classification across the control-type table.

use erb_ast::ErbContentNode;
use erb_position_tracking::{Location, Position, Span};
use erb_semantic_analyzer::{detect_control_type, embedded, ControlType};
use erb_token::{Token, TokenKind};

/// Builds an analyzed fragment the way pass 1 would.
fn fragment(code: &str) -> ErbContentNode {
    let opening = Token::new(
        TokenKind::ErbStart,
        "<%",
        Span::new(0, 2),
        Location::new(Position::new(1, 0), Position::new(1, 2)),
    );
    let content = Token::new(
        TokenKind::ErbContent,
        code,
        Span::new(2, 2 + code.len()),
        Location::new(Position::new(1, 2), Position::new(1, 2 + code.len())),
    );
    let closing = Token::new(
        TokenKind::ErbEnd,
        "%>",
        Span::new(2 + code.len(), 4 + code.len()),
        Location::new(Position::new(1, 2 + code.len()), Position::new(1, 4 + code.len())),
    );

    let analyzed = embedded::analyze_ruby(code);
    let valid = analyzed.valid;

    ErbContentNode {
        location: Location::new(opening.location.start, closing.location.end),
        tag_opening: opening,
        content: Some(content),
        tag_closing: Some(closing),
        parsed: true,
        valid,
        analyzed: Some(analyzed),
        errors: Vec::new(),
    }
}

fn classify(code: &str) -> ControlType {
    detect_control_type(&fragment(code))
}

#[test]
fn test_openers() {
    assert_eq!(classify(" if admin? "), ControlType::If);
    assert_eq!(classify(" unless admin? "), ControlType::Unless);
    assert_eq!(classify(" while queue.any? "), ControlType::While);
    assert_eq!(classify(" until done? "), ControlType::Until);
    assert_eq!(classify(" for item in items "), ControlType::For);
    assert_eq!(classify(" begin "), ControlType::Begin);
    assert_eq!(classify(" case status "), ControlType::Case);
}

#[test]
fn test_dividers_and_terminators() {
    assert_eq!(classify(" elsif guest? "), ControlType::Elsif);
    assert_eq!(classify(" else "), ControlType::Else);
    assert_eq!(classify(" end "), ControlType::End);
    assert_eq!(classify(" when :active "), ControlType::When);
    assert_eq!(classify(" in [status] "), ControlType::In);
    assert_eq!(classify(" rescue KeyError => e "), ControlType::Rescue);
    assert_eq!(classify(" ensure "), ControlType::Ensure);
    assert_eq!(classify(" } "), ControlType::BlockClose);
}

#[test]
fn test_blocks() {
    assert_eq!(classify(" items.each do |item| "), ControlType::Block);
    assert_eq!(classify(" items.map { |item| "), ControlType::Block);
    assert_eq!(classify(" form_for user do |f| "), ControlType::Block);
}

#[test]
fn test_yield() {
    assert_eq!(classify(" yield "), ControlType::Yield);
    assert_eq!(classify(" yield :sidebar "), ControlType::Yield);
}

#[test]
fn test_block_preferred_over_yield() {
    // A block opener that also mentions yield classifies as a block no
    // matter which keyword comes first.
    assert_eq!(classify(" capture do yield "), ControlType::Block);
}

#[test]
fn test_valid_fragments_are_unknown() {
    assert_eq!(classify(" user.name "), ControlType::Unknown);
    assert_eq!(classify(" total = items.sum "), ControlType::Unknown);
    assert_eq!(classify(" x = 1 if y "), ControlType::Unknown);
    assert_eq!(classify(" render partial: \"row\" "), ControlType::Unknown);
    assert_eq!(classify(" if x then 1 else 2 end "), ControlType::Unknown);
}

#[test]
fn test_invalid_but_not_control_flow_is_unknown() {
    assert_eq!(classify(" break "), ControlType::Unknown);
    assert_eq!(classify(" next "), ControlType::Unknown);
    assert_eq!(classify(" retry "), ControlType::Unknown);
}

#[test]
fn test_inline_case_classifies_as_case() {
    assert_eq!(classify(" case status when :active "), ControlType::Case);
}

#[test]
fn test_keywords_in_strings_do_not_classify() {
    assert_eq!(classify(" puts \"if only\" "), ControlType::Unknown);
    assert_eq!(classify(" title = \"the end\" "), ControlType::Unknown);
}

#[test]
fn test_fragment_without_closer_is_unknown() {
    let mut node = fragment(" if x ");
    node.tag_closing = None;

    assert_eq!(detect_control_type(&node), ControlType::Unknown);
}

#[test]
fn test_earliest_keyword_wins() {
    // `while` appears before `if`, and both are unclosed.
    assert_eq!(classify(" while x\n if y "), ControlType::While);
}
