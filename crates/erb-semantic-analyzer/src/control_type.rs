//! Control-fragment classification.
//!
//! Decides, for an analyzed template region, which control-flow fragment
//! it is (`if` opener, `else` divider, `end` terminator, …) and defines
//! the subsequent/terminator relations the structure assembler folds by.

use erb_ast::{AnalyzedRuby, ErbContentNode};
use erb_ruby::{BlockDelimiter, RubyNode, RubyNodeKind};

/// What kind of control-flow fragment a template region contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlType {
    Unknown,
    If,
    Elsif,
    Else,
    End,
    Case,
    CaseMatch,
    When,
    In,
    While,
    Until,
    For,
    Begin,
    Rescue,
    Ensure,
    Unless,
    Block,
    BlockClose,
    Yield,
}

/// Classifies a template region.
///
/// Valid fragments are never control fragments: a region whose embedded
/// code parses cleanly is self-contained. Everything else is classified
/// by the stray-keyword counters first, then by the earliest control
/// keyword in the embedded tree.
pub fn detect_control_type(node: &ErbContentNode) -> ControlType {
    if node.tag_closing.is_none() {
        return ControlType::Unknown;
    }

    let ruby = match &node.analyzed {
        Some(ruby) => ruby,
        None => return ControlType::Unknown,
    };

    if ruby.valid {
        return ControlType::Unknown;
    }

    if ruby.elsif_count > 0 {
        return ControlType::Elsif;
    }
    if ruby.else_count > 0 {
        return ControlType::Else;
    }
    if ruby.end_count > 0 {
        return ControlType::End;
    }
    if ruby.when_count > 0 && ruby.case_count == 0 {
        return ControlType::When;
    }
    if ruby.in_count > 0 && ruby.case_match_count == 0 {
        return ControlType::In;
    }
    if ruby.rescue_count > 0 {
        return ControlType::Rescue;
    }
    if ruby.ensure_count > 0 {
        return ControlType::Ensure;
    }
    if ruby.block_closing_count > 0 {
        return ControlType::BlockClose;
    }

    if ruby.unclosed_control_flow_count == 0 && ruby.yield_count == 0 {
        return ControlType::Unknown;
    }

    find_earliest_control_keyword(ruby)
}

struct EarliestKeyword {
    control_type: ControlType,
    offset: usize,
    found: bool,
}

/// Walks the embedded tree for the control keyword with the smallest
/// byte offset. Two ordering exceptions: a block candidate displaces an
/// earlier yield, and a later yield never displaces a block.
fn find_earliest_control_keyword(ruby: &AnalyzedRuby) -> ControlType {
    let root = match &ruby.root {
        Some(root) => root,
        None => return ControlType::Unknown,
    };

    let mut result = EarliestKeyword { control_type: ControlType::Unknown, offset: usize::MAX, found: false };

    root.visit(&mut |node| {
        if let Some((control_type, offset)) = control_keyword_candidate(node) {
            let mut should_update = !result.found;

            if result.found {
                if control_type == ControlType::Block && result.control_type == ControlType::Yield {
                    should_update = true;
                } else if !(control_type == ControlType::Yield
                    && result.control_type == ControlType::Block)
                {
                    should_update = offset < result.offset;
                }
            }

            if should_update {
                result.control_type = control_type;
                result.offset = offset;
                result.found = true;
            }
        }
    });

    if result.found { result.control_type } else { ControlType::Unknown }
}

fn control_keyword_candidate(node: &RubyNode) -> Option<(ControlType, usize)> {
    match &node.kind {
        RubyNodeKind::If { keyword, .. } => Some((ControlType::If, keyword.start)),
        RubyNodeKind::Unless { keyword, .. } => Some((ControlType::Unless, keyword.start)),
        RubyNodeKind::Case { keyword, .. } => Some((ControlType::Case, keyword.start)),
        RubyNodeKind::CaseMatch { keyword, .. } => Some((ControlType::CaseMatch, keyword.start)),
        RubyNodeKind::While { keyword, .. } => Some((ControlType::While, keyword.start)),
        RubyNodeKind::Until { keyword, .. } => Some((ControlType::Until, keyword.start)),
        RubyNodeKind::For { keyword, .. } => Some((ControlType::For, keyword.start)),
        RubyNodeKind::Begin { keyword, .. } => Some((ControlType::Begin, keyword.start)),
        RubyNodeKind::Yield { keyword } => Some((ControlType::Yield, keyword.start)),
        RubyNodeKind::Call => {
            let block = node.block()?;
            match block.kind {
                RubyNodeKind::Block { delimiter: BlockDelimiter::Do, .. } => {
                    Some((ControlType::Block, node.span.start))
                }
                RubyNodeKind::Block { delimiter: BlockDelimiter::Brace, closing: None, .. } => {
                    Some((ControlType::Block, node.span.start))
                }
                _ => None,
            }
        }
        RubyNodeKind::Lambda { delimiter, closing, .. } => {
            let counts = *delimiter == BlockDelimiter::Do
                || (*delimiter == BlockDelimiter::Brace && closing.is_none());
            counts.then_some((ControlType::Block, node.span.start))
        }
        RubyNodeKind::Next { keyword }
        | RubyNodeKind::Break { keyword }
        | RubyNodeKind::Return { keyword } => Some((ControlType::Unknown, keyword.start)),
        _ => None,
    }
}

/// Which fragment types continue the structure opened by `parent_type`.
pub fn is_subsequent_type(parent_type: ControlType, child_type: ControlType) -> bool {
    match parent_type {
        ControlType::If | ControlType::Elsif => {
            child_type == ControlType::Elsif || child_type == ControlType::Else
        }
        ControlType::Case | ControlType::CaseMatch => {
            child_type == ControlType::When || child_type == ControlType::Else
        }
        ControlType::Begin => matches!(
            child_type,
            ControlType::Rescue | ControlType::Else | ControlType::Ensure
        ),
        ControlType::Rescue => child_type == ControlType::Rescue,
        ControlType::Unless => child_type == ControlType::Else,
        _ => false,
    }
}

/// Which fragment types terminate the body opened by `parent_type`.
pub fn is_terminator_type(parent_type: ControlType, child_type: ControlType) -> bool {
    if child_type == ControlType::End {
        return true;
    }

    match parent_type {
        ControlType::When => child_type == ControlType::When || child_type == ControlType::Else,
        ControlType::In => child_type == ControlType::In || child_type == ControlType::Else,
        ControlType::Block => child_type == ControlType::BlockClose,
        _ => is_subsequent_type(parent_type, child_type),
    }
}

/// Fragment types that open a compound structure.
pub fn is_compound_control_type(control_type: ControlType) -> bool {
    matches!(
        control_type,
        ControlType::If
            | ControlType::Case
            | ControlType::CaseMatch
            | ControlType::Begin
            | ControlType::Unless
            | ControlType::While
            | ControlType::Until
            | ControlType::For
            | ControlType::Block
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_terminates_everything() {
        for parent in [
            ControlType::If,
            ControlType::Unless,
            ControlType::While,
            ControlType::Block,
            ControlType::When,
        ] {
            assert!(is_terminator_type(parent, ControlType::End));
        }
    }

    #[test]
    fn test_if_subsequents() {
        assert!(is_subsequent_type(ControlType::If, ControlType::Elsif));
        assert!(is_subsequent_type(ControlType::If, ControlType::Else));
        assert!(!is_subsequent_type(ControlType::If, ControlType::When));
        assert!(!is_subsequent_type(ControlType::Unless, ControlType::Elsif));
    }

    #[test]
    fn test_block_close_terminates_blocks_only() {
        assert!(is_terminator_type(ControlType::Block, ControlType::BlockClose));
        assert!(!is_terminator_type(ControlType::If, ControlType::BlockClose));
    }

    #[test]
    fn test_when_arm_terminators() {
        assert!(is_terminator_type(ControlType::When, ControlType::When));
        assert!(is_terminator_type(ControlType::When, ControlType::Else));
        assert!(!is_terminator_type(ControlType::When, ControlType::Elsif));
    }

    #[test]
    fn test_compound_set() {
        assert!(is_compound_control_type(ControlType::If));
        assert!(is_compound_control_type(ControlType::Block));
        assert!(!is_compound_control_type(ControlType::Else));
        assert!(!is_compound_control_type(ControlType::Yield));
        assert!(!is_compound_control_type(ControlType::End));
    }
}
