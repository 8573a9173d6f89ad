//! Construction of compound control nodes from spent fragments.
//!
//! When the structure assembler consumes an opener fragment, the builder
//! here moves the fragment's tokens and errors into the freshly built
//! compound node, so each diagnostic keeps exactly one owner.

use crate::control_type::ControlType;
use erb_ast::{
    ErbBlockNode, ErbContentNode, ErbElseNode, ErbEndNode, ErbEnsureNode, ErbForNode, ErbIfNode,
    ErbInNode, ErbRescueNode, ErbUnlessNode, ErbUntilNode, ErbWhenNode, ErbWhileNode, ErbYieldNode,
    Node,
};
use erb_position_tracking::{Location, Position};

/// End position of a fragment: its closer, else its content, else its
/// opener.
pub fn erb_content_end_position(node: &ErbContentNode) -> Position {
    if let Some(closing) = &node.tag_closing {
        closing.location.end
    } else if let Some(content) = &node.content {
        content.location.end
    } else {
        node.tag_opening.location.end
    }
}

/// Location of the optional `then` keyword for fragments that may carry
/// one, re-based from fragment-relative offsets onto the document.
pub fn compute_then_keyword(node: &ErbContentNode, control_type: ControlType) -> Option<Location> {
    if !matches!(
        control_type,
        ControlType::If
            | ControlType::Elsif
            | ControlType::Unless
            | ControlType::When
            | ControlType::In
    ) {
        return None;
    }

    let content = node.content.as_ref()?;

    if !content.value.contains("then") {
        return None;
    }

    let span = erb_ruby::find_then_token(&content.value)?;

    let text = &content.value[..span.start];
    let line_offset = text.bytes().filter(|&b| b == b'\n').count();
    let column = match text.rfind('\n') {
        Some(newline) => span.start - newline - 1,
        None => content.location.start.column + span.start,
    };

    let start = Position::new(content.location.start.line + line_offset, column);
    let end = Position::new(start.line, start.column + span.len());

    Some(Location::new(start, end))
}

/// Builds the compound node for a consumed opener fragment.
///
/// `children`, `subsequent`, and `end_node` were assembled by the caller;
/// the fragment's tokens and errors transfer into the result. Returns
/// `None` for fragment types that have no builder.
pub fn create_control_node(
    erb_node: ErbContentNode,
    children: Vec<Node>,
    subsequent: Option<Node>,
    end_node: Option<Box<ErbEndNode>>,
    control_type: ControlType,
) -> Option<Node> {
    let then_keyword = compute_then_keyword(&erb_node, control_type);
    let start_position = erb_node.tag_opening.location.start;

    let mut end_position = erb_content_end_position(&erb_node);
    if let Some(end) = &end_node {
        end_position = end.location.end;
    } else if let Some(last_child) = children.last() {
        end_position = last_child.location().end;
    } else if let Some(subsequent) = &subsequent {
        end_position = subsequent.location().end;
    }

    let location = Location::new(start_position, end_position);

    let ErbContentNode { tag_opening, content, tag_closing, errors, .. } = erb_node;

    let node = match control_type {
        ControlType::If | ControlType::Elsif => Node::ErbIf(ErbIfNode {
            tag_opening,
            content,
            tag_closing,
            then_keyword,
            statements: children,
            subsequent: subsequent.map(Box::new),
            end_node,
            location,
            errors,
        }),
        ControlType::Else => Node::ErbElse(ErbElseNode {
            tag_opening,
            content,
            tag_closing,
            statements: children,
            location,
            errors,
        }),
        ControlType::When => Node::ErbWhen(ErbWhenNode {
            tag_opening: Some(tag_opening),
            content,
            tag_closing,
            then_keyword,
            statements: children,
            location,
            errors,
        }),
        ControlType::In => Node::ErbIn(ErbInNode {
            tag_opening: Some(tag_opening),
            content,
            tag_closing,
            then_keyword,
            statements: children,
            location,
            errors,
        }),
        ControlType::Rescue => {
            let chained = match subsequent {
                Some(Node::ErbRescue(rescue)) => Some(Box::new(rescue)),
                _ => None,
            };
            Node::ErbRescue(ErbRescueNode {
                tag_opening,
                content,
                tag_closing,
                statements: children,
                subsequent: chained,
                location,
                errors,
            })
        }
        ControlType::Ensure => Node::ErbEnsure(ErbEnsureNode {
            tag_opening,
            content,
            tag_closing,
            statements: children,
            location,
            errors,
        }),
        ControlType::Unless => {
            let else_clause = match subsequent {
                Some(Node::ErbElse(else_node)) => Some(Box::new(else_node)),
                _ => None,
            };
            Node::ErbUnless(ErbUnlessNode {
                tag_opening,
                content,
                tag_closing,
                then_keyword,
                statements: children,
                else_clause,
                end_node,
                location,
                errors,
            })
        }
        ControlType::While => Node::ErbWhile(ErbWhileNode {
            tag_opening,
            content,
            tag_closing,
            statements: children,
            end_node,
            location,
            errors,
        }),
        ControlType::Until => Node::ErbUntil(ErbUntilNode {
            tag_opening,
            content,
            tag_closing,
            statements: children,
            end_node,
            location,
            errors,
        }),
        ControlType::For => Node::ErbFor(ErbForNode {
            tag_opening,
            content,
            tag_closing,
            statements: children,
            end_node,
            location,
            errors,
        }),
        ControlType::Block => Node::ErbBlock(ErbBlockNode {
            tag_opening,
            content,
            tag_closing,
            body: children,
            end_node,
            location,
            errors,
        }),
        ControlType::Yield => Node::ErbYield(ErbYieldNode {
            tag_opening,
            content,
            tag_closing,
            location,
            errors,
        }),
        ControlType::Unknown
        | ControlType::End
        | ControlType::Case
        | ControlType::CaseMatch
        | ControlType::Begin
        | ControlType::BlockClose => return None,
    };

    Some(node)
}

/// Consumes a terminator fragment into an [`ErbEndNode`].
pub fn build_end_node(end_erb: ErbContentNode) -> Box<ErbEndNode> {
    let end_position = erb_content_end_position(&end_erb);
    let ErbContentNode { tag_opening, content, tag_closing, errors, .. } = end_erb;
    let location = Location::new(tag_opening.location.start, end_position);

    Box::new(ErbEndNode { tag_opening, content, tag_closing, location, errors })
}

#[cfg(test)]
mod tests {
    use super::*;
    use erb_position_tracking::Span;
    use erb_token::{Token, TokenKind};

    fn token(kind: TokenKind, value: &str, start: usize) -> Token {
        let end = start + value.len();
        Token::new(
            kind,
            value,
            Span::new(start, end),
            Location::new(Position::new(1, start), Position::new(1, end)),
        )
    }

    fn fragment(content: &str) -> ErbContentNode {
        let opening = token(TokenKind::ErbStart, "<%", 0);
        let content_token = token(TokenKind::ErbContent, content, 2);
        let closing = token(TokenKind::ErbEnd, "%>", 2 + content.len());
        let location = Location::new(opening.location.start, closing.location.end);

        ErbContentNode {
            tag_opening: opening,
            content: Some(content_token),
            tag_closing: Some(closing),
            parsed: false,
            valid: false,
            analyzed: None,
            location,
            errors: Vec::new(),
        }
    }

    #[test]
    fn test_end_position_prefers_closer() {
        let node = fragment(" if x ");
        assert_eq!(erb_content_end_position(&node), Position::new(1, 10));
    }

    #[test]
    fn test_then_keyword_rebased_onto_content() {
        let node = fragment(" if ready then ");
        let location = compute_then_keyword(&node, ControlType::If);
        // " if ready then " has `then` at offset 10, content starts at column 2
        assert_eq!(
            location,
            Some(Location::new(Position::new(1, 12), Position::new(1, 16)))
        );
    }

    #[test]
    fn test_then_keyword_absent() {
        let node = fragment(" if ready ");
        assert_eq!(compute_then_keyword(&node, ControlType::If), None);
    }

    #[test]
    fn test_then_keyword_only_for_conditional_arms() {
        let node = fragment(" while busy then ");
        assert_eq!(compute_then_keyword(&node, ControlType::While), None);
    }

    #[test]
    fn test_create_if_node_transfers_errors() {
        let mut donor = fragment(" if x ");
        donor.errors.push(erb_error::AnalyzeError::MissingErbEnd { location: donor.location });

        let node = create_control_node(donor, Vec::new(), None, None, ControlType::If);
        assert!(matches!(&node, Some(Node::ErbIf(if_node)) if if_node.errors.len() == 1));
    }

    #[test]
    fn test_yield_builder() {
        let donor = fragment(" yield ");
        let node = create_control_node(donor, Vec::new(), None, None, ControlType::Yield);
        assert!(matches!(node, Some(Node::ErbYield(_))));
    }

    #[test]
    fn test_no_builder_for_terminators() {
        let donor = fragment(" end ");
        assert!(create_control_node(donor, Vec::new(), None, None, ControlType::End).is_none());
    }
}
