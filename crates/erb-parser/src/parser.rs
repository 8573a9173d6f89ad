//! Document construction from the token stream.
//!
//! The parser is deliberately flat: HTML tags come out bare, as
//! individual [`Node::HtmlOpenTag`]/[`Node::HtmlCloseTag`] siblings, and
//! template regions come out as opaque [`Node::ErbContent`] leaves. The
//! analysis passes need that shape to reason about tags wrapped
//! asymmetrically in template conditionals; tag pairing into elements
//! happens after analysis.

use erb_ast::{
    DocumentNode, ErbContentNode, HtmlCloseTagNode, HtmlCommentNode, HtmlDoctypeNode,
    HtmlOpenTagNode, HtmlTextNode, Node, WhitespaceNode,
};
use erb_lexer::Lexer;
use erb_position_tracking::{Location, Position};
use erb_token::{Token, TokenKind};
use phf::phf_set;

/// Tags that never take a closing tag.
static VOID_ELEMENTS: phf::Set<&'static str> = phf_set! {
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link",
    "meta", "param", "source", "track", "wbr",
};

pub(crate) fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(name.to_ascii_lowercase().as_str())
}

/// Builds the flat document tree for a source.
pub(crate) fn parse_document(source: &str) -> DocumentNode {
    let (tokens, _) = Lexer::new(source).tokenize();
    let mut children = Vec::new();
    let mut index = 0;

    while index < tokens.len() {
        let token = &tokens[index];

        match token.kind {
            TokenKind::Eof => break,
            TokenKind::HtmlTagStart => index = parse_open_tag(&tokens, index, &mut children),
            TokenKind::HtmlTagStartClose => index = parse_close_tag(&tokens, index, &mut children),
            TokenKind::ErbStart => index = parse_erb_tag(&tokens, index, &mut children),
            TokenKind::HtmlCommentStart => index = parse_comment(&tokens, index, &mut children),
            TokenKind::HtmlDoctype => {
                children.push(Node::HtmlDoctype(HtmlDoctypeNode {
                    content: token.value.to_string(),
                    location: token.location,
                    errors: Vec::new(),
                }));
                index += 1;
            }
            TokenKind::Text | TokenKind::Whitespace | TokenKind::Newline => {
                index = parse_text_run(&tokens, index, &mut children);
            }
            _ => index += 1,
        }
    }

    let end = tokens
        .last()
        .map(|token| token.location.end)
        .unwrap_or_else(Position::start);

    DocumentNode {
        children,
        location: Location::new(Position::start(), end),
        errors: Vec::new(),
    }
}

fn parse_open_tag(tokens: &[Token], mut index: usize, children: &mut Vec<Node>) -> usize {
    let tag_opening = tokens[index].clone();
    index += 1;

    let tag_name = match tokens.get(index) {
        Some(token) if token.kind == TokenKind::Identifier => token.clone(),
        _ => {
            // `<` with no name degrades to text.
            children.push(Node::HtmlText(HtmlTextNode {
                content: tag_opening.value.to_string(),
                location: tag_opening.location,
                errors: Vec::new(),
            }));
            return index;
        }
    };
    index += 1;

    let mut attributes = Vec::new();
    let mut tag_closing = None;

    while let Some(token) = tokens.get(index) {
        match token.kind {
            TokenKind::HtmlTagEnd | TokenKind::HtmlTagSelfClose => {
                tag_closing = Some(token.clone());
                index += 1;
                break;
            }
            TokenKind::Eof => break,
            _ => {
                attributes.push(token.clone());
                index += 1;
            }
        }
    }

    let self_closing = tag_closing
        .as_ref()
        .is_some_and(|token| token.kind == TokenKind::HtmlTagSelfClose);
    let is_void = self_closing || is_void_element(&tag_name.value);

    let end = tag_closing
        .as_ref()
        .map(|token| token.location.end)
        .or_else(|| attributes.last().map(|token| token.location.end))
        .unwrap_or(tag_name.location.end);

    children.push(Node::HtmlOpenTag(HtmlOpenTagNode {
        location: Location::new(tag_opening.location.start, end),
        tag_opening,
        tag_name,
        attributes,
        tag_closing,
        is_void,
        errors: Vec::new(),
    }));

    index
}

fn parse_close_tag(tokens: &[Token], mut index: usize, children: &mut Vec<Node>) -> usize {
    let tag_opening = tokens[index].clone();
    index += 1;

    let tag_name = match tokens.get(index) {
        Some(token) if token.kind == TokenKind::Identifier => token.clone(),
        _ => {
            children.push(Node::HtmlText(HtmlTextNode {
                content: tag_opening.value.to_string(),
                location: tag_opening.location,
                errors: Vec::new(),
            }));
            return index;
        }
    };
    index += 1;

    let mut tag_closing = None;

    while let Some(token) = tokens.get(index) {
        match token.kind {
            TokenKind::HtmlTagEnd => {
                tag_closing = Some(token.clone());
                index += 1;
                break;
            }
            TokenKind::Eof => break,
            _ => index += 1,
        }
    }

    let end = tag_closing
        .as_ref()
        .map(|token| token.location.end)
        .unwrap_or(tag_name.location.end);

    children.push(Node::HtmlCloseTag(HtmlCloseTagNode {
        location: Location::new(tag_opening.location.start, end),
        tag_opening,
        tag_name,
        tag_closing,
        errors: Vec::new(),
    }));

    index
}

fn parse_erb_tag(tokens: &[Token], mut index: usize, children: &mut Vec<Node>) -> usize {
    let tag_opening = tokens[index].clone();
    index += 1;

    let content = match tokens.get(index) {
        Some(token) if token.kind == TokenKind::ErbContent => {
            index += 1;
            Some(token.clone())
        }
        _ => None,
    };

    let tag_closing = match tokens.get(index) {
        Some(token) if token.kind == TokenKind::ErbEnd => {
            index += 1;
            Some(token.clone())
        }
        _ => None,
    };

    let end = tag_closing
        .as_ref()
        .map(|token| token.location.end)
        .or_else(|| content.as_ref().map(|token| token.location.end))
        .unwrap_or(tag_opening.location.end);

    children.push(Node::ErbContent(ErbContentNode {
        location: Location::new(tag_opening.location.start, end),
        tag_opening,
        content,
        tag_closing,
        parsed: false,
        valid: false,
        analyzed: None,
        errors: Vec::new(),
    }));

    index
}

fn parse_comment(tokens: &[Token], mut index: usize, children: &mut Vec<Node>) -> usize {
    let start = tokens[index].location.start;
    let mut end = tokens[index].location.end;
    let mut content = String::new();
    index += 1;

    while let Some(token) = tokens.get(index) {
        end = token.location.end;
        index += 1;

        match token.kind {
            TokenKind::HtmlCommentEnd => break,
            TokenKind::Eof => break,
            _ => content.push_str(&token.value),
        }
    }

    children.push(Node::HtmlComment(HtmlCommentNode {
        content,
        location: Location::new(start, end),
        errors: Vec::new(),
    }));

    index
}

fn parse_text_run(tokens: &[Token], mut index: usize, children: &mut Vec<Node>) -> usize {
    let start = tokens[index].location.start;
    let mut end = tokens[index].location.end;
    let mut content = String::new();
    let mut has_text = false;

    while let Some(token) = tokens.get(index) {
        match token.kind {
            TokenKind::Text | TokenKind::Whitespace | TokenKind::Newline => {
                has_text |= token.kind == TokenKind::Text;
                content.push_str(&token.value);
                end = token.location.end;
                index += 1;
            }
            _ => break,
        }
    }

    let location = Location::new(start, end);

    if has_text {
        children.push(Node::HtmlText(HtmlTextNode { content, location, errors: Vec::new() }));
    } else {
        children.push(Node::Whitespace(WhitespaceNode { content, location, errors: Vec::new() }));
    }

    index
}
