//! Token definitions for the HTML+ERB lexer
//!
//! This crate provides the shared token type consumed by the document
//! parser and referenced by AST nodes. Tokens keep their original text so
//! nodes assembled from them can reconstruct conditions, tag names, and
//! keyword locations without re-reading the source.

use erb_position_tracking::{Location, Span};
use std::fmt;
use std::sync::Arc;

/// Token produced by the lexer and consumed by the document parser.
///
/// Stores the token kind, original source text, byte span, and line/column
/// location. The text is kept in an `Arc<str>` so tokens can be cloned
/// cheaply into the nodes that own them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token classification for parser decision making
    pub kind: TokenKind,
    /// Original source text for precise reconstruction
    pub value: Arc<str>,
    /// Byte range in the source
    pub span: Span,
    /// Line/column range in the source
    pub location: Location,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, value: impl Into<Arc<str>>, span: Span, location: Location) -> Self {
        Token { kind, value: value.into(), span, location }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#<Token type={:?} value={:?} range={} start={} end={}>",
            self.kind, self.value, self.span, self.location.start, self.location.end
        )
    }
}

/// Token classification for HTML+ERB lexing.
///
/// The set is intentionally coarse: the document parser needs tag
/// structure and opaque template regions, not a full HTML attribute
/// grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // ===== HTML structure =====
    /// Open-tag start: `<`
    HtmlTagStart,
    /// Close-tag start: `</`
    HtmlTagStartClose,
    /// Tag end: `>`
    HtmlTagEnd,
    /// Self-closing tag end: `/>`
    HtmlTagSelfClose,
    /// Comment start: `<!--`
    HtmlCommentStart,
    /// Comment end: `-->`
    HtmlCommentEnd,
    /// Doctype declaration: `<!DOCTYPE …>`
    HtmlDoctype,

    // ===== Inside tags =====
    /// Tag or attribute name
    Identifier,
    /// Attribute assignment: `=`
    Equals,
    /// Quoted attribute value (quotes included in the text)
    QuotedValue,

    // ===== Template regions =====
    /// ERB opener: `<%`, `<%=`, `<%-`, `<%#`, `<%%`, `<%%=`, `<%graphql`
    ErbStart,
    /// Raw code between an ERB opener and closer
    ErbContent,
    /// ERB closer: `%>`, `-%>`, `%%>`
    ErbEnd,

    // ===== Content =====
    /// Text content outside of tags
    Text,
    /// Run of spaces or tabs
    Whitespace,
    /// Line break
    Newline,

    // ===== Special =====
    /// End of input
    Eof,
}

impl TokenKind {
    /// Human-readable description used in diagnostics.
    pub fn friendly(&self) -> &'static str {
        match self {
            TokenKind::HtmlTagStart => "`<`",
            TokenKind::HtmlTagStartClose => "`</`",
            TokenKind::HtmlTagEnd => "`>`",
            TokenKind::HtmlTagSelfClose => "`/>`",
            TokenKind::HtmlCommentStart => "`<!--`",
            TokenKind::HtmlCommentEnd => "`-->`",
            TokenKind::HtmlDoctype => "a doctype",
            TokenKind::Identifier => "an identifier",
            TokenKind::Equals => "`=`",
            TokenKind::QuotedValue => "a quoted value",
            TokenKind::ErbStart => "`<%`",
            TokenKind::ErbContent => "template code",
            TokenKind::ErbEnd => "`%>`",
            TokenKind::Text => "text",
            TokenKind::Whitespace => "whitespace",
            TokenKind::Newline => "a newline",
            TokenKind::Eof => "end of file",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erb_position_tracking::Position;

    #[test]
    fn test_token_display() {
        let token = Token::new(
            TokenKind::Identifier,
            "hello",
            Span::new(0, 5),
            Location::new(Position::new(1, 0), Position::new(1, 5)),
        );

        assert_eq!(
            format!("{}", token),
            "#<Token type=Identifier value=\"hello\" range=[0, 5] start=(1:0) end=(1:5)>"
        );
    }

    #[test]
    fn test_friendly_strings() {
        assert_eq!(TokenKind::Identifier.friendly(), "an identifier");
        assert_eq!(TokenKind::Whitespace.friendly(), "whitespace");
        assert_eq!(TokenKind::Newline.friendly(), "a newline");
        assert_eq!(TokenKind::Eof.friendly(), "end of file");
        assert_eq!(TokenKind::HtmlTagStartClose.friendly(), "`</`");
        assert_eq!(TokenKind::ErbStart.friendly(), "`<%`");
    }
}
