//! Mode-based HTML+ERB tokenizer
//!
//! Splits a template source into the coarse token stream the document
//! parser consumes: HTML tag punctuation, identifiers and quoted values
//! inside tags, text/whitespace runs outside of them, and opaque ERB
//! regions (opener, raw content, closer).
//!
//! The lexer never fails: malformed input degrades to text or to an
//! unterminated region recorded in the error list, and lexing continues.
//!
//! # Usage
//!
//! ```
//! use erb_lexer::Lexer;
//! use erb_token::TokenKind;
//!
//! let (tokens, errors) = Lexer::new("<p><%= name %></p>").tokenize();
//! assert!(errors.is_empty());
//! assert_eq!(tokens[0].kind, TokenKind::HtmlTagStart);
//! ```

mod error;

pub use error::LexError;

use erb_position_tracking::{Location, Position, Span};
use erb_token::{Token, TokenKind};
use memchr::{memchr, memchr2};

/// Lexer modes. The same `<`/`=`/quote bytes mean different things inside
/// and outside of a tag, so the lexer tracks which region it is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Between tags: text, whitespace, comments, tag openers
    Content,
    /// Between `<name` and `>`: attributes
    InsideTag,
}

/// HTML+ERB tokenizer.
pub struct Lexer<'a> {
    source: &'a str,
    offset: usize,
    position: Position,
    mode: Mode,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over the given source.
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source,
            offset: 0,
            position: Position::start(),
            mode: Mode::Content,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Tokenizes the whole source, returning the token stream (always
    /// terminated by an `Eof` token) and any recoverable lexing errors.
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<LexError>) {
        while self.offset < self.source.len() {
            match self.mode {
                Mode::Content => self.lex_content(),
                Mode::InsideTag => self.lex_inside_tag(),
            }
        }

        let at_end = Location::at(self.position);
        self.tokens.push(Token::new(TokenKind::Eof, "", Span::empty(self.offset), at_end));

        (self.tokens, self.errors)
    }

    fn rest(&self) -> &'a str {
        &self.source[self.offset..]
    }

    fn peek_byte(&self, ahead: usize) -> Option<u8> {
        self.source.as_bytes().get(self.offset + ahead).copied()
    }

    /// Consumes `len` bytes and emits them as a single token.
    fn emit(&mut self, kind: TokenKind, len: usize) {
        let start_offset = self.offset;
        let start_position = self.position;
        let text = &self.source[start_offset..start_offset + len];

        self.position.advance_str(text);
        self.offset += len;

        self.tokens.push(Token::new(
            kind,
            text,
            Span::new(start_offset, self.offset),
            Location::new(start_position, self.position),
        ));
    }

    fn lex_content(&mut self) {
        let rest = self.rest();
        let bytes = rest.as_bytes();

        if rest.starts_with("<%") {
            self.lex_erb_tag();
            return;
        }

        if rest.starts_with("<!--") {
            self.lex_comment();
            return;
        }

        if rest.len() >= 2 && rest[..2].eq_ignore_ascii_case("<!") {
            self.lex_doctype();
            return;
        }

        if rest.starts_with("</") && bytes.get(2).is_some_and(|b| b.is_ascii_alphabetic()) {
            self.emit(TokenKind::HtmlTagStartClose, 2);
            self.mode = Mode::InsideTag;
            return;
        }

        if bytes[0] == b'<' && bytes.get(1).is_some_and(|b| b.is_ascii_alphabetic()) {
            self.emit(TokenKind::HtmlTagStart, 1);
            self.mode = Mode::InsideTag;
            return;
        }

        if bytes[0] == b'\n' {
            self.emit(TokenKind::Newline, 1);
            return;
        }

        if rest.starts_with("\r\n") {
            self.emit(TokenKind::Newline, 2);
            return;
        }

        if bytes[0] == b' ' || bytes[0] == b'\t' {
            let mut len = 1;
            while bytes.get(len).is_some_and(|&b| b == b' ' || b == b'\t') {
                len += 1;
            }
            self.emit(TokenKind::Whitespace, len);
            return;
        }

        // Text runs up to the next structural byte. A lone `<` that opened
        // neither a tag nor a comment is swallowed as text.
        let mut len = if bytes[0] == b'<' { 1 } else { 0 };
        len += memchr2(b'<', b'\n', &bytes[len..]).unwrap_or(rest.len() - len);
        self.emit(TokenKind::Text, len.max(1));
    }

    fn lex_inside_tag(&mut self) {
        let rest = self.rest();
        let bytes = rest.as_bytes();

        if rest.starts_with("<%") {
            self.lex_erb_tag();
            return;
        }

        if rest.starts_with("/>") {
            self.emit(TokenKind::HtmlTagSelfClose, 2);
            self.mode = Mode::Content;
            return;
        }

        match bytes[0] {
            b'>' => {
                self.emit(TokenKind::HtmlTagEnd, 1);
                self.mode = Mode::Content;
            }
            b'=' => self.emit(TokenKind::Equals, 1),
            b'\n' => self.emit(TokenKind::Newline, 1),
            b' ' | b'\t' | b'\r' => {
                let mut len = 1;
                while bytes.get(len).is_some_and(|&b| matches!(b, b' ' | b'\t' | b'\r')) {
                    len += 1;
                }
                self.emit(TokenKind::Whitespace, len);
            }
            quote @ (b'"' | b'\'') => self.lex_quoted_value(quote),
            b if is_identifier_byte(b) => {
                let mut len = 1;
                while bytes.get(len).is_some_and(|&b| is_identifier_byte(b)) {
                    len += 1;
                }
                self.emit(TokenKind::Identifier, len);
            }
            _ => self.emit(TokenKind::Text, 1),
        }
    }

    fn lex_quoted_value(&mut self, quote: u8) {
        let bytes = self.rest().as_bytes();

        match memchr(quote, &bytes[1..]) {
            Some(index) => self.emit(TokenKind::QuotedValue, index + 2),
            None => {
                self.errors.push(LexError::UnterminatedQuotedValue {
                    span: Span::new(self.offset, self.source.len()),
                });
                self.emit(TokenKind::QuotedValue, bytes.len());
            }
        }
    }

    fn lex_comment(&mut self) {
        self.emit(TokenKind::HtmlCommentStart, 4);

        let rest = self.rest();

        match rest.find("-->") {
            Some(index) => {
                if index > 0 {
                    self.emit(TokenKind::Text, index);
                }
                self.emit(TokenKind::HtmlCommentEnd, 3);
            }
            None => {
                self.errors.push(LexError::UnterminatedComment {
                    span: Span::new(self.offset, self.source.len()),
                });
                if !rest.is_empty() {
                    self.emit(TokenKind::Text, rest.len());
                }
            }
        }
    }

    fn lex_doctype(&mut self) {
        let rest = self.rest();
        let len = match memchr(b'>', rest.as_bytes()) {
            Some(index) => index + 1,
            None => rest.len(),
        };

        self.emit(TokenKind::HtmlDoctype, len);
    }

    /// Lexes `<%…%>` as opener, raw content, closer. Literal regions
    /// (`<%%`) close with `%%>`; executable regions close with `%>` or
    /// `-%>`.
    fn lex_erb_tag(&mut self) {
        let rest = self.rest();

        let opener_len = if rest.starts_with("<%%=") {
            4
        } else if rest.starts_with("<%graphql") {
            9
        } else if rest.starts_with("<%%") {
            3
        } else if rest.starts_with("<%=") || rest.starts_with("<%-") || rest.starts_with("<%#") {
            3
        } else {
            2
        };

        let literal = rest.starts_with("<%%");

        self.emit(TokenKind::ErbStart, opener_len);

        let rest = self.rest();
        let closer = if literal { find_literal_closer(rest) } else { find_closer(rest) };

        match closer {
            Some((content_len, closer_len)) => {
                if content_len > 0 {
                    self.emit(TokenKind::ErbContent, content_len);
                }
                self.emit(TokenKind::ErbEnd, closer_len);
            }
            None => {
                self.errors.push(LexError::UnterminatedErbTag {
                    span: Span::new(self.offset.saturating_sub(opener_len), self.source.len()),
                });
                if !rest.is_empty() {
                    self.emit(TokenKind::ErbContent, rest.len());
                }
            }
        }
    }
}

/// Finds `%>` (or `-%>`), returning (content length, closer length).
fn find_closer(rest: &str) -> Option<(usize, usize)> {
    let bytes = rest.as_bytes();
    let mut from = 0;

    while let Some(index) = memchr(b'%', &bytes[from..]) {
        let at = from + index;

        if bytes.get(at + 1) == Some(&b'>') {
            if at > 0 && bytes[at - 1] == b'-' {
                return Some((at - 1, 3));
            }
            return Some((at, 2));
        }

        from = at + 1;
    }

    None
}

/// Finds `%%>`, returning (content length, closer length).
fn find_literal_closer(rest: &str) -> Option<(usize, usize)> {
    rest.find("%%>").map(|index| (index, 3))
}

fn is_identifier_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b':' | b'.' | b'@' | b'#')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, _) = Lexer::new(source).tokenize();
        tokens.iter().map(|t| t.kind).collect()
    }

    fn values(source: &str) -> Vec<String> {
        let (tokens, _) = Lexer::new(source).tokenize();
        tokens.iter().map(|t| t.value.to_string()).collect()
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(kinds("hello"), vec![TokenKind::Text, TokenKind::Eof]);
    }

    #[test]
    fn test_simple_element() {
        assert_eq!(
            kinds("<div>x</div>"),
            vec![
                TokenKind::HtmlTagStart,
                TokenKind::Identifier,
                TokenKind::HtmlTagEnd,
                TokenKind::Text,
                TokenKind::HtmlTagStartClose,
                TokenKind::Identifier,
                TokenKind::HtmlTagEnd,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_attributes() {
        assert_eq!(
            kinds(r#"<a href="/x" disabled>"#),
            vec![
                TokenKind::HtmlTagStart,
                TokenKind::Identifier,
                TokenKind::Whitespace,
                TokenKind::Identifier,
                TokenKind::Equals,
                TokenKind::QuotedValue,
                TokenKind::Whitespace,
                TokenKind::Identifier,
                TokenKind::HtmlTagEnd,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_self_closing_tag() {
        assert_eq!(
            kinds("<br/>"),
            vec![
                TokenKind::HtmlTagStart,
                TokenKind::Identifier,
                TokenKind::HtmlTagSelfClose,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_erb_tag() {
        assert_eq!(
            values("<% if x %>"),
            vec!["<%", " if x ", "%>", ""]
        );
    }

    #[test]
    fn test_erb_output_tag() {
        assert_eq!(
            kinds("<%= name %>"),
            vec![TokenKind::ErbStart, TokenKind::ErbContent, TokenKind::ErbEnd, TokenKind::Eof]
        );
        assert_eq!(values("<%= name %>")[0], "<%=");
    }

    #[test]
    fn test_erb_trim_closer() {
        assert_eq!(values("<% x -%>"), vec!["<%", " x ", "-%>", ""]);
    }

    #[test]
    fn test_erb_literal_tag() {
        assert_eq!(values("<%% raw %%>"), vec!["<%%", " raw ", "%%>", ""]);
    }

    #[test]
    fn test_erb_comment_opener() {
        assert_eq!(values("<%# note %>")[0], "<%#");
    }

    #[test]
    fn test_erb_inside_tag() {
        assert_eq!(
            kinds(r#"<div <% if x %>class="a"<% end %>>"#),
            vec![
                TokenKind::HtmlTagStart,
                TokenKind::Identifier,
                TokenKind::Whitespace,
                TokenKind::ErbStart,
                TokenKind::ErbContent,
                TokenKind::ErbEnd,
                TokenKind::Identifier,
                TokenKind::Equals,
                TokenKind::QuotedValue,
                TokenKind::ErbStart,
                TokenKind::ErbContent,
                TokenKind::ErbEnd,
                TokenKind::HtmlTagEnd,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_erb_tag() {
        let (tokens, errors) = Lexer::new("<% if x").tokenize();
        assert_eq!(errors.len(), 1);
        assert_eq!(tokens[1].kind, TokenKind::ErbContent);
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
    }

    #[test]
    fn test_comment() {
        assert_eq!(
            kinds("<!-- note -->"),
            vec![TokenKind::HtmlCommentStart, TokenKind::Text, TokenKind::HtmlCommentEnd, TokenKind::Eof]
        );
    }

    #[test]
    fn test_doctype() {
        assert_eq!(kinds("<!DOCTYPE html>"), vec![TokenKind::HtmlDoctype, TokenKind::Eof]);
    }

    #[test]
    fn test_stray_angle_is_text() {
        assert_eq!(values("a < b"), vec!["a ", "< b", ""]);
    }

    #[test]
    fn test_newline_positions() {
        let (tokens, _) = Lexer::new("a\nb").tokenize();
        assert_eq!(tokens[2].location.start.line, 2);
        assert_eq!(tokens[2].location.start.column, 0);
    }
}
