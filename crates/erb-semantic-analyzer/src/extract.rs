//! Language extraction buffers.
//!
//! Produces position-stable views of a template: every buffer has the
//! same length as the source with newlines preserved, so offsets and
//! line/column positions carry over unchanged.

use erb_lexer::Lexer;
use erb_token::TokenKind;

const LITERAL_OPENERS: [&str; 4] = ["<%%", "<%%=", "<%#", "<%graphql"];

/// The embedded code with HTML blanked out and a `;` at each region's
/// closer, so consecutive regions parse as separate statements.
pub fn ruby_with_semicolons(source: &str) -> String {
    extract_ruby(source, true)
}

/// The embedded code with HTML blanked out.
pub fn ruby(source: &str) -> String {
    extract_ruby(source, false)
}

fn extract_ruby(source: &str, with_semicolons: bool) -> String {
    let (tokens, _) = Lexer::new(source).tokenize();
    let mut buffer = blank_copy(source);
    let mut literal = false;

    for token in &tokens {
        match token.kind {
            TokenKind::ErbStart => {
                literal = LITERAL_OPENERS.contains(&token.value.as_ref());
            }
            TokenKind::ErbContent => {
                if !literal {
                    copy_span(&mut buffer, source, token.span.start, token.span.end);
                }
            }
            TokenKind::ErbEnd => {
                if !literal && with_semicolons && token.span.start < buffer.len() {
                    buffer[token.span.start] = b';';
                }
                literal = false;
            }
            _ => {}
        }
    }

    // The buffer is the source with bytes selectively replaced by ASCII,
    // so it stays valid UTF-8 wherever multibyte text survives.
    String::from_utf8(buffer).unwrap_or_default()
}

/// The HTML with every template region blanked out.
pub fn html(source: &str) -> String {
    let (tokens, _) = Lexer::new(source).tokenize();
    let mut buffer: Vec<u8> = source.as_bytes().to_vec();

    for token in &tokens {
        if matches!(token.kind, TokenKind::ErbStart | TokenKind::ErbContent | TokenKind::ErbEnd) {
            blank_span(&mut buffer, token.span.start, token.span.end);
        }
    }

    String::from_utf8(buffer).unwrap_or_default()
}

fn blank_copy(source: &str) -> Vec<u8> {
    source
        .bytes()
        .map(|byte| if byte == b'\n' { b'\n' } else { b' ' })
        .collect()
}

fn blank_span(buffer: &mut [u8], start: usize, end: usize) {
    let end = end.min(buffer.len());
    for slot in buffer.iter_mut().take(end).skip(start) {
        if *slot != b'\n' {
            *slot = b' ';
        }
    }
}

fn copy_span(buffer: &mut [u8], source: &str, start: usize, end: usize) {
    let bytes = source.as_bytes();
    for offset in start..end.min(buffer.len()) {
        buffer[offset] = bytes[offset];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ruby_extraction_is_position_stable() {
        let source = "<p><% if x %>A<% end %></p>";
        let extracted = ruby_with_semicolons(source);

        assert_eq!(extracted.len(), source.len());
        assert_eq!(&extracted[5..10], " if x");
        assert!(extracted.contains(';'));
    }

    #[test]
    fn test_ruby_extraction_skips_literal_tags() {
        let extracted = ruby_with_semicolons("<%# comment %><% x %>");
        assert!(!extracted.contains("comment"));
        assert!(extracted.contains(" x "));
    }

    #[test]
    fn test_semicolon_sits_at_the_closer() {
        let source = "<% x %>";
        let extracted = ruby_with_semicolons(source);
        assert_eq!(extracted, "   x ; ");
    }

    #[test]
    fn test_html_extraction_blanks_template_regions() {
        let source = "<p><%= name %></p>";
        let extracted = html(source);

        assert_eq!(extracted.len(), source.len());
        assert!(extracted.starts_with("<p>"));
        assert!(extracted.ends_with("</p>"));
        assert!(!extracted.contains("name"));
    }

    #[test]
    fn test_newlines_preserved() {
        let source = "<% if x %>\n<% end %>";
        let extracted = ruby_with_semicolons(source);
        assert_eq!(extracted.matches('\n').count(), 1);
    }
}
