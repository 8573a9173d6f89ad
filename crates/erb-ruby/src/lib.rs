//! Control-flow-oriented Ruby parser for embedded template code
//!
//! The template analyzer needs to know, for each `<% … %>` region, which
//! control-flow constructs the code opens or continues, which keywords are
//! stray, and where the interesting keywords sit. This crate answers those
//! questions with a structural parse: strings, comments, embedded
//! documents, and nesting are resolved exactly; expressions stay opaque.
//!
//! # Usage
//!
//! ```
//! use erb_ruby::{parse, RubyNodeKind};
//!
//! let result = parse("if user.admin?");
//! assert!(!result.diagnostics.is_empty()); // unterminated `if`
//! assert!(matches!(result.root.children[0].kind, RubyNodeKind::If { .. }));
//! ```
//!
//! Diagnostic message strings are part of the public contract (the
//! analyzer matches several of them verbatim) and live in [`messages`].

mod lexer;
pub mod messages;
mod node;
mod parser;

pub use node::{BlockDelimiter, RubyNode, RubyNodeKind};

use erb_position_tracking::Span;
use parser::RubyParser;

/// Severity of a parse diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    /// The construct is wrong or unterminated
    Error,
    /// Suspicious but parseable
    Warning,
}

/// A single message from the embedded parse, located within the fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Human-readable message (several are matched verbatim downstream)
    pub message: String,
    /// Severity
    pub level: DiagnosticLevel,
    /// Byte range within the parsed fragment
    pub span: Span,
}

/// How the fragment is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Whole-script rules: jump keywords need an enclosing loop/rescue
    Main,
    /// Partial-script rules: the fragment is a slice of a larger script,
    /// so top-level `break`/`next`/`redo`/`retry` are permitted
    PartialScript,
}

/// Result of parsing one fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    /// Root statements node
    pub root: RubyNode,
    /// Everything the parse complained about, in source order
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseResult {
    /// True when the parse produced no diagnostics.
    pub fn is_valid(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// True if any diagnostic message equals `message` exactly.
    pub fn has_diagnostic(&self, message: &str) -> bool {
        self.diagnostics.iter().any(|diagnostic| diagnostic.message == message)
    }
}

/// Parses a fragment with whole-script rules.
pub fn parse(source: &str) -> ParseResult {
    RubyParser::new(ParseMode::Main).parse(source)
}

/// Parses a fragment with partial-script rules (see [`ParseMode`]).
pub fn parse_partial(source: &str) -> ParseResult {
    RubyParser::new(ParseMode::PartialScript).parse(source)
}

/// Finds the first `then` keyword token in a fragment, outside of
/// strings and comments. Used to recover `then` locations for arms the
/// fragment parse reports only as stray keywords.
pub fn find_then_token(source: &str) -> Option<Span> {
    let result = parse(source);
    let mut found = None;

    result.root.visit(&mut |node| {
        if found.is_some() {
            return;
        }
        match node.kind {
            RubyNodeKind::If { then_keyword: Some(span), .. }
            | RubyNodeKind::Unless { then_keyword: Some(span), .. }
            | RubyNodeKind::When { then_keyword: Some(span), .. }
            | RubyNodeKind::In { then_keyword: Some(span), .. } => found = Some(span),
            _ => {}
        }
    });

    if found.is_some() {
        return found;
    }

    // Stray arms (`when 1 then`, `elsif x then`) leave no node carrying
    // the keyword, so fall back to a token scan of the raw fragment.
    scan_for_then(source)
}

fn scan_for_then(source: &str) -> Option<Span> {
    let bytes = source.as_bytes();
    let mut offset = 0;
    let mut in_comment = false;
    let mut quote: Option<u8> = None;

    while offset < bytes.len() {
        let byte = bytes[offset];

        if let Some(q) = quote {
            if byte == b'\\' {
                offset += 2;
                continue;
            }
            if byte == q {
                quote = None;
            }
            offset += 1;
            continue;
        }

        if in_comment {
            if byte == b'\n' {
                in_comment = false;
            }
            offset += 1;
            continue;
        }

        match byte {
            b'#' => in_comment = true,
            b'"' | b'\'' => quote = Some(byte),
            b't' => {
                let boundary_before = offset == 0
                    || !(bytes[offset - 1].is_ascii_alphanumeric() || bytes[offset - 1] == b'_');
                let boundary_after = offset + 4 >= bytes.len()
                    || !(bytes[offset + 4].is_ascii_alphanumeric() || bytes[offset + 4] == b'_');

                if boundary_before
                    && boundary_after
                    && source[offset..].starts_with("then")
                {
                    return Some(Span::new(offset, offset + 4));
                }
            }
            _ => {}
        }

        offset += 1;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_unterminated_if() {
        let result = parse("if user.admin?");
        assert!(!result.is_valid());
        assert!(result.has_diagnostic("expected an `end` to close the `if` statement"));
        assert!(matches!(
            result.root.children[0].kind,
            RubyNodeKind::If { end_keyword: None, postfix: false, .. }
        ));
    }

    #[test]
    fn test_closed_if_is_valid() {
        let result = parse("if x\n  y\nend");
        assert!(result.is_valid());
        assert!(matches!(
            result.root.children[0].kind,
            RubyNodeKind::If { end_keyword: Some(_), .. }
        ));
    }

    #[test]
    fn test_postfix_if_is_valid() {
        let result = parse("x = 1 if y");
        assert!(result.is_valid());
        assert!(matches!(result.root.children[0].kind, RubyNodeKind::If { postfix: true, .. }));
    }

    #[test]
    fn test_assignment_from_if_expression() {
        let result = parse("x = if y\n 1\nend");
        assert!(result.is_valid());
        assert!(matches!(result.root.children[0].kind, RubyNodeKind::If { postfix: false, .. }));
    }

    #[rstest]
    #[case("elsif x", messages::UNEXPECTED_ELSIF)]
    #[case("else", messages::UNEXPECTED_ELSE)]
    #[case("end", messages::UNEXPECTED_END)]
    #[case("}", messages::UNEXPECTED_BRACE)]
    #[case("when 1", messages::UNEXPECTED_WHEN)]
    #[case("in [a]", messages::UNEXPECTED_IN)]
    #[case("rescue StandardError", messages::UNEXPECTED_RESCUE)]
    #[case("ensure", messages::UNEXPECTED_ENSURE)]
    fn test_stray_keywords(#[case] source: &str, #[case] message: &str) {
        let result = parse(source);
        assert!(result.has_diagnostic(message), "{:?} for {:?}", result.diagnostics, source);
    }

    #[rstest]
    #[case("break", messages::INVALID_BREAK)]
    #[case("next", messages::INVALID_NEXT)]
    #[case("redo", messages::INVALID_REDO)]
    #[case("retry", messages::INVALID_RETRY)]
    fn test_invalid_jumps_at_top_level(#[case] source: &str, #[case] message: &str) {
        assert!(parse(source).has_diagnostic(message));
    }

    #[rstest]
    #[case("break")]
    #[case("next")]
    #[case("redo")]
    #[case("retry")]
    fn test_partial_mode_permits_jumps(#[case] source: &str) {
        assert!(parse_partial(source).is_valid());
    }

    #[test]
    fn test_jump_inside_loop_is_valid() {
        assert!(parse("while x\n  break\nend").is_valid());
        assert!(parse("items.each do |i|\n  next\nend").is_valid());
    }

    #[test]
    fn test_retry_inside_rescue_is_valid() {
        assert!(parse("begin\n  x\nrescue\n  retry\nend").is_valid());
    }

    #[test]
    fn test_unterminated_do_block() {
        let result = parse("items.each do |item|");
        assert!(!result.is_valid());

        let call = &result.root.children[0];
        assert!(matches!(call.kind, RubyNodeKind::Call));
        let block = call.block().map(|b| b.kind.clone());
        assert!(matches!(
            block,
            Some(RubyNodeKind::Block { delimiter: BlockDelimiter::Do, closing: None, .. })
        ));
        assert_eq!(call.span.start, 0);
    }

    #[test]
    fn test_closed_brace_block_is_valid() {
        let result = parse("items.map { |i| i * 2 }");
        assert!(result.is_valid());
        let call = &result.root.children[0];
        assert!(call.block().is_some_and(|b| b.has_valid_block_closing()));
    }

    #[test]
    fn test_unterminated_brace_block() {
        let result = parse("items.map { |i|");
        assert!(result.has_diagnostic(messages::EXPECTED_BLOCK_BRACE));
    }

    #[test]
    fn test_lambda_block() {
        let result = parse("callback = -> {");
        assert!(!result.is_valid());
        assert!(result
            .root
            .children
            .iter()
            .any(|n| matches!(n.kind, RubyNodeKind::Lambda { closing: None, .. })));
    }

    #[test]
    fn test_unterminated_case() {
        let result = parse("case status");
        assert!(result.has_diagnostic("expected an `end` to close the `case` statement"));
        assert!(matches!(result.root.children[0].kind, RubyNodeKind::Case { end_keyword: None, .. }));
    }

    #[test]
    fn test_inline_case_when() {
        let result = parse("case status when :active");
        assert!(!result.is_valid());

        let case = &result.root.children[0];
        assert!(matches!(case.kind, RubyNodeKind::Case { .. }));
        assert!(case.children.iter().any(|n| matches!(n.kind, RubyNodeKind::When { .. })));
    }

    #[test]
    fn test_case_match_with_in() {
        let result = parse("case value\nin [a]\n  a\nend");
        assert!(matches!(result.root.children[0].kind, RubyNodeKind::CaseMatch { .. }));
    }

    #[test]
    fn test_match_predicate_is_valid() {
        let result = parse("value in [Integer]");
        assert!(result.is_valid());
        assert!(result
            .root
            .children
            .iter()
            .any(|n| matches!(n.kind, RubyNodeKind::MatchPredicate { .. })));
    }

    #[test]
    fn test_for_in_header_is_not_a_pattern_arm() {
        let result = parse("for item in items");
        assert!(result.has_diagnostic("expected an `end` to close the `for` statement"));
        assert!(!result.has_diagnostic(messages::UNEXPECTED_IN));
    }

    #[test]
    fn test_yield_outside_method() {
        let result = parse("yield");
        assert!(result.has_diagnostic("Invalid yield"));
        assert!(matches!(result.root.children[0].kind, RubyNodeKind::Yield { .. }));
    }

    #[test]
    fn test_yield_inside_method_is_valid() {
        assert!(parse("def each\n  yield\nend").is_valid());
    }

    #[test]
    fn test_stray_equals_end_pair() {
        let result = parse("=end");
        assert!(result.has_diagnostic(messages::UNEXPECTED_EQUALS));
        assert!(result.has_diagnostic(messages::UNEXPECTED_END));
    }

    #[test]
    fn test_embedded_document_unterminated() {
        let result = parse("=begin\nnotes here");
        assert!(result.has_diagnostic(messages::EMBEDDED_DOCUMENT_EOF));
    }

    #[test]
    fn test_embedded_document_closed_is_valid() {
        assert!(parse("=begin\nnotes\n=end\n").is_valid());
    }

    #[test]
    fn test_semicolon_inside_parens() {
        let result = parse("render( ;");
        assert!(result.has_diagnostic(messages::UNEXPECTED_SEMICOLON));
    }

    #[test]
    fn test_keyword_in_string_is_opaque() {
        assert!(parse("puts \"end of story\"").is_valid());
    }

    #[test]
    fn test_keyword_in_comment_is_opaque() {
        assert!(parse("x = 1 # end").is_valid());
    }

    #[test]
    fn test_then_keyword_location() {
        let result = parse("if ready then");
        let mut then_span = None;
        result.root.visit(&mut |node| {
            if let RubyNodeKind::If { then_keyword: Some(span), .. } = node.kind {
                then_span = Some(span);
            }
        });
        assert_eq!(then_span, Some(Span::new(9, 13)));
    }

    #[test]
    fn test_find_then_token_in_stray_when() {
        assert_eq!(find_then_token("when 1 then"), Some(Span::new(7, 11)));
    }

    #[test]
    fn test_find_then_token_skips_strings() {
        assert_eq!(find_then_token("when \"then\" then"), Some(Span::new(12, 16)));
    }

    #[test]
    fn test_find_then_token_absent() {
        assert_eq!(find_then_token("if ready"), None);
    }

    #[test]
    fn test_rescue_modifier_is_valid() {
        assert!(parse("value = risky rescue nil").is_valid());
    }

    #[test]
    fn test_while_with_do_header() {
        let result = parse("while x do");
        assert!(result.has_diagnostic("expected an `end` to close the `while` statement"));
        // The `do` belongs to the while header, not a block
        assert!(matches!(result.root.children[0].kind, RubyNodeKind::While { .. }));
    }

    #[test]
    fn test_nested_unclosed_constructs() {
        let result = parse("if a\n  items.each do");
        assert!(result.has_diagnostic("expected an `end` to close the `if` statement"));
        assert!(result.has_diagnostic(messages::EXPECTED_BLOCK_END));
    }
}
