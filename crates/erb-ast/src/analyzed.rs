//! Embedded-code analysis record.

use erb_ruby::{Diagnostic, RubyNode};

/// What the embedded analyzer learned about one executable template
/// region.
///
/// The counters are populated by a single walk over the embedded parse
/// tree plus the diagnostic-driven updates for keywords the embedded
/// parser reports only as stray. The control-type classifier reads them
/// to decide what fragment a region is.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalyzedRuby {
    /// Embedded parse tree, queried structurally during classification
    pub root: Option<RubyNode>,
    /// True iff the embedded parse produced no diagnostics
    pub valid: bool,
    /// Diagnostics from the embedded parse, fragment-relative spans
    pub diagnostics: Vec<Diagnostic>,

    /// `if` constructs with both keyword and `end`
    pub if_count: usize,
    /// `elsif` keywords (diagnostic-driven)
    pub elsif_count: usize,
    /// `else` keywords (diagnostic-driven)
    pub else_count: usize,
    /// `end` keywords with nothing to close (diagnostic-driven)
    pub end_count: usize,
    /// Blocks or lambdas opened without a matching closer
    pub block_count: usize,
    /// Stray `}` closers (diagnostic-driven)
    pub block_closing_count: usize,
    /// `case` constructs
    pub case_count: usize,
    /// `case … in` pattern-match constructs
    pub case_match_count: usize,
    /// `when` arms (tree plus diagnostic-driven)
    pub when_count: usize,
    /// `in` arms and match predicates (tree plus diagnostic-driven)
    pub in_count: usize,
    /// `for` loops
    pub for_count: usize,
    /// `while` loops
    pub while_count: usize,
    /// `until` loops
    pub until_count: usize,
    /// `begin` bodies
    pub begin_count: usize,
    /// `rescue` clauses (diagnostic-driven)
    pub rescue_count: usize,
    /// `ensure` clauses (diagnostic-driven)
    pub ensure_count: usize,
    /// `unless` constructs with both keyword and `end`
    pub unless_count: usize,
    /// `yield` expressions
    pub yield_count: usize,
    /// `then` keywords attached to conditionals or arms
    pub then_keyword_count: usize,
    /// Openers whose closer never arrived, capped at 2
    pub unclosed_control_flow_count: usize,
}

impl AnalyzedRuby {
    /// True if any diagnostic message equals `message` exactly.
    pub fn has_error_message(&self, message: &str) -> bool {
        self.diagnostics.iter().any(|diagnostic| diagnostic.message == message)
    }

    /// An inline `case` carrying its first arm in the same fragment.
    pub fn has_inline_case_condition(&self) -> bool {
        (self.case_count > 0 && self.when_count > 0)
            || (self.case_match_count > 0 && self.in_count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erb_ruby::DiagnosticLevel;
    use erb_position_tracking::Span;

    #[test]
    fn test_has_error_message_exact_match() {
        let analyzed = AnalyzedRuby {
            diagnostics: vec![Diagnostic {
                message: "unexpected 'else', ignoring it".to_string(),
                level: DiagnosticLevel::Error,
                span: Span::new(0, 4),
            }],
            ..AnalyzedRuby::default()
        };

        assert!(analyzed.has_error_message("unexpected 'else', ignoring it"));
        assert!(!analyzed.has_error_message("unexpected 'else'"));
    }

    #[test]
    fn test_inline_case_condition() {
        let analyzed = AnalyzedRuby { case_count: 1, when_count: 1, ..AnalyzedRuby::default() };
        assert!(analyzed.has_inline_case_condition());

        let analyzed = AnalyzedRuby { case_count: 1, ..AnalyzedRuby::default() };
        assert!(!analyzed.has_inline_case_condition());
    }
}
