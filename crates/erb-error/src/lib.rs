//! Diagnostic taxonomy for the HTML+ERB analyzer
//!
//! The analysis pipeline never fails: every condition it detects becomes
//! an [`AnalyzeError`] value attached to exactly one node's error vector
//! (or to the document root for conditions that cannot be localised).
//! Each variant maps to a stable kind string consumers can dispatch on.

use erb_position_tracking::{Location, Position};
use serde::Serialize;
use thiserror::Error;

/// A diagnostic produced by the parser or one of the analysis passes.
///
/// Variants carry the data their consumers need to render the problem:
/// the condition-mismatch error, for example, keeps both condition
/// strings and both wrapper positions so an editor can show the pair.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "type")]
pub enum AnalyzeError {
    /// Diagnostic lifted from the embedded-language parse.
    #[error("{message}")]
    RubyParseError {
        /// Message as reported by the embedded parser
        message: String,
        /// Where in the source the diagnostic points
        location: Location,
    },

    /// An HTML open tag with no matching close tag.
    #[error("missing closing tag for `<{tag_name}>`")]
    MissingClosingTag {
        /// Name of the unclosed tag
        tag_name: String,
        /// Span of the open tag
        location: Location,
    },

    /// A single template region opens two or more control-flow blocks.
    #[error("template tag opens multiple blocks")]
    ErbMultipleBlocksInTag {
        /// Span of the offending region
        location: Location,
    },

    /// Strict mode: an inline `case` carrying its first arm condition.
    #[error("`case` tag must not carry a `when` condition")]
    ErbCaseWithConditions {
        /// Span of the offending region
        location: Location,
    },

    /// A scope keyword used where it has no meaning (`break` outside a
    /// loop, stray `elsif`, …).
    #[error("{keyword} found outside of its valid scope")]
    ErbControlFlowScope {
        /// Rendered keyword, e.g. `` `<% break %>` ``
        keyword: String,
        /// Span of the fragment
        location: Location,
    },

    /// A compound control node that never saw its `<% end %>`.
    #[error("missing `<% end %>` for control-flow block")]
    MissingErbEnd {
        /// Span of the unterminated block
        location: Location,
    },

    /// A conditional wrapper containing more than one open tag.
    #[error("conditional wrapper contains multiple tags")]
    ConditionalElementMultipleTags {
        /// Line of the surplus tag
        line: usize,
        /// Column of the surplus tag
        column: usize,
        /// Span of the wrapper
        location: Location,
    },

    /// Open and close conditional wrappers around a tag pair carry
    /// different conditions.
    #[error("conditions `{open_condition}` and `{close_condition}` for `<{tag_name}>` do not match")]
    ConditionalElementConditionMismatch {
        /// Tag name wrapped by the pair
        tag_name: String,
        /// Condition on the opening wrapper
        open_condition: String,
        /// Position of the opening wrapper
        open_position: Position,
        /// Condition on the closing wrapper
        close_condition: String,
        /// Position of the closing wrapper
        close_position: Position,
        /// Span from the opening wrapper to the closing wrapper
        location: Location,
    },
}

impl AnalyzeError {
    /// Stable kind string for this diagnostic.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalyzeError::RubyParseError { .. } => "RUBY_PARSE_ERROR",
            AnalyzeError::MissingClosingTag { .. } => "MISSING_CLOSING_TAG",
            AnalyzeError::ErbMultipleBlocksInTag { .. } => "ERB_MULTIPLE_BLOCKS_IN_TAG",
            AnalyzeError::ErbCaseWithConditions { .. } => "ERB_CASE_WITH_CONDITIONS",
            AnalyzeError::ErbControlFlowScope { .. } => "ERB_CONTROL_FLOW_SCOPE",
            AnalyzeError::MissingErbEnd { .. } => "MISSING_ERB_END",
            AnalyzeError::ConditionalElementMultipleTags { .. } => "CONDITIONAL_ELEMENT_MULTIPLE_TAGS",
            AnalyzeError::ConditionalElementConditionMismatch { .. } => {
                "CONDITIONAL_ELEMENT_CONDITION_MISMATCH"
            }
        }
    }

    /// Span the diagnostic covers.
    pub fn location(&self) -> Location {
        match self {
            AnalyzeError::RubyParseError { location, .. }
            | AnalyzeError::MissingClosingTag { location, .. }
            | AnalyzeError::ErbMultipleBlocksInTag { location }
            | AnalyzeError::ErbCaseWithConditions { location }
            | AnalyzeError::ErbControlFlowScope { location, .. }
            | AnalyzeError::MissingErbEnd { location }
            | AnalyzeError::ConditionalElementMultipleTags { location, .. }
            | AnalyzeError::ConditionalElementConditionMismatch { location, .. } => *location,
        }
    }
}
