//! Semantic analysis for the HTML+ERB document tree
//!
//! Five passes over a single mutable document, in dependency order:
//!
//! 1. **Embedded analysis** — sub-parse every executable template region
//!    and classify what control-flow fragment it contains.
//! 2. **Structure assembly** — fold flat fragment runs into compound
//!    control nodes (`if`/`case`/`begin`/loops/blocks).
//! 3. **Conditional elements** — fold tag pairs wrapped in matching
//!    conditionals into first-class nodes.
//! 4. **Conditional open tags** — fold branch-selected open tags with an
//!    unconditional close into synthetic elements.
//! 5. **Invalid structures** — flag misplaced scope keywords and missing
//!    terminators.
//!
//! Afterwards the surface parse errors are lifted from a whole-template
//! re-parse, and the bare HTML tags that survived the rewrites are
//! paired into elements.
//!
//! The pipeline never fails; every condition becomes a diagnostic owned
//! by exactly one node. Running it twice over the same document is a
//! no-op.

pub mod builders;
pub mod conditional_elements;
pub mod conditional_open_tags;
pub mod control_type;
pub mod embedded;
pub mod extract;
pub mod invalid_structures;
pub mod parse_errors;
pub mod structure;
pub mod tag_matching;

pub use control_type::{
    detect_control_type, is_compound_control_type, is_subsequent_type, is_terminator_type,
    ControlType,
};

use erb_ast::DocumentNode;
use tracing::debug;

/// Analysis configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyzeOptions {
    /// Reject inline `case … when …` openers
    pub strict: bool,
}

/// Runs the full pipeline over a parsed document.
pub fn analyze_document(document: &mut DocumentNode, source: &str, options: &AnalyzeOptions) {
    debug!("analyzing embedded template code");
    embedded::analyze(document, options);

    debug!("assembling control-flow structures");
    structure::rewrite(document);

    debug!("folding conditional elements");
    conditional_elements::transform(document);

    debug!("folding conditional open tags");
    conditional_open_tags::transform(document);

    debug!("detecting invalid structures");
    invalid_structures::detect(document);

    debug!("lifting embedded parse errors");
    parse_errors::analyze(document, source);

    debug!("matching html tags");
    tag_matching::match_tags(document);
}
