//! HTML-aware ERB parsing and semantic analysis
//!
//! The entry point for the whole pipeline: tokenize, build the document
//! tree, then run the semantic-analysis passes that fold template
//! control flow, recognise conditional tag patterns, attach structural
//! diagnostics, and pair HTML tags into elements.
//!
//! # Usage
//!
//! ```
//! use erb_parser::Parser;
//!
//! let document = Parser::new("<% if admin? %><p>hi</p><% end %>").parse();
//! assert!(document.all_errors().is_empty());
//! ```
//!
//! The front end alone (no analysis) is available through
//! [`Parser::parse_document`], which is what the `lex`-adjacent tooling
//! and the analysis pass tests build on.

mod parser;

pub use erb_ast as ast;
pub use erb_semantic_analyzer::{analyze_document, AnalyzeOptions};

use erb_ast::DocumentNode;

/// Parser options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParserOptions {
    /// Strict mode for the analysis passes
    pub strict: bool,
}

/// Parses HTML+ERB documents.
pub struct Parser<'a> {
    source: &'a str,
    options: ParserOptions,
}

impl<'a> Parser<'a> {
    /// Creates a parser over the given source.
    pub fn new(source: &'a str) -> Self {
        Parser { source, options: ParserOptions::default() }
    }

    /// Creates a parser with explicit options.
    pub fn with_options(source: &'a str, options: ParserOptions) -> Self {
        Parser { source, options }
    }

    /// Parses and analyzes the document.
    pub fn parse(&self) -> DocumentNode {
        tracing::debug!(bytes = self.source.len(), "parsing template");

        let mut document = parser::parse_document(self.source);
        let analyze_options = AnalyzeOptions { strict: self.options.strict };

        erb_semantic_analyzer::analyze_document(&mut document, self.source, &analyze_options);

        document
    }

    /// Builds the raw document tree without running analysis.
    pub fn parse_document(&self) -> DocumentNode {
        parser::parse_document(self.source)
    }
}

/// Extracts the embedded code from a template, HTML blanked out.
pub fn extract_ruby(source: &str) -> String {
    erb_semantic_analyzer::extract::ruby(source)
}

/// Extracts the HTML from a template, code regions blanked out.
pub fn extract_html(source: &str) -> String {
    erb_semantic_analyzer::extract::html(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use erb_ast::Node;

    #[test]
    fn test_flat_parse_keeps_tags_bare() {
        let document = Parser::new("<div>x</div>").parse_document();

        assert_eq!(document.children.len(), 3);
        assert!(matches!(document.children[0], Node::HtmlOpenTag(_)));
        assert!(matches!(document.children[1], Node::HtmlText(_)));
        assert!(matches!(document.children[2], Node::HtmlCloseTag(_)));
    }

    #[test]
    fn test_parse_pairs_tags_after_analysis() {
        let document = Parser::new("<div>x</div>").parse();

        assert_eq!(document.children.len(), 1);
        assert!(matches!(&document.children[0], Node::HtmlElement(element)
            if element.tag_name.value.as_ref() == "div" && element.close_tag.is_some()));
    }

    #[test]
    fn test_void_element() {
        let document = Parser::new("<br>").parse();

        assert!(matches!(&document.children[0], Node::HtmlElement(element)
            if element.is_void && element.close_tag.is_none()));
        assert!(document.all_errors().is_empty());
    }

    #[test]
    fn test_erb_content_leaf() {
        let document = Parser::new("<%= user.name %>").parse_document();

        assert!(matches!(&document.children[0], Node::ErbContent(content)
            if content.tag_opening.value.as_ref() == "<%="));
    }
}
