//! Diagnostic message strings.
//!
//! The analysis passes match on several of these strings verbatim, so they
//! are defined in exactly one place. Changing any of them is a breaking
//! change for every consumer that inspects diagnostics.

/// Stray `elsif` outside of an `if` chain.
pub const UNEXPECTED_ELSIF: &str = "unexpected 'elsif', ignoring it";
/// Stray `else` outside of a conditional, case, or begin body.
pub const UNEXPECTED_ELSE: &str = "unexpected 'else', ignoring it";
/// Stray `end` with nothing to close.
pub const UNEXPECTED_END: &str = "unexpected 'end', ignoring it";
/// Stray `}` with no open brace block or hash.
pub const UNEXPECTED_BRACE: &str = "unexpected '}', ignoring it";
/// Stray `when` outside of a `case` body.
pub const UNEXPECTED_WHEN: &str = "unexpected 'when', ignoring it";
/// Stray `in` outside of a `case` body or match predicate.
pub const UNEXPECTED_IN: &str = "unexpected 'in', ignoring it";
/// Stray `rescue` outside of a `begin`/method body.
pub const UNEXPECTED_RESCUE: &str = "unexpected 'rescue', ignoring it";
/// Stray `ensure` outside of a `begin`/method body.
pub const UNEXPECTED_ENSURE: &str = "unexpected 'ensure', ignoring it";
/// An `=` with no left-hand side, e.g. the first half of a stray `=end`.
pub const UNEXPECTED_EQUALS: &str = "unexpected '=', ignoring it";
/// A `;` inside a grouping where an expression was expected.
pub const UNEXPECTED_SEMICOLON: &str = "unexpected ';', ignoring it";

/// `break` outside of a loop or block.
pub const INVALID_BREAK: &str = "Invalid break";
/// `next` outside of a loop or block.
pub const INVALID_NEXT: &str = "Invalid next";
/// `redo` outside of a loop or block.
pub const INVALID_REDO: &str = "Invalid redo";
/// `retry` outside of a rescue clause.
pub const INVALID_RETRY: &str = "Invalid retry without rescue";

/// `=begin` document left open at end of input.
pub const EMBEDDED_DOCUMENT_EOF: &str = "embedded document meets end of file";

/// Unterminated keyword-delimited construct, e.g.
/// ``expected an `end` to close the `if` statement``.
pub fn expected_end(keyword: &str) -> String {
    format!("expected an `end` to close the `{keyword}` statement")
}

/// Unterminated `do` block.
pub const EXPECTED_BLOCK_END: &str = "expected an `end` to close the block";
/// Unterminated `{` block.
pub const EXPECTED_BLOCK_BRACE: &str = "expected a `}` to close the block";

/// Unterminated grouping, e.g. ``expected a matching `)` ``.
pub fn expected_closing(delimiter: char) -> String {
    format!("expected a matching `{delimiter}`")
}

/// Unterminated string literal.
pub const UNTERMINATED_STRING: &str = "unterminated string meets end of file";
