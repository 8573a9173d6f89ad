//! Token scanner for embedded Ruby fragments.
//!
//! Resolves the lexical layer the structural parser needs: keywords,
//! identifiers, literals (strings with interpolation, percent literals,
//! regexes, symbols, numbers), comments, embedded documents, and the
//! punctuation that opens and closes nesting. Everything else is an
//! undifferentiated operator token.

use crate::messages;
use erb_position_tracking::Span;
use phf::phf_map;

/// Control-flow keywords the parser dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Keyword {
    If,
    Unless,
    Case,
    While,
    Until,
    For,
    Begin,
    End,
    Do,
    Then,
    Else,
    Elsif,
    When,
    In,
    Rescue,
    Ensure,
    Yield,
    Break,
    Next,
    Redo,
    Retry,
    Return,
    Def,
    Class,
    Module,
}

static KEYWORDS: phf::Map<&'static str, Keyword> = phf_map! {
    "if" => Keyword::If,
    "unless" => Keyword::Unless,
    "case" => Keyword::Case,
    "while" => Keyword::While,
    "until" => Keyword::Until,
    "for" => Keyword::For,
    "begin" => Keyword::Begin,
    "end" => Keyword::End,
    "do" => Keyword::Do,
    "then" => Keyword::Then,
    "else" => Keyword::Else,
    "elsif" => Keyword::Elsif,
    "when" => Keyword::When,
    "in" => Keyword::In,
    "rescue" => Keyword::Rescue,
    "ensure" => Keyword::Ensure,
    "yield" => Keyword::Yield,
    "break" => Keyword::Break,
    "next" => Keyword::Next,
    "redo" => Keyword::Redo,
    "retry" => Keyword::Retry,
    "return" => Keyword::Return,
    "def" => Keyword::Def,
    "class" => Keyword::Class,
    "module" => Keyword::Module,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RubyTokenKind {
    Keyword(Keyword),
    Identifier,
    Number,
    StringLit,
    Symbol,
    Variable,
    Newline,
    Semicolon,
    Comma,
    Dot,
    Arrow,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Pipe,
    Equals,
    Op,
    /// `=begin`…`=end` document; unterminated when `terminated` is false
    EmbDoc { terminated: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RubyToken {
    pub kind: RubyTokenKind,
    pub span: Span,
}

/// Lexer-level diagnostics (unterminated literals).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LexDiagnostic {
    pub message: String,
    pub span: Span,
}

pub(crate) struct RubyLexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    offset: usize,
    at_line_start: bool,
    /// True when the next token sits in term position (a literal can
    /// start here); false after a completed operand.
    expecting_term: bool,
    /// Keywords after `.` are method calls, not keywords.
    after_dot: bool,
    pub diagnostics: Vec<LexDiagnostic>,
}

impl<'a> RubyLexer<'a> {
    pub fn new(source: &'a str) -> Self {
        RubyLexer {
            source,
            bytes: source.as_bytes(),
            offset: 0,
            at_line_start: true,
            expecting_term: true,
            after_dot: false,
            diagnostics: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> (Vec<RubyToken>, Vec<LexDiagnostic>) {
        let mut tokens = Vec::new();

        while let Some(token) = self.next_token() {
            // Term position resets after separators and operators; a
            // completed operand switches to operator position.
            self.expecting_term = !matches!(
                token.kind,
                RubyTokenKind::Identifier
                    | RubyTokenKind::Number
                    | RubyTokenKind::StringLit
                    | RubyTokenKind::Symbol
                    | RubyTokenKind::Variable
                    | RubyTokenKind::RParen
                    | RubyTokenKind::RBracket
                    | RubyTokenKind::RBrace
                    | RubyTokenKind::Keyword(Keyword::End)
            );

            self.at_line_start = token.kind == RubyTokenKind::Newline;
            self.after_dot = token.kind == RubyTokenKind::Dot;
            tokens.push(token);
        }

        (tokens, self.diagnostics)
    }

    fn next_token(&mut self) -> Option<RubyToken> {
        self.skip_spaces();

        let start = self.offset;
        let byte = *self.bytes.get(self.offset)?;

        let kind = match byte {
            b'\n' => {
                self.offset += 1;
                RubyTokenKind::Newline
            }
            b'#' => {
                self.skip_line();
                return self.next_token();
            }
            b';' => {
                self.offset += 1;
                RubyTokenKind::Semicolon
            }
            b',' => {
                self.offset += 1;
                RubyTokenKind::Comma
            }
            b'.' => {
                self.offset += 1;
                // `..`/`...` are range operators, not method dispatch
                while self.bytes.get(self.offset) == Some(&b'.') {
                    self.offset += 1;
                }
                if self.offset - start == 1 { RubyTokenKind::Dot } else { RubyTokenKind::Op }
            }
            b'(' => {
                self.offset += 1;
                RubyTokenKind::LParen
            }
            b')' => {
                self.offset += 1;
                RubyTokenKind::RParen
            }
            b'[' => {
                self.offset += 1;
                RubyTokenKind::LBracket
            }
            b']' => {
                self.offset += 1;
                RubyTokenKind::RBracket
            }
            b'{' => {
                self.offset += 1;
                RubyTokenKind::LBrace
            }
            b'}' => {
                self.offset += 1;
                RubyTokenKind::RBrace
            }
            b'|' => {
                self.offset += 1;
                if self.bytes.get(self.offset) == Some(&b'|') {
                    self.offset += 1;
                    RubyTokenKind::Op
                } else {
                    RubyTokenKind::Pipe
                }
            }
            b'"' | b'\'' | b'`' => {
                self.scan_string(byte);
                RubyTokenKind::StringLit
            }
            b'/' if self.expecting_term => {
                self.scan_string(b'/');
                RubyTokenKind::StringLit
            }
            b':' => {
                self.offset += 1;
                if self.bytes.get(self.offset) == Some(&b':') {
                    self.offset += 1;
                    RubyTokenKind::Op
                } else if self.peek_is_identifier_start() {
                    self.scan_identifier();
                    RubyTokenKind::Symbol
                } else {
                    RubyTokenKind::Op
                }
            }
            b'@' | b'$' => {
                self.offset += 1;
                if self.bytes.get(self.offset) == Some(&b'@') {
                    self.offset += 1;
                }
                self.scan_identifier();
                RubyTokenKind::Variable
            }
            b'-' if self.bytes.get(self.offset + 1) == Some(&b'>') => {
                self.offset += 2;
                RubyTokenKind::Arrow
            }
            b'=' => {
                if self.at_line_start && self.source[self.offset..].starts_with("=begin") {
                    return Some(self.scan_embedded_document(start));
                }
                self.offset += 1;
                match self.bytes.get(self.offset) {
                    Some(&b'=') | Some(&b'~') | Some(&b'>') => {
                        self.offset += 1;
                        RubyTokenKind::Op
                    }
                    _ => RubyTokenKind::Equals,
                }
            }
            b'%' if self.expecting_term => {
                if self.scan_percent_literal() {
                    RubyTokenKind::StringLit
                } else {
                    self.offset += 1;
                    RubyTokenKind::Op
                }
            }
            b'0'..=b'9' => {
                self.scan_number();
                RubyTokenKind::Number
            }
            b if b.is_ascii_alphabetic() || b == b'_' => {
                self.scan_identifier();
                self.classify_word(start)
            }
            _ => {
                self.offset += 1;
                RubyTokenKind::Op
            }
        };

        Some(RubyToken { kind, span: Span::new(start, self.offset) })
    }

    fn skip_spaces(&mut self) {
        while let Some(&byte) = self.bytes.get(self.offset) {
            match byte {
                b' ' | b'\t' | b'\r' => self.offset += 1,
                // Line continuation
                b'\\' if self.bytes.get(self.offset + 1) == Some(&b'\n') => self.offset += 2,
                _ => break,
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(&byte) = self.bytes.get(self.offset) {
            if byte == b'\n' {
                break;
            }
            self.offset += 1;
        }
    }

    fn peek_is_identifier_start(&self) -> bool {
        self.bytes
            .get(self.offset)
            .is_some_and(|&b| b.is_ascii_alphabetic() || b == b'_' || b == b'"')
    }

    fn scan_identifier(&mut self) {
        if self.bytes.get(self.offset) == Some(&b'"') {
            // `:"quoted symbol"`
            self.scan_string(b'"');
            return;
        }

        while self
            .bytes
            .get(self.offset)
            .is_some_and(|&b| b.is_ascii_alphanumeric() || b == b'_')
        {
            self.offset += 1;
        }

        if self.bytes.get(self.offset).is_some_and(|&b| b == b'?' || b == b'!') {
            // Predicate/bang method names; not when `?`/`!` starts an operator
            if self.bytes.get(self.offset + 1) != Some(&b'=') {
                self.offset += 1;
            }
        }
    }

    fn scan_number(&mut self) {
        while self
            .bytes
            .get(self.offset)
            .is_some_and(|&b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.')
        {
            // Trailing method dispatch (`1.upto`) stays out of the number
            if self.bytes[self.offset] == b'.'
                && !self.bytes.get(self.offset + 1).is_some_and(|b| b.is_ascii_digit())
            {
                break;
            }
            self.offset += 1;
        }
    }

    /// A word is a keyword unless it follows `.`/`::` (method call) or is
    /// immediately followed by `:` (hash label).
    fn classify_word(&mut self, start: usize) -> RubyTokenKind {
        let word = &self.source[start..self.offset];

        let is_label = self.bytes.get(self.offset) == Some(&b':')
            && self.bytes.get(self.offset + 1) != Some(&b':');

        if is_label || self.after_dot {
            return RubyTokenKind::Identifier;
        }

        match KEYWORDS.get(word) {
            Some(&keyword) => RubyTokenKind::Keyword(keyword),
            None => RubyTokenKind::Identifier,
        }
    }

    /// Scans a quoted region, honouring backslash escapes and `#{…}`
    /// interpolation in double-quoted flavours.
    fn scan_string(&mut self, quote: u8) {
        let start = self.offset;
        let interpolating = quote != b'\'';
        self.offset += 1;

        while let Some(&byte) = self.bytes.get(self.offset) {
            if byte == b'\\' {
                self.offset = (self.offset + 2).min(self.bytes.len());
                continue;
            }

            if byte == quote {
                self.offset += 1;
                return;
            }

            if interpolating && byte == b'#' && self.bytes.get(self.offset + 1) == Some(&b'{') {
                self.offset += 2;
                self.skip_interpolation();
                continue;
            }

            self.offset += 1;
        }

        self.diagnostics.push(LexDiagnostic {
            message: messages::UNTERMINATED_STRING.to_string(),
            span: Span::new(start, self.offset),
        });
    }

    /// Skips a balanced `#{…}` body, stepping over nested strings.
    fn skip_interpolation(&mut self) {
        let mut depth = 1usize;

        while let Some(&byte) = self.bytes.get(self.offset) {
            match byte {
                b'{' => {
                    depth += 1;
                    self.offset += 1;
                }
                b'}' => {
                    depth -= 1;
                    self.offset += 1;
                    if depth == 0 {
                        return;
                    }
                }
                b'"' | b'\'' => self.scan_string(byte),
                b'\\' => self.offset = (self.offset + 2).min(self.bytes.len()),
                _ => self.offset += 1,
            }
        }
    }

    /// Scans `%w[…]`-style percent literals. Returns false when the `%`
    /// is not a literal opener (plain modulo).
    fn scan_percent_literal(&mut self) -> bool {
        let mut cursor = self.offset + 1;

        if self
            .bytes
            .get(cursor)
            .is_some_and(|b| b.is_ascii_alphabetic())
        {
            if !matches!(self.bytes[cursor], b'w' | b'W' | b'i' | b'I' | b'q' | b'Q' | b'r' | b'x' | b's') {
                return false;
            }
            cursor += 1;
        }

        let open = match self.bytes.get(cursor) {
            Some(&b) if b.is_ascii_punctuation() && b != b'=' => b,
            _ => return false,
        };

        let close = match open {
            b'(' => b')',
            b'[' => b']',
            b'{' => b'}',
            b'<' => b'>',
            other => other,
        };

        let start = self.offset;
        self.offset = cursor + 1;
        let mut depth = 1usize;

        while let Some(&byte) = self.bytes.get(self.offset) {
            self.offset += 1;

            if byte == b'\\' {
                self.offset = (self.offset + 1).min(self.bytes.len());
            } else if byte == open && open != close {
                depth += 1;
            } else if byte == close {
                depth -= 1;
                if depth == 0 {
                    return true;
                }
            }
        }

        self.diagnostics.push(LexDiagnostic {
            message: messages::UNTERMINATED_STRING.to_string(),
            span: Span::new(start, self.offset),
        });

        true
    }

    /// Scans an `=begin` document through the `=end` line.
    fn scan_embedded_document(&mut self, start: usize) -> RubyToken {
        let mut terminated = false;

        while self.offset < self.bytes.len() {
            let line_start = self.offset;
            self.skip_line();

            if self.source[line_start..self.offset].starts_with("=end") {
                terminated = true;
                if self.bytes.get(self.offset) == Some(&b'\n') {
                    self.offset += 1;
                }
                break;
            }

            if self.bytes.get(self.offset) == Some(&b'\n') {
                self.offset += 1;
            }
        }

        RubyToken {
            kind: RubyTokenKind::EmbDoc { terminated },
            span: Span::new(start, self.offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<RubyTokenKind> {
        let (tokens, _) = RubyLexer::new(source).tokenize();
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("if user.admin?"),
            vec![
                RubyTokenKind::Keyword(Keyword::If),
                RubyTokenKind::Identifier,
                RubyTokenKind::Dot,
                RubyTokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_keyword_after_dot_is_identifier() {
        assert_eq!(
            kinds("x.end"),
            vec![RubyTokenKind::Identifier, RubyTokenKind::Dot, RubyTokenKind::Identifier]
        );
    }

    #[test]
    fn test_hash_label_is_not_keyword() {
        assert_eq!(
            kinds("f if: x"),
            vec![
                RubyTokenKind::Identifier,
                RubyTokenKind::Identifier,
                RubyTokenKind::Op,
                RubyTokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_string_with_interpolation() {
        assert_eq!(kinds(r#""a#{b("x")}c""#), vec![RubyTokenKind::StringLit]);
    }

    #[test]
    fn test_keyword_inside_string_ignored() {
        assert_eq!(kinds(r#""end""#), vec![RubyTokenKind::StringLit]);
    }

    #[test]
    fn test_comment_skipped() {
        assert_eq!(kinds("x # end of it"), vec![RubyTokenKind::Identifier]);
    }

    #[test]
    fn test_percent_literal() {
        assert_eq!(
            kinds("x = %w[a b]"),
            vec![RubyTokenKind::Identifier, RubyTokenKind::Equals, RubyTokenKind::StringLit]
        );
    }

    #[test]
    fn test_modulo_is_operator() {
        assert_eq!(
            kinds("a % b"),
            vec![RubyTokenKind::Identifier, RubyTokenKind::Op, RubyTokenKind::Identifier]
        );
    }

    #[test]
    fn test_regex_in_term_position() {
        assert_eq!(kinds("x =~ /end/"), vec![
            RubyTokenKind::Identifier,
            RubyTokenKind::Op,
            RubyTokenKind::StringLit,
        ]);
    }

    #[test]
    fn test_embedded_document() {
        let (tokens, _) = RubyLexer::new("=begin\nnotes\n=end\n").tokenize();
        assert_eq!(tokens[0].kind, RubyTokenKind::EmbDoc { terminated: true });
    }

    #[test]
    fn test_unterminated_embedded_document() {
        let (tokens, _) = RubyLexer::new("=begin\nnotes").tokenize();
        assert_eq!(tokens[0].kind, RubyTokenKind::EmbDoc { terminated: false });
    }

    #[test]
    fn test_arrow() {
        assert_eq!(kinds("-> { }"), vec![
            RubyTokenKind::Arrow,
            RubyTokenKind::LBrace,
            RubyTokenKind::RBrace,
        ]);
    }

    #[test]
    fn test_unterminated_string_diagnostic() {
        let (_, diagnostics) = RubyLexer::new("\"abc").tokenize();
        assert_eq!(diagnostics.len(), 1);
    }
}
