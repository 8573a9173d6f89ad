//! Structural parser for embedded Ruby fragments.
//!
//! Builds a control-flow tree from the token stream using a frame stack.
//! Expressions stay opaque; what the parser resolves is which constructs
//! open, which keywords belong to them, which reached end of input
//! unterminated, and which keywords are stray. Diagnostics mirror the
//! messages the template analyzer matches on (see [`crate::messages`]).

use crate::lexer::{Keyword, RubyLexer, RubyToken, RubyTokenKind};
use crate::messages;
use crate::node::{BlockDelimiter, RubyNode, RubyNodeKind};
use crate::{Diagnostic, DiagnosticLevel, ParseMode, ParseResult};
use erb_position_tracking::Span;

#[derive(Debug)]
enum FrameKind {
    Root,
    If { keyword: Span, then_keyword: Option<Span>, header_open: bool },
    Unless { keyword: Span, then_keyword: Option<Span>, header_open: bool },
    Case { keyword: Span, has_in: bool },
    While { keyword: Span, header_open: bool },
    Until { keyword: Span, header_open: bool },
    For { keyword: Span, header_open: bool, seen_in: bool },
    Begin { keyword: Span, in_rescue: bool },
    Block { delimiter: BlockDelimiter, opening: Span, stmt_start: usize },
    Lambda { delimiter: BlockDelimiter, opening: Span, arrow_start: usize },
    Scope { keyword: Span, keyword_name: &'static str },
    Group { open: u8 },
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    start: usize,
    children: Vec<RubyNode>,
}

pub(crate) struct RubyParser {
    mode: ParseMode,
    frames: Vec<Frame>,
    diagnostics: Vec<Diagnostic>,
    /// Current statement has operand content already
    expr_pending: bool,
    /// Offset where the current statement began
    stmt_start: Option<usize>,
    /// `->` seen, waiting for its `{`/`do`
    pending_lambda: Option<Span>,
    last_token: Option<RubyTokenKind>,
    /// End of the last consumed token, for node spans at end of input
    cursor_end: usize,
}

impl RubyParser {
    pub fn new(mode: ParseMode) -> Self {
        RubyParser {
            mode,
            frames: vec![Frame { kind: FrameKind::Root, start: 0, children: Vec::new() }],
            diagnostics: Vec::new(),
            expr_pending: false,
            stmt_start: None,
            pending_lambda: None,
            last_token: None,
            cursor_end: 0,
        }
    }

    pub fn parse(mut self, source: &str) -> ParseResult {
        let (tokens, lex_diagnostics) = RubyLexer::new(source).tokenize();

        for diagnostic in lex_diagnostics {
            self.error(diagnostic.message, diagnostic.span);
        }

        for token in &tokens {
            self.process(*token);
            self.cursor_end = token.span.end;
            self.last_token = Some(token.kind);
        }

        self.finish(source)
    }

    fn error(&mut self, message: impl Into<String>, span: Span) {
        self.diagnostics.push(Diagnostic {
            message: message.into(),
            level: DiagnosticLevel::Error,
            span,
        });
    }

    fn top(&mut self) -> &mut Frame {
        // The root frame is never popped, so the stack is never empty.
        let index = self.frames.len() - 1;
        &mut self.frames[index]
    }

    fn push_frame(&mut self, kind: FrameKind, start: usize) {
        self.frames.push(Frame { kind, start, children: Vec::new() });
        self.end_statement();
    }

    fn push_node(&mut self, node: RubyNode) {
        self.top().children.push(node);
    }

    fn end_statement(&mut self) {
        self.expr_pending = false;
        self.stmt_start = None;
    }

    fn note_operand(&mut self, span: Span) {
        if !self.expr_pending {
            self.expr_pending = true;
            self.stmt_start = Some(span.start);
        }
    }

    /// True when the previous token completes an operand, which is what
    /// distinguishes modifier keywords (`x if y`) from leading ones.
    fn value_position(&self) -> bool {
        matches!(
            self.last_token,
            Some(
                RubyTokenKind::Identifier
                    | RubyTokenKind::Number
                    | RubyTokenKind::StringLit
                    | RubyTokenKind::Symbol
                    | RubyTokenKind::Variable
                    | RubyTokenKind::RParen
                    | RubyTokenKind::RBracket
                    | RubyTokenKind::RBrace
                    | RubyTokenKind::Keyword(
                        Keyword::End
                            | Keyword::Yield
                            | Keyword::Break
                            | Keyword::Next
                            | Keyword::Redo
                            | Keyword::Retry
                            | Keyword::Return
                    )
            )
        )
    }

    fn process(&mut self, token: RubyToken) {
        let span = token.span;

        match token.kind {
            RubyTokenKind::Newline => {
                let continuation = matches!(
                    self.last_token,
                    Some(
                        RubyTokenKind::Op
                            | RubyTokenKind::Comma
                            | RubyTokenKind::Dot
                            | RubyTokenKind::Arrow
                            | RubyTokenKind::Equals
                            | RubyTokenKind::LParen
                            | RubyTokenKind::LBracket
                            | RubyTokenKind::LBrace
                    )
                );

                if !continuation {
                    self.close_header();
                    self.end_statement();
                }
            }
            RubyTokenKind::Semicolon => {
                if matches!(self.top().kind, FrameKind::Group { open: b'(' | b'[' }) {
                    self.error(messages::UNEXPECTED_SEMICOLON, span);
                }
                self.close_header();
                self.end_statement();
            }
            RubyTokenKind::Identifier
            | RubyTokenKind::Number
            | RubyTokenKind::StringLit
            | RubyTokenKind::Symbol
            | RubyTokenKind::Variable => self.note_operand(span),
            RubyTokenKind::Equals => {
                if !self.expr_pending {
                    self.error(messages::UNEXPECTED_EQUALS, span);
                }
            }
            RubyTokenKind::Arrow => {
                self.pending_lambda = Some(span);
                self.note_operand(span);
            }
            RubyTokenKind::LParen => self.push_group(b'(', span),
            RubyTokenKind::LBracket => self.push_group(b'[', span),
            RubyTokenKind::RParen => self.close_group(b'('),
            RubyTokenKind::RBracket => self.close_group(b'['),
            RubyTokenKind::LBrace => self.open_brace(span),
            RubyTokenKind::RBrace => self.close_brace(span),
            RubyTokenKind::Pipe | RubyTokenKind::Comma | RubyTokenKind::Dot | RubyTokenKind::Op => {}
            RubyTokenKind::EmbDoc { terminated } => {
                if !terminated {
                    self.error(messages::EMBEDDED_DOCUMENT_EOF, span);
                }
            }
            RubyTokenKind::Keyword(keyword) => self.process_keyword(keyword, span),
        }
    }

    fn process_keyword(&mut self, keyword: Keyword, span: Span) {
        match keyword {
            Keyword::If => self.open_conditional(span, false),
            Keyword::Unless => self.open_conditional(span, true),
            Keyword::While => self.open_loop(span, false),
            Keyword::Until => self.open_loop(span, true),
            Keyword::For => self.push_frame(
                FrameKind::For { keyword: span, header_open: true, seen_in: false },
                span.start,
            ),
            Keyword::Case => {
                self.push_frame(FrameKind::Case { keyword: span, has_in: false }, span.start)
            }
            Keyword::Begin => {
                self.push_frame(FrameKind::Begin { keyword: span, in_rescue: false }, span.start)
            }
            Keyword::Def => self.push_frame(
                FrameKind::Scope { keyword: span, keyword_name: "def" },
                span.start,
            ),
            Keyword::Class => self.push_frame(
                FrameKind::Scope { keyword: span, keyword_name: "class" },
                span.start,
            ),
            Keyword::Module => self.push_frame(
                FrameKind::Scope { keyword: span, keyword_name: "module" },
                span.start,
            ),
            Keyword::Do => self.process_do(span),
            Keyword::Then => self.process_then(span),
            Keyword::Else => {
                let accepted = matches!(
                    self.top().kind,
                    FrameKind::If { .. }
                        | FrameKind::Unless { .. }
                        | FrameKind::Case { .. }
                        | FrameKind::Begin { .. }
                        | FrameKind::Scope { .. }
                );

                if accepted {
                    self.close_header();
                    self.end_statement();
                } else {
                    self.error(messages::UNEXPECTED_ELSE, span);
                }
            }
            Keyword::Elsif => {
                let accepted = {
                    if let FrameKind::If { header_open, .. } = &mut self.top().kind {
                        *header_open = true;
                        true
                    } else {
                        false
                    }
                };

                if accepted {
                    self.end_statement();
                } else {
                    self.error(messages::UNEXPECTED_ELSIF, span);
                }
            }
            Keyword::When => {
                if matches!(self.top().kind, FrameKind::Case { .. }) {
                    self.push_node(RubyNode::leaf(
                        RubyNodeKind::When { keyword: span, then_keyword: None },
                        span,
                    ));
                    self.end_statement();
                } else {
                    self.error(messages::UNEXPECTED_WHEN, span);
                }
            }
            Keyword::In => self.process_in(span),
            Keyword::Rescue => self.process_rescue(span),
            Keyword::Ensure => {
                if matches!(self.top().kind, FrameKind::Begin { .. } | FrameKind::Scope { .. }) {
                    self.push_node(RubyNode::leaf(RubyNodeKind::Ensure { keyword: span }, span));
                    self.end_statement();
                } else {
                    self.error(messages::UNEXPECTED_ENSURE, span);
                }
            }
            Keyword::End => {
                let closable = matches!(
                    self.top().kind,
                    FrameKind::If { .. }
                        | FrameKind::Unless { .. }
                        | FrameKind::Case { .. }
                        | FrameKind::While { .. }
                        | FrameKind::Until { .. }
                        | FrameKind::For { .. }
                        | FrameKind::Begin { .. }
                        | FrameKind::Scope { .. }
                        | FrameKind::Block { delimiter: BlockDelimiter::Do, .. }
                        | FrameKind::Lambda { delimiter: BlockDelimiter::Do, .. }
                );

                if closable {
                    self.close_construct(Some(span));
                } else {
                    self.error(messages::UNEXPECTED_END, span);
                }
            }
            Keyword::Yield => {
                let in_method = self
                    .frames
                    .iter()
                    .any(|frame| matches!(frame.kind, FrameKind::Scope { .. }));

                if self.mode == ParseMode::Main && !in_method {
                    self.error("Invalid yield", span);
                }
                self.push_node(RubyNode::leaf(RubyNodeKind::Yield { keyword: span }, span));
                self.note_operand(span);
            }
            Keyword::Break => {
                self.process_jump(span, RubyNodeKind::Break { keyword: span }, messages::INVALID_BREAK)
            }
            Keyword::Next => {
                self.process_jump(span, RubyNodeKind::Next { keyword: span }, messages::INVALID_NEXT)
            }
            Keyword::Redo => {
                self.process_jump(span, RubyNodeKind::Redo { keyword: span }, messages::INVALID_REDO)
            }
            Keyword::Retry => self.process_retry(span),
            Keyword::Return => {
                self.push_node(RubyNode::leaf(RubyNodeKind::Return { keyword: span }, span));
                self.note_operand(span);
            }
        }
    }

    fn open_conditional(&mut self, span: Span, negated: bool) {
        if self.value_position() {
            let start = self.stmt_start.unwrap_or(span.start);
            let kind = if negated {
                RubyNodeKind::Unless {
                    keyword: span,
                    end_keyword: None,
                    then_keyword: None,
                    postfix: true,
                }
            } else {
                RubyNodeKind::If { keyword: span, end_keyword: None, then_keyword: None, postfix: true }
            };
            self.push_node(RubyNode::leaf(kind, Span::new(start, span.end)));
            return;
        }

        let kind = if negated {
            FrameKind::Unless { keyword: span, then_keyword: None, header_open: true }
        } else {
            FrameKind::If { keyword: span, then_keyword: None, header_open: true }
        };
        self.push_frame(kind, span.start);
    }

    fn open_loop(&mut self, span: Span, negated: bool) {
        if self.value_position() {
            let start = self.stmt_start.unwrap_or(span.start);
            let kind = if negated {
                RubyNodeKind::Until { keyword: span, closing: None, postfix: true }
            } else {
                RubyNodeKind::While { keyword: span, closing: None, postfix: true }
            };
            self.push_node(RubyNode::leaf(kind, Span::new(start, span.end)));
            return;
        }

        let kind = if negated {
            FrameKind::Until { keyword: span, header_open: true }
        } else {
            FrameKind::While { keyword: span, header_open: true }
        };
        self.push_frame(kind, span.start);
    }

    fn process_do(&mut self, span: Span) {
        if let Some(arrow) = self.pending_lambda.take() {
            self.push_frame(
                FrameKind::Lambda {
                    delimiter: BlockDelimiter::Do,
                    opening: span,
                    arrow_start: arrow.start,
                },
                arrow.start,
            );
            return;
        }

        // `while cond do` / `for x in xs do`: the `do` terminates the header
        let closed_header = {
            match &mut self.top().kind {
                FrameKind::While { header_open, .. }
                | FrameKind::Until { header_open, .. }
                | FrameKind::For { header_open, .. }
                    if *header_open =>
                {
                    *header_open = false;
                    true
                }
                _ => false,
            }
        };

        if closed_header {
            self.end_statement();
        } else {
            let stmt_start = self.stmt_start.unwrap_or(span.start);
            self.push_frame(
                FrameKind::Block { delimiter: BlockDelimiter::Do, opening: span, stmt_start },
                span.start,
            );
        }
    }

    fn process_then(&mut self, span: Span) {
        enum Target {
            Header,
            CaseArm,
            None,
        }

        let target = {
            match &mut self.top().kind {
                FrameKind::If { then_keyword, header_open, .. }
                | FrameKind::Unless { then_keyword, header_open, .. }
                    if *header_open =>
                {
                    *then_keyword = Some(span);
                    *header_open = false;
                    Target::Header
                }
                FrameKind::Case { .. } => Target::CaseArm,
                _ => Target::None,
            }
        };

        match target {
            Target::Header => self.end_statement(),
            Target::CaseArm => {
                if let Some(last) = self.top().children.last_mut() {
                    match &mut last.kind {
                        RubyNodeKind::When { then_keyword, .. }
                        | RubyNodeKind::In { then_keyword, .. }
                            if then_keyword.is_none() =>
                        {
                            *then_keyword = Some(span);
                        }
                        _ => {}
                    }
                }
                self.end_statement();
            }
            Target::None => {}
        }
    }

    fn process_in(&mut self, span: Span) {
        enum Action {
            ForHeader,
            CaseArm,
            Other,
        }

        let value_position = self.value_position();
        let action = {
            match &mut self.top().kind {
                FrameKind::For { header_open, seen_in, .. } if *header_open && !*seen_in => {
                    *seen_in = true;
                    Action::ForHeader
                }
                FrameKind::Case { has_in, .. } => {
                    *has_in = true;
                    Action::CaseArm
                }
                _ => Action::Other,
            }
        };

        match action {
            Action::ForHeader => {}
            Action::CaseArm => {
                self.push_node(RubyNode::leaf(
                    RubyNodeKind::In { keyword: span, then_keyword: None },
                    span,
                ));
                self.end_statement();
            }
            Action::Other => {
                if value_position {
                    let start = self.stmt_start.unwrap_or(span.start);
                    self.push_node(RubyNode::leaf(
                        RubyNodeKind::MatchPredicate { keyword: span },
                        Span::new(start, span.end),
                    ));
                } else {
                    self.error(messages::UNEXPECTED_IN, span);
                }
            }
        }
    }

    fn process_rescue(&mut self, span: Span) {
        let value_position = self.value_position();
        let accepted = {
            match &mut self.top().kind {
                FrameKind::Begin { in_rescue, .. } => {
                    *in_rescue = true;
                    true
                }
                FrameKind::Scope { .. } => true,
                _ => false,
            }
        };

        if accepted {
            self.push_node(RubyNode::leaf(RubyNodeKind::Rescue { keyword: span }, span));
            self.end_statement();
        } else if !value_position {
            // `x rescue fallback` modifier form is fine
            self.error(messages::UNEXPECTED_RESCUE, span);
        }
    }

    fn process_jump(&mut self, span: Span, kind: RubyNodeKind, invalid_message: &str) {
        if self.mode == ParseMode::Main && !self.in_loop_context() {
            self.error(invalid_message, span);
        }
        self.push_node(RubyNode::leaf(kind, span));
        self.note_operand(span);
    }

    fn process_retry(&mut self, span: Span) {
        if self.mode == ParseMode::Main && !self.in_rescue_context() {
            self.error(messages::INVALID_RETRY, span);
        }
        self.push_node(RubyNode::leaf(RubyNodeKind::Retry { keyword: span }, span));
        self.note_operand(span);
    }

    /// A jump keyword is scoped to the nearest loop or block, and never
    /// escapes a method/class boundary.
    fn in_loop_context(&self) -> bool {
        for frame in self.frames.iter().rev() {
            match frame.kind {
                FrameKind::While { .. }
                | FrameKind::Until { .. }
                | FrameKind::For { .. }
                | FrameKind::Block { .. }
                | FrameKind::Lambda { .. } => return true,
                FrameKind::Scope { .. } => return false,
                _ => {}
            }
        }
        false
    }

    fn in_rescue_context(&self) -> bool {
        for frame in self.frames.iter().rev() {
            match frame.kind {
                FrameKind::Begin { in_rescue, .. } if in_rescue => return true,
                FrameKind::Scope { .. } => return false,
                _ => {}
            }
        }
        false
    }

    fn close_header(&mut self) {
        match &mut self.top().kind {
            FrameKind::If { header_open, .. }
            | FrameKind::Unless { header_open, .. }
            | FrameKind::While { header_open, .. }
            | FrameKind::Until { header_open, .. }
            | FrameKind::For { header_open, .. } => *header_open = false,
            _ => {}
        }
    }

    fn push_group(&mut self, open: u8, span: Span) {
        self.frames.push(Frame {
            kind: FrameKind::Group { open },
            start: span.start,
            children: Vec::new(),
        });
    }

    fn close_group(&mut self, open: u8) {
        let matching = matches!(self.top().kind, FrameKind::Group { open: o } if o == open);

        if matching {
            if let Some(frame) = self.frames.pop() {
                self.top().children.extend(frame.children);
            }
        }
    }

    fn open_brace(&mut self, span: Span) {
        if let Some(arrow) = self.pending_lambda.take() {
            self.push_frame(
                FrameKind::Lambda {
                    delimiter: BlockDelimiter::Brace,
                    opening: span,
                    arrow_start: arrow.start,
                },
                arrow.start,
            );
            return;
        }

        if self.value_position() {
            let stmt_start = self.stmt_start.unwrap_or(span.start);
            self.push_frame(
                FrameKind::Block { delimiter: BlockDelimiter::Brace, opening: span, stmt_start },
                span.start,
            );
        } else {
            self.push_group(b'{', span);
        }
    }

    fn close_brace(&mut self, span: Span) {
        let action = match self.top().kind {
            FrameKind::Block { delimiter: BlockDelimiter::Brace, .. }
            | FrameKind::Lambda { delimiter: BlockDelimiter::Brace, .. } => 0u8,
            FrameKind::Group { open: b'{' } => 1,
            _ => 2,
        };

        match action {
            0 => self.close_construct(Some(span)),
            1 => self.close_group(b'{'),
            _ => self.error(messages::UNEXPECTED_BRACE, span),
        }
    }

    /// Pops the innermost construct frame and turns it into a node.
    fn close_construct(&mut self, closer: Option<Span>) {
        if self.frames.len() < 2 {
            return;
        }

        let frame = match self.frames.pop() {
            Some(frame) => frame,
            None => return,
        };

        let end_offset = closer.map(|span| span.end).unwrap_or_else(|| {
            frame
                .children
                .last()
                .map(|child| child.span.end)
                .unwrap_or(self.cursor_end)
                .max(frame.start)
        });
        let span = Span::new(frame.start, end_offset.max(frame.start));

        let node = match frame.kind {
            FrameKind::Root | FrameKind::Group { .. } => RubyNode {
                kind: RubyNodeKind::Expression,
                span,
                children: frame.children,
            },
            FrameKind::If { keyword, then_keyword, .. } => RubyNode {
                kind: RubyNodeKind::If { keyword, end_keyword: closer, then_keyword, postfix: false },
                span,
                children: frame.children,
            },
            FrameKind::Unless { keyword, then_keyword, .. } => RubyNode {
                kind: RubyNodeKind::Unless {
                    keyword,
                    end_keyword: closer,
                    then_keyword,
                    postfix: false,
                },
                span,
                children: frame.children,
            },
            FrameKind::Case { keyword, has_in } => RubyNode {
                kind: if has_in {
                    RubyNodeKind::CaseMatch { keyword, end_keyword: closer }
                } else {
                    RubyNodeKind::Case { keyword, end_keyword: closer }
                },
                span,
                children: frame.children,
            },
            FrameKind::While { keyword, .. } => RubyNode {
                kind: RubyNodeKind::While { keyword, closing: closer, postfix: false },
                span,
                children: frame.children,
            },
            FrameKind::Until { keyword, .. } => RubyNode {
                kind: RubyNodeKind::Until { keyword, closing: closer, postfix: false },
                span,
                children: frame.children,
            },
            FrameKind::For { keyword, .. } => RubyNode {
                kind: RubyNodeKind::For { keyword, end_keyword: closer },
                span,
                children: frame.children,
            },
            FrameKind::Begin { keyword, .. } => RubyNode {
                kind: RubyNodeKind::Begin { keyword, end_keyword: closer },
                span,
                children: frame.children,
            },
            FrameKind::Scope { keyword, .. } => RubyNode {
                kind: RubyNodeKind::Scope { keyword, end_keyword: closer },
                span,
                children: frame.children,
            },
            FrameKind::Block { delimiter, opening, stmt_start } => {
                let block = RubyNode {
                    kind: RubyNodeKind::Block { delimiter, opening, closing: closer },
                    span: Span::new(opening.start, span.end),
                    children: frame.children,
                };
                RubyNode {
                    kind: RubyNodeKind::Call,
                    span: Span::new(stmt_start, span.end),
                    children: vec![block],
                }
            }
            FrameKind::Lambda { delimiter, opening, arrow_start } => RubyNode {
                kind: RubyNodeKind::Lambda { delimiter, opening, closing: closer },
                span: Span::new(arrow_start, span.end),
                children: frame.children,
            },
        };

        self.push_node(node);
        self.expr_pending = true;
        if self.stmt_start.is_none() {
            self.stmt_start = Some(span.start);
        }
    }

    fn finish(mut self, source: &str) -> ParseResult {
        while self.frames.len() > 1 {
            let diagnostic = {
                let frame = &self.frames[self.frames.len() - 1];
                match &frame.kind {
                    FrameKind::If { keyword, .. } => Some((messages::expected_end("if"), *keyword)),
                    FrameKind::Unless { keyword, .. } => {
                        Some((messages::expected_end("unless"), *keyword))
                    }
                    FrameKind::Case { keyword, .. } => Some((messages::expected_end("case"), *keyword)),
                    FrameKind::While { keyword, .. } => {
                        Some((messages::expected_end("while"), *keyword))
                    }
                    FrameKind::Until { keyword, .. } => {
                        Some((messages::expected_end("until"), *keyword))
                    }
                    FrameKind::For { keyword, .. } => Some((messages::expected_end("for"), *keyword)),
                    FrameKind::Begin { keyword, .. } => {
                        Some((messages::expected_end("begin"), *keyword))
                    }
                    FrameKind::Scope { keyword, keyword_name } => {
                        Some((messages::expected_end(keyword_name), *keyword))
                    }
                    FrameKind::Block { delimiter: BlockDelimiter::Do, opening, .. }
                    | FrameKind::Lambda { delimiter: BlockDelimiter::Do, opening, .. } => {
                        Some((messages::EXPECTED_BLOCK_END.to_string(), *opening))
                    }
                    FrameKind::Block { delimiter: BlockDelimiter::Brace, opening, .. }
                    | FrameKind::Lambda { delimiter: BlockDelimiter::Brace, opening, .. } => {
                        Some((messages::EXPECTED_BLOCK_BRACE.to_string(), *opening))
                    }
                    FrameKind::Group { open } => {
                        let close = match *open {
                            b'(' => ')',
                            b'[' => ']',
                            _ => '}',
                        };
                        Some((
                            messages::expected_closing(close),
                            Span::new(frame.start, (frame.start + 1).min(source.len())),
                        ))
                    }
                    FrameKind::Root => None,
                }
            };

            if let Some((message, span)) = diagnostic {
                self.error(message, span);
            }

            self.close_construct(None);
        }

        let mut root_frame = match self.frames.pop() {
            Some(frame) => frame,
            None => Frame { kind: FrameKind::Root, start: 0, children: Vec::new() },
        };

        let root = RubyNode {
            kind: RubyNodeKind::Statements,
            span: Span::new(0, source.len()),
            children: std::mem::take(&mut root_frame.children),
        };

        ParseResult { root, diagnostics: self.diagnostics }
    }
}
