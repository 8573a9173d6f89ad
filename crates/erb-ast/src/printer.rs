//! S-expression rendering of the document tree.
//!
//! Used by the CLI `parse` command and by tests that assert on tree
//! shape without matching every token.

use crate::ast::*;

impl Node {
    /// Renders this node and its descendants as a compact s-expression.
    pub fn to_sexp(&self) -> String {
        match self {
            Node::Document(n) => format!("(document{})", sexp_list(&n.children)),
            Node::HtmlElement(n) => {
                let close = match &n.close_tag {
                    Some(close) => format!(" {}", close.to_sexp()),
                    None => String::new(),
                };
                let void = if n.is_void { " void" } else { "" };
                format!(
                    "(html_element {}{} {}{}{})",
                    quoted(&n.tag_name.value),
                    void,
                    n.open_tag.to_sexp(),
                    sexp_body("body", &n.body),
                    close
                )
            }
            Node::HtmlOpenTag(n) => {
                let void = if n.is_void { " void" } else { "" };
                format!("(html_open_tag {}{})", quoted(&n.tag_name.value), void)
            }
            Node::HtmlCloseTag(n) => format!("(html_close_tag {})", quoted(&n.tag_name.value)),
            Node::HtmlText(n) => format!("(text {})", quoted(&n.content)),
            Node::Whitespace(_) => "(whitespace)".to_string(),
            Node::HtmlComment(_) => "(comment)".to_string(),
            Node::HtmlDoctype(_) => "(doctype)".to_string(),
            Node::HtmlConditionalElement(n) => format!(
                "(html_conditional_element {} {}{})",
                quoted(&n.tag_name.value),
                quoted(&n.condition),
                sexp_body("body", &n.body)
            ),
            Node::HtmlConditionalOpenTag(n) => format!(
                "(html_conditional_open_tag {} {})",
                quoted(&n.tag_name.value),
                n.conditional.to_sexp()
            ),
            Node::ErbContent(n) => format!("(erb_content {})", quoted(content_text(&n.content))),
            Node::ErbIf(n) => {
                let subsequent = match &n.subsequent {
                    Some(node) => format!(" {}", node.to_sexp()),
                    None => String::new(),
                };
                format!(
                    "(erb_if {}{}{}{})",
                    quoted(content_text(&n.content)),
                    sexp_body("statements", &n.statements),
                    subsequent,
                    end_sexp(&n.end_node)
                )
            }
            Node::ErbElse(n) => {
                format!("(erb_else{})", sexp_body("statements", &n.statements))
            }
            Node::ErbUnless(n) => {
                let else_clause = match &n.else_clause {
                    Some(node) => format!(" (erb_else{})", sexp_body("statements", &node.statements)),
                    None => String::new(),
                };
                format!(
                    "(erb_unless {}{}{}{})",
                    quoted(content_text(&n.content)),
                    sexp_body("statements", &n.statements),
                    else_clause,
                    end_sexp(&n.end_node)
                )
            }
            Node::ErbCase(n) => {
                let arms: String = n
                    .conditions
                    .iter()
                    .map(|when| {
                        format!(
                            " (erb_when {}{})",
                            quoted(content_text(&when.content)),
                            sexp_body("statements", &when.statements)
                        )
                    })
                    .collect();
                let else_clause = match &n.else_clause {
                    Some(node) => format!(" (erb_else{})", sexp_body("statements", &node.statements)),
                    None => String::new(),
                };
                format!(
                    "(erb_case {}{}{}{}{})",
                    quoted(content_text(&n.content)),
                    sexp_body("children", &n.children),
                    arms,
                    else_clause,
                    end_sexp(&n.end_node)
                )
            }
            Node::ErbCaseMatch(n) => {
                let arms: String = n
                    .conditions
                    .iter()
                    .map(|arm| {
                        format!(
                            " (erb_in {}{})",
                            quoted(content_text(&arm.content)),
                            sexp_body("statements", &arm.statements)
                        )
                    })
                    .collect();
                let else_clause = match &n.else_clause {
                    Some(node) => format!(" (erb_else{})", sexp_body("statements", &node.statements)),
                    None => String::new(),
                };
                format!(
                    "(erb_case_match {}{}{}{}{})",
                    quoted(content_text(&n.content)),
                    sexp_body("children", &n.children),
                    arms,
                    else_clause,
                    end_sexp(&n.end_node)
                )
            }
            Node::ErbWhen(n) => format!(
                "(erb_when {}{})",
                quoted(content_text(&n.content)),
                sexp_body("statements", &n.statements)
            ),
            Node::ErbIn(n) => format!(
                "(erb_in {}{})",
                quoted(content_text(&n.content)),
                sexp_body("statements", &n.statements)
            ),
            Node::ErbWhile(n) => format!(
                "(erb_while {}{}{})",
                quoted(content_text(&n.content)),
                sexp_body("statements", &n.statements),
                end_sexp(&n.end_node)
            ),
            Node::ErbUntil(n) => format!(
                "(erb_until {}{}{})",
                quoted(content_text(&n.content)),
                sexp_body("statements", &n.statements),
                end_sexp(&n.end_node)
            ),
            Node::ErbFor(n) => format!(
                "(erb_for {}{}{})",
                quoted(content_text(&n.content)),
                sexp_body("statements", &n.statements),
                end_sexp(&n.end_node)
            ),
            Node::ErbBlock(n) => format!(
                "(erb_block {}{}{})",
                quoted(content_text(&n.content)),
                sexp_body("body", &n.body),
                end_sexp(&n.end_node)
            ),
            Node::ErbBegin(n) => {
                let rescue = match &n.rescue_clause {
                    Some(node) => format!(" {}", rescue_sexp(node)),
                    None => String::new(),
                };
                let else_clause = match &n.else_clause {
                    Some(node) => format!(" (erb_else{})", sexp_body("statements", &node.statements)),
                    None => String::new(),
                };
                let ensure = match &n.ensure_clause {
                    Some(node) => {
                        format!(" (erb_ensure{})", sexp_body("statements", &node.statements))
                    }
                    None => String::new(),
                };
                format!(
                    "(erb_begin{}{}{}{}{})",
                    sexp_body("statements", &n.statements),
                    rescue,
                    else_clause,
                    ensure,
                    end_sexp(&n.end_node)
                )
            }
            Node::ErbRescue(n) => rescue_sexp(n),
            Node::ErbEnsure(n) => {
                format!("(erb_ensure{})", sexp_body("statements", &n.statements))
            }
            Node::ErbEnd(_) => "(erb_end)".to_string(),
            Node::ErbYield(_) => "(erb_yield)".to_string(),
        }
    }
}

impl DocumentNode {
    /// Renders the whole document as an s-expression.
    pub fn to_sexp(&self) -> String {
        format!("(document{})", sexp_list(&self.children))
    }
}

fn rescue_sexp(node: &ErbRescueNode) -> String {
    let subsequent = match &node.subsequent {
        Some(next) => format!(" {}", rescue_sexp(next)),
        None => String::new(),
    };
    format!(
        "(erb_rescue {}{}{})",
        quoted(content_text(&node.content)),
        sexp_body("statements", &node.statements),
        subsequent
    )
}

fn end_sexp(end_node: &Option<Box<ErbEndNode>>) -> String {
    match end_node {
        Some(_) => " (erb_end)".to_string(),
        None => String::new(),
    }
}

fn sexp_list(nodes: &[Node]) -> String {
    nodes.iter().map(|node| format!(" {}", node.to_sexp())).collect()
}

fn sexp_body(label: &str, nodes: &[Node]) -> String {
    if nodes.is_empty() {
        return String::new();
    }
    format!(" ({label}{})", sexp_list(nodes))
}

fn content_text(content: &Option<erb_token::Token>) -> &str {
    content.as_ref().map(|token| token.value.trim()).unwrap_or("")
}

fn quoted(text: &str) -> String {
    format!("{:?}", text)
}
