//! Query syntax converter
//!
//! Lowers a [`CompiledPredicate`] into native search syntax:
//!
//! | Kind | `==` | `!=` | ordering |
//! |---|---|---|---|
//! | Numeric | `@f:[v v]` | `-@f:[v v]` | `@f:[v +inf]` / `@f:[-inf v]` |
//! | Text | `@f:term` | `-@f:term` | rejected at compile time |
//! | Tag | `@f:{escaped}` | `-@f:{escaped}` | rejected at compile time |
//!
//! Strict and inclusive bounds lower to the same closed range.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::compiler::{CompiledPredicate, Token};
use crate::error::{IndexError, Result};
use crate::predicate::{CompareOp, MatchMode};
use crate::schema::ResolvedKind;

/// Characters escaped with a backslash inside tag values.
pub const TAG_RESERVED: &[char] = &[
    '\\', '-', ':', '"', '\'', '.', ',', '(', ')', '[', ']', '{', '}', '|', '&', '~', '!', '*',
    '?', '^', '$', '@', ' ',
];

/// Everything a text term may not contain.
static TEXT_STRIP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s]").expect("Invalid text strip regex"));

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// Escape a tag value against the reserved character set.
pub fn escape_tag(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if TAG_RESERVED.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Reduce a value to a bare text term.
///
/// Punctuation is removed; runs of whitespace become a single escaped space.
/// Returns `None` when nothing searchable remains.
pub fn text_term(value: &str) -> Option<String> {
    let stripped = TEXT_STRIP.replace_all(value, "");
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(WHITESPACE.replace_all(trimmed, "\\ ").into_owned())
}

/// Closed numeric range.
pub fn numeric_range(min: &str, max: &str) -> String {
    format!("[{} {}]", min, max)
}

#[derive(Debug)]
enum Node {
    Clause(String),
    Not(Box<Node>),
    Group { or: bool, children: Vec<Node> },
}

impl Node {
    fn render(&self, top: bool) -> String {
        match self {
            Node::Clause(clause) => clause.clone(),
            Node::Not(inner) => match inner.as_ref() {
                Node::Clause(clause) if !clause.starts_with('-') => format!("-{}", clause),
                Node::Group { .. } => format!("-{}", inner.render(false)),
                other => format!("-({})", other.render(true)),
            },
            Node::Group { or, children } => {
                let separator = if *or { " | " } else { " " };
                let body = children
                    .iter()
                    .map(|c| c.render(false))
                    .collect::<Vec<_>>()
                    .join(separator);
                if top {
                    body
                } else {
                    format!("({})", body)
                }
            }
        }
    }
}

fn malformed(compiled: &CompiledPredicate, detail: &str) -> IndexError {
    IndexError::unsupported(format!(
        "malformed compiled predicate ({}): {}",
        detail, compiled
    ))
}

struct Parser<'a> {
    compiled: &'a CompiledPredicate,
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn node(&mut self) -> Result<Node> {
        match self.next() {
            Some(Token::Open) => {
                let left = self.node()?;
                let or = match self.next() {
                    Some(Token::And) => false,
                    Some(Token::Or) => true,
                    _ => return Err(malformed(self.compiled, "expected AND/OR")),
                };
                let right = self.node()?;
                if !matches!(self.next(), Some(Token::Close)) {
                    return Err(malformed(self.compiled, "unclosed group"));
                }

                let mut children = Vec::new();
                for child in [left, right] {
                    match child {
                        // Same combinator flattens into one group
                        Node::Group {
                            or: child_or,
                            children: nested,
                        } if child_or == or => children.extend(nested),
                        other => children.push(other),
                    }
                }
                Ok(Node::Group { or, children })
            }
            Some(Token::Not) => Ok(Node::Not(Box::new(self.node()?))),
            Some(Token::Field { name, kind }) => match self.next() {
                Some(Token::Op(op)) => match self.next() {
                    Some(Token::Value(value)) => {
                        Ok(Node::Clause(comparison(name, *kind, *op, value)?))
                    }
                    _ => Err(malformed(self.compiled, "operator without value")),
                },
                Some(Token::Pattern { value, mode }) => {
                    Ok(Node::Clause(pattern(name, *kind, value, *mode)?))
                }
                _ => Err(malformed(self.compiled, "dangling field reference")),
            },
            _ => Err(malformed(self.compiled, "unexpected token")),
        }
    }
}

fn comparison(field: &str, kind: ResolvedKind, op: CompareOp, value: &str) -> Result<String> {
    let (clause, negated) = match kind {
        ResolvedKind::Numeric => {
            let range = match op {
                CompareOp::Eq | CompareOp::Ne => numeric_range(value, value),
                CompareOp::Gt | CompareOp::Ge => numeric_range(value, "+inf"),
                CompareOp::Lt | CompareOp::Le => numeric_range("-inf", value),
            };
            (format!("@{}:{}", field, range), op == CompareOp::Ne)
        }
        ResolvedKind::Text => {
            let term = text_term(value).ok_or_else(|| {
                IndexError::unsupported(format!(
                    "text value '{}' for '{}' has no searchable characters",
                    value, field
                ))
            })?;
            (format!("@{}:{}", field, term), op == CompareOp::Ne)
        }
        ResolvedKind::Tag => (
            format!("@{}:{{{}}}", field, escape_tag(value)),
            op == CompareOp::Ne,
        ),
    };

    if negated {
        Ok(format!("-{}", clause))
    } else {
        Ok(clause)
    }
}

fn pattern(field: &str, kind: ResolvedKind, value: &str, mode: MatchMode) -> Result<String> {
    match kind {
        ResolvedKind::Text => {
            let term = text_term(value).ok_or_else(|| {
                IndexError::unsupported(format!(
                    "pattern '{}' for '{}' has no searchable characters",
                    value, field
                ))
            })?;
            Ok(format!("@{}:{}", field, mode.wildcard(&term)))
        }
        ResolvedKind::Tag => Ok(format!(
            "@{}:{{{}}}",
            field,
            mode.wildcard(&escape_tag(value))
        )),
        ResolvedKind::Numeric => Err(IndexError::unsupported(format!(
            "string matching on numeric field '{}'",
            field
        ))),
    }
}

/// Lower a compiled predicate to native query syntax.
pub fn to_native(compiled: &CompiledPredicate) -> Result<String> {
    let mut parser = Parser {
        compiled,
        tokens: compiled.tokens(),
        pos: 0,
    };
    let root = parser.node()?;
    if parser.pos != compiled.tokens().len() {
        return Err(malformed(compiled, "trailing tokens"));
    }
    Ok(root.render(true))
}
