//! Predicate compiler
//!
//! First of the two query phases: walks a [`Predicate`] and produces an
//! annotated token stream in which every field reference carries the kind it
//! is indexed as. The converter lowers that stream to native syntax.
//!
//! The stream's text form reads like
//! `( @age|Numeric| > 30 AND NOT @status|Tag| == a&b )`.

use std::fmt;

use chrono::SecondsFormat;
use tracing::debug;

use crate::analyzer::AnalyzedSchema;
use crate::error::{IndexError, Result};
use crate::predicate::{CompareOp, Literal, MatchMode, Operand, Predicate};
use crate::schema::ResolvedKind;

/// One token of a compiled predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Open,
    Close,
    And,
    Or,
    Not,
    /// Field reference annotated with its resolved kind
    Field { name: String, kind: ResolvedKind },
    Op(CompareOp),
    /// Rendered literal operand
    Value(String),
    /// String-match pattern with its wildcards
    Pattern { value: String, mode: MatchMode },
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Open => f.write_str("("),
            Token::Close => f.write_str(")"),
            Token::And => f.write_str("AND"),
            Token::Or => f.write_str("OR"),
            Token::Not => f.write_str("NOT"),
            Token::Field { name, kind } => write!(f, "@{}|{}|", name, kind.as_str()),
            Token::Op(op) => f.write_str(op.symbol()),
            Token::Value(value) => f.write_str(value),
            Token::Pattern { value, mode } => f.write_str(&mode.wildcard(value)),
        }
    }
}

/// Annotated token stream produced by [`compile`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPredicate {
    index_name: String,
    tokens: Vec<Token>,
}

impl CompiledPredicate {
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}

impl fmt::Display for CompiledPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", token)?;
        }
        Ok(())
    }
}

/// Render a literal the way it appears in the token stream.
pub fn render_literal(literal: &Literal) -> Result<String> {
    match literal {
        Literal::String(s) => Ok(s.clone()),
        Literal::Bool(b) => Ok(b.to_string()),
        Literal::Int(n) => Ok(n.to_string()),
        Literal::UInt(n) => Ok(n.to_string()),
        Literal::Float(x) if x.is_finite() => Ok(x.to_string()),
        Literal::Float(x) => Err(IndexError::unsupported(format!(
            "non-finite number {} cannot be compared",
            x
        ))),
        Literal::Timestamp(ts) => Ok(ts.to_rfc3339_opts(SecondsFormat::Micros, true)),
    }
}

struct Compiler<'a> {
    schema: &'a AnalyzedSchema,
    tokens: Vec<Token>,
}

impl<'a> Compiler<'a> {
    fn field(&self, operand: &Operand) -> Result<Token> {
        let name = match operand {
            Operand::Field(name) => name,
            Operand::Literal(literal) => {
                return Err(IndexError::unsupported(format!(
                    "left-hand side must be a field, found literal {:?}",
                    literal
                )))
            }
        };
        let kind = self
            .schema
            .kind_of(name)
            .ok_or_else(|| IndexError::unknown_field(&self.schema.index_name, name))?;
        Ok(Token::Field {
            name: name.clone(),
            kind,
        })
    }

    fn visit(&mut self, predicate: &Predicate) -> Result<()> {
        match predicate {
            Predicate::And(left, right) => self.combine(left, Token::And, right),
            Predicate::Or(left, right) => self.combine(left, Token::Or, right),
            Predicate::Not(inner) => {
                self.tokens.push(Token::Not);
                self.visit(inner)
            }
            Predicate::Compare { lhs, op, rhs } => self.compare(lhs, *op, rhs),
            Predicate::StringMatch {
                target,
                mode,
                pattern,
            } => {
                let field = self.field(target)?;
                if let Token::Field {
                    kind: ResolvedKind::Numeric,
                    ref name,
                } = field
                {
                    return Err(IndexError::unsupported(format!(
                        "string matching on numeric field '{}'",
                        name
                    )));
                }
                self.tokens.push(field);
                self.tokens.push(Token::Pattern {
                    value: pattern.clone(),
                    mode: *mode,
                });
                Ok(())
            }
            Predicate::Call { method, .. } => Err(IndexError::unsupported(format!(
                "method call '{}' has no query translation",
                method
            ))),
        }
    }

    fn combine(&mut self, left: &Predicate, separator: Token, right: &Predicate) -> Result<()> {
        self.tokens.push(Token::Open);
        self.visit(left)?;
        self.tokens.push(separator);
        self.visit(right)?;
        self.tokens.push(Token::Close);
        Ok(())
    }

    fn compare(&mut self, lhs: &Operand, op: CompareOp, rhs: &Operand) -> Result<()> {
        let field = self.field(lhs)?;
        let literal = match rhs {
            Operand::Literal(literal) => literal,
            Operand::Field(other) => {
                return Err(IndexError::unsupported(format!(
                    "comparison against field '{}'; right-hand side must be a value",
                    other
                )))
            }
        };

        if let Token::Field { ref name, kind } = field {
            match kind {
                ResolvedKind::Numeric if !literal.is_numeric() => {
                    return Err(IndexError::unsupported(format!(
                        "numeric field '{}' compared with non-numeric value {:?}",
                        name, literal
                    )));
                }
                ResolvedKind::Tag | ResolvedKind::Text if op.is_ordering() => {
                    return Err(IndexError::unsupported(format!(
                        "operator '{}' on {} field '{}'",
                        op, kind, name
                    )));
                }
                _ => {}
            }
        }

        self.tokens.push(field);
        self.tokens.push(Token::Op(op));
        self.tokens.push(Token::Value(render_literal(literal)?));
        Ok(())
    }
}

/// Compile `predicate` against the resolved fields of `schema`.
///
/// Fails before any store call for predicate shapes with no translation and
/// for fields the type does not index.
pub fn compile(schema: &AnalyzedSchema, predicate: &Predicate) -> Result<CompiledPredicate> {
    let mut compiler = Compiler {
        schema,
        tokens: Vec::new(),
    };
    compiler.visit(predicate)?;

    let compiled = CompiledPredicate {
        index_name: schema.index_name.clone(),
        tokens: compiler.tokens,
    };
    debug!("Compiled predicate for '{}': {}", schema.index_name, compiled);
    Ok(compiled)
}
