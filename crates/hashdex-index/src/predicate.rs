//! Predicate AST
//!
//! Boolean predicates over a document's fields, built through typed
//! [`Field`] handles and combined with `&`, `|` and `!`:
//!
//! ```
//! use hashdex_index::predicate::Field;
//!
//! let age = Field::<i32>::new("age");
//! let status = Field::<String>::new("status");
//! let bio = Field::<String>::new("bio");
//!
//! let predicate = age.gt(30) & (status.eq("active") | !bio.contains("bot"));
//! # let _ = predicate;
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::ops::{BitAnd, BitOr, Not};

use chrono::{DateTime, Utc};

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }

    /// Whether this operator orders values rather than testing equality.
    pub fn is_ordering(self) -> bool {
        !matches!(self, CompareOp::Eq | CompareOp::Ne)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// String matching mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchMode {
    Contains,
    StartsWith,
    EndsWith,
}

impl MatchMode {
    /// Wrap `value` in the wildcards of this mode.
    pub fn wildcard(self, value: &str) -> String {
        match self {
            MatchMode::Contains => format!("*{}*", value),
            MatchMode::StartsWith => format!("{}*", value),
            MatchMode::EndsWith => format!("*{}", value),
        }
    }
}

/// Constant operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Timestamp(DateTime<Utc>),
}

impl Literal {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Literal::Int(_) | Literal::UInt(_) | Literal::Float(_))
    }
}

/// Comparison operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Reference to a document field
    Field(String),
    Literal(Literal),
}

impl Operand {
    pub fn field(name: impl Into<String>) -> Self {
        Operand::Field(name.into())
    }

    pub fn literal(value: impl IntoLiteral) -> Self {
        Operand::Literal(value.into_literal())
    }
}

/// Boolean predicate over document fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
    Compare {
        lhs: Operand,
        op: CompareOp,
        rhs: Operand,
    },
    StringMatch {
        target: Operand,
        mode: MatchMode,
        pattern: String,
    },
    /// Boolean method call on a field
    ///
    /// Representable so callers can build it, but never translatable.
    Call { target: Operand, method: String },
}

impl Predicate {
    /// Raw comparison between two operands.
    pub fn compare(lhs: Operand, op: CompareOp, rhs: Operand) -> Self {
        Predicate::Compare { lhs, op, rhs }
    }

    /// Boolean method call on `target`.
    pub fn call(target: Operand, method: impl Into<String>) -> Self {
        Predicate::Call {
            target,
            method: method.into(),
        }
    }

    pub fn and(self, other: Predicate) -> Self {
        Predicate::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate) -> Self {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }
}

impl BitAnd for Predicate {
    type Output = Predicate;

    fn bitand(self, rhs: Predicate) -> Predicate {
        self.and(rhs)
    }
}

impl BitOr for Predicate {
    type Output = Predicate;

    fn bitor(self, rhs: Predicate) -> Predicate {
        self.or(rhs)
    }
}

impl Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Predicate {
        self.negate()
    }
}

/// Values usable as predicate literals.
pub trait IntoLiteral {
    fn into_literal(self) -> Literal;
}

macro_rules! impl_into_literal {
    ($variant:ident as $conv:ty: $($ty:ty),+ $(,)?) => {
        $(
            impl IntoLiteral for $ty {
                fn into_literal(self) -> Literal {
                    Literal::$variant(<$conv>::from(self))
                }
            }
        )+
    };
}

impl_into_literal!(Int as i64: i8, i16, i32, i64, u8, u16, u32);
impl_into_literal!(Float as f64: f32, f64);
impl_into_literal!(UInt as u64: u64);
impl_into_literal!(Bool as bool: bool);
impl_into_literal!(String as String: String, &str);

impl IntoLiteral for DateTime<Utc> {
    fn into_literal(self) -> Literal {
        Literal::Timestamp(self)
    }
}

impl IntoLiteral for Literal {
    fn into_literal(self) -> Literal {
        self
    }
}

/// Typed handle to a document field.
///
/// `T` is the field's value type; comparisons only accept values convertible
/// into it.
pub struct Field<T> {
    name: String,
    _type: PhantomData<fn() -> T>,
}

impl<T> Field<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            _type: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn operand(&self) -> Operand {
        Operand::Field(self.name.clone())
    }

    /// Arbitrary boolean method on this field. Not translatable.
    pub fn call(&self, method: impl Into<String>) -> Predicate {
        Predicate::call(self.operand(), method)
    }
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        Self::new(self.name.clone())
    }
}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Field").field(&self.name).finish()
    }
}

impl<T: IntoLiteral> Field<T> {
    fn compare(&self, op: CompareOp, value: impl Into<T>) -> Predicate {
        Predicate::Compare {
            lhs: self.operand(),
            op,
            rhs: Operand::Literal(value.into().into_literal()),
        }
    }

    pub fn eq(&self, value: impl Into<T>) -> Predicate {
        self.compare(CompareOp::Eq, value)
    }

    pub fn ne(&self, value: impl Into<T>) -> Predicate {
        self.compare(CompareOp::Ne, value)
    }

    pub fn gt(&self, value: impl Into<T>) -> Predicate {
        self.compare(CompareOp::Gt, value)
    }

    pub fn ge(&self, value: impl Into<T>) -> Predicate {
        self.compare(CompareOp::Ge, value)
    }

    pub fn lt(&self, value: impl Into<T>) -> Predicate {
        self.compare(CompareOp::Lt, value)
    }

    pub fn le(&self, value: impl Into<T>) -> Predicate {
        self.compare(CompareOp::Le, value)
    }
}

impl Field<String> {
    fn string_match(&self, mode: MatchMode, pattern: impl Into<String>) -> Predicate {
        Predicate::StringMatch {
            target: self.operand(),
            mode,
            pattern: pattern.into(),
        }
    }

    pub fn contains(&self, pattern: impl Into<String>) -> Predicate {
        self.string_match(MatchMode::Contains, pattern)
    }

    pub fn starts_with(&self, pattern: impl Into<String>) -> Predicate {
        self.string_match(MatchMode::StartsWith, pattern)
    }

    pub fn ends_with(&self, pattern: impl Into<String>) -> Predicate {
        self.string_match(MatchMode::EndsWith, pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_typed_comparison() {
        let age = Field::<i32>::new("age");
        assert_eq!(
            age.gt(30),
            Predicate::Compare {
                lhs: Operand::field("age"),
                op: CompareOp::Gt,
                rhs: Operand::Literal(Literal::Int(30)),
            }
        );
    }

    #[test]
    fn test_operators_build_tree() {
        let a = Field::<bool>::new("a");
        let b = Field::<bool>::new("b");

        let predicate = a.eq(true) & !b.eq(false) | a.eq(false);
        match predicate {
            Predicate::Or(left, _) => match *left {
                Predicate::And(_, right) => assert!(matches!(*right, Predicate::Not(_))),
                other => panic!("expected And, got {:?}", other),
            },
            other => panic!("expected Or, got {:?}", other),
        }
    }

    #[test]
    fn test_string_match_helpers() {
        let bio = Field::<String>::new("bio");
        assert_eq!(
            bio.starts_with("hel"),
            Predicate::StringMatch {
                target: Operand::field("bio"),
                mode: MatchMode::StartsWith,
                pattern: "hel".to_string(),
            }
        );
        assert_eq!(MatchMode::Contains.wildcard("x"), "*x*");
        assert_eq!(MatchMode::EndsWith.wildcard("x"), "*x");
    }

    #[test]
    fn test_literal_conversions() {
        assert_eq!(7u8.into_literal(), Literal::Int(7));
        assert_eq!(u64::MAX.into_literal(), Literal::UInt(u64::MAX));
        assert_eq!(1.5f32.into_literal(), Literal::Float(1.5));
        assert_eq!("x".into_literal(), Literal::String("x".to_string()));
        assert!(Literal::Float(0.0).is_numeric());
        assert!(!Literal::Bool(true).is_numeric());
    }
}
