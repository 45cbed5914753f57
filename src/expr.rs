// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Restricted expression language.
//!
//! Variable definitions and install conditions are both written as small
//! expressions. Rather than handing them to a general purpose evaluator, we
//! parse them with a tiny recursive-descent parser that only understands
//! what a dotfile configuration actually needs:
//!
//! - string literals in single or double quotes,
//! - the booleans `true` and `false` (`True` and `False` are accepted too),
//! - set literals like `{"DP-0", "HDMI-0"}`,
//! - identifiers that name variables,
//! - set operators `|`, `^`, `&`, `-`,
//! - comparisons `==`, `!=`, `in`, `not in`,
//! - boolean operators `and`, `or`, `not`, and parentheses.
//!
//! # Examples
//!
//! ```text
//! SHELL == "bash"
//! "i3" in PATH_BINARIES and not WORK
//! {"DP-3", "DP-3-8"} | OTHER_DISPLAYS
//! ```
//!
//! Expressions are parsed once into an [`Expr`] tree, and evaluated against
//! any [`Scope`] that can resolve identifiers into [`Value`]s.

mod parse;
mod value;

pub use value::Value;

use std::{
    collections::{BTreeMap, BTreeSet},
    str::FromStr,
};

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Literal(Value),
    Var(String),
    SetLiteral(Vec<Expr>),
    Not(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

/// Binary operators of the expression language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    In,
    NotIn,
    Union,
    SymmetricDifference,
    Intersection,
    Difference,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            Self::Or => "or",
            Self::And => "and",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Union => "|",
            Self::SymmetricDifference => "^",
            Self::Intersection => "&",
            Self::Difference => "-",
        }
    }
}

/// Resolve identifiers to values during evaluation.
pub trait Scope {
    /// Look up value bound to `name`, if any.
    fn lookup(&self, name: &str) -> Option<&Value>;
}

impl Scope for BTreeMap<String, Value> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

/// Scope that binds nothing.
///
/// Every identifier evaluated in it is undefined.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyScope;

impl Scope for EmptyScope {
    fn lookup(&self, _name: &str) -> Option<&Value> {
        None
    }
}

impl Expr {
    /// Parse expression from source text.
    ///
    /// # Errors
    ///
    /// - Return [`ExprError::Syntax`] if source is not a valid expression.
    pub fn parse(source: &str) -> Result<Self> {
        parse::parse(source)
    }

    pub(crate) fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Evaluate expression against a scope.
    ///
    /// The boolean operators short-circuit, so `WORK and DISPLAY == "x"` does
    /// not look up `DISPLAY` when `WORK` is falsy.
    ///
    /// # Errors
    ///
    /// - Return [`ExprError::UndefinedVariable`] if an identifier is unbound.
    /// - Return [`ExprError::TypeMismatch`] if an operator is applied to
    ///   values of the wrong kind.
    pub fn eval(&self, scope: &impl Scope) -> Result<Value> {
        match self {
            Self::Literal(value) => Ok(value.clone()),
            Self::Var(name) => scope
                .lookup(name)
                .cloned()
                .ok_or_else(|| ExprError::UndefinedVariable(name.clone())),
            Self::SetLiteral(items) => {
                let mut set = BTreeSet::new();
                for item in items {
                    match item.eval(scope)? {
                        Value::Str(value) => {
                            set.insert(value);
                        }
                        other => {
                            return Err(ExprError::SetElement {
                                kind: other.kind(),
                            })
                        }
                    }
                }
                Ok(Value::Set(set))
            }
            Self::Not(inner) => Ok(Value::Bool(!inner.eval(scope)?.is_truthy())),
            Self::Binary { op, lhs, rhs } => match op {
                BinaryOp::And => Ok(Value::Bool(
                    lhs.eval(scope)?.is_truthy() && rhs.eval(scope)?.is_truthy(),
                )),
                BinaryOp::Or => Ok(Value::Bool(
                    lhs.eval(scope)?.is_truthy() || rhs.eval(scope)?.is_truthy(),
                )),
                _ => apply(*op, lhs.eval(scope)?, rhs.eval(scope)?),
            },
        }
    }

    /// Evaluate expression and reduce result to its truthiness.
    ///
    /// # Errors
    ///
    /// - Same as [`Expr::eval`].
    pub fn eval_bool(&self, scope: &impl Scope) -> Result<bool> {
        self.eval(scope).map(|value| value.is_truthy())
    }
}

impl FromStr for Expr {
    type Err = ExprError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Self::parse(source)
    }
}

fn apply(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value> {
    let value = match (op, lhs, rhs) {
        (BinaryOp::Eq, lhs, rhs) => Value::Bool(lhs == rhs),
        (BinaryOp::Ne, lhs, rhs) => Value::Bool(lhs != rhs),
        (BinaryOp::In, Value::Str(needle), Value::Set(haystack)) => {
            Value::Bool(haystack.contains(&needle))
        }
        (BinaryOp::In, Value::Str(needle), Value::Str(haystack)) => {
            Value::Bool(haystack.contains(needle.as_str()))
        }
        (BinaryOp::NotIn, lhs, rhs) => match apply(BinaryOp::In, lhs, rhs)? {
            Value::Bool(found) => Value::Bool(!found),
            other => other,
        },
        (BinaryOp::Union, Value::Set(lhs), Value::Set(rhs)) => {
            Value::Set(lhs.union(&rhs).cloned().collect())
        }
        (BinaryOp::SymmetricDifference, Value::Set(lhs), Value::Set(rhs)) => {
            Value::Set(lhs.symmetric_difference(&rhs).cloned().collect())
        }
        (BinaryOp::Intersection, Value::Set(lhs), Value::Set(rhs)) => {
            Value::Set(lhs.intersection(&rhs).cloned().collect())
        }
        (BinaryOp::Difference, Value::Set(lhs), Value::Set(rhs)) => {
            Value::Set(lhs.difference(&rhs).cloned().collect())
        }
        (op, lhs, rhs) => {
            return Err(ExprError::TypeMismatch {
                op: op.symbol(),
                lhs: lhs.kind(),
                rhs: rhs.kind(),
            })
        }
    };

    Ok(value)
}

/// Expression error types.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ExprError {
    /// Expression source is malformed.
    #[error("syntax error at column {column}: {message}")]
    Syntax { message: String, column: usize },

    /// Identifier does not name a known variable.
    #[error("undefined variable `{0}`")]
    UndefinedVariable(String),

    /// Operator applied to unsupported operand kinds.
    #[error("unsupported operand kinds for `{op}`: {lhs} and {rhs}")]
    TypeMismatch {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },

    /// Set literal holds something other than a string.
    #[error("set elements must be strings, found {kind}")]
    SetElement { kind: &'static str },
}

/// Friendly result alias :3
pub type Result<T, E = ExprError> = std::result::Result<T, E>;
