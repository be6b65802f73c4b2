// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Restricted formula expression language for dynamic claims.
//!
//! Formulas are pure expressions evaluated against a scope of claim and
//! context values: arithmetic, comparisons, boolean `&&`/`||`, membership
//! (`x in y`), and the ternary `cond ? a : b`. There is deliberately no
//! assignment, no loops, and no way to call out of the evaluator; the
//! grammar is parsed into an explicit expression tree and walked.
//!
//! Expression parsers are layered to encode operator precedence, from the
//! loosest-binding operator at the outer level down to terms:
//! ternary, `||`, `&&`, comparisons/`in`, `+ -`, `* /`, parenthesised
//! expressions and literals.
//!
//! Semantics:
//! - `&&`, `||`, and the untaken ternary branch short-circuit; the skipped
//!   operand is never evaluated and may reference absent variables.
//! - division is always floating-point; other arithmetic stays integral
//!   when both operands are integers.
//! - mixing strings and numbers in arithmetic is a type error, with one
//!   exception: `+` concatenates two strings.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit1, multispace0, multispace1, satisfy},
    combinator::{all_consuming, opt, recognize, value},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use serde_json::{Map, Number, Value};

/// Formula parse or evaluation failure. Per-claim and non-fatal: only the
/// sub-claim whose formula failed is omitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormulaError {
    #[error("syntax error at '{0}'")]
    Syntax(String),
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error("division by zero")]
    DivisionByZero,
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Ident(String),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    In,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::In => "in",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }
}

/// Parse and evaluate an expression against the given scope.
pub fn evaluate(expression: &str, scope: &Map<String, Value>) -> Result<Value, FormulaError> {
    let expr = parse(expression)?;
    eval(&expr, scope)
}

/// Parse an expression into its tree without evaluating it.
pub fn parse(input: &str) -> Result<Expr, FormulaError> {
    match all_consuming(terminated(expr, multispace0))(input) {
        Ok((_, expr)) => Ok(expr),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(FormulaError::Syntax(e.input.trim().to_string()))
        }
        Err(nom::Err::Incomplete(_)) => Err(FormulaError::Syntax(input.trim().to_string())),
    }
}

// --- parser ------------------------------------------------------------

fn fold_exprs(initial: Expr, remainder: Vec<(BinaryOp, Expr)>) -> Expr {
    remainder.into_iter().fold(initial, |acc, (op, rhs)| {
        Expr::Binary(op, Box::new(acc), Box::new(rhs))
    })
}

/// Top level: the ternary. The else branch is a full expression, so chained
/// ternaries associate to the right without parentheses.
fn expr(i: &str) -> IResult<&str, Expr> {
    let (i, cond) = expr_or(i)?;
    let (i, branches) = opt(tuple((
        preceded(multispace0, char('?')),
        expr,
        preceded(multispace0, char(':')),
        expr,
    )))(i)?;

    Ok(match branches {
        Some((_, then_branch, _, else_branch)) => (
            i,
            Expr::Ternary(
                Box::new(cond),
                Box::new(then_branch),
                Box::new(else_branch),
            ),
        ),
        None => (i, cond),
    })
}

/// `||`, left associative.
fn expr_or(i: &str) -> IResult<&str, Expr> {
    let (i, initial) = expr_and(i)?;
    let (i, remainder) = many0(pair(
        preceded(multispace0, value(BinaryOp::Or, tag("||"))),
        expr_and,
    ))(i)?;
    Ok((i, fold_exprs(initial, remainder)))
}

/// `&&`, left associative.
fn expr_and(i: &str) -> IResult<&str, Expr> {
    let (i, initial) = expr_cmp(i)?;
    let (i, remainder) = many0(pair(
        preceded(multispace0, value(BinaryOp::And, tag("&&"))),
        expr_cmp,
    ))(i)?;
    Ok((i, fold_exprs(initial, remainder)))
}

/// Comparisons and membership. Non-associative; chains need parentheses.
fn expr_cmp(i: &str) -> IResult<&str, Expr> {
    let (i, initial) = expr_add(i)?;
    let (i, rest) = opt(pair(preceded(multispace0, cmp_op), expr_add))(i)?;
    Ok(match rest {
        Some((op, rhs)) => (i, Expr::Binary(op, Box::new(initial), Box::new(rhs))),
        None => (i, initial),
    })
}

fn cmp_op(i: &str) -> IResult<&str, BinaryOp> {
    alt((
        value(BinaryOp::Le, tag("<=")),
        value(BinaryOp::Ge, tag(">=")),
        value(BinaryOp::Eq, tag("==")),
        value(BinaryOp::Ne, tag("!=")),
        value(BinaryOp::Lt, tag("<")),
        value(BinaryOp::Gt, tag(">")),
        // `in` must stand alone as a word
        value(BinaryOp::In, terminated(tag("in"), multispace1)),
    ))(i)
}

/// `+` and `-`, left associative.
fn expr_add(i: &str) -> IResult<&str, Expr> {
    let (i, initial) = expr_mul(i)?;
    let (i, remainder) = many0(pair(
        preceded(
            multispace0,
            alt((
                value(BinaryOp::Add, char('+')),
                value(BinaryOp::Sub, char('-')),
            )),
        ),
        expr_mul,
    ))(i)?;
    Ok((i, fold_exprs(initial, remainder)))
}

/// `*` and `/`, left associative.
fn expr_mul(i: &str) -> IResult<&str, Expr> {
    let (i, initial) = expr_term(i)?;
    let (i, remainder) = many0(pair(
        preceded(
            multispace0,
            alt((
                value(BinaryOp::Mul, char('*')),
                value(BinaryOp::Div, char('/')),
            )),
        ),
        expr_term,
    ))(i)?;
    Ok((i, fold_exprs(initial, remainder)))
}

/// Innermost level: a parenthesised expression, a literal, or an identifier.
fn expr_term(i: &str) -> IResult<&str, Expr> {
    preceded(multispace0, alt((parens, number, string_literal, word_term)))(i)
}

fn parens(i: &str) -> IResult<&str, Expr> {
    delimited(char('('), expr, preceded(multispace0, char(')')))(i)
}

fn number(i: &str) -> IResult<&str, Expr> {
    let (i, raw) = recognize(tuple((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit1)),
    )))(i)?;

    let literal = if raw.contains('.') {
        raw.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
    } else {
        raw.parse::<i64>().ok().map(Value::from)
    };

    match literal {
        Some(value) => Ok((i, Expr::Literal(value))),
        None => Err(nom::Err::Error(nom::error::Error::new(
            i,
            nom::error::ErrorKind::Digit,
        ))),
    }
}

fn string_literal(i: &str) -> IResult<&str, Expr> {
    let (i, s) = alt((
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
    ))(i)?;
    Ok((i, Expr::Literal(Value::String(s.to_string()))))
}

/// An identifier or one of the keyword literals `true`/`false`.
fn word_term(i: &str) -> IResult<&str, Expr> {
    let (i, word) = recognize(pair(
        satisfy(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(i)?;

    match word {
        "true" => Ok((i, Expr::Literal(Value::Bool(true)))),
        "false" => Ok((i, Expr::Literal(Value::Bool(false)))),
        // `in` is an operator, never a term
        "in" => Err(nom::Err::Error(nom::error::Error::new(
            i,
            nom::error::ErrorKind::Tag,
        ))),
        ident => Ok((i, Expr::Ident(ident.to_string()))),
    }
}

// --- evaluator ---------------------------------------------------------

fn eval(expr: &Expr, scope: &Map<String, Value>) -> Result<Value, FormulaError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Ident(name) => scope
            .get(name)
            .cloned()
            .ok_or_else(|| FormulaError::UndefinedVariable(name.clone())),
        Expr::Ternary(cond, then_branch, else_branch) => {
            // Only the taken branch is evaluated.
            if as_bool(&eval(cond, scope)?)? {
                eval(then_branch, scope)
            } else {
                eval(else_branch, scope)
            }
        }
        Expr::Binary(BinaryOp::Or, lhs, rhs) => {
            if as_bool(&eval(lhs, scope)?)? {
                Ok(Value::Bool(true))
            } else {
                Ok(Value::Bool(as_bool(&eval(rhs, scope)?)?))
            }
        }
        Expr::Binary(BinaryOp::And, lhs, rhs) => {
            if !as_bool(&eval(lhs, scope)?)? {
                Ok(Value::Bool(false))
            } else {
                Ok(Value::Bool(as_bool(&eval(rhs, scope)?)?))
            }
        }
        Expr::Binary(op, lhs, rhs) => {
            let lhs = eval(lhs, scope)?;
            let rhs = eval(rhs, scope)?;
            apply_binary(*op, &lhs, &rhs)
        }
    }
}

fn apply_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, FormulaError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(loose_eq(lhs, rhs))),
        BinaryOp::Ne => Ok(Value::Bool(!loose_eq(lhs, rhs))),
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => compare(op, lhs, rhs),
        BinaryOp::In => membership(lhs, rhs),
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            arithmetic(op, lhs, rhs)
        }
        BinaryOp::Or | BinaryOp::And => unreachable!("short-circuited in eval"),
    }
}

/// Conditions must be actual booleans; no truthiness coercion.
fn as_bool(value: &Value) -> Result<bool, FormulaError> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(FormulaError::TypeMismatch(format!(
            "expected a boolean condition, got {other}"
        ))),
    }
}

/// Equality that treats 1 and 1.0 as equal; everything else is strict
/// structural equality.
fn loose_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs.as_f64(), rhs.as_f64()) {
        (Some(l), Some(r)) => l == r,
        _ => lhs == rhs,
    }
}

fn compare(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, FormulaError> {
    let ordering = match (lhs, rhs) {
        (Value::Number(_), Value::Number(_)) => {
            let (l, r) = (lhs.as_f64().unwrap_or(0.0), rhs.as_f64().unwrap_or(0.0));
            l.partial_cmp(&r)
        }
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        _ => {
            return Err(FormulaError::TypeMismatch(format!(
                "cannot compare {} {} {}",
                type_name(lhs),
                op.symbol(),
                type_name(rhs)
            )))
        }
    };

    let ordering = ordering.ok_or_else(|| {
        FormulaError::TypeMismatch("comparison has no defined ordering".to_string())
    })?;
    let result = match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Ge => ordering.is_ge(),
        _ => unreachable!(),
    };
    Ok(Value::Bool(result))
}

fn membership(needle: &Value, haystack: &Value) -> Result<Value, FormulaError> {
    match haystack {
        Value::Array(items) => Ok(Value::Bool(items.iter().any(|item| loose_eq(item, needle)))),
        other => Err(FormulaError::TypeMismatch(format!(
            "right operand of 'in' must be a sequence, got {}",
            type_name(other)
        ))),
    }
}

fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, FormulaError> {
    // String concatenation is the only non-numeric arithmetic allowed.
    if let (BinaryOp::Add, Value::String(l), Value::String(r)) = (op, lhs, rhs) {
        return Ok(Value::String(format!("{l}{r}")));
    }

    let (Value::Number(_), Value::Number(_)) = (lhs, rhs) else {
        return Err(FormulaError::TypeMismatch(format!(
            "cannot apply {} to {} and {}",
            op.symbol(),
            type_name(lhs),
            type_name(rhs)
        )));
    };

    // Integral operands stay integral, except for division.
    if op != BinaryOp::Div {
        if let (Some(l), Some(r)) = (lhs.as_i64(), rhs.as_i64()) {
            let result = match op {
                BinaryOp::Add => l.checked_add(r),
                BinaryOp::Sub => l.checked_sub(r),
                BinaryOp::Mul => l.checked_mul(r),
                _ => unreachable!(),
            };
            if let Some(n) = result {
                return Ok(Value::from(n));
            }
            // Overflow falls through to the float path.
        }
    }

    let (l, r) = (lhs.as_f64().unwrap_or(0.0), rhs.as_f64().unwrap_or(0.0));
    if op == BinaryOp::Div && r == 0.0 {
        return Err(FormulaError::DivisionByZero);
    }
    let result = match op {
        BinaryOp::Add => l + r,
        BinaryOp::Sub => l - r,
        BinaryOp::Mul => l * r,
        BinaryOp::Div => l / r,
        _ => unreachable!(),
    };
    Number::from_f64(result)
        .map(Value::Number)
        .ok_or_else(|| FormulaError::TypeMismatch("arithmetic produced a non-finite number".to_string()))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
