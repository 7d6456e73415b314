//! Rule evaluation engine.
//!
//! Evaluates bound rules against one row of a merged frame.
//!
//! # Evaluation Semantics
//!
//! - Comparison rules: evaluate at the given row
//! - `CROSS_ABOVE`/`CROSS_BELOW`: compare with the previous row; the first
//!   row has no previous row and yields `Undefined`
//! - Any operand that is missing or undefined (NaN) makes its comparison
//!   `Undefined`, never `Quiet`
//! - `AND`: `Undefined` if any child is undefined, else `Quiet` if any child
//!   is quiet
//! - `OR`: `Fired` if any child fires, else `Undefined` if any child is
//!   undefined
//! - `NOT`: swaps `Fired` and `Quiet`, keeps `Undefined`
//! - Unbound `$param` references evaluate to `Undefined`

use crate::domain::frame::Row;
use crate::domain::rule::{Operand, Rule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Fired,
    Quiet,
    Undefined,
}

impl Outcome {
    pub fn fired(self) -> bool {
        self == Outcome::Fired
    }

    fn from_bool(b: bool) -> Self {
        if b { Outcome::Fired } else { Outcome::Quiet }
    }
}

pub fn evaluate(rule: &Rule, row: &Row<'_>) -> Outcome {
    match rule {
        Rule::CrossAbove { left, right } => cross(left, right, row, |lc, rc, lp, rp| {
            lc > rc && lp <= rp
        }),
        Rule::CrossBelow { left, right } => cross(left, right, row, |lc, rc, lp, rp| {
            lc < rc && lp >= rp
        }),
        Rule::Above { left, right } => compare(left, right, row, |l, r| l > r),
        Rule::Below { left, right } => compare(left, right, row, |l, r| l < r),
        Rule::Between {
            operand,
            lower,
            upper,
        } => match (
            resolve(operand, row),
            resolve(lower, row),
            resolve(upper, row),
        ) {
            (Some(v), Some(lo), Some(hi)) => Outcome::from_bool(v >= lo && v <= hi),
            _ => Outcome::Undefined,
        },
        Rule::And(rules) => {
            let mut quiet = false;
            for r in rules {
                match evaluate(r, row) {
                    Outcome::Undefined => return Outcome::Undefined,
                    Outcome::Quiet => quiet = true,
                    Outcome::Fired => {}
                }
            }
            Outcome::from_bool(!quiet)
        }
        Rule::Or(rules) => {
            let mut undefined = false;
            for r in rules {
                match evaluate(r, row) {
                    Outcome::Fired => return Outcome::Fired,
                    Outcome::Undefined => undefined = true,
                    Outcome::Quiet => {}
                }
            }
            if undefined {
                Outcome::Undefined
            } else {
                Outcome::Quiet
            }
        }
        Rule::Not(inner) => match evaluate(inner, row) {
            Outcome::Fired => Outcome::Quiet,
            Outcome::Quiet => Outcome::Fired,
            Outcome::Undefined => Outcome::Undefined,
        },
    }
}

fn compare(left: &Operand, right: &Operand, row: &Row<'_>, op: impl Fn(f64, f64) -> bool) -> Outcome {
    match (resolve(left, row), resolve(right, row)) {
        (Some(l), Some(r)) => Outcome::from_bool(op(l, r)),
        _ => Outcome::Undefined,
    }
}

fn cross(
    left: &Operand,
    right: &Operand,
    row: &Row<'_>,
    op: impl Fn(f64, f64, f64, f64) -> bool,
) -> Outcome {
    let Some(prev) = row.previous() else {
        return Outcome::Undefined;
    };
    match (
        resolve(left, row),
        resolve(right, row),
        resolve(left, &prev),
        resolve(right, &prev),
    ) {
        (Some(lc), Some(rc), Some(lp), Some(rp)) => Outcome::from_bool(op(lc, rc, lp, rp)),
        _ => Outcome::Undefined,
    }
}

fn resolve(operand: &Operand, row: &Row<'_>) -> Option<f64> {
    match operand {
        Operand::Column(name) => row.get(name),
        Operand::Constant(v) => Some(*v).filter(|v| !v.is_nan()),
        Operand::Param(_) => None,
        Operand::Product(a, b) => Some(resolve(a, row)? * resolve(b, row)?).filter(|v| !v.is_nan()),
    }
}
