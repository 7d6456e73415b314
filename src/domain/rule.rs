//! Rule AST data structures.
//!
//! - `Operand`: what can be compared (frame columns, constants, parameter
//!   references, products of operands)
//! - `Rule`: comparison, crossover and boolean composite nodes
//!
//! Parameter references are replaced by constants with `Rule::bind` before a
//! rule is evaluated, so evaluation never touches the parameter bundle.

use crate::domain::error::MohoError;
use crate::domain::params::ParameterBundle;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Column(String),
    Constant(f64),
    Param(String),
    Product(Box<Operand>, Box<Operand>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    CrossAbove {
        left: Operand,
        right: Operand,
    },
    CrossBelow {
        left: Operand,
        right: Operand,
    },
    Above {
        left: Operand,
        right: Operand,
    },
    Below {
        left: Operand,
        right: Operand,
    },
    Between {
        operand: Operand,
        lower: Operand,
        upper: Operand,
    },
    And(Vec<Rule>),
    Or(Vec<Rule>),
    Not(Box<Rule>),
}

impl Operand {
    fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Operand)) {
        f(self);
        if let Operand::Product(a, b) = self {
            a.visit(f);
            b.visit(f);
        }
    }

    fn bind(&self, params: &ParameterBundle) -> Result<Operand, MohoError> {
        Ok(match self {
            Operand::Param(key) => Operand::Constant(params.decimal(key).map_err(|_| {
                MohoError::InvalidParameter {
                    key: key.clone(),
                    reason: "referenced by a rule but not defined".to_string(),
                }
            })?),
            Operand::Product(a, b) => {
                Operand::Product(Box::new(a.bind(params)?), Box::new(b.bind(params)?))
            }
            other => other.clone(),
        })
    }
}

impl Rule {
    fn operands(&self) -> Vec<&Operand> {
        let mut out = Vec::new();
        self.collect_operands(&mut out);
        out
    }

    fn collect_operands<'a>(&'a self, out: &mut Vec<&'a Operand>) {
        match self {
            Rule::CrossAbove { left, right }
            | Rule::CrossBelow { left, right }
            | Rule::Above { left, right }
            | Rule::Below { left, right } => {
                left.visit(&mut |o| out.push(o));
                right.visit(&mut |o| out.push(o));
            }
            Rule::Between {
                operand,
                lower,
                upper,
            } => {
                operand.visit(&mut |o| out.push(o));
                lower.visit(&mut |o| out.push(o));
                upper.visit(&mut |o| out.push(o));
            }
            Rule::And(rules) | Rule::Or(rules) => {
                for r in rules {
                    r.collect_operands(out);
                }
            }
            Rule::Not(inner) => inner.collect_operands(out),
        }
    }

    /// Frame columns this rule reads.
    pub fn columns(&self) -> BTreeSet<String> {
        self.operands()
            .into_iter()
            .filter_map(|o| match o {
                Operand::Column(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Parameter keys this rule references.
    pub fn params(&self) -> BTreeSet<String> {
        self.operands()
            .into_iter()
            .filter_map(|o| match o {
                Operand::Param(key) => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    /// Replace every parameter reference with its value from `params`.
    pub fn bind(&self, params: &ParameterBundle) -> Result<Rule, MohoError> {
        Ok(match self {
            Rule::CrossAbove { left, right } => Rule::CrossAbove {
                left: left.bind(params)?,
                right: right.bind(params)?,
            },
            Rule::CrossBelow { left, right } => Rule::CrossBelow {
                left: left.bind(params)?,
                right: right.bind(params)?,
            },
            Rule::Above { left, right } => Rule::Above {
                left: left.bind(params)?,
                right: right.bind(params)?,
            },
            Rule::Below { left, right } => Rule::Below {
                left: left.bind(params)?,
                right: right.bind(params)?,
            },
            Rule::Between {
                operand,
                lower,
                upper,
            } => Rule::Between {
                operand: operand.bind(params)?,
                lower: lower.bind(params)?,
                upper: upper.bind(params)?,
            },
            Rule::And(rules) => Rule::And(
                rules
                    .iter()
                    .map(|r| r.bind(params))
                    .collect::<Result<_, _>>()?,
            ),
            Rule::Or(rules) => Rule::Or(
                rules
                    .iter()
                    .map(|r| r.bind(params))
                    .collect::<Result<_, _>>()?,
            ),
            Rule::Not(inner) => Rule::Not(Box::new(inner.bind(params)?)),
        })
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Column(name) => write!(f, "{}", name),
            Operand::Constant(v) => write!(f, "{}", v),
            Operand::Param(key) => write!(f, "${}", key),
            Operand::Product(a, b) => write!(f, "MUL({}, {})", a, b),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, name: &str, rules: &[Rule]) -> fmt::Result {
    write!(f, "{}(", name)?;
    for (i, r) in rules.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", r)?;
    }
    write!(f, ")")
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::CrossAbove { left, right } => write!(f, "CROSS_ABOVE({}, {})", left, right),
            Rule::CrossBelow { left, right } => write!(f, "CROSS_BELOW({}, {})", left, right),
            Rule::Above { left, right } => write!(f, "ABOVE({}, {})", left, right),
            Rule::Below { left, right } => write!(f, "BELOW({}, {})", left, right),
            Rule::Between {
                operand,
                lower,
                upper,
            } => write!(f, "BETWEEN({}, {}, {})", operand, lower, upper),
            Rule::And(rules) => write_list(f, "AND", rules),
            Rule::Or(rules) => write_list(f, "OR", rules),
            Rule::Not(inner) => write!(f, "NOT({})", inner),
        }
    }
}
