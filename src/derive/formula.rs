use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Serialized externally tagged, e.g.
/// `{"div": [{"var": "Final Energy|Electricity"}, {"var": "Final Energy"}]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Var(String),
    Const(f64),
    Sum(Vec<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn var(name: &str) -> Self {
        Self::Var(name.to_string())
    }

    pub fn sum<I: IntoIterator<Item = Expr>>(terms: I) -> Self {
        Self::Sum(terms.into_iter().collect())
    }

    pub fn sub(left: Expr, right: Expr) -> Self {
        Self::Sub(Box::new(left), Box::new(right))
    }

    pub fn div(numerator: Expr, denominator: Expr) -> Self {
        Self::Div(Box::new(numerator), Box::new(denominator))
    }

    pub fn scaled(self, factor: f64) -> Self {
        Self::Mul(Box::new(self), Box::new(Self::Const(factor)))
    }

    pub fn variables(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables(&self, names: &mut BTreeSet<String>) {
        match self {
            Self::Var(name) => {
                names.insert(name.clone());
            }
            Self::Const(_) => {}
            Self::Sum(terms) => {
                for term in terms {
                    term.collect_variables(names);
                }
            }
            Self::Sub(left, right) | Self::Mul(left, right) | Self::Div(left, right) => {
                left.collect_variables(names);
                right.collect_variables(names);
            }
        }
    }

    pub fn evaluate<F>(&self, lookup: &F) -> Option<f64>
    where
        F: Fn(&str) -> Option<f64>,
    {
        match self {
            Self::Var(name) => lookup(name),
            Self::Const(value) => Some(*value),
            Self::Sum(terms) => terms
                .iter()
                .try_fold(0.0_f64, |total, term| Some(total + term.evaluate(lookup)?)),
            Self::Sub(left, right) => Some(left.evaluate(lookup)? - right.evaluate(lookup)?),
            Self::Mul(left, right) => Some(left.evaluate(lookup)? * right.evaluate(lookup)?),
            Self::Div(left, right) => Some(left.evaluate(lookup)? / right.evaluate(lookup)?),
        }
    }
}
