pub mod diff;

#[cfg(test)]
mod expr_test;

use std::fmt::{self, Write};
use std::ops;

use serde::Serialize;

use crate::tensor::{IdxRef, TensorAtom};

/// Symbolic expression tree. Construction goes through the smart constructors
/// ([`Expr::sum`], [`Expr::product`], [`Expr::pow`], [`Expr::rational`]) which
/// keep the tree flattened and fold numeric subterms eagerly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    Int(i64),
    Rational(i64, i64),
    Float(f64),
    Pi,
    E,
    Symbol(String),
    Add(Vec<Expr>),
    Mul(Vec<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Func(MathFn, Box<Expr>),
    Tensor(TensorAtom),
    Deriv(Box<Expr>, Vec<IdxRef>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MathFn {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Asinh,
    Acosh,
    Atanh,
    Exp,
    Ln,
    Log(i64),
}

impl MathFn {
    fn name(&self) -> &'static str {
        match self {
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
            Self::Sinh => "sinh",
            Self::Cosh => "cosh",
            Self::Tanh => "tanh",
            Self::Asinh => "asinh",
            Self::Acosh => "acosh",
            Self::Atanh => "atanh",
            Self::Exp => "exp",
            Self::Ln => "ln",
            Self::Log(_) => "log",
        }
    }
}

/// Exact or floating numeric value carried during folding.
#[derive(Debug, Clone, Copy)]
enum Num {
    Rat(i64, i64),
    Float(f64),
}

impl Num {
    const ZERO: Self = Self::Rat(0, 1);
    const ONE: Self = Self::Rat(1, 1);

    fn from_expr(expr: &Expr) -> Option<Self> {
        match expr {
            Expr::Int(int) => Some(Self::Rat(*int, 1)),
            Expr::Rational(numer, denom) => Some(Self::Rat(*numer, *denom)),
            Expr::Float(float) => Some(Self::Float(*float)),
            _ => None,
        }
    }

    fn to_expr(self) -> Expr {
        match self {
            Self::Rat(numer, denom) => Expr::rational(numer, denom),
            Self::Float(float) => Expr::Float(float),
        }
    }

    fn to_float(self) -> f64 {
        match self {
            Self::Rat(numer, denom) => numer as f64 / denom as f64,
            Self::Float(float) => float,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Self::Rat(numer, _) => numer == 0,
            Self::Float(float) => float == 0.0,
        }
    }

    fn is_one(self) -> bool {
        match self {
            Self::Rat(numer, denom) => numer == denom,
            Self::Float(float) => float == 1.0,
        }
    }

    fn add(self, other: Self) -> Self {
        match (self, other) {
            (Self::Rat(a, b), Self::Rat(c, d)) => {
                rat128(a as i128 * d as i128 + c as i128 * b as i128, b as i128 * d as i128)
            }
            (lhs, rhs) => Self::Float(lhs.to_float() + rhs.to_float()),
        }
    }

    fn mul(self, other: Self) -> Self {
        match (self, other) {
            (Self::Rat(a, b), Self::Rat(c, d)) => {
                rat128(a as i128 * c as i128, b as i128 * d as i128)
            }
            (lhs, rhs) => Self::Float(lhs.to_float() * rhs.to_float()),
        }
    }

    fn pow_int(self, exp: i64) -> Option<Self> {
        match self {
            Self::Float(float) => {
                Some(Self::Float(float.powi(i32::try_from(exp).ok()?)))
            }
            Self::Rat(numer, denom) => {
                if exp.unsigned_abs() > 63 {
                    return None;
                }
                let power = exp.unsigned_abs() as u32;
                let numer = (numer as i128).checked_pow(power)?;
                let denom = (denom as i128).checked_pow(power)?;
                if exp >= 0 {
                    checked_rat128(numer, denom)
                } else if numer != 0 {
                    checked_rat128(denom, numer)
                } else {
                    None
                }
            }
        }
    }
}

fn gcd128(mut a: i128, mut b: i128) -> i128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.abs()
}

fn rat128(numer: i128, denom: i128) -> Num {
    checked_rat128(numer, denom)
        .unwrap_or_else(|| Num::Float(numer as f64 / denom as f64))
}

fn checked_rat128(mut numer: i128, mut denom: i128) -> Option<Num> {
    if denom < 0 {
        numer = -numer;
        denom = -denom;
    }
    let divisor = gcd128(numer, denom).max(1);
    numer /= divisor;
    denom /= divisor;
    Some(Num::Rat(i64::try_from(numer).ok()?, i64::try_from(denom).ok()?))
}

fn flatten_add(terms: Vec<Expr>, out: &mut Vec<Expr>) {
    for term in terms {
        match term {
            Expr::Add(inner) => flatten_add(inner, out),
            other => out.push(other),
        }
    }
}

fn flatten_mul(factors: Vec<Expr>, out: &mut Vec<Expr>) {
    for factor in factors {
        match factor {
            Expr::Mul(inner) => flatten_mul(inner, out),
            other => out.push(other),
        }
    }
}

// split a term into its numeric coefficient and the remaining key used for
// like-term collection
fn split_coeff(term: Expr) -> (Num, Expr) {
    if let Expr::Mul(factors) = term {
        if let Some(coeff) = factors.first().and_then(Num::from_expr) {
            let mut rest: Vec<Expr> = factors.into_iter().skip(1).collect();
            let key = if rest.len() == 1 {
                rest.pop().unwrap_or(Expr::Int(1))
            } else {
                Expr::Mul(rest)
            };
            return (coeff, key);
        }
        (Num::ONE, Expr::Mul(factors))
    } else {
        (Num::ONE, term)
    }
}

impl Expr {
    pub fn symbol(name: impl ToString) -> Self {
        Self::Symbol(name.to_string())
    }

    /// Reduced rational literal; denominators of one collapse to [`Expr::Int`].
    pub fn rational(numer: i64, denom: i64) -> Self {
        match checked_rat128(numer as i128, denom as i128) {
            Some(Num::Rat(numer, 1)) => Self::Int(numer),
            Some(Num::Rat(numer, denom)) => Self::Rational(numer, denom),
            _ => Self::Float(numer as f64 / denom as f64),
        }
    }

    /// Flattening sum with numeric folding and like-term collection.
    pub fn sum(terms: Vec<Expr>) -> Self {
        let mut flat = Vec::new();
        flatten_add(terms, &mut flat);

        let mut constant = Num::ZERO;
        let mut collected: Vec<(Expr, Num)> = Vec::new();
        for term in flat {
            if let Some(num) = Num::from_expr(&term) {
                constant = constant.add(num);
                continue;
            }
            let (coeff, key) = split_coeff(term);
            if let Some((_, total)) = collected.iter_mut().find(|(other, _)| *other == key) {
                *total = total.add(coeff);
            } else {
                collected.push((key, coeff));
            }
        }

        let mut out = Vec::new();
        if !constant.is_zero() {
            out.push(constant.to_expr());
        }
        for (key, coeff) in collected {
            if coeff.is_zero() {
                continue;
            }
            if coeff.is_one() {
                out.push(key);
            } else if let Expr::Mul(mut factors) = key {
                factors.insert(0, coeff.to_expr());
                out.push(Expr::Mul(factors));
            } else {
                out.push(Expr::Mul(vec![coeff.to_expr(), key]));
            }
        }

        match out.len() {
            0 => Expr::Int(0),
            1 => out.pop().unwrap_or(Expr::Int(0)),
            _ => Expr::Add(out),
        }
    }

    /// Flattening product with numeric folding and like-base exponent merging.
    /// Non-numeric factors are sorted so that commutatively equal products
    /// compare equal.
    pub fn product(factors: Vec<Expr>) -> Self {
        let mut flat = Vec::new();
        flatten_mul(factors, &mut flat);

        let mut coeff = Num::ONE;
        let mut bases: Vec<(Expr, Expr)> = Vec::new();
        for factor in flat {
            if let Some(num) = Num::from_expr(&factor) {
                coeff = coeff.mul(num);
                continue;
            }
            let (base, exp) = match factor {
                Expr::Pow(base, exp) => (*base, *exp),
                other => (other, Expr::Int(1)),
            };
            if let Some((_, total)) = bases.iter_mut().find(|(other, _)| *other == base) {
                let merged = Expr::sum(vec![std::mem::replace(total, Expr::Int(0)), exp]);
                *total = merged;
            } else {
                bases.push((base, exp));
            }
        }

        if coeff.is_zero() {
            return coeff.to_expr();
        }

        bases.sort_by_cached_key(|(base, _)| format!("{base:?}"));
        let mut out = Vec::new();
        if !coeff.is_one() {
            out.push(coeff.to_expr());
        }
        for (base, exp) in bases {
            match Expr::pow(base, exp) {
                Expr::Int(1) => {}
                factor => out.push(factor),
            }
        }

        match out.len() {
            0 => Expr::Int(1),
            1 => out.pop().unwrap_or(Expr::Int(1)),
            _ => Expr::Mul(out),
        }
    }

    pub fn pow(base: Expr, exp: Expr) -> Self {
        if exp == Expr::Int(0) {
            return Expr::Int(1);
        }
        if exp == Expr::Int(1) || base == Expr::Int(1) {
            return base;
        }
        if let (Some(num), &Expr::Int(int)) = (Num::from_expr(&base), &exp) {
            if let Some(folded) = num.pow_int(int) {
                return folded.to_expr();
            }
        }
        if let Expr::Pow(inner_base, inner_exp) = base {
            if matches!(exp, Expr::Int(_)) {
                return Expr::pow(*inner_base, Expr::product(vec![*inner_exp, exp]));
            }
            return Expr::Pow(Box::new(Expr::Pow(inner_base, inner_exp)), Box::new(exp));
        }
        Expr::Pow(Box::new(base), Box::new(exp))
    }

    pub fn as_terms(&self) -> Vec<Expr> {
        match self {
            Expr::Add(terms) => terms.clone(),
            other => vec![other.clone()],
        }
    }

    pub fn depends_on(&self, var: &str) -> bool {
        match self {
            Expr::Symbol(name) => name == var,
            Expr::Add(items) | Expr::Mul(items) => items.iter().any(|item| item.depends_on(var)),
            Expr::Pow(base, exp) => base.depends_on(var) || exp.depends_on(var),
            Expr::Func(_, inner) | Expr::Deriv(inner, _) => inner.depends_on(var),
            _ => false,
        }
    }

    /// Distribute products over sums (and small integer powers of sums) so
    /// that the result is a flat sum of products.
    pub fn expand(&self) -> Expr {
        match self {
            Expr::Add(terms) => Expr::sum(terms.iter().map(Expr::expand).collect()),
            Expr::Mul(factors) => {
                let mut partials: Vec<Vec<Expr>> = vec![Vec::new()];
                for factor in factors {
                    match factor.expand() {
                        Expr::Add(terms) => {
                            let mut next = Vec::with_capacity(partials.len() * terms.len());
                            for partial in &partials {
                                for term in &terms {
                                    let mut grown = partial.clone();
                                    grown.push(term.clone());
                                    next.push(grown);
                                }
                            }
                            partials = next;
                        }
                        other => {
                            for partial in &mut partials {
                                partial.push(other.clone());
                            }
                        }
                    }
                }
                Expr::sum(partials.into_iter().map(Expr::product).collect())
            }
            Expr::Pow(base, exp) => {
                let base = base.expand();
                if let (Expr::Add(_), &Expr::Int(int)) = (&base, exp.as_ref()) {
                    if (2..=8).contains(&int) {
                        return Expr::Mul(vec![base; int as usize]).expand();
                    }
                }
                Expr::pow(base, exp.expand())
            }
            Expr::Func(func, inner) => Expr::Func(*func, Box::new(inner.expand())),
            Expr::Deriv(inner, indices) => match inner.expand() {
                Expr::Add(terms) => Expr::sum(
                    terms
                        .into_iter()
                        .map(|term| Expr::Deriv(Box::new(term), indices.clone()))
                        .collect(),
                ),
                other => Expr::Deriv(Box::new(other), indices.clone()),
            },
            leaf => leaf.clone(),
        }
    }
}

impl ops::Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::sum(vec![self, rhs])
    }
}

impl ops::Sub for Expr {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::sum(vec![self, -rhs])
    }
}

impl ops::Mul for Expr {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::product(vec![self, rhs])
    }
}

impl ops::Div for Expr {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        Expr::product(vec![self, Expr::pow(rhs, Expr::Int(-1))])
    }
}

impl ops::Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::product(vec![Expr::Int(-1), self])
    }
}

fn needs_parens(expr: &Expr) -> bool {
    matches!(expr, Expr::Add(_) | Expr::Mul(_) | Expr::Pow(..) | Expr::Rational(..))
        || matches!(expr, Expr::Int(int) if *int < 0)
        || matches!(expr, Expr::Float(float) if *float < 0.0)
}

fn fmt_operand(f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
    if needs_parens(expr) {
        write!(f, "({expr})")
    } else {
        write!(f, "{expr}")
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int(int) => write!(f, "{int}"),
            Expr::Rational(numer, denom) => write!(f, "{numer}/{denom}"),
            Expr::Float(float) => write!(f, "{float}"),
            Expr::Pi => f.write_str("pi"),
            Expr::E => f.write_str("e"),
            Expr::Symbol(name) => f.write_str(name),
            Expr::Add(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" + ")?;
                    }
                    write!(f, "{term}")?;
                }
                Ok(())
            }
            Expr::Mul(factors) => {
                for (i, factor) in factors.iter().enumerate() {
                    if i > 0 {
                        f.write_char('*')?;
                    }
                    if matches!(factor, Expr::Add(_)) || needs_parens(factor) && i > 0 {
                        write!(f, "({factor})")?;
                    } else {
                        write!(f, "{factor}")?;
                    }
                }
                Ok(())
            }
            Expr::Pow(base, exp) => {
                fmt_operand(f, base)?;
                f.write_char('^')?;
                fmt_operand(f, exp)
            }
            Expr::Func(MathFn::Log(log_base), inner) => write!(f, "log_{log_base}({inner})"),
            Expr::Func(func, inner) => write!(f, "{}({inner})", func.name()),
            Expr::Tensor(atom) => write!(f, "{atom}"),
            Expr::Deriv(inner, indices) => {
                f.write_str("d")?;
                for index in indices {
                    write!(f, "_{index}")?;
                }
                write!(f, "({inner})")
            }
        }
    }
}
