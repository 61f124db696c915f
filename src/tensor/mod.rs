pub mod derived;
pub mod summation;

#[cfg(test)]
mod tensor_test;

use std::fmt;

use serde::Serialize;

use crate::algebra::Expr;
use crate::span::Span;

/// A single tensor index, either still symbolic or already instantiated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum IdxRef {
    Label(String),
    Num(usize),
}

impl fmt::Display for IdxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(label) => f.write_str(label),
            Self::Num(num) => write!(f, "{num}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IndexPos {
    Upper,
    Lower,
}

impl IndexPos {
    pub fn flipped(self) -> Self {
        match self {
            Self::Upper => Self::Lower,
            Self::Lower => Self::Upper,
        }
    }

    pub fn suffix(self) -> char {
        match self {
            Self::Upper => 'U',
            Self::Lower => 'D',
        }
    }
}

/// An indexed occurrence inside an expression, e.g. `T^\mu{}_\nu`. The name
/// already carries the positional suffix (`TUD`).
#[derive(Debug, Clone, Serialize)]
pub struct TensorAtom {
    pub name: String,
    pub indices: Vec<(IdxRef, IndexPos)>,
    pub span: Span,
}

// spans are ignored so that equal atoms from different source offsets
// still compare equal
impl PartialEq for TensorAtom {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.indices == other.indices
    }
}

impl fmt::Display for TensorAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(base_name(&self.name, self.indices.len()))?;
        for (index, pos) in &self.indices {
            let marker = match pos {
                IndexPos::Upper => '^',
                IndexPos::Lower => '_',
            };
            write!(f, "{marker}{index}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Parity {
    Sym,
    Anti,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SymPair {
    pub first: usize,
    pub second: usize,
    pub parity: Parity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Symmetry {
    Nosym,
    Pairs(Vec<SymPair>),
    Kronecker,
    Permutation,
    Metric,
    Const,
}

impl Symmetry {
    /// Parse a symmetry lexeme such as `nosym`, `metric` or `sym01_anti23`.
    pub fn parse(text: &str) -> Self {
        match text {
            "nosym" => Self::Nosym,
            "metric" => Self::Metric,
            "kronecker" => Self::Kronecker,
            "permutation" => Self::Permutation,
            "const" => Self::Const,
            chain => Self::Pairs(
                chain
                    .split('_')
                    .map(|part| {
                        let parity = if part.starts_with("anti") {
                            Parity::Anti
                        } else {
                            Parity::Sym
                        };
                        let digits = part.as_bytes();
                        SymPair {
                            first: (digits[digits.len() - 2] - b'0') as usize,
                            second: (digits[digits.len() - 1] - b'0') as usize,
                            parity,
                        }
                    })
                    .collect(),
            ),
        }
    }

    fn pairs(&self) -> &[SymPair] {
        const METRIC_PAIR: &[SymPair] = &[SymPair {
            first: 0,
            second: 1,
            parity: Parity::Sym,
        }];
        match self {
            Self::Pairs(pairs) => pairs,
            Self::Metric => METRIC_PAIR,
            _ => &[],
        }
    }
}

/// A declared tensor: its structured name (`hUD`), rank, dimension and
/// symmetry. Scalars are rank zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TensorDecl {
    pub name: String,
    pub rank: usize,
    pub dimension: usize,
    pub symmetry: Symmetry,
}

/// Map an index combination onto its canonical representative together with
/// the sign relating the two. A sign of zero means the component vanishes
/// identically (an antisymmetric slot with equal indices).
pub fn canonicalize(symmetry: &Symmetry, indices: &[usize]) -> (i64, Vec<usize>) {
    let mut indices = indices.to_vec();
    let mut sign = 1i64;
    loop {
        let mut swapped = false;
        for pair in symmetry.pairs() {
            let (first, second) = (indices[pair.first], indices[pair.second]);
            if first > second {
                indices.swap(pair.first, pair.second);
                if pair.parity == Parity::Anti {
                    sign = -sign;
                }
                swapped = true;
            } else if first == second && pair.parity == Parity::Anti {
                sign = 0;
            }
        }
        if !swapped {
            break (sign, indices);
        }
    }
}

/// Component name for an instantiated tensor, e.g. `hUD` at `[0, 1]` is
/// `hUD01`.
pub fn component_name(name: &str, indices: &[usize]) -> String {
    let mut out = String::from(name);
    for index in indices {
        out.push_str(&index.to_string());
    }
    out
}

/// Strip the trailing positional suffix (`UD...`) off a structured name.
pub fn base_name(name: &str, rank: usize) -> &str {
    &name[..name.len().saturating_sub(rank)]
}

/// Sign of the permutation, zero on repeated entries.
pub fn levi_civita(indices: &[usize]) -> i64 {
    let mut sign = 1i64;
    for i in 0..indices.len() {
        for j in i + 1..indices.len() {
            match indices[i].cmp(&indices[j]) {
                std::cmp::Ordering::Greater => sign = -sign,
                std::cmp::Ordering::Equal => return 0,
                std::cmp::Ordering::Less => {}
            }
        }
    }
    sign
}

/// Row-major cartesian product of half-open ranges, the iteration order of
/// every component loop in the crate.
pub fn index_space(ranges: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let mut out = vec![Vec::new()];
    for &(lo, hi) in ranges {
        let mut next = Vec::with_capacity(out.len() * (hi.saturating_sub(lo)));
        for partial in &out {
            for value in lo..hi {
                let mut grown = partial.clone();
                grown.push(value);
                next.push(grown);
            }
        }
        out = next;
    }
    out
}

fn determinant(matrix: &[Vec<Expr>]) -> Expr {
    let dimension = matrix.len();
    let mut terms = Vec::new();
    for perm in index_space(&vec![(0, dimension); dimension]) {
        let sign = levi_civita(&perm);
        if sign == 0 {
            continue;
        }
        let mut factors = vec![Expr::Int(sign)];
        for (row, &col) in perm.iter().enumerate() {
            factors.push(matrix[row][col].clone());
        }
        terms.push(Expr::product(factors));
    }
    Expr::sum(terms)
}

fn minor(matrix: &[Vec<Expr>], drop_row: usize, drop_col: usize) -> Expr {
    let submatrix: Vec<Vec<Expr>> = matrix
        .iter()
        .enumerate()
        .filter(|(row, _)| *row != drop_row)
        .map(|(_, row)| {
            row.iter()
                .enumerate()
                .filter(|(col, _)| *col != drop_col)
                .map(|(_, entry)| entry.clone())
                .collect()
        })
        .collect();
    determinant(&submatrix)
}

/// Symbolic cofactor inversion of a symmetric matrix. Returns the upper
/// triangle of the inverse and the determinant. The caller guards the
/// supported dimensions.
pub fn invert_metric(
    dimension: usize,
    component: impl Fn(usize, usize) -> Expr,
) -> (Vec<(Vec<usize>, Expr)>, Expr) {
    let matrix: Vec<Vec<Expr>> = (0..dimension)
        .map(|row| (0..dimension).map(|col| component(row, col)).collect())
        .collect();
    let det = determinant(&matrix);

    let mut entries = Vec::new();
    for row in 0..dimension {
        for col in row..dimension {
            let sign = if (row + col) % 2 == 0 { 1 } else { -1 };
            let entry = Expr::product(vec![
                Expr::Int(sign),
                minor(&matrix, col, row),
                Expr::pow(det.clone(), Expr::Int(-1)),
            ]);
            entries.push((vec![row, col], entry));
        }
    }
    (entries, det)
}
