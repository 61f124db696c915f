use std::collections::HashMap;

use crate::algebra::Expr;
use crate::error::{self, RicciErr, TensorErrKind};
use crate::span::Span;
use crate::tensor::{
    canonicalize, component_name, index_space, invert_metric, levi_civita, Symmetry, TensorDecl,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    /// Record recoverable errors and keep translating the next structure
    /// instead of aborting the sentence.
    pub continue_on_error: bool,
    /// Silence the warning normally raised when a tensor is redeclared.
    pub allow_redefinition: bool,
}

/// Everything produced by one [`crate::parse_latex`] call.
#[derive(Debug, Default)]
pub struct ParseOutput {
    /// Namespace entries touched by the sentence, in assignment order.
    pub names: Vec<String>,
    pub warnings: Vec<String>,
    /// Errors recorded instead of raised when `continue_on_error` is set.
    pub skipped: Vec<RicciErr>,
}

impl ParseOutput {
    pub fn merge(&mut self, other: ParseOutput) {
        self.names.extend(other.names);
        self.warnings.extend(other.warnings);
        self.skipped.extend(other.skipped);
    }
}

/// Mutable translation state: the component namespace, tensor declarations,
/// the coordinate basis and the session-wide dimension. Every translation
/// runs against an explicit session, so independent sessions never share
/// state.
#[derive(Debug, Default)]
pub struct Session {
    namespace: HashMap<String, Expr>,
    order: Vec<String>,
    declarations: HashMap<String, TensorDecl>,
    basis: Vec<String>,
    index_ranges: HashMap<String, (usize, usize)>,
    dimension: Option<usize>,
    pub options: SessionOptions,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SessionOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Insert a namespace entry, reporting whether an entry was overridden.
    pub fn insert(&mut self, name: impl ToString, expr: Expr) -> bool {
        let name = name.to_string();
        let overridden = self.namespace.insert(name.clone(), expr).is_some();
        if !overridden {
            self.order.push(name);
        }
        overridden
    }

    /// Look up a namespace entry. Non-canonical component names fall back to
    /// their canonical representative with the symmetry sign applied.
    pub fn get(&self, name: &str) -> Option<Expr> {
        if let Some(expr) = self.namespace.get(name) {
            return Some(expr.clone());
        }
        let digit_at = name.len() - name.bytes().rev().take_while(u8::is_ascii_digit).count();
        let (tensor_name, digits) = name.split_at(digit_at);
        let decl = self.declarations.get(tensor_name)?;
        if digits.len() != decl.rank || decl.rank == 0 {
            return None;
        }
        let indices: Vec<usize> = digits.bytes().map(|digit| (digit - b'0') as usize).collect();
        self.component(decl, &indices)
    }

    /// Canonicalized component read for a declared tensor.
    pub fn component(&self, decl: &TensorDecl, indices: &[usize]) -> Option<Expr> {
        let (sign, canonical) = canonicalize(&decl.symmetry, indices);
        if sign == 0 {
            return Some(Expr::Int(0));
        }
        let entry = self
            .namespace
            .get(&component_name(&decl.name, &canonical))?
            .clone();
        if sign < 0 {
            Some(-entry)
        } else {
            Some(entry)
        }
    }

    pub fn declaration(&self, name: &str) -> Option<&TensorDecl> {
        self.declarations.get(name)
    }

    pub fn basis(&self) -> &[String] {
        &self.basis
    }

    pub fn is_basis_symbol(&self, symbol: &str) -> bool {
        self.basis.iter().any(|known| known == symbol)
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Iteration range of an index label: an explicit `% define index` range
    /// when present, otherwise the session dimension.
    pub fn index_range(&self, label: &str) -> Option<(usize, usize)> {
        if let Some(&range) = self.index_ranges.get(label) {
            return Some(range);
        }
        self.dimension.map(|dimension| (0, dimension))
    }

    pub fn define_basis(&mut self, symbols: Vec<String>) -> error::Result<()> {
        for (i, symbol) in symbols.iter().enumerate() {
            if symbols[..i].contains(symbol) {
                return Err(RicciErr::tensor(
                    TensorErrKind::DuplicateBasisSymbol {
                        symbol: symbol.clone(),
                    },
                    None,
                ));
            }
        }
        if let Some(expected) = self.dimension {
            if symbols.len() != expected {
                return Err(RicciErr::tensor(
                    TensorErrKind::InconsistentDimension {
                        declared: symbols.len(),
                        expected,
                    },
                    None,
                ));
            }
        } else {
            self.dimension = Some(symbols.len());
        }
        for symbol in &symbols {
            self.insert(symbol, Expr::Symbol(symbol.clone()));
        }
        self.basis = symbols;
        Ok(())
    }

    pub fn define_index_range(&mut self, label: String, range: (usize, usize)) {
        self.index_ranges.insert(label, range);
    }

    /// Register a declaration and populate its canonical components.
    pub fn declare(
        &mut self,
        decl: TensorDecl,
        span: Option<Span>,
    ) -> error::Result<Vec<String>> {
        let mut warnings = Vec::new();

        if matches!(decl.symmetry, Symmetry::Metric | Symmetry::Kronecker) && decl.rank != 2 {
            return Err(RicciErr::tensor(
                TensorErrKind::InvalidRank {
                    name: decl.name.clone(),
                    rank: decl.rank,
                },
                span,
            ));
        }
        if let Symmetry::Pairs(pairs) = &decl.symmetry {
            if let Some(pair) = pairs
                .iter()
                .find(|pair| pair.first >= decl.rank || pair.second >= decl.rank)
            {
                return Err(RicciErr::tensor(
                    TensorErrKind::SymmetrySlotOutOfRange {
                        name: decl.name.clone(),
                        slot: pair.first.max(pair.second),
                    },
                    span,
                ));
            }
        }
        if decl.symmetry == Symmetry::Metric && !(2..=4).contains(&decl.dimension) {
            return Err(RicciErr::tensor(
                TensorErrKind::UnsupportedDimension {
                    name: decl.name.clone(),
                    dimension: decl.dimension,
                },
                span,
            ));
        }
        if decl.symmetry != Symmetry::Const {
            if let Some(expected) = self.dimension {
                if decl.dimension != expected {
                    return Err(RicciErr::tensor(
                        TensorErrKind::InconsistentDimension {
                            declared: decl.dimension,
                            expected,
                        },
                        span,
                    ));
                }
            } else {
                self.dimension = Some(decl.dimension);
            }
        }

        if self.declarations.contains_key(&decl.name) && !self.options.allow_redefinition {
            warnings.push(format!("redefinition of tensor `{}`", decl.name));
        }

        match &decl.symmetry {
            Symmetry::Const => {
                self.insert(&decl.name, Expr::Symbol(decl.name.clone()));
            }
            Symmetry::Kronecker => {
                for combo in index_space(&vec![(0, decl.dimension); decl.rank]) {
                    let value = if combo[0] == combo[1] { 1 } else { 0 };
                    self.insert(component_name(&decl.name, &combo), Expr::Int(value));
                }
            }
            Symmetry::Permutation => {
                for combo in index_space(&vec![(0, decl.dimension); decl.rank]) {
                    self.insert(
                        component_name(&decl.name, &combo),
                        Expr::Int(levi_civita(&combo)),
                    );
                }
            }
            Symmetry::Nosym | Symmetry::Pairs(_) | Symmetry::Metric => {
                for combo in index_space(&vec![(0, decl.dimension); decl.rank]) {
                    let (sign, canonical) = canonicalize(&decl.symmetry, &combo);
                    if canonical != combo {
                        continue;
                    }
                    let name = component_name(&decl.name, &combo);
                    let value = if sign == 0 {
                        Expr::Int(0)
                    } else {
                        Expr::Symbol(name.clone())
                    };
                    // keep a component that was assigned before declaration
                    if !self.namespace.contains_key(&name) {
                        self.insert(name, value);
                    }
                }
            }
        }

        let is_metric = decl.symmetry == Symmetry::Metric;
        let inverse_known = self
            .declarations
            .contains_key(&flip_structure(&decl.name, decl.rank));
        self.declarations.insert(decl.name.clone(), decl.clone());
        // a redeclaration (e.g. of a synthesized inverse) keeps the inverse
        // already in the namespace; `update` forces a recomputation
        if is_metric && !inverse_known {
            self.synthesize_inverse_metric(&decl);
        }
        Ok(warnings)
    }

    /// Re-register `name` after its components changed; a metric gets its
    /// inverse and determinant recomputed from the current component values.
    pub fn update(&mut self, name: &str, span: Option<Span>) -> error::Result<()> {
        let Some(decl) = self.declarations.get(name).cloned() else {
            return Err(RicciErr::tensor(
                TensorErrKind::UpdateUndefined {
                    name: String::from(name),
                },
                span,
            ));
        };
        if decl.symmetry == Symmetry::Metric {
            self.synthesize_inverse_metric(&decl);
        }
        Ok(())
    }

    // invert the declared metric, store the upper triangle of the inverse
    // and the determinant, and register the inverse declaration
    fn synthesize_inverse_metric(&mut self, decl: &TensorDecl) {
        let (entries, det) = invert_metric(decl.dimension, |row, col| {
            self.component(decl, &[row, col]).unwrap_or(Expr::Int(0))
        });

        let inverse_name = flip_structure(&decl.name, decl.rank);
        for (combo, entry) in entries {
            self.insert(component_name(&inverse_name, &combo), entry);
        }

        let det_name = format!("{}det", crate::tensor::base_name(&decl.name, decl.rank));
        let det = if decl.name.ends_with("UU") {
            Expr::pow(det, Expr::Int(-1))
        } else {
            det
        };
        self.insert(det_name, det);

        self.declarations.insert(
            inverse_name.clone(),
            TensorDecl {
                name: inverse_name,
                ..decl.clone()
            },
        );
    }

    /// Namespace entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Expr)> {
        self.order.iter().filter_map(|name| {
            self.namespace
                .get(name)
                .map(|expr| (name.as_str(), expr))
        })
    }
}

/// Swap the positional suffix of a structured name, `gDD` becoming `gUU`.
fn flip_structure(name: &str, rank: usize) -> String {
    let split = name.len() - rank;
    let mut out = String::from(&name[..split]);
    for marker in name[split..].chars() {
        out.push(if marker == 'U' { 'D' } else { 'U' });
    }
    out
}
