use std::collections::HashMap;

use super::{canonicalize, component_name, index_space, IdxRef, IndexPos, TensorDecl, Symmetry};
use crate::algebra::diff::diff;
use crate::algebra::Expr;
use crate::error::{self, RicciErr, TensorErrKind};
use crate::session::Session;
use crate::span::Span;

/// The left-hand side of a tensor equation: a structured name and its free
/// index slots.
#[derive(Debug, Clone, PartialEq)]
pub struct EquationLhs {
    pub name: String,
    pub indices: Vec<(IdxRef, IndexPos)>,
    pub span: Span,
}

/// A tensor equation expanded into components. `names` lists every component
/// the equation covers, including the ones a symmetry made redundant;
/// `entries` holds only the canonical components that were computed.
#[derive(Debug)]
pub struct ExpandedEquation {
    pub entries: Vec<(String, Expr)>,
    pub names: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Occurrence {
    upper: usize,
    lower: usize,
    span: Option<Span>,
}

fn bump(
    counts: &mut Vec<(String, Occurrence)>,
    label: &str,
    pos: IndexPos,
    span: Option<Span>,
) {
    let at = match counts.iter().position(|(other, _)| other == label) {
        Some(at) => at,
        None => {
            counts.push((String::from(label), Occurrence::default()));
            counts.len() - 1
        }
    };
    let occurrence = &mut counts[at].1;
    match pos {
        IndexPos::Upper => occurrence.upper += 1,
        IndexPos::Lower => occurrence.lower += 1,
    }
    if occurrence.span.is_none() {
        occurrence.span = span;
    }
}

fn first_atom_span(expr: &Expr) -> Option<Span> {
    match expr {
        Expr::Tensor(atom) => Some(atom.span),
        Expr::Add(items) | Expr::Mul(items) => items.iter().find_map(first_atom_span),
        Expr::Pow(base, exp) => first_atom_span(base).or_else(|| first_atom_span(exp)),
        Expr::Func(_, inner) => first_atom_span(inner),
        Expr::Deriv(inner, _) => first_atom_span(inner),
        _ => None,
    }
}

// A derivative subscript counts as a lower index unless it names a basis
// coordinate directly.
fn count_indices(expr: &Expr, session: &Session, counts: &mut Vec<(String, Occurrence)>) {
    match expr {
        Expr::Tensor(atom) => {
            for (index, pos) in &atom.indices {
                if let IdxRef::Label(label) = index {
                    bump(counts, label, *pos, Some(atom.span));
                }
            }
        }
        Expr::Deriv(inner, indices) => {
            count_indices(inner, session, counts);
            let span = first_atom_span(inner);
            for index in indices {
                if let IdxRef::Label(label) = index {
                    if !session.is_basis_symbol(label) {
                        bump(counts, label, IndexPos::Lower, span);
                    }
                }
            }
        }
        Expr::Add(items) | Expr::Mul(items) => {
            for item in items {
                count_indices(item, session, counts);
            }
        }
        Expr::Pow(base, exp) => {
            // like-base folding turns `w^{a} w^{a}` into a square; an integer
            // exponent counts as that many occurrences of the base
            let repeat = match exp.as_ref() {
                Expr::Int(int) if *int > 1 => *int as usize,
                _ => 1,
            };
            for _ in 0..repeat {
                count_indices(base, session, counts);
            }
            count_indices(exp, session, counts);
        }
        Expr::Func(_, inner) => count_indices(inner, session, counts),
        _ => {}
    }
}

// Check one term against the Einstein convention and return its bound
// labels, sorted for a deterministic summation order.
fn validate_term(
    counts: &[(String, Occurrence)],
    free: &[(String, IndexPos)],
    lhs_span: Span,
) -> error::Result<Vec<String>> {
    let mut bound = Vec::new();
    for (label, occurrence) in counts {
        let total = occurrence.upper + occurrence.lower;
        if let Some((_, pos)) = free.iter().find(|(other, _)| other == label) {
            let balanced = match pos {
                IndexPos::Upper => occurrence.upper == 1 && occurrence.lower == 0,
                IndexPos::Lower => occurrence.lower == 1 && occurrence.upper == 0,
            };
            if !balanced {
                return Err(RicciErr::tensor(
                    TensorErrKind::UnbalancedFreeIndex {
                        label: label.clone(),
                    },
                    occurrence.span,
                ));
            }
        } else if total == 1 {
            return Err(RicciErr::tensor(
                TensorErrKind::UnbalancedFreeIndex {
                    label: label.clone(),
                },
                occurrence.span,
            ));
        } else if total != 2 || occurrence.upper != 1 {
            return Err(RicciErr::tensor(
                TensorErrKind::IllegalBoundIndex {
                    label: label.clone(),
                },
                occurrence.span,
            ));
        } else {
            bound.push(label.clone());
        }
    }
    for (label, _) in free {
        if !counts.iter().any(|(other, _)| other == label) {
            return Err(RicciErr::tensor(
                TensorErrKind::UnbalancedFreeIndex {
                    label: label.clone(),
                },
                Some(lhs_span),
            ));
        }
    }
    bound.sort();
    Ok(bound)
}

fn basis_coordinate(session: &Session, position: usize) -> error::Result<String> {
    session
        .basis()
        .get(position)
        .cloned()
        .ok_or_else(|| RicciErr::tensor(TensorErrKind::MissingBasis, None))
}

// Instantiate every atom of a fully bound term with concrete indices.
fn resolve(
    session: &Session,
    expr: &Expr,
    binding: &HashMap<String, usize>,
) -> error::Result<Expr> {
    match expr {
        Expr::Tensor(atom) => {
            let mut indices = Vec::with_capacity(atom.indices.len());
            for (index, _) in &atom.indices {
                let value = match index {
                    IdxRef::Num(num) => *num,
                    IdxRef::Label(label) => {
                        *binding.get(label).ok_or_else(|| {
                            RicciErr::tensor(
                                TensorErrKind::UnbalancedFreeIndex {
                                    label: label.clone(),
                                },
                                Some(atom.span),
                            )
                        })?
                    }
                };
                indices.push(value);
            }
            let entry = match session.declaration(&atom.name) {
                Some(decl) => session.component(decl, &indices),
                None => session.get(&component_name(&atom.name, &indices)),
            };
            entry.ok_or_else(|| {
                RicciErr::tensor(
                    TensorErrKind::UndefinedTensor {
                        name: atom.name.clone(),
                    },
                    Some(atom.span),
                )
            })
        }
        Expr::Deriv(inner, indices) => {
            let mut value = resolve(session, inner, binding)?;
            for index in indices {
                let coordinate = match index {
                    IdxRef::Num(num) => basis_coordinate(session, *num)?,
                    IdxRef::Label(label) => {
                        if session.is_basis_symbol(label) {
                            label.clone()
                        } else {
                            let position = binding.get(label).copied().ok_or_else(|| {
                                RicciErr::tensor(TensorErrKind::MissingBasis, None)
                            })?;
                            basis_coordinate(session, position)?
                        }
                    }
                };
                value = diff(&value, &coordinate);
            }
            Ok(value)
        }
        Expr::Add(items) => {
            let resolved: error::Result<Vec<Expr>> = items
                .iter()
                .map(|item| resolve(session, item, binding))
                .collect();
            Ok(Expr::sum(resolved?))
        }
        Expr::Mul(items) => {
            let resolved: error::Result<Vec<Expr>> = items
                .iter()
                .map(|item| resolve(session, item, binding))
                .collect();
            Ok(Expr::product(resolved?))
        }
        Expr::Pow(base, exp) => Ok(Expr::pow(
            resolve(session, base, binding)?,
            resolve(session, exp, binding)?,
        )),
        Expr::Func(func, inner) => Ok(Expr::Func(
            *func,
            Box::new(resolve(session, inner, binding)?),
        )),
        leaf => Ok(leaf.clone()),
    }
}

/// Whether an expression carries any indexed structure: an indexed atom or a
/// derivative taken along an index label rather than a coordinate.
pub fn has_indices(expr: &Expr, session: &Session) -> bool {
    match expr {
        Expr::Tensor(atom) => !atom.indices.is_empty(),
        Expr::Deriv(inner, indices) => {
            has_indices(inner, session)
                || indices.iter().any(|index| match index {
                    IdxRef::Label(label) => !session.is_basis_symbol(label),
                    IdxRef::Num(_) => false,
                })
        }
        Expr::Add(items) | Expr::Mul(items) => {
            items.iter().any(|item| has_indices(item, session))
        }
        Expr::Pow(base, exp) => has_indices(base, session) || has_indices(exp, session),
        Expr::Func(_, inner) => has_indices(inner, session),
        _ => false,
    }
}

/// Resolve a purely scalar expression: derivative nodes turn into symbolic
/// derivatives along the named coordinates.
pub fn resolve_scalar(session: &Session, expr: &Expr) -> error::Result<Expr> {
    match expr {
        Expr::Deriv(inner, indices) => {
            let mut value = resolve_scalar(session, inner)?;
            for index in indices {
                let coordinate = match index {
                    IdxRef::Num(num) => basis_coordinate(session, *num)?,
                    IdxRef::Label(label) if session.is_basis_symbol(label) => label.clone(),
                    IdxRef::Label(_) => {
                        return Err(RicciErr::tensor(TensorErrKind::MissingBasis, None));
                    }
                };
                value = diff(&value, &coordinate);
            }
            Ok(value)
        }
        Expr::Add(items) => {
            let resolved: error::Result<Vec<Expr>> =
                items.iter().map(|item| resolve_scalar(session, item)).collect();
            Ok(Expr::sum(resolved?))
        }
        Expr::Mul(items) => {
            let resolved: error::Result<Vec<Expr>> =
                items.iter().map(|item| resolve_scalar(session, item)).collect();
            Ok(Expr::product(resolved?))
        }
        Expr::Pow(base, exp) => Ok(Expr::pow(
            resolve_scalar(session, base)?,
            resolve_scalar(session, exp)?,
        )),
        Expr::Func(func, inner) => Ok(Expr::Func(
            *func,
            Box::new(resolve_scalar(session, inner)?),
        )),
        leaf => Ok(leaf.clone()),
    }
}

fn missing_dimension(lhs: &EquationLhs) -> RicciErr {
    RicciErr::tensor(
        TensorErrKind::MissingDimension {
            name: lhs.name.clone(),
        },
        Some(lhs.span),
    )
}

// Sum one term over its bound labels under a fixed free-index binding.
fn resolve_term(
    session: &Session,
    lhs: &EquationLhs,
    term: &Expr,
    binding: &HashMap<String, usize>,
    bound: &[String],
) -> error::Result<Expr> {
    let mut ranges = Vec::with_capacity(bound.len());
    for label in bound {
        ranges.push(
            session
                .index_range(label)
                .ok_or_else(|| missing_dimension(lhs))?,
        );
    }
    let mut total = Vec::new();
    for combo in index_space(&ranges) {
        let mut full = binding.clone();
        for (label, value) in bound.iter().zip(combo) {
            full.insert(label.clone(), value);
        }
        total.push(resolve(session, term, &full)?);
    }
    Ok(Expr::sum(total))
}

/// Expand a tensor equation into components, enforce the Einstein summation
/// convention on every term and write the results into the session.
pub fn expand_equation(
    session: &mut Session,
    lhs: &EquationLhs,
    rhs: &Expr,
) -> error::Result<ExpandedEquation> {
    let rhs = rhs.expand();
    let terms = rhs.as_terms();

    let free: Vec<(String, IndexPos)> = lhs
        .indices
        .iter()
        .filter_map(|(index, pos)| match index {
            IdxRef::Label(label) => Some((label.clone(), *pos)),
            IdxRef::Num(_) => None,
        })
        .collect();

    let mut term_bounds = Vec::with_capacity(terms.len());
    for term in &terms {
        let mut counts = Vec::new();
        count_indices(term, session, &mut counts);
        term_bounds.push(validate_term(&counts, &free, lhs.span)?);
    }

    let mut slot_ranges = Vec::with_capacity(lhs.indices.len());
    for (index, _) in &lhs.indices {
        let range = match index {
            IdxRef::Num(num) => (*num, *num + 1),
            IdxRef::Label(label) => session
                .index_range(label)
                .ok_or_else(|| missing_dimension(lhs))?,
        };
        slot_ranges.push(range);
    }

    let mut warnings = Vec::new();
    let rank = lhs.indices.len();
    if rank > 0 && session.declaration(&lhs.name).is_none() {
        let dimension = session.dimension().ok_or_else(|| missing_dimension(lhs))?;
        let decl = TensorDecl {
            name: lhs.name.clone(),
            rank,
            dimension,
            symmetry: Symmetry::Nosym,
        };
        warnings.extend(session.declare(decl, Some(lhs.span))?);
    }

    let decl = session.declaration(&lhs.name).cloned();
    let mut entries = Vec::new();
    let mut names = Vec::new();
    for combo in index_space(&slot_ranges) {
        let name = component_name(&lhs.name, &combo);
        names.push(name.clone());
        if let Some(decl) = &decl {
            let (_, canonical) = canonicalize(&decl.symmetry, &combo);
            if canonical != combo {
                continue;
            }
        }
        let mut binding = HashMap::new();
        for ((index, _), value) in lhs.indices.iter().zip(&combo) {
            if let IdxRef::Label(label) = index {
                binding.insert(label.clone(), *value);
            }
        }
        let mut total = Vec::with_capacity(terms.len());
        for (term, bound) in terms.iter().zip(&term_bounds) {
            total.push(resolve_term(session, lhs, term, &binding, bound)?);
        }
        entries.push((name, Expr::sum(total)));
    }

    for (name, expr) in &entries {
        session.insert(name, expr.clone());
    }
    Ok(ExpandedEquation {
        entries,
        names,
        warnings,
    })
}
