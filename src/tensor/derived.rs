use super::{base_name, IdxRef, IndexPos, TensorAtom};

const DIACRITICS: [&str; 3] = ["bar", "hat", "tilde"];

/// Diacritic suffix carried by a structured base name, if any.
pub fn diacritic_of(base: &str) -> Option<&'static str> {
    DIACRITICS
        .iter()
        .find(|suffix| base.ends_with(*suffix) && base.len() > suffix.len())
        .copied()
}

/// LaTeX rendition of an index label: multi-character labels are Greek
/// commands.
pub fn latex_label(label: &str) -> String {
    if label.len() > 1 {
        format!("\\{label}")
    } else {
        String::from(label)
    }
}

/// LaTeX rendition of a structured base name, reattaching the diacritic,
/// `Gammahat` becoming `\hat{\Gamma}`.
pub fn base_to_latex(base: &str) -> String {
    if let Some(diacritic) = diacritic_of(base) {
        let inner = &base[..base.len() - diacritic.len()];
        format!("\\{diacritic}{{{}}}", latex_label(inner))
    } else {
        latex_label(base)
    }
}

/// Name of the inverse metric paired with `diacritic`, `ghatUU` for `hat`.
pub fn metric_name(diacritic: &str) -> String {
    format!("g{diacritic}UU")
}

fn metric_latex(diacritic: &str) -> String {
    if diacritic.is_empty() {
        String::from("g")
    } else {
        format!("\\{diacritic}{{g}}")
    }
}

fn atom_latex(base: &str, indices: &[(String, IndexPos)]) -> String {
    let mut out = base_to_latex(base);
    for (label, pos) in indices {
        let marker = match pos {
            IndexPos::Upper => '^',
            IndexPos::Lower => '_',
        };
        out.push(marker);
        out.push_str(&format!("{{{}}}", latex_label(label)));
    }
    out
}

fn fresh_label(used: &[String]) -> String {
    ('a'..='z')
        .map(String::from)
        .find(|candidate| !used.contains(candidate))
        .unwrap_or_else(|| String::from("z"))
}

fn label_of(index: &IdxRef) -> String {
    index.to_string()
}

/// Generate the defining equation of a Christoffel symbol from its metric,
/// ready to be fed back through the parser. `atom` is the rank-three
/// occurrence that triggered the synthesis.
pub fn generate_christoffel(atom: &TensorAtom) -> String {
    let base = base_name(&atom.name, atom.indices.len());
    let diacritic = diacritic_of(base).unwrap_or("");
    let symbol = base_to_latex(base);
    let metric = metric_latex(diacritic);

    let labels: Vec<String> = atom.indices.iter().map(|(index, _)| label_of(index)).collect();
    let bound = fresh_label(&labels);
    let (i1, i2, i3) = (
        latex_label(&labels[0]),
        latex_label(&labels[1]),
        latex_label(&labels[2]),
    );

    format!(
        "{symbol}^{{{i1}}}_{{{i2} {i3}}} = \\frac{{1}}{{2}} {metric}^{{{i1} {bound}}} \
         (\\partial_{{{i2}}} {metric}_{{{i3} {bound}}} \
         + \\partial_{{{i3}}} {metric}_{{{bound} {i2}}} \
         - \\partial_{{{bound}}} {metric}_{{{i2} {i3}}})"
    )
}

/// Structured name of a covariant derivative: the base name with `_cd`, the
/// diacritic and one positional letter per derivative index appended.
pub fn covdrv_name(name: &str, deriv: &[(IdxRef, IndexPos)], diacritic: &str) -> String {
    let mut out = String::from(name);
    if !name.contains("_cd") {
        out.push_str("_cd");
        out.push_str(diacritic);
    }
    for (_, pos) in deriv {
        out.push(pos.suffix());
    }
    out
}

/// Defining equation for a covariant derivative occurrence. An upper
/// derivative index is first lowered through the inverse metric; the
/// all-lower form expands into partial derivatives and Christoffel
/// corrections.
pub fn covdrv_equation(
    atom: &TensorAtom,
    deriv: &[(IdxRef, IndexPos)],
    diacritic: &str,
) -> String {
    if deriv.iter().all(|(_, pos)| *pos == IndexPos::Lower) {
        return generate_covdrv(atom, deriv, diacritic);
    }

    let mut used: Vec<String> = atom
        .indices
        .iter()
        .chain(deriv.iter())
        .map(|(index, _)| label_of(index))
        .collect();
    let nabla = if diacritic.is_empty() {
        String::from("\\nabla")
    } else {
        format!("\\{diacritic}{{\\nabla}}")
    };

    let mut lhs = String::new();
    let mut contraction = String::new();
    let mut lowered = String::new();
    for (index, pos) in deriv {
        let label = latex_label(&label_of(index));
        match pos {
            IndexPos::Upper => {
                let bound = fresh_label(&used);
                used.push(bound.clone());
                contraction.push_str(&format!(
                    "{}^{{{label} {bound}}} ",
                    metric_latex(diacritic)
                ));
                lhs.push_str(&format!("{nabla}^{{{label}}} "));
                lowered.push_str(&format!("{nabla}_{{{bound}}} "));
            }
            IndexPos::Lower => {
                lhs.push_str(&format!("{nabla}_{{{label}}} "));
                lowered.push_str(&format!("{nabla}_{{{label}}} "));
            }
        }
    }

    let indices: Vec<(String, IndexPos)> = atom
        .indices
        .iter()
        .map(|(index, pos)| (label_of(index), *pos))
        .collect();
    let atom_text = atom_latex(base_name(&atom.name, atom.indices.len()), &indices);
    format!("{lhs}{atom_text} = {contraction}{lowered}{atom_text}")
}

/// Generate the defining equation of a covariant derivative, ready to be fed
/// back through the parser. Index labels shared between the tensor and the
/// derivative are renamed so that the generated left-hand side stays free.
pub fn generate_covdrv(
    atom: &TensorAtom,
    deriv: &[(IdxRef, IndexPos)],
    diacritic: &str,
) -> String {
    let rank = atom.indices.len();
    let mut indexing: Vec<String> = atom
        .indices
        .iter()
        .chain(deriv.iter())
        .map(|(index, _)| label_of(index))
        .collect();
    for i in 0..indexing.len() {
        if indexing[..i].contains(&indexing[i]) {
            indexing[i] = fresh_label(&indexing);
        }
    }

    let nabla = if diacritic.is_empty() {
        String::from("\\nabla")
    } else {
        format!("\\{diacritic}{{\\nabla}}")
    };
    let mut lhs = String::new();
    for label in &indexing[rank..] {
        lhs.push_str(&format!("{nabla}_{{{}}} ", latex_label(label)));
    }
    let positions: Vec<IndexPos> = atom.indices.iter().map(|(_, pos)| *pos).collect();
    let lhs_indices: Vec<(String, IndexPos)> = indexing[..rank]
        .iter()
        .cloned()
        .zip(positions.iter().copied())
        .collect();
    lhs.push_str(&atom_latex(
        base_name(&atom.name, rank),
        &lhs_indices,
    ));

    let rhs = covdrv_rhs(
        base_name(&atom.name, rank),
        &positions,
        deriv.len(),
        &indexing,
        diacritic,
    );
    format!("{lhs} = {rhs}")
}

// One level of the Leibniz expansion: the partial derivative term plus a
// Christoffel correction per tensor slot.
fn covdrv_rhs(
    base: &str,
    positions: &[IndexPos],
    order: usize,
    indexing: &[String],
    diacritic: &str,
) -> String {
    if order == 0 {
        let indices: Vec<(String, IndexPos)> = indexing[..positions.len()]
            .iter()
            .cloned()
            .zip(positions.iter().copied())
            .collect();
        return atom_latex(base, &indices);
    }

    let diff_label = latex_label(&indexing[indexing.len() - order]);
    let gamma = if diacritic.is_empty() {
        String::from("\\Gamma")
    } else {
        format!("\\{diacritic}{{\\Gamma}}")
    };

    let inner = covdrv_rhs(base, positions, order - 1, indexing, diacritic);
    let mut rhs = format!("\\partial_{{{diff_label}}} ({inner})");
    for (slot, pos) in positions.iter().enumerate() {
        let bound = fresh_label(indexing);
        let mut renamed = indexing.to_vec();
        renamed[slot] = bound.clone();
        let inner = covdrv_rhs(base, positions, order - 1, &renamed, diacritic);
        let label = latex_label(&indexing[slot]);
        match pos {
            IndexPos::Upper => {
                rhs.push_str(&format!(
                    " + {gamma}^{{{label}}}_{{{bound} {diff_label}}} ({inner})"
                ));
            }
            IndexPos::Lower => {
                rhs.push_str(&format!(
                    " - {gamma}^{{{bound}}}_{{{label} {diff_label}}} ({inner})"
                ));
            }
        }
    }
    rhs
}
