use super::derived::{covdrv_name, diacritic_of, generate_christoffel, generate_covdrv};
use super::{
    base_name, canonicalize, component_name, index_space, invert_metric, levi_civita, IdxRef,
    IndexPos, Parity, SymPair, Symmetry, TensorAtom, TensorDecl,
};
use crate::algebra::Expr;
use crate::session::Session;
use crate::span::Span;

fn atom(name: &str, indices: Vec<(IdxRef, IndexPos)>) -> TensorAtom {
    TensorAtom {
        name: String::from(name),
        indices,
        span: Span::default(),
    }
}

fn label(text: &str, pos: IndexPos) -> (IdxRef, IndexPos) {
    (IdxRef::Label(String::from(text)), pos)
}

#[test]
fn symmetry_parsing() {
    assert_eq!(Symmetry::parse("metric"), Symmetry::Metric);
    assert_eq!(Symmetry::parse("nosym"), Symmetry::Nosym);
    assert_eq!(
        Symmetry::parse("sym01_anti23"),
        Symmetry::Pairs(vec![
            SymPair {
                first: 0,
                second: 1,
                parity: Parity::Sym,
            },
            SymPair {
                first: 2,
                second: 3,
                parity: Parity::Anti,
            },
        ])
    );
}

#[test]
fn canonicalize_symmetric_pair() {
    assert_eq!(canonicalize(&Symmetry::Metric, &[1, 0]), (1, vec![0, 1]));
    assert_eq!(canonicalize(&Symmetry::Metric, &[0, 1]), (1, vec![0, 1]));
}

#[test]
fn canonicalize_antisymmetric_pair() {
    let anti = Symmetry::parse("anti01");
    assert_eq!(canonicalize(&anti, &[1, 0]), (-1, vec![0, 1]));
    assert_eq!(canonicalize(&anti, &[0, 0]).0, 0);
}

#[test]
fn canonicalize_chained_pairs() {
    let chained = Symmetry::parse("sym01_anti23");
    assert_eq!(
        canonicalize(&chained, &[1, 0, 3, 2]),
        (-1, vec![0, 1, 2, 3])
    );
}

#[test]
fn levi_civita_signs() {
    assert_eq!(levi_civita(&[0, 1, 2]), 1);
    assert_eq!(levi_civita(&[0, 2, 1]), -1);
    assert_eq!(levi_civita(&[1, 2, 0]), 1);
    assert_eq!(levi_civita(&[0, 0, 1]), 0);
}

#[test]
fn index_space_is_row_major() {
    assert_eq!(
        index_space(&[(0, 2), (0, 2)]),
        vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]
    );
    assert_eq!(index_space(&[]), vec![Vec::<usize>::new()]);
}

#[test]
fn structured_names() {
    assert_eq!(component_name("hUD", &[0, 1]), "hUD01");
    assert_eq!(base_name("GammaUDD", 3), "Gamma");
    assert_eq!(base_name("v", 0), "v");
}

#[test]
fn invert_diagonal_metric() {
    let x = Expr::symbol("x");
    let xx = Expr::pow(x.clone(), Expr::Int(2));
    let (entries, det) = invert_metric(2, |row, col| {
        if row == 0 && col == 0 {
            Expr::Int(1)
        } else if row == 1 && col == 1 {
            xx.clone()
        } else {
            Expr::Int(0)
        }
    });
    assert_eq!(det, xx);
    assert_eq!(
        entries,
        vec![
            (vec![0, 0], Expr::Int(1)),
            (vec![0, 1], Expr::Int(0)),
            (vec![1, 1], Expr::pow(x, Expr::Int(-2))),
        ]
    );
}

#[test]
fn diacritic_suffixes() {
    assert_eq!(diacritic_of("Gammahat"), Some("hat"));
    assert_eq!(diacritic_of("gbar"), Some("bar"));
    assert_eq!(diacritic_of("Gamma"), None);
    assert_eq!(diacritic_of("hat"), None);
}

#[test]
fn covdrv_names() {
    let lower = [label("a", IndexPos::Lower)];
    assert_eq!(covdrv_name("vU", &lower, ""), "vU_cdD");
    assert_eq!(covdrv_name("vU", &lower, "hat"), "vU_cdhatD");
    assert_eq!(covdrv_name("vU_cdD", &lower, ""), "vU_cdDD");
}

#[test]
fn christoffel_generation() {
    let gamma = atom(
        "GammaUDD",
        vec![
            label("a", IndexPos::Upper),
            label("b", IndexPos::Lower),
            label("c", IndexPos::Lower),
        ],
    );
    assert_eq!(
        generate_christoffel(&gamma),
        r"\Gamma^{a}_{b c} = \frac{1}{2} g^{a d} (\partial_{b} g_{c d} + \partial_{c} g_{d b} - \partial_{d} g_{b c})"
    );
}

#[test]
fn covdrv_generation() {
    let vector = atom("vU", vec![label("a", IndexPos::Upper)]);
    let deriv = [label("b", IndexPos::Lower)];
    assert_eq!(
        generate_covdrv(&vector, &deriv, ""),
        r"\nabla_{b} v^{a} = \partial_{b} (v^{a}) + \Gamma^{a}_{c b} (v^{c})"
    );
}

#[test]
fn canonical_component_reads() {
    let mut session = Session::new();
    session
        .declare(
            TensorDecl {
                name: String::from("FDD"),
                rank: 2,
                dimension: 2,
                symmetry: Symmetry::parse("anti01"),
            },
            None,
        )
        .unwrap();
    assert_eq!(session.get("FDD00"), Some(Expr::Int(0)));
    assert_eq!(session.get("FDD01"), Some(Expr::symbol("FDD01")));
    assert_eq!(session.get("FDD10"), Some(-Expr::symbol("FDD01")));
}
