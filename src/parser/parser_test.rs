use super::{parse_expr, parse_latex};
use crate::algebra::{Expr, MathFn};
use crate::error::{ParseErrKind, RicciErrKind, TensorErrKind};
use crate::lexer::token::TokenKind;
use crate::session::{Session, SessionOptions};
use crate::span::Span;

macro_rules! translate {
    ($session:expr, $sentence:expr) => {
        parse_latex($session, $sentence).expect("translation failed")
    };
}

macro_rules! expr {
    ($session:expr, $sentence:expr) => {
        parse_expr($session, $sentence).expect("translation failed")
    };
}

fn entry(session: &Session, name: &str) -> Expr {
    session
        .get(name)
        .unwrap_or_else(|| panic!("missing namespace entry `{name}`"))
}

fn polar_session() -> Session {
    let mut session = Session::new();
    translate!(
        &mut session,
        r"% define basis [r, \theta];
          % define metric gDD (2);
          g_{0 0} = 1;
          g_{0 1} = 0;
          g_{1 1} = r^{{2}};
          % update metric gDD"
    );
    session
}

#[test]
fn scalar_expression() {
    let mut session = Session::new();
    let expr = expr!(&mut session, "2 x + y^{{2}}");
    let expected =
        Expr::Int(2) * Expr::symbol("x") + Expr::pow(Expr::symbol("y"), Expr::Int(2));
    assert_eq!(expr, expected);
}

#[test]
fn fraction_and_sqrt() {
    let mut session = Session::new();
    let expr = expr!(&mut session, r"\frac{1}{2} \sqrt{x}");
    let expected =
        Expr::rational(1, 2) * Expr::pow(Expr::symbol("x"), Expr::rational(1, 2));
    assert_eq!(expr, expected);
}

#[test]
fn trigonometry_and_inverses() {
    let mut session = Session::new();
    let expr = expr!(&mut session, r"\cos^2 \theta");
    let cos = Expr::Func(MathFn::Cos, Box::new(Expr::symbol("theta")));
    assert_eq!(expr, Expr::pow(cos, Expr::Int(2)));

    let expr = expr!(&mut session, r"\sin^{-1}(x)");
    assert_eq!(expr, Expr::Func(MathFn::Asin, Box::new(Expr::symbol("x"))));
}

#[test]
fn logarithms() {
    let mut session = Session::new();
    let expr = expr!(&mut session, r"\ln x");
    assert_eq!(expr, Expr::Func(MathFn::Ln, Box::new(Expr::symbol("x"))));

    let expr = expr!(&mut session, r"\log_2 x");
    assert_eq!(expr, Expr::Func(MathFn::Log(2), Box::new(Expr::symbol("x"))));
}

#[test]
fn euler_exponentiation() {
    let mut session = Session::new();
    assert_eq!(expr!(&mut session, "e"), Expr::E);
    assert_eq!(
        expr!(&mut session, "e^x"),
        Expr::Func(MathFn::Exp, Box::new(Expr::symbol("x")))
    );
}

#[test]
fn metric_inversion_polar() {
    let session = polar_session();
    let r = Expr::symbol("r");
    assert_eq!(entry(&session, "gUU00"), Expr::Int(1));
    assert_eq!(entry(&session, "gUU01"), Expr::Int(0));
    assert_eq!(entry(&session, "gUU11"), Expr::pow(r.clone(), Expr::Int(-2)));
    assert_eq!(entry(&session, "gdet"), Expr::pow(r, Expr::Int(2)));
}

#[test]
fn christoffel_from_polar_metric() {
    let mut session = polar_session();
    translate!(&mut session, r"v = \Gamma^{0}_{1 1}");
    assert_eq!(entry(&session, "v"), -Expr::symbol("r"));

    // the first reference synthesized every component, not just one
    translate!(&mut session, r"w = \Gamma^{1}_{0 1}");
    assert_eq!(
        entry(&session, "w"),
        Expr::pow(Expr::symbol("r"), Expr::Int(-1))
    );
}

#[test]
fn trace_contraction() {
    let mut session = Session::new();
    translate!(
        &mut session,
        r"% define nosym hUD (4);
          h = h^{\mu}{}_{\mu}"
    );
    let expected = Expr::sum(vec![
        Expr::symbol("hUD00"),
        Expr::symbol("hUD11"),
        Expr::symbol("hUD22"),
        Expr::symbol("hUD33"),
    ]);
    assert_eq!(entry(&session, "h"), expected);
}

#[test]
fn raise_index_through_metric() {
    let mut session = Session::new();
    translate!(
        &mut session,
        r"% define basis [x, y];
          % define metric gDD (2);
          g_{0 0} = 1;
          g_{0 1} = 0;
          g_{1 1} = 1;
          % update metric gDD;
          % define nosym wD (2);
          v^{a} = g^{a b} w_{b}"
    );
    assert_eq!(entry(&session, "vU0"), Expr::symbol("wD0"));
    assert_eq!(entry(&session, "vU1"), Expr::symbol("wD1"));
}

#[test]
fn covariant_divergence_flat() {
    let mut session = Session::new();
    translate!(
        &mut session,
        r"% define basis [x, y];
          % define metric gDD (2);
          g_{0 0} = 1;
          g_{0 1} = 0;
          g_{1 1} = 1;
          % update metric gDD;
          v^{0} = x;
          v^{1} = y;
          T = \nabla_{a} v^{a}"
    );
    assert_eq!(entry(&session, "T"), Expr::Int(2));
}

#[test]
fn kronecker_and_permutation() {
    let mut session = Session::new();
    translate!(
        &mut session,
        "% define kronecker deltaUD (3), permutation epsilonDDD (3)"
    );
    assert_eq!(entry(&session, "deltaUD00"), Expr::Int(1));
    assert_eq!(entry(&session, "deltaUD01"), Expr::Int(0));
    assert_eq!(entry(&session, "epsilonDDD012"), Expr::Int(1));
    assert_eq!(entry(&session, "epsilonDDD021"), Expr::Int(-1));
    assert_eq!(entry(&session, "epsilonDDD001"), Expr::Int(0));
}

#[test]
fn compound_power_expression() {
    let mut session = Session::new();
    let expr = expr!(&mut session, "(1 + x/n)^n");
    let n = Expr::symbol("n");
    let base = Expr::Int(1) + Expr::symbol("x") * Expr::pow(n.clone(), Expr::Int(-1));
    assert_eq!(expr, Expr::pow(base, n));
}

#[test]
fn sqrt_root_must_be_integer() {
    let mut session = Session::new();
    let err = parse_expr(&mut session, r"\sqrt[0.5]{2}").unwrap_err();
    assert_eq!(
        err.kind,
        RicciErrKind::ParseErr(ParseErrKind::ExpectedToken {
            expected: TokenKind::Integer,
            got: TokenKind::Decimal,
        })
    );
    assert_eq!(err.span, Some(Span::new(6, 9)));
}

#[test]
fn inline_parse_directive() {
    let mut session = Session::new();
    translate!(&mut session, "% parse k = 2");
    assert_eq!(entry(&session, "k"), Expr::Int(2));
}

#[test]
fn unsupported_command_span() {
    let mut session = Session::new();
    let err = parse_expr(&mut session, r"x + \badcmd").unwrap_err();
    assert_eq!(
        err.kind,
        RicciErrKind::ParseErr(ParseErrKind::UnsupportedCommand {
            command: String::from(r"\badcmd"),
        })
    );
    assert_eq!(err.span, Some(Span::new(4, 11)));
}

#[test]
fn continue_on_error_skips_structure() {
    let mut session = Session::with_options(SessionOptions {
        continue_on_error: true,
        allow_redefinition: false,
    });
    let out = translate!(&mut session, "x = ; y = 2");
    assert_eq!(out.skipped.len(), 1);
    assert!(out.names.contains(&String::from("y")));
    assert_eq!(entry(&session, "y"), Expr::Int(2));
}

#[test]
fn unbalanced_free_index() {
    let mut session = Session::new();
    translate!(&mut session, "% define nosym wDD (2)");
    let err = parse_latex(&mut session, "v_{a} = w_{a b}").unwrap_err();
    assert_eq!(
        err.kind,
        RicciErrKind::TensorErr(TensorErrKind::UnbalancedFreeIndex {
            label: String::from("b"),
        })
    );
}

#[test]
fn illegal_bound_index() {
    let mut session = Session::new();
    translate!(&mut session, "% define nosym wD (2)");
    let err = parse_latex(&mut session, "u = w_{a} w_{a}").unwrap_err();
    assert_eq!(
        err.kind,
        RicciErrKind::TensorErr(TensorErrKind::IllegalBoundIndex {
            label: String::from("a"),
        })
    );

    // like-base folding must not hide the triple occurrence
    translate!(&mut session, "% define nosym wU (2)");
    let err = parse_latex(&mut session, "u = w^{a} w^{a} w^{a}").unwrap_err();
    assert_eq!(
        err.kind,
        RicciErrKind::TensorErr(TensorErrKind::IllegalBoundIndex {
            label: String::from("a"),
        })
    );
}

#[test]
fn alignment_environment() {
    let mut session = Session::new();
    let out = translate!(
        &mut session,
        r"\begin{align}
              x &= 2 \\
              y &= x + 1
          \end{align}"
    );
    assert_eq!(out.names, vec![String::from("x"), String::from("y")]);
    assert_eq!(entry(&session, "x"), Expr::Int(2));
    assert_eq!(entry(&session, "y"), Expr::Int(1) + Expr::symbol("x"));
}

#[test]
fn redefinition_warning() {
    let mut session = Session::new();
    let out = translate!(
        &mut session,
        "% define nosym vU (2); % define nosym vU (2)"
    );
    assert_eq!(out.warnings.len(), 1);
    assert!(out.warnings[0].contains("redefinition"));

    let mut relaxed = Session::with_options(SessionOptions {
        continue_on_error: false,
        allow_redefinition: true,
    });
    let out = translate!(
        &mut relaxed,
        "% define nosym vU (2); % define nosym vU (2)"
    );
    assert!(out.warnings.is_empty());
}

#[test]
fn update_requires_declaration() {
    let mut session = Session::new();
    let err = parse_latex(&mut session, "% update metric gDD").unwrap_err();
    assert_eq!(
        err.kind,
        RicciErrKind::TensorErr(TensorErrKind::UpdateUndefined {
            name: String::from("gDD"),
        })
    );
}

#[test]
fn duplicate_basis_symbol() {
    let mut session = Session::new();
    let err = parse_latex(&mut session, "% define basis [x, x]").unwrap_err();
    assert_eq!(
        err.kind,
        RicciErrKind::TensorErr(TensorErrKind::DuplicateBasisSymbol {
            symbol: String::from("x"),
        })
    );
}

#[test]
fn dimension_only_omittable_for_constant() {
    let mut session = Session::new();
    let err = parse_latex(&mut session, "% define nosym vU").unwrap_err();
    assert_eq!(
        err.kind,
        RicciErrKind::TensorErr(TensorErrKind::DimensionOmitted {
            name: String::from("vU"),
        })
    );

    translate!(&mut session, "% define const G");
    assert_eq!(entry(&session, "G"), Expr::symbol("G"));
}

#[test]
fn comma_derivative_expansion() {
    let mut session = Session::new();
    translate!(
        &mut session,
        r"% define basis [x, y];
          v_{0} = x^{{2}};
          v_{1} = x y;
          T_{a b} = v_{a , b}"
    );
    assert_eq!(entry(&session, "TDD00"), Expr::Int(2) * Expr::symbol("x"));
    assert_eq!(entry(&session, "TDD01"), Expr::Int(0));
    assert_eq!(entry(&session, "TDD10"), Expr::symbol("y"));
    assert_eq!(entry(&session, "TDD11"), Expr::symbol("x"));
}

#[test]
fn index_range_restricts_expansion() {
    let mut session = Session::new();
    let out = translate!(
        &mut session,
        r"% define basis [t, x, y];
          % define index i = 1 : 2;
          % define nosym vD (3);
          w_{i} = v_{i}"
    );
    assert_eq!(out.names, vec![String::from("wD1"), String::from("wD2")]);
    assert_eq!(entry(&session, "wD1"), Expr::symbol("vD1"));
    assert_eq!(entry(&session, "wD2"), Expr::symbol("vD2"));
    // the component outside the range keeps its placeholder
    assert_eq!(entry(&session, "wD0"), Expr::symbol("wD0"));
}

#[test]
fn symmetry_slot_must_fit_rank() {
    let mut session = Session::new();
    let err = parse_latex(&mut session, "% define sym12 hDD (2)").unwrap_err();
    assert_eq!(
        err.kind,
        RicciErrKind::TensorErr(TensorErrKind::SymmetrySlotOutOfRange {
            name: String::from("hDD"),
            slot: 2,
        })
    );
}

#[test]
fn basis_must_match_dimension() {
    let mut session = Session::new();
    translate!(&mut session, "% define metric gDD (2)");
    let err = parse_latex(&mut session, r"% define basis [x, y, z]").unwrap_err();
    assert_eq!(
        err.kind,
        RicciErrKind::TensorErr(TensorErrKind::InconsistentDimension {
            declared: 3,
            expected: 2,
        })
    );
}

#[test]
fn partial_derivative_of_scalar() {
    let mut session = Session::new();
    translate!(&mut session, "% define basis [x, y]");
    let expr = expr!(&mut session, r"\partial_x (\sin x)");
    assert_eq!(expr, Expr::Func(MathFn::Cos, Box::new(Expr::symbol("x"))));
}
