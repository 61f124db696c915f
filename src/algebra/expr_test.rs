use super::diff::diff;
use super::*;

fn sym(name: &str) -> Expr {
    Expr::symbol(name)
}

#[test]
fn test_rational_normalization() {
    assert_eq!(Expr::rational(4, 2), Expr::Int(2));
    assert_eq!(Expr::rational(2, 4), Expr::Rational(1, 2));
    assert_eq!(Expr::rational(3, -6), Expr::Rational(-1, 2));
    assert_eq!(Expr::rational(0, 7), Expr::Int(0));
}

#[test]
fn test_sum_folds_numerics() {
    let folded = Expr::sum(vec![Expr::Int(1), Expr::Rational(1, 2), Expr::Int(2)]);
    assert_eq!(folded, Expr::Rational(7, 2));
}

#[test]
fn test_sum_collects_like_terms() {
    let folded = Expr::sum(vec![
        sym("x"),
        Expr::product(vec![Expr::Int(2), sym("x")]),
        sym("y"),
    ]);
    assert_eq!(
        folded,
        Expr::Add(vec![
            Expr::Mul(vec![Expr::Int(3), sym("x")]),
            sym("y"),
        ])
    );
}

#[test]
fn test_sum_cancellation() {
    let folded = Expr::sum(vec![sym("x"), -sym("x")]);
    assert_eq!(folded, Expr::Int(0));
}

#[test]
fn test_product_merges_exponents() {
    let folded = Expr::product(vec![sym("x"), sym("x")]);
    assert_eq!(
        folded,
        Expr::Pow(Box::new(sym("x")), Box::new(Expr::Int(2)))
    );

    let cancelled = Expr::product(vec![sym("x"), Expr::pow(sym("x"), Expr::Int(-1))]);
    assert_eq!(cancelled, Expr::Int(1));
}

#[test]
fn test_product_is_commutative() {
    let left = Expr::product(vec![sym("x"), sym("y")]);
    let right = Expr::product(vec![sym("y"), sym("x")]);
    assert_eq!(left, right);
}

#[test]
fn test_product_annihilates_on_zero() {
    let folded = Expr::product(vec![sym("x"), Expr::Int(0), sym("y")]);
    assert_eq!(folded, Expr::Int(0));
}

#[test]
fn test_pow_folds_numerics() {
    assert_eq!(Expr::pow(Expr::Int(2), Expr::Int(10)), Expr::Int(1024));
    assert_eq!(
        Expr::pow(Expr::Int(2), Expr::Int(-2)),
        Expr::Rational(1, 4)
    );
    assert_eq!(
        Expr::pow(Expr::Rational(2, 3), Expr::Int(2)),
        Expr::Rational(4, 9)
    );
    assert_eq!(Expr::pow(sym("x"), Expr::Int(0)), Expr::Int(1));
    assert_eq!(Expr::pow(sym("x"), Expr::Int(1)), sym("x"));
}

#[test]
fn test_pow_of_pow_merges_integer_exponents() {
    let nested = Expr::pow(Expr::pow(sym("x"), Expr::Int(2)), Expr::Int(3));
    assert_eq!(
        nested,
        Expr::Pow(Box::new(sym("x")), Box::new(Expr::Int(6)))
    );
}

#[test]
fn test_operator_overloads() {
    let expr = (sym("x") + Expr::Int(1)) - Expr::Int(1);
    assert_eq!(expr, sym("x"));

    let halved = sym("x") / Expr::Int(2);
    assert_eq!(halved, Expr::Mul(vec![Expr::Rational(1, 2), sym("x")]));
}

#[test]
fn test_expand_binomial_square() {
    let binomial = Expr::pow(sym("x") + sym("y"), Expr::Int(2));
    let expanded = binomial.expand();
    assert_eq!(
        expanded,
        Expr::Add(vec![
            Expr::Pow(Box::new(sym("x")), Box::new(Expr::Int(2))),
            Expr::Mul(vec![Expr::Int(2), sym("x"), sym("y")]),
            Expr::Pow(Box::new(sym("y")), Box::new(Expr::Int(2))),
        ])
    );
}

#[test]
fn test_expand_distributes_product() {
    let product = Expr::Mul(vec![Expr::Int(2), Expr::Add(vec![sym("x"), sym("y")])]);
    assert_eq!(
        product.expand(),
        Expr::Add(vec![
            Expr::Mul(vec![Expr::Int(2), sym("x")]),
            Expr::Mul(vec![Expr::Int(2), sym("y")]),
        ])
    );
}

#[test]
fn test_diff_power_rule() {
    let cubed = Expr::pow(sym("x"), Expr::Int(3));
    assert_eq!(
        diff(&cubed, "x"),
        Expr::Mul(vec![
            Expr::Int(3),
            Expr::Pow(Box::new(sym("x")), Box::new(Expr::Int(2))),
        ])
    );
    assert_eq!(diff(&cubed, "y"), Expr::Int(0));
}

#[test]
fn test_diff_product_rule() {
    let product = Expr::product(vec![sym("x"), sym("y")]);
    assert_eq!(diff(&product, "x"), sym("y"));

    let squared = Expr::product(vec![sym("x"), sym("x")]);
    assert_eq!(
        diff(&squared, "x"),
        Expr::Mul(vec![Expr::Int(2), sym("x")])
    );
}

#[test]
fn test_diff_chain_rule() {
    let composed = Expr::Func(
        MathFn::Sin,
        Box::new(Expr::pow(sym("x"), Expr::Int(2))),
    );
    assert_eq!(
        diff(&composed, "x"),
        Expr::Mul(vec![
            Expr::Int(2),
            Expr::Func(
                MathFn::Cos,
                Box::new(Expr::Pow(Box::new(sym("x")), Box::new(Expr::Int(2)))),
            ),
            sym("x"),
        ])
    );
}

#[test]
fn test_diff_ln() {
    let log = Expr::Func(MathFn::Ln, Box::new(sym("x")));
    assert_eq!(
        diff(&log, "x"),
        Expr::Pow(Box::new(sym("x")), Box::new(Expr::Int(-1)))
    );
}

#[test]
fn test_display() {
    let expr = Expr::Add(vec![
        Expr::Mul(vec![Expr::Int(2), sym("x")]),
        Expr::Pow(Box::new(sym("y")), Box::new(Expr::Int(-1))),
    ]);
    assert_eq!(expr.to_string(), "2*x + y^(-1)");
}
