use super::{Expr, MathFn};

/// Symbolic derivative of `expr` with respect to the coordinate symbol `var`.
/// Tensor atoms and unresolved derivative nodes are opaque here; the
/// summation engine resolves them to components before differentiating.
pub fn diff(expr: &Expr, var: &str) -> Expr {
    match expr {
        Expr::Int(_) | Expr::Rational(..) | Expr::Float(_) | Expr::Pi | Expr::E => Expr::Int(0),
        Expr::Symbol(name) => {
            if name == var {
                Expr::Int(1)
            } else {
                Expr::Int(0)
            }
        }
        Expr::Add(terms) => Expr::sum(terms.iter().map(|term| diff(term, var)).collect()),
        Expr::Mul(factors) => {
            let mut terms = Vec::with_capacity(factors.len());
            for (i, factor) in factors.iter().enumerate() {
                let mut product = factors.clone();
                product[i] = diff(factor, var);
                terms.push(Expr::product(product));
            }
            Expr::sum(terms)
        }
        Expr::Pow(base, exp) => {
            if !exp.depends_on(var) {
                // power rule
                let lowered = Expr::sum(vec![(**exp).clone(), Expr::Int(-1)]);
                Expr::product(vec![
                    (**exp).clone(),
                    Expr::pow((**base).clone(), lowered),
                    diff(base, var),
                ])
            } else if !base.depends_on(var) {
                // exponential rule
                Expr::product(vec![
                    (*expr).clone(),
                    Expr::Func(MathFn::Ln, base.clone()),
                    diff(exp, var),
                ])
            } else {
                // general rule via logarithmic differentiation
                Expr::product(vec![
                    (*expr).clone(),
                    Expr::sum(vec![
                        Expr::product(vec![
                            diff(exp, var),
                            Expr::Func(MathFn::Ln, base.clone()),
                        ]),
                        Expr::product(vec![
                            (**exp).clone(),
                            diff(base, var),
                            Expr::pow((**base).clone(), Expr::Int(-1)),
                        ]),
                    ]),
                ])
            }
        }
        Expr::Func(func, inner) => {
            let outer = func_derivative(*func, inner);
            Expr::product(vec![outer, diff(inner, var)])
        }
        Expr::Tensor(_) | Expr::Deriv(..) => Expr::Int(0),
    }
}

fn func_derivative(func: MathFn, inner: &Expr) -> Expr {
    let inner = inner.clone();
    let square = |expr: Expr| Expr::pow(expr, Expr::Int(2));
    match func {
        MathFn::Sin => Expr::Func(MathFn::Cos, Box::new(inner)),
        MathFn::Cos => -Expr::Func(MathFn::Sin, Box::new(inner)),
        MathFn::Tan => Expr::sum(vec![
            Expr::Int(1),
            square(Expr::Func(MathFn::Tan, Box::new(inner))),
        ]),
        MathFn::Sinh => Expr::Func(MathFn::Cosh, Box::new(inner)),
        MathFn::Cosh => Expr::Func(MathFn::Sinh, Box::new(inner)),
        MathFn::Tanh => Expr::sum(vec![
            Expr::Int(1),
            -square(Expr::Func(MathFn::Tanh, Box::new(inner))),
        ]),
        MathFn::Asin => Expr::pow(
            Expr::sum(vec![Expr::Int(1), -square(inner)]),
            Expr::rational(-1, 2),
        ),
        MathFn::Acos => -Expr::pow(
            Expr::sum(vec![Expr::Int(1), -square(inner)]),
            Expr::rational(-1, 2),
        ),
        MathFn::Atan => Expr::pow(
            Expr::sum(vec![Expr::Int(1), square(inner)]),
            Expr::Int(-1),
        ),
        MathFn::Asinh => Expr::pow(
            Expr::sum(vec![square(inner), Expr::Int(1)]),
            Expr::rational(-1, 2),
        ),
        MathFn::Acosh => Expr::pow(
            Expr::sum(vec![square(inner), Expr::Int(-1)]),
            Expr::rational(-1, 2),
        ),
        MathFn::Atanh => Expr::pow(
            Expr::sum(vec![Expr::Int(1), -square(inner)]),
            Expr::Int(-1),
        ),
        MathFn::Exp => Expr::Func(MathFn::Exp, Box::new(inner)),
        MathFn::Ln => Expr::pow(inner, Expr::Int(-1)),
        MathFn::Log(log_base) => Expr::product(vec![
            Expr::pow(inner, Expr::Int(-1)),
            Expr::pow(
                Expr::Func(MathFn::Ln, Box::new(Expr::Int(log_base))),
                Expr::Int(-1),
            ),
        ]),
    }
}
