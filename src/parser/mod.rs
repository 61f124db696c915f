#[cfg(test)]
mod parser_test;

use crate::algebra::{Expr, MathFn};
use crate::error::{self, ParseErrKind, RicciErr, TensorErrKind};
use crate::lexer::token::{Token, TokenKind};
use crate::lexer::Lexer;
use crate::session::{ParseOutput, Session};
use crate::span::Span;
use crate::tensor::summation::{self, EquationLhs};
use crate::tensor::{base_name, derived, IdxRef, IndexPos, Symmetry, TensorAtom, TensorDecl};

/// Translate a sentence of structures (configurations, environments and
/// assignments) against `session`.
pub fn parse_latex(session: &mut Session, sentence: &str) -> error::Result<ParseOutput> {
    let mut parser = Parser::new(session, sentence)?;
    parser.root()?;
    Ok(parser.out)
}

/// Translate a single expression against `session`. A purely scalar
/// expression comes back with its derivatives resolved; an indexed one is
/// returned as parsed.
pub fn parse_expr(session: &mut Session, sentence: &str) -> error::Result<Expr> {
    let mut parser = Parser::new(session, sentence)?;
    let expr = parser.expression()?;
    parser.expect(TokenKind::Eof)?;
    if summation::has_indices(&expr, parser.session) {
        Ok(expr)
    } else {
        summation::resolve_scalar(parser.session, &expr)
    }
}

fn strip(lexeme: &str) -> String {
    lexeme.trim_start_matches('\\').to_string()
}

/// Recursive-descent translator over one sentence. The parser owns a
/// restartable lexer and a one-token lookahead; `mark`/`reset` rewind the
/// stream for the few places the grammar needs a second opinion.
struct Parser<'s, 'a> {
    lexer: Lexer<'a>,
    sentence: &'a str,
    peek: Token,
    marker: usize,
    last_end: usize,
    session: &'s mut Session,
    out: ParseOutput,
}

impl<'s, 'a> Parser<'s, 'a> {
    fn new(session: &'s mut Session, sentence: &'a str) -> error::Result<Self> {
        let mut lexer = Lexer::new(sentence);
        let peek = lexer.next()?;
        Ok(Self {
            lexer,
            sentence,
            peek,
            marker: 0,
            last_end: 0,
            session,
            out: ParseOutput::default(),
        })
    }

    fn next_tok(&mut self) -> error::Result<Token> {
        let upcoming = self.lexer.next()?;
        let consumed = std::mem::replace(&mut self.peek, upcoming);
        self.last_end = consumed.span.end;
        Ok(consumed)
    }

    fn accept(&mut self, kind: TokenKind) -> error::Result<Option<Token>> {
        if self.peek.kind == kind {
            Ok(Some(self.next_tok()?))
        } else {
            Ok(None)
        }
    }

    fn expect(&mut self, kind: TokenKind) -> error::Result<Token> {
        if self.peek.kind == kind {
            self.next_tok()
        } else {
            Err(RicciErr::parse(
                ParseErrKind::ExpectedToken {
                    expected: kind,
                    got: self.peek.kind,
                },
                self.peek.span,
            ))
        }
    }

    fn mark(&mut self) {
        self.marker = self.peek.span.start;
    }

    fn reset(&mut self) -> error::Result<()> {
        self.lexer.initialize(self.marker);
        self.peek = self.lexer.next()?;
        Ok(())
    }

    fn unexpected(&self) -> RicciErr {
        if self.peek.kind == TokenKind::Eof {
            RicciErr::parse(ParseErrKind::Eof, self.peek.span)
        } else {
            RicciErr::parse(
                ParseErrKind::UnexpectedToken {
                    lexeme: self.peek.lexeme.clone(),
                },
                self.peek.span,
            )
        }
    }

    fn parse_integer(token: &Token) -> error::Result<i64> {
        token
            .lexeme
            .parse()
            .map_err(|_| RicciErr::parse(ParseErrKind::ParseInt, token.span))
    }

    fn parse_index(token: &Token) -> error::Result<usize> {
        token
            .lexeme
            .parse()
            .map_err(|_| RicciErr::parse(ParseErrKind::ParseInt, token.span))
    }

    /// Run a generated equation through a fresh parser sharing this session.
    fn subparse(&mut self, text: &str) -> error::Result<()> {
        let mut inner = Parser::new(&mut *self.session, text)?;
        inner.root()?;
        let out = inner.out;
        self.out.merge(out);
        Ok(())
    }

    // ROOT -> STRUCTURE { LINE_BREAK STRUCTURE }*
    fn root(&mut self) -> error::Result<()> {
        loop {
            if let Err(err) = self.structure() {
                if self.session.options.continue_on_error
                    && (err.is_parse_err() || err.is_tensor_err())
                {
                    self.out.skipped.push(err);
                    if !self.synchronize()? {
                        return Ok(());
                    }
                    if self.peek.kind == TokenKind::Eof {
                        return Ok(());
                    }
                    continue;
                }
                return Err(err);
            }
            if self.accept(TokenKind::LineBreak)?.is_some() {
                if self.peek.kind == TokenKind::Eof {
                    return Ok(());
                }
                continue;
            }
            match self.peek.kind {
                TokenKind::Eof => return Ok(()),
                TokenKind::Percent => continue,
                _ => return Err(self.unexpected()),
            }
        }
    }

    // skip forward to just past the next structure separator
    fn synchronize(&mut self) -> error::Result<bool> {
        let from = self.peek.span.start.min(self.sentence.len());
        let tail = &self.sentence[from..];
        let found = [";", r"\\", r"\cr"]
            .iter()
            .filter_map(|sep| tail.find(sep).map(|at| (at, at + sep.len())))
            .min();
        match found {
            Some((_, end)) => {
                self.lexer.initialize(from + end);
                self.peek = self.lexer.next()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // STRUCTURE -> CONFIG | ENVIRONMENT | ASSIGNMENT
    fn structure(&mut self) -> error::Result<()> {
        match self.peek.kind {
            TokenKind::Percent => self.config(),
            TokenKind::BeginAlign => self.environment(),
            _ => self.assignment(),
        }
    }

    // CONFIG -> '%' ( DEFINE | UPDATE | PARSE )
    fn config(&mut self) -> error::Result<()> {
        self.expect(TokenKind::Percent)?;
        match self.peek.kind {
            TokenKind::DefineMacro => self.define(),
            TokenKind::UpdateMacro => self.update_directive(),
            TokenKind::ParseMacro => {
                self.next_tok()?;
                self.assignment()
            }
            _ => Err(RicciErr::parse(
                ParseErrKind::UnsupportedDirective,
                self.peek.span,
            )),
        }
    }

    // DEFINE -> DEFINE_MACRO ( BASIS | RANGE | TENSOR_DECL ) { ',' ... }*
    fn define(&mut self) -> error::Result<()> {
        self.expect(TokenKind::DefineMacro)?;
        loop {
            match self.peek.kind {
                TokenKind::BasisKwrd => self.define_basis()?,
                TokenKind::IndexKwrd => self.define_index()?,
                _ => self.define_tensor()?,
            }
            if self.accept(TokenKind::Comma)?.is_none() {
                break Ok(());
            }
        }
    }

    // BASIS -> BASIS_KWRD '[' LETTER { ',' LETTER }* ']'
    fn define_basis(&mut self) -> error::Result<()> {
        self.expect(TokenKind::BasisKwrd)?;
        let open = self.expect(TokenKind::Lsqbrace)?;
        let mut symbols = Vec::new();
        loop {
            symbols.push(self.symbol()?);
            if self.accept(TokenKind::Comma)?.is_none() {
                break;
            }
        }
        self.expect(TokenKind::Rsqbrace)?;
        self.session
            .define_basis(symbols)
            .map_err(|err| err.with_span(open.span))
    }

    // RANGE -> INDEX_KWRD ( LETTER | '[' LETTER '-' LETTER ']' ) '=' INTEGER ':' INTEGER
    fn define_index(&mut self) -> error::Result<()> {
        self.expect(TokenKind::IndexKwrd)?;
        let mut labels = Vec::new();
        if self.accept(TokenKind::Lsqbrace)?.is_some() {
            let first = strip(&self.expect(TokenKind::Letter)?.lexeme);
            self.expect(TokenKind::Minus)?;
            let last = strip(&self.expect(TokenKind::Letter)?.lexeme);
            self.expect(TokenKind::Rsqbrace)?;
            let (first, last) = (
                first.chars().next().unwrap_or('a'),
                last.chars().next().unwrap_or('a'),
            );
            for label in first..=last {
                labels.push(String::from(label));
            }
        } else {
            labels.push(strip(&self.expect(TokenKind::Letter)?.lexeme));
        }
        self.expect(TokenKind::Equal)?;
        let start = self.expect(TokenKind::Integer)?;
        let start = Self::parse_index(&start)?;
        self.expect(TokenKind::Colon)?;
        let stop = self.expect(TokenKind::Integer)?;
        let stop = Self::parse_index(&stop)?;
        for label in labels {
            self.session.define_index_range(label, (start, stop + 1));
        }
        Ok(())
    }

    // TENSOR_DECL -> [ SYMMETRY ] { SYMBOL }+ [ '(' INTEGER ')' ]
    fn define_tensor(&mut self) -> error::Result<()> {
        let start = self.peek.span;
        let symmetry = if self.peek.kind == TokenKind::Symmetry {
            Symmetry::parse(&self.next_tok()?.lexeme)
        } else {
            Symmetry::Nosym
        };
        let name = self.structured_name()?;
        let dimension = if self.accept(TokenKind::Lparen)?.is_some() {
            let token = self.expect(TokenKind::Integer)?;
            let dimension = Self::parse_index(&token)?;
            self.expect(TokenKind::Rparen)?;
            Some(dimension)
        } else {
            None
        };
        let dimension = match dimension {
            Some(dimension) => dimension,
            None if symmetry == Symmetry::Const => 0,
            None => {
                return Err(RicciErr::tensor(
                    TensorErrKind::DimensionOmitted { name },
                    Some(start),
                ));
            }
        };
        let rank = name
            .chars()
            .rev()
            .take_while(|chr| *chr == 'U' || *chr == 'D')
            .count();
        let warnings = self.session.declare(
            TensorDecl {
                name,
                rank,
                dimension,
                symmetry,
            },
            Some(start),
        )?;
        self.out.warnings.extend(warnings);
        Ok(())
    }

    // UPDATE -> UPDATE_MACRO [ SYMMETRY ] { SYMBOL }+
    fn update_directive(&mut self) -> error::Result<()> {
        self.expect(TokenKind::UpdateMacro)?;
        let start = self.peek.span;
        let _ = self.accept(TokenKind::Symmetry)?;
        let name = self.structured_name()?;
        self.session.update(&name, Some(start))
    }

    // a tensor name spelled out symbol by symbol, e.g. `g D D`
    fn structured_name(&mut self) -> error::Result<String> {
        let mut name = String::new();
        while self.peek.kind.starts_symbol() {
            name.push_str(&self.symbol()?);
        }
        if name.is_empty() {
            return Err(RicciErr::parse(
                ParseErrKind::ExpectedToken {
                    expected: TokenKind::Letter,
                    got: self.peek.kind,
                },
                self.peek.span,
            ));
        }
        Ok(name)
    }

    // ENVIRONMENT -> BEGIN_ALIGN ASSIGNMENT { LINE_BREAK ASSIGNMENT }* END_ALIGN
    fn environment(&mut self) -> error::Result<()> {
        self.expect(TokenKind::BeginAlign)?;
        self.assignment()?;
        while self.accept(TokenKind::LineBreak)?.is_some() {
            if self.peek.kind == TokenKind::EndAlign {
                break;
            }
            self.assignment()?;
        }
        self.expect(TokenKind::EndAlign)?;
        Ok(())
    }

    // ASSIGNMENT -> ( TENSOR | COVDRV ) '=' EXPRESSION
    fn assignment(&mut self) -> error::Result<()> {
        let start = self.peek.span;
        let mut covdrv = self.peek.kind == TokenKind::Nabla;
        if !covdrv && self.peek.kind == TokenKind::Diacritic {
            self.mark();
            self.next_tok()?;
            if self.accept(TokenKind::Lbrace)?.is_some() {
                covdrv = self.peek.kind == TokenKind::Nabla;
            }
            self.reset()?;
        }
        let variable = if covdrv {
            self.covdrv_lhs()?
        } else {
            self.tensor()?
        };
        let lhs = match variable {
            Expr::Tensor(atom) => EquationLhs {
                name: atom.name,
                indices: atom.indices,
                span: atom.span,
            },
            Expr::Symbol(name) => EquationLhs {
                name,
                indices: Vec::new(),
                span: start,
            },
            _ => return Err(self.unexpected()),
        };
        self.expect(TokenKind::Equal)?;
        let rhs = self.expression()?;

        let indexed = !lhs.indices.is_empty() || summation::has_indices(&rhs, self.session);
        if indexed {
            let expanded = summation::expand_equation(self.session, &lhs, &rhs)?;
            self.out.warnings.extend(expanded.warnings);
            self.out.names.extend(expanded.names);
        } else {
            let value = summation::resolve_scalar(self.session, &rhs)?;
            self.session.insert(&lhs.name, value);
            self.out.names.push(lhs.name);
        }
        Ok(())
    }

    // EXPRESSION -> TERM { ( '+' | '-' ) TERM }*
    fn expression(&mut self) -> error::Result<Expr> {
        let mut expr = self.term()?;
        loop {
            if self.accept(TokenKind::Plus)?.is_some() {
                expr = expr + self.term()?;
            } else if self.accept(TokenKind::Minus)?.is_some() {
                expr = expr - self.term()?;
            } else {
                break Ok(expr);
            }
        }
    }

    // TERM -> FACTOR { [ '/' ] FACTOR }*
    fn term(&mut self) -> error::Result<Expr> {
        let mut expr = self.factor()?;
        while self.peek.kind.continues_term() {
            if self.accept(TokenKind::Divide)?.is_some() {
                expr = expr / self.factor()?;
            } else {
                expr = expr * self.factor()?;
            }
        }
        Ok(expr)
    }

    // FACTOR -> ( BASE | EULER ) { '^' EXPONENT }*
    fn factor(&mut self) -> error::Result<Expr> {
        let mut stack: Vec<Option<Expr>> = Vec::new();
        if self.accept(TokenKind::Euler)?.is_some() {
            stack.push(None);
        } else {
            stack.push(Some(self.base()?));
        }
        while self.accept(TokenKind::Caret)?.is_some() {
            if self.accept(TokenKind::Euler)?.is_some() {
                stack.push(None);
            } else {
                stack.push(Some(self.exponent()?));
            }
        }
        // fold right-associatively; a bare `e` base means exponentiation
        let mut expr = match stack.pop() {
            Some(Some(base)) => base,
            _ => Expr::E,
        };
        for item in stack.into_iter().rev() {
            expr = match item {
                None => Expr::Func(MathFn::Exp, Box::new(expr)),
                Some(base) => Expr::pow(base, expr),
            };
        }
        Ok(expr)
    }

    // BASE -> [ '-' ] ( ATOM | '(' EXPRESSION ')' )
    fn base(&mut self) -> error::Result<Expr> {
        let negate = self.accept(TokenKind::Minus)?.is_some();
        let expr = if self.accept(TokenKind::Lparen)?.is_some() {
            let expr = self.expression()?;
            self.expect(TokenKind::Rparen)?;
            expr
        } else {
            self.atom()?
        };
        Ok(if negate { -expr } else { expr })
    }

    // EXPONENT -> BASE | '{' BASE '}' | '{{' BASE '}}'
    fn exponent(&mut self) -> error::Result<Expr> {
        if self.accept(TokenKind::Lbrace)?.is_some() {
            let expr = if self.accept(TokenKind::Lbrace)?.is_some() {
                let expr = self.base()?;
                self.expect(TokenKind::Rbrace)?;
                expr
            } else {
                self.base()?
            };
            self.expect(TokenKind::Rbrace)?;
            Ok(expr)
        } else {
            self.base()
        }
    }

    // ATOM -> NUMBER | TENSOR | COMMAND | OPERATOR
    fn atom(&mut self) -> error::Result<Expr> {
        if self.peek.kind == TokenKind::Diacritic {
            // a diacritic either decorates a symbol or a nabla
            self.mark();
            self.next_tok()?;
            let nabla = self.accept(TokenKind::Lbrace)?.is_some()
                && self.peek.kind == TokenKind::Nabla;
            self.reset()?;
            if nabla {
                return self.covdrv_rhs();
            }
        }
        match self.peek.kind {
            TokenKind::Rational
            | TokenKind::Decimal
            | TokenKind::Integer
            | TokenKind::Pi => self.number(),
            TokenKind::Euler => {
                self.next_tok()?;
                Ok(Expr::E)
            }
            TokenKind::Letter | TokenKind::Diacritic | TokenKind::Mathop => {
                let expr = self.tensor()?;
                if let Expr::Tensor(atom) = &expr {
                    self.christoffel_hook(atom)?;
                }
                Ok(expr)
            }
            TokenKind::SqrtCmd => self.sqrt(),
            TokenKind::FracCmd => self.frac(),
            TokenKind::NlogCmd => self.nlog(),
            TokenKind::TrigCmd => self.trig(),
            TokenKind::Partial => self.pardrv(),
            TokenKind::Nabla => self.covdrv_rhs(),
            TokenKind::Command => Err(RicciErr::parse(
                ParseErrKind::UnsupportedCommand {
                    command: self.peek.lexeme.clone(),
                },
                self.peek.span,
            )),
            _ => Err(self.unexpected()),
        }
    }

    // A rank-three occurrence of an undeclared Christoffel symbol triggers
    // its synthesis from the declared metric.
    fn christoffel_hook(&mut self, atom: &TensorAtom) -> error::Result<()> {
        if atom.indices.len() != 3 {
            return Ok(());
        }
        let base = base_name(&atom.name, 3);
        if !base.contains("Gamma") || self.session.declaration(&atom.name).is_some() {
            return Ok(());
        }
        if self.session.dimension().is_none() {
            return Err(RicciErr::parse(
                ParseErrKind::CannotInferDimension,
                atom.span,
            ));
        }
        let metric = derived::metric_name(derived::diacritic_of(base).unwrap_or(""));
        if self.session.declaration(&metric).is_none() {
            return Err(RicciErr::tensor(
                TensorErrKind::UndefinedMetric { name: metric },
                Some(atom.span),
            ));
        }
        // generate with symbolic labels so every component is synthesized at
        // once, whatever indices the triggering occurrence carries
        let symbolic = TensorAtom {
            name: atom.name.clone(),
            indices: atom
                .indices
                .iter()
                .zip(["a", "b", "c"])
                .map(|((_, pos), label)| (IdxRef::Label(String::from(label)), *pos))
                .collect(),
            span: atom.span,
        };
        let generated = derived::generate_christoffel(&symbolic);
        self.subparse(&generated)
    }

    // NUMBER -> RATIONAL | DECIMAL | INTEGER | PI
    fn number(&mut self) -> error::Result<Expr> {
        let token = self.next_tok()?;
        match token.kind {
            TokenKind::Rational => {
                let text = &token.lexeme;
                let (numer, denom) = if let Some(split) = text.split_once('/') {
                    split
                } else {
                    let inner = &text[r"\frac{".len()..text.len() - 1];
                    inner.split_once("}{").unwrap_or(("0", "1"))
                };
                let numer = numer
                    .parse()
                    .map_err(|_| RicciErr::parse(ParseErrKind::ParseInt, token.span))?;
                let denom = denom
                    .parse()
                    .map_err(|_| RicciErr::parse(ParseErrKind::ParseInt, token.span))?;
                Ok(Expr::rational(numer, denom))
            }
            TokenKind::Decimal => token
                .lexeme
                .parse()
                .map(Expr::Float)
                .map_err(|_| RicciErr::parse(ParseErrKind::ParseFloat, token.span)),
            TokenKind::Integer => Ok(Expr::Int(Self::parse_integer(&token)?)),
            TokenKind::Pi => Ok(Expr::Pi),
            _ => Err(RicciErr::parse(
                ParseErrKind::UnexpectedToken {
                    lexeme: token.lexeme,
                },
                token.span,
            )),
        }
    }

    // SQRT -> SQRT_CMD [ '[' INTEGER ']' ] '{' EXPRESSION '}'
    fn sqrt(&mut self) -> error::Result<Expr> {
        self.expect(TokenKind::SqrtCmd)?;
        let root = if self.accept(TokenKind::Lsqbrace)?.is_some() {
            let token = self.expect(TokenKind::Integer)?;
            let root = Self::parse_integer(&token)?;
            self.expect(TokenKind::Rsqbrace)?;
            root
        } else {
            2
        };
        self.expect(TokenKind::Lbrace)?;
        let expr = self.expression()?;
        self.expect(TokenKind::Rbrace)?;
        Ok(Expr::pow(expr, Expr::rational(1, root)))
    }

    // FRAC -> FRAC_CMD '{' EXPRESSION '}' '{' EXPRESSION '}'
    fn frac(&mut self) -> error::Result<Expr> {
        self.expect(TokenKind::FracCmd)?;
        self.expect(TokenKind::Lbrace)?;
        let numerator = self.expression()?;
        self.expect(TokenKind::Rbrace)?;
        self.expect(TokenKind::Lbrace)?;
        let denominator = self.expression()?;
        self.expect(TokenKind::Rbrace)?;
        Ok(numerator / denominator)
    }

    // the argument of a logarithm or trigonometric command
    fn call_argument(&mut self) -> error::Result<Expr> {
        match self.peek.kind {
            TokenKind::Letter | TokenKind::Diacritic | TokenKind::Mathop => self.tensor(),
            TokenKind::Integer => {
                let token = self.next_tok()?;
                Ok(Expr::Int(Self::parse_integer(&token)?))
            }
            TokenKind::Lparen => {
                self.next_tok()?;
                let expr = self.expression()?;
                self.expect(TokenKind::Rparen)?;
                Ok(expr)
            }
            _ => Err(self.unexpected()),
        }
    }

    // NLOG -> NLOG_CMD [ '_' INTEGER | '_' '{' INTEGER '}' ] ARGUMENT
    fn nlog(&mut self) -> error::Result<Expr> {
        let command = self.expect(TokenKind::NlogCmd)?;
        let natural = command.lexeme == r"\ln";
        let log_base = if !natural && self.accept(TokenKind::Underscore)?.is_some() {
            let braced = self.accept(TokenKind::Lbrace)?.is_some();
            let token = self.expect(TokenKind::Integer)?;
            let log_base = Self::parse_integer(&token)?;
            if braced {
                self.expect(TokenKind::Rbrace)?;
            }
            log_base
        } else {
            10
        };
        let argument = self.call_argument()?;
        if natural {
            Ok(Expr::Func(MathFn::Ln, Box::new(argument)))
        } else {
            Ok(Expr::Func(MathFn::Log(log_base), Box::new(argument)))
        }
    }

    // TRIG -> TRIG_CMD [ '^' INTEGER | '^' '{' INTEGER '}' ] ARGUMENT
    fn trig(&mut self) -> error::Result<Expr> {
        let command = self.expect(TokenKind::TrigCmd)?;
        let exponent = if self.accept(TokenKind::Caret)?.is_some() {
            let braced = self.accept(TokenKind::Lbrace)?.is_some();
            let negative = self.accept(TokenKind::Minus)?.is_some();
            let token = self.expect(TokenKind::Integer)?;
            let mut exponent = Self::parse_integer(&token)?;
            if negative {
                exponent = -exponent;
            }
            if braced {
                self.expect(TokenKind::Rbrace)?;
            }
            exponent
        } else {
            1
        };
        let (normal, inverse) = match strip(&command.lexeme).as_str() {
            "sin" => (MathFn::Sin, MathFn::Asin),
            "cos" => (MathFn::Cos, MathFn::Acos),
            "tan" => (MathFn::Tan, MathFn::Atan),
            "sinh" => (MathFn::Sinh, MathFn::Asinh),
            "cosh" => (MathFn::Cosh, MathFn::Acosh),
            _ => (MathFn::Tanh, MathFn::Atanh),
        };
        let argument = self.call_argument()?;
        if exponent == -1 {
            Ok(Expr::Func(inverse, Box::new(argument)))
        } else {
            Ok(Expr::pow(
                Expr::Func(normal, Box::new(argument)),
                Expr::Int(exponent),
            ))
        }
    }

    // PARDRV -> { PARTIAL [ '^' INTEGER ] '_' LETTER }+ ( TENSOR | '(' EXPRESSION ')' )
    fn pardrv(&mut self) -> error::Result<Expr> {
        let mut indices = Vec::new();
        while self.accept(TokenKind::Partial)?.is_some() {
            let order = if self.accept(TokenKind::Caret)?.is_some() {
                let token = self.expect(TokenKind::Integer)?;
                Self::parse_index(&token)?
            } else {
                1
            };
            self.expect(TokenKind::Underscore)?;
            let index = self.single_index()?;
            for _ in 0..order {
                indices.push(index.clone());
            }
        }
        let inner = if self.accept(TokenKind::Lparen)?.is_some() {
            let expr = self.expression()?;
            self.expect(TokenKind::Rparen)?;
            expr
        } else {
            self.tensor()?
        };
        Ok(Expr::Deriv(Box::new(inner), indices))
    }

    // { ( NABLA | DIACRITIC '{' NABLA '}' ) ( '^' | '_' ) LETTER }+
    fn covdrv_chain(
        &mut self,
    ) -> error::Result<(Vec<(IdxRef, IndexPos)>, String, Span)> {
        let start = self.peek.span;
        let mut deriv = Vec::new();
        let mut diacritic = String::new();
        loop {
            match self.peek.kind {
                TokenKind::Diacritic => {
                    self.mark();
                    let token = self.next_tok()?;
                    if self.accept(TokenKind::Lbrace)?.is_none()
                        || self.peek.kind != TokenKind::Nabla
                    {
                        // a decorated symbol, not a decorated nabla
                        self.reset()?;
                        break;
                    }
                    diacritic = strip(&token.lexeme);
                    self.expect(TokenKind::Nabla)?;
                    self.expect(TokenKind::Rbrace)?;
                }
                TokenKind::Nabla => {
                    self.next_tok()?;
                }
                _ => break,
            }
            if self.accept(TokenKind::Caret)?.is_some() {
                deriv.push((self.single_index()?, IndexPos::Upper));
            } else {
                self.expect(TokenKind::Underscore)?;
                deriv.push((self.single_index()?, IndexPos::Lower));
            }
        }
        Ok((deriv, diacritic, start))
    }

    fn tensor_atom(&mut self) -> error::Result<TensorAtom> {
        let start = self.peek.span;
        match self.tensor()? {
            Expr::Tensor(atom) => Ok(atom),
            Expr::Symbol(name) => Ok(TensorAtom {
                name,
                indices: Vec::new(),
                span: Span::new(start.start, self.last_end),
            }),
            _ => Err(self.unexpected()),
        }
    }

    // COVDRV on the left-hand side names the derivative without expanding it
    fn covdrv_lhs(&mut self) -> error::Result<Expr> {
        let (deriv, diacritic, start) = self.covdrv_chain()?;
        let atom = self.tensor_atom()?;
        let name = derived::covdrv_name(&atom.name, &deriv, &diacritic);
        let mut indices = atom.indices;
        indices.extend(deriv);
        Ok(Expr::Tensor(TensorAtom {
            name,
            indices,
            span: Span::new(start.start, atom.span.end),
        }))
    }

    // COVDRV on the right-hand side expands into partial derivatives and
    // Christoffel corrections unless the derivative is already known
    fn covdrv_rhs(&mut self) -> error::Result<Expr> {
        let (deriv, diacritic, start) = self.covdrv_chain()?;
        let atom = self.tensor_atom()?;
        let name = derived::covdrv_name(&atom.name, &deriv, &diacritic);
        if self.session.declaration(&name).is_none() {
            if self.session.dimension().is_none() {
                return Err(RicciErr::parse(ParseErrKind::CannotInferDimension, start));
            }
            let corrected = !atom.indices.is_empty()
                || deriv.iter().any(|(_, pos)| *pos == IndexPos::Upper);
            if corrected {
                let metric = derived::metric_name(&diacritic);
                if self.session.declaration(&metric).is_none() {
                    return Err(RicciErr::tensor(
                        TensorErrKind::UndefinedMetric { name: metric },
                        Some(start),
                    ));
                }
            }
            let generated = derived::covdrv_equation(&atom, &deriv, &diacritic);
            self.subparse(&generated)?;
        }
        let mut indices = atom.indices;
        indices.extend(deriv);
        Ok(Expr::Tensor(TensorAtom {
            name,
            indices,
            span: Span::new(start.start, self.last_end),
        }))
    }

    // TENSOR -> SYMBOL [ '_' LOWER ] [ '^' UPPER [ '_' LOWER ] ]
    fn tensor(&mut self) -> error::Result<Expr> {
        let start = self.peek.span;
        let mut name = self.symbol()?;
        let mut indices: Vec<(IdxRef, IndexPos)> = Vec::new();

        if self.accept(TokenKind::Underscore)?.is_some() {
            let (lower, comma) = self.lower_index()?;
            for index in lower {
                name.push('D');
                indices.push((index, IndexPos::Lower));
            }
            if !comma.is_empty() {
                return Ok(self.comma_derivative(name, indices, comma, start));
            }
        }
        self.mark();
        if self.accept(TokenKind::Caret)?.is_some() {
            if self.accept(TokenKind::Lbrace)?.is_some() {
                if self.peek.kind == TokenKind::Lbrace {
                    // `^{{` opens an exponent; leave the caret unconsumed
                    self.reset()?;
                    return Ok(self.finish_tensor(name, indices, start));
                }
                self.reset()?;
                self.next_tok()?;
            }
            for index in self.upper_index()? {
                name.push('U');
                indices.push((index, IndexPos::Upper));
            }
            if self.accept(TokenKind::Underscore)?.is_some() {
                let (lower, comma) = self.lower_index()?;
                for index in lower {
                    name.push('D');
                    indices.push((index, IndexPos::Lower));
                }
                if !comma.is_empty() {
                    return Ok(self.comma_derivative(name, indices, comma, start));
                }
            }
        }
        Ok(self.finish_tensor(name, indices, start))
    }

    fn finish_tensor(
        &mut self,
        name: String,
        indices: Vec<(IdxRef, IndexPos)>,
        start: Span,
    ) -> Expr {
        let span = Span::new(start.start, self.last_end);
        if indices.is_empty() {
            // scalars register themselves on first reference
            if self.session.get(&name).is_none() {
                self.session.insert(&name, Expr::Symbol(name.clone()));
            }
            return Expr::Symbol(name);
        }
        Expr::Tensor(TensorAtom {
            name,
            indices,
            span,
        })
    }

    // comma notation denotes partial differentiation, `T_{a b , c}`
    fn comma_derivative(
        &mut self,
        name: String,
        indices: Vec<(IdxRef, IndexPos)>,
        comma: Vec<IdxRef>,
        start: Span,
    ) -> Expr {
        let span = Span::new(start.start, self.last_end);
        let atom = Expr::Tensor(TensorAtom {
            name,
            indices,
            span,
        });
        Expr::Deriv(Box::new(atom), comma)
    }

    // a single, optionally braced index
    fn single_index(&mut self) -> error::Result<IdxRef> {
        let braced = self.accept(TokenKind::Lbrace)?.is_some();
        let index = self.index_token()?;
        if braced {
            self.expect(TokenKind::Rbrace)?;
        }
        Ok(index)
    }

    fn index_token(&mut self) -> error::Result<IdxRef> {
        if self.peek.kind == TokenKind::Integer {
            let token = self.next_tok()?;
            Ok(IdxRef::Num(Self::parse_index(&token)?))
        } else {
            let token = self.expect(TokenKind::Letter)?;
            Ok(IdxRef::Label(strip(&token.lexeme)))
        }
    }

    // LOWER -> LETTER | INTEGER | '{' { LETTER | INTEGER }* [ ',' { LETTER }+ ] '}'
    fn lower_index(&mut self) -> error::Result<(Vec<IdxRef>, Vec<IdxRef>)> {
        let mut indices = Vec::new();
        let mut comma = Vec::new();
        match self.peek.kind {
            TokenKind::Letter | TokenKind::Integer => {
                indices.push(self.index_token()?);
            }
            TokenKind::Lbrace => {
                self.next_tok()?;
                while matches!(self.peek.kind, TokenKind::Letter | TokenKind::Integer) {
                    indices.push(self.index_token()?);
                }
                if self.accept(TokenKind::Comma)?.is_some() {
                    while self.peek.kind == TokenKind::Letter {
                        let token = self.next_tok()?;
                        comma.push(IdxRef::Label(strip(&token.lexeme)));
                    }
                }
                self.expect(TokenKind::Rbrace)?;
            }
            _ => return Err(self.unexpected()),
        }
        Ok((indices, comma))
    }

    // UPPER -> LETTER | INTEGER | '{' { LETTER | INTEGER }+ '}'
    fn upper_index(&mut self) -> error::Result<Vec<IdxRef>> {
        let mut indices = Vec::new();
        match self.peek.kind {
            TokenKind::Letter | TokenKind::Integer => {
                indices.push(self.index_token()?);
            }
            TokenKind::Lbrace => {
                self.next_tok()?;
                while matches!(self.peek.kind, TokenKind::Letter | TokenKind::Integer) {
                    indices.push(self.index_token()?);
                }
                self.expect(TokenKind::Rbrace)?;
            }
            _ => return Err(self.unexpected()),
        }
        Ok(indices)
    }

    // SYMBOL -> LETTER | EULER | DIACRITIC '{' LETTER '}' | MATHOP '{' ... '}'
    fn symbol(&mut self) -> error::Result<String> {
        match self.peek.kind {
            TokenKind::Letter => {
                let token = self.next_tok()?;
                Ok(strip(&token.lexeme))
            }
            TokenKind::Euler => {
                self.next_tok()?;
                Ok(String::from("e"))
            }
            TokenKind::Diacritic => {
                let token = self.next_tok()?;
                let diacritic = strip(&token.lexeme);
                self.expect(TokenKind::Lbrace)?;
                let letter = self.expect(TokenKind::Letter)?;
                self.expect(TokenKind::Rbrace)?;
                Ok(format!("{}{diacritic}", strip(&letter.lexeme)))
            }
            TokenKind::Mathop => {
                self.next_tok()?;
                self.expect(TokenKind::Lbrace)?;
                let mut name = String::new();
                match self.peek.kind {
                    TokenKind::Letter | TokenKind::Euler => {
                        let token = self.next_tok()?;
                        name.push_str(&strip(&token.lexeme));
                    }
                    _ => return Err(self.unexpected()),
                }
                while matches!(
                    self.peek.kind,
                    TokenKind::Letter
                        | TokenKind::Euler
                        | TokenKind::Integer
                        | TokenKind::Underscore
                ) {
                    let token = self.next_tok()?;
                    name.push_str(&strip(&token.lexeme));
                }
                self.expect(TokenKind::Rbrace)?;
                Ok(name)
            }
            _ => Err(RicciErr::parse(
                ParseErrKind::ExpectedToken {
                    expected: TokenKind::Letter,
                    got: self.peek.kind,
                },
                self.peek.span,
            )),
        }
    }
}
