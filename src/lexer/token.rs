use crate::span::Span;

#[derive(Default, Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    #[inline]
    pub fn new(kind: TokenKind, lexeme: impl ToString, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.to_string(),
            span,
        }
    }

    #[inline]
    pub fn eof(offset: usize) -> Self {
        Self {
            kind: TokenKind::Eof,
            lexeme: String::new(),
            span: Span::new(offset, offset),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenKind {
    // default token
    #[default]
    Eof,

    // Literals
    Rational,
    Decimal,
    Integer,

    // Constants
    Nabla,
    Pi,
    Euler,

    // Symbols
    Plus,       // +
    Minus,      // -
    Divide,     // /
    Equal,      // =
    Caret,      // ^
    Comma,      // ,
    Colon,      // :
    Percent,    // %
    Underscore, // _

    // Delimiters
    Lparen,     // (
    Rparen,     // )
    Lbrace,     // {
    Rbrace,     // }
    Lsqbrace,   // [
    Rsqbrace,   // ]
    LineBreak,  // ; or \\ or \cr
    BeginAlign, // \begin{align}
    EndAlign,   // \end{align}

    // Commands
    Partial,  // \partial
    SqrtCmd,  // \sqrt
    FracCmd,  // \frac
    TrigCmd,  // \sin, \cosh, ...
    NlogCmd,  // \ln, \log
    Diacritic, // \hat, \tilde, \bar
    Mathop,   // \mathop
    Command,  // any other \command

    // Configuration keywords
    DefineMacro, // define
    UpdateMacro, // update
    ParseMacro,  // parse
    BasisKwrd,   // basis
    IndexKwrd,   // index
    Symmetry,    // const, metric, kronecker, permutation, nosym, sym01, ...

    // Identifiers
    Letter, // a-z, A-Z or a Greek command
}

impl TokenKind {
    /// Tokens that may continue a term, either a `/` or anything that starts
    /// a factor; implicit multiplication hangs off this set.
    #[inline]
    pub fn continues_term(&self) -> bool {
        matches!(
            self,
            Self::Lparen
                | Self::Partial
                | Self::Letter
                | Self::Rational
                | Self::Decimal
                | Self::Integer
                | Self::Nabla
                | Self::Pi
                | Self::Euler
                | Self::Diacritic
                | Self::Mathop
                | Self::Divide
                | Self::Command
                | Self::SqrtCmd
                | Self::FracCmd
                | Self::TrigCmd
                | Self::NlogCmd
        )
    }

    /// Tokens that may start a SYMBOL.
    #[inline]
    pub fn starts_symbol(&self) -> bool {
        matches!(
            self,
            Self::Letter | Self::Euler | Self::Diacritic | Self::Mathop
        )
    }
}
