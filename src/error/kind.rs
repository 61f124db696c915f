use crate::lexer::token::TokenKind;

#[derive(Debug, PartialEq)]
pub enum RicciErrKind {
    LexErr(LexErrKind),
    ParseErr(ParseErrKind),
    TensorErr(TensorErrKind),
    UtilErr(UtilErrKind),
}

impl RicciErrKind {
    fn map<F, R>(&self, f: F) -> R
    where
        F: Fn(&dyn Error) -> R,
    {
        match self {
            Self::LexErr(kind) => f(kind),
            Self::ParseErr(kind) => f(kind),
            Self::TensorErr(kind) => f(kind),
            Self::UtilErr(kind) => f(kind),
        }
    }
}

/// No token pattern matched at the current offset.
#[derive(Debug, PartialEq)]
pub enum LexErrKind {
    UnexpectedCharacter { found: char },
}

/// Grammar violations discovered while consuming the token stream.
#[derive(Debug, PartialEq)]
pub enum ParseErrKind {
    Eof,
    ExpectedToken { expected: TokenKind, got: TokenKind },
    UnexpectedToken { lexeme: String },
    UnsupportedCommand { command: String },
    UnsupportedDirective,
    ParseInt,
    ParseFloat,
    CannotInferDimension,
}

/// Einstein-convention and declaration violations.
#[derive(Debug, PartialEq)]
pub enum TensorErrKind {
    IllegalBoundIndex { label: String },
    UnbalancedFreeIndex { label: String },
    UndefinedTensor { name: String },
    UndefinedMetric { name: String },
    MissingBasis,
    MissingDimension { name: String },
    DimensionOmitted { name: String },
    InconsistentDimension { declared: usize, expected: usize },
    InvalidRank { name: String, rank: usize },
    UnsupportedDimension { name: String, dimension: usize },
    UpdateUndefined { name: String },
    DuplicateBasisSymbol { symbol: String },
    SymmetrySlotOutOfRange { name: String, slot: usize },
}

#[derive(Debug, PartialEq)]
pub enum UtilErrKind {
    IoErr(std::io::ErrorKind),
    NoInputErr,
}

//////////////////////////////////////
// Implementation of Displaying Errors
// by implementing new trait
//////////////////////////////////////
pub trait Error {
    // Error code should display with hex decimal
    fn err_code(&self) -> u16;
    fn err_str(&self) -> String;
    fn err_detail_str(&self) -> Vec<String>;
}

impl Error for RicciErrKind {
    fn err_code(&self) -> u16 {
        self.map(|kind| kind.err_code())
    }
    fn err_str(&self) -> String {
        self.map(|kind| kind.err_str())
    }
    fn err_detail_str(&self) -> Vec<String> {
        self.map(|kind| kind.err_detail_str())
    }
}

impl Error for LexErrKind {
    fn err_code(&self) -> u16 {
        match self {
            Self::UnexpectedCharacter { .. } => 0x0001,
        }
    }
    fn err_str(&self) -> String {
        match self {
            Self::UnexpectedCharacter { found } => format!("unexpected character `{found}`"),
        }
    }
    fn err_detail_str(&self) -> Vec<String> {
        vec![String::from("no token pattern matches here")]
    }
}

impl Error for ParseErrKind {
    fn err_code(&self) -> u16 {
        match self {
            Self::Eof => 0x01FF,
            Self::ExpectedToken { .. } => 0x0101,
            Self::UnexpectedToken { .. } => 0x0102,
            Self::UnsupportedCommand { .. } => 0x0103,
            Self::UnsupportedDirective => 0x0104,
            Self::ParseInt => 0x0105,
            Self::ParseFloat => 0x0106,
            Self::CannotInferDimension => 0x0107,
        }
    }
    fn err_str(&self) -> String {
        match self {
            Self::Eof => String::from("sentence ended unexpectedly"),
            Self::ExpectedToken { expected, .. } => format!("expected token `{expected:?}`"),
            Self::UnexpectedToken { lexeme } => format!("unexpected `{lexeme}`"),
            Self::UnsupportedCommand { command } => format!("unsupported command `{command}`"),
            Self::UnsupportedDirective => String::from("unsupported configuration directive"),
            Self::ParseInt => String::from("integer literal out of range"),
            Self::ParseFloat => String::from("malformed decimal literal"),
            Self::CannotInferDimension => String::from("cannot instantiate from inference"),
        }
    }
    fn err_detail_str(&self) -> Vec<String> {
        match self {
            Self::Eof => vec![],
            Self::ExpectedToken { expected, got } => {
                vec![format!("expected `{expected:?}`, got `{got:?}`")]
            }
            Self::UnexpectedToken { .. } => {
                vec![String::from("no grammar alternative covers this token")]
            }
            Self::UnsupportedCommand { .. } => vec![
                String::from("only \\sqrt, \\frac, logarithms and"),
                String::from("trigonometric commands are recognized"),
            ],
            Self::UnsupportedDirective => vec![String::from(
                "a `%` line must carry `define`, `update` or `parse`",
            )],
            Self::ParseInt | Self::ParseFloat => vec![],
            Self::CannotInferDimension => vec![String::from(
                "declare a tensor with an explicit dimension before \\Gamma",
            )],
        }
    }
}

impl Error for TensorErrKind {
    fn err_code(&self) -> u16 {
        match self {
            Self::IllegalBoundIndex { .. } => 0x0201,
            Self::UnbalancedFreeIndex { .. } => 0x0202,
            Self::UndefinedTensor { .. } => 0x0203,
            Self::UndefinedMetric { .. } => 0x0204,
            Self::MissingBasis => 0x0205,
            Self::MissingDimension { .. } => 0x0206,
            Self::DimensionOmitted { .. } => 0x0207,
            Self::InconsistentDimension { .. } => 0x0208,
            Self::InvalidRank { .. } => 0x0209,
            Self::UnsupportedDimension { .. } => 0x020A,
            Self::UpdateUndefined { .. } => 0x020B,
            Self::DuplicateBasisSymbol { .. } => 0x020C,
            Self::SymmetrySlotOutOfRange { .. } => 0x020D,
        }
    }
    fn err_str(&self) -> String {
        match self {
            Self::IllegalBoundIndex { label } => format!("illegal bound index `{label}`"),
            Self::UnbalancedFreeIndex { label } => format!("unbalanced free index `{label}`"),
            Self::UndefinedTensor { name } => format!("undefined tensor `{name}`"),
            Self::UndefinedMetric { name } => format!("undefined metric `{name}`"),
            Self::MissingBasis => String::from("cannot differentiate symbolically without basis"),
            Self::MissingDimension { name } => {
                format!("cannot expand `{name}` without a declared dimension")
            }
            Self::DimensionOmitted { name } => {
                format!("dimension of `{name}` only omittable for constant")
            }
            Self::InconsistentDimension { declared, expected } => {
                format!("inconsistent tensor dimension {declared}, session uses {expected}")
            }
            Self::InvalidRank { name, rank } => format!("cannot declare `{name}` of rank {rank}"),
            Self::UnsupportedDimension { name, dimension } => {
                format!("cannot invert `{name}` of dimension {dimension}")
            }
            Self::UpdateUndefined { name } => format!("cannot update undefined tensor `{name}`"),
            Self::DuplicateBasisSymbol { symbol } => format!("duplicate basis symbol `{symbol}`"),
            Self::SymmetrySlotOutOfRange { name, slot } => {
                format!("symmetry slot {slot} out of range for `{name}`")
            }
        }
    }
    fn err_detail_str(&self) -> Vec<String> {
        match self {
            Self::IllegalBoundIndex { .. } => vec![
                String::from("a bound index must appear exactly once as a"),
                String::from("superscript and exactly once as a subscript"),
                String::from("within any single term"),
            ],
            Self::UnbalancedFreeIndex { .. } => vec![
                String::from("a free index must appear in every term with the"),
                String::from("same position and cannot be summed over"),
            ],
            Self::UndefinedTensor { name } => {
                vec![format!("declare `{name}` with `% define` or assign it first")]
            }
            Self::UndefinedMetric { name } => {
                vec![format!("declare `{name}` with `% define metric`")]
            }
            Self::MissingBasis => {
                vec![String::from("declare one with `% define basis [x, y, ...]`")]
            }
            Self::MissingDimension { .. } => vec![String::from(
                "declare the tensor dimension in parentheses, e.g. `(4)`",
            )],
            Self::InvalidRank { .. } => vec![String::from(
                "kronecker and metric declarations require rank 2",
            )],
            Self::UnsupportedDimension { .. } => {
                vec![String::from("metric inversion supports dimensions 2 to 4")]
            }
            Self::SymmetrySlotOutOfRange { .. } => vec![
                String::from("symmetry pairs index zero-based tensor slots,"),
                String::from("so every slot must stay below the rank"),
            ],
            _ => Vec::new(),
        }
    }
}

impl Error for UtilErrKind {
    fn err_code(&self) -> u16 {
        match self {
            Self::IoErr(_) => 0x0301,
            Self::NoInputErr => 0x0302,
        }
    }
    fn err_str(&self) -> String {
        match self {
            Self::IoErr(err) => format!("IO error `{err:?}` occurs"),
            Self::NoInputErr => String::from("no file name or sentence is given"),
        }
    }
    fn err_detail_str(&self) -> Vec<String> {
        Vec::new()
    }
}
