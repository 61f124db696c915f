pub mod kind;
pub mod pretty_print;

use crate::span::Span;
pub use kind::{Error, LexErrKind, ParseErrKind, RicciErrKind, TensorErrKind, UtilErrKind};

#[derive(Debug)]
pub struct RicciErr {
    pub kind: RicciErrKind,
    pub span: Option<Span>,
}

// two errors compare equal whenever their kinds do
impl PartialEq for RicciErr {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl RicciErr {
    pub fn lex(kind: LexErrKind, span: Span) -> Self {
        Self {
            kind: RicciErrKind::LexErr(kind),
            span: Some(span),
        }
    }

    pub fn parse(kind: ParseErrKind, span: Span) -> Self {
        Self {
            kind: RicciErrKind::ParseErr(kind),
            span: Some(span),
        }
    }

    pub fn tensor(kind: TensorErrKind, span: Option<Span>) -> Self {
        Self {
            kind: RicciErrKind::TensorErr(kind),
            span,
        }
    }

    /// Attach a span when the error does not carry one yet.
    pub fn with_span(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    pub fn is_parse_err(&self) -> bool {
        matches!(self.kind, RicciErrKind::ParseErr(_))
    }

    pub fn is_tensor_err(&self) -> bool {
        matches!(self.kind, RicciErrKind::TensorErr(_))
    }
}

impl From<std::io::Error> for RicciErr {
    fn from(err: std::io::Error) -> Self {
        Self {
            kind: RicciErrKind::UtilErr(UtilErrKind::IoErr(err.kind())),
            span: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RicciErr>;
