pub mod token;

#[cfg(test)]
mod lexer_test;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{self, LexErrKind, RicciErr};
use crate::span::Span;
use token::{Token, TokenKind};

struct Pattern {
    kind: Option<TokenKind>,
    regex: Regex,
}

macro_rules! pattern {
    ($kind:expr, $regex:expr $(,)?) => {
        Pattern {
            kind: $kind,
            regex: Regex::new(concat!("^(?:", $regex, ")")).unwrap(),
        }
    };
}

// The table is ordered: the first pattern that matches at the current offset
// wins, so keywords sit above `Letter` and specific commands above the
// `Command` catch-all. Patterns with `kind: None` are skipped silently.
static PATTERNS: Lazy<Vec<Pattern>> = Lazy::new(|| {
    use TokenKind::*;
    vec![
        pattern!(None, r"(?:\s|\\,|\{\}|&)+"),
        pattern!(None, r"\\[bB]ig[lr]?|\\left|\\right"),
        pattern!(
            Some(Rational),
            r"[0-9]+/[1-9][0-9]*|\\frac\{[0-9]+\}\{[1-9][0-9]*\}",
        ),
        pattern!(Some(Decimal), r"[0-9]+\.[0-9]+"),
        pattern!(Some(Integer), r"[0-9]+"),
        pattern!(Some(BeginAlign), r"\\begin\{align\*?\}"),
        pattern!(Some(EndAlign), r"\\end\{align\*?\}"),
        pattern!(Some(LineBreak), r";|\\\\|\\cr"),
        pattern!(Some(Nabla), r"\\nabla"),
        pattern!(Some(Partial), r"\\partial"),
        pattern!(Some(SqrtCmd), r"\\sqrt"),
        pattern!(Some(FracCmd), r"\\frac"),
        pattern!(Some(TrigCmd), r"\\sinh|\\cosh|\\tanh|\\sin|\\cos|\\tan"),
        pattern!(Some(NlogCmd), r"\\ln|\\log"),
        pattern!(Some(Diacritic), r"\\hat|\\tilde|\\bar"),
        pattern!(Some(Mathop), r"\\mathop"),
        pattern!(Some(Pi), r"\\pi"),
        pattern!(Some(DefineMacro), r"define"),
        pattern!(Some(UpdateMacro), r"update"),
        pattern!(Some(ParseMacro), r"parse"),
        pattern!(Some(BasisKwrd), r"basis"),
        pattern!(Some(IndexKwrd), r"index"),
        pattern!(
            Some(Symmetry),
            r"nosym|metric|permutation|kronecker|const|(?:sym|anti)[0-9]{2}(?:_(?:sym|anti)[0-9]{2})*",
        ),
        pattern!(Some(Euler), r"e"),
        pattern!(
            Some(Letter),
            r"[a-zA-Z]|\\(?:[aA]lpha|[bB]eta|[gG]amma|[dD]elta|[eE]psilon|[zZ]eta|[eE]ta|[tT]heta|[iI]ota|[kK]appa|[lL]ambda|[mM]u|[nN]u|[xX]i|[oO]micron|[pP]i|[rR]ho|[sS]igma|[tT]au|[uU]psilon|[pP]hi|[cC]hi|[pP]si|[oO]mega)",
        ),
        pattern!(Some(Plus), r"\+"),
        pattern!(Some(Minus), r"-"),
        pattern!(Some(Divide), r"/"),
        pattern!(Some(Equal), r"="),
        pattern!(Some(Caret), r"\^"),
        pattern!(Some(Underscore), r"_"),
        pattern!(Some(Comma), r","),
        pattern!(Some(Colon), r":"),
        pattern!(Some(Percent), r"%"),
        pattern!(Some(Lparen), r"\("),
        pattern!(Some(Rparen), r"\)"),
        pattern!(Some(Lbrace), r"\{"),
        pattern!(Some(Rbrace), r"\}"),
        pattern!(Some(Lsqbrace), r"\["),
        pattern!(Some(Rsqbrace), r"\]"),
        pattern!(Some(Command), r"\\[a-zA-Z]+"),
    ]
});

/// Restartable tokenizer over a single sentence. The parser rewinds it with
/// [`Lexer::initialize`] when it backtracks.
pub struct Lexer<'a> {
    sentence: &'a str,
    index: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(sentence: &'a str) -> Self {
        Self { sentence, index: 0 }
    }

    /// Byte offset of the next token to be lexed.
    #[inline]
    pub fn position(&self) -> usize {
        self.index
    }

    /// Rewind (or fast-forward) to an arbitrary byte offset.
    #[inline]
    pub fn initialize(&mut self, position: usize) {
        self.index = position;
    }

    pub fn next(&mut self) -> error::Result<Token> {
        'relex: loop {
            let rest = &self.sentence[self.index.min(self.sentence.len())..];
            let Some(found) = rest.chars().next() else {
                return Ok(Token::eof(self.index));
            };
            for pattern in PATTERNS.iter() {
                if let Some(matched) = pattern.regex.find(rest) {
                    let start = self.index;
                    self.index += matched.end();
                    match pattern.kind {
                        Some(kind) => {
                            return Ok(Token::new(
                                kind,
                                matched.as_str(),
                                Span::new(start, self.index),
                            ));
                        }
                        None => continue 'relex,
                    }
                }
            }
            return Err(RicciErr::lex(
                LexErrKind::UnexpectedCharacter { found },
                Span::point(self.index),
            ));
        }
    }
}
