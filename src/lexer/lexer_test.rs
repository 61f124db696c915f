use super::*;

macro_rules! lexing {
    ($lex: ident) => {{
        let mut lexed = Vec::new();
        loop {
            let token = $lex.next().unwrap();
            if token.kind == TokenKind::Eof {
                break lexed;
            }
            lexed.push((token.kind, token.lexeme));
        }
    }};
}

macro_rules! token {
    ($kind: expr, $lexeme: literal) => {
        ($kind, $lexeme.to_string())
    };
}

fn check_same(got: Vec<(TokenKind, String)>, expected: Vec<(TokenKind, String)>) -> bool {
    if got.len() != expected.len() {
        panic!("length expected {:?}, got {:?}", expected.len(), got.len());
    }

    for (got, expected) in got.into_iter().zip(expected) {
        if got.0 != expected.0 {
            panic!("token expected {:?}, got {:?}", expected.0, got.0);
        }
        if got.1 != expected.1 {
            panic!("lexeme expected {:?}, got {:?}", expected.1, got.1);
        }
    }

    true
}

#[test]
fn test_lexing_single_symbols() {
    let source = "+-/=^,:%()[]_";
    let mut lexer = Lexer::new(source);
    let lexed = lexing!(lexer);
    let expected = vec![
        token!(TokenKind::Plus, "+"),
        token!(TokenKind::Minus, "-"),
        token!(TokenKind::Divide, "/"),
        token!(TokenKind::Equal, "="),
        token!(TokenKind::Caret, "^"),
        token!(TokenKind::Comma, ","),
        token!(TokenKind::Colon, ":"),
        token!(TokenKind::Percent, "%"),
        token!(TokenKind::Lparen, "("),
        token!(TokenKind::Rparen, ")"),
        token!(TokenKind::Lsqbrace, "["),
        token!(TokenKind::Rsqbrace, "]"),
        token!(TokenKind::Underscore, "_"),
    ];
    assert!(check_same(lexed, expected));
}

#[test]
fn test_lexing_numbers() {
    let source = r"12 3.5 1/2 \frac{2}{3} 7";
    let mut lexer = Lexer::new(source);
    let lexed = lexing!(lexer);
    let expected = vec![
        token!(TokenKind::Integer, "12"),
        token!(TokenKind::Decimal, "3.5"),
        token!(TokenKind::Rational, "1/2"),
        token!(TokenKind::Rational, r"\frac{2}{3}"),
        token!(TokenKind::Integer, "7"),
    ];
    assert!(check_same(lexed, expected));
}

#[test]
fn test_lexing_commands() {
    let source = r"\sqrt \frac \sinh \sin \ln \log \partial \nabla \hat \mathop \foo";
    let mut lexer = Lexer::new(source);
    let lexed = lexing!(lexer);
    let expected = vec![
        token!(TokenKind::SqrtCmd, r"\sqrt"),
        token!(TokenKind::FracCmd, r"\frac"),
        token!(TokenKind::TrigCmd, r"\sinh"),
        token!(TokenKind::TrigCmd, r"\sin"),
        token!(TokenKind::NlogCmd, r"\ln"),
        token!(TokenKind::NlogCmd, r"\log"),
        token!(TokenKind::Partial, r"\partial"),
        token!(TokenKind::Nabla, r"\nabla"),
        token!(TokenKind::Diacritic, r"\hat"),
        token!(TokenKind::Mathop, r"\mathop"),
        token!(TokenKind::Command, r"\foo"),
    ];
    assert!(check_same(lexed, expected));
}

#[test]
fn test_lexing_greek_letters() {
    let source = r"\mu\nu \Gamma \pi \phi \epsilon x";
    let mut lexer = Lexer::new(source);
    let lexed = lexing!(lexer);
    let expected = vec![
        token!(TokenKind::Letter, r"\mu"),
        token!(TokenKind::Letter, r"\nu"),
        token!(TokenKind::Letter, r"\Gamma"),
        token!(TokenKind::Pi, r"\pi"),
        token!(TokenKind::Letter, r"\phi"),
        token!(TokenKind::Letter, r"\epsilon"),
        token!(TokenKind::Letter, "x"),
    ];
    assert!(check_same(lexed, expected));
}

#[test]
fn test_lexing_config_keywords() {
    let source = "% define basis nosym sym01_anti23 metric update parse index";
    let mut lexer = Lexer::new(source);
    let lexed = lexing!(lexer);
    let expected = vec![
        token!(TokenKind::Percent, "%"),
        token!(TokenKind::DefineMacro, "define"),
        token!(TokenKind::BasisKwrd, "basis"),
        token!(TokenKind::Symmetry, "nosym"),
        token!(TokenKind::Symmetry, "sym01_anti23"),
        token!(TokenKind::Symmetry, "metric"),
        token!(TokenKind::UpdateMacro, "update"),
        token!(TokenKind::ParseMacro, "parse"),
        token!(TokenKind::IndexKwrd, "index"),
    ];
    assert!(check_same(lexed, expected));
}

#[test]
fn test_lexing_skips_formatting() {
    let source = r"\begin{align} T^\mu{}_\nu \left( x \right) \\ y \end{align}";
    let mut lexer = Lexer::new(source);
    let lexed = lexing!(lexer);
    let expected = vec![
        token!(TokenKind::BeginAlign, r"\begin{align}"),
        token!(TokenKind::Letter, "T"),
        token!(TokenKind::Caret, "^"),
        token!(TokenKind::Letter, r"\mu"),
        token!(TokenKind::Underscore, "_"),
        token!(TokenKind::Letter, r"\nu"),
        token!(TokenKind::Lparen, "("),
        token!(TokenKind::Letter, "x"),
        token!(TokenKind::Rparen, ")"),
        token!(TokenKind::LineBreak, r"\\"),
        token!(TokenKind::Letter, "y"),
        token!(TokenKind::EndAlign, r"\end{align}"),
    ];
    assert!(check_same(lexed, expected));
}

#[test]
fn test_lexing_spans() {
    let source = "x + y";
    let mut lexer = Lexer::new(source);
    let first = lexer.next().unwrap();
    assert_eq!(first.span, Span::new(0, 1));
    let second = lexer.next().unwrap();
    assert_eq!(second.span, Span::new(2, 3));
    let third = lexer.next().unwrap();
    assert_eq!(third.span, Span::new(4, 5));
    assert_eq!(lexer.next().unwrap().kind, TokenKind::Eof);
}

#[test]
fn test_lexing_rewind() {
    let source = "a = b";
    let mut lexer = Lexer::new(source);
    let _ = lexer.next().unwrap();
    let marker = lexer.position();
    let _ = lexer.next().unwrap();
    let _ = lexer.next().unwrap();
    lexer.initialize(marker);
    let relexed = lexer.next().unwrap();
    assert_eq!(relexed.kind, TokenKind::Equal);
    assert_eq!(relexed.span, Span::new(2, 3));
}

#[test]
fn test_lexing_unexpected_character() {
    let source = "x + @";
    let mut lexer = Lexer::new(source);
    let _ = lexer.next().unwrap();
    let _ = lexer.next().unwrap();
    let err = lexer.next().unwrap_err();
    assert_eq!(
        err,
        RicciErr::lex(
            LexErrKind::UnexpectedCharacter { found: '@' },
            Span::point(4)
        )
    );
}
