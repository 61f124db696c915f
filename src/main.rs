use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{self, Termination};

use clap::Parser;
use crossterm::tty::IsTty;

use ricci::error::{RicciErrKind, UtilErrKind};
use ricci::{parse_latex, pretty_print, Expr, RicciErr, Session, SessionOptions};

// std::process::ExitCode cannot be compared, hence this enum
#[derive(Debug, Clone, Copy, PartialEq)]
enum ExitCode {
    Success,
    Failure,
}

impl Termination for ExitCode {
    fn report(self) -> process::ExitCode {
        match self {
            Self::Success => process::ExitCode::SUCCESS,
            Self::Failure => process::ExitCode::FAILURE,
        }
    }
}

/// Translate LaTeX tensor equations into symbolic component expressions.
#[derive(Parser)]
#[command(version, about)]
struct RicciOpt {
    /// Input files holding LaTeX sentences.
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,
    /// Translate a sentence given on the command line.
    #[arg(short = 'e', long = "expr", value_name = "SENTENCE")]
    sentence: Option<String>,
    /// Record recoverable errors and keep translating the next structure.
    #[arg(long)]
    continue_on_error: bool,
    /// Silence tensor redefinition warnings.
    #[arg(long)]
    allow_redefinition: bool,
    /// Dump the resulting namespace as RON into the given file.
    #[arg(long, value_name = "OUT")]
    dump: Option<PathBuf>,
}

fn print_error(source: Option<&str>, err: &RicciErr, filepath: Option<&Path>, color: bool) {
    if color {
        println!("{}", pretty_print::<true>(source, err, filepath));
    } else {
        println!("{}", pretty_print::<false>(source, err, filepath));
    }
}

fn translate(
    session: &mut Session,
    source: &str,
    filepath: Option<&Path>,
    color: bool,
) -> ExitCode {
    match parse_latex(session, source) {
        Ok(output) => {
            for warning in &output.warnings {
                println!("warning: {warning}");
            }
            for skipped in &output.skipped {
                print_error(Some(source), skipped, filepath, color);
            }
            ExitCode::Success
        }
        Err(err) => {
            print_error(Some(source), &err, filepath, color);
            ExitCode::Failure
        }
    }
}

fn main() -> ExitCode {
    let args = RicciOpt::parse();
    let color = io::stdout().is_tty();

    if args.files.is_empty() && args.sentence.is_none() {
        let err = RicciErr {
            kind: RicciErrKind::UtilErr(UtilErrKind::NoInputErr),
            span: None,
        };
        print_error(None, &err, None, color);
        return ExitCode::Failure;
    }

    let mut session = Session::with_options(SessionOptions {
        continue_on_error: args.continue_on_error,
        allow_redefinition: args.allow_redefinition,
    });

    for file in &args.files {
        let source = match fs::read_to_string(file) {
            Ok(source) => source,
            Err(err) => {
                print_error(None, &RicciErr::from(err), Some(file.as_path()), color);
                return ExitCode::Failure;
            }
        };
        if translate(&mut session, &source, Some(file.as_path()), color) == ExitCode::Failure {
            return ExitCode::Failure;
        }
    }
    if let Some(sentence) = &args.sentence {
        if translate(&mut session, sentence, None, color) == ExitCode::Failure {
            return ExitCode::Failure;
        }
    }

    for (name, expr) in session.entries() {
        println!("{name} = {expr}");
    }

    if let Some(dump) = &args.dump {
        let entries: Vec<(&str, &Expr)> = session.entries().collect();
        let serialized =
            match ron::ser::to_string_pretty(&entries, ron::ser::PrettyConfig::default()) {
                Ok(serialized) => serialized,
                Err(err) => {
                    println!("error: cannot serialize the namespace: {err}");
                    return ExitCode::Failure;
                }
            };
        if let Err(err) = fs::write(dump, serialized) {
            print_error(None, &RicciErr::from(err), Some(dump.as_path()), color);
            return ExitCode::Failure;
        }
    }

    ExitCode::Success
}
