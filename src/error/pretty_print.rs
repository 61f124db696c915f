use std::path::Path;

use super::kind::Error;
use super::RicciErr;
use crate::span::{display_column, Span};

const BOLD_TEXT: &str = "\x1b[1m";
const ERR_COLOR: &str = "\x1b[38;5;9m";
const ERR_TITLE_COLOR: &str = "\x1b[38;5;15m";
const BLUE_COLOR: &str = "\x1b[38;5;12m";
const RESET_COLOR: &str = "\x1b[0m";

/// Render a caret-aligned diagnostic for `error` against the sentence it was
/// raised on. `COLOR` toggles ANSI escapes so that piped output stays clean.
pub fn pretty_print<const COLOR: bool>(
    source: Option<&str>,
    error: &RicciErr,
    filepath: Option<&Path>,
) -> String {
    let paint = |code: &'static str| if COLOR { code } else { "" };
    let err_code = error.kind.err_code();
    let err_str = error.kind.err_str();
    let mut output = String::new();

    output = output + paint(BOLD_TEXT) + paint(ERR_COLOR);
    output += &format!(
        "error[E{err_code:04X}]{}: {err_str}",
        paint(ERR_TITLE_COLOR)
    );
    output = output + paint(RESET_COLOR) + "\n";

    let (Some(Span { start, end }), Some(sentence)) = (error.span, source) else {
        output += paint(RESET_COLOR);
        return output;
    };

    // locate the line holding the error offset
    let line_start = sentence[..start.min(sentence.len())]
        .rfind('\n')
        .map_or(0, |pos| pos + 1);
    let line_end = sentence[line_start..]
        .find('\n')
        .map_or(sentence.len(), |pos| line_start + pos);
    let line = &sentence[line_start..line_end];
    let row = sentence[..line_start].matches('\n').count() + 1;
    let column = display_column(line, start - line_start);
    let row_num = format!("{row} ");

    if let Some(filepath) = filepath {
        output = output
            + &" ".repeat(row_num.len().saturating_sub(1))
            + paint(BOLD_TEXT)
            + paint(BLUE_COLOR)
            + "--> "
            + paint(RESET_COLOR)
            + &filepath.display().to_string()
            + &format!(":{row}:{}\n", column + 1);
    }

    output = output
        + paint(BOLD_TEXT)
        + paint(BLUE_COLOR)
        + &" ".repeat(row_num.len())
        + "|\n"
        + &row_num
        + "|   "
        + paint(RESET_COLOR)
        + line
        + "\n";

    let caret_width = display_column(line, end.min(line_end) - line_start)
        .saturating_sub(column)
        .max(1);
    output = output
        + paint(BOLD_TEXT)
        + paint(BLUE_COLOR)
        + &" ".repeat(row_num.len())
        + "|   "
        + &" ".repeat(column)
        + paint(ERR_COLOR)
        + &"^".repeat(caret_width)
        + " ";

    for (i, msg) in error.kind.err_detail_str().iter().enumerate() {
        if i == 0 {
            output = output + msg + "\n";
        } else {
            output = output
                + paint(BOLD_TEXT)
                + paint(BLUE_COLOR)
                + &" ".repeat(row_num.len())
                + "|   "
                + paint(ERR_COLOR)
                + &" ".repeat(column + caret_width + 1)
                + msg
                + "\n";
        }
    }
    if error.kind.err_detail_str().is_empty() {
        output += "\n";
    }
    output += paint(RESET_COLOR);

    output
}
