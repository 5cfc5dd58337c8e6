//! Plain-text rendering of scrubbed rows for terminal previews.

use std::borrow::Cow;
use std::fmt::Write as _;

/// Cells wider than this are cut and marked with an ellipsis.
pub const MAX_CELL_WIDTH: usize = 40;

pub fn render_table(headers: &[String], rows: &[Vec<String>], max_cell_width: usize) -> String {
    let max_cell_width = max_cell_width.max(1);
    let fit = |value: &str| fit_cell(value, max_cell_width).into_owned();
    let headers = headers.iter().map(|h| fit(h.as_str())).collect::<Vec<_>>();
    let rows = rows
        .iter()
        .map(|row| row.iter().map(|cell| fit(cell.as_str())).collect::<Vec<_>>())
        .collect::<Vec<_>>();

    let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    for width in &mut widths {
        *width = (*width).max(3);
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(&headers, &widths));
    let separator = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator, &widths));
    for row in &rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows, MAX_CELL_WIDTH));
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let line = values
        .iter()
        .zip(widths)
        .map(|(value, &width)| format!("{value:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn fit_cell(value: &str, max_width: usize) -> Cow<'_, str> {
    let needs_cleaning = value.contains(['\n', '\r', '\t']);
    let too_wide = value.chars().count() > max_width;
    if !needs_cleaning && !too_wide {
        return Cow::Borrowed(value);
    }
    let mut cleaned = value
        .chars()
        .map(|ch| match ch {
            '\n' | '\r' | '\t' => ' ',
            other => other,
        })
        .collect::<String>();
    if too_wide {
        cleaned = cleaned.chars().take(max_width - 1).collect();
        cleaned.push('…');
    }
    Cow::Owned(cleaned)
}
