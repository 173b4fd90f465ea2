//! Table formatting: buffered Markdown rows → LaTeX `table` + `tabular`.
//!
//! The first row is the header. Data rows are padded with empty cells or
//! truncated to the header's width, never rejected.

use super::inline::format_inline;
use once_cell::sync::Lazy;
use regex::Regex;

/// One Markdown table row: trimmed cell texts, left to right.
pub type TableRow = Vec<String>;

static RE_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\|[-:| ]+\|$").unwrap());

/// `true` for a header separator line such as `|---|:--:|`.
pub fn is_separator_row(line: &str) -> bool {
    RE_SEPARATOR.is_match(line.trim())
}

/// `true` when the trimmed line starts and ends with `|`.
pub fn is_table_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('|') && trimmed.ends_with('|')
}

/// Split a `|`-delimited line into trimmed cells, dropping the text before
/// the first pipe and after the last one.
pub fn split_cells(line: &str) -> TableRow {
    let parts: Vec<&str> = line.trim().split('|').collect();
    if parts.len() < 2 {
        return Vec::new();
    }
    parts[1..parts.len() - 1]
        .iter()
        .map(|cell| cell.trim().to_string())
        .collect()
}

/// Render buffered rows as a LaTeX table.
///
/// Returns an empty string when there is no header or the header has no
/// cells.
pub fn format_table(rows: &[TableRow]) -> String {
    let Some(header) = rows.first() else {
        return String::new();
    };
    if header.is_empty() {
        return String::new();
    }

    let num_cols = header.len();
    let col_spec = format!("|{}|", vec!["c"; num_cols].join("|"));

    let mut out = String::new();
    out.push_str("\\begin{table}[htbp]\n");
    out.push_str("\\centering\n");
    out.push_str(&format!("\\begin{{tabular}}{{{}}}\n", col_spec));
    out.push_str("\\hline\n");

    out.push_str(&render_row(header));
    out.push_str(" \\\\ \\hline\\hline\n");

    for row in &rows[1..] {
        let normalised = normalise_row(row, num_cols);
        out.push_str(&render_row(&normalised));
        out.push_str(" \\\\ \\hline\n");
    }

    out.push_str("\\end{tabular}\n");
    out.push_str("\\end{table}\n\n");
    out
}

/// Pad with empty cells or truncate to `width`.
fn normalise_row(row: &[String], width: usize) -> TableRow {
    let mut cells: TableRow = row.iter().take(width).cloned().collect();
    cells.resize(width, String::new());
    cells
}

fn render_row(cells: &[String]) -> String {
    cells
        .iter()
        .map(|cell| format_inline(cell))
        .collect::<Vec<_>>()
        .join(" & ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> TableRow {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn empty_buffer_emits_nothing() {
        assert_eq!(format_table(&[]), "");
        assert_eq!(format_table(&[Vec::new()]), "");
    }

    #[test]
    fn column_spec_has_borders_between_every_column() {
        let out = format_table(&[row(&["A", "B", "C"])]);
        assert!(out.contains("\\begin{tabular}{|c|c|c|}"), "got: {out}");
    }

    #[test]
    fn header_gets_double_hline() {
        let out = format_table(&[row(&["A", "B"]), row(&["1", "2"])]);
        assert!(out.contains("A & B \\\\ \\hline\\hline\n"), "got: {out}");
        assert!(out.contains("1 & 2 \\\\ \\hline\n"), "got: {out}");
    }

    #[test]
    fn short_row_is_padded() {
        let out = format_table(&[row(&["A", "B", "C"]), row(&["1"])]);
        let data_line = out
            .lines()
            .find(|l| l.starts_with('1'))
            .expect("data row present");
        assert_eq!(data_line, "1 &  &  \\\\ \\hline");
        assert_eq!(data_line.matches('&').count() + 1, 3);
    }

    #[test]
    fn long_row_is_truncated() {
        let out = format_table(&[row(&["A", "B"]), row(&["1", "2", "3", "4"])]);
        assert!(out.contains("1 & 2 \\\\ \\hline\n"));
        assert!(!out.contains('3'));
    }

    #[test]
    fn cells_are_inline_formatted() {
        let out = format_table(&[row(&["**Name**", "Share"]), row(&["x", "50%"])]);
        assert!(out.contains("\\textbf{Name} & Share"));
        assert!(out.contains("x & 50\\%"));
    }

    #[test]
    fn separator_detection() {
        assert!(is_separator_row("|---|---|"));
        assert!(is_separator_row("| :--- | :---: | ---: |"));
        assert!(!is_separator_row("| a | b |"));
        assert!(!is_separator_row("---"));
    }

    #[test]
    fn split_cells_trims() {
        assert_eq!(split_cells("| a |  b  |c|"), row(&["a", "b", "c"]));
        assert_eq!(split_cells("a | b"), Vec::<String>::new());
    }
}
