//! Block transpiler: a single-pass, line-oriented Markdown → LaTeX scanner.
//!
//! ## State machine
//!
//! [`Transpiler`] walks the source with an explicit cursor rather than an
//! iterator because two rules need to move it by hand: table recognition
//! peeks at the next line and skips the separator, and leaving a blockquote
//! replays the current line ([`Transpiler::step_back`]).
//!
//! Each line is matched against the rules below, first match wins:
//!
//! 1. ATX header `#`..`#####` + space → `\section` .. `\subparagraph`
//! 2. `![alt](path)` anywhere        → `figure` with `\includegraphics`
//! 3. line starting with ```` ``` ```` → open/close `lstlisting`
//! 4. `|` line followed by a separator row → start buffering a table
//! 5. `> ` line → `quote` environment; the first other line closes it and is
//!    replayed
//! 6. inside a code block → verbatim
//! 7. `N. item` → `enumerate`, nesting by two-space indent units
//! 8. `- item`  → `itemize`, same algorithm
//! 9. blank line with a list open → close the list
//! 10. any other non-blank line → paragraph
//! 11. other blank lines → blank separator
//!
//! A buffered table is flushed as soon as a line arrives that is not a
//! `|...|` row; that line then goes through the rules above.
//!
//! ## Lists
//!
//! Only one list is open at a time. It always holds `level + 1` nested
//! environments. Going deeper opens the extra levels; going shallower closes
//! the whole list and reopens it at the new depth. An item of the other kind
//! (ordered vs. unordered) closes the open list before opening its own.

use super::inline::format_inline;
use super::table::{format_table, is_separator_row, is_table_row, split_cells, TableRow};
use crate::preamble::{render_preamble, DOCUMENT_END};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

static RE_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,5}) (.*)$").unwrap());
static RE_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[(.*?)\]\((.*?)\)").unwrap());
static RE_ORDERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*)\d+\.\s+(.*)$").unwrap());
static RE_UNORDERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*)- (.*)$").unwrap());

const SECTIONING: [&str; 5] = [
    "section",
    "subsection",
    "subsubsection",
    "paragraph",
    "subparagraph",
];

/// Options for a single transpilation.
#[derive(Debug, Clone)]
pub struct TranspileOptions {
    /// Wrap the body in the fixed preamble and `\end{document}`.
    pub include_preamble: bool,
    pub title: String,
    pub author: String,
}

impl Default for TranspileOptions {
    fn default() -> Self {
        Self {
            include_preamble: true,
            title: crate::config::DEFAULT_TITLE.to_string(),
            author: String::new(),
        }
    }
}

impl From<&crate::config::ConversionConfig> for TranspileOptions {
    fn from(config: &crate::config::ConversionConfig) -> Self {
        Self {
            include_preamble: config.include_preamble,
            title: config.title.clone(),
            author: config.author.clone(),
        }
    }
}

/// Kind of the currently open list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Ordered,
    Unordered,
}

impl ListKind {
    fn environment(self) -> &'static str {
        match self {
            ListKind::Ordered => "enumerate",
            ListKind::Unordered => "itemize",
        }
    }
}

/// The open list: its kind and 0-based nesting level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ListContext {
    kind: ListKind,
    level: usize,
}

/// Transpile Markdown to LaTeX.
///
/// Never fails; unrecognised syntax is emitted as paragraph text.
pub fn markdown_to_latex(markdown: &str, options: &TranspileOptions) -> String {
    let mut out = String::with_capacity(markdown.len() * 2);
    if options.include_preamble {
        out.push_str(&render_preamble(&options.title, &options.author));
    }

    out.push_str(&Transpiler::new(markdown).run());

    if options.include_preamble {
        out.push_str(DOCUMENT_END);
    }
    out
}

/// Mutable scan state. One instance per call; never shared.
pub struct Transpiler<'a> {
    lines: Vec<&'a str>,
    cursor: usize,
    in_code_block: bool,
    in_blockquote: bool,
    list: Option<ListContext>,
    table: Option<Vec<TableRow>>,
    out: String,
}

impl<'a> Transpiler<'a> {
    pub fn new(markdown: &'a str) -> Self {
        Self {
            lines: markdown.split('\n').map(|l| l.trim_end_matches('\r')).collect(),
            cursor: 0,
            in_code_block: false,
            in_blockquote: false,
            list: None,
            table: None,
            out: String::with_capacity(markdown.len() * 2),
        }
    }

    /// Scan every line and return the LaTeX body.
    pub fn run(mut self) -> String {
        while let Some(line) = self.advance() {
            self.process_line(line);
        }
        self.finish()
    }

    /// Return the line under the cursor and move past it.
    fn advance(&mut self) -> Option<&'a str> {
        let line = self.lines.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(line)
    }

    /// The line the next [`Self::advance`] would return.
    fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.cursor).copied()
    }

    /// Move past the next line without processing it.
    fn skip_line(&mut self) {
        self.cursor = (self.cursor + 1).min(self.lines.len());
    }

    /// Queue the line just consumed to be processed again.
    fn step_back(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    fn process_line(&mut self, line: &'a str) {
        if self.table.is_some() {
            if is_table_row(line) {
                self.buffer_row(split_cells(line));
                return;
            }
            self.flush_table();
        }

        if let Some(caps) = RE_HEADER.captures(line) {
            let depth = caps[1].len();
            self.emit_heading(depth, &caps[2]);
        } else if let Some(caps) = RE_IMAGE.captures(line) {
            self.emit_figure(&caps[1], &caps[2]);
        } else if let Some(fence) = line.strip_prefix("```") {
            self.toggle_code_block(fence);
        } else if line.contains('|') && !self.in_code_block && self.starts_table(line) {
            // Header buffered, separator skipped.
        } else if let Some(quoted) = line.strip_prefix("> ") {
            if !self.in_blockquote {
                self.out.push_str("\\begin{quote}\n");
                self.in_blockquote = true;
            }
            self.out.push_str(&format_inline(quoted));
            self.out.push('\n');
        } else if self.in_blockquote {
            self.out.push_str("\\end{quote}\n\n");
            self.in_blockquote = false;
            self.step_back();
        } else if self.in_code_block {
            self.out.push_str(line);
            self.out.push('\n');
        } else if let Some(caps) = RE_ORDERED.captures(line) {
            let level = caps[1].chars().count() / 2;
            self.emit_item(ListKind::Ordered, level, &caps[2]);
        } else if let Some(caps) = RE_UNORDERED.captures(line) {
            let level = caps[1].chars().count() / 2;
            self.emit_item(ListKind::Unordered, level, caps[2].trim_end());
        } else if line.trim().is_empty() {
            if self.list.is_some() {
                self.close_list();
            }
            self.out.push('\n');
        } else {
            self.out.push_str(&format_inline(line));
            self.out.push_str("\n\n");
        }
    }

    fn emit_heading(&mut self, depth: usize, title: &str) {
        let command = SECTIONING[depth - 1];
        self.out.push_str(&format!("\\{}{{{}}}\n\n", command, title));
    }

    fn emit_figure(&mut self, alt: &str, path: &str) {
        let path = path.replace('\\', "/");
        self.out.push_str("\\begin{figure}[htbp]\n");
        self.out.push_str("\\centering\n");
        self.out.push_str(&format!(
            "\\includegraphics[width=0.8\\textwidth]{{{}}}\n",
            path
        ));
        self.out.push_str(&format!("\\caption{{{}}}\n", alt));
        self.out.push_str("\\end{figure}\n\n");
    }

    fn toggle_code_block(&mut self, fence_rest: &str) {
        if self.in_code_block {
            self.out.push_str("\\end{lstlisting}\n\n");
            self.in_code_block = false;
            return;
        }
        let language = fence_rest.trim();
        if language.is_empty() {
            self.out.push_str("\\begin{lstlisting}\n");
        } else {
            self.out
                .push_str(&format!("\\begin{{lstlisting}}[language={}]\n", language));
        }
        self.in_code_block = true;
    }

    /// Start a table when the next line is a separator row.
    fn starts_table(&mut self, line: &str) -> bool {
        if !self.peek().is_some_and(is_separator_row) {
            return false;
        }
        self.table = Some(vec![split_cells(line)]);
        self.skip_line();
        true
    }

    fn buffer_row(&mut self, row: TableRow) {
        if let Some(rows) = self.table.as_mut() {
            rows.push(row);
        }
    }

    fn flush_table(&mut self) {
        if let Some(rows) = self.table.take() {
            let table = format_table(&rows);
            if table.is_empty() && !rows.is_empty() {
                warn!(
                    "Dropping table with an empty header row ({} row(s) buffered)",
                    rows.len()
                );
            }
            self.out.push_str(&table);
        }
    }

    fn emit_item(&mut self, kind: ListKind, level: usize, content: &str) {
        match self.list {
            Some(open) if open.kind != kind => {
                self.close_list();
                self.open_levels(kind, 0, level);
            }
            Some(open) if level > open.level => {
                self.open_levels(kind, open.level + 1, level);
            }
            Some(open) if level < open.level => {
                self.close_list();
                self.open_levels(kind, 0, level);
            }
            Some(_) => {}
            None => self.open_levels(kind, 0, level),
        }
        self.list = Some(ListContext { kind, level });

        self.out.push_str("\\item ");
        self.out.push_str(&format_inline(content));
        self.out.push('\n');
    }

    /// Open one environment per level in `from..=to`.
    fn open_levels(&mut self, kind: ListKind, from: usize, to: usize) {
        for _ in from..=to {
            self.out
                .push_str(&format!("\\begin{{{}}}\n", kind.environment()));
        }
    }

    /// Close every environment of the open list.
    fn close_list(&mut self) {
        if let Some(open) = self.list.take() {
            for _ in 0..=open.level {
                self.out
                    .push_str(&format!("\\end{{{}}}\n", open.kind.environment()));
            }
        }
    }

    /// Close whatever is still open: list, blockquote, code block, table.
    fn finish(mut self) -> String {
        self.close_list();
        if self.in_blockquote {
            self.out.push_str("\\end{quote}\n");
            self.in_blockquote = false;
        }
        if self.in_code_block {
            self.out.push_str("\\end{lstlisting}\n");
            self.in_code_block = false;
        }
        self.flush_table();
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(md: &str) -> String {
        markdown_to_latex(
            md,
            &TranspileOptions {
                include_preamble: false,
                ..Default::default()
            },
        )
    }

    #[test]
    fn header_depths() {
        for (n, cmd) in SECTIONING.iter().enumerate() {
            let md = format!("{} Heading text", "#".repeat(n + 1));
            let out = body(&md);
            let line = out.lines().next().unwrap();
            assert_eq!(line, format!("\\{}{{Heading text}}", cmd));
            for other in SECTIONING.iter().filter(|c| *c != cmd) {
                assert!(
                    !line.contains(&format!("\\{}{{", other)),
                    "{line} also contains {other}"
                );
            }
        }
    }

    #[test]
    fn six_hashes_is_a_paragraph() {
        let out = body("###### deep");
        assert!(!out.contains("\\section"));
        assert!(out.contains("\\#\\#\\#\\#\\#\\# deep"));
    }

    #[test]
    fn image_becomes_figure() {
        let out = body("![A chart](images\\chart.png)");
        assert!(out.contains("\\begin{figure}[htbp]"));
        assert!(out.contains("\\includegraphics[width=0.8\\textwidth]{images/chart.png}"));
        assert!(out.contains("\\caption{A chart}"));
        assert!(out.contains("\\end{figure}"));
    }

    #[test]
    fn malformed_image_passes_through() {
        let out = body("![broken](missing.png");
        assert!(!out.contains("figure"));
        assert!(out.contains("![broken](missing.png"));
    }

    #[test]
    fn code_block_with_language() {
        let out = body("```python\nx = a % b\n```");
        assert!(out.contains("\\begin{lstlisting}[language=python]\nx = a % b\n\\end{lstlisting}"));
    }

    #[test]
    fn code_block_without_language() {
        let out = body("```\nraw_text\n```");
        assert!(out.contains("\\begin{lstlisting}\nraw_text\n\\end{lstlisting}"));
    }

    #[test]
    fn unterminated_code_block_is_closed() {
        let out = body("```\nabc");
        assert!(out.trim_end().ends_with("\\end{lstlisting}"));
    }

    #[test]
    fn table_is_buffered_and_flushed() {
        let out = body("| A | B |\n|---|---|\n| 1 | 2 |\n| 3 |\nafter");
        assert!(out.contains("\\begin{tabular}{|c|c|}"));
        assert!(out.contains("A & B \\\\ \\hline\\hline"));
        assert!(out.contains("1 & 2 \\\\ \\hline"));
        assert!(out.contains("3 &  \\\\ \\hline"));
        let table_end = out.find("\\end{table}").unwrap();
        let after = out.find("after").unwrap();
        assert!(after > table_end, "line after the table is replayed after the flush");
        assert!(!out.contains("|---|"));
    }

    #[test]
    fn table_at_end_of_input_is_flushed() {
        let out = body("| A |\n| :-: |\n| x |");
        assert!(out.contains("\\end{table}"));
        assert!(out.contains("x \\\\ \\hline"));
    }

    #[test]
    fn table_with_unpiped_header_is_dropped_whole() {
        let out = body("a | b\n|---|---|\n| 1 | 2 |\nnext");
        assert!(!out.contains("tabular"));
        assert!(!out.contains("1 & 2"));
        assert!(out.contains("next"), "line after the dropped table is still processed");
    }

    #[test]
    fn pipe_without_separator_is_a_paragraph() {
        let out = body("a | b");
        assert!(!out.contains("tabular"));
        assert!(out.contains("a | b"));
    }

    #[test]
    fn pipes_inside_code_are_verbatim() {
        let out = body("```\n| a |\n|---|\n```");
        assert!(!out.contains("tabular"));
        assert!(out.contains("| a |\n|---|\n"));
    }

    #[test]
    fn blockquote_closes_and_replays() {
        let out = body("> first\n> second\n- item");
        assert_eq!(out.matches("\\begin{quote}").count(), 1);
        let end_quote = out.find("\\end{quote}").unwrap();
        let begin_list = out.find("\\begin{itemize}").unwrap();
        assert!(begin_list > end_quote);
        assert!(out.contains("\\item item"));
        assert!(out.contains("first\nsecond\n"));
    }

    #[test]
    fn blockquote_open_at_end_is_closed() {
        let out = body("> only");
        assert!(out.trim_end().ends_with("\\end{quote}"));
    }

    #[test]
    fn nested_unordered_list_counts() {
        let md = "- a\n- b\n  - c\n  - d\n- e";
        let out = body(md);
        let opens = out.matches("\\begin{itemize}").count();
        let closes = out.matches("\\end{itemize}").count();
        // max level 1 → 2, plus one level-decreasing transition
        assert_eq!(opens, 3);
        assert_eq!(closes, opens);
        assert_eq!(out.matches("\\item ").count(), 5);
    }

    #[test]
    fn ordered_list_and_blank_termination() {
        let out = body("1. one\n2. two\n\nafter");
        assert_eq!(out.matches("\\begin{enumerate}").count(), 1);
        assert_eq!(out.matches("\\end{enumerate}").count(), 1);
        let end = out.find("\\end{enumerate}").unwrap();
        assert!(out.find("after").unwrap() > end);
    }

    #[test]
    fn deep_first_item_opens_every_level() {
        let out = body("    - deep");
        assert_eq!(out.matches("\\begin{itemize}").count(), 3);
        assert_eq!(out.matches("\\end{itemize}").count(), 3);
    }

    #[test]
    fn switching_list_kind_closes_previous() {
        let out = body("- a\n1. b");
        let end_itemize = out.find("\\end{itemize}").unwrap();
        let begin_enum = out.find("\\begin{enumerate}").unwrap();
        assert!(begin_enum > end_itemize);
        assert_eq!(out.matches("\\end{enumerate}").count(), 1);
    }

    #[test]
    fn list_items_are_inline_formatted() {
        let out = body("- **bold** item\n1. 100% done");
        assert!(out.contains("\\item \\textbf{bold} item"));
        assert!(out.contains("\\item 100\\% done"));
    }

    #[test]
    fn paragraph_and_blank_lines() {
        let out = body("one\n\ntwo");
        assert_eq!(out, "one\n\n\ntwo\n\n");
    }

    #[test]
    fn crlf_input() {
        let out = body("# Title\r\nText\r\n");
        assert!(out.contains("\\section{Title}\n"));
        assert!(out.contains("Text\n\n"));
    }

    #[test]
    fn end_to_end_with_preamble() {
        let md = "# Title\nHello **world**.\n- a\n- b\n";
        let out = markdown_to_latex(md, &TranspileOptions::default());

        let expected = [
            "\\section{Title}",
            "Hello \\textbf{world}.",
            "\\begin{itemize}",
            "\\item a",
            "\\item b",
            "\\end{itemize}",
            "\\end{document}",
        ];
        let mut pos = 0;
        for needle in expected {
            let found = out[pos..]
                .find(needle)
                .unwrap_or_else(|| panic!("{needle} missing after byte {pos} in:\n{out}"));
            pos += found + needle.len();
        }
        assert!(out.trim_end().ends_with("\\end{document}"));
        assert_eq!(out.matches("\\documentclass").count(), 1);
    }

    #[test]
    fn no_preamble_means_no_wrappers() {
        let out = body("text");
        assert!(!out.contains("\\documentclass"));
        assert!(!out.contains("\\begin{document}"));
        assert!(!out.contains("\\end{document}"));
    }

    #[test]
    fn step_back_replays_line() {
        let mut t = Transpiler::new("a\nb");
        assert_eq!(t.advance(), Some("a"));
        t.step_back();
        assert_eq!(t.advance(), Some("a"));
        assert_eq!(t.peek(), Some("b"));
    }
}
