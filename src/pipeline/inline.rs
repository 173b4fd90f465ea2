//! Inline formatting: Markdown spans → LaTeX commands, plus escaping.
//!
//! ## Rule Order
//!
//! Each rule is a global substitution over the whole text and later rules
//! see the output of earlier ones:
//!
//! 1. `` `code` ``           → `\texttt{code}`
//! 2. `**bold**`, `__bold__` → `\textbf{bold}`
//! 3. `*italic*`, `_italic_` → `\textit{italic}`
//! 4. `[text](url)`          → `\href{url}{text}`
//! 5. escape `% & $ # _ { } ~ ^` with a leading backslash
//!
//! Step 5 skips `_` for the *whole* string as soon as a bold or italic
//! command was produced, even for underscores outside the span.
//!
//! The backslashes and braces of the generated commands are written as
//! private-use placeholder characters while the rules run, so the escaping
//! pass only touches characters that came from the input. They are turned
//! back into `\`, `{` and `}` at the very end.

use once_cell::sync::Lazy;
use regex::Regex;

const CMD: char = '\u{E000}';
const OPEN: char = '\u{E001}';
const CLOSE: char = '\u{E002}';

/// Characters escaped with a leading backslash, in escaping order.
pub const SPECIAL_CHARS: [char; 9] = ['%', '&', '$', '#', '_', '{', '}', '~', '^'];

static RE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").unwrap());
static RE_BOLD_STAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").unwrap());
static RE_BOLD_UNDERSCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"__([^_]+)__").unwrap());
static RE_ITALIC_STAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*]+)\*").unwrap());
static RE_ITALIC_UNDERSCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_([^_]+)_").unwrap());
static RE_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());

/// Build a one-argument command with placeholder delimiters.
fn command(name: &str, arg: &str) -> String {
    format!("{CMD}{name}{OPEN}{arg}{CLOSE}")
}

fn wrap_all(re: &Regex, text: &str, name: &str) -> String {
    re.replace_all(text, |caps: &regex::Captures<'_>| command(name, &caps[1]))
        .into_owned()
}

/// Convert inline Markdown in `text` to LaTeX and escape special characters.
///
/// Never fails: constructs that do not match (an unclosed link, a lone `*`)
/// are left as literal text and only escaped.
pub fn format_inline(text: &str) -> String {
    // Placeholders must not leak in from the input.
    let s: String = text
        .chars()
        .filter(|c| !matches!(*c, CMD | OPEN | CLOSE))
        .collect();

    let s = wrap_all(&RE_CODE, &s, "texttt");
    let s = wrap_all(&RE_BOLD_STAR, &s, "textbf");
    let s = wrap_all(&RE_BOLD_UNDERSCORE, &s, "textbf");
    let s = wrap_all(&RE_ITALIC_STAR, &s, "textit");
    let s = wrap_all(&RE_ITALIC_UNDERSCORE, &s, "textit");
    let s = RE_LINK
        .replace_all(&s, |caps: &regex::Captures<'_>| {
            format!("{CMD}href{OPEN}{}{CLOSE}{OPEN}{}{CLOSE}", &caps[2], &caps[1])
        })
        .into_owned();

    let s = escape_special(&s);

    s.chars()
        .map(|c| match c {
            CMD => '\\',
            OPEN => '{',
            CLOSE => '}',
            other => other,
        })
        .collect()
}

/// Escape LaTeX-special characters, honouring the all-or-nothing `_` rule.
fn escape_special(text: &str) -> String {
    escape_chars(text, has_emphasis(text))
}

/// Backslash-escape every LaTeX special character in plain text.
///
/// ```
/// assert_eq!(xtox::pipeline::inline::escape_text("R&D 100%"), "R\\&D 100\\%");
/// ```
pub fn escape_text(text: &str) -> String {
    escape_chars(text, false)
}

fn escape_chars(text: &str, keep_underscores: bool) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        if SPECIAL_CHARS.contains(&c) && !(c == '_' && keep_underscores) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// `true` when a bold or italic command was produced.
fn has_emphasis(text: &str) -> bool {
    let bold = format!("{CMD}textbf{OPEN}");
    let italic = format!("{CMD}textit{OPEN}");
    text.contains(&bold) || text.contains(&italic)
}
