//! The fixed LaTeX preamble written ahead of every transpiled document.
//!
//! The preamble does not depend on the Markdown content. Only the title and
//! author lines are filled from [`crate::config::ConversionConfig`]; the date
//! is always `\today`. Title and author are escaped like body text.

use crate::pipeline::inline::escape_text;

/// Class and package declarations, page geometry, link colours and the
/// listing style used for fenced code blocks.
pub const PREAMBLE_HEAD: &str = r"\documentclass{article}
\usepackage[utf8]{inputenc}
\usepackage{graphicx}
\usepackage{hyperref}
\usepackage{amsmath}
\usepackage{amssymb}
\usepackage{listings}
\usepackage{xcolor}
\usepackage{booktabs}
\usepackage{geometry}
\usepackage{fancyhdr}
\usepackage{titlesec}
\usepackage{enumitem}

\geometry{margin=1in}
\definecolor{linkcolor}{RGB}{0,102,204}
\hypersetup{colorlinks=true, linkcolor=linkcolor, urlcolor=linkcolor}

\lstset{
  basicstyle=\ttfamily\small,
  breaklines=true,
  frame=single,
  numbers=left,
  numberstyle=\tiny\color{gray},
  keywordstyle=\color{blue},
  commentstyle=\color{green!60!black},
  stringstyle=\color{orange},
  showstringspaces=false
}
";

/// Closing line appended after the body when a preamble was emitted.
pub const DOCUMENT_END: &str = "\\end{document}\n";

/// Render the complete preamble, ending just after `\maketitle`.
pub fn render_preamble(title: &str, author: &str) -> String {
    let mut out = String::with_capacity(PREAMBLE_HEAD.len() + 128);
    out.push_str(PREAMBLE_HEAD);
    out.push('\n');
    out.push_str(&format!("\\title{{{}}}\n", escape_text(title)));
    out.push_str(&format!("\\author{{{}}}\n", escape_text(author)));
    out.push_str("\\date{\\today}\n\n");
    out.push_str("\\begin{document}\n");
    out.push_str("\\maketitle\n\n");
    out
}
