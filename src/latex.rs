//! LaTeX macro token walker.
//!
//! Finds backslash-prefixed command sequences in markdown text:
//!
//! - `\` followed by ASCII letters yields the maximal run, e.g. `\alpha`
//! - `\` followed by one ASCII punctuation character yields that pair, e.g. `\,`
//! - any other backslash (before whitespace, a digit, a non-ASCII character or
//!   the end of a line) is a stray and yields nothing
//!
//! Fenced code blocks are skipped unless they are MyST math blocks
//! (```` ```{math} ````). Inline code spans are scanned, since documentation
//! about notation routinely quotes macros as `` `\alpha` ``.
//!
//! Environments are not understood: `\begin{align}` yields `\begin` and the
//! environment name is ignored.

/// Returns every macro token in `text`, in order of appearance, with repeats.
#[must_use]
pub fn extract_macros(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut fence: Option<Fence> = None;

    for line in text.lines() {
        match fence {
            Some(open) => {
                if open.is_closed_by(line) {
                    fence = None;
                } else if open.math {
                    scan_line(line, &mut tokens);
                }
            }
            None => {
                if let Some(open) = Fence::parse(line) {
                    fence = Some(open);
                } else {
                    scan_line(line, &mut tokens);
                }
            }
        }
    }

    tokens
}

/// Appends the macro tokens of a single line to `out`.
fn scan_line<'a>(line: &'a str, out: &mut Vec<&'a str>) {
    let bytes = line.as_bytes();
    let mut pos = 0;

    while let Some(offset) = memchr::memchr(b'\\', &bytes[pos..]) {
        let start = pos + offset;
        let next = start + 1;

        match bytes.get(next) {
            Some(b) if b.is_ascii_alphabetic() => {
                let end = bytes[next..]
                    .iter()
                    .position(|c| !c.is_ascii_alphabetic())
                    .map_or(bytes.len(), |len| next + len);
                out.push(&line[start..end]);
                pos = end;
            }
            Some(b) if b.is_ascii_punctuation() => {
                // `\\` is consumed whole so the second backslash starts nothing
                out.push(&line[start..=next]);
                pos = next + 1;
            }
            _ => pos = next,
        }
    }
}

/// An open fenced code block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fence {
    marker: u8,
    len: usize,
    math: bool,
}

impl Fence {
    /// Parses an opening fence line (three or more backticks or tildes).
    fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim_start();
        let marker = *trimmed.as_bytes().first()?;
        if marker != b'`' && marker != b'~' {
            return None;
        }

        let len = trimmed.bytes().take_while(|&b| b == marker).count();
        if len < 3 {
            return None;
        }

        let info = trimmed[len..].trim();
        if marker == b'`' && info.contains('`') {
            return None;
        }

        let math = matches!(info.split_whitespace().next(), Some("math" | "{math}"));

        Some(Self { marker, len, math })
    }

    fn is_closed_by(&self, line: &str) -> bool {
        let trimmed = line.trim();
        trimmed.len() >= self.len && trimmed.bytes().all(|b| b == self.marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prose_with_inline_code() {
        let text = "The value `\\alpha` must exceed `\\beta` for convergence, as in \\ge 0.";
        assert_eq!(extract_macros(text), vec!["\\alpha", "\\beta", "\\ge"]);
    }

    #[test]
    fn test_symbol_macros() {
        let text = "$a\\,b\\;c\\!d \\{x\\}$";
        assert_eq!(extract_macros(text), vec!["\\,", "\\;", "\\!", "\\{", "\\}"]);
    }

    #[test]
    fn test_stray_backslashes() {
        let text = "C:\\ path, trailing \\\nnumbers \\1 and \\é";
        assert!(extract_macros(text).is_empty());
    }

    #[test]
    fn test_line_break_is_single_token() {
        let text = "a \\\\ b \\\\alpha";
        assert_eq!(extract_macros(text), vec!["\\\\", "\\\\"]);
    }

    #[test]
    fn test_macro_followed_by_argument() {
        let text = "$\\frac{1}{2}\\sqrt[3]{x}\\mathbb{R}^n$";
        assert_eq!(extract_macros(text), vec!["\\frac", "\\sqrt", "\\mathbb"]);
    }

    #[test]
    fn test_environment_is_not_understood() {
        let text = "$$\n\\begin{aligned}\nx &= \\mu \\\\\n\\end{aligned}\n$$";
        assert_eq!(
            extract_macros(text),
            vec!["\\begin", "\\mu", "\\\\", "\\end"]
        );
    }

    #[test]
    fn test_code_fence_is_skipped() {
        let text = "\\alpha\n```python\nprint('\\n')\nx = '\\beta'\n```\n\\gamma";
        assert_eq!(extract_macros(text), vec!["\\alpha", "\\gamma"]);
    }

    #[test]
    fn test_myst_code_cell_is_skipped() {
        let text = "```{code-cell} ipython3\nplt.title(r'$\\sigma$')\n```\n$\\tau$";
        assert_eq!(extract_macros(text), vec!["\\tau"]);
    }

    #[test]
    fn test_math_fence_is_scanned() {
        let text = "```{math}\n:label: eq-post\n\\pi(\\theta \\mid y)\n```\n";
        assert_eq!(extract_macros(text), vec!["\\pi", "\\theta", "\\mid"]);
    }

    #[test]
    fn test_tilde_fence_needs_matching_marker() {
        let text = "~~~~\n\\alpha\n```\n\\beta\n~~~~\n\\gamma";
        assert_eq!(extract_macros(text), vec!["\\gamma"]);
    }

    #[test]
    fn test_shorter_fence_does_not_close() {
        let text = "````\n```\n\\alpha\n````\n\\beta";
        assert_eq!(extract_macros(text), vec!["\\beta"]);
    }

    #[test]
    fn test_unclosed_fence_skips_rest() {
        let text = "\\alpha\n```\n\\beta\n\\gamma";
        assert_eq!(extract_macros(text), vec!["\\alpha"]);
    }

    #[test]
    fn test_inline_triple_backticks_are_not_a_fence() {
        let text = "``` `\\alpha` ```\n\\beta";
        assert_eq!(extract_macros(text), vec!["\\alpha", "\\beta"]);
    }

    #[test]
    fn test_repeats_are_kept() {
        let text = "\\alpha + \\alpha";
        assert_eq!(extract_macros(text), vec!["\\alpha", "\\alpha"]);
    }
}
