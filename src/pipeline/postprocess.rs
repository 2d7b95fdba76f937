//! Post-processing: deterministic cleanup of VLM image descriptions.
//!
//! Models sometimes wrap prose in code fences, emit CRLF line endings or
//! sprinkle zero-width characters despite the prompt. The rules below fix
//! those quirks without touching the words themselves.
//!
//! ## Rule Order
//!
//! Fences are stripped before line endings are normalised so the fence
//! regex sees the raw output; invisible characters go last so nothing
//! reintroduces them.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to a raw description.
///
/// Rules (applied in order):
/// 1. Strip outer code fences, with or without a language tag
/// 2. Normalise line endings (CRLF → LF)
/// 3. Trim trailing whitespace per line
/// 4. Collapse runs of blank lines to a single blank line
/// 5. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 6. Trim the result
pub fn clean_description(input: &str) -> String {
    let s = strip_outer_fences(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    s.trim().to_string()
}

// ── Rule 1: Strip outer fences ───────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[A-Za-z]*\r?\n(.*?)\r?\n```$").expect("valid fence regex")
});

fn strip_outer_fences(input: &str) -> String {
    let trimmed = input.trim();
    match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps[1].to_string(),
        None => trimmed.to_string(),
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse blank lines ─────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("valid blank-line regex"));

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 5: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_plain_and_tagged_fences() {
        assert_eq!(clean_description("```\nA bar chart.\n```"), "A bar chart.");
        assert_eq!(clean_description("```text\nA logo.\n```\n"), "A logo.");
        assert_eq!(clean_description("```markdown\r\nA map.\r\n```"), "A map.");
    }

    #[test]
    fn inner_fences_are_kept() {
        let input = "Code shown:\n```\nfn main() {}\n```\nEnd.";
        assert_eq!(clean_description(input), input);
    }

    #[test]
    fn crlf_and_trailing_spaces() {
        assert_eq!(clean_description("Line one.  \r\nLine two.\t"), "Line one.\nLine two.");
    }

    #[test]
    fn blank_runs_collapse_to_one() {
        assert_eq!(clean_description("A.\n\n\n\n\nB."), "A.\n\nB.");
    }

    #[test]
    fn invisible_chars_removed() {
        assert_eq!(clean_description("\u{FEFF}Pie\u{200B} chart\u{00AD}."), "Pie chart.");
    }

    #[test]
    fn empty_stays_empty() {
        assert_eq!(clean_description("  \n\n "), "");
    }
}
