//! Extraction of title/intro/closing from generated newsletter text.
//!
//! The rules are line-position heuristics inherited from the product's
//! observed behavior: first non-empty line is the subject, the next two
//! are the intro, the last two are the closing. They are deliberately kept
//! in one place so the edge cases (empty output, single-line output) stay
//! easy to reason about; the full text is always stored verbatim as the
//! body, so nothing is lost if a heuristic misfires.

pub const TITLE_MAX_CHARS: usize = 200;
pub const SECTION_MAX_CHARS: usize = 500;

/// Title, intro, and closing pulled out of a generated newsletter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDraft {
    pub title: String,
    pub intro: String,
    pub closing: String,
}

/// Parse generated text into its display fields.
///
/// Returns `None` when the text contains no non-empty line at all; the
/// caller treats that as a failed generation. With a single line, the
/// intro comes back empty and the closing repeats the title line; that
/// mirrors the "last two lines" rule rather than special-casing it away.
#[must_use]
pub fn parse_generated(text: &str) -> Option<ParsedDraft> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let first = lines.first()?;
    let title = truncate_chars(first.trim_start_matches('#').trim(), TITLE_MAX_CHARS);

    let intro = truncate_chars(
        &lines.iter().skip(1).take(2).copied().collect::<Vec<_>>().join(" "),
        SECTION_MAX_CHARS,
    );

    let closing_start = lines.len().saturating_sub(2);
    let closing = truncate_chars(&lines[closing_start..].join(" "), SECTION_MAX_CHARS);

    Some(ParsedDraft {
        title,
        intro,
        closing,
    })
}

/// Truncate to at most `max` characters on a char boundary.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_output_yields_none() {
        assert!(parse_generated("").is_none());
        assert!(parse_generated("\n\n   \n").is_none());
    }

    #[test]
    fn heading_markers_are_stripped_from_the_title() {
        let parsed = parse_generated("## This Week in Shipping\nbody").expect("parse");
        assert_eq!(parsed.title, "This Week in Shipping");
    }

    #[test]
    fn intro_is_the_next_two_lines() {
        let text = "Subject\nFirst intro line.\nSecond intro line.\nMiddle.\nPenultimate.\nLast.";
        let parsed = parse_generated(text).expect("parse");
        assert_eq!(parsed.intro, "First intro line. Second intro line.");
        assert_eq!(parsed.closing, "Penultimate. Last.");
    }

    #[test]
    fn blank_lines_are_ignored_for_positioning() {
        let text = "Subject\n\n\nIntro A\n\nIntro B\n\nClosing A\nClosing B\n\n";
        let parsed = parse_generated(text).expect("parse");
        assert_eq!(parsed.intro, "Intro A Intro B");
        assert_eq!(parsed.closing, "Closing A Closing B");
    }

    #[test]
    fn single_line_output_degrades_without_panicking() {
        let parsed = parse_generated("# Only a subject").expect("parse");
        assert_eq!(parsed.title, "Only a subject");
        assert_eq!(parsed.intro, "");
        assert_eq!(parsed.closing, "# Only a subject");
    }

    #[test]
    fn two_line_output_overlaps_title_and_closing() {
        let parsed = parse_generated("Subject\nOnly line").expect("parse");
        assert_eq!(parsed.intro, "Only line");
        assert_eq!(parsed.closing, "Subject Only line");
    }

    #[test]
    fn title_is_truncated_to_200_chars() {
        let long = "x".repeat(300);
        let parsed = parse_generated(&long).expect("parse");
        assert_eq!(parsed.title.chars().count(), TITLE_MAX_CHARS);
    }

    #[test]
    fn truncation_respects_multibyte_boundaries() {
        let long = "é".repeat(250);
        let parsed = parse_generated(&long).expect("parse");
        assert_eq!(parsed.title.chars().count(), TITLE_MAX_CHARS);
    }
}
