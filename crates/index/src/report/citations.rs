//! Citation extraction from model output.
//!
//! The report prompt asks the model to refer to articles as `[n]` and to end
//! with a `Sources: 1, 2` line. Both forms are read; numbers outside
//! `1..=count` are discarded so a citation can only point at an input.

use std::collections::BTreeSet;

const SOURCES_PREFIX: &str = "sources:";

/// Cited article numbers (1-based, ascending, deduplicated) within `1..=count`.
pub fn parse_citations(text: &str, count: usize) -> Vec<usize> {
    let mut numbers = BTreeSet::new();

    for line in text.lines() {
        if let Some(rest) = sources_line_body(line) {
            numbers.extend(integers(rest));
        }
    }

    let mut rest = text;
    while let Some(open) = rest.find('[') {
        let after = &rest[open + 1..];
        match after.find(']') {
            Some(close) => {
                let inner = &after[..close];
                if inner
                    .chars()
                    .all(|c| c.is_ascii_digit() || c == ',' || c.is_whitespace())
                {
                    numbers.extend(integers(inner));
                }
                rest = &after[close + 1..];
            }
            None => break,
        }
    }

    numbers
        .into_iter()
        .filter(|n| (1..=count).contains(n))
        .collect()
}

/// The answer text without its trailing `Sources:` line(s).
pub fn strip_sources_line(text: &str) -> String {
    text.lines()
        .filter(|line| sources_line_body(line).is_none())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn sources_line_body(line: &str) -> Option<&str> {
    let trimmed = line.trim().trim_start_matches(['*', '_', '#', '-', ' ']);
    let head = trimmed.get(..SOURCES_PREFIX.len())?;
    if head.eq_ignore_ascii_case(SOURCES_PREFIX) {
        Some(&trimmed[SOURCES_PREFIX.len()..])
    } else {
        None
    }
}

fn integers(text: &str) -> impl Iterator<Item = usize> + '_ {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
}
