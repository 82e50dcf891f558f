use std::str::Lines;

use thiserror::Error;

use crate::RadarItem;

/// One `- [ ] [title](url)` line found in a text blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistLine {
    pub checked: bool,
    pub title: String,
    pub url: String,
}

impl ChecklistLine {
    pub fn into_item(self) -> RadarItem {
        RadarItem::new(self.title, self.url)
    }
}

/// A checklist-shaped line whose link could not be recovered. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unable to parse link [skip]: {line}")]
pub struct ParseWarning {
    pub line: String,
}

/// Lazy iterator over the checklist lines of a text blob, in source order.
///
/// Cloning yields an independent cursor, so a blob can be walked again
/// without re-reading it.
#[derive(Debug, Clone)]
pub struct Checklist<'a> {
    lines: Lines<'a>,
}

pub fn parse_checklist(text: &str) -> Checklist<'_> {
    Checklist {
        lines: text.lines(),
    }
}

impl<'a> Iterator for Checklist<'a> {
    type Item = Result<ChecklistLine, ParseWarning>;

    fn next(&mut self) -> Option<Self::Item> {
        for line in self.lines.by_ref() {
            let Some((checked, rest)) = split_checkbox(line) else {
                continue;
            };
            return Some(match parse_markdown_link(rest) {
                Some((title, url)) => Ok(ChecklistLine {
                    checked,
                    title: title.to_string(),
                    url: url.to_string(),
                }),
                None => Err(ParseWarning {
                    line: line.trim().to_string(),
                }),
            });
        }
        None
    }
}

/// Unchecked items of a blob plus the warnings for lines that were skipped.
pub fn unchecked_items(text: &str) -> (Vec<RadarItem>, Vec<ParseWarning>) {
    let mut items = Vec::new();
    let mut warnings = Vec::new();
    for entry in parse_checklist(text) {
        match entry {
            Ok(line) if !line.checked => items.push(line.into_item()),
            Ok(_) => {}
            Err(warning) => warnings.push(warning),
        }
    }
    (items, warnings)
}

/// Splits `[title](url)` using the first `[`, the last `](` and the last `)`.
///
/// Titles and URLs may themselves contain brackets and parentheses, e.g.
/// `[F) Sector 6 (NOC)](https://host/F)_Sector_6_(NOC))`.
pub fn parse_markdown_link(link: &str) -> Option<(&str, &str)> {
    let opening = link.find('[')?;
    let boundary = link.rfind("](")?;
    let closing = link.rfind(')')?;
    if boundary < opening || closing < boundary + 2 {
        return None;
    }
    let url = link[boundary + 2..closing].trim();
    if url.is_empty() {
        return None;
    }
    Some((link[opening + 1..boundary].trim(), url))
}

/// Matches `<ws>* (-|*) <ws>+ [ |x|X] (<ws>+ | end)` and returns the checked
/// flag plus the remainder of the line.
fn split_checkbox(line: &str) -> Option<(bool, &str)> {
    let rest = line.trim_start();
    let rest = rest.strip_prefix('-').or_else(|| rest.strip_prefix('*'))?;
    let trimmed = rest.trim_start();
    if trimmed.len() == rest.len() {
        return None;
    }
    let (checked, rest) = if let Some(rest) = trimmed.strip_prefix("[ ]") {
        (false, rest)
    } else if let Some(rest) = trimmed
        .strip_prefix("[x]")
        .or_else(|| trimmed.strip_prefix("[X]"))
    {
        (true, rest)
    } else {
        return None;
    };
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some((checked, rest.trim()))
}
