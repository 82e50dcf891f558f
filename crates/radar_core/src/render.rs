use std::fmt::Write;

use crate::RadarItem;

pub const NOTHING_TO_DO: &str = "Nothing to do today. Nice work! :sparkles:";

const NEW_HEADING: &str = "## New:";
const PREVIOUS_HEADING: &str = "## *Previously:*";

/// Everything the next issue body is built from. Both buckets are expected to
/// be sorted already; rendering keeps their order.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderInput<'a> {
    pub new_items: &'a [RadarItem],
    pub old_items: &'a [RadarItem],
    pub previous_issue_url: Option<&'a str>,
    pub mention: &'a str,
}

/// Renders the body of the next tracking issue. Pure and deterministic.
pub fn render_body(input: &RenderInput<'_>) -> String {
    if input.new_items.is_empty() && input.old_items.is_empty() {
        return NOTHING_TO_DO.to_string();
    }

    let mut body = greeting(input.mention.trim());
    body.push('\n');
    push_section(&mut body, NEW_HEADING, input.new_items);
    push_section(&mut body, PREVIOUS_HEADING, input.old_items);
    if let Some(url) = input.previous_issue_url.filter(|url| !url.trim().is_empty()) {
        let _ = writeln!(body, "\n*Previously:* {}", url.trim());
    }
    body
}

fn greeting(mention: &str) -> String {
    if mention.is_empty() {
        "A new day! Here's what you have saved:".to_string()
    } else {
        format!("A new day, {mention}! Here's what you have saved:")
    }
}

fn push_section(body: &mut String, heading: &str, items: &[RadarItem]) {
    if items.is_empty() {
        return;
    }
    let _ = write!(body, "\n{heading}\n\n");
    for item in items {
        let _ = writeln!(
            body,
            "  * [ ] [{}]({})",
            escape_title(item.display_title()),
            item.url
        );
    }
}

/// Keeps a title on one line so the checklist grammar still matches it.
fn escape_title(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ")
}
