//! Radar core: pure checklist parsing, ordering and issue-body rendering.
mod checklist;
mod issue;
mod item;
mod render;
mod sort;

pub use checklist::{
    parse_checklist, parse_markdown_link, unchecked_items, Checklist, ChecklistLine, ParseWarning,
};
pub use issue::{
    issue_title, CreatedIssue, IssueNumber, IssueRef, NewIssue, RepoParseError, RepoRef,
    RotationResult,
};
pub use item::RadarItem;
pub use render::{render_body, RenderInput, NOTHING_TO_DO};
pub use sort::{hostname, sort_by_hostname};
