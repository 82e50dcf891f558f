use radar_core::{unchecked_items, IssueRef, RadarItem, RepoRef};
use radar_logging::{radar_debug, radar_warn};
use tokio::time::Instant;

use crate::tracker::{with_deadline, IssueTracker};
use crate::TrackerError;

/// Unchecked items of a tracking issue, split by where they were found.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractedLinks {
    /// From the issue body, carried forward from earlier rotations.
    pub old_items: Vec<RadarItem>,
    /// From comments, oldest comment first.
    pub new_items: Vec<RadarItem>,
    /// Checklist lines that were skipped because their link was unreadable.
    pub skipped_lines: usize,
}

impl ExtractedLinks {
    pub fn is_empty(&self) -> bool {
        self.old_items.is_empty() && self.new_items.is_empty()
    }
}

/// Comment paging failed. `partial` holds whatever was collected first.
#[derive(Debug, Clone, thiserror::Error)]
#[error("failed to read comments of issue #{issue} (page {page}): {source}")]
pub struct ExtractionError {
    pub issue: u64,
    pub page: u32,
    pub partial: ExtractedLinks,
    #[source]
    pub source: TrackerError,
}

pub struct LinkExtractor<'a> {
    tracker: &'a dyn IssueTracker,
    deadline: Option<Instant>,
}

impl<'a> LinkExtractor<'a> {
    pub fn new(tracker: &'a dyn IssueTracker) -> Self {
        Self {
            tracker,
            deadline: None,
        }
    }

    /// Every page request fails with a timeout once `deadline` has passed.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Collects unchecked items from `issue` and all of its comment pages.
    /// No issue means nothing to collect.
    pub async fn extract(
        &self,
        repo: &RepoRef,
        issue: Option<&IssueRef>,
    ) -> Result<ExtractedLinks, ExtractionError> {
        let mut links = ExtractedLinks::default();
        let Some(issue) = issue else {
            return Ok(links);
        };

        links.skipped_lines += collect_blob(&issue.body, &mut links.old_items, "body");

        let mut page = 1;
        loop {
            let comments = with_deadline(
                self.deadline,
                self.tracker.list_comments(repo, issue.number, page),
            )
            .await;
            let comments = match comments {
                Ok(comments) => comments,
                Err(source) => {
                    return Err(ExtractionError {
                        issue: issue.number.as_u64(),
                        page,
                        partial: links,
                        source,
                    })
                }
            };

            radar_debug!(
                "{}#{}: comment page {} has {} comments",
                repo,
                issue.number,
                page,
                comments.bodies.len()
            );
            for body in &comments.bodies {
                links.skipped_lines += collect_blob(body, &mut links.new_items, "comment");
            }

            match comments.next_page {
                Some(next) if next > page => page = next,
                Some(next) => {
                    radar_warn!(
                        "{}#{}: ignoring non-advancing next page {} after page {}",
                        repo,
                        issue.number,
                        next,
                        page
                    );
                    break;
                }
                None => break,
            }
        }

        Ok(links)
    }
}

fn collect_blob(text: &str, into: &mut Vec<RadarItem>, source: &str) -> usize {
    let (items, warnings) = unchecked_items(text);
    for warning in &warnings {
        radar_warn!("{source}: {warning}");
    }
    into.extend(items);
    warnings.len()
}
