use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use radar_core::{
    issue_title, render_body, sort_by_hostname, IssueNumber, NewIssue, RadarItem, RenderInput,
    RepoRef, RotationResult,
};
use radar_logging::{radar_debug, radar_error, radar_info, radar_warn};
use tokio::time::Instant;

use crate::extract::{ExtractionError, LinkExtractor};
use crate::title::TitleResolver;
use crate::tracker::{with_deadline, IssueTracker};
use crate::TrackerError;

pub const DEFAULT_LABEL: &str = "radar";

#[derive(Debug, Clone)]
pub struct RotationSettings {
    pub repo: RepoRef,
    pub label: String,
    /// Bound for the whole cycle: search, comment paging, create and close.
    pub timeout: Duration,
    /// Per-item bound on title lookups; a slow page keeps its URL.
    pub title_timeout: Duration,
    pub title_concurrency: usize,
    /// Part of `timeout` that title lookups never use, kept for creating the
    /// new issue and closing the old one.
    pub write_reserve: Duration,
}

impl RotationSettings {
    pub fn new(repo: RepoRef) -> Self {
        Self {
            repo,
            label: DEFAULT_LABEL.to_string(),
            timeout: Duration::from_secs(60),
            title_timeout: Duration::from_secs(10),
            title_concurrency: 4,
            write_reserve: Duration::from_secs(20),
        }
    }
}

/// Why a cycle failed. Nothing was written to the tracker in any of these
/// cases, so the whole cycle is safe to retry.
#[derive(Debug, thiserror::Error)]
pub enum RotationError {
    #[error("{repo}: searching for the open {label:?} issue failed: {source}")]
    Search {
        repo: RepoRef,
        label: String,
        source: TrackerError,
    },
    #[error("{repo}: reading the {label:?} issue failed: {source}")]
    Extraction {
        repo: RepoRef,
        label: String,
        source: ExtractionError,
    },
    #[error("{repo}: creating the next {label:?} issue failed, previous issue {} left open: {source}", previous_label(.previous))]
    Creation {
        repo: RepoRef,
        label: String,
        previous: Option<IssueNumber>,
        source: TrackerError,
    },
}

/// Runs rotation cycles against one repository. Not meant to be shared by
/// concurrent callers: two overlapping cycles could both see the same
/// previous issue and open two successors.
pub struct RotationController {
    tracker: Arc<dyn IssueTracker>,
    titles: Arc<dyn TitleResolver>,
    settings: RotationSettings,
}

impl RotationController {
    pub fn new(
        tracker: Arc<dyn IssueTracker>,
        titles: Arc<dyn TitleResolver>,
        settings: RotationSettings,
    ) -> Self {
        Self {
            tracker,
            titles,
            settings,
        }
    }

    pub fn settings(&self) -> &RotationSettings {
        &self.settings
    }

    /// One full cycle: find the open issue, carry its unchecked items into a
    /// new issue, then close it. The new issue is created before the old one
    /// is touched; failing to close is logged and reported, not returned.
    pub async fn run_rotation(&self, mention: &str) -> Result<RotationResult, RotationError> {
        let deadline = Instant::now() + self.settings.timeout;
        let repo = &self.settings.repo;
        let label = &self.settings.label;

        let previous = with_deadline(
            Some(deadline),
            self.tracker.find_latest_open_issue(repo, label),
        )
        .await
        .map_err(|source| {
            radar_error!("{repo}: search for open issue labelled {label:?} failed: {source}");
            RotationError::Search {
                repo: repo.clone(),
                label: label.clone(),
                source,
            }
        })?;
        let previous_number = previous.as_ref().map(|issue| issue.number);
        match &previous {
            Some(issue) => radar_info!("{repo}: rotating issue #{} {}", issue.number, issue.html_url),
            None => radar_info!("{repo}: no open issue labelled {label:?}, opening the first one"),
        }

        let mut links = LinkExtractor::new(self.tracker.as_ref())
            .with_deadline(deadline)
            .extract(repo, previous.as_ref())
            .await
            .map_err(|source| {
                radar_error!(
                    "{repo}: reading issue #{} (label {label:?}) failed: {source}; \
                     {} items read before the failure were discarded",
                    source.issue,
                    source.partial.old_items.len() + source.partial.new_items.len()
                );
                RotationError::Extraction {
                    repo: repo.clone(),
                    label: label.clone(),
                    source,
                }
            })?;
        if links.skipped_lines > 0 {
            radar_warn!("{repo}: skipped {} unreadable checklist lines", links.skipped_lines);
        }

        sort_by_hostname(&mut links.new_items);
        sort_by_hostname(&mut links.old_items);
        let titles_until = deadline
            .checked_sub(self.settings.write_reserve)
            .unwrap_or_else(Instant::now);
        self.fill_missing_titles(&mut links.new_items, titles_until).await;
        self.fill_missing_titles(&mut links.old_items, titles_until).await;

        let body = render_body(&RenderInput {
            new_items: &links.new_items,
            old_items: &links.old_items,
            previous_issue_url: previous.as_ref().map(|issue| issue.html_url.as_str()),
            mention,
        });
        let request = NewIssue {
            title: issue_title(chrono::Local::now().date_naive()),
            body,
            labels: vec![label.clone()],
        };

        let created = with_deadline(Some(deadline), self.tracker.create_issue(repo, &request))
            .await
            .map_err(|source| {
                radar_error!(
                    "{repo}: creating issue (label {label:?}) failed, previous issue {} left open: {source}",
                    previous_label(&previous_number)
                );
                RotationError::Creation {
                    repo: repo.clone(),
                    label: label.clone(),
                    previous: previous_number,
                    source,
                }
            })?;
        radar_info!(
            "{repo}: created issue #{} {} ({} new, {} carried over)",
            created.number,
            created.html_url,
            links.new_items.len(),
            links.old_items.len()
        );

        let old_issue_closed = match previous_number {
            None => false,
            Some(number) => {
                match with_deadline(Some(deadline), self.tracker.close_issue(repo, number)).await {
                    Ok(()) => {
                        radar_info!("{repo}: closed issue #{number}");
                        true
                    }
                    Err(err) => {
                        radar_warn!(
                            "{repo}: error closing issue number={number}: {err}; \
                             close it by hand, #{} already replaces it",
                            created.number
                        );
                        false
                    }
                }
            }
        };

        Ok(RotationResult {
            new_issue_url: created.html_url,
            new_issue_number: created.number,
            previous_issue: previous_number,
            old_issue_closed,
        })
    }

    /// Looks up titles for untitled items. Items whose lookup does not finish
    /// by `until` stay untitled and render as their URL.
    async fn fill_missing_titles(&self, items: &mut [RadarItem], until: Instant) {
        let pending: Vec<(usize, String)> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| !item.has_title())
            .map(|(idx, item)| (idx, item.url.clone()))
            .collect();
        if pending.is_empty() {
            return;
        }
        if until <= Instant::now() {
            radar_debug!("no time left for title lookups, {} items keep their URL", pending.len());
            return;
        }

        let per_item = self.settings.title_timeout;
        let titles = self.titles.as_ref();
        let resolved: Vec<(usize, Option<String>)> = futures_util::stream::iter(pending)
            .map(|(idx, url)| async move {
                let item_until = (Instant::now() + per_item).min(until);
                let title = tokio::time::timeout_at(item_until, titles.resolve(&url))
                    .await
                    .ok();
                (idx, title)
            })
            .buffer_unordered(self.settings.title_concurrency.max(1))
            .collect()
            .await;

        for (idx, title) in resolved {
            if let Some(title) = title.filter(|title| !title.trim().is_empty()) {
                items[idx].title = Some(title);
            }
        }
    }
}

fn previous_label(previous: &Option<IssueNumber>) -> String {
    previous.map_or_else(|| "none".to_string(), |number| format!("#{number}"))
}
