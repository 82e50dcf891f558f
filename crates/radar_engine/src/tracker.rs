use std::future::Future;

use radar_core::{CreatedIssue, IssueNumber, IssueRef, NewIssue, RepoRef};
use tokio::time::Instant;

use crate::{CommentPage, FailureKind, TrackerError};

/// Comments requested per page; the most GitHub hands out at once.
pub const COMMENTS_PER_PAGE: u32 = 100;

/// The issue-tracker operations a rotation needs.
#[async_trait::async_trait]
pub trait IssueTracker: Send + Sync {
    /// Most recently created open issue carrying `label`, if any.
    async fn find_latest_open_issue(
        &self,
        repo: &RepoRef,
        label: &str,
    ) -> Result<Option<IssueRef>, TrackerError>;

    /// Comment bodies of `issue`, oldest first. Pages start at 1.
    async fn list_comments(
        &self,
        repo: &RepoRef,
        issue: IssueNumber,
        page: u32,
    ) -> Result<CommentPage, TrackerError>;

    async fn create_issue(
        &self,
        repo: &RepoRef,
        request: &NewIssue,
    ) -> Result<CreatedIssue, TrackerError>;

    async fn close_issue(&self, repo: &RepoRef, issue: IssueNumber) -> Result<(), TrackerError>;
}

/// Runs a tracker call, failing with [`FailureKind::Timeout`] once `deadline`
/// passes. `None` means no deadline.
pub(crate) async fn with_deadline<T, F>(
    deadline: Option<Instant>,
    call: F,
) -> Result<T, TrackerError>
where
    F: Future<Output = Result<T, TrackerError>>,
{
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, call)
            .await
            .unwrap_or_else(|_| {
                Err(TrackerError::new(
                    FailureKind::Timeout,
                    "rotation deadline elapsed",
                ))
            }),
        None => call.await,
    }
}
