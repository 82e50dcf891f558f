#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use radar_core::{CreatedIssue, IssueNumber, IssueRef, NewIssue, RepoRef};
use radar_engine::{CommentPage, FailureKind, IssueTracker, TitleResolver, TrackerError};

pub fn repo() -> RepoRef {
    RepoRef::new("parkr", "radar")
}

pub fn issue_url(number: u64) -> String {
    format!("https://github.com/parkr/radar/issues/{number}")
}

pub fn open_issue(number: u64, body: &str) -> IssueRef {
    IssueRef {
        number: IssueNumber::new(number),
        html_url: issue_url(number),
        body: body.to_string(),
        open: true,
    }
}

pub fn page(bodies: &[&str], next_page: Option<u32>) -> CommentPage {
    CommentPage {
        bodies: bodies.iter().map(|body| body.to_string()).collect(),
        next_page,
    }
}

/// In-memory tracker. Comment pages are numbered from 1.
#[derive(Default)]
pub struct FakeTracker {
    pub previous: Option<IssueRef>,
    pub pages: Vec<CommentPage>,
    pub fail_search: bool,
    pub fail_page: Option<u32>,
    pub stall_page: Option<u32>,
    pub fail_create: bool,
    pub create_delay: Option<Duration>,
    pub fail_close: bool,

    pub search_calls: AtomicUsize,
    pub comment_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub close_calls: AtomicUsize,
    pub created: Mutex<Vec<NewIssue>>,
    pub closed: Mutex<Vec<IssueNumber>>,
    pub operations: Mutex<Vec<&'static str>>,
}

impl FakeTracker {
    pub fn with_previous(previous: IssueRef, pages: Vec<CommentPage>) -> Self {
        Self {
            previous: Some(previous),
            pages,
            ..Self::default()
        }
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> Vec<NewIssue> {
        self.created.lock().unwrap().clone()
    }

    pub fn operations(&self) -> Vec<&'static str> {
        self.operations.lock().unwrap().clone()
    }

    fn record(&self, counter: &AtomicUsize, operation: &'static str) {
        counter.fetch_add(1, Ordering::SeqCst);
        self.operations.lock().unwrap().push(operation);
    }
}

fn unavailable(what: &str) -> TrackerError {
    TrackerError::new(FailureKind::HttpStatus(502), format!("{what}: bad gateway"))
}

#[async_trait::async_trait]
impl IssueTracker for FakeTracker {
    async fn find_latest_open_issue(
        &self,
        _repo: &RepoRef,
        _label: &str,
    ) -> Result<Option<IssueRef>, TrackerError> {
        self.record(&self.search_calls, "search");
        if self.fail_search {
            return Err(unavailable("search"));
        }
        Ok(self.previous.clone())
    }

    async fn list_comments(
        &self,
        _repo: &RepoRef,
        _issue: IssueNumber,
        page: u32,
    ) -> Result<CommentPage, TrackerError> {
        self.record(&self.comment_calls, "comments");
        if self.stall_page == Some(page) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.fail_page == Some(page) {
            return Err(unavailable("comments"));
        }
        Ok(self
            .pages
            .get(page.saturating_sub(1) as usize)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_issue(
        &self,
        _repo: &RepoRef,
        request: &NewIssue,
    ) -> Result<CreatedIssue, TrackerError> {
        self.record(&self.create_calls, "create");
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_create {
            return Err(unavailable("create"));
        }
        self.created.lock().unwrap().push(request.clone());
        let number = self
            .previous
            .as_ref()
            .map_or(1, |issue| issue.number.as_u64() + 1);
        Ok(CreatedIssue {
            number: IssueNumber::new(number),
            html_url: issue_url(number),
        })
    }

    async fn close_issue(&self, _repo: &RepoRef, issue: IssueNumber) -> Result<(), TrackerError> {
        self.record(&self.close_calls, "close");
        if self.fail_close {
            return Err(unavailable("close"));
        }
        self.closed.lock().unwrap().push(issue);
        Ok(())
    }
}

/// Answers from a fixed map; unknown URLs hang until the caller gives up.
#[derive(Default)]
pub struct MapTitles {
    pub titles: HashMap<String, String>,
}

impl MapTitles {
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            titles: entries
                .iter()
                .map(|(url, title)| (url.to_string(), title.to_string()))
                .collect(),
        }
    }
}

#[async_trait::async_trait]
impl TitleResolver for MapTitles {
    async fn resolve(&self, url: &str) -> String {
        match self.titles.get(url) {
            Some(title) => title.clone(),
            None => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                url.to_string()
            }
        }
    }
}
