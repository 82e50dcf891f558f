use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use thiserror::Error;

/// Issue number assigned by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IssueNumber(u64);

impl IssueNumber {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for IssueNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Repository in `owner/name` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("repository must look like owner/name, got {0:?}")]
pub struct RepoParseError(pub String);

impl FromStr for RepoRef {
    type Err = RepoParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self::new(owner, name))
            }
            _ => Err(RepoParseError(s.to_string())),
        }
    }
}

/// Snapshot of a tracking issue as reported by the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRef {
    pub number: IssueNumber,
    pub html_url: String,
    pub body: String,
    pub open: bool,
}

/// Request to open the next tracking issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedIssue {
    pub number: IssueNumber,
    pub html_url: String,
}

/// Outcome of one rotation.
///
/// `old_issue_closed` is `false` both when closing failed and when there was
/// no previous issue; `previous_issue` tells the two apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationResult {
    pub new_issue_url: String,
    pub new_issue_number: IssueNumber,
    pub previous_issue: Option<IssueNumber>,
    pub old_issue_closed: bool,
}

impl RotationResult {
    /// New issue exists but the previous one is still open.
    pub fn is_partial(&self) -> bool {
        self.previous_issue.is_some() && !self.old_issue_closed
    }
}

pub fn issue_title(date: NaiveDate) -> String {
    format!("Radar for {}", date.format("%Y-%m-%d"))
}
