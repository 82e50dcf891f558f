use std::time::Duration;

use radar_core::{CreatedIssue, IssueNumber, IssueRef, NewIssue, RepoRef};
use radar_logging::radar_debug;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, CONTENT_TYPE, LINK};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::tracker::{IssueTracker, COMMENTS_PER_PAGE};
use crate::{CommentPage, FailureKind, TrackerError};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

#[derive(Debug, Clone)]
pub struct GitHubSettings {
    pub api_url: String,
    pub token: String,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl GitHubSettings {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Self::default()
        }
    }
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: String::new(),
            user_agent: concat!("radar/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// GitHub REST adapter for [`IssueTracker`]. One client per process, owned by
/// whoever constructs it.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    settings: GitHubSettings,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    items: Vec<ApiIssue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiIssue {
    pub(crate) number: u64,
    pub(crate) html_url: String,
    #[serde(default)]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) body: Option<String>,
    #[serde(default)]
    pub(crate) state: String,
}

#[derive(Debug, Deserialize)]
struct ApiComment {
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiRepository {
    #[serde(default)]
    pub(crate) description: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateIssueRequest<'a> {
    title: &'a str,
    body: &'a str,
    labels: &'a [String],
}

#[derive(Debug, Serialize)]
struct EditIssueRequest<'a> {
    state: &'a str,
}

impl GitHubClient {
    pub fn new(settings: GitHubSettings) -> Result<Self, TrackerError> {
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|err| TrackerError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, http })
    }

    fn endpoint(&self, path: &str) -> Result<Url, TrackerError> {
        let base = self.settings.api_url.trim_end_matches('/');
        Url::parse(&format!("{base}{path}"))
            .map_err(|err| TrackerError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        json_body: Option<String>,
    ) -> Result<(HeaderMap, Vec<u8>), TrackerError> {
        radar_debug!("github {} {}", method, url.path());
        let mut request = self
            .http
            .request(method, url)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if !self.settings.token.is_empty() {
            request = request.header(AUTHORIZATION, format!("Bearer {}", self.settings.token));
        }
        if let Some(body) = json_body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;

        if !status.is_success() {
            return Err(status_error(status, &headers, &bytes));
        }
        Ok((headers, bytes.to_vec()))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: Url,
    ) -> Result<(HeaderMap, T), TrackerError> {
        let (headers, bytes) = self.send(Method::GET, url, None).await?;
        let value = decode_json(&bytes)?;
        Ok((headers, value))
    }

    pub(crate) async fn get_issue(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<ApiIssue, TrackerError> {
        let url = self.endpoint(&format!("/repos/{}/{}/issues/{number}", repo.owner, repo.name))?;
        Ok(self.get_json(url).await?.1)
    }

    pub(crate) async fn get_pull(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<ApiIssue, TrackerError> {
        let url = self.endpoint(&format!("/repos/{}/{}/pulls/{number}", repo.owner, repo.name))?;
        Ok(self.get_json(url).await?.1)
    }

    pub(crate) async fn get_repository(
        &self,
        repo: &RepoRef,
    ) -> Result<ApiRepository, TrackerError> {
        let url = self.endpoint(&format!("/repos/{}/{}", repo.owner, repo.name))?;
        Ok(self.get_json(url).await?.1)
    }
}

#[async_trait::async_trait]
impl IssueTracker for GitHubClient {
    async fn find_latest_open_issue(
        &self,
        repo: &RepoRef,
        label: &str,
    ) -> Result<Option<IssueRef>, TrackerError> {
        let mut url = self.endpoint("/search/issues")?;
        url.query_pairs_mut()
            .append_pair("q", &search_query(repo, label))
            .append_pair("sort", "created")
            .append_pair("order", "desc")
            .append_pair("per_page", "100");

        let (_, result): (_, SearchResponse) = self.get_json(url).await?;
        Ok(result.items.into_iter().next().map(|issue| IssueRef {
            number: IssueNumber::new(issue.number),
            html_url: issue.html_url,
            body: issue.body.unwrap_or_default(),
            open: issue.state != "closed",
        }))
    }

    async fn list_comments(
        &self,
        repo: &RepoRef,
        issue: IssueNumber,
        page: u32,
    ) -> Result<CommentPage, TrackerError> {
        let mut url = self.endpoint(&format!(
            "/repos/{}/{}/issues/{issue}/comments",
            repo.owner, repo.name
        ))?;
        url.query_pairs_mut()
            .append_pair("sort", "created")
            .append_pair("direction", "asc")
            .append_pair("per_page", &COMMENTS_PER_PAGE.to_string())
            .append_pair("page", &page.to_string());

        let (headers, comments): (_, Vec<ApiComment>) = self.get_json(url).await?;
        let next_page = headers
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(next_page_from_link);
        Ok(CommentPage {
            bodies: comments
                .into_iter()
                .map(|comment| comment.body.unwrap_or_default())
                .collect(),
            next_page,
        })
    }

    async fn create_issue(
        &self,
        repo: &RepoRef,
        request: &NewIssue,
    ) -> Result<CreatedIssue, TrackerError> {
        let url = self.endpoint(&format!("/repos/{}/{}/issues", repo.owner, repo.name))?;
        let payload = encode_json(&CreateIssueRequest {
            title: &request.title,
            body: &request.body,
            labels: &request.labels,
        })?;
        let (_, bytes) = self.send(Method::POST, url, Some(payload)).await?;
        let created: ApiIssue = decode_json(&bytes)?;
        Ok(CreatedIssue {
            number: IssueNumber::new(created.number),
            html_url: created.html_url,
        })
    }

    async fn close_issue(&self, repo: &RepoRef, issue: IssueNumber) -> Result<(), TrackerError> {
        let url = self.endpoint(&format!("/repos/{}/{}/issues/{issue}", repo.owner, repo.name))?;
        let payload = encode_json(&EditIssueRequest { state: "closed" })?;
        self.send(Method::PATCH, url, Some(payload)).await?;
        Ok(())
    }
}

pub fn search_query(repo: &RepoRef, label: &str) -> String {
    format!("repo:{repo} is:open is:issue label:{label}")
}

/// Page number of the `rel="next"` entry of a `Link` header.
pub fn next_page_from_link(header: &str) -> Option<u32> {
    header.split(',').find_map(|entry| {
        let (target, params) = entry.split_once(';')?;
        let is_next = params
            .split(';')
            .any(|param| param.trim().replace(' ', "") == "rel=\"next\"");
        if !is_next {
            return None;
        }
        let target = target.trim().trim_start_matches('<').trim_end_matches('>');
        let url = Url::parse(target).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, value)| value.parse().ok())
    })
}

fn encode_json<T: Serialize>(value: &T) -> Result<String, TrackerError> {
    serde_json::to_string(value)
        .map_err(|err| TrackerError::new(FailureKind::Decode, err.to_string()))
}

fn decode_json<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, TrackerError> {
    serde_json::from_slice(bytes)
        .map_err(|err| TrackerError::new(FailureKind::Decode, err.to_string()))
}

fn status_error(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> TrackerError {
    let exhausted = headers
        .get("x-ratelimit-remaining")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim() == "0");
    let message = format!("{status}: {}", String::from_utf8_lossy(body).trim());
    if exhausted && matches!(status.as_u16(), 403 | 429) {
        TrackerError::new(FailureKind::RateLimited, message)
    } else {
        TrackerError::new(FailureKind::HttpStatus(status.as_u16()), message)
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> TrackerError {
    if err.is_timeout() {
        return TrackerError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return TrackerError::new(FailureKind::Decode, err.to_string());
    }
    TrackerError::new(FailureKind::Network, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_header_next_page() {
        let header = r#"<https://api.github.com/repos/o/n/issues/1887/comments?page=2>; rel="next", <https://api.github.com/repos/o/n/issues/1887/comments?page=5>; rel="last", <https://api.github.com/repos/o/n/issues/1887/comments?page=1>; rel="first""#;
        assert_eq!(next_page_from_link(header), Some(2));

        let last = r#"<https://api.github.com/repos/o/n/issues/1887/comments?page=1>; rel="prev", <https://api.github.com/repos/o/n/issues/1887/comments?page=2>; rel="last""#;
        assert_eq!(next_page_from_link(last), None);
        assert_eq!(next_page_from_link(""), None);
    }

    #[test]
    fn search_query_matches_label_and_state() {
        let repo = RepoRef::new("parkr-test", "radar-test");
        assert_eq!(
            search_query(&repo, "radar"),
            "repo:parkr-test/radar-test is:open is:issue label:radar"
        );
    }
}
