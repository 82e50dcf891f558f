use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use radar_core::RepoRef;
use radar_logging::radar_debug;
use reqwest::header::CONTENT_TYPE;
use scraper::{Html, Selector};
use url::{Host, Url};

use crate::decode::decode_page;
use crate::github::{map_reqwest_error, GitHubClient};
use crate::{FailureKind, TrackerError};

/// Turns a URL into something a person can read. Never fails: the worst
/// answer is a placeholder naming the host, or the URL itself.
#[async_trait::async_trait]
pub trait TitleResolver: Send + Sync {
    async fn resolve(&self, url: &str) -> String;
}

/// Resolver that never touches the network and answers with the URL.
#[derive(Debug, Default, Clone, Copy)]
pub struct UrlAsTitle;

#[async_trait::async_trait]
impl TitleResolver for UrlAsTitle {
    async fn resolve(&self, url: &str) -> String {
        url.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct TitleSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    /// Only this much of a page is read; titles live near the top.
    pub max_bytes: u64,
    pub allow_private_hosts: bool,
}

impl Default for TitleSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            redirect_limit: 5,
            max_bytes: 512 * 1024,
            allow_private_hosts: false,
        }
    }
}

const PARSABLE_CONTENT_TYPES: &[&str] = &[
    "text/html",
    "text/xhtml",
    "text/xml",
    "application/xhtml+xml",
];

const PARSABLE_EXTENSIONS: &[&str] = &["html", "xhtml", "htm"];

/// Looks titles up on the web, and through the GitHub API for github.com
/// repositories, issues and pull requests when a client is attached.
#[derive(Debug, Clone)]
pub struct WebTitleResolver {
    settings: TitleSettings,
    http: reqwest::Client,
    github: Option<GitHubClient>,
}

impl WebTitleResolver {
    pub fn new(settings: TitleSettings) -> Result<Self, TrackerError> {
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .build()
            .map_err(|err| TrackerError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            settings,
            http,
            github: None,
        })
    }

    pub fn with_github(mut self, github: GitHubClient) -> Self {
        self.github = Some(github);
        self
    }

    async fn github_title(&self, reference: &GitHubReference) -> Option<String> {
        let github = self.github.as_ref()?;
        let result = match reference {
            GitHubReference::Repository(repo) => github
                .get_repository(repo)
                .await
                .map(|found| found.description.map(|desc| format!("{repo}: {desc}"))),
            GitHubReference::Issue(repo, number) => github.get_issue(repo, *number).await.map(
                |issue| Some(format!("{} - Issue #{number} - {repo}", issue.title)),
            ),
            GitHubReference::Pull(repo, number) => github.get_pull(repo, *number).await.map(
                |pull| Some(format!("{} - Pull request #{number} - {repo}", pull.title)),
            ),
        };
        match result {
            Ok(title) => title,
            Err(err) => {
                radar_debug!("github title lookup for {:?} failed: {}", reference, err);
                None
            }
        }
    }

    async fn fetch_page(&self, url: Url) -> Result<PageFetch, TrackerError> {
        let path = url.path().to_string();
        let response = self.http.get(url).send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TrackerError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if is_binary_resource(content_type.as_deref(), &path) {
            return Ok(PageFetch::Binary);
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let room = (self.settings.max_bytes as usize).saturating_sub(bytes.len());
            bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
            if bytes.len() as u64 >= self.settings.max_bytes {
                break;
            }
        }

        let text = decode_page(&bytes, content_type.as_deref());
        Ok(PageFetch::Html(extract_title(&text)))
    }
}

enum PageFetch {
    Binary,
    Html(Option<String>),
}

#[async_trait::async_trait]
impl TitleResolver for WebTitleResolver {
    async fn resolve(&self, url: &str) -> String {
        let Ok(mut parsed) = Url::parse(url.trim()) else {
            return url.to_string();
        };
        let Some(host) = parsed.host().map(|host| display_host(&host)) else {
            return url.to_string();
        };

        if host == "github.com" {
            if let Some(reference) = github_reference(parsed.path()) {
                if let Some(title) = self.github_title(&reference).await {
                    return title;
                }
            }
        }

        let private = parsed.host().is_some_and(|h| is_private_host(&h));
        if private && !self.settings.allow_private_hosts {
            return format!("A private page on {host}");
        }

        let _ = parsed.set_username("");
        let _ = parsed.set_password(None);
        match self.fetch_page(parsed).await {
            Ok(PageFetch::Html(Some(title))) => title,
            Ok(PageFetch::Html(None)) => format!("A page on {host}"),
            Ok(PageFetch::Binary) => format!("File on {host}"),
            Err(err) => {
                radar_debug!("title fetch for {} failed: {}", url, err);
                format!("A page on {host}")
            }
        }
    }
}

/// First non-empty `<title>` of a document, whitespace collapsed.
pub fn extract_title(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;
    doc.select(&selector)
        .map(|node| {
            node.text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .find(|title| !title.is_empty())
}

/// Whether a response is something other than a page we can read a title
/// from. Without a content type, the path extension decides.
pub fn is_binary_resource(content_type: Option<&str>, path: &str) -> bool {
    if let Some(content_type) = content_type.filter(|ct| !ct.trim().is_empty()) {
        let lowered = content_type.to_ascii_lowercase();
        return !PARSABLE_CONTENT_TYPES
            .iter()
            .any(|parsable| lowered.contains(parsable));
    }
    match Path::new(path).extension().and_then(|ext| ext.to_str()) {
        None => false,
        Some(ext) => !PARSABLE_EXTENSIONS
            .iter()
            .any(|parsable| parsable.eq_ignore_ascii_case(ext)),
    }
}

/// Loopback, RFC1918, link-local and unique-local addresses, plus
/// `localhost`, `*.local` and `*.localhost` names.
pub fn is_private_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(name) => {
            let name = name.to_ascii_lowercase();
            name == "localhost" || name.ends_with(".local") || name.ends_with(".localhost")
        }
        Host::Ipv4(addr) => is_private_v4(addr),
        Host::Ipv6(addr) => is_private_v6(addr),
    }
}

fn is_private_v4(addr: &Ipv4Addr) -> bool {
    addr.is_loopback() || addr.is_private() || addr.is_link_local()
}

fn is_private_v6(addr: &Ipv6Addr) -> bool {
    let first = addr.segments()[0];
    addr.is_loopback() || (first & 0xffc0) == 0xfe80 || (first & 0xfe00) == 0xfc00
}

fn display_host(host: &Host<&str>) -> String {
    match host {
        Host::Domain(name) => name.to_string(),
        Host::Ipv4(addr) => addr.to_string(),
        Host::Ipv6(addr) => addr.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum GitHubReference {
    Repository(RepoRef),
    Issue(RepoRef, u64),
    Pull(RepoRef, u64),
}

/// `/owner/name`, `/owner/name/issues/N` and `/owner/name/pull/N[/files]`.
fn github_reference(path: &str) -> Option<GitHubReference> {
    let path = path.trim_matches('/');
    let path = path.strip_suffix("/files").unwrap_or(path);
    let pieces: Vec<&str> = path.split('/').collect();
    match pieces.as_slice() {
        [owner, name] if !owner.is_empty() && !name.is_empty() => {
            Some(GitHubReference::Repository(RepoRef::new(*owner, *name)))
        }
        [owner, name, kind, number] => {
            let number = number.parse().ok()?;
            let repo = RepoRef::new(*owner, *name);
            match *kind {
                "issues" => Some(GitHubReference::Issue(repo, number)),
                "pull" => Some(GitHubReference::Pull(repo, number)),
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn github_paths_map_to_references() {
        let repo = RepoRef::new("parkr", "radar");
        assert_eq!(
            github_reference("/parkr/radar"),
            Some(GitHubReference::Repository(repo.clone()))
        );
        assert_eq!(
            github_reference("/parkr/radar/issues/1"),
            Some(GitHubReference::Issue(repo.clone(), 1))
        );
        assert_eq!(
            github_reference("/parkr/radar/pull/2/files"),
            Some(GitHubReference::Pull(repo, 2))
        );
        assert_eq!(github_reference("/parkr/radar/blob/master"), None);
        assert_eq!(github_reference("/parkr"), None);
        assert_eq!(github_reference("/"), None);
    }

    #[test]
    fn private_hosts() {
        let cases = [
            ("http://localhost/foo", true),
            ("http://server.local/foo", true),
            ("https://myapp.localhost/foo", true),
            ("http://127.0.0.1:1234/foo", true),
            ("http://10.0.0.1", true),
            ("http://172.16.0.1", true),
            ("http://192.168.0.1", true),
            ("http://169.254.0.1", true),
            ("http://[::1]/", true),
            ("http://[fe80::]/", true),
            ("http://[fc00::]/", true),
            ("http://129.129.129.129", false),
            ("http://0.0.0.0", false),
            ("https://example.com", false),
        ];
        for (input, expected) in cases {
            let url = Url::parse(input).unwrap();
            let host = url.host().unwrap();
            assert_eq!(is_private_host(&host), expected, "host of {input}");
        }
    }

    #[test]
    fn binary_resources() {
        assert!(is_binary_resource(None, "/hi.pdf"));
        assert!(!is_binary_resource(None, "/hi.html"));
        assert!(!is_binary_resource(None, "/no/extension"));
        assert!(!is_binary_resource(Some("text/html; charset=utf-8"), "/x.pdf"));
        assert!(is_binary_resource(Some("text/plain"), "/"));
    }

    #[test]
    fn title_extraction_trims_and_skips_empty() {
        assert_eq!(
            extract_title("<html><head><title>\n  Example\n Domain </title></head></html>"),
            Some("Example Domain".to_string())
        );
        assert_eq!(extract_title("<html><head><title> </title></head></html>"), None);
        assert_eq!(extract_title("<p>no title</p>"), None);
    }
}
