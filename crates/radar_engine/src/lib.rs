//! Radar engine: issue-tracker I/O, link extraction and the rotation cycle.
mod decode;
mod engine;
mod extract;
mod github;
mod rotation;
mod title;
mod tracker;
mod types;

pub use decode::decode_page;
pub use engine::{RotationEvent, RotationHandle, Trigger};
pub use extract::{ExtractedLinks, ExtractionError, LinkExtractor};
pub use github::{next_page_from_link, search_query, GitHubClient, GitHubSettings, DEFAULT_API_URL};
pub use rotation::{RotationController, RotationError, RotationSettings, DEFAULT_LABEL};
pub use title::{
    extract_title, is_binary_resource, is_private_host, TitleResolver, TitleSettings, UrlAsTitle,
    WebTitleResolver,
};
pub use tracker::{IssueTracker, COMMENTS_PER_PAGE};
pub use types::{CommentPage, FailureKind, TrackerError};
