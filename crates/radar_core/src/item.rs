/// A single link the user wants to revisit.
///
/// Items have no identity across rotations; they are rebuilt from markdown on
/// every run. Equality is by `(title, url)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadarItem {
    pub title: Option<String>,
    pub url: String,
}

impl RadarItem {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            title: if title.trim().is_empty() {
                None
            } else {
                Some(title)
            },
            url: url.into(),
        }
    }

    pub fn untitled(url: impl Into<String>) -> Self {
        Self {
            title: None,
            url: url.into(),
        }
    }

    pub fn has_title(&self) -> bool {
        self.title.is_some()
    }

    /// Title to show in a rendered body: the stored title, else the URL.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.url)
    }
}
