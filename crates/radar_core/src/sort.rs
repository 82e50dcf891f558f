use url::Url;

use crate::RadarItem;

/// Lowercased host of `url`, or an empty string when it has none.
pub fn hostname(url: &str) -> String {
    Url::parse(url.trim())
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_ascii_lowercase))
        .unwrap_or_default()
}

/// Stable sort by hostname. Items sharing a host keep their input order and
/// items without a parseable host sort first.
pub fn sort_by_hostname(items: &mut Vec<RadarItem>) {
    let mut keyed: Vec<(String, RadarItem)> = items
        .drain(..)
        .map(|item| (hostname(&item.url), item))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| a.cmp(b));
    items.extend(keyed.into_iter().map(|(_, item)| item));
}
