use pretty_assertions::assert_eq;
use radar_core::{hostname, sort_by_hostname, RadarItem};

#[test]
fn hostname_is_lowercased_and_empty_when_unparseable() {
    assert_eq!(hostname("https://Ben.Balter.com/posts"), "ben.balter.com");
    assert_eq!(hostname("http://127.0.0.1:1234/foo"), "127.0.0.1");
    assert_eq!(hostname("not a url"), "");
    assert_eq!(hostname("/relative/path"), "");
}

#[test]
fn sorts_by_host_and_keeps_ties_in_input_order() {
    let mut items = vec![
        RadarItem::new("g1", "https://google.com/a"),
        RadarItem::new("b", "https://ben.balter.com"),
        RadarItem::new("g2", "https://GOOGLE.com/b"),
        RadarItem::new("broken", "::not a url::"),
        RadarItem::new("g3", "https://google.com/c"),
        RadarItem::new("a", "https://ankify.krxiang.com"),
    ];
    sort_by_hostname(&mut items);

    let titles: Vec<_> = items.iter().map(|item| item.display_title()).collect();
    assert_eq!(titles, vec!["broken", "a", "b", "g1", "g2", "g3"]);
}

#[test]
fn sorting_sorted_input_changes_nothing() {
    let mut items = vec![
        RadarItem::new("a", "https://a.example"),
        RadarItem::new("b", "https://b.example"),
    ];
    let before = items.clone();
    sort_by_hostname(&mut items);
    assert_eq!(items, before);
}
