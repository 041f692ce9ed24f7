use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;

static DETAIL_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"/[A-Za-z]+/trademark/trademark-detail/[0-9A-Za-z]+/[^"'\s<>?#),;]+"#)
        .expect("detail link pattern is a valid regex")
});

/// Detail page paths referenced by a search results page, deduplicated,
/// in order of first appearance.
pub fn extract_detail_links(page_source: &str) -> Vec<String> {
    DETAIL_LINK_RE
        .find_iter(page_source)
        .map(|m| m.as_str().to_string())
        .unique()
        .collect()
}
