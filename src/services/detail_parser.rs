use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::domain::detail_record::{compose_owner, DetailRecord, TrademarkStatus};

const APPLICATION_NUMBER_LABELS: [&str; 3] =
    ["application number", "serial number", "application no"];
const WORD_MARK_LABELS: [&str; 1] = ["word mark"];
const FILING_DATE_LABELS: [&str; 2] = ["filing date", "application date"];
const OWNER_LABELS: [&str; 2] = ["owner", "applicant"];
const OWNER_BLOCK_TAGS: [&str; 4] = ["div", "p", "li", "span"];

static ROW_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("tr is a valid selector"));
static TABLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("table is a valid selector"));

// hyphen runs ending in a greater-than sign or entity, or an arrow glyph
static ARROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*(?:-+\s*(?:>|&gt;|＞|›)|→|&rarr;)\s*")
        .expect("arrow pattern is a valid regex")
});
static LIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\blive\b").expect("live pattern is a valid regex"));
static DEAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bdead\b").expect("dead pattern is a valid regex"));
static CURRENT_STATUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    // at most an inline closing tag and one label-to-value cell boundary
    Regex::new(concat!(
        r"(?i)Current Status\s*:?\s*",
        r"(?:</(?:b|strong|span|label)>\s*)?",
        r"(?:</t[hd]>\s*<t[hd][^>]*>\s*)?",
        r"([^<\r\n]*)",
    ))
    .expect("current status pattern is a valid regex")
});
static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bclass(?:\s|&nbsp;|&#160;)+(\d{3})\b")
        .expect("class pattern is a valid regex")
});

/// Label/value rows of every table on a detail page.
pub struct LabelTable<'a> {
    rows: Vec<(String, ElementRef<'a>)>,
}

impl<'a> LabelTable<'a> {
    pub fn from_document(document: &'a Html) -> Self {
        let rows = document
            .select(&ROW_SELECTOR)
            .filter_map(|row| {
                let mut cells = row
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|cell| matches!(cell.value().name(), "th" | "td"));
                let label = cells.next()?;
                let value = cells.next()?;
                // layout rows wrapping whole inner tables are not label rows
                if label.select(&TABLE_SELECTOR).next().is_some() {
                    return None;
                }
                Some((element_text(label).to_lowercase(), value))
            })
            .collect();

        LabelTable { rows }
    }

    /// Value cell of the first row whose label contains any of `labels`.
    pub fn value_cell(&self, labels: &[&str]) -> Option<ElementRef<'a>> {
        self.rows
            .iter()
            .find(|(label, _)| labels.iter().any(|l| label.contains(l)))
            .map(|(_, value)| *value)
    }

    pub fn value(&self, labels: &[&str]) -> String {
        self.value_cell(labels)
            .map(element_text)
            .unwrap_or_default()
    }
}

/// Collapses non-breaking spaces and whitespace runs, then trims.
pub fn clean_text(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace('\u{a0}', " ")
        .split_whitespace()
        .join(" ")
}

// text nodes are space-joined so `<br>`-separated lines stay apart
fn element_text(element: ElementRef) -> String {
    clean_text(&element.text().join(" "))
}

fn fragment_text(html: &str) -> String {
    element_text(Html::parse_fragment(html).root_element())
}

pub fn strip_arrows(text: &str) -> String {
    clean_text(&ARROW_RE.replace_all(text, " "))
}

/// Splits a flattened owner cell on its arrow separator into
/// `(owner_name, owner_address)`.
pub fn split_owner(text: &str) -> (String, String) {
    let mut segments = ARROW_RE
        .split(text)
        .map(clean_text)
        .filter(|s| !s.is_empty());

    let name = segments.next().unwrap_or_default();
    let address = segments.join(" ");
    (name, address)
}

/// Owner name and address from the owner cell: one structural child block per
/// line when present, the arrow-separated flat text otherwise.
pub fn extract_owner(cell: ElementRef) -> (String, String) {
    let blocks: Vec<String> = cell
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| OWNER_BLOCK_TAGS.contains(&child.value().name()))
        .map(|child| strip_arrows(&element_text(child)))
        .filter(|text| !text.is_empty())
        .collect();

    match blocks.split_first() {
        Some((name, rest)) => (name.to_string(), strip_arrows(&rest.join(" "))),
        None => split_owner(&element_text(cell)),
    }
}

/// Whole-word LIVE/DEAD check over the raw markup. When both occur, the one
/// appearing first in the document wins.
pub fn extract_status(page_source: &str) -> TrademarkStatus {
    let live = LIVE_RE.find(page_source).map(|m| m.start());
    let dead = DEAD_RE.find(page_source).map(|m| m.start());

    match (live, dead) {
        (Some(l), Some(d)) if d < l => TrademarkStatus::Dead,
        (Some(_), _) => TrademarkStatus::Live,
        (None, Some(_)) => TrademarkStatus::Dead,
        (None, None) => TrademarkStatus::Unknown,
    }
}

pub fn extract_status_description(page_source: &str) -> String {
    CURRENT_STATUS_RE
        .captures(page_source)
        .and_then(|caps| caps.get(1))
        .map(|m| fragment_text(m.as_str()))
        .unwrap_or_default()
}

/// `Class NNN` codes anywhere in the markup, first occurrence order.
pub fn extract_classes(page_source: &str) -> Vec<String> {
    CLASS_RE
        .captures_iter(page_source)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unique()
        .collect()
}

/// Parses one detail page. Every field is best effort; a missing field is
/// left empty. `detail_url` is left for the caller to attach.
pub fn parse_detail(page_source: &str) -> DetailRecord {
    let document = Html::parse_document(page_source);
    let table = LabelTable::from_document(&document);

    let (owner_name, owner_address) = table
        .value_cell(&OWNER_LABELS)
        .map(extract_owner)
        .unwrap_or_default();

    DetailRecord {
        application_number: table.value(&APPLICATION_NUMBER_LABELS),
        word_mark: table.value(&WORD_MARK_LABELS),
        owner: compose_owner(&owner_name, &owner_address),
        owner_name,
        owner_address,
        filing_date: table.value(&FILING_DATE_LABELS),
        status: extract_status(page_source),
        status_description: extract_status_description(page_source),
        classes: extract_classes(page_source),
        detail_url: String::new(),
        error: None,
    }
}
