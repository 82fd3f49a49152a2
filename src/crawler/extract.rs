//! Pure extraction over fetched HTML. Counter scans are case-insensitive
//! regexes over anchor text inside the main container; the language breakdown
//! comes from the section headed "Languages".

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use crate::error::CrawlerError;
use octogauge_schema::{Language, ScrapeStats};

static COMMITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([\d,]+)\s+commits?").expect("commits regex"));
static RELEASES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)releases\s+([\d,]+)").expect("releases regex"));
static CONTRIBUTORS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)contributors\s+([\d,]+)").expect("contributors regex"));
static BRANCHES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([\d,]+)\s+branch(?:es)?").expect("branches regex"));
static TAGS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([\d,]+)\s+tags?").expect("tags regex"));
static LANGUAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\p{L}+#\-\s]+)\s+([\d.]+)%").expect("language regex"));

/// Expected number of counter keys after both pages are scanned.
const COUNTER_KEYS: usize = 5;

/// Counters pulled from the overview page before validation.
#[derive(Debug, Default)]
pub(crate) struct PageScan {
    pub(crate) commits: Option<u64>,
    pub(crate) releases: Option<u64>,
    pub(crate) contributors: Option<u64>,
    pub(crate) languages: Vec<Language>,
}

pub(crate) fn scan_overview(html: &str) -> PageScan {
    let doc = Html::parse_document(html);
    let mut scan = PageScan::default();
    let Ok(anchors) = Selector::parse("main a") else {
        return scan;
    };
    for anchor in doc.select(&anchors) {
        let text = normalize_ws(&anchor.text().collect::<String>());
        if scan.commits.is_none() {
            scan.commits = capture_count(&COMMITS_RE, &text);
        }
        if scan.releases.is_none() {
            scan.releases = capture_count(&RELEASES_RE, &text);
        }
        if scan.contributors.is_none() {
            scan.contributors = capture_count(&CONTRIBUTORS_RE, &text);
        }
    }
    scan.languages = scan_languages(&doc);
    scan
}

/// The companion page is a bare partial; scan its whole text.
pub(crate) fn scan_branch_and_tag(html: &str) -> (Option<u64>, Option<u64>) {
    let doc = Html::parse_document(html);
    let text = normalize_ws(&doc.root_element().text().collect::<String>());
    (
        capture_count(&BRANCHES_RE, &text),
        capture_count(&TAGS_RE, &text),
    )
}

/// Apply defaults and the completeness check, then assemble the stats.
///
/// Releases and contributors default to zero when absent; commits, branches
/// and tags must have been found, otherwise the markup has drifted and the
/// extraction fails precisely.
pub(crate) fn finalize(
    scan: PageScan,
    branches: Option<u64>,
    tags: Option<u64>,
) -> Result<ScrapeStats, CrawlerError> {
    let required = [scan.commits, branches, tags];
    let populated = required.iter().filter(|counter| counter.is_some()).count() + 2;
    if populated < COUNTER_KEYS {
        return Err(CrawlerError::Incomplete {
            found: populated,
            expected: COUNTER_KEYS,
        });
    }
    Ok(ScrapeStats {
        commits: scan.commits.unwrap_or(0),
        branches: branches.unwrap_or(0),
        tags: tags.unwrap_or(0),
        releases: scan.releases.unwrap_or(0),
        contributors: scan.contributors.unwrap_or(0),
        languages: scan.languages,
    })
}

fn scan_languages(doc: &Html) -> Vec<Language> {
    let (Ok(headings), Ok(items)) = (Selector::parse("h2"), Selector::parse("li")) else {
        return Vec::new();
    };
    for heading in doc.select(&headings) {
        let title = normalize_ws(&heading.text().collect::<String>());
        if !title.eq_ignore_ascii_case("languages") {
            continue;
        }
        // Walk up from the heading until an ancestor yields language rows.
        let mut node = heading.parent();
        while let Some(parent) = node {
            if let Some(container) = ElementRef::wrap(parent) {
                let rows: Vec<Language> = container
                    .select(&items)
                    .filter_map(|item| parse_language(&normalize_ws(&item.text().collect::<String>())))
                    .collect();
                if !rows.is_empty() {
                    return rows;
                }
            }
            node = parent.parent();
        }
    }
    Vec::new()
}

fn parse_language(text: &str) -> Option<Language> {
    let caps = LANGUAGE_RE.captures(text)?;
    let name = caps.get(1)?.as_str().trim().to_string();
    if name.is_empty() {
        return None;
    }
    let percent = caps.get(2)?.as_str().parse::<f64>().ok()?;
    Some(Language { name, percent })
}

/// Strip every non-digit from the capture and parse the remainder.
fn capture_count(re: &Regex, text: &str) -> Option<u64> {
    let caps = re.captures(text)?;
    let digits: String = caps
        .get(1)?
        .as_str()
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

fn normalize_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
