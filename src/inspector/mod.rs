//! Repository inspector: drives the dispatcher, the crawler and the scoring
//! engine for one repository and merges everything into a single report.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use tracing::debug;
use url::Url;

use crate::api::dispatcher::Dispatcher;
use crate::api::{ApiTransport, Pager};
use crate::crawler::HtmlCrawler;
use crate::error::{CrawlerError, InspectorError};
use crate::scoring::{self, ScoreInputs, ScoreReport};
use crate::utils::clock::{SharedClock, system_clock};
use octogauge_schema::ScrapeStats;

pub struct RepoInspector<T, P> {
    dispatcher: Dispatcher<T, P>,
    crawler: HtmlCrawler,
    clock: SharedClock,
}

impl<T: ApiTransport, P: Pager> RepoInspector<T, P> {
    pub fn new(dispatcher: Dispatcher<T, P>, crawler: HtmlCrawler) -> Self {
        Self {
            dispatcher,
            crawler,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn dispatcher(&mut self) -> &mut Dispatcher<T, P> {
        &mut self.dispatcher
    }

    /// Inspect `author/name`: repo metadata and participation through the
    /// dispatcher, counters through the crawler, scores on top, everything
    /// merged into one report.
    pub async fn inspect(&mut self, author: &str, name: &str) -> Result<Value, InspectorError> {
        let args = [json!(author), json!(name)];
        let repo = self.dispatcher.call("repo/show", &args).await?;
        let participation = self.dispatcher.call("repo/participation", &args).await?;

        let html_url = repo
            .get("html_url")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                CrawlerError::BadUrl("repository payload carries no html_url".to_string())
            })?;
        let html_url = Url::parse(html_url)
            .map_err(|_| CrawlerError::BadUrl(html_url.to_string()))?;
        debug!(repo = %format!("{author}/{name}"), url = %html_url, "crawling repository pages");
        let stats = self.crawler.scrape(&html_url).await?;

        let inputs = score_inputs(&repo, &participation, &stats);
        let report = scoring::evaluate(&inputs, self.clock.now())?;
        Ok(merge_report(repo, &stats, &report))
    }
}

/// Pull the engine's inputs out of the API payloads and the crawled stats.
fn score_inputs(repo: &Value, participation: &Value, stats: &ScrapeStats) -> ScoreInputs {
    ScoreInputs {
        stargazers: u64_field(repo, "stargazers_count"),
        subscribers: u64_field(repo, "subscribers_count"),
        forks: u64_field(repo, "forks_count"),
        size_kb: u64_field(repo, "size"),
        created_at: datetime_field(repo, "created_at"),
        pushed_at: datetime_field(repo, "pushed_at"),
        updated_at: datetime_field(repo, "updated_at"),
        participation: participation
            .get("all")
            .and_then(Value::as_array)
            .map(|weeks| weeks.iter().filter_map(Value::as_u64).collect())
            .unwrap_or_default(),
        commits: stats.commits,
        releases: stats.releases,
        contributors: stats.contributors,
    }
}

/// Drop `*_url` keys recursively, keeping `avatar_url` and renaming
/// `html_url` to `url`. Idempotent: the renamed key no longer matches.
pub(crate) fn strip_urls(value: Value) -> Value {
    match value {
        Value::Object(entries) => {
            let mut out = Map::with_capacity(entries.len());
            let mut renamed: Option<Value> = None;
            for (key, entry) in entries {
                let entry = strip_urls(entry);
                if key == "html_url" {
                    renamed = Some(entry);
                } else if key == "avatar_url" || !key.ends_with("_url") {
                    out.insert(key, entry);
                }
            }
            if let Some(url) = renamed {
                out.insert("url".to_string(), url);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(strip_urls).collect()),
        other => other,
    }
}

fn merge_report(repo: Value, stats: &ScrapeStats, report: &ScoreReport) -> Value {
    let mut out = match strip_urls(repo) {
        Value::Object(entries) => entries,
        _ => Map::new(),
    };

    let license_id = out
        .get("license")
        .and_then(|license| license.get("spdx_id"))
        .and_then(Value::as_str)
        .filter(|id| !id.eq_ignore_ascii_case("none") && !id.eq_ignore_ascii_case("noassertion"))
        .unwrap_or("")
        .to_string();
    out.insert("license_id".to_string(), json!(license_id));

    out.insert("commits_count".to_string(), json!(stats.commits));
    out.insert("branches_count".to_string(), json!(stats.branches));
    out.insert("tags_count".to_string(), json!(stats.tags));
    out.insert("releases_count".to_string(), json!(stats.releases));
    out.insert(
        "contributors_count".to_string(),
        json!(stats.contributors),
    );
    out.insert(
        "languages".to_string(),
        serde_json::to_value(&stats.languages).unwrap_or_default(),
    );
    out.insert(
        "scores".to_string(),
        serde_json::to_value(report.scores).unwrap_or_default(),
    );
    out.insert("scores_avg".to_string(), json!(report.scores_avg));
    out.insert(
        "highlight".to_string(),
        serde_json::to_value(&report.highlight).unwrap_or_default(),
    );
    Value::Object(out)
}

fn u64_field(value: &Value, key: &str) -> u64 {
    value.get(key).and_then(Value::as_u64).unwrap_or(0)
}

fn datetime_field(value: &Value, key: &str) -> Option<DateTime<Utc>> {
    value
        .get(key)
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
}
