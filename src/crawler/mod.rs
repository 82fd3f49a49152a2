//! HTML stats crawler.
//!
//! Scrapes counters the REST API only exposes through expensive paginated
//! listings. A quota-saving accessory: when GitHub's markup changes the
//! extraction fails precisely instead of falling back silently.

mod extract;

use backon::{ExponentialBuilder, Retryable};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::GithubConfig;
use crate::error::CrawlerError;
use octogauge_schema::ScrapeStats;

static PAGE_RETRY_POLICY: LazyLock<ExponentialBuilder> = LazyLock::new(|| {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_millis(300))
        .with_max_times(2)
        .with_jitter()
});

pub struct HtmlCrawler {
    http: reqwest::Client,
}

impl HtmlCrawler {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    pub fn from_config(github: &GithubConfig) -> Result<Self, CrawlerError> {
        let http = reqwest::Client::builder()
            .user_agent(&github.user_agent)
            .timeout(Duration::from_secs(github.timeout_secs))
            .build()
            .map_err(|source| CrawlerError::Fetch {
                url: github.html_base.clone(),
                source,
            })?;
        Ok(Self::new(http))
    }

    /// Scrape the repository page and its branch-and-tag companion.
    pub async fn scrape(&self, html_url: &Url) -> Result<ScrapeStats, CrawlerError> {
        let overview = self.fetch_page(html_url.clone()).await?;
        let counts_url = branch_and_tag_url(html_url)?;
        let counts = self.fetch_page(counts_url).await?;

        let scan = extract::scan_overview(&overview);
        let (branches, tags) = extract::scan_branch_and_tag(&counts);
        extract::finalize(scan, branches, tags)
    }

    async fn fetch_page(&self, url: Url) -> Result<String, CrawlerError> {
        let response = (|| {
            let http = self.http.clone();
            let url = url.clone();
            async move {
                let response = http.get(url).send().await?;
                if response.status().is_server_error() {
                    let status = response.status();
                    let err = response.error_for_status_ref().unwrap_err();
                    debug!(%status, url = %response.url(), "page fetch hit a server error (will retry)");
                    return Err(err);
                }
                Ok(response)
            }
        })
        .retry(*PAGE_RETRY_POLICY)
        .await
        .map_err(|source| CrawlerError::Fetch {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlerError::FetchStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(|source| CrawlerError::Fetch {
            url: url.to_string(),
            source,
        })
    }
}

fn branch_and_tag_url(html_url: &Url) -> Result<Url, CrawlerError> {
    let raw = format!("{}/branch-and-tag-count", html_url.as_str().trim_end_matches('/'));
    Url::parse(&raw).map_err(|_| CrawlerError::BadUrl(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_and_tag_url_appends_a_segment() {
        let url = Url::parse("https://github.com/rust-lang/rust").expect("url");
        assert_eq!(
            branch_and_tag_url(&url).expect("companion url").as_str(),
            "https://github.com/rust-lang/rust/branch-and-tag-count"
        );
        // A trailing slash does not double up.
        let url = Url::parse("https://github.com/rust-lang/rust/").expect("url");
        assert_eq!(
            branch_and_tag_url(&url).expect("companion url").as_str(),
            "https://github.com/rust-lang/rust/branch-and-tag-count"
        );
    }
}
