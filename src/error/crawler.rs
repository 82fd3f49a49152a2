use thiserror::Error as ThisError;

/// Failures raised by the HTML stats crawler.
///
/// The crawler is a quota-saving accessory: when GitHub's markup changes it
/// must fail precisely rather than fall back silently, so extraction gaps are
/// their own variant.
#[derive(Debug, ThisError)]
pub enum CrawlerError {
    #[error("failed to fetch {url}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("page {url} answered status {status}")]
    FetchStatus { url: String, status: u16 },

    #[error("invalid repository page URL {0:?}")]
    BadUrl(String),

    #[error("extracted only {found} of {expected} counters from the repository pages")]
    Incomplete { found: usize, expected: usize },
}
