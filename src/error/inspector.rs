use thiserror::Error as ThisError;

use super::api::DispatchError;
use super::crawler::CrawlerError;
use super::score::ScoreError;

/// Top-level failures of a repository inspection.
#[derive(Debug, ThisError)]
pub enum InspectorError {
    #[error("GitHub API failure while inspecting the repository")]
    Api(#[from] DispatchError),

    #[error("crawler failure while inspecting the repository")]
    Crawler(#[from] CrawlerError),

    #[error(transparent)]
    Score(#[from] ScoreError),
}
