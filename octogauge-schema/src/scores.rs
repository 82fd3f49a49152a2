use serde::{Deserialize, Serialize};

/// The four derived quality dimensions of a repository.
///
/// Scores are unbounded integers calibrated so that a repository sitting at
/// every reference anchor lands near 1000 per dimension. They rank; they do
/// not measure probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhamScores {
    /// Popularity: stargazers, subscribers, forks.
    pub p: i64,
    /// Hotness: short-horizon momentum, damped for very young repositories.
    pub h: i64,
    /// Activity: commit volume and cadence over the last year.
    pub a: i64,
    /// Maturity: accumulated history, contributors, releases, age, size.
    pub m: i64,
}

impl PhamScores {
    /// Rounded mean of popularity, activity and maturity.
    ///
    /// Hotness is a short-horizon signal and stays out of the average.
    pub fn average(&self) -> i64 {
        #[allow(clippy::cast_precision_loss)]
        let mean = (self.p + self.a + self.m) as f64 / 3.0;
        #[allow(clippy::cast_possible_truncation)]
        let rounded = mean.round() as i64;
        rounded
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightKind {
    Popularity,
    Hotness,
    Activity,
    Maturity,
}

/// Which maturity signal backs a maturity highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaturityComponent {
    Commits,
    Contributors,
    Releases,
}

/// Narrative summary of a repository's strongest dimension.
///
/// `component` is set only for maturity highlights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    #[serde(rename = "type")]
    pub kind: HighlightKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<MaturityComponent>,
}
