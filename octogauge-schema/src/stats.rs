use serde::{Deserialize, Serialize};

/// One row of the repository's language breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Language {
    pub name: String,
    pub percent: f64,
}

/// Counters pulled from the repository's HTML pages.
///
/// These mirror numbers the REST API only exposes through expensive paginated
/// listings; scraping them saves quota. Releases and contributors default to
/// zero when the page omits them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapeStats {
    pub commits: u64,
    pub branches: u64,
    pub tags: u64,
    pub releases: u64,
    pub contributors: u64,
    #[serde(default)]
    pub languages: Vec<Language>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stats_roundtrip_with_languages() {
        let stats = ScrapeStats {
            commits: 1234,
            branches: 7,
            tags: 40,
            releases: 12,
            contributors: 90,
            languages: vec![
                Language {
                    name: "Rust".to_string(),
                    percent: 97.2,
                },
                Language {
                    name: "C++".to_string(),
                    percent: 2.8,
                },
            ],
        };
        let value = serde_json::to_value(&stats).expect("serialize stats");
        assert_eq!(value["languages"][1], json!({"name": "C++", "percent": 2.8}));
        let back: ScrapeStats = serde_json::from_value(value).expect("deserialize stats");
        assert_eq!(back, stats);
    }

    #[test]
    fn languages_default_to_empty() {
        let raw = json!({"commits": 1, "branches": 1, "tags": 0, "releases": 0, "contributors": 3});
        let stats: ScrapeStats = serde_json::from_value(raw).expect("deserialize stats");
        assert!(stats.languages.is_empty());
    }
}
