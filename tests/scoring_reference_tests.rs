use chrono::{DateTime, TimeZone, Utc};
use octogauge::scoring::{self, ScoreInputs};
use octogauge_schema::HighlightKind;
use pretty_assertions::assert_eq;

const WEEK_SECS: i64 = 604_800;

fn at(epoch: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(epoch, 0).single().expect("timestamp")
}

fn now() -> DateTime<Utc> {
    at(1_700_000_000)
}

fn weeks_ago(weeks: f64) -> DateTime<Utc> {
    #[allow(clippy::cast_possible_truncation)]
    let seconds = (weeks * WEEK_SECS as f64) as i64;
    at(1_700_000_000 - seconds)
}

/// A repository sitting exactly on every calibration anchor.
fn reference_inputs() -> ScoreInputs {
    // 48 weeks of 23 commits plus 4 of 24: sums to 1200, every week active.
    let mut participation = vec![23_u64; 48];
    participation.extend([24; 4]);
    ScoreInputs {
        stargazers: 50_000,
        subscribers: 5_000,
        forks: 10_000,
        size_kb: 500_000,
        created_at: Some(weeks_ago(208.0)),
        pushed_at: Some(now()),
        updated_at: None,
        participation,
        commits: 5_000,
        releases: 100,
        contributors: 200,
    }
}

#[test]
fn reference_repo_scores_one_thousand_per_dimension() {
    let report = scoring::evaluate(&reference_inputs(), now()).expect("report");
    assert_eq!(report.scores.p, 1000);
    assert_eq!(report.scores.a, 1000);
    assert_eq!(report.scores.m, 1000);
    assert_eq!(report.scores_avg, 1000);
}

#[test]
fn reference_hotness_is_damped_by_age() {
    // recency = 1, momentum = ln(2.04), pop momentum capped at 1, then
    // age_penalty = 1/(1 + 208/250) with full youth credit.
    let report = scoring::evaluate(&reference_inputs(), now()).expect("report");
    assert!(report.scores.h > 0);
    assert_eq!(report.scores.h, 522);
}

#[test]
fn scores_avg_excludes_hotness() {
    let inputs = ScoreInputs {
        created_at: Some(weeks_ago(0.5)),
        pushed_at: Some(now()),
        ..ScoreInputs::default()
    };
    let report = scoring::evaluate(&inputs, now()).expect("report");
    assert_eq!(report.scores.p, 0);
    assert_eq!(report.scores.a, 0);
    assert_eq!(report.scores.m, 0);
    assert!(report.scores.h > 0);
    assert_eq!(report.scores_avg, 0);
}

#[test]
fn young_repositories_get_the_youth_floor() {
    // age = 0.5 weeks: damping clamps to exactly 0.35 before rounding, so
    // hotness = 100 * 1.5 * (1/(1 + 0.5/250)) * 0.35 = 52.395… → 52.
    let inputs = ScoreInputs {
        created_at: Some(weeks_ago(0.5)),
        pushed_at: Some(now()),
        ..ScoreInputs::default()
    };
    let report = scoring::evaluate(&inputs, now()).expect("report");
    assert_eq!(report.scores.h, 52);
}

#[test]
fn reference_highlight_is_popularity_with_pinned_phrasing() {
    let report = scoring::evaluate(&reference_inputs(), now()).expect("report");
    assert_eq!(report.highlight.kind, HighlightKind::Popularity);
    assert_eq!(
        report.highlight.message,
        "Starred 50k times and forked 10k times"
    );
    assert_eq!(report.highlight.component, None);
}

#[test]
fn fresh_push_highlight_is_pinned() {
    let inputs = ScoreInputs {
        created_at: Some(weeks_ago(0.5)),
        pushed_at: Some(now()),
        ..ScoreInputs::default()
    };
    let report = scoring::evaluate(&inputs, now()).expect("report");
    assert_eq!(report.highlight.kind, HighlightKind::Hotness);
    assert_eq!(
        report.highlight.message,
        "Gaining steam: pushed within the last week"
    );
}

#[test]
fn identical_inputs_produce_identical_reports() {
    let inputs = reference_inputs();
    let first = scoring::evaluate(&inputs, now()).expect("report");
    let second = scoring::evaluate(&inputs, now()).expect("report");
    assert_eq!(first.scores, second.scores);
    assert_eq!(first.scores_avg, second.scores_avg);
    assert_eq!(first.highlight, second.highlight);
}

#[test]
fn an_empty_repository_still_reports() {
    // Nothing to say beyond popularity, which always yields.
    let report = scoring::evaluate(&ScoreInputs::default(), now()).expect("report");
    assert_eq!(report.scores.p, 0);
    assert_eq!(report.highlight.kind, HighlightKind::Popularity);
    assert_eq!(report.highlight.message, "Starred 0 times and forked 0 times");
}
