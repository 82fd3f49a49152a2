//! PHAM scoring engine: popularity, hotness, activity, maturity.
//!
//! Pure arithmetic, no IO. The caller supplies `now`; identical inputs
//! produce identical scores and highlight down to the byte.

pub mod highlight;
mod norms;

use chrono::{DateTime, Utc};

use crate::error::ScoreError;
use norms::{lin_norm, log_norm, pow_norm, size_norm};
use octogauge_schema::{Highlight, PhamScores};

pub(crate) const SECONDS_PER_WEEK: f64 = 604_800.0;

// Calibration anchors. Frozen: a repository sitting exactly on every anchor
// scores ~1000 per dimension, and the reference tests pin each value.
pub const POP_STAR_REF: f64 = 50_000.0;
pub const POP_SUB_REF: f64 = 5_000.0;
pub const POP_FORK_REF: f64 = 10_000.0;
pub const HOT_RECENT_WEEKS: usize = 4;
pub const HOT_HALF_LIFE: f64 = 4.0;
pub const HOT_DECAY_WEEKS: f64 = 250.0;
pub const HOT_YOUTH_RAMP: f64 = 26.0;
pub const HOT_YOUTH_FLOOR: f64 = 0.35;
pub const HOT_POP_SCALE: f64 = 400.0;
pub const HOT_STAR_THRESH: u64 = 400;
pub const ACT_ANNUAL_REF: f64 = 1_200.0;
pub const MAT_COMMITS_REF: f64 = 5_000.0;
pub const MAT_RELEASES_REF: f64 = 100.0;
pub const MAT_CONTRIB_REF: f64 = 200.0;
pub const MAT_AGE_REF_WEEKS: f64 = 208.0;
pub const MAT_SIZE_REF: f64 = 500.0;

/// Fallback push age, in weeks, when neither `pushed_at` nor `updated_at`
/// is usable.
const STALE_PUSH_WEEKS: f64 = 52.0;

/// Everything the engine consumes, merged from the API payloads and the
/// crawled counters.
#[derive(Debug, Clone, Default)]
pub struct ScoreInputs {
    pub stargazers: u64,
    pub subscribers: u64,
    pub forks: u64,
    /// Repository size in kilobytes, as the API reports it.
    pub size_kb: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Weekly commit counts, oldest first, at most a year's worth.
    pub participation: Vec<u64>,
    pub commits: u64,
    pub releases: u64,
    pub contributors: u64,
}

/// Time-derived quantities, computed once per evaluation.
#[derive(Debug, Clone)]
pub(crate) struct Derived {
    pub(crate) age_weeks: f64,
    pub(crate) weeks_since_push: f64,
    pub(crate) recent_commits: u64,
    pub(crate) annual_commits: u64,
    pub(crate) active_weeks: usize,
    pub(crate) size_mb: f64,
}

impl Derived {
    #[allow(clippy::cast_precision_loss)]
    fn from_inputs(inputs: &ScoreInputs, now: DateTime<Utc>) -> Self {
        let age_weeks = inputs
            .created_at
            .map_or(0.0, |created| weeks_between(created, now).max(0.0));
        let weeks_since_push = inputs
            .pushed_at
            .or(inputs.updated_at)
            .map_or(STALE_PUSH_WEEKS, |pushed| {
                weeks_between(pushed, now).max(0.0)
            });
        Self {
            age_weeks,
            weeks_since_push,
            recent_commits: inputs
                .participation
                .iter()
                .rev()
                .take(HOT_RECENT_WEEKS)
                .sum(),
            annual_commits: inputs.participation.iter().sum(),
            active_weeks: inputs.participation.iter().filter(|&&week| week > 0).count(),
            size_mb: inputs.size_kb as f64 / 1000.0,
        }
    }
}

/// Raw (pre-rounding) dimension values plus the momentum ratio the highlight
/// logic reuses.
#[derive(Debug, Clone)]
pub(crate) struct RawScores {
    pub(crate) popularity: f64,
    pub(crate) hotness: f64,
    pub(crate) activity: f64,
    pub(crate) maturity: f64,
    pub(crate) ratio: f64,
}

/// The engine's full output for one repository.
#[derive(Debug, Clone)]
pub struct ScoreReport {
    pub scores: PhamScores,
    pub scores_avg: i64,
    pub highlight: Highlight,
}

/// Score a repository as of `now`.
pub fn evaluate(inputs: &ScoreInputs, now: DateTime<Utc>) -> Result<ScoreReport, ScoreError> {
    let derived = Derived::from_inputs(inputs, now);
    let raw = raw_scores(inputs, &derived);
    #[allow(clippy::cast_possible_truncation)]
    let scores = PhamScores {
        p: raw.popularity.round() as i64,
        h: raw.hotness.round() as i64,
        a: raw.activity.round() as i64,
        m: raw.maturity.round() as i64,
    };
    let highlight = highlight::select(inputs, &derived, &raw)?;
    Ok(ScoreReport {
        scores,
        scores_avg: scores.average(),
        highlight,
    })
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn raw_scores(inputs: &ScoreInputs, derived: &Derived) -> RawScores {
    let popularity = 100.0
        * (6.0 * log_norm(inputs.stargazers as f64, POP_STAR_REF)
            + 2.0 * log_norm(inputs.subscribers as f64, POP_SUB_REF)
            + 2.0 * log_norm(inputs.forks as f64, POP_FORK_REF));

    let recency = 0.5_f64.powf(derived.weeks_since_push / HOT_HALF_LIFE);
    let pop_momentum = (popularity / HOT_POP_SCALE.max(1.0)).min(1.0);
    let avg_weekly = if derived.annual_commits == 0 {
        0.0
    } else {
        derived.annual_commits as f64 / 52.0
    };
    let baseline = (avg_weekly * HOT_RECENT_WEEKS as f64).max(1.0);
    let ratio = derived.recent_commits as f64 / baseline;
    let momentum = if ratio > 0.0 { (1.0 + ratio).ln() } else { 0.0 };
    let age_penalty = 1.0 / (1.0 + derived.age_weeks / HOT_DECAY_WEEKS);
    let youth_damping = if derived.age_weeks <= 0.0 {
        HOT_YOUTH_FLOOR
    } else {
        (derived.age_weeks / HOT_YOUTH_RAMP.max(1.0)).clamp(HOT_YOUTH_FLOOR, 1.0)
    };
    let hotness = 100.0
        * (1.5 * recency + 1.5 * momentum + 7.0 * pop_momentum)
        * age_penalty
        * youth_damping;

    let activity = 100.0
        * (6.5 * pow_norm(derived.annual_commits as f64, ACT_ANNUAL_REF, 0.6, None)
            + 3.5 * lin_norm(derived.active_weeks as f64, 52.0));

    let maturity = 100.0
        * (3.5 * pow_norm(inputs.commits as f64, MAT_COMMITS_REF, 1.2, Some(3.5))
            + 2.5 * pow_norm(inputs.contributors as f64, MAT_CONTRIB_REF, 1.15, Some(3.0))
            + 2.0 * pow_norm(inputs.releases as f64, MAT_RELEASES_REF, 1.1, Some(3.0))
            + 1.5 * log_norm(derived.age_weeks, MAT_AGE_REF_WEEKS)
            + 0.5 * size_norm(derived.size_mb));

    RawScores {
        popularity,
        hotness,
        activity,
        maturity,
        ratio,
    }
}

fn weeks_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let seconds = (to - from).num_seconds() as f64;
    seconds / SECONDS_PER_WEEK
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(epoch: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(epoch, 0).single().expect("timestamp")
    }

    fn weeks_ago(now: DateTime<Utc>, weeks: f64) -> DateTime<Utc> {
        #[allow(clippy::cast_possible_truncation)]
        let seconds = (weeks * SECONDS_PER_WEEK) as i64;
        at(now.timestamp() - seconds)
    }

    #[test]
    fn derived_times_follow_created_and_pushed() {
        let now = at(1_750_000_000);
        let inputs = ScoreInputs {
            created_at: Some(weeks_ago(now, 10.0)),
            pushed_at: Some(weeks_ago(now, 2.0)),
            participation: vec![0, 3, 0, 5, 1, 2],
            ..ScoreInputs::default()
        };
        let derived = Derived::from_inputs(&inputs, now);
        assert!((derived.age_weeks - 10.0).abs() < 1e-6);
        assert!((derived.weeks_since_push - 2.0).abs() < 1e-6);
        // Last four weeks of participation.
        assert_eq!(derived.recent_commits, 8);
        assert_eq!(derived.annual_commits, 11);
        assert_eq!(derived.active_weeks, 4);
    }

    #[test]
    fn push_age_prefers_pushed_then_updated_then_constant() {
        let now = at(1_750_000_000);
        let mut inputs = ScoreInputs {
            pushed_at: Some(weeks_ago(now, 1.0)),
            updated_at: Some(weeks_ago(now, 9.0)),
            ..ScoreInputs::default()
        };
        assert!((Derived::from_inputs(&inputs, now).weeks_since_push - 1.0).abs() < 1e-6);

        inputs.pushed_at = None;
        assert!((Derived::from_inputs(&inputs, now).weeks_since_push - 9.0).abs() < 1e-6);

        inputs.updated_at = None;
        assert!(
            (Derived::from_inputs(&inputs, now).weeks_since_push - STALE_PUSH_WEEKS).abs() < 1e-6
        );
    }

    #[test]
    fn future_created_at_clamps_age_to_zero() {
        let now = at(1_750_000_000);
        let inputs = ScoreInputs {
            created_at: Some(at(now.timestamp() + 86_400)),
            ..ScoreInputs::default()
        };
        let derived = Derived::from_inputs(&inputs, now);
        assert_eq!(derived.age_weeks, 0.0);
    }

    #[test]
    fn zero_inputs_score_zero_popularity() {
        let raw = raw_scores(
            &ScoreInputs::default(),
            &Derived::from_inputs(&ScoreInputs::default(), at(1_750_000_000)),
        );
        assert_eq!(raw.popularity, 0.0);
    }

    #[test]
    fn evaluate_is_deterministic() {
        let now = at(1_750_000_000);
        let inputs = ScoreInputs {
            stargazers: 777,
            subscribers: 44,
            forks: 120,
            size_kb: 20_000,
            created_at: Some(weeks_ago(now, 80.0)),
            pushed_at: Some(weeks_ago(now, 0.5)),
            participation: vec![4; 52],
            commits: 900,
            releases: 14,
            contributors: 12,
            ..ScoreInputs::default()
        };
        let first = evaluate(&inputs, now).expect("report");
        let second = evaluate(&inputs, now).expect("report");
        assert_eq!(first.scores, second.scores);
        assert_eq!(first.scores_avg, second.scores_avg);
        assert_eq!(first.highlight, second.highlight);
    }
}
