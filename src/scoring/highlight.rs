//! Highlight selection: the strongest dimension gets to describe the
//! repository in one sentence. Phrasing is part of the stable surface and is
//! pinned by tests.

use octogauge_schema::{Highlight, HighlightKind, MaturityComponent};

use super::{
    Derived, HOT_RECENT_WEEKS, HOT_STAR_THRESH, MAT_COMMITS_REF, MAT_CONTRIB_REF,
    MAT_RELEASES_REF, RawScores, ScoreInputs,
};
use crate::error::ScoreError;
use crate::utils::numfmt::{fmt_age_weeks, fmt_count, plural};

/// Walk the four raw scores in descending order and take the first dimension
/// that yields a highlight. Popularity, activity and maturity always yield;
/// hotness may decline.
pub(crate) fn select(
    inputs: &ScoreInputs,
    derived: &Derived,
    raw: &RawScores,
) -> Result<Highlight, ScoreError> {
    let mut ranked = [
        (raw.popularity, HighlightKind::Popularity),
        (raw.hotness, HighlightKind::Hotness),
        (raw.activity, HighlightKind::Activity),
        (raw.maturity, HighlightKind::Maturity),
    ];
    // Stable sort: ties keep the p, h, a, m order.
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    for (_, kind) in ranked {
        let built = match kind {
            HighlightKind::Popularity => Some(popularity(inputs)),
            HighlightKind::Hotness => hotness(inputs, derived, raw),
            HighlightKind::Activity => Some(activity(derived)),
            HighlightKind::Maturity => Some(maturity(inputs, derived)),
        };
        if let Some(highlight) = built {
            return Ok(highlight);
        }
    }
    Err(ScoreError::HighlightUnavailable)
}

fn popularity(inputs: &ScoreInputs) -> Highlight {
    Highlight {
        kind: HighlightKind::Popularity,
        message: format!(
            "Starred {} times and forked {} times",
            fmt_count(inputs.stargazers),
            fmt_count(inputs.forks)
        ),
        component: None,
    }
}

/// Hotness only speaks up when there is a concrete momentum signal.
fn hotness(inputs: &ScoreInputs, derived: &Derived, raw: &RawScores) -> Option<Highlight> {
    let starred = inputs.stargazers >= HOT_STAR_THRESH;
    let pushed_recently = derived.weeks_since_push <= 1.0;
    let surging = raw.ratio >= 1.2;
    let busy = derived.recent_commits > HOT_RECENT_WEEKS as u64;
    if !(starred || pushed_recently || surging || busy) {
        return None;
    }

    let message = if busy || surging {
        format!(
            "Gaining steam: {} commits in the last {} weeks",
            fmt_count(derived.recent_commits),
            HOT_RECENT_WEEKS
        )
    } else if pushed_recently {
        "Gaining steam: pushed within the last week".to_string()
    } else {
        format!(
            "Gaining steam: {} stargazers and counting",
            fmt_count(inputs.stargazers)
        )
    };
    Some(Highlight {
        kind: HighlightKind::Hotness,
        message,
        component: None,
    })
}

fn activity(derived: &Derived) -> Highlight {
    #[allow(clippy::cast_possible_wrap)]
    let active_weeks = derived.active_weeks as i64;
    Highlight {
        kind: HighlightKind::Activity,
        message: format!(
            "{} commits over {} this year",
            fmt_count(derived.annual_commits),
            plural(active_weeks, "active week")
        ),
        component: None,
    }
}

/// Maturity speaks through its strongest sub-signal.
#[allow(clippy::cast_precision_loss)]
fn maturity(inputs: &ScoreInputs, derived: &Derived) -> Highlight {
    let ranked = [
        (inputs.commits as f64 / MAT_COMMITS_REF, MaturityComponent::Commits),
        (
            inputs.contributors as f64 / MAT_CONTRIB_REF,
            MaturityComponent::Contributors,
        ),
        (
            inputs.releases as f64 / MAT_RELEASES_REF,
            MaturityComponent::Releases,
        ),
    ];
    let mut best = ranked[0];
    for candidate in &ranked[1..] {
        if candidate.0 > best.0 {
            best = *candidate;
        }
    }

    let age = fmt_age_weeks(derived.age_weeks);
    let message = match best.1 {
        MaturityComponent::Commits => format!(
            "{} commits accumulated over {}",
            fmt_count(inputs.commits),
            age
        ),
        MaturityComponent::Contributors => format!(
            "{} contributors over {}",
            fmt_count(inputs.contributors),
            age
        ),
        MaturityComponent::Releases => {
            format!("{} releases over {}", fmt_count(inputs.releases), age)
        }
    };
    Highlight {
        kind: HighlightKind::Maturity,
        message,
        component: Some(best.1),
    }
}
