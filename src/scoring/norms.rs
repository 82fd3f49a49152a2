//! Normalization primitives shared by the scoring formulas.
//!
//! Every normalizer maps non-positive values to zero, which keeps `ln` away
//! from zero and negative inputs out of the weighted sums.

use super::MAT_SIZE_REF;

/// `ln(1+v) / ln(1+ref)`, or `ln(1+v)` when the reference is non-positive.
pub(crate) fn log_norm(value: f64, reference: f64) -> f64 {
    if value <= 0.0 {
        return 0.0;
    }
    if reference <= 0.0 {
        return (1.0 + value).ln();
    }
    (1.0 + value).ln() / (1.0 + reference).ln()
}

/// `v / ref`, guarded against a vanishing reference.
pub(crate) fn lin_norm(value: f64, reference: f64) -> f64 {
    if value <= 0.0 {
        return 0.0;
    }
    value / reference.max(f64::EPSILON)
}

/// `min(v/ref, cap) ^ e`, uncapped when `cap` is `None`.
pub(crate) fn pow_norm(value: f64, reference: f64, exponent: f64, cap: Option<f64>) -> f64 {
    if value <= 0.0 {
        return 0.0;
    }
    let mut normalized = value / reference.max(1.0);
    if let Some(cap) = cap {
        normalized = normalized.min(cap);
    }
    normalized.powf(exponent)
}

/// Sub-linear size credit, saturating at the reference size.
pub(crate) fn size_norm(size_mb: f64) -> f64 {
    if size_mb <= 0.0 {
        return 0.0;
    }
    if size_mb <= MAT_SIZE_REF {
        (size_mb / MAT_SIZE_REF).powf(0.7)
    } else {
        1.0
    }
}
