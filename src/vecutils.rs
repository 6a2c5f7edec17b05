//! Descriptive statistics over slices of `f64`: min(), max(), mean(), median().
//!
//! All functions return `0.0` for an empty slice.

pub fn max(vec: &[f64]) -> f64 {
    vec.iter().cloned().max_by(f64::total_cmp).unwrap_or(0.0)
}

pub fn min(vec: &[f64]) -> f64 {
    vec.iter().cloned().min_by(f64::total_cmp).unwrap_or(0.0)
}

pub fn mean(vec: &[f64]) -> f64 {
    if vec.is_empty() {
        return 0.0;
    }
    vec.iter().sum::<f64>() / vec.len() as f64
}

/// Median of the values. For an even count, the mean of the two central values.
pub fn median(vec: &[f64]) -> f64 {
    if vec.is_empty() {
        return 0.0;
    }
    let mut sorted = vec.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len().is_multiple_of(2) {
        0.5 * (sorted[mid - 1] + sorted[mid])
    } else {
        sorted[mid]
    }
}
