//! Duration statistics.
//!
//! Both functions return 0 for an empty input and truncate toward zero
//! instead of rounding. Sums are accumulated in `i128` so long windows of
//! large durations cannot overflow.

/// Statistic served by a query endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatKind {
    Mean,
    Median,
}

impl StatKind {
    pub fn apply(self, values: &[i64]) -> i64 {
        match self {
            StatKind::Mean => mean(values),
            StatKind::Median => median(values),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StatKind::Mean => "mean",
            StatKind::Median => "median",
        }
    }
}

/// Integer arithmetic mean.
pub fn mean(values: &[i64]) -> i64 {
    if values.is_empty() {
        return 0;
    }
    let sum: i128 = values.iter().map(|&v| v as i128).sum();
    (sum / values.len() as i128) as i64
}

/// Integer median of a sorted copy of `values`; the input is left untouched.
///
/// For an even number of values this averages the elements at `len/2 - 1`
/// and `len/2 + 1`, i.e. the neighbours around the upper midpoint rather
/// than the two middle elements. For two values the upper index is clamped
/// to the last element.
pub fn median(values: &[i64]) -> i64 {
    if values.is_empty() {
        return 0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let len = sorted.len();
    let mid = len / 2;
    if len % 2 == 1 {
        return sorted[mid];
    }

    let upper = (mid + 1).min(len - 1);
    truncated_average(sorted[mid - 1], sorted[upper])
}

fn truncated_average(a: i64, b: i64) -> i64 {
    ((a as i128 + b as i128) / 2) as i64
}
