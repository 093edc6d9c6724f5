use chrono::{DateTime, Utc};

use super::models::{Bundle, RangeResult};

/// Keeps bundles with `start <= timeSlot <= end`. A missing bound is open; with both
/// missing the input comes back untouched. Order is preserved, never sorted.
pub fn filter_range(
    bundles: Vec<Bundle>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Vec<Bundle> {
    if start.is_none() && end.is_none() {
        return bundles;
    }
    bundles
        .into_iter()
        .filter(|b| in_range(b.time_slot, start, end))
        .collect()
}

fn in_range(t: DateTime<Utc>, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> bool {
    start.map_or(true, |s| s <= t) && end.map_or(true, |e| t <= e)
}

/// Applies [`filter_range`] chunk by chunk with the result's own bounds.
pub fn filter_result(mut result: RangeResult) -> RangeResult {
    let (start, end) = (result.start, result.end);
    for chunk in result.chunks.iter_mut() {
        let bundles = std::mem::take(&mut chunk.bundles);
        chunk.bundles = filter_range(bundles, start, end);
    }
    result
}
