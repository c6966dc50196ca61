//! Nearest-timestamp lookup over an ascending sequence

use crate::error::{BagSyncError, Result};

/// Index of the candidate closest to `target_ns`; on equal distance the lowest index wins.
///
/// `candidates` must be ascending. The result matches a linear scan over the same input.
pub fn nearest(target_ns: i64, candidates: &[i64]) -> Result<usize> {
    if candidates.is_empty() {
        return Err(BagSyncError::NoCandidates);
    }
    let dist = |i: usize| (candidates[i] as i128 - target_ns as i128).abs();

    // first candidate >= target; the answer is it or its predecessor
    let upper = candidates.partition_point(|&c| c < target_ns);
    let best = match upper {
        0 => 0,
        n if n == candidates.len() => n - 1,
        n if dist(n - 1) <= dist(n) => n - 1,
        n => n,
    };
    // equal values before `best` tie with it
    let value = candidates[best];
    Ok(candidates[..best].partition_point(|&c| c < value))
}

/// Reference O(n) scan, the definition `nearest` is held to.
pub fn nearest_linear(target_ns: i64, candidates: &[i64]) -> Result<usize> {
    let mut best: Option<(usize, i128)> = None;
    for (i, &c) in candidates.iter().enumerate() {
        let d = (c as i128 - target_ns as i128).abs();
        if best.is_none_or(|(_, bd)| d < bd) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i).ok_or(BagSyncError::NoCandidates)
}
