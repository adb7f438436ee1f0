//! Descending score rankings.
use crate::error::{Result, TableError};

/// returns `scores` sorted from highest to lowest.
/// The sort is stable, equal scores keep the order they had in `scores`.
pub fn rank(scores: &[i64]) -> Vec<i64> {
    let mut ranked = scores.to_vec();
    ranked.sort_by(|a, b| b.cmp(a));
    ranked
}

/// returns ranks `from` through `to` (1-based, inclusive) of `scores`, joined by commas.
///
/// `to` is clamped to the number of scores, so asking for more ranks than exist returns what is
/// there. A `from` past the last rank returns an empty string.
///
/// # Errors
/// returns [`TableError::InvalidRange`] if `from` is 0 or greater than `to`
pub fn top_k(scores: &[i64], from: usize, to: usize) -> Result<String> {
    if from == 0 || from > to {
        return Err(TableError::InvalidRange { from, to });
    }

    let ranked = rank(scores);
    let to = to.min(ranked.len());
    if from > to {
        return Ok(String::new());
    }

    Ok(ranked[from - 1..to]
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(","))
}
