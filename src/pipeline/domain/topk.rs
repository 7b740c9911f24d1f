use std::cmp::Ordering;

/// Indices of the `k` highest scores, best first. Equal scores keep their
/// index order, NaN ranks below every number; `k` is clamped to the number
/// of scores.
pub fn top_k(scores: &[f32], k: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..scores.len()).collect();
    // Stable sort keeps the lower index first among equals.
    indices.sort_by(|a, b| descending(scores[*a], scores[*b]));
    indices.truncate(k.min(scores.len()));
    indices
}

fn descending(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
