//! Ranking functions for exact-match search

/// Weight of a single cover before noise discount
pub const COVER_WEIGHT: f32 = 0.1;

/// Compute the cover-density score of a document for a set of query terms
///
/// A cover is a minimal span of word positions containing every query term
/// at least once. Covers are found left to right, each starting after the
/// previous cover's start. A cover scores `COVER_WEIGHT / (1 + noise)`, where
/// noise counts the positions in the span not occupied by query terms, so
/// adjacent terms score highest and every additional cover adds to the total.
///
/// # Arguments
/// * `term_positions` - For each distinct query term, its ascending positions
///   in the document
///
/// # Returns
/// Cover-density score, 0 when some term never occurs
pub fn cover_density(term_positions: &[Vec<u32>]) -> f32 {
    let n_terms = term_positions.len();
    if n_terms == 0 || term_positions.iter().any(|p| p.is_empty()) {
        return 0.0;
    }

    let mut entries: Vec<(u32, usize)> = term_positions
        .iter()
        .enumerate()
        .flat_map(|(term, positions)| positions.iter().map(move |p| (*p, term)))
        .collect();
    entries.sort_unstable();

    let mut score = 0.0f32;
    let mut start = 0;
    while let Some((first, last)) = next_cover(&entries, start, n_terms) {
        let span = (entries[last].0 - entries[first].0) as i64;
        let inner = (last - first) as i64;
        let mut noise = span - inner;
        // compound parts share a position, which can make the span shorter
        // than the number of entries it holds
        if noise < 0 {
            noise = inner / 2;
        }
        score += COVER_WEIGHT / (1.0 + noise as f32);
        start = first + 1;
    }
    score
}

/// Find the next cover at or after `start`, as inclusive entry indices
fn next_cover(entries: &[(u32, usize)], start: usize, n_terms: usize) -> Option<(usize, usize)> {
    let mut seen = vec![false; n_terms];
    let mut missing = n_terms;
    let mut last = None;
    for (i, &(_, term)) in entries.iter().enumerate().skip(start) {
        if !seen[term] {
            seen[term] = true;
            missing -= 1;
            if missing == 0 {
                last = Some(i);
                break;
            }
        }
    }
    let last = last?;

    // shrink from the left: walk back to the latest start that still covers
    seen.iter_mut().for_each(|s| *s = false);
    missing = n_terms;
    let mut first = last;
    loop {
        let term = entries[first].1;
        if !seen[term] {
            seen[term] = true;
            missing -= 1;
            if missing == 0 {
                return Some((first, last));
            }
        }
        first = first.checked_sub(1)?;
    }
}

/// Merge per-term positions into one ascending, deduplicated list
pub fn matched_positions(term_positions: &[Vec<u32>]) -> Vec<u32> {
    let mut all: Vec<u32> = term_positions.iter().flatten().copied().collect();
    all.sort_unstable();
    all.dedup();
    all
}

/// Combine exact and fuzzy scores for combined-mode search
pub fn combined_score(exact: Option<f32>, fuzzy: Option<f32>, fuzzy_weight: f32) -> f32 {
    exact.unwrap_or(0.0) + fuzzy.unwrap_or(0.0) * fuzzy_weight
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_single_term_counts_occurrences() {
        assert!(approx(cover_density(&[vec![4]]), 0.1));
        assert!(approx(cover_density(&[vec![1, 7, 9]]), 0.3));
    }

    #[test]
    fn test_adjacent_terms_beat_scattered() {
        let adjacent = cover_density(&[vec![1], vec![2], vec![3]]);
        let scattered = cover_density(&[vec![1], vec![20], vec![40]]);
        assert!(approx(adjacent, 0.1));
        assert!(adjacent > scattered);
        // span 39, 2 inner steps -> 37 noise
        assert!(approx(scattered, 0.1 / 38.0));
    }

    #[test]
    fn test_multiple_covers_accumulate() {
        // "a b ... a b" has two tight covers
        let score = cover_density(&[vec![1, 10], vec![2, 11]]);
        // covers: [1,2], [2,10] (noise 7), [10,11]
        assert!(approx(score, 0.1 + 0.1 / 8.0 + 0.1));
    }

    #[test]
    fn test_missing_term_scores_zero() {
        assert_eq!(cover_density(&[vec![1], vec![]]), 0.0);
        assert_eq!(cover_density(&[]), 0.0);
    }

    #[test]
    fn test_shared_position_noise() {
        // compound and its part at the same position
        let score = cover_density(&[vec![3], vec![3]]);
        assert!(approx(score, 0.1));
    }

    #[test]
    fn test_matched_positions_and_combined() {
        assert_eq!(matched_positions(&[vec![5, 1], vec![1, 3]]), vec![1, 3, 5]);
        assert!(approx(combined_score(Some(0.2), Some(0.5), 0.5), 0.45));
        assert!(approx(combined_score(None, Some(0.5), 1.0), 0.5));
        assert!(approx(combined_score(Some(0.2), None, 1.0), 0.2));
    }
}
