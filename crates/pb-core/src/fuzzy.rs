//! Edit distance and near-miss name suggestions.

use smallvec::SmallVec;

/// Names further away than this are not offered as suggestions.
pub const MAX_SUGGESTION_DISTANCE: usize = 5;

/// Upper bound on suggestions per unknown name.
pub const MAX_SUGGESTIONS: usize = 3;

/// Case-insensitive Levenshtein distance over Unicode scalar values.
///
/// Unit cost for insert, delete, and substitute. O(|a|·|b|) time and space.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().flat_map(char::to_lowercase).collect();
    let b: Vec<char> = b.chars().flat_map(char::to_lowercase).collect();
    let (m, n) = (a.len(), b.len());

    let mut dp = vec![vec![0usize; n + 1]; m + 1];
    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=n {
        dp[0][j] = j;
    }

    for i in 1..=m {
        for j in 1..=n {
            dp[i][j] = if a[i - 1] == b[j - 1] {
                dp[i - 1][j - 1]
            } else {
                1 + dp[i - 1][j].min(dp[i][j - 1]).min(dp[i - 1][j - 1])
            };
        }
    }

    dp[m][n]
}

/// Up to [`MAX_SUGGESTIONS`] candidates within `max_distance` of `name`,
/// closest first. Ties keep candidate order.
pub fn find_similar_names(
    name: &str,
    candidates: &[&str],
    max_distance: usize,
) -> SmallVec<[String; MAX_SUGGESTIONS]> {
    let mut scored: Vec<(usize, &str)> = candidates
        .iter()
        .map(|c| (levenshtein(name, c), *c))
        .filter(|(d, _)| *d <= max_distance)
        .collect();
    scored.sort_by_key(|(d, _)| *d);

    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, c)| c.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_distances() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("Delta Lake", "Delta Lake"), 0);
    }

    #[test]
    fn distance_ignores_case() {
        assert_eq!(levenshtein("IOT HUB", "IoT Hub"), 0);
        assert_eq!(
            levenshtein("Battery managment System", "Battery Management System"),
            1
        );
    }

    #[test]
    fn distance_counts_chars_not_bytes() {
        assert_eq!(levenshtein("Größe", "Grosse"), 3);
    }

    #[test]
    fn suggestions_sorted_and_capped() {
        let candidates = ["Gold Layer", "Bronze Layer", "Silver Layer", "Cold Layer", "Bold Layer"];
        let found = find_similar_names("Gold Layr", &candidates, MAX_SUGGESTION_DISTANCE);
        assert_eq!(found.len(), 3);
        assert_eq!(found[0], "Gold Layer");
        // "Cold Layer" and "Bold Layer" tie at 2; catalog order wins.
        assert_eq!(found[1], "Cold Layer");
        assert_eq!(found[2], "Bold Layer");
    }

    #[test]
    fn nothing_within_distance() {
        let found = find_similar_names("Quantum Flux", &["IoT Hub"], MAX_SUGGESTION_DISTANCE);
        assert!(found.is_empty());
    }
}
