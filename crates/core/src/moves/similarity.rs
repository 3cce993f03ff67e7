//! Line similarity for move detection

use rustc_hash::FxHashMap;

/// Above this combined length, strings are compared for equality only
pub const HISTOGRAM_MAX_LEN: usize = 20_000;

/// Similarity of two strings, 0.0 to 1.0
///
/// Compares character histograms: `1 - diff / (len1 + len2)` where `diff`
/// sums the per-character count differences. Order is ignored, so a line and
/// its anagram score 1.0. Very large inputs fall back to exact equality.
pub fn similarity(one: &str, two: &str) -> f64 {
    let len1 = one.chars().count();
    let len2 = two.chars().count();
    let total = len1 + len2;
    if total == 0 {
        return 1.0;
    }
    if total > HISTOGRAM_MAX_LEN {
        return if one == two { 1.0 } else { 0.0 };
    }

    let mut histogram: FxHashMap<char, i64> = FxHashMap::default();
    for ch in one.chars() {
        *histogram.entry(ch).or_insert(0) += 1;
    }
    for ch in two.chars() {
        *histogram.entry(ch).or_insert(0) -= 1;
    }
    let diff: i64 = histogram.values().map(|count| count.abs()).sum();

    1.0 - diff as f64 / total as f64
}

/// Mean similarity of aligned line pairs
pub fn average_similarity<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> f64 {
    let (sum, count) = pairs
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), (one, two)| {
            (sum + similarity(one, two), count + 1)
        });
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_and_empty() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("abc", "abc"), 1.0);
        assert_eq!(similarity("abc", ""), 0.0);
    }

    #[test]
    fn test_histogram_ignores_order() {
        assert_eq!(similarity("abc", "cba"), 1.0);
    }

    #[test]
    fn test_partial_overlap() {
        // {a:1,b:1} vs {a:1,c:1}: diff 2 over 4 characters.
        assert_eq!(similarity("ab", "ac"), 0.5);
        assert_eq!(similarity("aaaa", "aa"), 1.0 - 2.0 / 6.0);
    }

    #[test]
    fn test_large_inputs_use_equality() {
        let one = "a".repeat(10_001);
        let two: String = "a".repeat(10_000) + "b";
        assert_eq!(similarity(&one, &one), 1.0);
        assert_eq!(similarity(&one, &two), 0.0);
        // Just under the limit the histogram is still used.
        let three = "a".repeat(9_999) + "b";
        assert!(similarity(&"a".repeat(10_000), &three) > 0.99);
    }

    #[test]
    fn test_average_similarity() {
        assert_eq!(average_similarity([("ab", "ab"), ("ab", "ac")]), 0.75);
        assert_eq!(average_similarity(std::iter::empty()), 0.0);
    }
}
