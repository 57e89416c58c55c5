//! Fuzzy similarity judgement of generated text.
//!
//! LLM generation is not bit-reproducible across hardware and kernel
//! versions, so conformance passes on a fuzzy acceptance band instead of
//! exact match. The metric is a character-level longest-common-subsequence
//! ratio, `2·|LCS(a, b)| / (|a| + |b|)`, in `[0, 1]`; a pair passes when
//! its score meets the scenario's threshold.

use serde::{Deserialize, Serialize};

/// Threshold applied when a scenario does not override it.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.8;

/// Outcome of judging one (actual, expected) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Judgement {
    /// `score >= threshold`.
    pub passed: bool,
    /// Similarity score in `[0, 1]`.
    pub score: f32,
}

/// Similarity ratio between two strings.
///
/// Computes `2·|LCS(a, b)| / (|a| + |b|)` over Unicode scalar values.
/// Two empty strings score `1.0` (the formula's limit), so an empty
/// reference only matches empty or near-empty output — there is no
/// special-case short-circuit. The ratio is symmetric, and identical
/// inputs always score exactly `1.0`.
///
/// # Examples
///
/// ```
/// use modelconf_harness::judge::similarity_ratio;
///
/// assert_eq!(similarity_ratio("2", "2"), 1.0);
/// assert_eq!(similarity_ratio("abcd", "bcde"), 0.75);
/// assert_eq!(similarity_ratio("abc", "xyz"), 0.0);
/// ```
pub fn similarity_ratio(a: &str, b: &str) -> f32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let lcs = lcs_len(&a, &b);
    ((2 * lcs) as f64 / (a.len() + b.len()) as f64) as f32
}

/// Judge one generated text against its reference.
///
/// # Examples
///
/// ```
/// use modelconf_harness::judge::judge;
///
/// let j = judge("D E F G H I J K L M", "D E F G H I J K L M", 0.8);
/// assert!(j.passed);
/// assert_eq!(j.score, 1.0);
///
/// let j = judge("I don't know", "D E F G H I J K L M", 0.8);
/// assert!(!j.passed);
/// ```
pub fn judge(actual: &str, expected: &str, threshold: f32) -> Judgement {
    let score = similarity_ratio(actual, expected);
    Judgement { passed: score >= threshold, score }
}

/// Length of the longest common subsequence, O(|a|·|b|) time, O(|b|) space.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_exactly_one() {
        for s in ["2", "D E F G H I J K L M", "def print_hello_world():", "日本語"] {
            let j = judge(s, s, 1.0);
            assert!(j.passed);
            assert_eq!(j.score, 1.0);
        }
    }

    #[test]
    fn disjoint_strings_score_zero() {
        assert_eq!(similarity_ratio("aaaa", "bbbb"), 0.0);
    }

    #[test]
    fn known_partial_overlap() {
        // LCS("abcd", "bcde") = "bcd", ratio = 2*3 / 8.
        assert_eq!(similarity_ratio("abcd", "bcde"), 0.75);
    }

    #[test]
    fn both_empty_score_one() {
        assert_eq!(similarity_ratio("", ""), 1.0);
    }

    #[test]
    fn empty_expected_rejects_nonempty_actual() {
        let j = judge("anything at all", "", 0.8);
        assert!(!j.passed);
        assert_eq!(j.score, 0.0);
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        // ratio 0.75 against threshold 0.75 passes, against 0.76 fails
        assert!(judge("abcd", "bcde", 0.75).passed);
        assert!(!judge("abcd", "bcde", 0.76).passed);
    }

    #[test]
    fn unicode_is_compared_per_scalar_value() {
        // 3 shared of 4+4 chars
        assert_eq!(similarity_ratio("日本語x", "日本語y"), 0.75);
    }
}
