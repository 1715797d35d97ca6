// Similarity scoring - normalized Levenshtein closeness on normalized text.

use super::normalizer::normalize;

/// Default score (0-100) at which two messages count as the same post.
pub const DEFAULT_THRESHOLD: f64 = 80.0;

/// Closeness of two raw messages as a percentage in `[0, 100]`.
///
/// Both inputs are normalized first. Empty text never matches anything,
/// identical text is exactly 100, everything else is
/// `(1 - distance / longer_length) * 100`, unrounded.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 100.0;
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let max_len = a.len().max(b.len());
    let distance = levenshtein(&a, &b);

    (1.0 - distance as f64 / max_len as f64) * 100.0
}

/// Unit-cost edit distance (insert, delete, substitute), two-row DP.
fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_levenshtein_basics() {
        assert_eq!(levenshtein(&chars("kitten"), &chars("sitting")), 3);
        assert_eq!(levenshtein(&chars(""), &chars("abc")), 3);
        assert_eq!(levenshtein(&chars("abc"), &chars("abc")), 0);
        assert_eq!(levenshtein(&chars("flaw"), &chars("lawn")), 2);
    }

    #[test]
    fn test_identical_is_exactly_100() {
        let s = "Please check out our new channel for announcements";
        assert_eq!(similarity(s, s), 100.0);
        // Differences that vanish under normalization still count as identical.
        assert_eq!(similarity("**Hello** there friends", "hello   there FRIENDS"), 100.0);
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(similarity("", "anything at all"), 0.0);
        assert_eq!(similarity("anything at all", ""), 0.0);
        assert_eq!(similarity("<@123>", "<@123>"), 0.0);
    }

    #[test]
    fn test_symmetric() {
        let pairs = [
            ("buy cheap coins now", "buy cheap coin now!"),
            ("hello world", "goodbye world"),
            ("short", "a much longer message entirely"),
        ];
        for (a, b) in pairs {
            assert_eq!(similarity(a, b), similarity(b, a));
        }
    }

    #[test]
    fn test_one_character_difference_passes_default_threshold() {
        let a = "Please check out our new channel for announcements";
        let b = "Please check out our new channel for announcement";
        let score = similarity(a, b);
        assert!(score > 97.0 && score < 100.0, "score was {score}");
        assert!(score >= DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_unrelated_messages_fail_threshold() {
        let score = similarity(
            "does anyone know how to fix this compiler error",
            "the weather has been lovely this week honestly",
        );
        assert!(score < DEFAULT_THRESHOLD, "score was {score}");
    }
}
