//! Heuristic confidence scores.
//!
//! None of these look at meaning: they are cheap signals of whether an
//! extractor produced readable text at all.

/// Number of words at which the length heuristic saturates.
pub const WORDS_FOR_FULL_CONFIDENCE: f64 = 250.0;

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Fraction of alphabetic characters in `text`, rounded to 2 decimals.
///
/// Whitespace counts towards the denominator, so sparse or noisy output
/// scores lower than dense prose. Empty text scores 0.
pub fn alpha_ratio(text: &str) -> f64 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    let alphabetic = text.chars().filter(|c| c.is_alphabetic()).count();
    round2(alphabetic as f64 / total as f64)
}

/// Length-based confidence: `min(1.0, word_count / 250)`.
pub fn word_count_confidence(text: &str) -> f64 {
    let words = text.split_whitespace().count() as f64;
    (words / WORDS_FOR_FULL_CONFIDENCE).min(1.0)
}

/// Mean of per-unit confidences, rounded to 2 decimals.
///
/// Returns exactly `0.0` for an empty sequence and always stays in [0, 1].
pub fn mean_confidence<I>(scores: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = scores
        .into_iter()
        .fold((0.0, 0usize), |(sum, n), s| (sum + s.clamp(0.0, 1.0), n + 1));
    if count == 0 {
        return 0.0;
    }
    round2(sum / count as f64)
}
