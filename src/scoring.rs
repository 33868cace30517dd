//! Heuristic quality score for a completed step.

/// Score a step from its latency and the length of its response.
///
/// Latency tiers: under 3s → 5, under 10s → 3, otherwise 1. Length tiers
/// (in characters): over 100 → 5, over 50 → 3, otherwise 1. The score is
/// the mean of the two tiers, always one of 1..=5.
///
/// ```
/// use prompt_bridge::scoring::score;
///
/// assert_eq!(score(500, 200), 5);
/// assert_eq!(score(15_000, 10), 1);
/// ```
pub fn score(elapsed_ms: u64, response_len: usize) -> u8 {
    let time_tier: u8 = if elapsed_ms < 3_000 {
        5
    } else if elapsed_ms < 10_000 {
        3
    } else {
        1
    };
    let length_tier: u8 = if response_len > 100 {
        5
    } else if response_len > 50 {
        3
    } else {
        1
    };
    // Both tiers are odd, so the sum is even and the mean exact.
    (time_tier + length_tier) / 2
}

/// [`score`] for a response string, counting characters rather than bytes.
pub fn score_response(elapsed_ms: u64, response: &str) -> u8 {
    score(elapsed_ms, response.chars().count())
}
