// src/rate.rs
// Token-budget pacing math. Advisory only: the remote limiter is the
// source of truth, and the client retry path tolerates these being wrong.

/// Token-equivalents per minute granted by the remote rate limit.
pub const TOKENS_PER_MINUTE: u64 = 6000;

/// Rough estimate: 1 token ≈ 4 characters.
pub fn estimate_tokens(char_count: usize) -> u64 {
    (char_count as u64).div_ceil(4)
}

/// Milliseconds to wait before sending a request worth `token_count`
/// tokens, including a fixed 2 second safety buffer.
pub fn required_delay_ms(token_count: u64) -> u64 {
    let tokens_per_second = TOKENS_PER_MINUTE / 60;
    let drain_ms = (token_count * 1000).div_ceil(tokens_per_second);
    drain_ms + 2000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens(0), 0);
        assert_eq!(estimate_tokens(1), 1);
        assert_eq!(estimate_tokens(4), 1);
        assert_eq!(estimate_tokens(5), 2);
        assert_eq!(estimate_tokens(12000), 3000);
    }

    #[test]
    fn test_required_delay_includes_buffer() {
        // 100 tokens at 100 tokens/sec drains in 1s, plus the 2s buffer
        assert_eq!(required_delay_ms(100), 3000);
        assert_eq!(required_delay_ms(0), 2000);
    }

    #[test]
    fn test_monotonicity() {
        let mut last_tokens = 0;
        let mut last_delay = 0;
        for chars in (0..50_000).step_by(997) {
            let tokens = estimate_tokens(chars);
            assert!(tokens >= last_tokens);
            let delay = required_delay_ms(tokens);
            assert!(delay >= last_delay);
            last_tokens = tokens;
            last_delay = delay;
        }
    }
}
