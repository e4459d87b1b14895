//! Token-order-insensitive string similarity on a 0-100 scale.

use rapidfuzz::fuzz;

/// Sorts whitespace-separated tokens and scores the re-joined strings with
/// [`ratio`]. "Bank of America" and "America Bank of" score 100.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Normalized indel similarity, `100 * 2 * LCS / (len(a) + len(b))`,
/// counted in characters. Two empty strings are identical.
pub fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    100.0 * fuzz::ratio(a.chars(), b.chars())
}
