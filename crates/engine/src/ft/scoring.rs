//! Relevance scores. All scores lie in `[0, 1]`.

/// Score of `hits` matches in a text of `tokens` words.
pub fn word(hits: usize, tokens: usize) -> f64 {
    if hits == 0 || tokens == 0 {
        return 0.0;
    }
    let hits = hits.min(tokens) as f64;
    (1.0 + hits).ln() / (1.0 + tokens as f64).ln()
}

/// AND combinator. A zero operand is neutral; otherwise the product.
pub fn combine(o: f64, n: f64) -> f64 {
    if o == 0.0 {
        n
    } else if n == 0.0 {
        o
    } else {
        o * n
    }
}

/// OR combinator (probabilistic sum).
pub fn or(a: f64, b: f64) -> f64 {
    a + b - a * b
}

pub fn not(s: f64) -> f64 {
    1.0 - s.clamp(0.0, 1.0)
}

/// A positive match without a score still counts as relevant.
pub fn normalize(score: f64) -> f64 {
    if score == 0.0 { 1.0 } else { score }
}
