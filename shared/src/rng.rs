//! Randomness and name hashing.
//!
//! Every stochastic decision in the core draws from a [`Roll`] so tests can
//! script the sequence. Name hashing is deterministic: the same boss name gives
//! the same archetype on every client with no stored configuration.

use rand::Rng;

/// Source of uniform rolls in `[0.0, 1.0)`.
pub trait Roll {
    fn roll(&mut self) -> f32;

    /// Uniform value in `[lo, hi)`.
    fn range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + self.roll() * (hi - lo)
    }

    /// `-1.0` or `1.0` with equal odds.
    fn sign(&mut self) -> f32 {
        if self.roll() > 0.5 { 1.0 } else { -1.0 }
    }
}

impl<R: rand::RngCore> Roll for R {
    fn roll(&mut self) -> f32 {
        self.random::<f32>()
    }
}

/// String hash over UTF-16 code units: `h = c + ((h << 5) - h)`.
///
/// The shift truncates `h` to 32 bits first and wraps; the subtraction and
/// addition do not, so the accumulator is kept wide.
pub fn hash_name(name: &str) -> i64 {
    let mut hash: i64 = 0;
    for unit in name.encode_utf16() {
        let shifted = (hash as i32).wrapping_shl(5) as i64;
        hash = i64::from(unit) + (shifted - hash);
    }
    hash
}

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Fresh local peer id: `p_` followed by nine base-36 characters.
pub fn generate_peer_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut id = String::with_capacity(11);
    id.push_str("p_");
    for _ in 0..9 {
        let idx = rng.random_range(0..BASE36.len());
        id.push(BASE36[idx] as char);
    }
    id
}
