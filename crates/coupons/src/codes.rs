//! Coupon code generation.

use rand::Rng;

/// Charset for generated codes. Ambiguous glyphs (0/O, 1/I/L) are excluded
/// so codes survive being read aloud or retyped from a receipt.
const CODE_CHARSET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Generate a random coupon code: `<prefix>-<length random chars>`. Codes
/// are non-sequential; uniqueness is enforced by the ledger at insert time.
pub fn generate_code(prefix: &str, length: usize, rng: &mut impl Rng) -> String {
    let body: String = (0..length)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect();
    if prefix.is_empty() {
        body
    } else {
        format!("{prefix}-{body}")
    }
}
