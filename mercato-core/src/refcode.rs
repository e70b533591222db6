use rand::Rng;

/// Length of an order reference code
pub const REF_CODE_LEN: usize = 20;

const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generate a random lowercase alphanumeric reference code. Assigned to an
/// order exactly once, at fulfillment.
pub fn generate() -> String {
    let mut rng = rand::rng();
    (0..REF_CODE_LEN)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}
