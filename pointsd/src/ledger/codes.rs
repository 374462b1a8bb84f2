use rand::Rng;

/// Uppercase letters and digits without the easily confused `I`, `O`, `0` and `1`.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub const REDEMPTION_CODE_LENGTH: usize = 12;
pub const INVITATION_CODE_LENGTH: usize = 8;

/// Generate a random human-typeable code
pub fn generate_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}
