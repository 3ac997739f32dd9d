use base64::Engine;
use rand::distr::{Alphanumeric, Distribution};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::Digest;

/// Number of characters in a submission code, after the prefix.
const SUBMISSION_CODE_LEN: usize = 8;

pub fn random_alnum_string(len: usize) -> String {
    let mut rng = StdRng::from_os_rng();
    String::from_iter((0..len).map(|_| Alphanumeric.sample(&mut rng) as char))
}

/// Generates a public submission code. Example: `ABS-K7Q2ZM4D`
pub fn new_submission_code() -> String {
    let mut rng = StdRng::from_os_rng();
    let code = String::from_iter(
        (0..SUBMISSION_CODE_LEN).map(|_| rng.random_range(0..36_u32)).map(|n| {
            char::from_digit(n, 36)
                .unwrap_or('0')
                .to_ascii_uppercase()
        }),
    );
    format!("ABS-{code}")
}

/// Lowercased, trimmed form of an email address used for lookups.
pub fn canonical_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hash of a throwaway random credential. The plaintext is never stored or
/// transmitted; it exists only to satisfy the auth subsystem's requirement
/// that every account carry a password.
pub fn random_password_hash() -> String {
    let mut rng = StdRng::from_os_rng();
    let mut bytes = [0_u8; 32];
    rng.fill(&mut bytes);
    let digest = sha2::Sha256::digest(bytes);
    base64::engine::general_purpose::STANDARD.encode(digest)
}
