//! Credential generation for tenant databases and runtime secrets.
//!
//! All values are drawn from the OS-seeded CSPRNG behind `rand::rng()`.
//! Entropy exhaustion aborts the process; it is never retried.

use rand::prelude::*;

/// Alphabet for database passwords: alphanumerics plus symbols that survive
/// being embedded in env files and quoted SQL literals.
const PASSWORD_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ\
                                  abcdefghijklmnopqrstuvwxyz\
                                  0123456789\
                                  !@#%^*-_=+";

/// Alphabet for runtime secret keys (URL-safe).
const SECRET_KEY_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ\
                                    abcdefghijklmnopqrstuvwxyz\
                                    0123456789-_";

/// Generate a random password of the given length.
pub fn generate_password(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..PASSWORD_CHARSET.len());
            PASSWORD_CHARSET[idx] as char
        })
        .collect()
}

/// Generate a URL-safe secret key for a deployed runtime.
pub fn generate_secret_key() -> String {
    let mut rng = rand::rng();
    (0..50)
        .map(|_| {
            let idx = rng.random_range(0..SECRET_KEY_CHARSET.len());
            SECRET_KEY_CHARSET[idx] as char
        })
        .collect()
}
