//! Random record identities.
use rand::Rng;
use tracing::{debug, warn};

use crate::error::{Result, TableError};

/// length of the identities handed out by the server
pub const ID_LENGTH: usize = 8;

/// characters an identity is drawn from
pub const ID_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// number of candidates drawn before giving up on finding an unused identity
pub const MAX_ATTEMPTS: u32 = 1024;

/// draws identities of `length` characters, each picked uniformly from `alphabet`, until one is
/// found for which `is_known` returns false.
///
/// The returned identity is not registered anywhere. Callers must register it as part of the
/// operation that uses it, otherwise a later call may hand out the same identity again.
///
/// # Errors
/// returns [`TableError::GenerationExhausted`] if every one of [`MAX_ATTEMPTS`] candidates was
/// already known, and [`TableError::InvalidArgument`] if `alphabet` is empty
pub fn generate_unique<R, F>(rng: &mut R, length: usize, alphabet: &str, is_known: F) -> Result<String>
where
    R: Rng + ?Sized,
    F: Fn(&str) -> bool,
{
    let chars: Vec<char> = alphabet.chars().collect();
    if chars.is_empty() {
        return Err(TableError::InvalidArgument("the identity alphabet is empty".to_string()));
    }

    for attempt in 1..=MAX_ATTEMPTS {
        let candidate: String = (0..length)
            .map(|_| chars[rng.gen_range(0..chars.len())])
            .collect();
        if !is_known(&candidate) {
            debug!(attempt, "generated identity");
            return Ok(candidate);
        }
    }

    warn!("no unused identity after {} attempts", MAX_ATTEMPTS);
    Err(TableError::GenerationExhausted(MAX_ATTEMPTS))
}
