use std::cell::Cell;
use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tabledb::idgen::{generate_unique, ID_ALPHABET, ID_LENGTH, MAX_ATTEMPTS};
use tabledb::TableError;

#[test]
fn identities_use_length_and_alphabet() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..100 {
        let id = generate_unique(&mut rng, ID_LENGTH, ID_ALPHABET, |_| false).unwrap();
        assert_eq!(id.chars().count(), ID_LENGTH);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()), "{}", id);
    }
}

#[test]
fn alphabet_covers_every_letter() {
    for c in ('A'..='Z').chain('a'..='z').chain('0'..='9') {
        assert!(ID_ALPHABET.contains(c), "{}", c);
    }
    assert_eq!(ID_ALPHABET.len(), 62);
}

#[test]
fn known_identities_are_skipped() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut known = HashSet::new();
    // a two letter alphabet with length 3 has only 8 identities
    for _ in 0..8 {
        let id = generate_unique(&mut rng, 3, "ab", |c| known.contains(c)).unwrap();
        assert!(known.insert(id));
    }
    assert_eq!(known.len(), 8);
}

#[test]
fn exhausted_after_max_attempts() {
    let mut rng = StdRng::seed_from_u64(3);
    let attempts = Cell::new(0u32);
    let result = generate_unique(&mut rng, 4, ID_ALPHABET, |_| {
        attempts.set(attempts.get() + 1);
        true
    });
    assert!(matches!(result, Err(TableError::GenerationExhausted(n)) if n == MAX_ATTEMPTS));
    assert_eq!(attempts.get(), MAX_ATTEMPTS);
}

#[test]
fn empty_alphabet() {
    let mut rng = StdRng::seed_from_u64(3);
    assert!(matches!(
        generate_unique(&mut rng, 4, "", |_| false),
        Err(TableError::InvalidArgument(_))
    ));
}
