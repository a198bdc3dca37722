//! Content fingerprinting for card deduplication.
//!
//! Two cards with the same question and answer, up to whitespace and
//! casing, must produce the same digest. The digest is the uniqueness
//! key scoped to a tenant: the `cards` table carries a
//! UNIQUE(tenant_id, fingerprint) constraint and creation treats a
//! violation as "already exists".

use sha2::{Digest, Sha256};

/// Collapses whitespace runs to single spaces, trims, and lowercases.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Returns the hex-encoded SHA-256 digest of the normalized
/// question/answer pair. Deterministic and pure.
#[must_use]
pub fn fingerprint(question: &str, answer: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize(question).as_bytes());
    // Separator keeps ("ab", "c") distinct from ("a", "bc"); normalized
    // text can never contain a newline.
    hasher.update(b"\n");
    hasher.update(normalize(answer).as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_deterministic() {
        let a = fingerprint("What is Rust?", "A systems language");
        let b = fingerprint("What is Rust?", "A systems language");
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_normalizes_whitespace_and_case() {
        let a = fingerprint("What is  Rust? ", "a systems language");
        let b = fingerprint("what is rust?", "A  Systems\tLanguage");
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_distinct_content() {
        let a = fingerprint("What is Rust?", "A systems language");
        let b = fingerprint("What is Go?", "A systems language");
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_boundary_not_ambiguous() {
        let a = fingerprint("ab", "c");
        let b = fingerprint("a", "bc");
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_is_hex_sha256() {
        let digest = fingerprint("q", "a");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
