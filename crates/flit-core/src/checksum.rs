//! SHA-256 fingerprints for migration names.

use sha2::{Digest, Sha256};

/// Compute the fingerprint recorded for a migration name.
///
/// Only the name is hashed, never the file contents: editing an applied
/// migration does not make it pending again, renaming it does.
pub fn fingerprint(name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    let result = hasher.finalize();
    format!("{:x}", result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_known_vectors() {
        assert_eq!(
            fingerprint(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            fingerprint("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_fingerprint_shape() {
        let sum = fingerprint("001-first.sql");
        assert_eq!(sum.len(), 64);
        assert!(sum
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_fingerprint_depends_on_full_name() {
        assert_eq!(fingerprint("001-first.sql"), fingerprint("001-first.sql"));
        assert_ne!(
            fingerprint("001-first.sql"),
            fingerprint("example/001-first.sql")
        );
    }
}
