use anyhow::anyhow;
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;

/// Argon2id with the crate's default cost parameters. Stored hashes are PHC
/// strings, so verification reads the parameters back out of the hash itself.
fn argon() -> Argon2<'static> {
    Argon2::default()
}

/// Hashes a plaintext password with a fresh random salt.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    argon()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("could not hash password: {e}"))
}

/// `Ok(false)` on mismatch. A stored hash that cannot be parsed, or any argon2
/// failure other than a mismatch, is an error.
pub fn verify_password(plain: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed =
        PasswordHash::new(stored).map_err(|e| anyhow!("stored password hash is unreadable: {e}"))?;
    match argon().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow!("could not verify password: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("test123").expect("hashing should succeed");
        assert_ne!(hash, "test123");
        assert!(verify_password("test123", &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = hash_password("test123").expect("hashing should succeed");
        assert!(!verify_password("test1231", &hash).expect("verify should not error"));
    }

    #[test]
    fn same_password_hashes_differently() {
        let a = hash_password("pw1").unwrap();
        let b = hash_password("pw1").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn hashes_are_argon2id_phc_strings() {
        let hash = hash_password("pw1").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("pw1"));
    }

    #[test]
    fn verify_reports_unreadable_hash() {
        let err = verify_password("pw1", "plaintext-from-somewhere").unwrap_err();
        assert!(err.to_string().starts_with("stored password hash is unreadable"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        assert!(verify_password("anything", "not-a-valid-hash").is_err());
    }
}
