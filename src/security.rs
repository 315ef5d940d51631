use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct HashError(String);

pub fn hash_password(password: &str) -> Result<String, HashError> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes()).map_err(|e| HashError(e.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| HashError(e.to_string()))
}

/// False for a wrong password and for a stored hash that does not parse.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            log::warn!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}

pub fn generate_auth_key() -> String {
    Uuid::new_v4().simple().to_string()
}

/// `<random>_<issued-at>`; the suffix lets the token carry its own age.
pub fn generate_reset_token(now: i64) -> String {
    format!("{}_{}", Uuid::new_v4().simple(), now)
}

pub fn is_reset_token_valid(token: &str, now: i64, ttl_secs: i64) -> bool {
    let Some((random, issued_at)) = token.rsplit_once('_') else {
        return false;
    };
    if random.is_empty() {
        return false;
    }
    match issued_at.parse::<i64>() {
        Ok(issued_at) => issued_at <= now && issued_at.saturating_add(ttl_secs) >= now,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_passwords_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("battery staple", &hash));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let first = hash_password("s3cret").unwrap();
        let second = hash_password("s3cret").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn auth_keys_are_32_hex_chars() {
        let key = generate_auth_key();
        assert_eq!(key.len(), 32);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(key, generate_auth_key());
    }

    #[test]
    fn reset_tokens_expire_after_ttl() {
        let issued = 1_700_000_000;
        let token = generate_reset_token(issued);
        assert!(is_reset_token_valid(&token, issued, 3600));
        assert!(is_reset_token_valid(&token, issued + 3600, 3600));
        assert!(!is_reset_token_valid(&token, issued + 3601, 3600));
    }

    #[test]
    fn malformed_reset_tokens_are_invalid() {
        assert!(!is_reset_token_valid("abc", 10, 3600));
        assert!(!is_reset_token_valid("_10", 10, 3600));
        assert!(!is_reset_token_valid("abc_later", 10, 3600));
        assert!(!is_reset_token_valid("abc_20", 10, 3600));
    }

    #[test]
    fn huge_issue_times_do_not_overflow() {
        let token = format!("abc_{}", i64::MAX - 10);
        assert!(is_reset_token_valid(&token, i64::MAX, 3600));
        assert!(!is_reset_token_valid("abc_0", i64::MAX, i64::MAX - 1));
    }
}
