use anyhow::{Context, Result};

/// Hash a password with the given bcrypt cost.
pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    bcrypt::hash(password, cost).context("Failed to hash password")
}

/// Verify a password against any bcrypt variant ($2a$, $2b$, $2y$).
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    bcrypt::verify(password, hash).context("Failed to verify password")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("rahasia123", TEST_COST).unwrap();
        assert!(verify_password("rahasia123", &hash).unwrap());
        assert!(!verify_password("salah", &hash).unwrap());
    }

    #[test]
    fn cost_is_encoded_in_hash() {
        let hash = hash_password("rahasia123", TEST_COST).unwrap();
        assert!(hash.contains("$04$"));
    }

    #[test]
    fn accepts_2a_prefix_hashes() {
        let hash = hash_password("rahasia123", TEST_COST).unwrap();
        let legacy = hash.replacen("$2b$", "$2a$", 1);
        assert!(verify_password("rahasia123", &legacy).unwrap());
    }
}
