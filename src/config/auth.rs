use super::{env_flag, env_parse};

#[derive(Debug, Clone, Copy)]
pub struct AuthConfig {
    /// bcrypt work factor used for new hashes.
    pub bcrypt_cost: u32,
    /// When false every self-registered account is a buyer.
    pub allow_seller_registration: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: 10,
            allow_seller_registration: true,
        }
    }
}

impl AuthConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let bcrypt_cost = env_parse("BCRYPT_COST", defaults.bcrypt_cost).clamp(4, 31);

        Self {
            bcrypt_cost,
            allow_seller_registration: env_flag(
                "ALLOW_SELLER_REGISTRATION",
                defaults.allow_seller_registration,
            ),
        }
    }
}
