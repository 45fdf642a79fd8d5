/// Password Hashing and Verification
///
/// bcrypt with a per-hash random salt. Strength rules live in `validators`.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::AppError;

pub trait PasswordHasher: Send + Sync {
    /// Salted one-way hash; two calls with the same input give different output.
    fn hash(&self, password: &str) -> Result<String, AppError>;

    /// Check `password` against a stored hash. A malformed hash never matches.
    fn verify(&self, password: &str, hash: &str) -> bool;
}

#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, password: &str) -> Result<String, AppError> {
        hash(password, self.cost)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        match verify(password, hash) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::error!("Stored password hash is unreadable: {}", e);
                false
            }
        }
    }
}
