/// JWT Claims structure
///
/// The payload carried by both session tokens. `token_type` pins a token to
/// the context it was issued for, so a refresh token never authorizes a request.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::Access => write!(f, "access"),
            TokenType::Refresh => write!(f, "refresh"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user id)
    pub sub: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub token_type: TokenType,
}

impl Claims {
    /// Stamp a fresh payload: `iat = now`, `exp = now + ttl`.
    pub fn new(user_id: i64, token_type: TokenType, ttl: Duration) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user_id,
            exp: now + ttl.num_seconds(),
            iat: now,
            token_type,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.exp <= Utc::now().timestamp()
    }

    /// True when the token is of `expected` type and still inside its lifetime.
    pub fn is_valid_for(&self, expected: TokenType) -> bool {
        self.token_type == expected && !self.is_expired()
    }
}
