/// Authentication module
///
/// Token encoding, password hashing, and the cookie-based session protocol.

mod claims;
mod jwt;
mod password;
mod session;

pub use claims::{Claims, TokenType};
pub use jwt::TokenCodec;
pub use password::{BcryptHasher, PasswordHasher};
pub use session::{SessionManager, SessionTokens, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
