/// Session Management
///
/// Stateless sessions carried in two HttpOnly cookies, each holding a signed
/// `Claims`:
/// - `access_token`: short-lived, authorizes requests
/// - `refresh_token`: long-lived, only mints new access tokens
///
/// Nothing is stored server-side. Two known limitations follow from that:
/// logout only deletes the cookies, so an already-issued token stays valid
/// until it expires; and refresh tokens are never rotated, so a leaked
/// refresh token keeps minting access tokens for its whole lifetime.

use actix_web::cookie::{Cookie, SameSite};
use chrono::Duration;
use std::sync::Arc;

use crate::auth::claims::{Claims, TokenType};
use crate::auth::jwt::TokenCodec;
use crate::auth::password::PasswordHasher;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};
use crate::users::{User, UserStore};

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Hashed once per manager; unknown emails are verified against it.
const DUMMY_PASSWORD: &str = "not-a-real-password";

/// Token pair issued on successful login.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    codec: Arc<TokenCodec>,
    dummy_hash: Arc<str>,
    access_ttl: Duration,
    refresh_ttl: Duration,
    cookie_secure: bool,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
        codec: Arc<TokenCodec>,
        jwt_settings: &JwtSettings,
    ) -> Self {
        let dummy_hash = hasher.hash(DUMMY_PASSWORD).unwrap_or_else(|e| {
            tracing::error!("Failed to prepare dummy password hash: {}", e);
            String::new()
        });

        Self {
            store,
            hasher,
            codec,
            dummy_hash: dummy_hash.into(),
            access_ttl: jwt_settings.access_token_ttl(),
            refresh_ttl: jwt_settings.refresh_token_ttl(),
            cookie_secure: false,
        }
    }

    /// Mark issued cookies `Secure`.
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Create a user. Does not log them in.
    ///
    /// # Errors
    /// `AppError::Conflict` if the email is taken, whether caught by the
    /// lookup here or by the store's unique constraint on a concurrent insert.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AppError> {
        if self.store.find_by_email(email).await?.is_some() {
            return Err(AppError::Conflict("User already exists".to_string()));
        }

        let password_hash = self.hasher.hash(password)?;
        let user = self.store.insert(email, &password_hash).await?;

        tracing::info!(user_id = user.id, "User registered");
        Ok(user)
    }

    /// Check credentials and issue a fresh access/refresh pair.
    ///
    /// # Errors
    /// `AuthError::InvalidCredentials` for an unknown email and for a wrong
    /// password alike. Both paths run one password verification so their
    /// latency matches.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(User, SessionTokens), AppError> {
        let user = match self.store.find_by_email(email).await? {
            Some(user) => user,
            None => {
                self.hasher.verify(password, &self.dummy_hash);
                tracing::warn!("Login attempt for unknown email");
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        if !self.hasher.verify(password, &user.password_hash) {
            tracing::warn!(user_id = user.id, "Login attempt with wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }

        let tokens = SessionTokens {
            access_token: self.issue(user.id, TokenType::Access)?,
            refresh_token: self.issue(user.id, TokenType::Refresh)?,
        };

        tracing::info!(user_id = user.id, "User logged in");
        Ok((user, tokens))
    }

    /// Resolve the user behind an access token.
    ///
    /// # Errors
    /// A `Forbidden`-class `AuthError` when the token is absent, does not
    /// verify, is not an access token, has expired, or names a user that no
    /// longer exists. Store failures propagate unchanged.
    pub async fn authorize(&self, access_token: Option<&str>) -> Result<User, AppError> {
        let token = access_token.ok_or(AuthError::MissingAccessToken)?;
        let claims = self.verify(token, TokenType::Access)?;

        match self.store.find_by_id(claims.sub).await? {
            Some(user) => Ok(user),
            None => {
                tracing::warn!(user_id = claims.sub, "Token subject no longer exists");
                Err(AuthError::UnknownSubject.into())
            }
        }
    }

    /// Mint a new access token from a refresh token. The refresh token itself
    /// is left untouched.
    ///
    /// # Errors
    /// `MissingRefreshToken`, `TokenInvalid` or `TokenRejected`, all `Forbidden`.
    pub fn refresh(&self, refresh_token: Option<&str>) -> Result<String, AppError> {
        let token = refresh_token.ok_or(AuthError::MissingRefreshToken)?;
        let claims = self.verify(token, TokenType::Refresh)?;

        let access_token = self.issue(claims.sub, TokenType::Access)?;

        tracing::info!(user_id = claims.sub, "Access token refreshed");
        Ok(access_token)
    }

    /// Decode `token` and require it to be an unexpired `expected` token.
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, AuthError> {
        let claims = self.codec.decode(token)?;

        if !claims.is_valid_for(expected) {
            tracing::debug!(
                user_id = claims.sub,
                token_type = %claims.token_type,
                expected = %expected,
                expired = claims.is_expired(),
                "Token rejected"
            );
            return Err(AuthError::TokenRejected);
        }

        Ok(claims)
    }

    fn issue(&self, user_id: i64, token_type: TokenType) -> Result<String, AppError> {
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        self.codec.encode(&Claims::new(user_id, token_type, ttl))
    }

    // ------------------------------------------------------------------
    // Cookie transport
    // ------------------------------------------------------------------

    pub fn access_cookie(&self, token: String) -> Cookie<'static> {
        self.session_cookie(ACCESS_TOKEN_COOKIE, token, self.access_ttl)
    }

    pub fn refresh_cookie(&self, token: String) -> Cookie<'static> {
        self.session_cookie(REFRESH_TOKEN_COOKIE, token, self.refresh_ttl)
    }

    /// Expired replacements for both session cookies.
    pub fn logout_cookies(&self) -> [Cookie<'static>; 2] {
        [
            self.removal_cookie(ACCESS_TOKEN_COOKIE),
            self.removal_cookie(REFRESH_TOKEN_COOKIE),
        ]
    }

    fn session_cookie(&self, name: &'static str, token: String, ttl: Duration) -> Cookie<'static> {
        Cookie::build(name, token)
            .path("/")
            .http_only(true)
            .secure(self.cookie_secure)
            .same_site(SameSite::Lax)
            .max_age(actix_web::cookie::time::Duration::seconds(ttl.num_seconds()))
            .finish()
    }

    fn removal_cookie(&self, name: &'static str) -> Cookie<'static> {
        let mut cookie = Cookie::build(name, "")
            .path("/")
            .http_only(true)
            .secure(self.cookie_secure)
            .same_site(SameSite::Lax)
            .finish();
        cookie.make_removal();
        cookie
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::BcryptHasher;
    use crate::users::InMemoryUserStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PRIVATE_PEM: &[u8] = include_bytes!("../../tests/fixtures/jwt-private.pem");
    const PUBLIC_PEM: &[u8] = include_bytes!("../../tests/fixtures/jwt-public.pem");

    fn manager_with_store(store: Arc<dyn UserStore>) -> SessionManager {
        let codec = TokenCodec::from_pem("RS256", PRIVATE_PEM, PUBLIC_PEM).unwrap();
        SessionManager::new(
            store,
            Arc::new(BcryptHasher::new(4)),
            Arc::new(codec),
            &JwtSettings::default(),
        )
    }

    fn manager() -> SessionManager {
        manager_with_store(Arc::new(InMemoryUserStore::new()))
    }

    /// Counts `verify` calls made through the wrapped bcrypt hasher.
    struct CountingHasher {
        inner: BcryptHasher,
        verifications: AtomicUsize,
    }

    impl PasswordHasher for CountingHasher {
        fn hash(&self, password: &str) -> Result<String, AppError> {
            self.inner.hash(password)
        }

        fn verify(&self, password: &str, hash: &str) -> bool {
            self.verifications.fetch_add(1, Ordering::SeqCst);
            self.inner.verify(password, hash)
        }
    }

    fn auth_error(err: AppError) -> AuthError {
        err.auth_error().cloned().expect("Expected an auth error")
    }

    #[tokio::test]
    async fn test_register_then_authenticate() {
        let sessions = manager();

        let user = sessions.register("alice@example.com", "secret123").await.unwrap();
        let (logged_in, tokens) = sessions
            .authenticate("alice@example.com", "secret123")
            .await
            .unwrap();

        assert_eq!(logged_in.id, user.id);
        let access = sessions.codec().decode(&tokens.access_token).unwrap();
        let refresh = sessions.codec().decode(&tokens.refresh_token).unwrap();
        assert_eq!(access.sub, user.id);
        assert_eq!(access.token_type, TokenType::Access);
        assert_eq!(refresh.sub, user.id);
        assert_eq!(refresh.token_type, TokenType::Refresh);
        assert!(refresh.exp > access.exp);
    }

    #[tokio::test]
    async fn test_register_stores_hash_not_plaintext() {
        let store = Arc::new(InMemoryUserStore::new());
        let sessions = manager_with_store(store.clone());

        sessions.register("alice@example.com", "secret123").await.unwrap();

        let stored = store.find_by_email("alice@example.com").await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "secret123");
    }

    #[tokio::test]
    async fn test_register_duplicate_is_conflict() {
        let sessions = manager();
        sessions.register("alice@example.com", "secret123").await.unwrap();

        let result = sessions.register("alice@example.com", "another-password").await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_are_indistinguishable() {
        let sessions = manager();
        sessions.register("alice@example.com", "secret123").await.unwrap();

        let wrong_password = sessions
            .authenticate("alice@example.com", "wrong")
            .await
            .unwrap_err();
        let unknown_email = sessions
            .authenticate("bob@example.com", "secret123")
            .await
            .unwrap_err();

        assert_eq!(auth_error(wrong_password), AuthError::InvalidCredentials);
        assert_eq!(auth_error(unknown_email), AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_unknown_email_still_verifies_a_password() {
        let hasher = Arc::new(CountingHasher {
            inner: BcryptHasher::new(4),
            verifications: AtomicUsize::new(0),
        });
        let codec = TokenCodec::from_pem("RS256", PRIVATE_PEM, PUBLIC_PEM).unwrap();
        let sessions = SessionManager::new(
            Arc::new(InMemoryUserStore::new()),
            hasher.clone(),
            Arc::new(codec),
            &JwtSettings::default(),
        );

        let err = sessions
            .authenticate("nobody@example.com", "wrongpass")
            .await
            .unwrap_err();

        assert_eq!(auth_error(err), AuthError::InvalidCredentials);
        assert_eq!(hasher.verifications.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_authorize_with_access_token() {
        let sessions = manager();
        let user = sessions.register("alice@example.com", "secret123").await.unwrap();
        let (_, tokens) = sessions
            .authenticate("alice@example.com", "secret123")
            .await
            .unwrap();

        let authorized = sessions.authorize(Some(&tokens.access_token)).await.unwrap();

        assert_eq!(authorized, user);
    }

    #[tokio::test]
    async fn test_authorize_without_token() {
        let err = manager().authorize(None).await.unwrap_err();
        assert_eq!(auth_error(err), AuthError::MissingAccessToken);
    }

    #[tokio::test]
    async fn test_authorize_rejects_garbage() {
        let err = manager().authorize(Some("not-a-jwt")).await.unwrap_err();
        assert_eq!(auth_error(err), AuthError::TokenInvalid);
    }

    #[tokio::test]
    async fn test_authorize_rejects_refresh_token() {
        let sessions = manager();
        sessions.register("alice@example.com", "secret123").await.unwrap();
        let (_, tokens) = sessions
            .authenticate("alice@example.com", "secret123")
            .await
            .unwrap();

        let err = sessions.authorize(Some(&tokens.refresh_token)).await.unwrap_err();

        assert_eq!(auth_error(err), AuthError::TokenRejected);
    }

    #[tokio::test]
    async fn test_authorize_rejects_expired_token() {
        let sessions = manager();
        let user = sessions.register("alice@example.com", "secret123").await.unwrap();
        let mut claims = Claims::new(user.id, TokenType::Access, Duration::minutes(1));
        claims.iat -= 600;
        claims.exp = claims.iat + 60;
        let expired = sessions.codec().encode(&claims).unwrap();

        let err = sessions.authorize(Some(&expired)).await.unwrap_err();

        assert_eq!(auth_error(err), AuthError::TokenRejected);
    }

    #[tokio::test]
    async fn test_authorize_unknown_subject_is_forbidden() {
        let sessions = manager();
        let orphan = sessions
            .codec()
            .encode(&Claims::new(404, TokenType::Access, Duration::minutes(5)))
            .unwrap();

        let err = sessions.authorize(Some(&orphan)).await.unwrap_err();

        assert_eq!(auth_error(err), AuthError::UnknownSubject);
    }

    #[tokio::test]
    async fn test_refresh_issues_access_token_without_rotation() {
        let sessions = manager();
        let user = sessions.register("alice@example.com", "secret123").await.unwrap();
        let (_, tokens) = sessions
            .authenticate("alice@example.com", "secret123")
            .await
            .unwrap();

        let new_access = sessions.refresh(Some(&tokens.refresh_token)).unwrap();
        let claims = sessions.codec().decode(&new_access).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.token_type, TokenType::Access);
        // The refresh token is still usable afterwards.
        assert!(sessions.verify(&tokens.refresh_token, TokenType::Refresh).is_ok());
        assert!(sessions.refresh(Some(&tokens.refresh_token)).is_ok());
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let sessions = manager();
        sessions.register("alice@example.com", "secret123").await.unwrap();
        let (_, tokens) = sessions
            .authenticate("alice@example.com", "secret123")
            .await
            .unwrap();

        let err = sessions.refresh(Some(&tokens.access_token)).unwrap_err();

        assert_eq!(auth_error(err), AuthError::TokenRejected);
    }

    #[test]
    fn test_refresh_failures() {
        let sessions = manager();

        let missing = sessions.refresh(None).unwrap_err();
        assert_eq!(auth_error(missing), AuthError::MissingRefreshToken);

        let invalid = sessions.refresh(Some("a.b.c")).unwrap_err();
        assert_eq!(auth_error(invalid), AuthError::TokenInvalid);

        let mut claims = Claims::new(1, TokenType::Refresh, Duration::days(1));
        claims.iat -= 3 * 86_400;
        claims.exp = claims.iat + 86_400;
        let expired = sessions.codec().encode(&claims).unwrap();
        let rejected = sessions.refresh(Some(&expired)).unwrap_err();
        assert_eq!(auth_error(rejected), AuthError::TokenRejected);
    }

    #[test]
    fn test_session_cookies_are_http_only() {
        let sessions = manager();
        let cookie = sessions.access_cookie("token".to_string());

        assert_eq!(cookie.name(), ACCESS_TOKEN_COOKIE);
        assert_eq!(cookie.value(), "token");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(actix_web::cookie::time::Duration::minutes(1)));
    }

    #[test]
    fn test_logout_cookies_expire_both() {
        let sessions = manager().with_secure_cookies(true);
        let [access, refresh] = sessions.logout_cookies();

        assert_eq!(access.name(), ACCESS_TOKEN_COOKIE);
        assert_eq!(refresh.name(), REFRESH_TOKEN_COOKIE);
        for cookie in [access, refresh] {
            assert_eq!(cookie.value(), "");
            assert_eq!(cookie.secure(), Some(true));
            assert_eq!(cookie.max_age(), Some(actix_web::cookie::time::Duration::ZERO));
        }
    }
}
