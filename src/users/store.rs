use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Mutex;

use crate::error::AppError;
use crate::users::model::User;

/// Storage for user records.
///
/// Implementations must enforce email uniqueness themselves and report a
/// duplicate insert as `AppError::Conflict`; callers' existence checks are
/// not transactional.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    async fn insert(&self, email: &str, password_hash: &str) -> Result<User, AppError>;

    /// All users ordered by id.
    async fn list(&self) -> Result<Vec<User>, AppError>;
}

/// Postgres-backed store. Each call checks a connection out of the pool and
/// returns it when the query completes.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn insert(&self, email: &str, password_hash: &str) -> Result<User, AppError> {
        // 23505 from the unique index becomes AppError::Conflict.
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}

/// Process-local store with the same uniqueness and id semantics as the
/// `users` table. Ids start at 1.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<User>>, AppError> {
        self.users
            .lock()
            .map_err(|_| AppError::Internal("user store lock poisoned".to_string()))
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.lock()?.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.lock()?.iter().find(|u| u.id == id).cloned())
    }

    async fn insert(&self, email: &str, password_hash: &str) -> Result<User, AppError> {
        let mut users = self.lock()?;
        if users.iter().any(|u| u.email == email) {
            return Err(AppError::Conflict("User already exists".to_string()));
        }

        let user = User {
            id: users.last().map_or(1, |u| u.id + 1),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
        };
        users.push(user.clone());

        Ok(user)
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        Ok(self.lock()?.clone())
    }
}
