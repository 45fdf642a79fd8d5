use actix_web::{web, HttpResponse};

use crate::auth::SessionManager;
use crate::error::{AppError, DatabaseError};
use crate::routes::auth::CredentialsRequest;
use crate::users::{UserResponse, UserStore};
use crate::validators::{is_valid_email, is_valid_password};

/// GET /users
pub async fn list_users(store: web::Data<dyn UserStore>) -> Result<HttpResponse, AppError> {
    let users: Vec<UserResponse> = store.list().await?.into_iter().map(UserResponse::from).collect();

    Ok(HttpResponse::Ok().json(users))
}

/// GET /users/{id}
pub async fn get_user(
    path: web::Path<i64>,
    store: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    let user = store
        .find_by_id(id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("User".to_string()))?;

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// POST /users/create
///
/// Same semantics as registration: the password is hashed, duplicates are 409.
pub async fn create_user(
    form: web::Json<CredentialsRequest>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;
    is_valid_password(&form.password)?;

    let user = sessions.register(&email, &form.password).await?;

    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}
