/// Authentication Routes
///
/// Registration, login, current user, logout, and access token refresh.
/// Session tokens travel only as HttpOnly cookies, never in response bodies.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{SessionManager, REFRESH_TOKEN_COOKIE};
use crate::error::{AppError, ErrorContext};
use crate::users::{User, UserResponse};
use crate::validators::{is_valid_email, is_valid_password};

/// Credentials for both registration and login
#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// POST /auth/register
///
/// # Errors
/// - 400: invalid email or password length
/// - 409: email already registered
pub async fn register(
    req: HttpRequest,
    form: web::Json<CredentialsRequest>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::for_request(&req, "user_registration");

    let email = is_valid_email(&form.email)?;
    is_valid_password(&form.password)?;

    let user = sessions
        .register(&email, &form.password)
        .await
        .map_err(|e| {
            context.log_error(&e);
            e
        })?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = user.id,
        "Registration completed"
    );

    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

/// POST /auth/login
///
/// Sets `access_token` and `refresh_token` cookies on success.
///
/// # Errors
/// - 400: malformed email
/// - 401: unknown email or wrong password (same response for both)
pub async fn login(
    req: HttpRequest,
    form: web::Json<CredentialsRequest>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::for_request(&req, "user_login");

    let email = is_valid_email(&form.email)?;
    let (user, tokens) = sessions.authenticate(&email, &form.password).await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = user.id,
        "Session cookies issued"
    );

    Ok(HttpResponse::Ok()
        .cookie(sessions.access_cookie(tokens.access_token))
        .cookie(sessions.refresh_cookie(tokens.refresh_token))
        .json(MessageResponse {
            message: "Login successful",
        }))
}

/// GET /auth/me
///
/// **Requires the `access_token` cookie**; the user is injected by `JwtMiddleware`.
pub async fn get_current_user(user: web::ReqData<User>) -> HttpResponse {
    HttpResponse::Ok().json(UserResponse::from(&*user))
}

/// POST /auth/logout
///
/// Always succeeds. Only the cookies are cleared; tokens already handed out
/// remain valid until they expire.
pub async fn logout(sessions: web::Data<SessionManager>) -> HttpResponse {
    let [access, refresh] = sessions.logout_cookies();

    HttpResponse::Ok()
        .cookie(access)
        .cookie(refresh)
        .json(MessageResponse {
            message: "Logout successful",
        })
}

/// GET /auth/refresh-jwt-token
///
/// Replaces the `access_token` cookie using the `refresh_token` cookie. The
/// refresh token is not rotated.
///
/// # Errors
/// - 403: refresh cookie missing, invalid, expired, or not a refresh token
pub async fn refresh_jwt_token(
    req: HttpRequest,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::for_request(&req, "token_refresh");

    let refresh_token = req
        .cookie(REFRESH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string());

    let access_token = sessions.refresh(refresh_token.as_deref()).map_err(|e| {
        context.log_error(&e);
        e
    })?;

    Ok(HttpResponse::Ok()
        .cookie(sessions.access_cookie(access_token))
        .json(MessageResponse {
            message: "Access token refreshed",
        }))
}
