use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::SessionManager;
use crate::error::{AppError, ValidationError};
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::{
    create_user, get_current_user, get_user, health_check, list_users, login, logout,
    refresh_jwt_token, register,
};
use crate::users::UserStore;

/// Malformed or missing JSON fields become 400 `VALIDATION_ERROR` responses.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        AppError::Validation(ValidationError::MalformedBody(err.to_string())).into()
    })
}

pub fn run(
    listener: TcpListener,
    store: Arc<dyn UserStore>,
    sessions: SessionManager,
) -> Result<Server, std::io::Error> {
    let store = web::Data::from(store);
    let sessions_data = web::Data::new(sessions.clone());

    let server = HttpServer::new(move || {
        App::new()
            .wrap(LoggerMiddleware)
            // Shared state
            .app_data(json_config())
            .app_data(store.clone())
            .app_data(sessions_data.clone())
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/logout", web::post().to(logout))
                    .route("/refresh-jwt-token", web::get().to(refresh_jwt_token))
                    // Protected: requires the access_token cookie
                    .service(
                        web::resource("/me")
                            .wrap(JwtMiddleware::new(sessions.clone()))
                            .route(web::get().to(get_current_user)),
                    ),
            )
            .service(
                web::scope("/users")
                    .service(web::resource(["", "/"]).route(web::get().to(list_users)))
                    .route("/create", web::post().to(create_user))
                    .route("/{id}", web::get().to(get_user)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
