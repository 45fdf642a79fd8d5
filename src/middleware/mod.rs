/// Middleware module
///
/// Session cookie authorization for protected scopes.

mod jwt_middleware;

pub use jwt_middleware::JwtMiddleware;
