/// User records and their storage
///
/// The auth core only ever needs lookups by email or id and a single insert;
/// `list` backs the user listing endpoint.

mod model;
mod store;

pub use model::{User, UserResponse};
pub use store::{InMemoryUserStore, PgUserStore, UserStore};
