//! Authentication: accounts, sessions and roles.

pub mod handlers;
pub mod middleware;
pub mod password;

pub use handlers::*;
pub use middleware::{AuthContext, OptionalAuth};
