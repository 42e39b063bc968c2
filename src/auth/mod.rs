pub mod auth;
pub mod gate;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod policy;

pub use auth::AuthUser;
pub use gate::AuthGate;
