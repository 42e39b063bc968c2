pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod identity;
pub mod model;
pub mod routes;
pub mod sequencer;
pub mod session;
pub mod state;
pub mod store;
pub mod utils;

pub use error::{AttendanceError, AttendanceResult};
