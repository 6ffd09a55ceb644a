#![doc = "The `taskforge` library crate."]
#![doc = ""]
#![doc = "Session authentication (bcrypt password hashing, signed expiring tokens, a single"]
#![doc = "authorization checkpoint), per-owner task access, persistence and the HTTP routes."]
#![doc = "The binary (`main.rs`) only loads configuration, picks a store and runs the server."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;

pub use crate::error::AppError;
pub use crate::state::AppState;
