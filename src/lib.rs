pub mod cache;
pub mod client;
pub mod config;
pub mod dedup;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod prompt;
pub mod questions;
pub mod rate_limit;
pub mod state;
pub mod upstream;

pub use error::{GatewayError, Result};
pub use state::AppState;
