pub mod app;
pub mod config;
pub mod error;
pub mod metrics;
pub mod rate_limit;
pub mod redemption;
pub mod redemption_handlers;
pub mod session;
pub mod session_handlers;
pub mod store;
pub mod user_handlers;
pub mod users;

pub use app::{router, AppState};
