pub mod analytics;
pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod throttle;
pub mod utils;
