pub mod archive;
pub mod auth;
pub mod common;
pub mod config;
pub mod database;
pub mod errors;
pub mod identity;
pub mod query;
pub mod services;
pub mod suppression;

pub mod app_context;
pub use app_context::AppContext;
