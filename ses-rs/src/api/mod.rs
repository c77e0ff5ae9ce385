//! REST API module for ses-rs
//!
//! Provides the send and stats endpoints over HTTP

pub mod handlers;
pub mod server;

pub use handlers::AppState;
pub use server::ApiServer;
