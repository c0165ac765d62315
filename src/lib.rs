//! Client-side accounts and polls on top of a hosted JSON database.
//!
//! Everything here runs against a remote store that offers plain
//! GET/POST/PATCH/DELETE on paths and nothing else, so uniqueness of emails
//! and one-vote-per-identity are checked client side, read then write.
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod poll;
pub mod session;
pub mod users;
pub mod validation;

pub use handlers::App;
