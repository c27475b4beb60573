//! # Database Module
//!
//! PostgreSQL integration via tokio-postgres with deadpool pooling.
//! Includes connection management, row models, the credential store,
//! and startup migrations.

pub mod connection;
pub mod migrations;
pub mod models;
pub mod store;

pub use connection::{DatabaseConfig, DatabaseConnection};
pub use store::{CreateUserError, CredentialStore};
