//! # Authentication Module
//!
//! Server-side session storage and the gate middleware that secures the
//! capability-invoking endpoints.

pub mod gate;
pub mod session;

pub use gate::{AuthUser, SESSION_COOKIE, SessionGate};
pub use session::SessionStore;
