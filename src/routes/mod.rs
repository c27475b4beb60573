// # Routes Module
//
// - This module contains all HTTP route handlers for the AgriSense server.
// - Routes are organized by functionality into separate submodules.
//
// ## Available Route Modules
// - `health`: Health check endpoint
// - `auth`: Registration, login, logout, and session status
// - `analysis`: Session-gated AI text generation and soil-image analysis

/// Health check endpoint
pub mod health;

/// Registration, login, logout, and session status endpoints
pub mod auth;

/// AI dispatch endpoints (text prompt and soil-image analysis)
pub mod analysis;
