//! # AI Dispatch Module
//!
//! Builds capability requests against the Gemini generateContent API and
//! extracts the textual result.

pub mod client;

pub use client::{AiError, GeminiClient};
