//! hastily
//!
//! Bulk CRUD orchestration against a token-authenticated JSON backend:
//! fetch, filter, partially merge and push resources, one concurrent unit
//! per item, with per-item outcomes collected under their identity key.

pub mod api;
pub mod auth;
pub mod common;
pub mod config;
pub mod error;
pub mod model;

pub use error::{Error, Result};
