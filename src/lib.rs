//! # Personas API Library
//!
//! This library provides the core functionality for the Personas API service,
//! including handlers, models, and server configuration.

pub mod auth;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod oauth;
pub mod repositories;
pub mod seeds;
pub mod server;
pub mod storage;
pub mod telemetry;
pub use migration;
