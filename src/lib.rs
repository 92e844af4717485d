//! Todo Service
//!
//! A small HTTP backend for a todo list: create, list, partially update and
//! delete items, with a choice of in-memory, `PostgreSQL` or Redis storage.
//!
//! # Modules
//!
//! - [`api`]: HTTP handlers, DTOs, errors and router assembly
//! - [`client`]: typed HTTP client for the API
//! - [`config`]: process configuration from the environment
//! - [`domain`]: todo item model
//! - [`infrastructure`]: storage backends
//! - [`telemetry`]: logging, request spans and metrics

pub mod api;
pub mod client;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod telemetry;
