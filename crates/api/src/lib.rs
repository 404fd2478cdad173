//! Document intake server library.
//!
//! Exposes the building blocks (config, state, error handling, pages, the
//! intake pipeline and routes) so integration tests and the binary
//! entrypoint can both access them.

pub mod config;
pub mod error;
pub mod handlers;
pub mod pages;
pub mod pipeline;
pub mod router;
pub mod routes;
pub mod state;
