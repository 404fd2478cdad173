//! Request handlers.
//!
//! Handlers parse the request, delegate to [`crate::pipeline`] and map
//! errors via [`crate::error::AppError`].

pub mod intake;
