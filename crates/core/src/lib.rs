//! Document intake domain logic.
//!
//! Pure functions and types shared by the OCR, document, notification and
//! API crates. Nothing in here performs I/O.

pub mod error;
pub mod extraction;
pub mod upload;
