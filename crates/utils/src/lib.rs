//! Shared error types for the irobf workspace.

pub mod errors;
