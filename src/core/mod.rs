//! Core types for the guard
//!
//! - `GuardError` - Error types
//! - `paths` - Lexical path resolution shared by the file policies

pub mod error;
pub mod paths;

pub use error::{GuardError, GuardResult};
