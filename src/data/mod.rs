//! Data sources that do not come from a file.
//!
//! - seeded synthetic titrations (`synthetic`)

pub mod synthetic;

pub use synthetic::*;
