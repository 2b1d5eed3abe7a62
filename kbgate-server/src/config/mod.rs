//! Configuration management for kbgate
//!
//! Settings are resolved once at startup. Any failure here is fatal:
//! the server never starts serving calls with an invalid configuration.

pub mod defaults;
mod loader;
mod schema;

pub use loader::ConfigLoader;
pub use schema::*;
