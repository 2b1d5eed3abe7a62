//! Session continuity
//!
//! Maps client-visible session handles to the continuation token the
//! knowledge base service issued for them most recently.

mod registry;

pub use registry::{Resolution, SessionRegistry};
