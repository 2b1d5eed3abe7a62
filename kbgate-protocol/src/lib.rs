//! kbgate-protocol: Knowledge base data model shared by the gateway and
//! the dispatcher
//!
//! [`types`] holds the normalized results the rest of kbgate works with.
//! [`wire`] holds the request/response bodies of the retrieval service,
//! with every optional field defaulted on the way into [`types`].

pub mod types;
pub mod wire;

// Re-export main types at crate root
pub use types::{
    Citation, GenerationResult, Metadata, RetrievalResult, RetrievedReference, TextSpan,
};
pub use wire::{
    GenerateRequest, GenerateResponse, RetrievalConfiguration, RetrieveRequest,
    RetrieveResponse, WireLocation,
};
