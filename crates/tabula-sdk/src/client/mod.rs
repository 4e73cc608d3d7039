//! Trait implementations for the HTTP clients, plus in-memory backends

pub mod content_store;
pub mod pinner;
pub mod read_model;

pub use content_store::MemoryStore;
