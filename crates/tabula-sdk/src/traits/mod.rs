//! Seams to the external collaborators
//!
//! The core never talks to a wallet, content store, pinning service or index
//! directly; it goes through these traits so any backend (or a test double)
//! can be plugged in.

pub mod chain;
pub mod pinner;
pub mod read_model;
pub mod store;

pub use chain::{ChainError, ChainWriter, LogRef, Receipt};
pub use pinner::RemotePinner;
pub use read_model::{EntityKind, EntityRef, IndexedEntity, ReadModel};
pub use store::ContentStore;
