//! Allocation settings persistence.
//!
//! The settings live in a single JSON document that is read on every run and
//! replaced wholesale on every management write.

pub mod error;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use store::{
    encode_settings, AllocationStore, BoxFuture, DynStore, FileAllocationStore,
    InMemoryAllocationStore,
};
