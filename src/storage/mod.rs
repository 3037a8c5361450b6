//! Item storage subsystem.
//!
//! # Design Decisions
//! - In-memory, process-local: an instance that scales to zero starts empty
//! - Concurrent map (DashMap) so handlers never serialize on one lock
//! - Ids are allocated from an atomic counter and never reused

pub mod items;

pub use items::{CreateItemRequest, Item, ItemStore, StoreError};
