//! Item records and their store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A stored item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating an item. Other fields are assigned server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
}

/// Errors returned by the store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("name is required")]
    EmptyName,
}

/// Thread-safe item store. Clones share the same data.
#[derive(Clone, Default)]
pub struct ItemStore {
    items: Arc<DashMap<u64, Item>>,
    next_id: Arc<AtomicU64>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an item with a trimmed, non-empty name.
    pub fn create(&self, name: &str) -> Result<Item, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let item = Item {
            id,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.items.insert(id, item.clone());
        Ok(item)
    }

    pub fn get(&self, id: u64) -> Option<Item> {
        self.items.get(&id).map(|entry| entry.value().clone())
    }

    /// All items, newest first.
    pub fn list(&self) -> Vec<Item> {
        let mut items: Vec<Item> = self.items.iter().map(|entry| entry.value().clone()).collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        items
    }

    /// Remove an item. Returns whether it existed.
    pub fn delete(&self, id: u64) -> bool {
        self.items.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
