//! Access patterns over the single listings table.
//!
//! Handlers only ever talk to a [`Table`]; the DynamoDB implementation is
//! used in the Lambdas and [`MemoryTable`] stands in for it in tests.

pub mod dynamo;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::records::Item;

pub use dynamo::DynamoTable;
pub use memory::MemoryTable;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("item already exists: {pk} / {sk}")]
    AlreadyExists { pk: String, sk: String },

    #[error("store request failed: {0}")]
    QueryFailed(String),

    #[error("could not reach store: {0}")]
    ConnectionFailed(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait Table: Send + Sync {
    /// Point lookup on the exact `(PK, SK)` pair.
    async fn get(&self, pk: &str, sk: &str) -> Result<Option<Item>>;

    /// Every item whose `PK` equals `pk`, in sort key order.
    async fn query_partition(&self, pk: &str) -> Result<Vec<Item>>;

    /// Author index (GSI1): items for one author key, newest first.
    async fn query_by_author(&self, author_pk: &str) -> Result<Vec<Item>>;

    /// Type index (GSI2): items of one entity type, newest first.
    async fn query_by_entity_type(&self, entity_type: &str) -> Result<Vec<Item>>;

    /// Insert a single item. Fails with [`StoreError::AlreadyExists`] if an
    /// item with the same key is present; nothing is overwritten.
    async fn put(&self, item: Item) -> Result<()>;

    /// Insert several items all-or-nothing. If any key is already taken no
    /// item is written and [`StoreError::AlreadyExists`] names the first
    /// conflicting key.
    async fn put_all_new(&self, items: Vec<Item>) -> Result<()>;
}
