use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;

use super::{Result, StoreError, Table};
use crate::keys;
use crate::records::Item;

/// In-process [`Table`] with the same key, condition and index semantics as
/// the DynamoDB table. Used by tests and local runs.
#[derive(Default)]
pub struct MemoryTable {
    items: Mutex<BTreeMap<(String, String), Item>>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<(String, String), Item>>> {
        self.items
            .lock()
            .map_err(|_| StoreError::ConnectionFailed("memory table poisoned".to_string()))
    }

    /// Items matching `keep`, newest `sort_attr` first.
    fn index_query(&self, keep: impl Fn(&Item) -> bool, sort_attr: &str) -> Result<Vec<Item>> {
        let mut hits: Vec<Item> = self.lock()?.values().filter(|i| keep(*i)).cloned().collect();
        hits.sort_by(|a, b| string_attr(b, sort_attr).cmp(&string_attr(a, sort_attr)));
        Ok(hits)
    }
}

fn string_attr<'a>(item: &'a Item, name: &str) -> Option<&'a str> {
    item.get(name)
        .and_then(|v| v.as_s().ok())
        .map(|s| s.as_str())
}

fn key_of(item: &Item) -> Result<(String, String)> {
    match (string_attr(item, keys::PK), string_attr(item, keys::SK)) {
        (Some(pk), Some(sk)) => Ok((pk.to_string(), sk.to_string())),
        _ => Err(StoreError::QueryFailed(
            "item is missing its key attributes".to_string(),
        )),
    }
}

fn has_attr(item: &Item, name: &str, value: &str) -> bool {
    matches!(item.get(name), Some(AttributeValue::S(s)) if s == value)
}

#[async_trait]
impl Table for MemoryTable {
    async fn get(&self, pk: &str, sk: &str) -> Result<Option<Item>> {
        Ok(self.lock()?.get(&(pk.to_string(), sk.to_string())).cloned())
    }

    async fn query_partition(&self, pk: &str) -> Result<Vec<Item>> {
        Ok(self
            .lock()?
            .iter()
            .filter(|((item_pk, _), _)| item_pk == pk)
            .map(|(_, item)| item.clone())
            .collect())
    }

    async fn query_by_author(&self, author_pk: &str) -> Result<Vec<Item>> {
        self.index_query(
            |item| has_attr(item, keys::AUTHOR_INDEX_PK, author_pk),
            keys::AUTHOR_INDEX_SK,
        )
    }

    async fn query_by_entity_type(&self, entity_type: &str) -> Result<Vec<Item>> {
        self.index_query(
            |item| has_attr(item, keys::ENTITY_TYPE, entity_type),
            keys::CREATED_AT,
        )
    }

    async fn put(&self, item: Item) -> Result<()> {
        self.put_all_new(vec![item]).await
    }

    async fn put_all_new(&self, items: Vec<Item>) -> Result<()> {
        let mut table = self.lock()?;

        let mut staged = Vec::with_capacity(items.len());
        for item in items {
            let key = key_of(&item)?;
            if table.contains_key(&key) {
                return Err(StoreError::AlreadyExists {
                    pk: key.0,
                    sk: key.1,
                });
            }
            staged.push((key, item));
        }

        table.extend(staged);
        Ok(())
    }
}
