use std::fmt::Debug;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::get_item::GetItemError;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::operation::query::builders::QueryFluentBuilder;
use aws_sdk_dynamodb::operation::query::QueryError;
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsError;
use aws_sdk_dynamodb::types::{AttributeValue, Put, TransactWriteItem};
use aws_sdk_dynamodb::Client as DynamoClient;

use super::{Result, StoreError, Table};
use crate::keys;
use crate::records::Item;

const INSERT_ONLY: &str = "attribute_not_exists(PK)";

/// [`Table`] backed by a DynamoDB table with the `GSI1`/`GSI2` indexes.
pub struct DynamoTable {
    client: DynamoClient,
    table_name: String,
}

impl DynamoTable {
    pub fn new(client: DynamoClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Run a query to exhaustion, following `LastEvaluatedKey`.
    async fn query_all(&self, query: QueryFluentBuilder) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let resp = query
                .clone()
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(map_query_error)?;

            items.extend(resp.items.unwrap_or_default());

            match resp.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(items)
    }
}

#[async_trait]
impl Table for DynamoTable {
    async fn get(&self, pk: &str, sk: &str) -> Result<Option<Item>> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(keys::PK, AttributeValue::S(pk.to_string()))
            .key(keys::SK, AttributeValue::S(sk.to_string()))
            .send()
            .await
            .map_err(map_get_item_error)?;

        Ok(result.item)
    }

    async fn query_partition(&self, pk: &str) -> Result<Vec<Item>> {
        let query = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("PK = :pk")
            .expression_attribute_values(":pk", AttributeValue::S(pk.to_string()));

        self.query_all(query).await
    }

    async fn query_by_author(&self, author_pk: &str) -> Result<Vec<Item>> {
        let query = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(keys::AUTHOR_INDEX)
            .key_condition_expression("#author = :author")
            .expression_attribute_names("#author", keys::AUTHOR_INDEX_PK)
            .expression_attribute_values(":author", AttributeValue::S(author_pk.to_string()))
            .scan_index_forward(false);

        self.query_all(query).await
    }

    async fn query_by_entity_type(&self, entity_type: &str) -> Result<Vec<Item>> {
        let query = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(keys::TYPE_INDEX)
            .key_condition_expression("#entityType = :entityType")
            .expression_attribute_names("#entityType", keys::ENTITY_TYPE)
            .expression_attribute_values(":entityType", AttributeValue::S(entity_type.to_string()))
            .scan_index_forward(false);

        self.query_all(query).await
    }

    async fn put(&self, item: Item) -> Result<()> {
        let (pk, sk) = item_key(&item);

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression(INSERT_ONLY)
            .send()
            .await
            .map_err(|e| map_put_item_error(e, pk, sk))?;

        Ok(())
    }

    async fn put_all_new(&self, items: Vec<Item>) -> Result<()> {
        let item_keys: Vec<(String, String)> = items.iter().map(item_key).collect();

        let mut transact_items = Vec::with_capacity(items.len());
        for item in items {
            let put = Put::builder()
                .table_name(&self.table_name)
                .set_item(Some(item))
                .condition_expression(INSERT_ONLY)
                .build()
                .map_err(|e| StoreError::QueryFailed(format!("Failed to build put: {e}")))?;
            transact_items.push(TransactWriteItem::builder().put(put).build());
        }

        self.client
            .transact_write_items()
            .set_transact_items(Some(transact_items))
            .send()
            .await
            .map_err(|e| map_transact_write_error(e, &item_keys))?;

        Ok(())
    }
}

fn item_key(item: &Item) -> (String, String) {
    let get = |name: &str| {
        item.get(name)
            .and_then(|v| v.as_s().ok())
            .cloned()
            .unwrap_or_default()
    };
    (get(keys::PK), get(keys::SK))
}

fn is_connection_error<E, R>(err: &SdkError<E, R>) -> bool {
    matches!(err, SdkError::DispatchFailure(_) | SdkError::TimeoutError(_))
}

/// Map a GetItem SDK error to StoreError.
pub fn map_get_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<GetItemError, R>,
) -> StoreError {
    if is_connection_error(&err) {
        return StoreError::ConnectionFailed(format!("{err:?}"));
    }
    match err.into_service_error() {
        GetItemError::ResourceNotFoundException(_) => {
            StoreError::QueryFailed("Table not found".to_string())
        }
        GetItemError::ProvisionedThroughputExceededException(_) => {
            StoreError::QueryFailed("Throughput exceeded".to_string())
        }
        GetItemError::RequestLimitExceeded(_) => {
            StoreError::QueryFailed("Request limit exceeded".to_string())
        }
        err => StoreError::QueryFailed(format!("GetItem failed: {err:?}")),
    }
}

/// Map a Query SDK error to StoreError.
pub fn map_query_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<QueryError, R>,
) -> StoreError {
    if is_connection_error(&err) {
        return StoreError::ConnectionFailed(format!("{err:?}"));
    }
    match err.into_service_error() {
        QueryError::ResourceNotFoundException(_) => {
            StoreError::QueryFailed("Table or index not found".to_string())
        }
        QueryError::ProvisionedThroughputExceededException(_) => {
            StoreError::QueryFailed("Throughput exceeded".to_string())
        }
        QueryError::RequestLimitExceeded(_) => {
            StoreError::QueryFailed("Request limit exceeded".to_string())
        }
        err => StoreError::QueryFailed(format!("Query failed: {err:?}")),
    }
}

/// Map a PutItem SDK error to StoreError.
pub fn map_put_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<PutItemError, R>,
    pk: String,
    sk: String,
) -> StoreError {
    if is_connection_error(&err) {
        return StoreError::ConnectionFailed(format!("{err:?}"));
    }
    match err.into_service_error() {
        PutItemError::ConditionalCheckFailedException(_) => StoreError::AlreadyExists { pk, sk },
        PutItemError::ResourceNotFoundException(_) => {
            StoreError::QueryFailed("Table not found".to_string())
        }
        PutItemError::ProvisionedThroughputExceededException(_) => {
            StoreError::QueryFailed("Throughput exceeded".to_string())
        }
        PutItemError::RequestLimitExceeded(_) => {
            StoreError::QueryFailed("Request limit exceeded".to_string())
        }
        err => StoreError::QueryFailed(format!("PutItem failed: {err:?}")),
    }
}

/// Map a TransactWriteItems SDK error to StoreError.
///
/// Cancellation reasons line up index-for-index with the submitted items,
/// which is how a failed condition is traced back to its key.
pub fn map_transact_write_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<TransactWriteItemsError, R>,
    item_keys: &[(String, String)],
) -> StoreError {
    if is_connection_error(&err) {
        return StoreError::ConnectionFailed(format!("{err:?}"));
    }
    match err.into_service_error() {
        TransactWriteItemsError::TransactionCanceledException(cancelled) => {
            let conflict = cancelled
                .cancellation_reasons()
                .iter()
                .position(|reason| reason.code() == Some("ConditionalCheckFailed"))
                .and_then(|idx| item_keys.get(idx));

            match conflict {
                Some((pk, sk)) => StoreError::AlreadyExists {
                    pk: pk.clone(),
                    sk: sk.clone(),
                },
                None => StoreError::QueryFailed(format!(
                    "Transaction cancelled: {:?}",
                    cancelled.cancellation_reasons()
                )),
            }
        }
        TransactWriteItemsError::TransactionInProgressException(_) => {
            StoreError::QueryFailed("Transaction already in progress".to_string())
        }
        TransactWriteItemsError::ResourceNotFoundException(_) => {
            StoreError::QueryFailed("Table not found".to_string())
        }
        TransactWriteItemsError::ProvisionedThroughputExceededException(_) => {
            StoreError::QueryFailed("Throughput exceeded".to_string())
        }
        err => StoreError::QueryFailed(format!("TransactWriteItems failed: {err:?}")),
    }
}
