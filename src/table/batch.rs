use aws_sdk_dynamodb::types::{
    AttributeValue, ConsumedCapacity, DeleteRequest, ItemCollectionMetrics, KeysAndAttributes,
    PutRequest, ReturnConsumedCapacity, ReturnItemCollectionMetrics, WriteRequest,
};
use futures_util::{StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde_dynamo::{from_attribute_value, from_item, from_items, to_item};
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};
use tokio::time::sleep;
use tokio_stream::{self as stream};

use crate::Error;
use crate::table::DynamoTable;
use crate::table::helpers::{batch_processor, retry_config};
use crate::table::types::{CompositeKey, KeyScalar};

/// Batch write output containing comprehensive metrics and tracking
///
/// Tracks which puts were successfully processed, which puts and delete keys
/// failed after retries, execution time, and retry attempts.
#[must_use = "batch write results contain failed items and metrics that should be checked"]
#[derive(Debug)]
pub struct BatchWriteOutput<T>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    /// Items successfully written (puts)
    pub processed_puts: Vec<T>,
    /// Items that failed to be written after all retry attempts
    pub failed_puts: Vec<T>,
    /// Keys successfully deleted
    pub processed_deletes: Vec<CompositeKey<T::PK, T::SK>>,
    /// Keys that failed to be deleted after all retry attempts
    pub failed_deletes: Vec<CompositeKey<T::PK, T::SK>>,
    /// Total execution time including all retries
    pub total_duration: Duration,
    /// Number of retry attempts made (0 means no retries needed)
    pub retry_count: usize,
    /// Per-table item collection metrics reported by the service
    pub item_collection_metrics: HashMap<String, Vec<ItemCollectionMetrics>>,
    /// The capacity units consumed by the entire operation
    pub consumed_capacity: Vec<ConsumedCapacity>,
}

impl<T> BatchWriteOutput<T>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    fn new() -> Self {
        Self {
            processed_puts: Vec::new(),
            failed_puts: Vec::new(),
            processed_deletes: Vec::new(),
            failed_deletes: Vec::new(),
            total_duration: Duration::ZERO,
            retry_count: 0,
            item_collection_metrics: HashMap::new(),
            consumed_capacity: Vec::new(),
        }
    }

    /// Check if all operations were successful
    pub fn is_success(&self) -> bool {
        self.failed_puts.is_empty() && self.failed_deletes.is_empty()
    }

    /// Get total number of operations processed successfully
    pub fn processed_count(&self) -> usize {
        self.processed_puts.len() + self.processed_deletes.len()
    }

    /// Get total number of operations that failed
    pub fn failed_count(&self) -> usize {
        self.failed_puts.len() + self.failed_deletes.len()
    }

    /// Get success rate as a percentage (0.0 to 100.0)
    pub fn success_rate(&self) -> f64 {
        let total = self.processed_count() + self.failed_count();
        if total == 0 {
            return 100.0;
        }
        (self.processed_count() as f64 / total as f64) * 100.0
    }
}

/// Batch write (put/delete) multiple items to a DynamoDB table
///
/// Performs multiple put and/or delete operations in batched requests.
/// DynamoDB processes up to 25 write requests per call; larger inputs are
/// chunked and sent with bounded concurrency.
///
/// # Automatic retry behavior
///
/// DynamoDB may leave some requests unprocessed due to throttling, item size,
/// or capacity limits. Unprocessed puts and deletes are retried with
/// exponential backoff according to `T::BATCH_RETRIES_CONFIG`; whatever still
/// fails afterwards is returned in `failed_puts` / `failed_deletes`. If those
/// vectors are non-empty, consider logging them for manual investigation or
/// sending to a dead-letter queue.
pub async fn batch_write<T>(update: Vec<T>, delete: Vec<T>) -> Result<BatchWriteOutput<T>, Error>
where
    T: DynamoTable + Clone,
    T::PK: KeyScalar + DeserializeOwned,
    T::SK: KeyScalar + DeserializeOwned,
{
    let start_time = Instant::now();
    let retries = T::BATCH_RETRIES_CONFIG;

    let original_puts = update.clone();
    let delete_keys: Vec<CompositeKey<T::PK, T::SK>> =
        delete.iter().map(|item| item.composite_key()).collect();
    let original_delete_keys = delete_keys.clone();

    // Initial call
    let mut result = batch_write_internal(update, delete_keys).await?;

    // Retry loop for unprocessed requests
    let mut retry_count = 0;

    while (!result.failed_puts.is_empty() || !result.failed_deletes.is_empty())
        && retry_count < retries.max_retries
    {
        sleep(retry_config::retry_delay(
            retry_count,
            retries.initial_delay,
            retries.max_delay,
        ))
        .await;

        retry_count += 1;

        // Take failed requests for retry
        let unprocessed_puts = std::mem::take(&mut result.failed_puts);
        let unprocessed_deletes = std::mem::take(&mut result.failed_deletes);

        let retry_result = batch_write_internal(unprocessed_puts, unprocessed_deletes).await?;

        // Merge results
        result.failed_puts.extend(retry_result.failed_puts);
        result.failed_deletes.extend(retry_result.failed_deletes);
        result
            .consumed_capacity
            .extend(retry_result.consumed_capacity);

        for (table_name, values) in retry_result.item_collection_metrics {
            result
                .item_collection_metrics
                .entry(table_name)
                .or_default()
                .extend(values);
        }
    }

    // Everything that is not in a failed list was processed
    let failed_puts_count = result.failed_puts.len();
    let processed_puts_count = original_puts.len() - failed_puts_count;
    result.processed_puts = original_puts
        .into_iter()
        .take(processed_puts_count)
        .collect();

    let failed_deletes_count = result.failed_deletes.len();
    let processed_deletes_count = original_delete_keys.len() - failed_deletes_count;
    result.processed_deletes = original_delete_keys
        .into_iter()
        .take(processed_deletes_count)
        .collect();

    result.total_duration = start_time.elapsed();
    result.retry_count = retry_count;

    Ok(result)
}

/// Internal batch write implementation without retry logic
async fn batch_write_internal<T>(
    update: Vec<T>,
    delete_keys: Vec<CompositeKey<T::PK, T::SK>>,
) -> Result<BatchWriteOutput<T>, Error>
where
    T: DynamoTable,
    T::PK: KeyScalar + DeserializeOwned,
    T::SK: KeyScalar + DeserializeOwned,
{
    if update.is_empty() && delete_keys.is_empty() {
        return Ok(BatchWriteOutput::new());
    }

    let mut write_ops: Vec<WriteRequest> = Vec::with_capacity(update.len() + delete_keys.len());

    for value in update {
        let item = to_item::<_, HashMap<String, AttributeValue>>(value)?;

        let put_request = PutRequest::builder().set_item(Some(item)).build()?;

        write_ops.push(
            WriteRequest::builder()
                .set_put_request(Some(put_request))
                .build(),
        );
    }

    for (partition_key, sort_key) in delete_keys {
        let mut delete_request =
            DeleteRequest::builder().key(T::PARTITION_KEY, partition_key.to_attribute());

        if let (Some(sort_key_field), Some(sort_value)) = (T::SORT_KEY, sort_key) {
            delete_request = delete_request.key(sort_key_field, sort_value.to_attribute());
        }

        write_ops.push(
            WriteRequest::builder()
                .set_delete_request(Some(delete_request.build()?))
                .build(),
        );
    }

    let output: BatchWriteOutput<T> = BatchWriteOutput::new();

    let batches: Vec<Vec<WriteRequest>> = write_ops
        .chunks(batch_processor::BATCH_WRITE_SIZE)
        .map(|data| data.to_vec())
        .collect();

    let client = T::dynamodb_client().await;

    let concurrency = batches.len().min(batch_processor::DEFAULT_CONCURRENCY);

    stream::iter(batches.into_iter().map(|batch| {
        client
            .batch_write_item()
            .request_items(T::TABLE, batch)
            .return_consumed_capacity(ReturnConsumedCapacity::Total)
            .return_item_collection_metrics(ReturnItemCollectionMetrics::Size)
            .send()
    }))
    .buffer_unordered(concurrency)
    .map_err(Into::<Error>::into)
    .try_fold(output, |mut builder, result| async {
        if let Some(unprocessed_items) = result.unprocessed_items {
            for items in unprocessed_items.into_values() {
                for item in items {
                    if let Some(put_request) = item.put_request {
                        let item = from_item(put_request.item)?;
                        builder.failed_puts.push(item);
                    }

                    if let Some(delete_request) = item.delete_request {
                        if let Some(key) = decode_key::<T>(&delete_request.key)? {
                            builder.failed_deletes.push(key);
                        }
                    }
                }
            }
        }

        if let Some(item_collection_metrics) = result.item_collection_metrics {
            for (table_name, values) in item_collection_metrics {
                builder
                    .item_collection_metrics
                    .entry(table_name)
                    .or_default()
                    .extend(values);
            }
        }

        if let Some(capacities) = result.consumed_capacity {
            builder.consumed_capacity.extend(capacities);
        }

        Ok(builder)
    })
    .await
}

/// Decode a typed composite key out of a raw key attribute map
fn decode_key<T>(
    key_map: &HashMap<String, AttributeValue>,
) -> Result<Option<CompositeKey<T::PK, T::SK>>, Error>
where
    T: DynamoTable,
    T::PK: KeyScalar + DeserializeOwned,
    T::SK: KeyScalar + DeserializeOwned,
{
    let Some(pk_attr) = key_map.get(T::PARTITION_KEY) else {
        return Ok(None);
    };
    let pk: T::PK = from_attribute_value(pk_attr.clone())?;

    let sk: Option<T::SK> = T::SORT_KEY
        .and_then(|sk_name| key_map.get(sk_name))
        .map(|sk_attr| from_attribute_value(sk_attr.clone()))
        .transpose()?;

    Ok(Some((pk, sk)))
}

/// Batch read output containing comprehensive metrics and tracking
///
/// Tracks which items were successfully retrieved, which keys failed after
/// retries, execution time, and retry attempts.
#[must_use = "batch read results contain failed keys and metrics that should be checked"]
#[derive(Debug)]
pub struct BatchReadOutput<T>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    /// Items successfully retrieved
    pub items: Vec<T>,
    /// Keys that failed to be retrieved after all retry attempts
    pub failed_keys: Vec<CompositeKey<T::PK, T::SK>>,
    /// Total execution time including all retries
    pub total_duration: Duration,
    /// Number of retry attempts made (0 means no retries needed)
    pub retry_count: usize,
    /// The capacity units consumed by the entire operation
    pub consumed_capacity: Vec<ConsumedCapacity>,
}

impl<T> BatchReadOutput<T>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    fn new() -> Self {
        Self {
            items: Vec::new(),
            failed_keys: Vec::new(),
            total_duration: Duration::ZERO,
            retry_count: 0,
            consumed_capacity: Vec::new(),
        }
    }

    /// Check if all operations were successful
    pub fn is_success(&self) -> bool {
        self.failed_keys.is_empty()
    }

    /// Get total number of items requested
    pub fn total_requested(&self) -> usize {
        self.items.len() + self.failed_keys.len()
    }

    /// Get success rate as a percentage (0.0 to 100.0)
    pub fn success_rate(&self) -> f64 {
        let total = self.total_requested();
        if total == 0 {
            return 100.0;
        }
        (self.items.len() as f64 / total as f64) * 100.0
    }
}

/// Batch retrieve multiple items from a DynamoDB table
pub async fn batch_get<T>(
    values: Vec<CompositeKey<T::PK, T::SK>>,
) -> Result<BatchReadOutput<T>, Error>
where
    T: DynamoTable,
    T::PK: KeyScalar + DeserializeOwned,
    T::SK: KeyScalar + DeserializeOwned,
{
    let start_time = Instant::now();
    let retries = T::BATCH_RETRIES_CONFIG;

    // Initial call
    let mut result = batch_get_internal::<T>(values).await?;

    // Retry loop for failed keys
    let mut retry_count = 0;

    while !result.failed_keys.is_empty() && retry_count < retries.max_retries {
        sleep(retry_config::retry_delay(
            retry_count,
            retries.initial_delay,
            retries.max_delay,
        ))
        .await;

        retry_count += 1;

        // Take failed keys for retry
        let unprocessed_keys = std::mem::take(&mut result.failed_keys);

        let retry_result = batch_get_internal::<T>(unprocessed_keys).await?;

        // Merge results
        result.items.extend(retry_result.items);
        result.failed_keys.extend(retry_result.failed_keys);
        result
            .consumed_capacity
            .extend(retry_result.consumed_capacity);
    }

    result.total_duration = start_time.elapsed();
    result.retry_count = retry_count;

    Ok(result)
}

/// Internal batch get implementation without retry logic
async fn batch_get_internal<T>(
    values: Vec<CompositeKey<T::PK, T::SK>>,
) -> Result<BatchReadOutput<T>, Error>
where
    T: DynamoTable,
    T::PK: KeyScalar + DeserializeOwned,
    T::SK: KeyScalar + DeserializeOwned,
{
    if values.is_empty() {
        return Ok(BatchReadOutput::new());
    }

    // Combination of partition key and sort key
    let mut keys: Vec<HashMap<String, AttributeValue>> = Vec::with_capacity(values.len());

    for (partition_key, sort_key) in values {
        let mut item = HashMap::new();
        let _ = item.insert(T::PARTITION_KEY.to_string(), partition_key.to_attribute());
        if let Some(sort_key) = sort_key {
            let _ = item.insert(
                T::SORT_KEY.expect("safety: sort_key is set").to_string(),
                sort_key.to_attribute(),
            );
        }

        keys.push(item);
    }

    let output = BatchReadOutput::<T>::new();

    let batches: Vec<KeysAndAttributes> = keys
        .chunks(batch_processor::BATCH_READ_SIZE)
        .map(|data| {
            KeysAndAttributes::builder()
                .set_keys(Some(data.to_vec()))
                .build()
        })
        .collect::<Result<Vec<_>, _>>()?;

    let client = T::dynamodb_client().await;

    let concurrency = batches.len().min(batch_processor::DEFAULT_CONCURRENCY);

    stream::iter(batches.into_iter().map(|batch| {
        client
            .batch_get_item()
            .request_items(T::TABLE, batch)
            .return_consumed_capacity(ReturnConsumedCapacity::Total)
            .send()
    }))
    .buffer_unordered(concurrency)
    .map_err(Into::<Error>::into)
    .try_fold(output, |mut builder, result| async {
        if let Some(responses) = result.responses {
            for items in responses.into_values() {
                let items = from_items(items)?;
                builder.items.extend(items);
            }
        }

        if let Some(unprocessed_keys) = result.unprocessed_keys {
            for (_table, keys_attrs) in unprocessed_keys {
                for key_map in keys_attrs.keys {
                    if let Some(key) = decode_key::<T>(&key_map)? {
                        builder.failed_keys.push(key);
                    }
                }
            }
        }

        if let Some(capacities) = result.consumed_capacity {
            builder.consumed_capacity.extend(capacities);
        }

        Ok(builder)
    })
    .await
}
