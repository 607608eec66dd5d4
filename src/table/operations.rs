use aws_sdk_dynamodb::operation;
use aws_sdk_dynamodb::operation::delete_item::DeleteItemOutput;
use aws_sdk_dynamodb::operation::put_item::PutItemOutput;
use aws_sdk_dynamodb::operation::query::builders::QueryFluentBuilder;
use aws_sdk_dynamodb::operation::update_item::UpdateItemOutput;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnConsumedCapacity, ReturnValue, Select};
use aws_smithy_types_convert::stream::PaginationStreamExt;
use futures_util::TryStreamExt;
use serde::{Serialize, de::DeserializeOwned};
use serde_dynamo::{from_item, to_item};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio_stream::Stream;

use crate::error::Error;
use crate::table::batch::{BatchReadOutput, BatchWriteOutput, batch_get, batch_write};
use crate::table::helpers::{query_builder, validation};
use crate::table::types::{CompositeKey, KeyScalar, OutputItems, RetryConfig};

/// Generic table trait with typed partition and sort keys
///
/// An implementing type describes one DynamoDB table: its name, key schema,
/// and how to read the key values off an item. Key types go through
/// [`KeyScalar`], so string-keyed and number-keyed tables share the same
/// operations.
pub trait DynamoTable: Serialize + DeserializeOwned + Send + Sync
where
    Self::PK: KeyScalar,
    Self::SK: KeyScalar,
{
    /// Associated partition key type
    type PK;

    /// Associated sort key type
    type SK;

    /// Name of table to retrieve
    const TABLE: &'static str;

    /// Partition key of the table
    const PARTITION_KEY: &'static str;

    /// Sort key of the table
    const SORT_KEY: Option<&'static str> = None;

    /// Default page size for queries
    const DEFAULT_PAGE_SIZE: u16 = 10;

    /// Retry configuration for batch operations
    const BATCH_RETRIES_CONFIG: RetryConfig = RetryConfig {
        max_retries: 2,
        initial_delay: Duration::from_millis(100),
        max_delay: Duration::from_millis(2000),
    };

    /// Partition key name
    fn partition_key_name(&self) -> &'static str {
        Self::PARTITION_KEY
    }

    /// Sort key name
    fn sort_key_name(&self) -> Option<&'static str> {
        Self::SORT_KEY
    }

    /// Partition key value of this item
    fn partition_key(&self) -> Self::PK;

    /// Sort key value of this item
    fn sort_key(&self) -> Option<Self::SK> {
        None
    }

    /// Composite key value of this item
    fn composite_key(&self) -> CompositeKey<Self::PK, Self::SK> {
        (self.partition_key(), self.sort_key())
    }

    /// Get the DynamoDB client for this table
    ///
    /// By default, returns the global client. Can be overridden for testing
    /// or to use a different client per table.
    fn dynamodb_client() -> impl Future<Output = &'static aws_sdk_dynamodb::Client> {
        crate::dynamodb_client()
    }

    /// Add an item to the table
    ///
    /// Inserts a new item or replaces an existing item with the same partition
    /// and sort key. This performs a PutItem operation in DynamoDB.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use reelstore::catalog::{Movie, MovieDetails};
    /// use reelstore::table::DynamoTable;
    ///
    /// # async fn example() -> Result<(), reelstore::Error> {
    /// let movie = Movie::new(
    ///     "uuid-1",
    ///     "Inception",
    ///     2010,
    ///     "Sci-Fi",
    ///     8.8,
    ///     MovieDetails::new("Christopher Nolan", 148),
    /// );
    ///
    /// movie.add_item().await?;
    /// # Ok(())
    /// # }
    /// ```
    fn add_item(&self) -> impl Future<Output = Result<PutItemOutput, Error>> {
        add_item::<Self>(self)
    }

    /// Get an item from the table by its primary key
    ///
    /// Retrieves a single item using its partition key and optional sort key.
    /// Returns `None` if the item doesn't exist.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use reelstore::catalog::Movie;
    /// use reelstore::table::DynamoTable;
    ///
    /// # async fn example() -> Result<(), reelstore::Error> {
    /// let movie = Movie::get_item(&"uuid-1".to_string(), Some(&2010)).await?;
    ///
    /// match movie {
    ///     Some(movie) => println!("found {}", movie.title),
    ///     None => println!("not in the catalog"),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn get_item(
        partition_key: &Self::PK,
        sort_key: Option<&Self::SK>,
    ) -> impl Future<Output = Result<Option<Self>, Error>> {
        get_item::<Self>(partition_key, sort_key)
    }

    /// Query items from the table by partition key
    ///
    /// Retrieves all items matching the partition key in ascending sort key
    /// order. Optionally filter by exact sort key, limit results, and paginate
    /// using the cursor from a previous [`OutputItems`].
    fn query_items(
        partition_key: &Self::PK,
        sort_key: Option<&Self::SK>,
        limit: Option<u16>,
        exclusive_start_key: Option<&Self::SK>,
    ) -> impl Future<Output = Result<OutputItems<Self>, Error>> {
        _query_items(partition_key, sort_key, exclusive_start_key, limit, true)
    }

    /// Query items from the table with a filter expression
    fn query_items_with_filter<U: Serialize>(
        partition_key: &Self::PK,
        sort_key: Option<&Self::SK>,
        limit: Option<u16>,
        exclusive_start_key: Option<&Self::SK>,
        filter_expression: String,
        filter_expression_values: U,
    ) -> impl Future<Output = Result<OutputItems<Self>, Error>> {
        query_items_with_filter::<Self, U>(
            partition_key,
            sort_key,
            exclusive_start_key,
            limit,
            filter_expression,
            filter_expression_values,
        )
    }

    /// Query items from the table in descending sort key order
    fn reverse_query_items(
        partition_key: &Self::PK,
        sort_key: Option<&Self::SK>,
        limit: Option<u16>,
        exclusive_start_key: Option<&Self::SK>,
    ) -> impl Future<Output = Result<OutputItems<Self>, Error>> {
        _query_items(partition_key, sort_key, exclusive_start_key, limit, false)
    }

    /// Query a single item from the table by partition key
    fn query_item(partition_key: &Self::PK) -> impl Future<Output = Result<Option<Self>, Error>> {
        query_item::<Self>(partition_key)
    }

    /// Delete an item from the table using the item itself
    ///
    /// Consumes the item and deletes it from DynamoDB.
    fn destroy_item(self) -> impl Future<Output = Result<DeleteItemOutput, Error>> {
        let partition_key = self.partition_key();
        let sort_key = self.sort_key();
        delete_item::<Self>(partition_key, sort_key)
    }

    /// Delete an item from the table by its keys
    ///
    /// The delete requests the old item back (`ReturnValue::AllOld`), so the
    /// output's `attributes` distinguish a real delete from a no-op on a
    /// missing key.
    fn delete_item(
        partition_key: Self::PK,
        sort_key: Option<Self::SK>,
    ) -> impl Future<Output = Result<DeleteItemOutput, Error>> {
        delete_item::<Self>(partition_key, sort_key)
    }

    /// Update an item's fields
    ///
    /// Updates specific fields of an existing item. Only the fields present in
    /// the update object will be modified; other fields remain unchanged.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use reelstore::catalog::Movie;
    /// use reelstore::table::DynamoTable;
    /// use serde_json::json;
    ///
    /// # async fn example(movie: Movie) -> Result<(), reelstore::Error> {
    /// movie.update_item(json!({ "rating": 9.0 })).await?;
    /// # Ok(())
    /// # }
    /// ```
    fn update_item<T: Serialize + Send>(
        &self,
        update: T,
    ) -> impl Future<Output = Result<UpdateItemOutput, Error>> {
        let partition_key = self.partition_key();
        let sort_key = self.sort_key();
        update_item::<Self, T>(partition_key, sort_key, update)
    }

    /// Update an item with an optional condition expression (same params as `update_item` plus condition)
    fn update_item_with_condition<U: Serialize + Send, C: Serialize>(
        &self,
        update: U,
        condition_expression: Option<String>,
        condition_expression_values: Option<C>,
    ) -> impl Future<Output = Result<UpdateItemOutput, Error>> {
        let partition_key = self.partition_key();
        let sort_key = self.sort_key();
        update_item_with_condition::<Self, U, C>(
            partition_key,
            sort_key,
            update,
            condition_expression,
            condition_expression_values,
        )
    }

    /// Update an item with a raw update expression
    ///
    /// Needed where the field-map form of `update_item` cannot reach: nested
    /// document paths (`SET details.awards = :awards`) and list appends
    /// (`SET details.reviews = list_append(details.reviews, :more)`).
    fn update_with_expression<U: Serialize + Send>(
        partition_key: Self::PK,
        sort_key: Option<Self::SK>,
        update_expression: String,
        expression_values: U,
    ) -> impl Future<Output = Result<UpdateItemOutput, Error>> {
        update_with_expression::<Self, U>(
            partition_key,
            sort_key,
            update_expression,
            expression_values,
        )
    }

    /// Count items by partition key
    fn count_items(partition_key: &Self::PK) -> impl Future<Output = Result<usize, Error>> {
        count_items::<Self>(partition_key)
    }

    /// Count every item in the table (paged Scan with `Select::Count`)
    fn count_all_items() -> impl Future<Output = Result<usize, Error>> {
        count_all_items::<Self>()
    }

    /// Scan items from the table
    fn scan_items(
        limit: Option<u16>,
        exclusive_start_key: Option<CompositeKey<Self::PK, Self::SK>>,
    ) -> impl Future<Output = Result<OutputItems<Self>, Error>> {
        scan_items::<Self>(limit, exclusive_start_key)
    }

    /// Scan items with filter from the table
    fn scan_items_with_filter<U: Serialize>(
        limit: Option<u16>,
        exclusive_start_key: Option<CompositeKey<Self::PK, Self::SK>>,
        filter_expression: String,
        filter_expression_values: U,
    ) -> impl Future<Output = Result<OutputItems<Self>, Error>> {
        scan_items_with_filter::<Self, U>(
            limit,
            exclusive_start_key,
            filter_expression,
            filter_expression_values,
        )
    }

    /// Increment multiple numeric fields atomically
    fn increment_multiple(
        partition_key: &Self::PK,
        sort_key: Option<&Self::SK>,
        fields: &[(&str, u64)],
    ) -> impl Future<Output = Result<UpdateItemOutput, Error>> {
        increment_multiple::<Self>(partition_key, sort_key, fields)
    }

    /// Batch write (insert or update) multiple items
    ///
    /// Efficiently writes up to 25 items per batch request. Automatically
    /// handles batching, retries, and unprocessed items.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use reelstore::catalog::{Movie, MovieDetails};
    /// use reelstore::table::DynamoTable;
    ///
    /// # async fn example(movies: Vec<Movie>) -> Result<(), reelstore::Error> {
    /// let result = Movie::batch_upsert(movies).await?;
    ///
    /// if !result.failed_puts.is_empty() {
    ///     println!("failed to write {} movies", result.failed_puts.len());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn batch_upsert(
        upsert: Vec<Self>,
    ) -> impl Future<Output = Result<BatchWriteOutput<Self>, Error>>
    where
        Self: Clone,
        Self::PK: DeserializeOwned,
        Self::SK: DeserializeOwned,
    {
        batch_write(upsert, vec![])
    }

    /// Batch delete multiple items
    ///
    /// Efficiently deletes up to 25 items per batch request. Automatically
    /// handles batching, retries, and unprocessed items.
    fn batch_delete(
        delete: Vec<Self>,
    ) -> impl Future<Output = Result<BatchWriteOutput<Self>, Error>>
    where
        Self: Clone,
        Self::PK: DeserializeOwned,
        Self::SK: DeserializeOwned,
    {
        batch_write(vec![], delete)
    }

    /// Batch get multiple items by their keys
    ///
    /// Efficiently retrieves up to 100 items per batch request. Automatically
    /// handles batching and retries for unprocessed keys.
    fn batch_get(
        values: Vec<CompositeKey<Self::PK, Self::SK>>,
    ) -> impl Future<Output = Result<BatchReadOutput<Self>, Error>>
    where
        Self::PK: DeserializeOwned,
        Self::SK: DeserializeOwned,
    {
        batch_get::<Self>(values)
    }

    /// Query items with a BETWEEN condition on the sort key
    fn query_items_between(
        partition_key: &Self::PK,
        exclusive_start_key: Option<&Self::SK>,
        limit: Option<u16>,
        scan_index_forward: bool,
        range_start: &Self::SK,
        range_end: &Self::SK,
    ) -> impl Future<Output = Result<OutputItems<Self>, Error>> {
        query_items_between::<Self>(
            partition_key,
            exclusive_start_key,
            limit,
            scan_index_forward,
            range_start,
            range_end,
        )
    }

    /// Query items whose sort key begins with a prefix
    fn query_items_begins_with(
        partition_key: &Self::PK,
        exclusive_start_key: Option<&Self::SK>,
        limit: Option<u16>,
        scan_index_forward: bool,
        sort_key_prefix: String,
    ) -> impl Future<Output = Result<OutputItems<Self>, Error>> {
        query_items_begins_with::<Self>(
            partition_key,
            exclusive_start_key,
            limit,
            scan_index_forward,
            sort_key_prefix,
        )
    }
}

/// Add an item to a DynamoDB table
///
/// This performs a PutItem operation, which creates a new item or replaces an
/// existing item with the same primary key.
pub async fn add_item<T>(payload: &T) -> Result<PutItemOutput, Error>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    validation::validate_table_keys::<T>();
    let item: HashMap<String, AttributeValue> = to_item(payload)?;

    let result = T::dynamodb_client()
        .await
        .put_item()
        .table_name(T::TABLE)
        .return_values(ReturnValue::None)
        .return_consumed_capacity(ReturnConsumedCapacity::None)
        .set_item(Some(item));

    Ok(result.send().await?)
}

/// Get a single item from a DynamoDB table by its primary key
///
/// Returns `Ok(Some(T))` if the item exists, `Ok(None)` if not found, or `Err`
/// on failure.
pub async fn get_item<T>(
    partition_key: &T::PK,
    sort_key: Option<&T::SK>,
) -> Result<Option<T>, Error>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    debug_assert!(
        !(T::SORT_KEY.is_some() && sort_key.is_none()),
        "get_item argument SORT_KEY is defined but sort_key argument not given"
    );

    validation::validate_table_keys::<T>();

    let mut builder = T::dynamodb_client()
        .await
        .get_item()
        .table_name(T::TABLE)
        .set_return_consumed_capacity(None)
        .key(T::PARTITION_KEY, partition_key.to_attribute());

    if let (Some(sort_key_field), Some(sort_value)) = (T::SORT_KEY, sort_key) {
        builder = builder.key(sort_key_field, sort_value.to_attribute());
    }

    let result = builder.send().await?;

    if let Some(item) = result.item {
        let item: T = from_item(item)?;

        Ok(Some(item))
    } else {
        Ok(None)
    }
}

/// Query items builder
async fn _query_items_builder<T>(
    partition_key: &T::PK,
    sort_key: Option<&T::SK>,
    exclusive_start_key: Option<&T::SK>,
    limit: u16,
    scan_index_forward: bool,
) -> QueryFluentBuilder
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    validation::validate_table_keys::<T>();

    let client = T::dynamodb_client().await;
    let builder = query_builder::QueryBuilder::for_table::<T>();

    builder.build_query(
        client,
        partition_key.to_attribute(),
        sort_key.map(KeyScalar::to_attribute),
        exclusive_start_key.map(KeyScalar::to_attribute),
        limit,
        scan_index_forward,
    )
}

/// Query items from a table with filter expression
pub async fn query_items_with_filter<T, U>(
    partition_key: &T::PK,
    sort_key: Option<&T::SK>,
    exclusive_start_key: Option<&T::SK>,
    limit: Option<u16>,
    filter_expression: String,
    filter_expression_values: U,
) -> Result<OutputItems<T>, Error>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
    U: Serialize,
{
    if cfg!(debug_assertions) {
        validation::validate_filter_expression_values(&filter_expression_values);
    }

    if limit.map(|l| l == 0).unwrap_or(false) {
        return Ok(OutputItems::default());
    }

    let limit = limit.unwrap_or(T::DEFAULT_PAGE_SIZE);

    let filter_expression_values =
        to_item::<_, HashMap<String, AttributeValue>>(filter_expression_values)?;

    let mut builder = _query_items_builder::<T>(
        partition_key,
        sort_key,
        exclusive_start_key,
        limit,
        true,
    )
    .await
    .filter_expression(filter_expression);

    for (key, value) in filter_expression_values {
        builder = builder.expression_attribute_values(key, value);
    }

    let result = builder.send().await?;

    Ok(OutputItems::from((result, limit)))
}

/// Query items using a BETWEEN condition on the sort key.
pub async fn query_items_between<T>(
    partition_key: &T::PK,
    exclusive_start_key: Option<&T::SK>,
    limit: Option<u16>,
    scan_index_forward: bool,
    range_start: &T::SK,
    range_end: &T::SK,
) -> Result<OutputItems<T>, Error>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    if limit.map(|l| l == 0).unwrap_or(false) {
        return Ok(OutputItems::default());
    }

    let limit = limit.unwrap_or(T::DEFAULT_PAGE_SIZE);
    let sort_key_field = T::SORT_KEY.expect("sort key required for between query");

    let mut builder = T::dynamodb_client()
        .await
        .query()
        .table_name(T::TABLE)
        .set_return_consumed_capacity(None)
        .scan_index_forward(scan_index_forward)
        .limit(limit as i32)
        .key_condition_expression(format!(
            "{} = :hash_value AND {sort_key_field} BETWEEN :range_start AND :range_end",
            T::PARTITION_KEY
        ))
        .expression_attribute_values(":hash_value", partition_key.to_attribute())
        .expression_attribute_values(":range_start", range_start.to_attribute())
        .expression_attribute_values(":range_end", range_end.to_attribute());

    if let Some(sort_key) = exclusive_start_key {
        builder = builder
            .exclusive_start_key(T::PARTITION_KEY, partition_key.to_attribute())
            .exclusive_start_key(sort_key_field, sort_key.to_attribute());
    }

    let result = builder.send().await?;

    Ok(OutputItems::from((result, limit)))
}

/// Query items using a `begins_with` condition on the sort key.
pub async fn query_items_begins_with<T>(
    partition_key: &T::PK,
    exclusive_start_key: Option<&T::SK>,
    limit: Option<u16>,
    scan_index_forward: bool,
    prefix: String,
) -> Result<OutputItems<T>, Error>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    if limit.map(|l| l == 0).unwrap_or(false) {
        return Ok(OutputItems::default());
    }

    let limit = limit.unwrap_or(T::DEFAULT_PAGE_SIZE);
    let sort_key_field = T::SORT_KEY.expect("sort key required for begins_with query");

    let mut builder = T::dynamodb_client()
        .await
        .query()
        .table_name(T::TABLE)
        .set_return_consumed_capacity(None)
        .scan_index_forward(scan_index_forward)
        .limit(limit as i32)
        .key_condition_expression(format!(
            "{} = :hash_value AND begins_with({sort_key_field}, :sort_prefix)",
            T::PARTITION_KEY,
        ))
        .expression_attribute_values(":hash_value", partition_key.to_attribute())
        .expression_attribute_values(":sort_prefix", AttributeValue::S(prefix));

    if let Some(sort_key) = exclusive_start_key {
        builder = builder
            .exclusive_start_key(T::PARTITION_KEY, partition_key.to_attribute())
            .exclusive_start_key(sort_key_field, sort_key.to_attribute());
    }

    let result = builder.send().await?;

    Ok(OutputItems::from((result, limit)))
}

/// Query item from a table
async fn _query_items<T>(
    partition_key: &T::PK,
    sort_key: Option<&T::SK>,
    exclusive_start_key: Option<&T::SK>,
    limit: Option<u16>,
    scan_index_forward: bool,
) -> Result<OutputItems<T>, Error>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    if limit.map(|l| l == 0).unwrap_or(false) {
        return Ok(OutputItems::default());
    }

    let limit = limit.unwrap_or(T::DEFAULT_PAGE_SIZE);

    let result = _query_items_builder::<T>(
        partition_key,
        sort_key,
        exclusive_start_key,
        limit,
        scan_index_forward,
    )
    .await
    .send()
    .await?;

    Ok(OutputItems::from((result, limit)))
}

/// Query a single item from a table by partition key
pub async fn query_item<T>(partition_key: &T::PK) -> Result<Option<T>, Error>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    _query_items::<T>(partition_key, None, None, Some(1), true)
        .await
        .map(|mut output| output.items.pop())
}

/// Delete an item from a DynamoDB table
///
/// The request asks for `ReturnValue::AllOld`, so `output.attributes` hold the
/// removed item when one existed and are `None` when the key matched nothing.
pub async fn delete_item<T>(
    partition_key: T::PK,
    sort_key: Option<T::SK>,
) -> Result<DeleteItemOutput, Error>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    debug_assert!(
        !(T::SORT_KEY.is_some() && sort_key.is_none()),
        "delete_item argument SORT_KEY is defined but sort_key argument not given"
    );

    validation::validate_table_keys::<T>();

    let mut builder = T::dynamodb_client()
        .await
        .delete_item()
        .table_name(T::TABLE)
        .set_return_consumed_capacity(None)
        .return_values(ReturnValue::AllOld)
        .key(T::PARTITION_KEY, partition_key.to_attribute());

    if let (Some(sort_key_field), Some(sort_value)) = (T::SORT_KEY, sort_key) {
        builder = builder.key(sort_key_field, sort_value.to_attribute());
    }

    Ok(builder.send().await?)
}

/// Increment a numeric field by a value
pub async fn increment<T>(
    partition_key: &T::PK,
    sort_key: Option<&T::SK>,
    field: &str,
    increment_by: u64,
) -> Result<UpdateItemOutput, Error>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    increment_multiple::<T>(partition_key, sort_key, &[(field, increment_by)]).await
}

/// Increment multiple numeric fields by values
///
/// Field names may be nested document paths (`details.sequels`); the update
/// fails on the service side if any path segment is missing.
pub async fn increment_multiple<T>(
    partition_key: &T::PK,
    sort_key: Option<&T::SK>,
    fields: &[(&str, u64)],
) -> Result<UpdateItemOutput, Error>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    if fields.is_empty() {
        return Ok(UpdateItemOutput::builder().build());
    }

    debug_assert!(
        !(T::SORT_KEY.is_some() && sort_key.is_none()),
        "increment argument SORT_KEY is defined but sort_key argument not given"
    );

    validation::validate_table_keys::<T>();
    if cfg!(debug_assertions) {
        let field_names: Vec<&str> = fields.iter().map(|f| f.0).collect();
        validation::validate_field_names(&field_names);
    }

    let mut builder = T::dynamodb_client()
        .await
        .update_item()
        .table_name(T::TABLE)
        .set_return_consumed_capacity(None)
        .set_return_values(Some(ReturnValue::None))
        .key(T::PARTITION_KEY, partition_key.to_attribute());

    let mut update_expressions: Vec<String> = Vec::with_capacity(fields.len());

    for (index, field) in fields.iter().enumerate() {
        update_expressions.push(format!("{} = {} + :incr{}", field.0, field.0, index));
        builder = builder.expression_attribute_values(
            format!(":incr{index}"),
            AttributeValue::N(format!("{}", field.1)),
        );
    }

    builder = builder.update_expression(format!("SET {}", update_expressions.join(",")));

    if let (Some(sort_key_field), Some(sort_value)) = (T::SORT_KEY, sort_key) {
        builder = builder.key(sort_key_field, sort_value.to_attribute());
    }

    Ok(builder.send().await?)
}

/// Update specific fields of an item in a DynamoDB table
///
/// Updates one or more attributes of an existing item. If the item doesn't
/// exist, it will be created with the specified attributes.
pub async fn update_item<T, U>(
    partition_key: T::PK,
    sort_key: Option<T::SK>,
    update: U,
) -> Result<UpdateItemOutput, Error>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
    U: Serialize + Send,
{
    update_item_with_condition::<T, U, ()>(partition_key, sort_key, update, None, None).await
}

/// Update an item with a condition expression and values
pub async fn update_item_with_condition<T, U, C>(
    partition_key: T::PK,
    sort_key: Option<T::SK>,
    update: U,
    condition_expression: Option<String>,
    condition_expression_values: Option<C>,
) -> Result<UpdateItemOutput, Error>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
    U: Serialize + Send,
    C: Serialize,
{
    debug_assert!(
        !(T::SORT_KEY.is_some() && sort_key.is_none()),
        "update_item argument SORT_KEY is defined but sort_key argument not given"
    );

    let item = to_item::<_, HashMap<String, AttributeValue>>(update)?;

    if cfg!(debug_assertions) {
        crate::assert_not_reserved_key(T::PARTITION_KEY);
        crate::assert_not_reserved_key(T::SORT_KEY.unwrap_or_default());

        assert!(!item.is_empty());
        let field_names: Vec<&str> = item.keys().map(|k| k.as_str()).collect();
        validation::validate_field_names(&field_names);
    }

    let mut update_expressions: Vec<String> = Vec::with_capacity(item.len());

    let mut builder = T::dynamodb_client()
        .await
        .update_item()
        .table_name(T::TABLE)
        .set_return_consumed_capacity(None)
        .set_return_values(Some(ReturnValue::None))
        .key(T::PARTITION_KEY, partition_key.to_attribute());

    for (index, (k, v)) in item.into_iter().enumerate() {
        let val = format!(":val{index}");
        update_expressions.push(format!("{k} = {val}"));
        builder = builder.expression_attribute_values(val, v);
    }

    builder = builder.update_expression(format!("SET {}", update_expressions.join(",")));

    if let (Some(sort_key_field), Some(sort_value)) = (T::SORT_KEY, sort_key) {
        builder = builder.key(sort_key_field, sort_value.to_attribute());
    }

    if let Some(cond) = condition_expression {
        builder = builder.condition_expression(cond);
        if let Some(values) = condition_expression_values {
            let values = to_item::<_, HashMap<String, AttributeValue>>(values)?;
            for (k, v) in values {
                builder = builder.expression_attribute_values(k, v);
            }
        }
    }

    Ok(builder.send().await?)
}

/// Update an item with a raw update expression and serialized expression values
///
/// The expression is passed through untouched, so it can address nested
/// document paths and use functions like `list_append`. Expression value
/// parameter names (`:more`, `:awards`) come from the keys of the serialized
/// `expression_values`.
pub async fn update_with_expression<T, U>(
    partition_key: T::PK,
    sort_key: Option<T::SK>,
    update_expression: String,
    expression_values: U,
) -> Result<UpdateItemOutput, Error>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
    U: Serialize + Send,
{
    debug_assert!(
        !(T::SORT_KEY.is_some() && sort_key.is_none()),
        "update_with_expression argument SORT_KEY is defined but sort_key argument not given"
    );

    validation::validate_table_keys::<T>();

    let values = to_item::<_, HashMap<String, AttributeValue>>(expression_values)?;

    let mut builder = T::dynamodb_client()
        .await
        .update_item()
        .table_name(T::TABLE)
        .set_return_consumed_capacity(None)
        .set_return_values(Some(ReturnValue::None))
        .key(T::PARTITION_KEY, partition_key.to_attribute())
        .update_expression(update_expression);

    for (key, value) in values {
        builder = builder.expression_attribute_values(key, value);
    }

    if let (Some(sort_key_field), Some(sort_value)) = (T::SORT_KEY, sort_key) {
        builder = builder.key(sort_key_field, sort_value.to_attribute());
    }

    Ok(builder.send().await?)
}

/// Count items by partition key
pub async fn count_items<T>(partition_key: &T::PK) -> Result<usize, Error>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    validation::validate_table_keys::<T>();

    let client = T::dynamodb_client().await;
    let builder = query_builder::QueryBuilder::for_table::<T>();
    let result = builder
        .build_count_query(client, partition_key.to_attribute())
        .send()
        .await?;

    Ok(result.count as usize)
}

/// Count every item in the table
///
/// Pages through a `Select::Count` scan until the last evaluated key runs out,
/// so tables larger than one scan page still report the full total.
pub async fn count_all_items<T>() -> Result<usize, Error>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    validation::validate_table_keys::<T>();

    let client = T::dynamodb_client().await;
    let mut total = 0usize;
    let mut exclusive_start_key: Option<HashMap<String, AttributeValue>> = None;

    loop {
        let result = client
            .scan()
            .table_name(T::TABLE)
            .select(Select::Count)
            .set_return_consumed_capacity(None)
            .set_exclusive_start_key(exclusive_start_key)
            .send()
            .await?;

        total += result.count as usize;

        if result.last_evaluated_key.is_none() {
            return Ok(total);
        }
        exclusive_start_key = result.last_evaluated_key;
    }
}

async fn _scan_items_builder<T>(
    exclusive_start_key: Option<CompositeKey<T::PK, T::SK>>,
) -> operation::scan::builders::ScanFluentBuilder
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    validation::validate_table_keys::<T>();

    let mut builder = T::dynamodb_client()
        .await
        .scan()
        .table_name(T::TABLE)
        // Scans operate on the base table, so requesting all attributes is always valid.
        .select(Select::AllAttributes)
        .set_return_consumed_capacity(None);

    if let Some((partition_key, sort_key)) = exclusive_start_key {
        builder = builder.exclusive_start_key(T::PARTITION_KEY, partition_key.to_attribute());

        if let (Some(sort_key_field), Some(sort_value)) = (T::SORT_KEY, sort_key) {
            builder = builder.exclusive_start_key(sort_key_field, sort_value.to_attribute());
        }
    }
    builder
}

/// Scan items from a table
pub async fn scan_items<T>(
    limit: Option<u16>,
    exclusive_start_key: Option<CompositeKey<T::PK, T::SK>>,
) -> Result<OutputItems<T>, Error>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    if limit.map(|l| l == 0).unwrap_or(false) {
        return Ok(OutputItems::default());
    }

    let limit = limit.unwrap_or(T::DEFAULT_PAGE_SIZE);

    let result = _scan_items_builder::<T>(exclusive_start_key)
        .await
        .limit(limit as i32)
        .send()
        .await?;

    Ok(OutputItems::from((result, limit)))
}

/// Scan items from a table with a filter expression
pub async fn scan_items_with_filter<T, U>(
    limit: Option<u16>,
    exclusive_start_key: Option<CompositeKey<T::PK, T::SK>>,
    filter_expression: String,
    filter_expression_values: U,
) -> Result<OutputItems<T>, Error>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
    U: Serialize,
{
    if cfg!(debug_assertions) {
        validation::validate_filter_expression_values(&filter_expression_values);
    }

    if limit.map(|l| l == 0).unwrap_or(false) {
        return Ok(OutputItems::default());
    }

    let limit = limit.unwrap_or(T::DEFAULT_PAGE_SIZE);

    let filter_expression_values =
        to_item::<_, HashMap<String, AttributeValue>>(filter_expression_values)?;

    let mut builder = _scan_items_builder::<T>(exclusive_start_key)
        .await
        .filter_expression(filter_expression)
        .limit(limit as i32);

    for (key, value) in filter_expression_values {
        builder = builder.expression_attribute_values(key, value);
    }

    let result = builder.send().await?;

    Ok(OutputItems::from((result, limit)))
}

/// Stream every item of a table through the scan paginator
pub async fn scan_items_stream<T>(page_size: Option<u16>) -> impl Stream<Item = Result<T, Error>>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    let page_size = page_size.unwrap_or(T::DEFAULT_PAGE_SIZE);

    _scan_items_builder::<T>(None)
        .await
        .into_paginator()
        .page_size(page_size as i32)
        .items()
        .send()
        .into_stream_03x()
        .map_err(Into::into)
        .and_then(|item| async { from_item(item).map_err(Into::into) })
}
