use crate::table::helpers::{query_builder, validation};
use crate::table::types::{KeyScalar, OutputItems};
use crate::{Error, table::DynamoTable};

/// Typed view of a global secondary index over table `T`'s items
///
/// `I` is a zero-sized marker naming the index, so a table with several GSIs
/// gets one `GlobalIndex` impl per marker. The index carries its own key
/// types: a genre index may hash on a string while a rating index ranges over
/// a float, and both live on the same item type.
pub trait GlobalIndex<I>: DynamoTable
where
    Self::PK: KeyScalar,
    Self::SK: KeyScalar,
    Self::IndexPK: KeyScalar,
    Self::IndexSK: KeyScalar,
{
    /// Associated index partition key type
    type IndexPK;

    /// Associated index sort key type
    type IndexSK;

    /// Name of the index as created on the table
    const INDEX_NAME: &'static str;

    /// Index partition key field name
    const INDEX_PARTITION_KEY: &'static str;

    /// Index sort key field name (optional)
    const INDEX_SORT_KEY: Option<&'static str> = None;

    /// Returns the index partition key value for this item
    fn index_partition_key(&self) -> Self::IndexPK;

    /// Returns the index sort key value for this item (optional)
    fn index_sort_key(&self) -> Option<Self::IndexSK> {
        None
    }
}

/// Query items from a global secondary index
///
/// Matches the index partition key exactly, with an optional exact match on
/// the index sort key. Results come back in ascending index sort key order.
pub async fn query_index_items<T, I>(
    index_partition_key: &T::IndexPK,
    index_sort_key: Option<&T::IndexSK>,
    limit: Option<u16>,
    exclusive_start_key: Option<&T::IndexSK>,
) -> Result<OutputItems<T>, Error>
where
    T: GlobalIndex<I>,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
    T::IndexPK: KeyScalar,
    T::IndexSK: KeyScalar,
{
    _query_index_items::<T, I>(
        index_partition_key,
        index_sort_key,
        exclusive_start_key,
        limit,
        true,
    )
    .await
}

/// Query items from a global secondary index in descending order
pub async fn reverse_query_index_items<T, I>(
    index_partition_key: &T::IndexPK,
    index_sort_key: Option<&T::IndexSK>,
    limit: Option<u16>,
    exclusive_start_key: Option<&T::IndexSK>,
) -> Result<OutputItems<T>, Error>
where
    T: GlobalIndex<I>,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
    T::IndexPK: KeyScalar,
    T::IndexSK: KeyScalar,
{
    _query_index_items::<T, I>(
        index_partition_key,
        index_sort_key,
        exclusive_start_key,
        limit,
        false,
    )
    .await
}

/// Query a single item from a global secondary index
pub async fn query_index_item<T, I>(
    index_partition_key: &T::IndexPK,
    index_sort_key: Option<&T::IndexSK>,
) -> Result<Option<T>, Error>
where
    T: GlobalIndex<I>,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
    T::IndexPK: KeyScalar,
    T::IndexSK: KeyScalar,
{
    let mut output =
        _query_index_items::<T, I>(index_partition_key, index_sort_key, None, Some(1), true)
            .await?;
    Ok(output.items.pop())
}

/// Query items from a global secondary index with a strict lower bound on the
/// index sort key (`sort > floor`)
///
/// This is the shape of "genre = G and release_year > Y" and
/// "release_year = Y and rating > R" lookups.
pub async fn query_index_items_above<T, I>(
    index_partition_key: &T::IndexPK,
    index_sort_key_floor: &T::IndexSK,
    limit: Option<u16>,
    exclusive_start_key: Option<&T::IndexSK>,
) -> Result<OutputItems<T>, Error>
where
    T: GlobalIndex<I>,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
    T::IndexPK: KeyScalar,
    T::IndexSK: KeyScalar,
{
    validation::validate_index_keys::<T, I>();

    if limit.map(|l| l == 0).unwrap_or(false) {
        return Ok(OutputItems::default());
    }

    let limit = limit.unwrap_or(T::DEFAULT_PAGE_SIZE);

    let client = T::dynamodb_client().await;
    let builder = query_builder::QueryBuilder::for_index::<T, I>();
    let result = builder
        .build_range_query(
            client,
            index_partition_key.to_attribute(),
            index_sort_key_floor.to_attribute(),
            exclusive_start_key.map(KeyScalar::to_attribute),
            limit,
            true,
        )
        .send()
        .await?;

    Ok(OutputItems::from((result, limit)))
}

/// Query items from a global secondary index
async fn _query_index_items<T, I>(
    index_partition_key: &T::IndexPK,
    index_sort_key: Option<&T::IndexSK>,
    exclusive_start_key: Option<&T::IndexSK>,
    limit: Option<u16>,
    scan_index_forward: bool,
) -> Result<OutputItems<T>, Error>
where
    T: GlobalIndex<I>,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
    T::IndexPK: KeyScalar,
    T::IndexSK: KeyScalar,
{
    validation::validate_index_keys::<T, I>();

    if limit.map(|l| l == 0).unwrap_or(false) {
        return Ok(OutputItems::default());
    }

    let limit = limit.unwrap_or(T::DEFAULT_PAGE_SIZE);

    let client = T::dynamodb_client().await;
    let builder = query_builder::QueryBuilder::for_index::<T, I>();
    let result = builder
        .build_query(
            client,
            index_partition_key.to_attribute(),
            index_sort_key.map(KeyScalar::to_attribute),
            exclusive_start_key.map(KeyScalar::to_attribute),
            limit,
            scan_index_forward,
        )
        .send()
        .await?;

    Ok(OutputItems::from((result, limit)))
}

/// Count items by index partition key
pub async fn count_index_items<T, I>(index_partition_key: &T::IndexPK) -> Result<usize, Error>
where
    T: GlobalIndex<I>,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
    T::IndexPK: KeyScalar,
    T::IndexSK: KeyScalar,
{
    validation::validate_index_keys::<T, I>();

    let client = T::dynamodb_client().await;
    let builder = query_builder::QueryBuilder::for_index::<T, I>();
    let result = builder
        .build_count_query(client, index_partition_key.to_attribute())
        .send()
        .await?;

    Ok(result.count as usize)
}
