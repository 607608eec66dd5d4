use aws_sdk_dynamodb::operation::create_table::{CreateTableError, CreateTableOutput};
use aws_sdk_dynamodb::operation::delete_table::DeleteTableError;
use aws_sdk_dynamodb::operation::describe_table::DescribeTableError;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, GlobalSecondaryIndex, KeySchemaElement, KeyType, Projection,
    ProjectionType, ProvisionedThroughput, TableStatus,
};
use std::collections::HashSet;
use std::time::Duration;

use crate::error::Error;
use crate::table::{DynamoTable, GlobalIndex, KeyScalar};
use crate::{assert_not_reserved_key, dynamodb_client};

/// Read/write capacity units used for tables and indexes created here
const CAPACITY_UNITS: i64 = 5;

/// Interval between DescribeTable polls while waiting on a table
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Maximum number of DescribeTable polls before giving up
const WAIT_MAX_POLLS: usize = 120;

/// A global secondary index definition ready to attach at table creation
///
/// Carries the index itself plus the attribute definitions its keys need;
/// [`create_table_with_indexes`] merges those with the table's own key
/// attributes.
#[derive(Debug)]
pub struct IndexSpec {
    index: GlobalSecondaryIndex,
    attributes: Vec<AttributeDefinition>,
}

impl IndexSpec {
    /// Build the index definition declared by a [`GlobalIndex`] impl
    pub fn of<T, I>() -> Result<Self, Error>
    where
        T: GlobalIndex<I>,
        T::PK: KeyScalar,
        T::SK: KeyScalar,
        T::IndexPK: KeyScalar,
        T::IndexSK: KeyScalar,
    {
        assert_not_reserved_key(T::INDEX_PARTITION_KEY);

        let mut attributes = vec![
            AttributeDefinition::builder()
                .attribute_name(T::INDEX_PARTITION_KEY)
                .attribute_type(T::IndexPK::attribute_type())
                .build()?,
        ];

        let mut index = GlobalSecondaryIndex::builder()
            .index_name(T::INDEX_NAME)
            .key_schema(
                KeySchemaElement::builder()
                    .attribute_name(T::INDEX_PARTITION_KEY)
                    .key_type(KeyType::Hash)
                    .build()?,
            )
            .projection(
                Projection::builder()
                    .projection_type(ProjectionType::All)
                    .build(),
            )
            .provisioned_throughput(
                ProvisionedThroughput::builder()
                    .read_capacity_units(CAPACITY_UNITS)
                    .write_capacity_units(CAPACITY_UNITS)
                    .build()?,
            );

        if let Some(index_sort_key) = T::INDEX_SORT_KEY {
            assert_not_reserved_key(index_sort_key);

            attributes.push(
                AttributeDefinition::builder()
                    .attribute_name(index_sort_key)
                    .attribute_type(T::IndexSK::attribute_type())
                    .build()?,
            );

            index = index.key_schema(
                KeySchemaElement::builder()
                    .attribute_name(index_sort_key)
                    .key_type(KeyType::Range)
                    .build()?,
            );
        }

        Ok(Self {
            index: index.build()?,
            attributes,
        })
    }

    /// Name of the index as created on the table
    pub fn index_name(&self) -> &str {
        self.index.index_name()
    }
}

/// Create a table from a DynamoTable definition
///
/// Automatically initializes the DynamoDB client with defaults if not already
/// initialized. A `ResourceInUseException` (table already exists) is absorbed.
pub async fn create_table<T>() -> Result<CreateTableOutput, Error>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    create_table_with_indexes::<T>(Vec::new()).await
}

/// Create a table from a DynamoTable definition with any number of GSIs
///
/// Attribute definitions are deduplicated across the table keys and the index
/// keys, since an index may range over an attribute that is already a table
/// key (the genre index sorts on the table's own `release_year`).
pub async fn create_table_with_indexes<T>(
    indexes: Vec<IndexSpec>,
) -> Result<CreateTableOutput, Error>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    let client = dynamodb_client().await;

    assert_not_reserved_key(T::PARTITION_KEY);

    let mut attribute_definitions = vec![
        AttributeDefinition::builder()
            .attribute_name(T::PARTITION_KEY)
            .attribute_type(T::PK::attribute_type())
            .build()?,
    ];

    let mut builder = client
        .create_table()
        .table_name(T::TABLE)
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name(T::PARTITION_KEY)
                .key_type(KeyType::Hash)
                .build()?,
        )
        .provisioned_throughput(
            ProvisionedThroughput::builder()
                .read_capacity_units(CAPACITY_UNITS)
                .write_capacity_units(CAPACITY_UNITS)
                .build()?,
        );

    if let Some(sort_key) = T::SORT_KEY {
        assert_not_reserved_key(sort_key);

        attribute_definitions.push(
            AttributeDefinition::builder()
                .attribute_name(sort_key)
                .attribute_type(T::SK::attribute_type())
                .build()?,
        );

        builder = builder.key_schema(
            KeySchemaElement::builder()
                .attribute_name(sort_key)
                .key_type(KeyType::Range)
                .build()?,
        );
    }

    let mut seen: HashSet<String> = attribute_definitions
        .iter()
        .map(|def| def.attribute_name().to_string())
        .collect();

    for spec in indexes {
        for attribute in spec.attributes {
            if seen.insert(attribute.attribute_name().to_string()) {
                attribute_definitions.push(attribute);
            }
        }
        builder = builder.global_secondary_indexes(spec.index);
    }

    builder = builder.set_attribute_definitions(Some(attribute_definitions));

    // Ignore ResourceInUseException - table already exists
    match builder.send().await {
        Ok(output) => Ok(output),
        Err(e) => {
            if let Some(service_error) = e.as_service_error() {
                if matches!(service_error, CreateTableError::ResourceInUseException(_)) {
                    // Table already exists - return empty output (callers ignore it anyway)
                    return Ok(CreateTableOutput::builder().build());
                }
            }
            Err(e.into())
        }
    }
}

/// Check whether the table behind a DynamoTable definition exists
pub async fn table_exists<T>() -> Result<bool, Error>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    let client = dynamodb_client().await;

    match client.describe_table().table_name(T::TABLE).send().await {
        Ok(_) => Ok(true),
        Err(e) => {
            if let Some(service_error) = e.as_service_error() {
                if matches!(
                    service_error,
                    DescribeTableError::ResourceNotFoundException(_)
                ) {
                    return Ok(false);
                }
            }
            Err(e.into())
        }
    }
}

/// Delete the table behind a DynamoTable definition
///
/// A missing table is absorbed, so delete-then-create sequences do not need an
/// existence check first.
pub async fn delete_table<T>() -> Result<(), Error>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    let client = dynamodb_client().await;

    match client.delete_table().table_name(T::TABLE).send().await {
        Ok(_) => Ok(()),
        Err(e) => {
            if let Some(service_error) = e.as_service_error() {
                if matches!(service_error, DeleteTableError::ResourceNotFoundException(_)) {
                    return Ok(());
                }
            }
            Err(e.into())
        }
    }
}

/// Wait until the table reports `ACTIVE` status
///
/// Polls DescribeTable on a fixed interval. A table stuck in `CREATING` or
/// `UPDATING` past the polling budget yields [`Error::TableWaitTimeout`].
pub async fn wait_for_table_active<T>() -> Result<(), Error>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    let client = dynamodb_client().await;

    for _ in 0..WAIT_MAX_POLLS {
        let output = client.describe_table().table_name(T::TABLE).send().await;

        match output {
            Ok(response) => {
                let status = response.table().and_then(|table| table.table_status());
                if status == Some(&TableStatus::Active) {
                    return Ok(());
                }
            }
            Err(e) => {
                let not_found = e.as_service_error().is_some_and(|service_error| {
                    matches!(
                        service_error,
                        DescribeTableError::ResourceNotFoundException(_)
                    )
                });
                // A table that is still being created may briefly describe as
                // missing; anything else is a real failure.
                if !not_found {
                    return Err(e.into());
                }
            }
        }

        tokio::time::sleep(WAIT_POLL_INTERVAL).await;
    }

    Err(Error::TableWaitTimeout(T::TABLE))
}

/// Wait until the table no longer exists
pub async fn wait_for_table_deleted<T>() -> Result<(), Error>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    let client = dynamodb_client().await;

    for _ in 0..WAIT_MAX_POLLS {
        let output = client.describe_table().table_name(T::TABLE).send().await;

        match output {
            Ok(_) => {}
            Err(e) => {
                let not_found = e.as_service_error().is_some_and(|service_error| {
                    matches!(
                        service_error,
                        DescribeTableError::ResourceNotFoundException(_)
                    )
                });
                if not_found {
                    return Ok(());
                }
                return Err(e.into());
            }
        }

        tokio::time::sleep(WAIT_POLL_INTERVAL).await;
    }

    Err(Error::TableWaitTimeout(T::TABLE))
}

/// Drop and recreate a table, waiting for each step to settle
///
/// The sequence the demo driver runs at startup: delete the table if it
/// exists, wait for the deletion, create it (with the given indexes), and
/// wait until it is active.
pub async fn rebuild_table<T>(indexes: Vec<IndexSpec>) -> Result<(), Error>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    if table_exists::<T>().await? {
        delete_table::<T>().await?;
        wait_for_table_deleted::<T>().await?;
    }

    let _ = create_table_with_indexes::<T>(indexes).await?;
    wait_for_table_active::<T>().await
}
