use crate::table::{DynamoTable, GlobalIndex, KeyScalar};
use serde::Serialize;
use serde_dynamo::{AttributeValue, to_item};
use std::collections::HashMap;

/// Retry configuration for batch operations
pub(crate) mod retry_config {
    use std::time::Duration;

    /// Calculate retry delay with exponential backoff
    ///
    /// # Arguments
    /// * `attempt` - The retry attempt number (0-based)
    /// * `initial` - Initial delay duration
    /// * `max` - Maximum delay duration
    ///
    /// # Returns
    /// Duration to wait before retrying
    pub(crate) fn retry_delay(attempt: usize, initial: Duration, max: Duration) -> Duration {
        let delay_ms = initial.as_millis() as u64 * 2u64.pow(attempt as u32);
        let capped_delay = delay_ms.min(max.as_millis() as u64);
        Duration::from_millis(capped_delay)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_retry_delay_doubles() {
            let initial = Duration::from_millis(100);
            let max = Duration::from_millis(2000);

            assert_eq!(retry_delay(0, initial, max), Duration::from_millis(100));
            assert_eq!(retry_delay(1, initial, max), Duration::from_millis(200));
            assert_eq!(retry_delay(2, initial, max), Duration::from_millis(400));
        }

        #[test]
        fn test_retry_delay_is_capped() {
            let initial = Duration::from_millis(100);
            let max = Duration::from_millis(2000);

            assert_eq!(retry_delay(10, initial, max), max);
        }
    }
}

/// Validation helpers for table operations
///
/// These validators check for DynamoDB reserved words in key names and field
/// names to prevent runtime errors. All validations only run in debug builds.
pub(crate) mod validation {
    use super::*;

    /// Validate a single key is not a reserved word
    #[inline]
    fn validate_key(key: &str) {
        if cfg!(debug_assertions) {
            crate::assert_not_reserved_key(key);
        }
    }

    /// Validate an optional key is not a reserved word
    #[inline]
    fn validate_optional_key(key: Option<&str>) {
        if let Some(k) = key {
            validate_key(k);
        }
    }

    /// Validate reserved keys for a DynamoTable
    ///
    /// Checks that both partition key and optional sort key are not reserved words.
    pub(crate) fn validate_table_keys<T>()
    where
        T: DynamoTable,
        T::PK: KeyScalar,
        T::SK: KeyScalar,
    {
        validate_key(T::PARTITION_KEY);
        validate_optional_key(T::SORT_KEY);
    }

    /// Validate reserved keys for a global secondary index
    ///
    /// Checks both the main table keys and the index-specific keys.
    pub(crate) fn validate_index_keys<T, I>()
    where
        T: GlobalIndex<I>,
        T::PK: KeyScalar,
        T::SK: KeyScalar,
        T::IndexPK: KeyScalar,
        T::IndexSK: KeyScalar,
    {
        validate_table_keys::<T>();
        validate_key(T::INDEX_PARTITION_KEY);
        validate_optional_key(T::INDEX_SORT_KEY);
    }

    /// Validate field names for update operations
    ///
    /// Ensures none of the field names are DynamoDB reserved words.
    pub(crate) fn validate_field_names(field_names: &[&str]) {
        if cfg!(debug_assertions) {
            for field in field_names {
                validate_key(field);
            }
        }
    }

    /// Validate filter expression parameter names
    ///
    /// Ensures filter expression value keys (e.g., `:paramName`) are not reserved words.
    pub(crate) fn validate_filter_expression_values<U: Serialize>(filter_expression_values: &U) {
        if cfg!(debug_assertions) {
            let filter_keys =
                to_item::<_, HashMap<String, AttributeValue>>(filter_expression_values)
                    .expect("valid serialization for validation");

            for key in filter_keys.keys() {
                validate_key(key);
            }
        }
    }
}

/// Key condition expression builder for DynamoDB queries
pub(crate) mod expressions {
    use aws_sdk_dynamodb::types::AttributeValue;
    use std::collections::HashMap;

    pub(crate) struct KeyConditionBuilder {
        expression: String,
        values: HashMap<String, AttributeValue>,
    }

    impl KeyConditionBuilder {
        pub(crate) fn new() -> Self {
            Self {
                expression: String::new(),
                values: HashMap::new(),
            }
        }

        pub(crate) fn with_partition_key(mut self, field: &str, value: AttributeValue) -> Self {
            self.expression = format!("{field} = :hash_value");
            let _ = self.values.insert(":hash_value".to_string(), value);
            self
        }

        pub(crate) fn with_sort_key(mut self, field: &str, value: AttributeValue) -> Self {
            if !self.expression.is_empty() {
                self.expression.push_str(" and ");
            }
            self.expression.push_str(&format!("{field} = :range_value"));
            let _ = self.values.insert(":range_value".to_string(), value);
            self
        }

        /// Strict lower bound on the sort key (`field > :range_floor`)
        pub(crate) fn with_sort_key_above(mut self, field: &str, value: AttributeValue) -> Self {
            if !self.expression.is_empty() {
                self.expression.push_str(" and ");
            }
            self.expression.push_str(&format!("{field} > :range_floor"));
            let _ = self.values.insert(":range_floor".to_string(), value);
            self
        }

        pub(crate) fn build(self) -> (String, HashMap<String, AttributeValue>) {
            (self.expression, self.values)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_partition_key_only() {
            let (expr, values) = KeyConditionBuilder::new()
                .with_partition_key("genre", AttributeValue::S("Sci-Fi".into()))
                .build();

            assert_eq!(expr, "genre = :hash_value");
            assert_eq!(
                values.get(":hash_value"),
                Some(&AttributeValue::S("Sci-Fi".into()))
            );
        }

        #[test]
        fn test_partition_and_sort_key() {
            let (expr, values) = KeyConditionBuilder::new()
                .with_partition_key("genre", AttributeValue::S("Sci-Fi".into()))
                .with_sort_key("release_year", AttributeValue::N("2010".into()))
                .build();

            assert_eq!(expr, "genre = :hash_value and release_year = :range_value");
            assert_eq!(values.len(), 2);
        }

        #[test]
        fn test_sort_key_lower_bound() {
            let (expr, values) = KeyConditionBuilder::new()
                .with_partition_key("genre", AttributeValue::S("Sci-Fi".into()))
                .with_sort_key_above("release_year", AttributeValue::N("2000".into()))
                .build();

            assert_eq!(expr, "genre = :hash_value and release_year > :range_floor");
            assert_eq!(
                values.get(":range_floor"),
                Some(&AttributeValue::N("2000".into()))
            );
        }
    }
}

/// Shared query builder for DynamoDB operations
pub(crate) mod query_builder {
    use super::{DynamoTable, GlobalIndex, KeyScalar, expressions};
    use aws_sdk_dynamodb::operation::query::builders::QueryFluentBuilder;
    use aws_sdk_dynamodb::types::{AttributeValue, Select};
    use std::collections::HashMap;

    pub(crate) struct QueryBuilder<'a> {
        table_name: &'a str,
        index_name: Option<&'a str>,
        partition_key_field: &'a str,
        sort_key_field: Option<&'a str>,
    }

    impl<'a> QueryBuilder<'a> {
        /// Create builder for main table queries
        pub(crate) fn for_table<T>() -> Self
        where
            T: DynamoTable,
            T::PK: KeyScalar,
            T::SK: KeyScalar,
        {
            Self {
                table_name: T::TABLE,
                index_name: None,
                partition_key_field: T::PARTITION_KEY,
                sort_key_field: T::SORT_KEY,
            }
        }

        /// Create builder for global secondary index queries
        pub(crate) fn for_index<T, I>() -> Self
        where
            T: GlobalIndex<I>,
            T::PK: KeyScalar,
            T::SK: KeyScalar,
            T::IndexPK: KeyScalar,
            T::IndexSK: KeyScalar,
        {
            Self {
                table_name: T::TABLE,
                index_name: Some(T::INDEX_NAME),
                partition_key_field: T::INDEX_PARTITION_KEY,
                sort_key_field: T::INDEX_SORT_KEY,
            }
        }

        /// Build a DynamoDB query with common parameters
        pub(crate) fn build_query(
            &self,
            client: &aws_sdk_dynamodb::Client,
            partition_key: AttributeValue,
            sort_key: Option<AttributeValue>,
            exclusive_start_key: Option<AttributeValue>,
            limit: u16,
            scan_index_forward: bool,
        ) -> QueryFluentBuilder {
            let condition = expressions::KeyConditionBuilder::new()
                .with_partition_key(self.partition_key_field, partition_key.clone());

            let condition = if let (Some(sort_key_field), Some(sort_value)) =
                (self.sort_key_field, sort_key)
            {
                condition.with_sort_key(sort_key_field, sort_value)
            } else {
                condition
            };

            self.finish_query(
                client,
                partition_key,
                condition.build(),
                exclusive_start_key,
                limit,
                scan_index_forward,
            )
        }

        /// Build a query with a strict lower bound on the range key
        pub(crate) fn build_range_query(
            &self,
            client: &aws_sdk_dynamodb::Client,
            partition_key: AttributeValue,
            range_floor: AttributeValue,
            exclusive_start_key: Option<AttributeValue>,
            limit: u16,
            scan_index_forward: bool,
        ) -> QueryFluentBuilder {
            let sort_key_field = self
                .sort_key_field
                .expect("range query requires a sort key on the table or index");

            let condition = expressions::KeyConditionBuilder::new()
                .with_partition_key(self.partition_key_field, partition_key.clone())
                .with_sort_key_above(sort_key_field, range_floor);

            self.finish_query(
                client,
                partition_key,
                condition.build(),
                exclusive_start_key,
                limit,
                scan_index_forward,
            )
        }

        /// Build count query for the configured table/index
        pub(crate) fn build_count_query(
            &self,
            client: &aws_sdk_dynamodb::Client,
            partition_key: AttributeValue,
        ) -> QueryFluentBuilder {
            let mut builder = client
                .query()
                .table_name(self.table_name)
                .select(Select::Count)
                .set_return_consumed_capacity(None);

            if let Some(index_name) = self.index_name {
                builder = builder.index_name(index_name);
            }

            let condition_expr = format!("{} = :hash_value", self.partition_key_field);
            builder = builder
                .key_condition_expression(condition_expr)
                .expression_attribute_values(":hash_value", partition_key);

            builder
        }

        fn finish_query(
            &self,
            client: &aws_sdk_dynamodb::Client,
            partition_key: AttributeValue,
            condition: (String, HashMap<String, AttributeValue>),
            exclusive_start_key: Option<AttributeValue>,
            limit: u16,
            scan_index_forward: bool,
        ) -> QueryFluentBuilder {
            // DynamoDB only allows `AllAttributes` on the base table; secondary indexes are limited
            // to the attributes projected onto the index. See:
            // https://docs.aws.amazon.com/amazondynamodb/latest/developerguide/SQLtoNoSQL.SelectingAttributes.html
            let select = if self.index_name.is_some() {
                Select::AllProjectedAttributes
            } else {
                Select::AllAttributes
            };

            let mut builder = client
                .query()
                .table_name(self.table_name)
                .select(select)
                .set_return_consumed_capacity(None)
                .scan_index_forward(scan_index_forward)
                .limit(limit as i32);

            if let Some(index_name) = self.index_name {
                builder = builder.index_name(index_name);
            }

            // Handle exclusive start key
            if let Some(start_key) = exclusive_start_key {
                if let Some(sort_key_field) = self.sort_key_field {
                    builder = builder
                        .exclusive_start_key(self.partition_key_field, partition_key)
                        .exclusive_start_key(sort_key_field, start_key);
                }
            }

            let (condition_expr, condition_values) = condition;
            builder = builder.key_condition_expression(condition_expr);

            for (key, value) in condition_values {
                builder = builder.expression_attribute_values(key, value);
            }

            builder
        }
    }
}

/// Batch processing constants shared by the batch read/write paths
pub(crate) mod batch_processor {
    /// Standard batch sizes for DynamoDB operations
    pub(crate) const BATCH_WRITE_SIZE: usize = 25;
    pub(crate) const BATCH_READ_SIZE: usize = 100;
    pub(crate) const DEFAULT_CONCURRENCY: usize = 10;
}
