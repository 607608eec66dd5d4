use aws_sdk_dynamodb::operation;
use aws_sdk_dynamodb::types::{AttributeValue, ScalarAttributeType};
use serde_dynamo::from_items;
use std::{fmt, time::Duration};

use crate::table::DynamoTable;

/// Scalar value usable as a DynamoDB partition or sort key.
///
/// DynamoDB keys are always scalars, stored either as strings (`S`) or as
/// numbers (`N`). This trait carries the mapping from a Rust key type to its
/// wire encoding, so tables with numeric keys (a release year, a rating) go
/// through the same plumbing as string-keyed ones.
pub trait KeyScalar: fmt::Display + Clone + Send + Sync + fmt::Debug {
    /// DynamoDB scalar type used in table and index definitions
    fn attribute_type() -> ScalarAttributeType;

    /// Encode this key value as a DynamoDB attribute
    fn to_attribute(&self) -> AttributeValue;
}

impl KeyScalar for String {
    fn attribute_type() -> ScalarAttributeType {
        ScalarAttributeType::S
    }

    fn to_attribute(&self) -> AttributeValue {
        AttributeValue::S(self.clone())
    }
}

macro_rules! impl_numeric_key {
    ($($ty:ty),+ $(,)?) => {$(
        impl KeyScalar for $ty {
            fn attribute_type() -> ScalarAttributeType {
                ScalarAttributeType::N
            }

            fn to_attribute(&self) -> AttributeValue {
                AttributeValue::N(self.to_string())
            }
        }
    )+};
}

impl_numeric_key!(u16, u32, u64, i32, i64, f64);

/// Sort key type alias
pub type SortKey<SK> = Option<SK>;

/// Composite key type alias
pub type CompositeKey<PK, SK> = (PK, SortKey<SK>);

/// Generic query output with typed keys
#[must_use = "query results should be used or you'll lose the fetched data"]
#[derive(Clone, Debug)]
pub struct OutputItems<T>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    /// The items returned by the query
    pub items: Vec<T>,
    /// Initial query limit
    pub limit: u16,
    /// Count of items returned
    pub count: i32,
    /// Scanned count of items
    pub scanned_count: i32,
    /// The last evaluated key for pagination
    pub last_evaluated_key: Option<CompositeKey<T::PK, T::SK>>,
}

/// A typed pagination cursor for a table `T`.
#[must_use = "cursor should be used for pagination to fetch the next page"]
#[derive(Clone, Debug)]
pub struct Cursor<T>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    /// Partition key for the next page
    pub pk: T::PK,
    /// Optional sort key for the next page
    pub sk: Option<T::SK>,
}

impl<T> Cursor<T>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    /// Returns the partition key reference.
    pub fn partition_key(&self) -> &T::PK {
        &self.pk
    }

    /// Returns the optional sort key reference.
    pub fn sort_key(&self) -> Option<&T::SK> {
        self.sk.as_ref()
    }

    /// Convenience: the value to pass as `exclusive_start_key` to query APIs.
    pub fn exclusive_start_key(&self) -> Option<&T::SK> {
        self.sort_key()
    }
}

impl<T> OutputItems<T>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    /// Returns a typed cursor for starting the next page, if present.
    pub fn start_cursor(&self) -> Option<Cursor<T>> {
        self.last_evaluated_key
            .as_ref()
            .map(|(pk, sk)| Cursor::<T> {
                pk: pk.clone(),
                sk: sk.clone(),
            })
    }
}

impl<T> From<(operation::scan::ScanOutput, u16)> for OutputItems<T>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    fn from((output, limit): (operation::scan::ScanOutput, u16)) -> Self {
        if let Some(items) = output.items {
            let items: Vec<T> = from_items(items).unwrap_or_else(|e| {
                if cfg!(debug_assertions) {
                    panic!(
                        "Deserialization failed in debug mode for table '{}': {}",
                        T::TABLE,
                        e
                    );
                }
                Vec::new()
            });
            let count = output.count;
            let scanned_count = output.scanned_count;

            let last_evaluated_key = if items.is_empty() || output.last_evaluated_key.is_none() {
                None
            } else {
                items.last().map(|i| i.composite_key())
            };

            Self {
                items,
                limit,
                count,
                scanned_count,
                last_evaluated_key,
            }
        } else {
            Self::default()
        }
    }
}

impl<T> From<(operation::query::QueryOutput, u16)> for OutputItems<T>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    fn from((output, limit): (operation::query::QueryOutput, u16)) -> Self {
        if let Some(items) = output.items {
            let items: Vec<T> = from_items(items).unwrap_or_else(|e| {
                if cfg!(debug_assertions) {
                    panic!(
                        "Deserialization failed in debug mode for table '{}': {}",
                        T::TABLE,
                        e
                    );
                }
                Vec::new()
            });
            let count = output.count;
            let scanned_count = output.scanned_count;

            let last_evaluated_key = if items.is_empty() || output.last_evaluated_key.is_none() {
                None
            } else {
                items.last().map(|i| i.composite_key())
            };

            Self {
                items,
                limit,
                count,
                scanned_count,
                last_evaluated_key,
            }
        } else {
            Self::default()
        }
    }
}

impl<T> Default for OutputItems<T>
where
    T: DynamoTable,
    T::PK: KeyScalar,
    T::SK: KeyScalar,
{
    fn default() -> Self {
        Self {
            items: Vec::new(),
            limit: 0,
            count: 0,
            scanned_count: 0,
            last_evaluated_key: None,
        }
    }
}

/// Retry configuration for DynamoDB batch operations
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Maximum number of retry attempts for batch operations
    pub max_retries: usize,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_key_encodes_as_s() {
        assert_eq!(String::attribute_type(), ScalarAttributeType::S);
        let attr = "uuid-1".to_string().to_attribute();
        assert_eq!(attr, AttributeValue::S("uuid-1".to_string()));
    }

    #[test]
    fn test_integer_key_encodes_as_n() {
        assert_eq!(u16::attribute_type(), ScalarAttributeType::N);
        let attr = 2010u16.to_attribute();
        assert_eq!(attr, AttributeValue::N("2010".to_string()));
    }

    #[test]
    fn test_float_key_encodes_as_n() {
        assert_eq!(f64::attribute_type(), ScalarAttributeType::N);
        let attr = 8.8f64.to_attribute();
        assert_eq!(attr, AttributeValue::N("8.8".to_string()));
    }

    #[test]
    fn test_composite_key_tuple() {
        let key: CompositeKey<String, u16> = ("uuid-1".to_string(), Some(2010));
        assert_eq!(key.0, "uuid-1");
        assert_eq!(key.1, Some(2010));
    }

    #[test]
    fn test_composite_key_no_sort_key() {
        let key: CompositeKey<String, String> = ("cinema-1".to_string(), None);
        assert_eq!(key.0, "cinema-1");
        assert_eq!(key.1, None);
    }
}
