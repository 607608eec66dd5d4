mod batch;
mod helpers;
mod index;
mod operations;
mod types;

pub use batch::{BatchReadOutput, BatchWriteOutput, batch_get, batch_write};
pub use index::*;
pub use operations::*;
pub use types::{CompositeKey, Cursor, KeyScalar, OutputItems, RetryConfig, SortKey};
