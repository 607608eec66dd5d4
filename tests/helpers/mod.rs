/// Test helpers and fixtures for storage integration tests
///
/// This module provides common test utilities, fixtures, and helper functions
/// used across all integration tests. The tests run against a real endpoint;
/// point them at LocalStack with `AWS_PROFILE=localstack`.
pub mod fixtures;

pub use reelstore::setup;
pub use reelstore::table::DynamoTable;
pub use serde::{Deserialize, Serialize};

// Re-export common fixtures
#[allow(unused_imports)]
pub use fixtures::{WatchlistEntry, movie};

use reelstore::catalog::{ByGenre, ByYearRating, Cinema, Movie};
use reelstore::setup::IndexSpec;
use tokio::sync::OnceCell;

/// Ensure DynamoDB client is initialized for tests
static TEST_INIT: OnceCell<()> = OnceCell::const_new();

/// Initialize DynamoDB client for tests (idempotent)
pub async fn init_test_client() {
    TEST_INIT
        .get_or_init(|| async {
            // Trigger auto-initialization
            let _ = reelstore::dynamodb_client().await;
        })
        .await;
}

/// Movies table creation gate (once per test binary)
static MOVIE_TABLE: OnceCell<()> = OnceCell::const_new();

/// Create the movies table with both indexes if it doesn't exist
///
/// Waits until the table reports ACTIVE, so index queries in the first test
/// of a binary don't race table creation. Safe to call from every test.
#[allow(dead_code)]
pub async fn ensure_movie_table() {
    MOVIE_TABLE
        .get_or_init(|| async {
            init_test_client().await;
            let indexes = vec![
                IndexSpec::of::<Movie, ByGenre>().expect("genre index spec"),
                IndexSpec::of::<Movie, ByYearRating>().expect("year/rating index spec"),
            ];
            let _ = setup::create_table_with_indexes::<Movie>(indexes)
                .await
                .expect("create movies table");
            setup::wait_for_table_active::<Movie>()
                .await
                .expect("movies table active");
        })
        .await;
}

/// Cinemas table creation gate (once per test binary)
static CINEMA_TABLE: OnceCell<()> = OnceCell::const_new();

/// Create the cinemas table if it doesn't exist
#[allow(dead_code)]
pub async fn ensure_cinema_table() {
    CINEMA_TABLE
        .get_or_init(|| async {
            init_test_client().await;
            let _ = setup::create_table::<Cinema>()
                .await
                .expect("create cinemas table");
            setup::wait_for_table_active::<Cinema>()
                .await
                .expect("cinemas table active");
        })
        .await;
}

/// Generate a unique marker for test isolation
///
/// The movies table is shared across tests, so genres, directors, and ids
/// carry a ULID suffix to keep each test's data distinguishable.
#[allow(dead_code)]
pub fn unique_marker(name: &str) -> String {
    format!("{}_{}", name, rusty_ulid::generate_ulid_string())
}

/// Wait for eventual consistency
///
/// DynamoDB scans and index queries may not immediately reflect recent
/// writes. This helper adds a small delay for eventual consistency.
#[allow(dead_code)]
pub async fn wait_for_consistency() {
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
}

/// Setup a DynamoDB table for testing
///
/// Creates the table if it doesn't exist. Safe to call multiple times.
#[allow(dead_code)]
pub async fn setup_table<T>() -> Result<(), reelstore::Error>
where
    T: DynamoTable,
    T::PK: reelstore::KeyScalar,
    T::SK: reelstore::KeyScalar,
{
    init_test_client().await;
    let _ = setup::create_table::<T>().await?;
    setup::wait_for_table_active::<T>().await
}
