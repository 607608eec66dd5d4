/// Common test fixtures and data structures
///
/// Defines the reusable models used by the generic table tests, plus a
/// shorthand constructor for movie items.
use super::{Deserialize, DynamoTable, Serialize};
use reelstore::catalog::{Movie, MovieDetails};
use reelstore::table::SortKey;

/// Generic string-keyed fixture with partition and sort key
///
/// Used by the table-layer tests, which need a sort key that supports
/// `begins_with` and lexicographic BETWEEN.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct WatchlistEntry {
    pub list_id: String,
    pub added_at: String,
    pub note: String,
    pub priority: u64,
}

impl DynamoTable for WatchlistEntry {
    type PK = String;
    type SK = String;
    const TABLE: &'static str = "tests_watchlist_entries";
    const PARTITION_KEY: &'static str = "list_id";
    const SORT_KEY: Option<&'static str> = Some("added_at");

    fn partition_key(&self) -> String {
        self.list_id.clone()
    }

    fn sort_key(&self) -> SortKey<String> {
        Some(self.added_at.clone())
    }
}

/// Shorthand movie constructor for tests
#[allow(dead_code)]
pub fn movie(
    id: &str,
    title: &str,
    year: u16,
    genre: &str,
    rating: f64,
    director: &str,
    runtime: u32,
) -> Movie {
    Movie::new(
        id,
        title,
        year,
        genre,
        rating,
        MovieDetails::new(director, runtime),
    )
}
