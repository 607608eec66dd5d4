//! Cinema operations
//!
//! Cinemas are flat items holding the ids of the movies they screen.

use serde_json::json;
use tracing::{debug, info};

use crate::catalog::model::Cinema;
use crate::error::Error;
use crate::table::{DynamoTable, update_item};

/// Set the list of movie ids screened at a cinema
///
/// The update creates the cinema item when it does not exist yet, so no
/// separate insert step is needed.
pub async fn set_screenings(cinema_id: &str, movie_ids: Vec<String>) -> Result<(), Error> {
    info!(cinema_id, count = movie_ids.len(), "setting screenings");
    let _ = update_item::<Cinema, _>(
        cinema_id.to_string(),
        None,
        json!({ "screenings": movie_ids }),
    )
    .await?;
    Ok(())
}

/// Fetch a cinema by id
pub async fn fetch_cinema(cinema_id: &str) -> Result<Option<Cinema>, Error> {
    debug!(cinema_id, "fetching cinema");
    Cinema::get_item(&cinema_id.to_string(), None).await
}
