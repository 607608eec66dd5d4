//! Movie catalog operations
//!
//! One function per catalog operation, each a thin delegation to the generic
//! table layer: primary-key reads and writes, genre and year/rating index
//! lookups, filtered scans, nested detail updates, and batch maintenance.

use futures_util::TryStreamExt;
use serde_dynamo::from_item;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::catalog::model::{ByGenre, ByYearRating, Movie, MovieDetails, Review};
use crate::error::Error;
use crate::table::{
    BatchWriteOutput, CompositeKey, DynamoTable, delete_item, increment, query_index_items,
    query_index_items_above, scan_items_stream, update_item,
};
use std::collections::HashMap;

/// Page size for catalog scans and index sweeps
const SCAN_PAGE_SIZE: u16 = 100;

/// Insert a movie, replacing any existing item with the same id and year
pub async fn add_movie(movie: &Movie) -> Result<(), Error> {
    info!(
        movie_id = %movie.movie_id,
        title = %movie.title,
        "inserting movie"
    );
    let _ = movie.add_item().await?;
    Ok(())
}

/// Insert several movies through the batch writer
pub async fn add_movies(movies: Vec<Movie>) -> Result<BatchWriteOutput<Movie>, Error> {
    info!(count = movies.len(), "batch inserting movies");
    let result = Movie::batch_upsert(movies).await?;
    if !result.is_success() {
        warn!(
            failed = result.failed_puts.len(),
            "some movies were not written"
        );
    }
    Ok(result)
}

/// Fetch a movie by id and release year
pub async fn fetch_movie(movie_id: &str, release_year: u16) -> Result<Option<Movie>, Error> {
    debug!(movie_id, release_year, "fetching movie");
    Movie::get_item(&movie_id.to_string(), Some(&release_year)).await
}

/// All movies of a genre, via the genre index
pub async fn movies_by_genre(genre: &str) -> Result<Vec<Movie>, Error> {
    debug!(genre, "querying movies by genre");
    let output = query_index_items::<Movie, ByGenre>(
        &genre.to_string(),
        None,
        Some(SCAN_PAGE_SIZE),
        None,
    )
    .await?;
    Ok(output.items)
}

/// Movies of a genre released strictly after a year, via the genre index
pub async fn movies_by_genre_since(genre: &str, year: u16) -> Result<Vec<Movie>, Error> {
    debug!(genre, year, "querying movies by genre and year floor");
    let output = query_index_items_above::<Movie, ByGenre>(
        &genre.to_string(),
        &year,
        Some(SCAN_PAGE_SIZE),
        None,
    )
    .await?;
    Ok(output.items)
}

/// All movies of a release year, via the year/rating index
pub async fn movies_of_year(year: u16) -> Result<Vec<Movie>, Error> {
    debug!(year, "querying movies by release year");
    let output =
        query_index_items::<Movie, ByYearRating>(&year, None, Some(SCAN_PAGE_SIZE), None).await?;
    Ok(output.items)
}

/// Movies of a release year rated strictly above a floor, via the year/rating index
pub async fn movies_of_year_rated_above(year: u16, rating: f64) -> Result<Vec<Movie>, Error> {
    debug!(year, rating, "querying movies by year and rating floor");
    let output = query_index_items_above::<Movie, ByYearRating>(
        &year,
        &rating,
        Some(SCAN_PAGE_SIZE),
        None,
    )
    .await?;
    Ok(output.items)
}

/// Movies released strictly after a year (full-table scan with filter)
pub async fn movies_released_after(year: u16) -> Result<Vec<Movie>, Error> {
    debug!(year, "scanning for movies released after year");
    scan_filtered("release_year > :year".to_string(), json!({ ":year": year })).await
}

/// Movies rated strictly above a floor (full-table scan with filter)
pub async fn movies_rated_above(rating: f64) -> Result<Vec<Movie>, Error> {
    debug!(rating, "scanning for movies rated above floor");
    scan_filtered("rating > :floor".to_string(), json!({ ":floor": rating })).await
}

/// Movies running longer than the given minutes (scan on the nested details)
pub async fn movies_longer_than(minutes: u32) -> Result<Vec<Movie>, Error> {
    debug!(minutes, "scanning for movies longer than");
    scan_filtered(
        "details.runtime_minutes > :floor".to_string(),
        json!({ ":floor": minutes }),
    )
    .await
}

/// Movies with a running time in the inclusive `[lo, hi]` range
pub async fn movies_running_between(lo: u32, hi: u32) -> Result<Vec<Movie>, Error> {
    debug!(lo, hi, "scanning for movies by runtime range");
    scan_filtered(
        "details.runtime_minutes BETWEEN :lo AND :hi".to_string(),
        json!({ ":lo": lo, ":hi": hi }),
    )
    .await
}

/// Movies whose title starts with the given prefix
pub async fn movies_titled_like(prefix: &str) -> Result<Vec<Movie>, Error> {
    debug!(prefix, "scanning for movies by title prefix");
    scan_filtered(
        "begins_with(title, :prefix)".to_string(),
        json!({ ":prefix": prefix }),
    )
    .await
}

/// Movies by director credit (scan on the nested details)
pub async fn movies_by_director(director: &str) -> Result<Vec<Movie>, Error> {
    debug!(director, "scanning for movies by director");
    scan_filtered(
        "details.director = :director".to_string(),
        json!({ ":director": director }),
    )
    .await
}

/// Movies where any review comment contains the needle
///
/// Review text is not indexable, so this walks the whole table and matches
/// client-side.
pub async fn movies_with_review_containing(needle: &str) -> Result<Vec<Movie>, Error> {
    debug!(needle, "scanning for movies by review text");
    let movies: Vec<Movie> = scan_items_stream::<Movie>(Some(SCAN_PAGE_SIZE))
        .await
        .try_collect()
        .await?;

    Ok(movies
        .into_iter()
        .filter(|movie| {
            movie
                .details
                .reviews
                .iter()
                .any(|review| review.comment.contains(needle))
        })
        .collect())
}

/// Total number of movies in the catalog
pub async fn count_movies() -> Result<usize, Error> {
    debug!("counting movies");
    Movie::count_all_items().await
}

/// Every movie id in the catalog, streamed off a full scan
pub async fn list_movie_ids() -> Result<Vec<String>, Error> {
    debug!("listing movie ids");
    let movies: Vec<Movie> = scan_items_stream::<Movie>(Some(SCAN_PAGE_SIZE))
        .await
        .try_collect()
        .await?;
    Ok(movies.into_iter().map(|movie| movie.movie_id).collect())
}

/// Overwrite a movie's rating
pub async fn set_rating(movie_id: &str, release_year: u16, rating: f64) -> Result<(), Error> {
    info!(movie_id, release_year, rating, "updating movie rating");
    let _ = update_item::<Movie, _>(
        movie_id.to_string(),
        Some(release_year),
        json!({ "rating": rating }),
    )
    .await?;
    Ok(())
}

/// Replace a movie's details document wholesale
pub async fn set_details(
    movie_id: &str,
    release_year: u16,
    details: &MovieDetails,
) -> Result<(), Error> {
    info!(movie_id, release_year, "updating movie details");
    let _ = update_item::<Movie, _>(
        movie_id.to_string(),
        Some(release_year),
        json!({ "details": details }),
    )
    .await?;
    Ok(())
}

/// Attach an awards document under the movie's details
pub async fn set_awards(
    movie_id: &str,
    release_year: u16,
    awards: &HashMap<String, u32>,
) -> Result<(), Error> {
    info!(movie_id, release_year, "setting movie awards");
    let _ = Movie::update_with_expression(
        movie_id.to_string(),
        Some(release_year),
        "SET details.awards = :awards".to_string(),
        json!({ ":awards": awards }),
    )
    .await?;
    Ok(())
}

/// Bump the sequel counter nested in the movie's details by one
///
/// Fails on the service side if the movie has no `details.sequels` yet; set
/// it through [`set_details`] first.
pub async fn bump_sequels(movie_id: &str, release_year: u16) -> Result<(), Error> {
    info!(movie_id, release_year, "incrementing sequels");
    let _ = increment::<Movie>(
        &movie_id.to_string(),
        Some(&release_year),
        "details.sequels",
        1,
    )
    .await?;
    Ok(())
}

/// Extend the movie's running time by the given minutes
pub async fn extend_runtime(movie_id: &str, release_year: u16, minutes: u32) -> Result<(), Error> {
    info!(movie_id, release_year, minutes, "extending runtime");
    let _ = increment::<Movie>(
        &movie_id.to_string(),
        Some(&release_year),
        "details.runtime_minutes",
        u64::from(minutes),
    )
    .await?;
    Ok(())
}

/// Append several reviews to a movie's details in one write
///
/// Reads the current review list, extends it, and writes it back. The
/// single-review path ([`add_review`]) appends server-side instead.
pub async fn add_reviews(
    movie_id: &str,
    release_year: u16,
    reviews: Vec<Review>,
) -> Result<(), Error> {
    info!(
        movie_id,
        release_year,
        count = reviews.len(),
        "adding reviews"
    );

    let Some(mut movie) = fetch_movie(movie_id, release_year).await? else {
        warn!(movie_id, release_year, "movie not found, reviews dropped");
        return Ok(());
    };

    movie.details.reviews.extend(reviews);

    let _ = Movie::update_with_expression(
        movie_id.to_string(),
        Some(release_year),
        "SET details.reviews = :reviews".to_string(),
        json!({ ":reviews": movie.details.reviews }),
    )
    .await?;
    Ok(())
}

/// Append one review server-side with `list_append`
pub async fn add_review(movie_id: &str, release_year: u16, review: &Review) -> Result<(), Error> {
    info!(movie_id, release_year, "appending review");
    let _ = Movie::update_with_expression(
        movie_id.to_string(),
        Some(release_year),
        "SET details.reviews = list_append(details.reviews, :more)".to_string(),
        json!({ ":more": [review] }),
    )
    .await?;
    Ok(())
}

/// Delete a movie, returning the removed item if it existed
pub async fn remove_movie(movie_id: &str, release_year: u16) -> Result<Option<Movie>, Error> {
    info!(movie_id, release_year, "deleting movie");
    let output = delete_item::<Movie>(movie_id.to_string(), Some(release_year)).await?;

    output
        .attributes
        .map(|attributes| from_item(attributes).map_err(Into::into))
        .transpose()
}

/// Delete every movie of a genre via the genre index and the batch writer
///
/// Returns the number of movies deleted.
pub async fn purge_genre(genre: &str) -> Result<usize, Error> {
    info!(genre, "purging genre");

    let doomed = movies_by_genre(genre).await?;
    if doomed.is_empty() {
        return Ok(0);
    }

    let result = Movie::batch_delete(doomed).await?;
    if !result.is_success() {
        warn!(
            genre,
            failed = result.failed_deletes.len(),
            "some movies of the genre were not deleted"
        );
    }
    Ok(result.processed_deletes.len())
}

/// Page through a filtered scan until the cursor runs out
async fn scan_filtered(
    filter_expression: String,
    filter_values: serde_json::Value,
) -> Result<Vec<Movie>, Error> {
    let mut movies = Vec::new();
    let mut cursor: Option<CompositeKey<String, u16>> = None;

    loop {
        let page = Movie::scan_items_with_filter(
            Some(SCAN_PAGE_SIZE),
            cursor.take(),
            filter_expression.clone(),
            filter_values.clone(),
        )
        .await?;

        movies.extend(page.items);

        match page.last_evaluated_key {
            Some(key) => cursor = Some(key),
            None => return Ok(movies),
        }
    }
}
