/// Movie catalog CRUD tests
///
/// Covers primary-key reads and writes on the movies table: insert, fetch,
/// rating updates, nested detail updates, counters, reviews, deletes, and the
/// cinema screening lists.
use serial_test::serial;
use std::collections::HashMap;

mod helpers;
use helpers::*;
use reelstore::catalog::{MovieDetails, Review, cinemas, movies};

#[tokio::test]
#[serial]
async fn test_add_and_fetch_movie() {
    ensure_movie_table().await;

    let id = unique_marker("crud_add");
    let inserted = movie(&id, "Inception", 2010, "Sci-Fi", 8.8, "Christopher Nolan", 148);

    movies::add_movie(&inserted).await.unwrap();

    let got = movies::fetch_movie(&id, 2010).await.unwrap().unwrap();
    assert_eq!(got, inserted, "retrieved movie should match inserted movie");
}

#[tokio::test]
#[serial]
async fn test_fetch_missing_movie_is_none() {
    ensure_movie_table().await;

    let id = unique_marker("crud_missing");
    let got = movies::fetch_movie(&id, 1984).await.unwrap();
    assert!(got.is_none());
}

#[tokio::test]
#[serial]
async fn test_set_rating() {
    ensure_movie_table().await;

    let id = unique_marker("crud_rating");
    movies::add_movie(&movie(&id, "Inception", 2010, "Sci-Fi", 8.8, "Nolan", 148))
        .await
        .unwrap();

    movies::set_rating(&id, 2010, 9.0).await.unwrap();

    let got = movies::fetch_movie(&id, 2010).await.unwrap().unwrap();
    assert_eq!(got.rating, 9.0);
    assert_eq!(got.title, "Inception", "other fields stay untouched");
}

#[tokio::test]
#[serial]
async fn test_remove_movie_returns_old_item() {
    ensure_movie_table().await;

    let id = unique_marker("crud_remove");
    movies::add_movie(&movie(&id, "The Matrix", 1999, "Action", 8.7, "Wachowski", 136))
        .await
        .unwrap();

    let removed = movies::remove_movie(&id, 1999).await.unwrap();
    assert_eq!(removed.unwrap().title, "The Matrix");

    // A second delete has nothing left to report
    let removed_again = movies::remove_movie(&id, 1999).await.unwrap();
    assert!(removed_again.is_none());

    assert!(movies::fetch_movie(&id, 1999).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn test_set_details_replaces_document() {
    ensure_movie_table().await;

    let id = unique_marker("crud_details");
    movies::add_movie(&movie(&id, "The Matrix", 1999, "Action", 8.7, "Wachowski", 136))
        .await
        .unwrap();

    let mut details = MovieDetails::new("Wachowski", 136);
    details.sequels = Some(2);

    movies::set_details(&id, 1999, &details).await.unwrap();

    let got = movies::fetch_movie(&id, 1999).await.unwrap().unwrap();
    assert_eq!(got.details, details);
}

#[tokio::test]
#[serial]
async fn test_set_awards() {
    ensure_movie_table().await;

    let id = unique_marker("crud_awards");
    movies::add_movie(&movie(&id, "Inception", 2010, "Sci-Fi", 8.8, "Nolan", 148))
        .await
        .unwrap();

    let awards = HashMap::from([("oscars".to_string(), 4u32)]);
    movies::set_awards(&id, 2010, &awards).await.unwrap();

    let got = movies::fetch_movie(&id, 2010).await.unwrap().unwrap();
    assert_eq!(got.details.awards, Some(awards));
}

#[tokio::test]
#[serial]
async fn test_bump_sequels() {
    ensure_movie_table().await;

    let id = unique_marker("crud_sequels");
    movies::add_movie(&movie(&id, "The Matrix", 1999, "Action", 8.7, "Wachowski", 136))
        .await
        .unwrap();

    let mut details = MovieDetails::new("Wachowski", 136);
    details.sequels = Some(2);
    movies::set_details(&id, 1999, &details).await.unwrap();

    movies::bump_sequels(&id, 1999).await.unwrap();

    let got = movies::fetch_movie(&id, 1999).await.unwrap().unwrap();
    assert_eq!(got.details.sequels, Some(3));
}

#[tokio::test]
#[serial]
async fn test_extend_runtime() {
    ensure_movie_table().await;

    let id = unique_marker("crud_runtime");
    movies::add_movie(&movie(&id, "Inception", 2010, "Sci-Fi", 8.8, "Nolan", 148))
        .await
        .unwrap();

    movies::extend_runtime(&id, 2010, 10).await.unwrap();

    let got = movies::fetch_movie(&id, 2010).await.unwrap().unwrap();
    assert_eq!(got.details.runtime_minutes, 158);
}

#[tokio::test]
#[serial]
async fn test_add_reviews_then_single_review() {
    ensure_movie_table().await;

    let id = unique_marker("crud_reviews");
    movies::add_movie(&movie(&id, "Inception", 2010, "Sci-Fi", 8.8, "Nolan", 148))
        .await
        .unwrap();

    movies::add_reviews(
        &id,
        2010,
        vec![
            Review::new("Alice", "Great movie!"),
            Review::new("Bob", "Loved it!"),
        ],
    )
    .await
    .unwrap();

    // list_append lands on the list written above
    movies::add_review(&id, 2010, &Review::new("Charlie", "Amazing"))
        .await
        .unwrap();

    let got = movies::fetch_movie(&id, 2010).await.unwrap().unwrap();
    assert_eq!(got.details.reviews.len(), 3);
    assert_eq!(got.details.reviews[2].reviewer, "Charlie");
}

#[tokio::test]
#[serial]
async fn test_add_reviews_on_missing_movie_is_noop() {
    ensure_movie_table().await;

    let id = unique_marker("crud_reviews_missing");
    let result = movies::add_reviews(&id, 2010, vec![Review::new("Alice", "ghost")]).await;
    assert!(result.is_ok());

    assert!(movies::fetch_movie(&id, 2010).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn test_cinema_screenings_roundtrip() {
    ensure_cinema_table().await;

    let cinema_id = unique_marker("cinema");
    let screenings = vec!["uuid-1".to_string(), "uuid-3".to_string()];

    // The update creates the cinema item on first write
    cinemas::set_screenings(&cinema_id, screenings.clone())
        .await
        .unwrap();

    let got = cinemas::fetch_cinema(&cinema_id).await.unwrap().unwrap();
    assert_eq!(got.cinema_id, cinema_id);
    assert_eq!(got.screenings, screenings);

    // Overwrite with a different list
    cinemas::set_screenings(&cinema_id, vec!["uuid-9".to_string()])
        .await
        .unwrap();

    let got = cinemas::fetch_cinema(&cinema_id).await.unwrap().unwrap();
    assert_eq!(got.screenings, vec!["uuid-9".to_string()]);
}
