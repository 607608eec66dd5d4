/// Movie catalog scan and filter tests
///
/// Covers the scan-backed catalog queries: release-year and rating filters,
/// nested runtime filters, title prefixes, director lookups, review text
/// matching, counting, and id listing.
///
/// The movies table is shared between tests, so every test works with unique
/// markers and asserts membership rather than exact result sets where other
/// tests' data could leak in.
use serial_test::serial;
use std::collections::BTreeSet;

mod helpers;
use helpers::*;
use reelstore::catalog::{Review, movies};

fn ids(found: &[reelstore::catalog::Movie]) -> BTreeSet<String> {
    found.iter().map(|m| m.movie_id.clone()).collect()
}

#[tokio::test]
#[serial]
async fn test_movies_released_after() {
    ensure_movie_table().await;

    let recent_1 = unique_marker("query_year_a");
    let recent_2 = unique_marker("query_year_b");
    let old = unique_marker("query_year_old");

    // Years far outside the range other tests use
    movies::add_movie(&movie(&recent_1, "A", 2198, "Drama", 5.0, "d", 100))
        .await
        .unwrap();
    movies::add_movie(&movie(&recent_2, "B", 2201, "Drama", 5.0, "d", 100))
        .await
        .unwrap();
    movies::add_movie(&movie(&old, "C", 2190, "Drama", 5.0, "d", 100))
        .await
        .unwrap();
    wait_for_consistency().await;

    let found = movies::movies_released_after(2195).await.unwrap();
    let found_ids = ids(&found);

    assert!(found_ids.contains(&recent_1));
    assert!(found_ids.contains(&recent_2));
    assert!(!found_ids.contains(&old));
}

#[tokio::test]
#[serial]
async fn test_movies_rated_above() {
    ensure_movie_table().await;

    let high = unique_marker("query_rating_high");
    let low = unique_marker("query_rating_low");

    movies::add_movie(&movie(&high, "A", 2000, "Drama", 9.97, "d", 100))
        .await
        .unwrap();
    movies::add_movie(&movie(&low, "B", 2000, "Drama", 9.5, "d", 100))
        .await
        .unwrap();
    wait_for_consistency().await;

    let found = movies::movies_rated_above(9.93).await.unwrap();
    let found_ids = ids(&found);

    assert!(found_ids.contains(&high));
    assert!(!found_ids.contains(&low));
}

#[tokio::test]
#[serial]
async fn test_movies_longer_than() {
    ensure_movie_table().await;

    let long = unique_marker("query_runtime_long");
    let short = unique_marker("query_runtime_short");

    movies::add_movie(&movie(&long, "A", 2000, "Drama", 5.0, "d", 9500))
        .await
        .unwrap();
    movies::add_movie(&movie(&short, "B", 2000, "Drama", 5.0, "d", 90))
        .await
        .unwrap();
    wait_for_consistency().await;

    let found = movies::movies_longer_than(9000).await.unwrap();
    let found_ids = ids(&found);

    assert!(found_ids.contains(&long));
    assert!(!found_ids.contains(&short));
}

#[tokio::test]
#[serial]
async fn test_movies_running_between() {
    ensure_movie_table().await;

    let inside = unique_marker("query_range_in");
    let outside = unique_marker("query_range_out");

    movies::add_movie(&movie(&inside, "A", 2000, "Drama", 5.0, "d", 7050))
        .await
        .unwrap();
    movies::add_movie(&movie(&outside, "B", 2000, "Drama", 5.0, "d", 7200))
        .await
        .unwrap();
    wait_for_consistency().await;

    let found = movies::movies_running_between(7000, 7100).await.unwrap();
    let found_ids = ids(&found);

    assert!(found_ids.contains(&inside));
    assert!(!found_ids.contains(&outside));
}

#[tokio::test]
#[serial]
async fn test_movies_titled_like() {
    ensure_movie_table().await;

    let prefix = unique_marker("Title");
    let matching = unique_marker("query_title_match");
    let other = unique_marker("query_title_other");

    movies::add_movie(&movie(
        &matching,
        &format!("{prefix} one"),
        2000,
        "Drama",
        5.0,
        "d",
        100,
    ))
    .await
    .unwrap();
    movies::add_movie(&movie(&other, "Unrelated", 2000, "Drama", 5.0, "d", 100))
        .await
        .unwrap();
    wait_for_consistency().await;

    let found = movies::movies_titled_like(&prefix).await.unwrap();

    assert_eq!(ids(&found), BTreeSet::from([matching]));
}

#[tokio::test]
#[serial]
async fn test_movies_by_director() {
    ensure_movie_table().await;

    let director = unique_marker("Director");
    let first = unique_marker("query_director_a");
    let second = unique_marker("query_director_b");
    let other = unique_marker("query_director_other");

    movies::add_movie(&movie(&first, "A", 2000, "Drama", 5.0, &director, 100))
        .await
        .unwrap();
    movies::add_movie(&movie(&second, "B", 2001, "Drama", 5.0, &director, 100))
        .await
        .unwrap();
    movies::add_movie(&movie(&other, "C", 2002, "Drama", 5.0, "someone else", 100))
        .await
        .unwrap();
    wait_for_consistency().await;

    let found = movies::movies_by_director(&director).await.unwrap();

    assert_eq!(ids(&found), BTreeSet::from([first, second]));
}

#[tokio::test]
#[serial]
async fn test_movies_with_review_containing() {
    ensure_movie_table().await;

    let needle = unique_marker("Amazing");
    let reviewed = unique_marker("query_review_match");
    let unreviewed = unique_marker("query_review_other");

    movies::add_movie(&movie(&reviewed, "A", 2000, "Drama", 5.0, "d", 100))
        .await
        .unwrap();
    movies::add_movie(&movie(&unreviewed, "B", 2000, "Drama", 5.0, "d", 100))
        .await
        .unwrap();

    movies::add_review(&reviewed, 2000, &Review::new("Dave", format!("{needle}!")))
        .await
        .unwrap();
    wait_for_consistency().await;

    let found = movies::movies_with_review_containing(&needle).await.unwrap();

    assert_eq!(ids(&found), BTreeSet::from([reviewed]));
}

#[tokio::test]
#[serial]
async fn test_count_movies_grows() {
    ensure_movie_table().await;

    let before = movies::count_movies().await.unwrap();

    let id = unique_marker("query_count");
    movies::add_movie(&movie(&id, "A", 2000, "Drama", 5.0, "d", 100))
        .await
        .unwrap();
    wait_for_consistency().await;

    let after = movies::count_movies().await.unwrap();
    assert!(after >= before + 1, "count should include the new movie");
}

#[tokio::test]
#[serial]
async fn test_list_movie_ids_contains_inserted() {
    ensure_movie_table().await;

    let first = unique_marker("query_ids_a");
    let second = unique_marker("query_ids_b");

    movies::add_movie(&movie(&first, "A", 2000, "Drama", 5.0, "d", 100))
        .await
        .unwrap();
    movies::add_movie(&movie(&second, "B", 2001, "Drama", 5.0, "d", 100))
        .await
        .unwrap();
    wait_for_consistency().await;

    let all_ids: BTreeSet<String> = movies::list_movie_ids().await.unwrap().into_iter().collect();

    assert!(all_ids.contains(&first));
    assert!(all_ids.contains(&second));
}
