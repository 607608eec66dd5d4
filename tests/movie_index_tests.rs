/// Movie catalog secondary index tests
///
/// Covers the genre index (string hash, numeric range) and the year/rating
/// index (numeric hash, float range), plus the query-and-batch-delete path
/// behind genre purges.
use serial_test::serial;
use std::collections::BTreeSet;

mod helpers;
use helpers::*;
use reelstore::catalog::{ByGenre, Movie, movies};
use reelstore::table::{count_index_items, query_index_item, reverse_query_index_items};

fn ids(found: &[Movie]) -> BTreeSet<String> {
    found.iter().map(|m| m.movie_id.clone()).collect()
}

#[tokio::test]
#[serial]
async fn test_movies_by_genre() {
    ensure_movie_table().await;

    let genre = unique_marker("Genre");
    let first = unique_marker("index_genre_a");
    let second = unique_marker("index_genre_b");
    let other = unique_marker("index_genre_other");

    movies::add_movie(&movie(&first, "A", 2010, &genre, 8.0, "d", 100))
        .await
        .unwrap();
    movies::add_movie(&movie(&second, "B", 2014, &genre, 8.5, "d", 100))
        .await
        .unwrap();
    movies::add_movie(&movie(&other, "C", 2010, "SomethingElse", 8.0, "d", 100))
        .await
        .unwrap();
    wait_for_consistency().await;

    let found = movies::movies_by_genre(&genre).await.unwrap();

    assert_eq!(ids(&found), BTreeSet::from([first.clone(), second.clone()]));

    // Index range key is the release year, ascending
    assert_eq!(found[0].movie_id, first);
    assert_eq!(found[1].movie_id, second);
}

#[tokio::test]
#[serial]
async fn test_movies_by_genre_since() {
    ensure_movie_table().await;

    let genre = unique_marker("Genre");
    let newer = unique_marker("index_since_new");
    let older = unique_marker("index_since_old");

    movies::add_movie(&movie(&newer, "A", 2014, &genre, 8.0, "d", 100))
        .await
        .unwrap();
    movies::add_movie(&movie(&older, "B", 1999, &genre, 8.0, "d", 100))
        .await
        .unwrap();
    wait_for_consistency().await;

    let found = movies::movies_by_genre_since(&genre, 2000).await.unwrap();

    assert_eq!(ids(&found), BTreeSet::from([newer]));
}

#[tokio::test]
#[serial]
async fn test_movies_of_year() {
    ensure_movie_table().await;

    // A year no other test writes to
    let year = 2347;
    let first = unique_marker("index_year_a");
    let second = unique_marker("index_year_b");

    movies::add_movie(&movie(&first, "A", year, "Drama", 7.0, "d", 100))
        .await
        .unwrap();
    movies::add_movie(&movie(&second, "B", year, "Drama", 9.1, "d", 100))
        .await
        .unwrap();
    wait_for_consistency().await;

    let found = movies::movies_of_year(year).await.unwrap();

    assert_eq!(ids(&found), BTreeSet::from([first.clone(), second.clone()]));

    // Index range key is the rating, ascending
    assert_eq!(found[0].movie_id, first);
    assert_eq!(found[1].movie_id, second);
}

#[tokio::test]
#[serial]
async fn test_movies_of_year_rated_above() {
    ensure_movie_table().await;

    let year = 2351;
    let high = unique_marker("index_rated_high");
    let low = unique_marker("index_rated_low");

    movies::add_movie(&movie(&high, "A", year, "Drama", 9.2, "d", 100))
        .await
        .unwrap();
    movies::add_movie(&movie(&low, "B", year, "Drama", 7.9, "d", 100))
        .await
        .unwrap();
    wait_for_consistency().await;

    let found = movies::movies_of_year_rated_above(year, 8.5).await.unwrap();

    assert_eq!(ids(&found), BTreeSet::from([high]));
}

#[tokio::test]
#[serial]
async fn test_reverse_genre_query_orders_by_year_descending() {
    ensure_movie_table().await;

    let genre = unique_marker("Genre");
    for (suffix, year) in [("a", 1999u16), ("b", 2005), ("c", 2012)] {
        let id = unique_marker(&format!("index_reverse_{suffix}"));
        movies::add_movie(&movie(&id, "A", year, &genre, 5.0, "d", 100))
            .await
            .unwrap();
    }
    wait_for_consistency().await;

    let found = reverse_query_index_items::<Movie, ByGenre>(&genre, None, Some(10), None)
        .await
        .unwrap();

    assert_eq!(found.items.len(), 3);
    assert!(found.items[0].release_year > found.items[1].release_year);
    assert!(found.items[1].release_year > found.items[2].release_year);
}

#[tokio::test]
#[serial]
async fn test_query_single_item_from_index() {
    ensure_movie_table().await;

    let genre = unique_marker("Genre");
    let id = unique_marker("index_single");

    movies::add_movie(&movie(&id, "Only One", 2010, &genre, 5.0, "d", 100))
        .await
        .unwrap();
    wait_for_consistency().await;

    let found = query_index_item::<Movie, ByGenre>(&genre, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.movie_id, id);

    let missing_genre = unique_marker("GenreMissing");
    let missing = query_index_item::<Movie, ByGenre>(&missing_genre, None)
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
#[serial]
async fn test_purge_genre() {
    ensure_movie_table().await;

    let genre = unique_marker("Genre");
    let keep_genre = unique_marker("Genre");
    let doomed_a = unique_marker("index_purge_a");
    let doomed_b = unique_marker("index_purge_b");
    let survivor = unique_marker("index_purge_keep");

    movies::add_movie(&movie(&doomed_a, "A", 2000, &genre, 5.0, "d", 100))
        .await
        .unwrap();
    movies::add_movie(&movie(&doomed_b, "B", 2001, &genre, 5.0, "d", 100))
        .await
        .unwrap();
    movies::add_movie(&movie(&survivor, "C", 2000, &keep_genre, 5.0, "d", 100))
        .await
        .unwrap();
    wait_for_consistency().await;

    let purged = movies::purge_genre(&genre).await.unwrap();
    assert_eq!(purged, 2);

    wait_for_consistency().await;

    assert!(movies::movies_by_genre(&genre).await.unwrap().is_empty());
    assert!(movies::fetch_movie(&doomed_a, 2000).await.unwrap().is_none());
    assert!(movies::fetch_movie(&survivor, 2000).await.unwrap().is_some());
}

#[tokio::test]
#[serial]
async fn test_purge_empty_genre_is_zero() {
    ensure_movie_table().await;

    let genre = unique_marker("GenreEmpty");
    let purged = movies::purge_genre(&genre).await.unwrap();
    assert_eq!(purged, 0);
}

#[tokio::test]
#[serial]
async fn test_count_index_items_by_genre() {
    ensure_movie_table().await;

    let genre = unique_marker("Genre");
    for (index, id_name) in ["index_count_a", "index_count_b", "index_count_c"]
        .iter()
        .enumerate()
    {
        let id = unique_marker(id_name);
        movies::add_movie(&movie(&id, "A", 2000 + index as u16, &genre, 5.0, "d", 100))
            .await
            .unwrap();
    }
    wait_for_consistency().await;

    let count = count_index_items::<Movie, ByGenre>(&genre).await.unwrap();
    assert_eq!(count, 3);
}
