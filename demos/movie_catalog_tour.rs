//! End-to-end tour of the movie catalog.
//!
//! Rebuilds the movies and cinemas tables, then runs every catalog operation
//! in sequence against them: inserts, index lookups, filtered scans, nested
//! detail updates, batch deletes, and finally the cinema screening lists and
//! an optional poster upload.
//!
//! Each step is reported individually; a failing step is logged and the tour
//! moves on, so a partially-provisioned environment still shows which
//! operations work. Point it at LocalStack with `AWS_PROFILE=localstack`.
//!
//! Set `POSTER_BUCKET` to an existing bucket to also exercise the S3 upload.

use std::collections::HashMap;

use reelstore::Error;
use reelstore::catalog::{ByGenre, ByYearRating, Movie, MovieDetails, Review, cinemas, movies};
use reelstore::setup::{self, IndexSpec};
use tracing::{error, info};

/// Log a step outcome and keep whatever it produced
fn report<T>(name: &str, outcome: Result<T, Error>) -> Option<T> {
    match outcome {
        Ok(value) => {
            info!("{name}: ok");
            Some(value)
        }
        Err(e) => {
            error!("{name}: {e}");
            None
        }
    }
}

fn placeholder_poster() -> &'static str {
    "https://via.placeholder.com/300x300"
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("rebuilding tables");
    setup::rebuild_table::<Movie>(vec![
        IndexSpec::of::<Movie, ByGenre>()?,
        IndexSpec::of::<Movie, ByYearRating>()?,
    ])
    .await?;
    setup::rebuild_table::<reelstore::catalog::Cinema>(Vec::new()).await?;

    let inception = Movie::new(
        "uuid-1",
        "Inception",
        2010,
        "Sci-Fi",
        8.8,
        MovieDetails::new("Christopher Nolan", 148),
    );
    let _ = report("insert Inception", movies::add_movie(&inception).await);

    let batch = vec![
        Movie::new(
            "uuid-2",
            "The Matrix",
            1999,
            "Action",
            8.7,
            MovieDetails::new("Wachowski", 136),
        ),
        Movie::new(
            "uuid-3",
            "Interstellar",
            2014,
            "Sci-Fi",
            8.6,
            MovieDetails::new("Christopher Nolan", 169),
        ),
    ];
    let _ = report("batch insert", movies::add_movies(batch).await);

    if let Some(found) = report("fetch Inception", movies::fetch_movie("uuid-1", 2010).await) {
        info!(?found, "fetched");
    }

    if let Some(sci_fi) = report("sci-fi movies", movies::movies_by_genre("Sci-Fi").await) {
        info!(count = sci_fi.len(), "sci-fi catalog");
    }

    let _ = report(
        "released after 2000",
        movies::movies_released_after(2000).await,
    );
    let _ = report("rated above 8.5", movies::movies_rated_above(8.5).await);

    let _ = report(
        "raise Inception rating",
        movies::set_rating("uuid-1", 2010, 9.0).await,
    );

    match report("delete The Matrix", movies::remove_movie("uuid-2", 1999).await) {
        Some(Some(old)) => info!(title = %old.title, "deleted"),
        Some(None) => info!("nothing to delete"),
        None => {}
    }

    let awards = HashMap::from([("oscars".to_string(), 4u32)]);
    let _ = report(
        "award Inception",
        movies::set_awards("uuid-1", 2010, &awards).await,
    );

    let _ = report("longer than 150 min", movies::movies_longer_than(150).await);

    if let Some(total) = report("count movies", movies::count_movies().await) {
        info!(total, "movies in catalog");
    }

    let _ = report(
        "sci-fi since 2000",
        movies::movies_by_genre_since("Sci-Fi", 2000).await,
    );
    let _ = report("titles starting with I", movies::movies_titled_like("I").await);
    let _ = report("movies of 2014", movies::movies_of_year(2014).await);
    let _ = report(
        "movies of 2014 above 8.5",
        movies::movies_of_year_rated_above(2014, 8.5).await,
    );

    // An update on the deleted key recreates The Matrix as a partial item
    // holding only the key attributes and the details document.
    let mut matrix_details = MovieDetails::new("Wachowski", 136);
    matrix_details.sequels = Some(2);
    let _ = report(
        "rewrite Matrix details",
        movies::set_details("uuid-2", 1999, &matrix_details).await,
    );
    let _ = report(
        "bump Matrix sequels",
        movies::bump_sequels("uuid-2", 1999).await,
    );

    if let Some(purged) = report("purge Action", movies::purge_genre("Action").await) {
        info!(purged, "action movies removed");
    }

    let _ = report(
        "by Christopher Nolan",
        movies::movies_by_director("Christopher Nolan").await,
    );
    let _ = report(
        "running 120-180 min",
        movies::movies_running_between(120, 180).await,
    );

    let reviews = vec![
        Review::new("Alice", "Great movie!"),
        Review::new("Bob", "Loved it!"),
    ];
    let _ = report(
        "add reviews",
        movies::add_reviews("uuid-1", 2010, reviews).await,
    );
    let _ = report(
        "add Charlie's review",
        movies::add_review("uuid-1", 2010, &Review::new("Charlie", "Amazing")).await,
    );
    let _ = report(
        "add Dave's review",
        movies::add_review("uuid-1", 2010, &Review::new("Dave", "Amazing!")).await,
    );

    if let Some(amazing) = report(
        "reviews containing Amazing",
        movies::movies_with_review_containing("Amazing").await,
    ) {
        info!(count = amazing.len(), "movies with amazing reviews");
    }

    let _ = report(
        "extend Inception runtime",
        movies::extend_runtime("uuid-1", 2010, 10).await,
    );

    if let Some(all_ids) = report("list movie ids", movies::list_movie_ids().await) {
        let _ = report(
            "screenings at cinema-1",
            cinemas::set_screenings("cinema-1", all_ids).await,
        );
    }
    let _ = report(
        "screenings at cinema-2",
        cinemas::set_screenings(
            "cinema-2",
            vec!["uuid-1".to_string(), "uuid-3".to_string()],
        )
        .await,
    );

    // Poster upload only runs when a bucket is provided; buckets are not
    // provisioned by this tour.
    match std::env::var("POSTER_BUCKET") {
        Ok(bucket) => {
            let _ = report(
                "upload placeholder poster",
                reelstore::media::upload_from_url(
                    placeholder_poster(),
                    &bucket,
                    "placeholder_image_300x300.png",
                )
                .await,
            );
        }
        Err(_) => info!("POSTER_BUCKET not set, skipping poster upload"),
    }

    info!("tour finished");
    Ok(())
}
