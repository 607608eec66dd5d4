use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::table::{DynamoTable, GlobalIndex, SortKey};

/// A single viewer review stored inside a movie's details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Name of the reviewer
    pub reviewer: String,
    /// Free-form review text
    pub comment: String,
}

impl Review {
    /// Build a review
    pub fn new(reviewer: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            reviewer: reviewer.into(),
            comment: comment.into(),
        }
    }
}

/// Nested details document of a movie item
///
/// `awards` and `sequels` only appear once something sets them; `reviews` is
/// always materialized (empty on insert) so `list_append` updates have a list
/// to extend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetails {
    /// Director credit
    pub director: String,
    /// Running time in minutes
    pub runtime_minutes: u32,
    /// Award name to count, e.g. `{"oscars": 4}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub awards: Option<HashMap<String, u32>>,
    /// Number of sequels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequels: Option<u32>,
    /// Viewer reviews
    #[serde(default)]
    pub reviews: Vec<Review>,
}

impl MovieDetails {
    /// Build a details document with only the required fields set
    pub fn new(director: impl Into<String>, runtime_minutes: u32) -> Self {
        Self {
            director: director.into(),
            runtime_minutes,
            awards: None,
            sequels: None,
            reviews: Vec::new(),
        }
    }
}

/// A movie item, keyed by id and release year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    /// Partition key
    pub movie_id: String,
    /// Sort key; also the hash of the year/rating index
    pub release_year: u16,
    /// Display title
    pub title: String,
    /// Genre label; hash of the genre index
    pub genre: String,
    /// Aggregate rating; range of the year/rating index
    pub rating: f64,
    /// Nested details document
    pub details: MovieDetails,
}

impl Movie {
    /// Build a movie item
    pub fn new(
        movie_id: impl Into<String>,
        title: impl Into<String>,
        release_year: u16,
        genre: impl Into<String>,
        rating: f64,
        details: MovieDetails,
    ) -> Self {
        Self {
            movie_id: movie_id.into(),
            release_year,
            title: title.into(),
            genre: genre.into(),
            rating,
            details,
        }
    }
}

impl DynamoTable for Movie {
    type PK = String;
    type SK = u16;

    const TABLE: &'static str = "movies";
    const PARTITION_KEY: &'static str = "movie_id";
    const SORT_KEY: Option<&'static str> = Some("release_year");

    fn partition_key(&self) -> String {
        self.movie_id.clone()
    }

    fn sort_key(&self) -> SortKey<u16> {
        Some(self.release_year)
    }
}

/// Marker for the genre index (`genre` hash, `release_year` range)
#[derive(Debug, Clone, Copy)]
pub struct ByGenre;

impl GlobalIndex<ByGenre> for Movie {
    type IndexPK = String;
    type IndexSK = u16;

    const INDEX_NAME: &'static str = "GenreIndex";
    const INDEX_PARTITION_KEY: &'static str = "genre";
    const INDEX_SORT_KEY: Option<&'static str> = Some("release_year");

    fn index_partition_key(&self) -> String {
        self.genre.clone()
    }

    fn index_sort_key(&self) -> Option<u16> {
        Some(self.release_year)
    }
}

/// Marker for the year/rating index (`release_year` hash, `rating` range)
#[derive(Debug, Clone, Copy)]
pub struct ByYearRating;

impl GlobalIndex<ByYearRating> for Movie {
    type IndexPK = u16;
    type IndexSK = f64;

    const INDEX_NAME: &'static str = "ReleaseYearRatingIndex";
    const INDEX_PARTITION_KEY: &'static str = "release_year";
    const INDEX_SORT_KEY: Option<&'static str> = Some("rating");

    fn index_partition_key(&self) -> u16 {
        self.release_year
    }

    fn index_sort_key(&self) -> Option<f64> {
        Some(self.rating)
    }
}

/// A cinema item holding the ids of the movies it screens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cinema {
    /// Partition key
    pub cinema_id: String,
    /// Ids of movies screened at this cinema
    #[serde(default)]
    pub screenings: Vec<String>,
}

impl Cinema {
    /// Build a cinema item
    pub fn new(cinema_id: impl Into<String>, screenings: Vec<String>) -> Self {
        Self {
            cinema_id: cinema_id.into(),
            screenings,
        }
    }
}

impl DynamoTable for Cinema {
    type PK = String;
    type SK = String;

    const TABLE: &'static str = "cinemas";
    const PARTITION_KEY: &'static str = "cinema_id";

    fn partition_key(&self) -> String {
        self.cinema_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inception() -> Movie {
        Movie::new(
            "uuid-1",
            "Inception",
            2010,
            "Sci-Fi",
            8.8,
            MovieDetails::new("Christopher Nolan", 148),
        )
    }

    #[test]
    fn test_movie_composite_key() {
        let movie = inception();
        assert_eq!(movie.composite_key(), ("uuid-1".to_string(), Some(2010)));
    }

    #[test]
    fn test_genre_index_keys() {
        let movie = inception();
        assert_eq!(
            <Movie as GlobalIndex<ByGenre>>::index_partition_key(&movie),
            "Sci-Fi"
        );
        assert_eq!(
            <Movie as GlobalIndex<ByGenre>>::index_sort_key(&movie),
            Some(2010)
        );
    }

    #[test]
    fn test_year_rating_index_keys() {
        let movie = inception();
        assert_eq!(
            <Movie as GlobalIndex<ByYearRating>>::index_partition_key(&movie),
            2010
        );
        assert_eq!(
            <Movie as GlobalIndex<ByYearRating>>::index_sort_key(&movie),
            Some(8.8)
        );
    }

    #[test]
    fn test_details_optional_fields_stay_off_the_wire() {
        let details = MovieDetails::new("Wachowski", 136);
        let json = serde_json::to_value(&details).unwrap();

        assert!(json.get("awards").is_none());
        assert!(json.get("sequels").is_none());
        // reviews is always materialized so list_append has a target
        assert_eq!(json.get("reviews"), Some(&serde_json::json!([])));
    }

    #[test]
    fn test_details_deserialize_with_missing_optionals() {
        let details: MovieDetails = serde_json::from_value(serde_json::json!({
            "director": "Wachowski",
            "runtime_minutes": 136,
        }))
        .unwrap();

        assert_eq!(details.reviews, Vec::new());
        assert_eq!(details.sequels, None);
    }

    #[test]
    fn test_cinema_has_no_sort_key() {
        let cinema = Cinema::new("cinema-1", vec!["uuid-1".to_string()]);
        assert_eq!(cinema.sort_key(), None);
        assert_eq!(Cinema::SORT_KEY, None);
    }
}
