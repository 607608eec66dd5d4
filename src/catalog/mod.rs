//! Movie catalog domain layer
//!
//! The models ([`Movie`], [`Cinema`]) and one function per catalog operation,
//! split by table: [`movies`] and [`cinemas`].

mod model;

pub mod cinemas;
pub mod movies;

pub use model::{ByGenre, ByYearRating, Cinema, Movie, MovieDetails, Review};
