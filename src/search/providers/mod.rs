pub mod place_search;

pub use place_search::PlaceSearchProvider;
