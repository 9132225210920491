//! Movie metadata returned by the collection endpoint of the movie API.

use serde::{Deserialize, Serialize};

/// Image CDN prefix for `w500` poster renditions.
pub const POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub poster_path: Option<String>,
}

impl Movie {
    /// Absolute poster URL, or `None` when the movie has no poster.
    pub fn poster_url(&self) -> Option<String> {
        let path = self.poster_path.as_deref()?.trim();
        if path.is_empty() {
            return None;
        }
        if path.starts_with('/') {
            Some(format!("{POSTER_BASE_URL}{path}"))
        } else {
            Some(format!("{POSTER_BASE_URL}/{path}"))
        }
    }
}

/// A named collection of related movies (`parts` keeps API order).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieCollection {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parts: Vec<Movie>,
}
