//! The category catalogue rounds are drawn from.

use rand::seq::IndexedRandom;

/// Every category a round may be asked about.
pub const GENRES: &[&str] = &[
    "Pop",
    "Rock",
    "Hip-Hop",
    "Jazz",
    "Classical",
    "Blues",
    "R&B",
    "Soul",
    "Country",
    "Electronic",
    "Reggae",
    "Funk",
    "Disco",
    "Folk",
    "Metal",
    "Punk",
    "Alternative",
    "Indie Rock",
    "K-Pop",
];

/// Picks a category uniformly at random.
pub fn random_genre() -> &'static str {
    GENRES.choose(&mut rand::rng()).copied().unwrap_or("Pop")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_genre_comes_from_catalogue() {
        for _ in 0..50 {
            assert!(GENRES.contains(&random_genre()));
        }
    }

    #[test]
    fn test_genres_are_unique() {
        let mut sorted = GENRES.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), GENRES.len());
    }
}
