//! The category corpus secrets are drawn from.

use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::WordBankError;

/// A named group of words. One of them becomes the round's secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub words: Vec<String>,
}

/// A validated, non-empty set of non-empty categories.
///
/// Loaded once at startup and shared read-only by every room.
#[derive(Debug, Clone)]
pub struct WordBank {
    categories: Vec<Category>,
}

const BUILT_IN: &[(&str, &[&str])] = &[
    (
        "Animals",
        &[
            "Elephant", "Penguin", "Giraffe", "Octopus", "Kangaroo", "Owl", "Dolphin", "Tiger",
            "Camel", "Hedgehog", "Flamingo", "Wolf", "Tortoise", "Bat", "Squirrel", "Shark",
        ],
    ),
    (
        "Foods",
        &[
            "Pizza", "Sushi", "Pancake", "Taco", "Curry", "Lasagne", "Dumpling", "Burger",
            "Omelette", "Risotto", "Waffle", "Salad", "Kebab", "Noodles", "Cheesecake", "Soup",
        ],
    ),
    (
        "Places",
        &[
            "Library", "Airport", "Beach", "Hospital", "Museum", "Casino", "Prison", "Farm",
            "Cinema", "Volcano", "Stadium", "Submarine", "Castle", "Desert", "Zoo", "Bakery",
        ],
    ),
    (
        "Jobs",
        &[
            "Pilot", "Chef", "Plumber", "Dentist", "Astronaut", "Teacher", "Firefighter",
            "Librarian", "Farmer", "Detective", "Barber", "Lifeguard", "Architect", "Judge",
            "Magician", "Nurse",
        ],
    ),
    (
        "Sports",
        &[
            "Football", "Tennis", "Golf", "Boxing", "Fencing", "Rowing", "Surfing", "Archery",
            "Cricket", "Skiing", "Judo", "Cycling", "Rugby", "Curling", "Climbing", "Polo",
        ],
    ),
    (
        "Instruments",
        &[
            "Piano", "Violin", "Trumpet", "Drums", "Harp", "Flute", "Banjo", "Cello",
            "Saxophone", "Accordion", "Bagpipes", "Ukulele", "Tuba", "Triangle", "Organ",
            "Clarinet",
        ],
    ),
];

impl WordBank {
    /// Validates and wraps a category list.
    pub fn new(categories: Vec<Category>) -> Result<Self, WordBankError> {
        if categories.is_empty() {
            return Err(WordBankError::Empty);
        }
        if let Some(empty) = categories.iter().find(|c| c.words.is_empty()) {
            return Err(WordBankError::EmptyCategory(empty.name.clone()));
        }
        Ok(Self { categories })
    }

    /// Parses a JSON array of `{ "name": ..., "words": [...] }` objects.
    pub fn from_json(json: &str) -> Result<Self, WordBankError> {
        let categories: Vec<Category> = serde_json::from_str(json)?;
        Self::new(categories)
    }

    /// Reads and parses a JSON corpus file.
    pub fn from_path(path: &Path) -> Result<Self, WordBankError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Draws a category uniformly, then a word uniformly from it.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> (&str, &str) {
        // Both ranges are non-empty: `new` rejects empty banks and categories.
        let category = &self.categories[rng.random_range(0..self.categories.len())];
        let word = &category.words[rng.random_range(0..category.words.len())];
        (&category.name, word)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }
}

impl Default for WordBank {
    fn default() -> Self {
        let categories = BUILT_IN
            .iter()
            .map(|(name, words)| Category {
                name: (*name).to_string(),
                words: words.iter().map(|w| (*w).to_string()).collect(),
            })
            .collect();
        Self { categories }
    }
}
