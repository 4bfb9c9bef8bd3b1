//! Word dictionary and per-session word assignment.
//!
//! The dictionary maps a category name to candidate pairs of related words.
//! It is supplied by the host program; the engine never reads files. Entries
//! are validated lazily: a malformed pair is only reported when it is drawn.

use std::collections::BTreeMap;

use rand::Rng;
use serde::Deserialize;
use thiserror::Error;

use crate::player::Role;

/// Category → candidate word pairs.
///
/// JSON form: `{ "fruit": [["apple", "pear"], ["lemon", "lime"]] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct WordBank {
    categories: BTreeMap<String, Vec<Vec<String>>>,
}

impl WordBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a dictionary from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Add (or replace) a category built from in-memory pairs.
    pub fn insert_category<I, A, B>(&mut self, name: impl Into<String>, pairs: I)
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        let pairs = pairs
            .into_iter()
            .map(|(a, b)| vec![a.into(), b.into()])
            .collect();
        self.categories.insert(name.into(), pairs);
    }

    /// Category names in sorted order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn contains(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Number of candidate pairs in `category`, well-formed or not.
    pub fn pair_count(&self, category: &str) -> Option<usize> {
        self.categories.get(category).map(Vec::len)
    }

    fn candidates(&self, category: &str) -> Option<&[Vec<String>]> {
        self.categories.get(category).map(Vec::as_slice)
    }
}

/// The two secret words of a started session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordPair {
    civilian: String,
    spy: String,
}

impl WordPair {
    pub fn civilian(&self) -> &str {
        &self.civilian
    }

    pub fn spy(&self) -> &str {
        &self.spy
    }

    /// The word held by players of `role`.
    pub fn word_for(&self, role: Role) -> &str {
        match role {
            Role::Civilian => &self.civilian,
            Role::Spy => &self.spy,
        }
    }
}

/// Rejected change of the selected category.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryError {
    #[error("unknown word category `{0}`")]
    UnknownCategory(String),
}

/// Dictionary problems found while drawing words for a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WordError {
    #[error("unknown word category `{0}`")]
    UnknownCategory(String),
    #[error("word category `{0}` has no pairs")]
    EmptyCategory(String),
    #[error("pair #{index} of category `{category}` must hold two distinct non-empty words")]
    MalformedPair { category: String, index: usize },
}

/// Draws word pairs from a [`WordBank`] for the currently selected category.
///
/// The selected category is process-wide state owned by whoever hosts the
/// sessions; individual sessions may override it at start.
#[derive(Debug, Clone)]
pub struct WordAssigner {
    bank: WordBank,
    category: String,
}

impl WordAssigner {
    /// Create an assigner whose default category must exist in `bank`.
    pub fn new(bank: WordBank, category: impl Into<String>) -> Result<Self, CategoryError> {
        let category = category.into();
        if !bank.contains(&category) {
            return Err(CategoryError::UnknownCategory(category));
        }
        Ok(Self { bank, category })
    }

    pub fn bank(&self) -> &WordBank {
        &self.bank
    }

    /// The process-wide default category.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Switch the default category. Unknown names leave the selection unchanged.
    pub fn change_category(&mut self, category: &str) -> Result<(), CategoryError> {
        if !self.bank.contains(category) {
            return Err(CategoryError::UnknownCategory(category.to_string()));
        }
        self.category = category.to_string();
        Ok(())
    }

    /// Draw a pair from `category` (or the default), then split it between
    /// the sides with equal probability.
    pub fn assign<R>(&self, category: Option<&str>, rng: &mut R) -> Result<WordPair, WordError>
    where
        R: Rng + ?Sized,
    {
        let category = category.unwrap_or(&self.category);
        let candidates = self
            .bank
            .candidates(category)
            .ok_or_else(|| WordError::UnknownCategory(category.to_string()))?;
        if candidates.is_empty() {
            return Err(WordError::EmptyCategory(category.to_string()));
        }

        let index = rng.random_range(0..candidates.len());
        let malformed = || WordError::MalformedPair {
            category: category.to_string(),
            index,
        };
        let [first, second] = candidates[index].as_slice() else {
            return Err(malformed());
        };
        if first.trim().is_empty() || second.trim().is_empty() || first == second {
            return Err(malformed());
        }

        let (civilian, spy) = if rng.random_bool(0.5) {
            (first.clone(), second.clone())
        } else {
            (second.clone(), first.clone())
        };
        Ok(WordPair { civilian, spy })
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn fruit_bank() -> WordBank {
        let mut bank = WordBank::new();
        bank.insert_category("fruit", [("apple", "pear"), ("lemon", "lime")]);
        bank.insert_category("animals", [("cat", "tiger")]);
        bank
    }

    #[test]
    fn test_from_json() {
        let bank = WordBank::from_json(r#"{"default": [["milk", "soy milk"]], "b": []}"#).unwrap();
        assert!(bank.contains("default"));
        assert_eq!(bank.categories().collect::<Vec<_>>(), vec!["b", "default"]);
    }

    #[test]
    fn test_from_json_rejects_non_map() {
        assert!(WordBank::from_json("[1, 2, 3]").is_err());
    }

    #[test]
    fn test_new_requires_known_category() {
        let err = WordAssigner::new(fruit_bank(), "cars").unwrap_err();
        assert_eq!(err, CategoryError::UnknownCategory("cars".to_string()));
    }

    #[test]
    fn test_change_category() {
        let mut assigner = WordAssigner::new(fruit_bank(), "fruit").unwrap();
        assert!(assigner.change_category("cars").is_err());
        assert_eq!(assigner.category(), "fruit");
        assigner.change_category("animals").unwrap();
        assert_eq!(assigner.category(), "animals");
    }

    #[test]
    fn test_assign_draws_from_selected_category() {
        let assigner = WordAssigner::new(fruit_bank(), "animals").unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let words = assigner.assign(None, &mut rng).unwrap();
        let mut drawn = [words.civilian(), words.spy()];
        drawn.sort_unstable();
        assert_eq!(drawn, ["cat", "tiger"]);
    }

    #[test]
    fn test_assign_override_category() {
        let assigner = WordAssigner::new(fruit_bank(), "animals").unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let words = assigner.assign(Some("fruit"), &mut rng).unwrap();
        assert!(["apple", "pear", "lemon", "lime"].contains(&words.civilian()));
        assert_ne!(words.civilian(), words.spy());
    }

    #[test]
    fn test_assign_splits_both_ways() {
        let assigner = WordAssigner::new(fruit_bank(), "animals").unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let mut cat_is_civilian = 0;
        for _ in 0..400 {
            if assigner.assign(None, &mut rng).unwrap().civilian() == "cat" {
                cat_is_civilian += 1;
            }
        }
        assert!((120..=280).contains(&cat_is_civilian), "{cat_is_civilian}");
    }

    #[test]
    fn test_malformed_entries_surface_at_assignment() {
        let bank = WordBank::from_json(
            r#"{"same": [["x", "x"]], "blank": [["x", " "]], "one": [["x"]], "none": []}"#,
        )
        .unwrap();
        let assigner = WordAssigner::new(bank, "same").unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        for category in ["same", "blank", "one"] {
            assert_eq!(
                assigner.assign(Some(category), &mut rng),
                Err(WordError::MalformedPair {
                    category: category.to_string(),
                    index: 0,
                })
            );
        }
        assert_eq!(
            assigner.assign(Some("none"), &mut rng),
            Err(WordError::EmptyCategory("none".to_string()))
        );
        assert_eq!(
            assigner.assign(Some("cars"), &mut rng),
            Err(WordError::UnknownCategory("cars".to_string()))
        );
    }
}
