//! The ordered set of named manipulations a benchmark run measures.
//!
//! Each manipulation is addressed by a single-character code, which is also
//! the suffix of its generated file (`{image_id}{code}.jpg`). Iteration order
//! is the catalogue's canonical order: it fixes the column order of every
//! result table and breaks ties when picking the hardest manipulation.

use std::{collections::HashSet, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RobustnessError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manipulation {
    pub code: char,
    pub name: String,
}

impl Manipulation {
    pub fn new(code: char, name: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManipulationCatalogue {
    entries: Vec<Manipulation>,
}

impl ManipulationCatalogue {
    pub fn new(entries: Vec<Manipulation>) -> Result<Self> {
        if entries.is_empty() {
            return Err(RobustnessError::InvalidCatalogue(
                "catalogue must contain at least one manipulation".into(),
            ));
        }

        let mut codes = HashSet::new();
        let mut names = HashSet::new();

        for entry in &entries {
            if entry.name.trim().is_empty() {
                return Err(RobustnessError::InvalidCatalogue(format!(
                    "manipulation '{}' has an empty name",
                    entry.code
                )));
            }
            // names become CSV column headers
            if entry.name.contains(',') || entry.name.contains('"') {
                return Err(RobustnessError::InvalidCatalogue(format!(
                    "manipulation name '{}' contains a reserved character",
                    entry.name
                )));
            }
            if !codes.insert(entry.code) {
                return Err(RobustnessError::InvalidCatalogue(format!(
                    "duplicate code '{}'",
                    entry.code
                )));
            }
            if !names.insert(entry.name.as_str()) {
                return Err(RobustnessError::InvalidCatalogue(format!(
                    "duplicate name '{}'",
                    entry.name
                )));
            }
        }

        Ok(Self { entries })
    }

    /// The fourteen manipulations of the reference benchmark, codes `a`..`n`.
    pub fn reference() -> Self {
        let entries = [
            ('a', "crop_20"),
            ('b', "rotate_10"),
            ('c', "flip_h"),
            ('d', "brightness_1.3"),
            ('e', "contrast_0.7"),
            ('f', "gaussian_blur"),
            ('g', "noise_saltpepper"),
            ('h', "color_filter"),
            ('i', "watermark"),
            ('j', "canvas_expand"),
            ('k', "jpeg_compression"),
            ('l', "collage"),
            ('m', "text_obfuscation"),
            ('n', "invert_colors"),
        ]
        .into_iter()
        .map(|(code, name)| Manipulation::new(code, name))
        .collect();

        Self { entries }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: Vec<Manipulation> = serde_json::from_str(json)?;
        Self::new(entries)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Manipulation> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[Manipulation] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|m| m.name.clone()).collect()
    }

    pub fn name_for(&self, code: char) -> Option<&str> {
        self.entries
            .iter()
            .find(|m| m.code == code)
            .map(|m| m.name.as_str())
    }

    pub fn code_for(&self, name: &str) -> Option<char> {
        self.entries.iter().find(|m| m.name == name).map(|m| m.code)
    }

    pub fn position(&self, code: char) -> Option<usize> {
        self.entries.iter().position(|m| m.code == code)
    }
}

impl Default for ManipulationCatalogue {
    fn default() -> Self {
        Self::reference()
    }
}

/// File name a manipulated variant of `image_id` is stored under.
pub fn manipulated_file_name(image_id: &str, code: char, extension: &str) -> String {
    format!("{}{}.{}", image_id, code, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_catalogue_order() {
        let catalogue = ManipulationCatalogue::reference();
        assert_eq!(catalogue.len(), 14);
        assert_eq!(catalogue.entries()[0], Manipulation::new('a', "crop_20"));
        assert_eq!(catalogue.entries()[13], Manipulation::new('n', "invert_colors"));
        assert_eq!(catalogue.name_for('k'), Some("jpeg_compression"));
        assert_eq!(catalogue.code_for("collage"), Some('l'));
        assert_eq!(catalogue.name_for('z'), None);
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        assert!(ManipulationCatalogue::new(vec![]).is_err());

        let dup_code = vec![Manipulation::new('a', "x"), Manipulation::new('a', "y")];
        assert!(ManipulationCatalogue::new(dup_code).is_err());

        let dup_name = vec![Manipulation::new('a', "x"), Manipulation::new('b', "x")];
        assert!(ManipulationCatalogue::new(dup_name).is_err());

        let bad_name = vec![Manipulation::new('a', "x,y")];
        assert!(ManipulationCatalogue::new(bad_name).is_err());
    }

    #[test]
    fn test_json_round_trip_keeps_order() {
        let json = r#"[{"code":"b","name":"rotate_10"},{"code":"c","name":"flip_h"}]"#;
        let catalogue = ManipulationCatalogue::from_json_str(json).unwrap();
        assert_eq!(catalogue.names(), vec!["rotate_10", "flip_h"]);
        assert_eq!(catalogue.position('c'), Some(1));

        let again = ManipulationCatalogue::from_json_str(&catalogue.to_json().unwrap()).unwrap();
        assert_eq!(again, catalogue);
    }

    #[test]
    fn test_manipulated_file_name() {
        assert_eq!(manipulated_file_name("art_3", 'b', "jpg"), "art_3b.jpg");
    }
}
