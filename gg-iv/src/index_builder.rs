//! Image index builder
//!
//! Scans the generated-images directory, tokenizes cleaned basenames, tags
//! coarse categories from filename patterns, and writes the
//! `image-index.json` snapshot the verifier consumes.

use crate::index::ImageIndexEntry;
use crate::ontology::Ontology;
use gg_common::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Filename substrings tagging a meal category
const CATEGORY_FILENAME_PATTERNS: &[(&str, &[&str])] = &[
    ("breakfast", &["breakfast", "morning"]),
    ("lunch", &["lunch", "salad", "wrap"]),
    ("dinner", &["dinner", "stir", "curry"]),
    ("snack", &["snack", "bites", "energy"]),
    ("dessert", &["dessert", "ice_cream", "mousse"]),
    ("beverage", &["smoothie", "juice", "drink"]),
];

/// Token groups tagging a food type
const FOOD_TYPE_TOKENS: &[(&str, &[&str])] = &[
    ("pizza", &["pizza", "flatbread"]),
    ("bowl", &["bowl", "buddha", "grain"]),
    ("soup", &["soup", "broth", "stew"]),
    ("salad", &["salad", "greens", "lettuce"]),
];

/// Builds the searchable asset index
pub struct IndexBuilder {
    image_dir: PathBuf,
    ontology: Ontology,
}

impl IndexBuilder {
    /// Create a builder over the given asset directory
    pub fn new(image_dir: PathBuf, ontology: Ontology) -> Self {
        Self { image_dir, ontology }
    }

    /// Scan the asset directory and build index entries
    ///
    /// The scan is flat (generated assets live in one directory); entries
    /// come back sorted by filename for reproducible output.
    pub fn build(&self) -> Result<Vec<ImageIndexEntry>> {
        if !self.image_dir.is_dir() {
            return Err(Error::Config(format!(
                "Image directory not found: {}",
                self.image_dir.display()
            )));
        }

        info!(dir = %self.image_dir.display(), "Scanning image assets");

        let mut entries = Vec::new();
        for dir_entry in WalkDir::new(&self.image_dir).max_depth(1) {
            let dir_entry = match dir_entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Error accessing entry: {}", e);
                    continue;
                }
            };
            if !dir_entry.file_type().is_file() {
                continue;
            }

            let filename = dir_entry.file_name().to_string_lossy().to_string();
            if !is_image_file(&filename) {
                continue;
            }

            let tokens: Vec<String> = self.ontology.filename_tokens(&filename).into_iter().collect();
            let categories = detect_categories(&filename, &tokens);

            entries.push(ImageIndexEntry {
                full_path: format!("/{}/{}", self.image_dir.display(), filename),
                filename,
                tokens,
                categories,
            });
        }

        entries.sort_by(|a, b| a.filename.cmp(&b.filename));
        info!(images = entries.len(), "Indexed image assets");

        Ok(entries)
    }

    /// Persist the index as pretty-printed JSON
    pub fn save(&self, entries: &[ImageIndexEntry], output_path: &Path) -> Result<()> {
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(output_path, serde_json::to_string_pretty(entries)?)?;
        info!(path = %output_path.display(), "Image index saved");
        Ok(())
    }
}

fn is_image_file(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{}", ext)))
}

/// Tag categories from filename patterns and food-type tokens
fn detect_categories(filename: &str, tokens: &[String]) -> Vec<String> {
    let lower = filename.to_lowercase();
    let mut categories = Vec::new();

    for (category, patterns) in CATEGORY_FILENAME_PATTERNS {
        if patterns.iter().any(|p| lower.contains(p)) {
            categories.push(category.to_string());
        }
    }

    for (food_type, matches) in FOOD_TYPE_TOKENS {
        if tokens.iter().any(|t| matches.contains(&t.as_str())) {
            categories.push(food_type.to_string());
        }
    }

    if categories.is_empty() {
        categories.push("general".to_string());
    }
    categories
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ImageIndex;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"png").unwrap();
    }

    #[test]
    fn test_build_indexes_only_images() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "Trinidad_Callaloo_Soup_c703225f.png");
        touch(dir.path(), "Green_Smoothie.JPG");
        touch(dir.path(), "notes.txt");

        let builder = IndexBuilder::new(dir.path().to_path_buf(), Ontology::default());
        let entries = builder.build().unwrap();

        assert_eq!(entries.len(), 2);
        // Sorted by filename
        assert_eq!(entries[0].filename, "Green_Smoothie.JPG");
        assert_eq!(entries[1].filename, "Trinidad_Callaloo_Soup_c703225f.png");
    }

    #[test]
    fn test_tokens_and_categories() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "Mango_Ginger_Smoothie_abc12345.png");

        let builder = IndexBuilder::new(dir.path().to_path_buf(), Ontology::default());
        let entries = builder.build().unwrap();

        let entry = &entries[0];
        assert!(entry.tokens.contains(&"mango".to_string()));
        assert!(entry.tokens.contains(&"smoothie".to_string()));
        assert!(entry.categories.contains(&"beverage".to_string()));
    }

    #[test]
    fn test_unmatched_files_tagged_general() {
        assert_eq!(
            detect_categories("Mystery_Dish.png", &["mystery".to_string(), "dish".to_string()]),
            vec!["general".to_string()]
        );
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let builder = IndexBuilder::new(PathBuf::from("/nonexistent/images"), Ontology::default());
        assert!(builder.build().is_err());
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "Quinoa_Bowl.png");

        let builder = IndexBuilder::new(dir.path().to_path_buf(), Ontology::default());
        let entries = builder.build().unwrap();
        let index_path = dir.path().join("image-index.json");
        builder.save(&entries, &index_path).unwrap();

        let index = ImageIndex::load(&index_path).unwrap();
        assert_eq!(index.len(), 1);
    }
}
