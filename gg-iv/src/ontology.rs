//! Recipe/image ontology and tokenizer
//!
//! Normalizes recipe text and image filenames into comparable token sets
//! and carries the vocabulary the match scorer consults: ingredient
//! synonyms, per-category keywords and forbidden terms, fallback patterns,
//! and the beverage form-factor vocabulary.
//!
//! All vocabulary is immutable configuration injected at construction, so
//! tests can substitute fixtures without process-wide side effects. The
//! `Default` impl carries the production tables.

use std::collections::{BTreeMap, BTreeSet};

/// Vocabulary for one meal category
#[derive(Debug, Clone, Default)]
pub struct CategoryVocab {
    /// Keywords expected in a matching image filename
    pub keywords: Vec<String>,
    /// Terms that disqualify an image when present in its filename but
    /// absent from the recipe's own tokens
    pub forbidden: Vec<String>,
    /// Filename patterns used for category-based fallback suggestions
    pub fallback_patterns: Vec<String>,
}

/// Immutable vocabulary tables backing an [`Ontology`]
#[derive(Debug, Clone)]
pub struct OntologyConfig {
    /// Canonical ingredient -> synonym forms
    pub synonyms: BTreeMap<String, Vec<String>>,
    /// Per-category vocabulary; categories absent here get no
    /// keyword or forbidden-term checks
    pub categories: BTreeMap<String, CategoryVocab>,
    /// Protein terms used by fallback suggestion scoring
    pub proteins: Vec<String>,
    /// Closed vocabulary deciding beverage form factor
    pub beverage_tokens: Vec<String>,
    /// Words dropped during tokenization
    pub stop_words: Vec<String>,
}

fn svec(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Terms that must not appear in an image filename unless the recipe
/// itself calls for them
const COMMON_FORBIDDEN: &[&str] = &[
    "dragonfruit",
    "pitaya",
    "quinoa",
    "buckwheat",
    "pork",
    "bacon",
    "ham",
    "shellfish",
    "shrimp",
    "crab",
    "lobster",
    "alcohol",
    "wine",
    "beer",
    "dairy",
    "milk",
    "cheese",
    "yogurt",
    "wheat",
    "bread",
    "pasta",
    "rice",
    "sweet potato",
    "potato",
];

/// Solid-food markers that additionally disqualify an image for beverage
/// recipes (a drink must never carry a grilled-meat or plated-dish photo)
const BEVERAGE_FORBIDDEN_EXTRAS: &[&str] = &[
    "beef", "chicken", "steak", "rib", "bbq", "burger", "pizza", "casserole", "roast",
];

impl Default for OntologyConfig {
    fn default() -> Self {
        let mut synonyms = BTreeMap::new();
        for (key, syns) in [
            ("dragonfruit", &["pitaya", "dragon fruit"][..]),
            ("chickpea", &["garbanzo", "chick pea", "chickpeas", "garbanzos"]),
            ("quinoa", &["keen-wah", "quinoa grain"]),
            ("acai", &["acai berry", "açaí", "acai puree"]),
            ("goji", &["goji berry", "wolfberry", "goji berries"]),
            ("chia", &["chia seed", "chia seeds"]),
            ("cacao", &["cocoa", "chocolate", "dark chocolate"]),
            ("coconut", &["coconut milk", "coconut flakes", "coconut oil"]),
            ("almond", &["almonds", "almond butter", "chopped almonds"]),
            ("avocado", &["avocados", "avo"]),
            ("broccoli", &["broccoli florets"]),
            ("cauliflower", &["cauliflower rice", "cauliflower florets"]),
            ("spinach", &["baby spinach", "spinach leaves"]),
            ("kale", &["kale leaves", "baby kale"]),
            ("salmon", &["atlantic salmon", "wild salmon"]),
            ("chicken", &["chicken breast", "chicken thigh"]),
            ("beef", &["ground beef", "beef strips"]),
            ("tofu", &["firm tofu", "silken tofu"]),
            ("mushroom", &["mushrooms", "shiitake", "portobello"]),
            ("bell pepper", &["red pepper", "yellow pepper", "green pepper", "peppers"]),
            ("tomato", &["tomatoes", "cherry tomatoes", "roma tomatoes"]),
            ("onion", &["onions", "red onion", "white onion", "yellow onion"]),
            ("garlic", &["garlic clove", "garlic cloves"]),
            ("lemon", &["lemon juice", "lemon zest"]),
            ("lime", &["lime juice", "lime zest"]),
            ("ginger", &["fresh ginger", "ginger root"]),
            ("turmeric", &["turmeric powder", "fresh turmeric"]),
            ("basil", &["fresh basil", "basil leaves"]),
            ("cilantro", &["fresh cilantro", "coriander"]),
            ("parsley", &["fresh parsley", "parsley leaves"]),
        ] {
            synonyms.insert(key.to_string(), svec(syns));
        }

        let common_forbidden = svec(COMMON_FORBIDDEN);
        let mut categories = BTreeMap::new();
        for (name, keywords, fallback_patterns) in [
            (
                "breakfast",
                &["bowl", "smoothie", "parfait", "toast", "eggs", "pancakes", "oatmeal"][..],
                &["breakfast", "morning", "bowl", "smoothie", "parfait", "eggs", "oatmeal"][..],
            ),
            (
                "lunch",
                &["salad", "wrap", "sandwich", "soup", "bowl"],
                &["lunch", "salad", "bowl", "wrap", "sandwich", "soup"],
            ),
            (
                "dinner",
                &["stir fry", "pasta", "curry", "roast", "casserole", "pizza"],
                &["dinner", "plate", "stir", "curry", "pasta", "roast", "grill"],
            ),
            (
                "snack",
                &["bites", "chips", "crackers", "bars"],
                &["snack", "bite", "ball", "chip", "bar", "energy"],
            ),
            (
                "dessert",
                &["ice cream", "cake", "cookies", "pudding", "mousse"],
                &["dessert", "sweet", "cake", "ice", "cream", "mousse"],
            ),
            (
                "beverage",
                &["smoothie", "juice", "tea", "latte", "water"],
                &["drink", "smoothie", "juice", "tea", "coffee", "latte"],
            ),
        ] {
            let mut forbidden = common_forbidden.clone();
            if name == "beverage" {
                forbidden.extend(svec(BEVERAGE_FORBIDDEN_EXTRAS));
            }
            categories.insert(
                name.to_string(),
                CategoryVocab {
                    keywords: svec(keywords),
                    forbidden,
                    fallback_patterns: svec(fallback_patterns),
                },
            );
        }

        Self {
            synonyms,
            categories,
            proteins: svec(&["chicken", "beef", "fish", "salmon", "turkey", "tofu", "egg"]),
            beverage_tokens: svec(&["smoothie", "juice", "latte", "tea", "coffee", "drink"]),
            stop_words: svec(&[
                "the", "and", "with", "for", "cup", "tbsp", "tsp", "fresh", "raw", "organic",
            ]),
        }
    }
}

/// Tokenizer and category vocabulary
pub struct Ontology {
    config: OntologyConfig,
    stop_words: BTreeSet<String>,
}

impl Ontology {
    /// Create an ontology from vocabulary tables
    pub fn new(config: OntologyConfig) -> Self {
        let stop_words = config.stop_words.iter().cloned().collect();
        Self { config, stop_words }
    }

    /// Normalize and tokenize free text (recipe names, ingredients, or
    /// cleaned filenames)
    ///
    /// Lowercases, strips everything but letters, drops short words and
    /// stop words, and singularizes. Output is a set, so callers compare
    /// token membership, never ordering.
    pub fn tokenize(&self, text: &str) -> BTreeSet<String> {
        text.to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_lowercase() { c } else { ' ' })
            .collect::<String>()
            .split_whitespace()
            .filter(|token| token.len() > 2)
            .map(singularize)
            .filter(|token| !self.stop_words.contains(token))
            .collect()
    }

    /// Tokenize an image reference: basename only, extension and
    /// generator hash/timestamp suffixes stripped
    pub fn filename_tokens(&self, image_url: &str) -> BTreeSet<String> {
        let basename = image_url.rsplit('/').next().unwrap_or("");
        self.tokenize(&clean_filename(basename))
    }

    /// Expand a token set with synonym forms
    ///
    /// Adds the canonical key and each synonym (whitespace collapsed) for
    /// every token that matches a synonym entry.
    pub fn expand(&self, tokens: &BTreeSet<String>) -> BTreeSet<String> {
        let mut expanded = tokens.clone();

        for token in tokens {
            for (key, synonyms) in &self.config.synonyms {
                if key == token || synonyms.iter().any(|s| s == token) {
                    expanded.insert(key.clone());
                    for syn in synonyms {
                        expanded.insert(syn.to_lowercase().split_whitespace().collect());
                    }
                }
            }
        }

        expanded
    }

    /// Vocabulary for a category, if known
    pub fn category(&self, name: &str) -> Option<&CategoryVocab> {
        self.config.categories.get(name)
    }

    /// Protein terms for fallback suggestion scoring
    pub fn proteins(&self) -> &[String] {
        &self.config.proteins
    }

    /// Whether free text (a recipe name) names a beverage
    pub fn is_beverage_text(&self, text: &str) -> bool {
        text.to_lowercase()
            .split_whitespace()
            .any(|token| self.config.beverage_tokens.iter().any(|b| b == token))
    }

    /// Whether an image filename names a beverage
    pub fn is_beverage_filename(&self, filename: &str) -> bool {
        filename
            .to_lowercase()
            .split(|c| matches!(c, '_' | '.' | '-' | ' '))
            .any(|token| self.config.beverage_tokens.iter().any(|b| b == token))
    }

    /// Form-factor compatibility: a beverage recipe must pair with a
    /// beverage image and a solid-food recipe with a solid-food image
    pub fn form_factor_compatible(&self, recipe_name: &str, image_filename: &str) -> bool {
        self.is_beverage_text(recipe_name) == self.is_beverage_filename(image_filename)
    }
}

impl Default for Ontology {
    fn default() -> Self {
        Self::new(OntologyConfig::default())
    }
}

/// Basic singularization for common patterns
fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{}y", stem);
    }
    if let Some(stem) = word.strip_suffix("es") {
        return stem.to_string();
    }
    if word.ends_with('s') && !word.ends_with("ss") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

/// Strip extension and generator suffixes from an image basename
///
/// Generated assets carry hex hash suffixes (`_c703225f`) or millisecond
/// timestamps (`_1714003200123`) that carry no matching signal.
fn clean_filename(basename: &str) -> String {
    let mut name = match basename.rfind('.') {
        Some(pos) if pos > 0 => &basename[..pos],
        _ => basename,
    };

    if let Some(pos) = name.rfind('_') {
        let suffix = &name[pos + 1..];
        if suffix.len() >= 8 && suffix.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)) {
            name = &name[..pos];
        }
    }

    if let Some(pos) = name.rfind('_') {
        let suffix = &name[pos + 1..];
        if suffix.len() >= 13 && suffix.chars().all(|c| c.is_ascii_digit()) {
            name = &name[..pos];
        }
    }

    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ontology() -> Ontology {
        Ontology::default()
    }

    #[test]
    fn test_tokenize_normalizes_and_filters() {
        let tokens = ontology().tokenize("2 cups Fresh Baby Spinach, chopped!");
        assert!(tokens.contains("baby"));
        assert!(tokens.contains("spinach"));
        assert!(tokens.contains("chopped"));
        // "cups" singularizes to "cup" which is a stop word; "2" is stripped
        assert!(!tokens.contains("cup"));
        assert!(!tokens.contains("cups"));
        assert!(!tokens.contains("fresh"));
    }

    #[test]
    fn test_tokenize_is_order_independent() {
        let ont = ontology();
        assert_eq!(
            ont.tokenize("salmon kale lemon"),
            ont.tokenize("lemon salmon kale")
        );
    }

    #[test]
    fn test_tokenize_empty_text() {
        assert!(ontology().tokenize("").is_empty());
        assert!(ontology().tokenize("a 1 !!").is_empty());
    }

    #[test]
    fn test_singularize_patterns() {
        assert_eq!(singularize("berries"), "berry");
        assert_eq!(singularize("tomatoes"), "tomato");
        assert_eq!(singularize("almonds"), "almond");
        assert_eq!(singularize("swiss"), "swiss");
    }

    #[test]
    fn test_filename_tokens_strip_path_extension_and_hash() {
        let tokens = ontology().filename_tokens(
            "/attached_assets/generated_images/Trinidad_Callaloo_Soup_c703225f.png",
        );
        assert!(tokens.contains("trinidad"));
        assert!(tokens.contains("callaloo"));
        assert!(tokens.contains("soup"));
        assert!(!tokens.iter().any(|t| t.contains("png")));
        assert!(!tokens.iter().any(|t| t.contains("c703225f")));
    }

    #[test]
    fn test_filename_tokens_strip_timestamp_suffix() {
        let tokens = ontology().filename_tokens("Green_Juice_1714003200123.png");
        assert_eq!(
            tokens,
            ["green", "juice"].iter().map(|s| s.to_string()).collect()
        );
    }

    #[test]
    fn test_expand_adds_canonical_key_and_collapsed_synonyms() {
        let ont = ontology();
        let tokens = ont.tokenize("cocoa nibs");
        let expanded = ont.expand(&tokens);
        assert!(expanded.contains("cacao"));
        assert!(expanded.contains("chocolate"));
        assert!(expanded.contains("darkchocolate"));
    }

    #[test]
    fn test_category_vocab_lookup() {
        let ont = ontology();
        let beverage = ont.category("beverage").unwrap();
        assert!(beverage.keywords.iter().any(|k| k == "smoothie"));
        // Solid-food markers are forbidden for beverages only
        assert!(beverage.forbidden.iter().any(|t| t == "rib"));
        let lunch = ont.category("lunch").unwrap();
        assert!(!lunch.forbidden.iter().any(|t| t == "rib"));
        assert!(ont.category("general").is_none());
    }

    #[test]
    fn test_beverage_form_factor() {
        let ont = ontology();
        assert!(ont.is_beverage_text("Classic Vanilla Smoothie"));
        assert!(!ont.is_beverage_text("Grilled Salmon Plate"));
        assert!(ont.is_beverage_filename("Mango_Ginger_Smoothie_abc12345.png"));
        assert!(!ont.is_beverage_filename("BBQ_ribs_sauce.png"));

        assert!(ont.form_factor_compatible("Berry Smoothie", "Berry_Smoothie.png"));
        assert!(!ont.form_factor_compatible("Berry Smoothie", "BBQ_ribs_sauce.png"));
        assert!(!ont.form_factor_compatible("Veggie Stir Fry", "Green_Juice.png"));
    }

    #[test]
    fn test_fixture_config_substitution() {
        let config = OntologyConfig {
            synonyms: BTreeMap::new(),
            categories: BTreeMap::new(),
            proteins: vec![],
            beverage_tokens: vec!["potion".to_string()],
            stop_words: vec!["of".to_string()],
        };
        let ont = Ontology::new(config);
        assert!(ont.is_beverage_text("healing potion"));
        assert!(ont.category("beverage").is_none());
    }
}
