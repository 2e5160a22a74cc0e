//! Meal queries
//!
//! Bulk recipe reads and the single-row image update used by the fix
//! applier. Rows with malformed optional columns are normalized rather
//! than rejected, matching the product's storage layer.

use crate::db::models::Recipe;
use crate::{Error, Result};
use sqlx::SqlitePool;

/// Fetch the full recipe set, ordered by id for reproducible output
pub async fn fetch_all_recipes(db: &SqlitePool) -> Result<Vec<Recipe>> {
    tracing::debug!("Fetching all recipes from database");

    let rows: Vec<(
        String,
        String,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<f64>,
    )> = sqlx::query_as(
        r#"
        SELECT id, name, ingredients, category, image_url, glycemic_index, glycemic_value
        FROM meals
        ORDER BY id
        "#,
    )
    .fetch_all(db)
    .await?;

    let recipes = rows
        .into_iter()
        .map(|(id, name, ingredients, category, image_url, glycemic_index, glycemic_value)| {
            let ingredients = ingredients
                .as_deref()
                .and_then(|raw| serde_json::from_str::<Vec<String>>(raw).ok())
                .unwrap_or_default();

            Recipe {
                id,
                name,
                ingredients,
                category: category.unwrap_or_else(|| "general".to_string()),
                image_url: image_url.unwrap_or_default(),
                glycemic_index: glycemic_index.unwrap_or_else(|| "low".to_string()),
                glycemic_value,
            }
        })
        .collect();

    Ok(recipes)
}

/// Update a single recipe's image reference
///
/// Idempotent single-row update; failure is catchable per-call so one bad
/// row never sinks a whole fix batch.
pub async fn update_meal_image(db: &SqlitePool, recipe_id: &str, new_image_url: &str) -> Result<()> {
    let result = sqlx::query(
        "UPDATE meals SET image_url = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(new_image_url)
    .bind(recipe_id)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Recipe not found: {}", recipe_id)));
    }

    tracing::debug!(recipe_id = %recipe_id, new_image_url = %new_image_url, "Updated meal image");

    Ok(())
}
