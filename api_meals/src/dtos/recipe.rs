use db::models::recipe::Recipe;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct RecipeCreateBody {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// One ingredient per line.
    pub ingredients: String,
    /// One step per line.
    pub instructions: String,
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    pub servings: Option<i32>,
    pub difficulty: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecipesResponse {
    pub recipes: Vec<Recipe>,
}

/// A recipe as shown to its owner.
///
/// `nutrition_info` is withheld unless the owner is entitled to detailed
/// nutrition, in which case `nutrition_locked` is `false`.
#[derive(Debug, Serialize)]
pub struct RecipeView {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub ingredients_list: Vec<String>,
    pub instructions_list: Vec<String>,
    pub nutrition_locked: bool,
}

#[derive(Debug, Serialize)]
pub struct SlotRecipeResponse {
    #[serde(flatten)]
    pub recipe: RecipeView,
    pub is_newly_generated: bool,
}
