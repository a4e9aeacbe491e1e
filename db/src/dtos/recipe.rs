use serde::Deserialize;
use sqlx::types::JsonValue;
use uuid::Uuid;

/// Where a recipe sits inside a meal plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeSlot {
    pub meal_plan_id: Uuid,
    pub day_index: i32,
    pub meal_type: String,
}

pub struct RecipeCreateRequest {
    pub user_id: Uuid,
    pub slot: Option<RecipeSlot>,
    pub title: String,
    pub description: String,
    pub ingredients: String,
    pub instructions: String,
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    pub servings: Option<i32>,
    pub difficulty: Option<String>,
    pub nutrition_info: Option<JsonValue>,
    pub tips: Option<JsonValue>,
    pub is_ai_generated: bool,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub ingredients: Option<String>,
    pub instructions: Option<String>,
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    pub servings: Option<i32>,
    pub difficulty: Option<String>,
}
