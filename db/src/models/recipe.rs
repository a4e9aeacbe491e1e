use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::JsonValue;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub meal_plan_id: Option<Uuid>,
    pub day_index: Option<i32>,
    pub meal_type: Option<String>,
    pub title: String,
    pub description: String,
    /// Plain text (one item per line) or a JSON-encoded list of strings.
    pub ingredients: String,
    /// Plain text (one step per line) or a JSON-encoded list of strings.
    pub instructions: String,
    pub prep_time: String,
    pub cook_time: String,
    pub servings: i32,
    pub difficulty: String,
    pub nutrition_info: Option<JsonValue>,
    pub tips: Option<JsonValue>,
    pub is_ai_generated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    pub fn ingredient_list(&self) -> Vec<String> {
        split_entries(&self.ingredients)
    }

    pub fn instruction_list(&self) -> Vec<String> {
        split_entries(&self.instructions)
    }
}

/// Decodes a JSON list of strings, or falls back to one entry per non-blank line.
pub fn split_entries(raw: &str) -> Vec<String> {
    if let Ok(entries) = serde_json::from_str::<Vec<String>>(raw) {
        return entries
            .into_iter()
            .map(|entry| entry.trim().to_string())
            .filter(|entry| !entry.is_empty())
            .collect();
    }
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
