use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct GroceryList {
    pub id: Uuid,
    pub user_id: Uuid,
    pub meal_plan_id: Option<Uuid>,
    /// Newline-delimited items.
    pub items: String,
    pub created_at: DateTime<Utc>,
}

impl GroceryList {
    pub fn item_list(&self) -> Vec<String> {
        self.items
            .lines()
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    }
}
