use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct MealPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    /// Raw meal-plan section of the generated text.
    pub description: String,
    pub created_at: DateTime<Utc>,
}
