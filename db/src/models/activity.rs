use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::JsonValue;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    CreateMeal,
    DeleteMeal,
    CreateRecipe,
    UpdateRecipe,
    DeleteRecipe,
    Subscription,
    CancelSubscription,
    Feedback,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::CreateMeal => "create_meal",
            ActivityAction::DeleteMeal => "delete_meal",
            ActivityAction::CreateRecipe => "create_recipe",
            ActivityAction::UpdateRecipe => "update_recipe",
            ActivityAction::DeleteRecipe => "delete_recipe",
            ActivityAction::Subscription => "subscription",
            ActivityAction::CancelSubscription => "cancel_subscription",
            ActivityAction::Feedback => "feedback",
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    pub details: JsonValue,
    pub created_at: DateTime<Utc>,
}
