use chrono::{DateTime, Utc};
use db::models::{activity::Activity, grocery_list::GroceryList, meal_plan::MealPlan};
use generator::parser::DayPlan;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct GenerateAccepted {
    pub task_id: Uuid,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MealPlansResponse {
    pub meal_plans: Vec<MealPlan>,
}

/// A recipe already generated for one meal of a plan.
#[derive(Debug, Serialize)]
pub struct SlotRecipe {
    pub day_index: i32,
    pub meal_type: String,
    pub recipe_id: Uuid,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct PlanDetailResponse {
    pub meal_plan: MealPlan,
    pub days: Vec<DayPlan>,
    pub grocery_list: Vec<String>,
    pub recipes: Vec<SlotRecipe>,
}

#[derive(Debug, Serialize)]
pub struct GroceryListView {
    pub id: Uuid,
    pub meal_plan_id: Option<Uuid>,
    pub items: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<GroceryList> for GroceryListView {
    fn from(list: GroceryList) -> Self {
        GroceryListView {
            items: list.item_list(),
            id: list.id,
            meal_plan_id: list.meal_plan_id,
            created_at: list.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LatestGroceryListResponse {
    pub grocery_list: Option<GroceryListView>,
}

#[derive(Debug, Serialize)]
pub struct GroceryListsResponse {
    pub grocery_lists: Vec<GroceryListView>,
    /// Every distinct item across all lists.
    pub merged_items: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub activities: Vec<Activity>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    pub response: String,
}
