use uuid::Uuid;

pub struct MealPlanCreateRequest {
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
}

pub struct GroceryListCreateRequest {
    pub user_id: Uuid,
    pub meal_plan_id: Option<Uuid>,
    pub items: String,
}
