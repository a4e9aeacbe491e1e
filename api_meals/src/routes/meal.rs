use std::sync::Arc;

use actix_web::{Either, Responder, delete, get, post, web};
use cache::SharedCache;
use common::{env_config::Config, error::Res, http::Success, jwt::JwtClaims};
use generator::{GenerationResult, Generator, TaskRegistry, prompt::MealPlanRequest};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    dtos::meal::{
        GenerateAccepted, GroceryListView, GroceryListsResponse, LatestGroceryListResponse,
        MealPlansResponse,
    },
    services,
};

type PlanInput = Either<web::Json<MealPlanRequest>, web::Form<MealPlanRequest>>;

/// Generates a meal plan and waits for the result.
///
/// Accepts JSON or a urlencoded form. Every field is optional; missing ones
/// fall back to a balanced, Contemporary Nigerian 7-day plan for four.
///
/// # Input
/// - `diet`, `cuisine`, `health_goals`, `allergies`, `budget`, `skill_level`: text, at most 200 chars
/// - `meals_per_day` (1-6), `plan_days` (1-14), `family_size` (1-20)
/// - `include_snacks`: boolean, or the checkbox value `"on"`
///
/// # Output
/// - Success (201): `{ state: "persisted", success: true, meal_plan_id, meal_plan: [...], meal_plan_text, grocery_list: [...] }`
/// - 400 for invalid preferences
/// - 403 `{ success: false, requires_upgrade: true, error }` when the plan allowance is used up
/// - 502 when the completion provider fails or answers in the wrong format
/// - 429 when generating too often
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/dashboard/meals/generate', {
///   method: 'POST',
///   headers: {
///     'Authorization': `Bearer ${token}`,
///     'Content-Type': 'application/json'
///   },
///   body: JSON.stringify({ diet: 'vegetarian', plan_days: 3, include_snacks: true })
/// });
/// const result = await response.json();
/// if (result.requires_upgrade) showUpgradeDialog(result.error);
/// else if (result.success) renderPlan(result.meal_plan, result.grocery_list);
/// ```
#[post("")]
pub async fn post_generate(
    claims: web::ReqData<JwtClaims>,
    generator: web::Data<Arc<Generator>>,
    input: PlanInput,
) -> Res<impl Responder> {
    let plan = generator
        .generate(claims.user_id, input.into_inner())
        .await?;
    Success::created(GenerationResult::persisted(plan))
}

/// Starts a generation in the background and returns the task id to poll.
///
/// Preferences are validated before the task is queued.
///
/// # Output
/// - Success (202): `{ task_id, status: "processing" }`
///
/// # Frontend Example
/// ```javascript
/// const { task_id } = await (await fetch('/api/dashboard/meals/generate/async', {
///   method: 'POST',
///   headers: { 'Authorization': `Bearer ${token}`, 'Content-Type': 'application/json' },
///   body: JSON.stringify({ plan_days: 7 })
/// })).json();
///
/// let result;
/// do {
///   await new Promise(r => setTimeout(r, 2000));
///   result = await (await fetch(`/api/dashboard/meals/tasks/${task_id}`, {
///     headers: { 'Authorization': `Bearer ${token}` }
///   })).json();
/// } while (result.status === 'processing');
/// ```
#[post("/async")]
pub async fn post_generate_async(
    claims: web::ReqData<JwtClaims>,
    generator: web::Data<Arc<Generator>>,
    registry: web::Data<Arc<TaskRegistry>>,
    input: PlanInput,
) -> Res<impl Responder> {
    let request = input.into_inner();
    request.clone().resolve()?;

    let user_id = claims.user_id;
    let generator = Arc::clone(&**generator);
    let task_id = registry.submit(user_id, async move { generator.run(user_id, request).await });

    Success::accepted(GenerateAccepted {
        task_id,
        status: "processing",
    })
}

/// Polls a background generation.
///
/// # Output
/// - `{ "status": "processing" }` while running
/// - `{ "status": "completed", state, success, ... }` once finished
/// - 404 for unknown tasks and tasks of other users
#[get("/tasks/{task_id}")]
pub async fn get_task(
    claims: web::ReqData<JwtClaims>,
    path: web::Path<Uuid>,
    registry: web::Data<Arc<TaskRegistry>>,
) -> Res<impl Responder> {
    let view = registry.status(path.into_inner(), claims.user_id)?;
    Success::ok(view)
}

/// Lists the user's meal plans, newest first.
///
/// # Frontend Example
/// ```javascript
/// const { meal_plans } = await (await fetch('/api/dashboard/meals/plans', {
///   headers: { 'Authorization': `Bearer ${token}` }
/// })).json();
/// ```
#[get("/plans")]
pub async fn get_plans(
    claims: web::ReqData<JwtClaims>,
    pool: web::Data<Arc<PgPool>>,
    cache: web::Data<SharedCache>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let meal_plans =
        services::meal::list_plans(&pool, &***cache, &config, claims.user_id).await?;
    Success::ok(MealPlansResponse { meal_plans })
}

/// Returns one plan with its days, grocery items and already generated slot recipes.
///
/// # Output
/// - Success: `{ meal_plan: {...}, days: [{ day: "Day 1", meals: { breakfast, lunch, dinner, snack } }], grocery_list: [...], recipes: [...] }`
/// - 404 when the plan does not exist or belongs to someone else
#[get("/plans/{id}")]
pub async fn get_plan(
    claims: web::ReqData<JwtClaims>,
    path: web::Path<Uuid>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let detail =
        services::meal::get_plan_detail(&pool, claims.user_id, path.into_inner()).await?;
    Success::ok(detail)
}

#[delete("/plans/{id}")]
pub async fn delete_plan(
    claims: web::ReqData<JwtClaims>,
    path: web::Path<Uuid>,
    pool: web::Data<Arc<PgPool>>,
    cache: web::Data<SharedCache>,
) -> Res<impl Responder> {
    services::meal::delete_plan(&pool, &***cache, claims.user_id, path.into_inner()).await?;
    Success::no_content()
}

/// Latest grocery list of the user, or `null` before the first plan.
#[get("/grocery/latest")]
pub async fn get_latest_grocery_list(
    claims: web::ReqData<JwtClaims>,
    pool: web::Data<Arc<PgPool>>,
    cache: web::Data<SharedCache>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let grocery_list =
        services::meal::latest_grocery_list(&pool, &***cache, &config, claims.user_id).await?;
    Success::ok(LatestGroceryListResponse {
        grocery_list: grocery_list.map(GroceryListView::from),
    })
}

#[get("/grocery")]
pub async fn get_grocery_lists(
    claims: web::ReqData<JwtClaims>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let lists = services::meal::grocery_lists(&pool, claims.user_id).await?;
    let merged_items = services::meal::merge_items(&lists);
    Success::ok(GroceryListsResponse {
        grocery_lists: lists.into_iter().map(GroceryListView::from).collect(),
        merged_items,
    })
}
