use std::sync::Arc;

use actix_web::{Responder, delete, get, post, put, web};
use cache::SharedCache;
use common::{env_config::Config, error::Res, http::Success, jwt::JwtClaims};
use db::dtos::recipe::RecipeUpdateRequest;
use generator::Generator;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    dtos::recipe::{RecipeCreateBody, RecipesResponse},
    services,
};

/// Lists the user's recipes, newest first.
///
/// # Frontend Example
/// ```javascript
/// const { recipes } = await (await fetch('/api/dashboard/recipes', {
///   headers: { 'Authorization': `Bearer ${token}` }
/// })).json();
/// ```
#[get("")]
pub async fn get_recipes(
    claims: web::ReqData<JwtClaims>,
    pool: web::Data<Arc<PgPool>>,
    cache: web::Data<SharedCache>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let recipes =
        services::recipe::list_recipes(&pool, &***cache, &config, claims.user_id).await?;
    Success::ok(RecipesResponse { recipes })
}

/// Creates a recipe by hand.
///
/// # Input
/// - `title`: at least 3 characters
/// - `ingredients`, `instructions`: one entry per line, not empty
/// - `description`, `prep_time`, `cook_time`, `servings`, `difficulty`: optional
///
/// # Output
/// - Success (201): the stored recipe
/// - 400 when validation fails
///
/// # Frontend Example
/// ```javascript
/// await fetch('/api/dashboard/recipes', {
///   method: 'POST',
///   headers: { 'Authorization': `Bearer ${token}`, 'Content-Type': 'application/json' },
///   body: JSON.stringify({
///     title: 'Pepper soup',
///     ingredients: 'Goat meat\nPepper soup spice',
///     instructions: 'Boil the meat\nAdd spices'
///   })
/// });
/// ```
#[post("")]
pub async fn post_recipe(
    claims: web::ReqData<JwtClaims>,
    pool: web::Data<Arc<PgPool>>,
    cache: web::Data<SharedCache>,
    body: web::Json<RecipeCreateBody>,
) -> Res<impl Responder> {
    let recipe =
        services::recipe::create_recipe(&pool, &***cache, claims.user_id, body.into_inner())
            .await?;
    Success::created(recipe)
}

/// Returns one recipe with its ingredient and instruction lists.
///
/// Nutrition is only included for users entitled to detailed nutrition;
/// otherwise `nutrition_locked` is `true`.
#[get("/{id}")]
pub async fn get_recipe(
    claims: web::ReqData<JwtClaims>,
    path: web::Path<Uuid>,
    pool: web::Data<Arc<PgPool>>,
    cache: web::Data<SharedCache>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let recipe = services::recipe::get_recipe(
        &pool,
        &***cache,
        &config,
        claims.user_id,
        path.into_inner(),
    )
    .await?;
    Success::ok(recipe)
}

/// Partially updates a recipe; omitted fields keep their value.
#[put("/{id}")]
pub async fn put_recipe(
    claims: web::ReqData<JwtClaims>,
    path: web::Path<Uuid>,
    pool: web::Data<Arc<PgPool>>,
    cache: web::Data<SharedCache>,
    body: web::Json<RecipeUpdateRequest>,
) -> Res<impl Responder> {
    let recipe = services::recipe::update_recipe(
        &pool,
        &***cache,
        claims.user_id,
        path.into_inner(),
        body.into_inner(),
    )
    .await?;
    Success::ok(recipe)
}

#[delete("/{id}")]
pub async fn delete_recipe(
    claims: web::ReqData<JwtClaims>,
    path: web::Path<Uuid>,
    pool: web::Data<Arc<PgPool>>,
    cache: web::Data<SharedCache>,
) -> Res<impl Responder> {
    services::recipe::delete_recipe(&pool, &***cache, claims.user_id, path.into_inner()).await?;
    Success::no_content()
}

/// Recipe for one meal of a plan. Generated on the first request and reused afterwards.
///
/// # Input
/// - `plan_id`: meal plan id
/// - `day_index`: zero-based day of the plan
/// - `meal_type`: `breakfast`, `lunch`, `dinner` or `snack`
///
/// # Output
/// - Success: the recipe plus `is_newly_generated`
/// - 404 when the plan or the meal does not exist
/// - 502 when generation fails
///
/// # Frontend Example
/// ```javascript
/// const recipe = await (await fetch(`/api/dashboard/recipes/slot/${planId}/0/dinner`, {
///   headers: { 'Authorization': `Bearer ${token}` }
/// })).json();
/// console.log(recipe.title, recipe.ingredients_list);
/// ```
#[get("/slot/{plan_id}/{day_index}/{meal_type}")]
pub async fn get_slot_recipe(
    claims: web::ReqData<JwtClaims>,
    path: web::Path<(Uuid, i32, String)>,
    pool: web::Data<Arc<PgPool>>,
    cache: web::Data<SharedCache>,
    config: web::Data<Arc<Config>>,
    generator: web::Data<Arc<Generator>>,
) -> Res<impl Responder> {
    let client = generator.client();
    let recipe = services::recipe::slot_recipe(
        &pool,
        &***cache,
        &config,
        &*client,
        claims.user_id,
        path.into_inner(),
    )
    .await?;
    Success::ok(recipe)
}
