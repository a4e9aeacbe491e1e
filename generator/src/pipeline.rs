//! The meal-plan generation pipeline.
//!
//! `Pending -> Rejected | Failed | Persisted`: preferences are validated and
//! the entitlement checked before the provider is called, and nothing is
//! written unless the response parsed. Persistence is one transaction in the
//! [`PlanStore`], followed by a single cache invalidation.

use std::sync::Arc;

use api_subs::entitlement::Entitlement;
use async_trait::async_trait;
use cache::{Entity, SharedCache};
use common::{
    env_config::OutputFormat,
    error::{AppError, Res},
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    completion::{CompletionClient, CompletionRequest},
    parser::{self, DayPlan, ParsedPlan},
    prompt::{self, MealPlanRequest, PlanPreferences},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationState {
    Pending,
    Rejected,
    Failed,
    Persisted,
}

/// Uniform outcome of one generation attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResult {
    pub state: GenerationState,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meal_plan_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meal_plan: Option<Vec<DayPlan>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meal_plan_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grocery_list: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub requires_upgrade: bool,
}

impl GenerationResult {
    pub fn persisted(plan: GeneratedPlan) -> Self {
        GenerationResult {
            state: GenerationState::Persisted,
            success: true,
            meal_plan_id: Some(plan.meal_plan_id),
            meal_plan: Some(plan.parsed.days),
            meal_plan_text: Some(plan.parsed.meal_plan_text),
            grocery_list: Some(plan.parsed.grocery_list),
            error: None,
            requires_upgrade: false,
        }
    }

    pub fn from_error(error: &AppError) -> Self {
        let requires_upgrade = error.requires_upgrade();
        GenerationResult {
            state: if requires_upgrade {
                GenerationState::Rejected
            } else {
                GenerationState::Failed
            },
            success: false,
            meal_plan_id: None,
            meal_plan: None,
            meal_plan_text: None,
            grocery_list: None,
            error: Some(error.user_message()),
            requires_upgrade,
        }
    }
}

/// A persisted plan together with what was parsed for it.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPlan {
    pub meal_plan_id: Uuid,
    pub grocery_list_id: Uuid,
    pub parsed: ParsedPlan,
}

/// Whether the user may generate, and the one-time subscription to use up if so.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanAccess {
    pub entitlement: Entitlement,
    pub one_time_subscription: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPlan {
    pub name: String,
    pub diet: String,
    pub description: String,
    pub grocery_items: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SavedPlan {
    pub meal_plan_id: Uuid,
    pub grocery_list_id: Uuid,
}

/// Storage the pipeline depends on.
#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn meal_planning_access(&self, user_id: Uuid) -> Res<PlanAccess>;

    /// Writes the plan, its grocery list and the activity entry atomically.
    async fn save_plan(&self, user_id: Uuid, plan: NewPlan) -> Res<SavedPlan>;

    async fn expire_subscription(&self, subscription_id: Uuid) -> Res<()>;
}

pub struct Generator {
    client: Arc<dyn CompletionClient>,
    store: Arc<dyn PlanStore>,
    cache: SharedCache,
    format: OutputFormat,
}

impl Generator {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        store: Arc<dyn PlanStore>,
        cache: SharedCache,
        format: OutputFormat,
    ) -> Self {
        Generator {
            client,
            store,
            cache,
            format,
        }
    }

    pub fn client(&self) -> Arc<dyn CompletionClient> {
        Arc::clone(&self.client)
    }

    /// Runs the pipeline and folds any error into the result.
    pub async fn run(&self, user_id: Uuid, request: MealPlanRequest) -> GenerationResult {
        match self.generate(user_id, request).await {
            Ok(plan) => GenerationResult::persisted(plan),
            Err(e) => GenerationResult::from_error(&e),
        }
    }

    /// Runs the pipeline. Rejections are logged at info, failures at error.
    pub async fn generate(&self, user_id: Uuid, request: MealPlanRequest) -> Res<GeneratedPlan> {
        let outcome = self.try_generate(user_id, request).await;
        if let Err(e) = &outcome {
            if e.requires_upgrade() {
                log::info!("Generation rejected for user {}: {}", user_id, e);
            } else {
                log::error!("Generation failed for user {}: {}", user_id, e);
            }
        }
        outcome
    }

    async fn try_generate(&self, user_id: Uuid, request: MealPlanRequest) -> Res<GeneratedPlan> {
        let prefs = request.resolve()?;

        let access = self.store.meal_planning_access(user_id).await?;
        access.entitlement.clone().into_result()?;

        let raw = self
            .client
            .complete(&self.completion_request(&prefs))
            .await?;
        let parsed = match self.format {
            OutputFormat::Text => parser::parse_response(&raw, prefs.include_snacks)?,
            OutputFormat::Json => parser::parse_structured(&raw, prefs.include_snacks)?,
        };

        let saved = self
            .store
            .save_plan(
                user_id,
                NewPlan {
                    name: format!("Meal Plan for {}", prefs.diet),
                    diet: prefs.diet.clone(),
                    description: parsed.meal_plan_text.clone(),
                    grocery_items: parsed.grocery_list.join("\n"),
                },
            )
            .await?;
        log::info!(
            "Persisted meal plan {} ({} days) for user {}",
            saved.meal_plan_id,
            parsed.days.len(),
            user_id
        );

        if let Some(subscription_id) = access.one_time_subscription {
            if let Err(e) = self.store.expire_subscription(subscription_id).await {
                log::error!(
                    "Failed to expire one-time subscription {}: {}",
                    subscription_id,
                    e
                );
            }
        }

        cache::invalidate(
            &*self.cache,
            Entity::MealPlan {
                owner: user_id,
                id: saved.meal_plan_id,
            },
        )
        .await;

        Ok(GeneratedPlan {
            meal_plan_id: saved.meal_plan_id,
            grocery_list_id: saved.grocery_list_id,
            parsed,
        })
    }

    fn completion_request(&self, prefs: &PlanPreferences) -> CompletionRequest {
        match self.format {
            OutputFormat::Text => CompletionRequest::text(prompt::build_prompt(prefs)),
            OutputFormat::Json => CompletionRequest::text(prompt::build_json_prompt(prefs))
                .with_schema("meal_plan", parser::plan_schema()),
        }
    }
}
