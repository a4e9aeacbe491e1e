use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use api_subs::entitlement::Entitlement;
use async_trait::async_trait;
use cache::{CacheKey, CacheStore, SharedCache, store::memory::MemoryCache};
use common::{env_config::OutputFormat, error::Res};
use generator::{
    GenerationState, Generator,
    completion::{CompletionClient, CompletionError, CompletionRequest},
    pipeline::{NewPlan, PlanAccess, PlanStore, SavedPlan},
    prompt::MealPlanRequest,
};
use uuid::Uuid;

const REPLY: &str = "MEAL PLAN:\nDay 1:\nBreakfast: Akara\nLunch: Jollof rice\nDinner: Suya\n\nDay 2:\nBreakfast: Moi moi\nLunch: Fried rice\n\nGROCERY LIST:\n- Beans\n- Rice\n- Beef";

struct FakeClient {
    reply: Result<String, u16>,
    calls: AtomicU32,
    last_request: Mutex<Option<CompletionRequest>>,
}

impl FakeClient {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(FakeClient {
            reply: Ok(reply.to_string()),
            calls: AtomicU32::new(0),
            last_request: Mutex::new(None),
        })
    }

    fn failing(status: u16) -> Arc<Self> {
        Arc::new(FakeClient {
            reply: Err(status),
            calls: AtomicU32::new(0),
            last_request: Mutex::new(None),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for FakeClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(CompletionError::Status {
                status: *status,
                body: "provider exploded".to_string(),
            }),
        }
    }
}

struct FakeStore {
    access: PlanAccess,
    saved: Mutex<Vec<NewPlan>>,
    expired: Mutex<Vec<Uuid>>,
}

impl FakeStore {
    fn new(entitlement: Entitlement, one_time_subscription: Option<Uuid>) -> Arc<Self> {
        Arc::new(FakeStore {
            access: PlanAccess {
                entitlement,
                one_time_subscription,
            },
            saved: Mutex::new(Vec::new()),
            expired: Mutex::new(Vec::new()),
        })
    }

    fn allowing() -> Arc<Self> {
        Self::new(Entitlement::Allow, None)
    }

    fn saved(&self) -> Vec<NewPlan> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlanStore for FakeStore {
    async fn meal_planning_access(&self, _user_id: Uuid) -> Res<PlanAccess> {
        Ok(self.access.clone())
    }

    async fn save_plan(&self, _user_id: Uuid, plan: NewPlan) -> Res<SavedPlan> {
        self.saved.lock().unwrap().push(plan);
        Ok(SavedPlan {
            meal_plan_id: Uuid::new_v4(),
            grocery_list_id: Uuid::new_v4(),
        })
    }

    async fn expire_subscription(&self, subscription_id: Uuid) -> Res<()> {
        self.expired.lock().unwrap().push(subscription_id);
        Ok(())
    }
}

fn generator(
    client: Arc<FakeClient>,
    store: Arc<FakeStore>,
    cache: Arc<MemoryCache>,
    format: OutputFormat,
) -> Generator {
    let cache: SharedCache = cache;
    Generator::new(client, store, cache, format)
}

#[tokio::test]
async fn successful_generation_persists_and_invalidates() {
    let user_id = Uuid::new_v4();
    let client = FakeClient::replying(REPLY);
    let store = FakeStore::allowing();
    let cache = Arc::new(MemoryCache::new());
    let listing = CacheKey::MealPlans(user_id).to_string();
    cache
        .set(&listing, "[]".to_string(), Duration::from_secs(60))
        .await
        .unwrap();

    let generator = generator(client.clone(), store.clone(), cache.clone(), OutputFormat::Text);
    let result = generator
        .run(
            user_id,
            MealPlanRequest {
                diet: Some("vegetarian".to_string()),
                ..Default::default()
            },
        )
        .await;

    assert_eq!(result.state, GenerationState::Persisted);
    assert!(result.success);
    assert!(result.meal_plan_id.is_some());
    let days = result.meal_plan.unwrap();
    assert_eq!(days.len(), 2);
    assert_eq!(days[1].meals.dinner, "Dinner of your choice");
    assert_eq!(result.grocery_list.unwrap(), vec!["Beans", "Rice", "Beef"]);

    let saved = store.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].name, "Meal Plan for vegetarian");
    assert_eq!(saved[0].grocery_items, "Beans\nRice\nBeef");
    assert!(saved[0].description.starts_with("Day 1:"));

    assert!(!cache.contains(&listing));
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn denied_user_never_reaches_the_provider() {
    let client = FakeClient::replying(REPLY);
    let store = FakeStore::new(
        Entitlement::Deny {
            requires_upgrade: true,
            message: "This feature requires a premium subscription".to_string(),
        },
        None,
    );
    let generator = generator(
        client.clone(),
        store.clone(),
        Arc::new(MemoryCache::new()),
        OutputFormat::Text,
    );

    let result = generator.run(Uuid::new_v4(), MealPlanRequest::default()).await;

    assert_eq!(result.state, GenerationState::Rejected);
    assert!(!result.success);
    assert!(result.requires_upgrade);
    assert_eq!(
        result.error.as_deref(),
        Some("This feature requires a premium subscription")
    );
    assert_eq!(client.calls(), 0);
    assert!(store.saved().is_empty());
}

#[tokio::test]
async fn invalid_preferences_fail_before_the_provider() {
    let client = FakeClient::replying(REPLY);
    let store = FakeStore::allowing();
    let generator = generator(
        client.clone(),
        store.clone(),
        Arc::new(MemoryCache::new()),
        OutputFormat::Text,
    );

    let result = generator
        .run(
            Uuid::new_v4(),
            MealPlanRequest {
                plan_days: Some(30),
                ..Default::default()
            },
        )
        .await;

    assert_eq!(result.state, GenerationState::Failed);
    assert!(!result.requires_upgrade);
    assert_eq!(client.calls(), 0);
    assert!(store.saved().is_empty());
}

#[tokio::test]
async fn reply_without_grocery_marker_writes_nothing() {
    let client = FakeClient::replying("MEAL PLAN:\nDay 1:\nBreakfast: Akara");
    let store = FakeStore::allowing();
    let generator = generator(
        client,
        store.clone(),
        Arc::new(MemoryCache::new()),
        OutputFormat::Text,
    );

    let result = generator.run(Uuid::new_v4(), MealPlanRequest::default()).await;

    assert_eq!(result.state, GenerationState::Failed);
    assert_eq!(result.error.as_deref(), Some("invalid response format"));
    assert!(store.saved().is_empty());
}

#[tokio::test]
async fn provider_failure_is_reported_without_details() {
    let store = FakeStore::allowing();
    let generator = generator(
        FakeClient::failing(500),
        store.clone(),
        Arc::new(MemoryCache::new()),
        OutputFormat::Text,
    );

    let result = generator.run(Uuid::new_v4(), MealPlanRequest::default()).await;

    assert_eq!(result.state, GenerationState::Failed);
    let message = result.error.unwrap();
    assert!(!message.contains("provider exploded"));
    assert_eq!(message, common::error::SERVICE_FAILURE_MESSAGE);
    assert!(store.saved().is_empty());
}

#[tokio::test]
async fn one_time_subscription_is_used_up() {
    let subscription_id = Uuid::new_v4();
    let store = FakeStore::new(Entitlement::Allow, Some(subscription_id));
    let generator = generator(
        FakeClient::replying(REPLY),
        store.clone(),
        Arc::new(MemoryCache::new()),
        OutputFormat::Text,
    );

    let result = generator.run(Uuid::new_v4(), MealPlanRequest::default()).await;

    assert!(result.success);
    assert_eq!(*store.expired.lock().unwrap(), vec![subscription_id]);
}

#[tokio::test]
async fn structured_output_requests_a_schema() {
    let reply = serde_json::json!({
        "days": [
            { "day": "Day 1", "breakfast": "Akara", "lunch": "Jollof rice", "dinner": "Suya" }
        ],
        "grocery_list": ["Beans", "Rice"]
    })
    .to_string();
    let client = FakeClient::replying(&reply);
    let store = FakeStore::allowing();
    let generator = generator(
        client.clone(),
        store.clone(),
        Arc::new(MemoryCache::new()),
        OutputFormat::Json,
    );

    let result = generator
        .run(
            Uuid::new_v4(),
            MealPlanRequest {
                plan_days: Some(1),
                ..Default::default()
            },
        )
        .await;

    assert_eq!(result.state, GenerationState::Persisted);
    assert_eq!(result.grocery_list.unwrap(), vec!["Beans", "Rice"]);
    let request = client.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(request.schema.unwrap().name, "meal_plan");
    assert_eq!(store.saved().len(), 1);
}
