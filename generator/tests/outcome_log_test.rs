use std::sync::{Arc, Mutex, Once};

use api_subs::entitlement::Entitlement;
use async_trait::async_trait;
use cache::{SharedCache, store::memory::MemoryCache};
use common::{env_config::OutputFormat, error::Res};
use generator::{
    Generator,
    completion::{CompletionClient, CompletionError, CompletionRequest},
    pipeline::{NewPlan, PlanAccess, PlanStore, SavedPlan},
    prompt::MealPlanRequest,
};
use log::{Level, LevelFilter, Log, Metadata, Record};
use uuid::Uuid;

struct RecordingLogger {
    records: Mutex<Vec<(Level, String)>>,
}

impl Log for RecordingLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.records
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

static LOGGER: RecordingLogger = RecordingLogger {
    records: Mutex::new(Vec::new()),
};
static INIT: Once = Once::new();

fn install_logger() {
    INIT.call_once(|| {
        log::set_logger(&LOGGER).unwrap();
        log::set_max_level(LevelFilter::Info);
    });
}

fn records_for(user_id: Uuid) -> Vec<(Level, String)> {
    let needle = user_id.to_string();
    LOGGER
        .records
        .lock()
        .unwrap()
        .iter()
        .filter(|(_, message)| message.contains(&needle))
        .cloned()
        .collect()
}

struct FailingClient;

#[async_trait]
impl CompletionClient for FailingClient {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, CompletionError> {
        Err(CompletionError::Status {
            status: 500,
            body: "provider exploded".to_string(),
        })
    }
}

struct FixedStore(Entitlement);

#[async_trait]
impl PlanStore for FixedStore {
    async fn meal_planning_access(&self, _user_id: Uuid) -> Res<PlanAccess> {
        Ok(PlanAccess {
            entitlement: self.0.clone(),
            one_time_subscription: None,
        })
    }

    async fn save_plan(&self, _user_id: Uuid, _plan: NewPlan) -> Res<SavedPlan> {
        Ok(SavedPlan {
            meal_plan_id: Uuid::new_v4(),
            grocery_list_id: Uuid::new_v4(),
        })
    }

    async fn expire_subscription(&self, _subscription_id: Uuid) -> Res<()> {
        Ok(())
    }
}

fn generator(entitlement: Entitlement) -> Generator {
    let cache: SharedCache = Arc::new(MemoryCache::new());
    Generator::new(
        Arc::new(FailingClient),
        Arc::new(FixedStore(entitlement)),
        cache,
        OutputFormat::Text,
    )
}

#[tokio::test]
async fn direct_generation_logs_rejections_at_info() {
    install_logger();
    let user_id = Uuid::new_v4();
    let denied = generator(Entitlement::Deny {
        requires_upgrade: true,
        message: "You have reached your free plan limit".to_string(),
    });

    assert!(denied.generate(user_id, MealPlanRequest::default()).await.is_err());

    let records = records_for(user_id);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].0, Level::Info);
    assert!(records[0].1.starts_with("Generation rejected"));
}

#[tokio::test]
async fn direct_generation_logs_failures_at_error() {
    install_logger();
    let user_id = Uuid::new_v4();

    assert!(
        generator(Entitlement::Allow)
            .generate(user_id, MealPlanRequest::default())
            .await
            .is_err()
    );

    let records = records_for(user_id);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].0, Level::Error);
    assert!(records[0].1.starts_with("Generation failed"));
}

#[tokio::test]
async fn background_generation_logs_once() {
    install_logger();
    let user_id = Uuid::new_v4();

    let result = generator(Entitlement::Allow)
        .run(user_id, MealPlanRequest::default())
        .await;

    assert!(!result.success);
    assert_eq!(records_for(user_id).len(), 1);
}
