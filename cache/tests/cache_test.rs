use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use cache::{CacheKey, CacheStore, Entity, store::memory::MemoryCache};
use common::error::{AppError, Res};
use uuid::Uuid;

#[tokio::test]
async fn entries_expire_after_ttl() {
    let store = MemoryCache::new();
    store
        .set("short", "1".to_string(), Duration::from_millis(20))
        .await
        .unwrap();
    store
        .set("long", "2".to_string(), Duration::from_secs(60))
        .await
        .unwrap();

    assert_eq!(store.get("short").await.unwrap().as_deref(), Some("1"));
    tokio::time::sleep(Duration::from_millis(40)).await;

    assert_eq!(store.get("short").await.unwrap(), None);
    assert_eq!(store.get("long").await.unwrap().as_deref(), Some("2"));
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn get_or_load_runs_loader_once_until_invalidated() {
    let store = MemoryCache::new();
    let owner = Uuid::new_v4();
    let key = CacheKey::MealPlans(owner);
    let loads = AtomicUsize::new(0);

    for _ in 0..3 {
        let plans: Vec<String> =
            cache::get_or_load(&store, &key, Duration::from_secs(60), || async {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok(vec!["Meal Plan for balanced".to_string()])
            })
            .await
            .unwrap();
        assert_eq!(plans.len(), 1);
    }
    assert_eq!(loads.load(Ordering::SeqCst), 1);

    cache::invalidate(
        &store,
        Entity::MealPlan {
            owner,
            id: Uuid::new_v4(),
        },
    )
    .await;
    assert!(!store.contains(&key.to_string()));

    let _: Vec<String> = cache::get_or_load(&store, &key, Duration::from_secs(60), || async {
        loads.fetch_add(1, Ordering::SeqCst);
        Ok(vec![])
    })
    .await
    .unwrap();
    assert_eq!(loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn loader_errors_are_not_cached() {
    let store = MemoryCache::new();
    let key = CacheKey::Tiers;

    let failed: Res<Vec<String>> =
        cache::get_or_load(&store, &key, Duration::from_secs(60), || async {
            Err(AppError::Internal("db down".to_string()))
        })
        .await;
    assert!(failed.is_err());
    assert!(store.is_empty());
}

#[tokio::test]
async fn undecodable_entries_are_dropped() {
    let store = MemoryCache::new();
    let key = CacheKey::Tiers;
    store
        .set(&key.to_string(), "not json".to_string(), Duration::from_secs(60))
        .await
        .unwrap();

    let value: Option<Vec<String>> = cache::get_json(&store, &key).await;
    assert!(value.is_none());
    assert!(store.is_empty());
}

#[tokio::test]
async fn invalidation_only_touches_the_owner() {
    let store = MemoryCache::new();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    for key in [
        CacheKey::ActiveSubscription(alice),
        CacheKey::ActiveSubscription(bob),
    ] {
        store
            .set(&key.to_string(), "{}".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
    }

    cache::invalidate(
        &store,
        Entity::Subscription {
            owner: alice,
            id: Uuid::new_v4(),
        },
    )
    .await;

    assert!(!store.contains(&CacheKey::ActiveSubscription(alice).to_string()));
    assert!(store.contains(&CacheKey::ActiveSubscription(bob).to_string()));
}

#[tokio::test]
async fn invalidate_all_drops_plan_and_recipe_details_together() {
    let store = MemoryCache::new();
    let owner = Uuid::new_v4();
    let recipe_id = Uuid::new_v4();
    let detail = CacheKey::RecipeDetail {
        recipe_id,
        user_id: owner,
    };
    for key in [CacheKey::MealPlans(owner), detail.clone()] {
        store
            .set(&key.to_string(), "{}".to_string(), Duration::from_secs(3600))
            .await
            .unwrap();
    }

    cache::invalidate(
        &store,
        Entity::MealPlan {
            owner,
            id: Uuid::new_v4(),
        },
    )
    .await;
    assert!(store.contains(&detail.to_string()));

    cache::invalidate_all(
        &store,
        &[
            Entity::MealPlan {
                owner,
                id: Uuid::new_v4(),
            },
            Entity::Recipe {
                owner,
                id: recipe_id,
            },
        ],
    )
    .await;
    assert!(store.is_empty());
}

#[tokio::test]
async fn set_sweeps_expired_entries_past_the_threshold() {
    let store = MemoryCache::with_sweep_threshold(3);
    for i in 0..3 {
        store
            .set(&format!("stale_{i}"), "x".to_string(), Duration::from_millis(10))
            .await
            .unwrap();
    }
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(store.len(), 3);

    store
        .set("fresh", "y".to_string(), Duration::from_secs(60))
        .await
        .unwrap();

    assert_eq!(store.len(), 1);
    assert!(store.contains("fresh"));
}
