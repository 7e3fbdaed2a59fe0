//! Per-user conversation state carried across stateless HTTP turns.
//!
//! The field set is heterogeneous per intent, so the context is a small
//! string-keyed map over a variant value type with typed accessors on top.
//! The store serializes turns per user: a dialogue turn locks its entry for
//! the whole load-mutate cycle, so two simultaneous turns from the same user
//! cannot lose an update.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use mensa_service_entity::mensa;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::dialogue::ChatRequest;
use crate::openmensa::Meal;

pub const KEY_INTENT: &str = "intent";
pub const KEY_MENSA: &str = "mensa";
pub const KEY_CITY: &str = "city";
pub const KEY_CATEGORY: &str = "category";
pub const KEY_NUMBER: &str = "number";
pub const KEY_MSG: &str = "msg";
pub const KEY_DAY: &str = "day";
pub const KEY_SELECTED_MENSA: &str = "selected_mensa";
pub const KEY_SELECTED_DISH: &str = "selected_dish";
pub const KEY_SELECTED_STARS: &str = "selected_stars";
pub const KEY_CURRENT_SELECTION: &str = "currentSelection";
pub const KEY_DEFAULT_MENSA: &str = "default_mensa";
pub const KEY_REVIEW_START: &str = "review_start";

/// Variant value for one context field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContextValue {
    Text(String),
    Number(i64),
    Canteen(mensa::Model),
    Dish(Meal),
    Selection(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DialogueContext {
    fields: BTreeMap<String, ContextValue>,
}

impl DialogueContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: &str, value: ContextValue) {
        self.fields.insert(key.to_string(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<ContextValue> {
        self.fields.remove(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(ContextValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn number(&self, key: &str) -> Option<i64> {
        match self.fields.get(key) {
            Some(ContextValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn intent(&self) -> Option<&str> {
        self.text(KEY_INTENT)
    }

    pub fn selected_mensa(&self) -> Option<&mensa::Model> {
        match self.fields.get(KEY_SELECTED_MENSA) {
            Some(ContextValue::Canteen(m)) => Some(m),
            _ => None,
        }
    }

    pub fn set_selected_mensa(&mut self, canteen: mensa::Model) {
        self.set(KEY_SELECTED_MENSA, ContextValue::Canteen(canteen));
    }

    pub fn selected_dish(&self) -> Option<&Meal> {
        match self.fields.get(KEY_SELECTED_DISH) {
            Some(ContextValue::Dish(d)) => Some(d),
            _ => None,
        }
    }

    pub fn set_selected_dish(&mut self, dish: Meal) {
        self.set(KEY_SELECTED_DISH, ContextValue::Dish(dish));
    }

    pub fn selected_stars(&self) -> Option<i64> {
        self.number(KEY_SELECTED_STARS)
    }

    pub fn current_selection(&self) -> Option<&[String]> {
        match self.fields.get(KEY_CURRENT_SELECTION) {
            Some(ContextValue::Selection(names)) => Some(names),
            _ => None,
        }
    }

    pub fn set_current_selection(&mut self, names: Vec<String>) {
        self.set(KEY_CURRENT_SELECTION, ContextValue::Selection(names));
    }

    pub fn default_mensa(&self) -> Option<&str> {
        self.text(KEY_DEFAULT_MENSA)
    }

    /// Merge an inbound chat request: every present field overwrites the
    /// matching context field, absent fields never null anything out.
    pub fn merge_request(&mut self, request: &ChatRequest) {
        let texts = [
            (KEY_INTENT, &request.intent),
            (KEY_MENSA, &request.mensa),
            (KEY_CITY, &request.city),
            (KEY_CATEGORY, &request.category),
            (KEY_MSG, &request.msg),
            (KEY_DAY, &request.day),
        ];
        for (key, value) in texts {
            if let Some(value) = value {
                self.set(key, ContextValue::Text(value.clone()));
            }
        }
        if let Some(number) = request.number {
            self.set(KEY_NUMBER, ContextValue::Number(number as i64));
        }
    }
}

struct ContextEntry {
    context: DialogueContext,
    last_touched: Instant,
}

/// Handle to one user's context, locked for the duration of a turn.
pub struct ContextHandle {
    entry: Arc<Mutex<ContextEntry>>,
}

impl ContextHandle {
    pub async fn lock(&self) -> ContextGuard<'_> {
        let mut guard = self.entry.lock().await;
        guard.last_touched = Instant::now();
        ContextGuard { guard }
    }
}

pub struct ContextGuard<'a> {
    guard: tokio::sync::MutexGuard<'a, ContextEntry>,
}

impl std::ops::Deref for ContextGuard<'_> {
    type Target = DialogueContext;

    fn deref(&self) -> &Self::Target {
        &self.guard.context
    }
}

impl std::ops::DerefMut for ContextGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard.context
    }
}

/// Process-wide context store, keyed by the external user identity (email or
/// channel id). Entries idle longer than the configured TTL are evicted by a
/// periodic sweep so abandoned conversations do not accumulate for the
/// process lifetime.
#[derive(Default)]
pub struct ContextStore {
    entries: DashMap<String, Arc<Mutex<ContextEntry>>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load (or create) the entry for a user. The returned handle must be
    /// locked before the context can be read or mutated.
    pub fn entry(&self, user_key: &str) -> ContextHandle {
        let entry = self
            .entries
            .entry(user_key.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(ContextEntry {
                    context: DialogueContext::new(),
                    last_touched: Instant::now(),
                }))
            })
            .clone();
        ContextHandle { entry }
    }

    /// Drop a user's context entirely (the `quit` intent).
    pub fn remove(&self, user_key: &str) {
        self.entries.remove(user_key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evict entries idle longer than `max_idle`. Entries currently locked
    /// by a running turn are skipped.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        // Counted in the closure: the map can grow concurrently, so a
        // before/after size diff is not a removal count.
        let mut evicted = 0;
        self.entries.retain(|_, entry| match entry.try_lock() {
            Ok(guard) => {
                let keep = guard.last_touched.elapsed() <= max_idle;
                if !keep {
                    evicted += 1;
                }
                keep
            }
            Err(_) => true,
        });
        if evicted > 0 {
            debug!("evicted {} idle conversation contexts", evicted);
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_present_overwrites_absent_preserves() {
        let mut ctx = DialogueContext::new();
        ctx.merge_request(&ChatRequest {
            email: Some("alice@example.org".into()),
            intent: Some("menu".into()),
            mensa: Some("academica".into()),
            city: Some("Aachen".into()),
            ..Default::default()
        });
        assert_eq!(ctx.intent(), Some("menu"));
        assert_eq!(ctx.text(KEY_MENSA), Some("academica"));
        assert_eq!(ctx.text(KEY_CITY), Some("Aachen"));

        // A second request with only an intent must not wipe the rest.
        ctx.merge_request(&ChatRequest {
            intent: Some("stars".into()),
            number: Some(4.0),
            ..Default::default()
        });
        assert_eq!(ctx.intent(), Some("stars"));
        assert_eq!(ctx.number(KEY_NUMBER), Some(4));
        assert_eq!(ctx.text(KEY_MENSA), Some("academica"));
        assert_eq!(ctx.text(KEY_CITY), Some("Aachen"));
    }

    #[test]
    fn test_typed_accessors_ignore_mismatched_variants() {
        let mut ctx = DialogueContext::new();
        ctx.set(KEY_SELECTED_STARS, ContextValue::Text("five".into()));
        assert_eq!(ctx.selected_stars(), None);

        ctx.set(KEY_SELECTED_STARS, ContextValue::Number(5));
        assert_eq!(ctx.selected_stars(), Some(5));
    }

    #[tokio::test]
    async fn test_store_round_trip_and_remove() {
        let store = ContextStore::new();
        {
            let handle = store.entry("alice");
            let mut ctx = handle.lock().await;
            ctx.set(KEY_DEFAULT_MENSA, ContextValue::Text("Mensa Vita".into()));
        }
        {
            let handle = store.entry("alice");
            let ctx = handle.lock().await;
            assert_eq!(ctx.default_mensa(), Some("Mensa Vita"));
        }
        assert_eq!(store.len(), 1);
        store.remove("alice");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_eviction_keeps_fresh_entries() {
        let store = ContextStore::new();
        store.entry("stale");
        tokio::time::sleep(Duration::from_millis(30)).await;
        store.entry("fresh");

        let evicted = store.evict_idle(Duration::from_millis(20));
        assert_eq!(evicted, 1);
        assert_eq!(store.len(), 1);

        // The surviving entry is the fresh one.
        let handle = store.entry("fresh");
        handle.lock().await;
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_eviction_count_excludes_locked_entries() {
        let store = ContextStore::new();
        store.entry("idle");
        let busy = store.entry("busy");
        let guard = busy.lock().await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        // Both entries are past the TTL, but the locked one is kept and
        // must not show up in the removal count.
        let evicted = store.evict_idle(Duration::from_millis(20));
        assert_eq!(evicted, 1);
        assert_eq!(store.len(), 1);
        drop(guard);

        let handle = store.entry("busy");
        handle.lock().await;
        assert_eq!(store.len(), 1);
    }
}
