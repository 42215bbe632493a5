//! serializer/plan_cache.rs
//!
//! Process-wide cache of class plans and their serializers, keyed by the
//! concrete Rust type.
//!
//! Design notes:
//! - One `Mutex` guards the whole cache and plans are built while it is
//!   held, so a type is introspected once per cache residency.
//! - Bounded: when full, the least recently used entry is evicted. A later
//!   lookup rebuilds it from the same descriptor, with the same field order.
//! - `Serializable::describe` runs under the lock and must not serialize.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use tracing::debug;

use crate::constants::{DEFAULT_PLAN_CACHE_CAPACITY, PLAN_CACHE_CAPACITY_ENV};
use crate::serializer::introspect::ClassPlan;
use crate::serializer::object::ClassSerializer;
use crate::serializer::write_replace::WriteReplaceSerializer;
use crate::serializer::{Serializable, Serializer};
use crate::types::Result;

struct CacheEntry {
    plan: Arc<dyn Any + Send + Sync>,
    serializer: Arc<dyn Serializer>,
    type_name: String,
    last_used: u64,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<TypeId, CacheEntry>,
    tick: u64,
    stats: PlanCacheStats,
}

/// Lookup counters since the cache was created or cleared.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlanCacheStats {
    pub hits: u64,
    pub builds: u64,
    pub evictions: u64,
}

pub struct PlanCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
}

impl PlanCache {
    /// A cache holding at most `capacity` plans (minimum one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            capacity: capacity.max(1),
        }
    }

    /// The cache used by `Serializable` objects. Its capacity comes from
    /// `HESSIAN_PLAN_CACHE_CAPACITY` when set to a positive integer.
    pub fn global() -> &'static PlanCache {
        static GLOBAL: OnceLock<PlanCache> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let capacity = std::env::var(PLAN_CACHE_CAPACITY_ENV)
                .ok()
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|&n| n > 0)
                .unwrap_or(DEFAULT_PLAN_CACHE_CAPACITY);
            PlanCache::with_capacity(capacity)
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        // A panic in user code while building must not disable the cache.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn plan_for<T: Serializable>(&self) -> Result<Arc<ClassPlan<T>>> {
        self.entry::<T>().map(|(plan, _)| plan)
    }

    /// Serializer for `T`, wrapped for substitution if the plan has a hook.
    pub fn serializer_for<T: Serializable>(&self) -> Result<Arc<dyn Serializer>> {
        self.entry::<T>().map(|(_, serializer)| serializer)
    }

    fn entry<T: Serializable>(&self) -> Result<(Arc<ClassPlan<T>>, Arc<dyn Serializer>)> {
        let mut inner = self.lock();
        inner.tick += 1;
        let tick = inner.tick;
        let key = TypeId::of::<T>();

        let cached = inner.entries.get_mut(&key).and_then(|entry| {
            entry.last_used = tick;
            let plan = entry.plan.clone().downcast::<ClassPlan<T>>().ok()?;
            Some((plan, entry.serializer.clone()))
        });
        if let Some(found) = cached {
            inner.stats.hits += 1;
            return Ok(found);
        }

        let plan = Arc::new(ClassPlan::build(T::describe())?);
        let base: Arc<dyn Serializer> = Arc::new(ClassSerializer::new(plan.clone()));
        let serializer: Arc<dyn Serializer> = match plan.write_replace() {
            Some(hook) => Arc::new(WriteReplaceSerializer::new(plan.type_name(), base, hook.clone())),
            None => base,
        };
        debug!(
            class = %plan.type_name(),
            fields = plan.fields().len(),
            unshared = plan.is_unshared(),
            "class plan built"
        );

        if inner.entries.len() >= self.capacity && !inner.entries.contains_key(&key) {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| *k);
            if let Some(evicted) = oldest.and_then(|k| inner.entries.remove(&k)) {
                debug!(class = %evicted.type_name, "class plan evicted");
                inner.stats.evictions += 1;
            }
        }

        inner.entries.insert(
            key,
            CacheEntry {
                plan: plan.clone(),
                serializer: serializer.clone(),
                type_name: plan.type_name().to_string(),
                last_used: tick,
            },
        );
        inner.stats.builds += 1;
        Ok((plan, serializer))
    }

    pub fn contains<T: Serializable>(&self) -> bool {
        self.lock().entries.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> PlanCacheStats {
        self.lock().stats
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.stats = PlanCacheStats::default();
    }
}
