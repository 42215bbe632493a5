// Plan cache suite. Catches:

// * duplicate builds under contention
// * LRU eviction picking the wrong victim
// * rebuilds after eviction changing field order
// * failed builds being cached

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use hessian_core::serializer::{ClassDescriptor, PlanCache, PlanCacheStats, Serializable};
    use hessian_core::types::HessianError;
    use hessian_core::value::Value;

    struct Alpha {
        a: i32,
        label: String,
    }
    struct Beta;
    struct Gamma;
    struct Faulty;

    impl Serializable for Alpha {
        fn describe() -> ClassDescriptor<Self> {
            ClassDescriptor::new("Alpha")
                .object("self_tag", |_: &Alpha| Value::Null)
                .string("label", |a: &Alpha| Some(a.label.as_str()))
                .int("a", |a: &Alpha| a.a)
        }
    }

    impl Serializable for Beta {
        fn describe() -> ClassDescriptor<Self> {
            ClassDescriptor::new("Beta")
        }
    }

    impl Serializable for Gamma {
        fn describe() -> ClassDescriptor<Self> {
            ClassDescriptor::new("Gamma")
        }
    }

    impl Serializable for Faulty {
        fn describe() -> ClassDescriptor<Self> {
            ClassDescriptor::new("Faulty").int("f", |_: &Faulty| 0).int("f", |_: &Faulty| 1)
        }
    }

    #[test]
    fn one_build_under_contention() {
        let cache = Arc::new(PlanCache::with_capacity(16));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.plan_for::<Alpha>().unwrap())
            })
            .collect();
        let plans: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(plans.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(cache.stats(), PlanCacheStats { hits: 7, builds: 1, evictions: 0 });
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn least_recently_used_is_evicted() {
        let cache = PlanCache::with_capacity(2);
        cache.plan_for::<Alpha>().unwrap();
        cache.plan_for::<Beta>().unwrap();
        cache.plan_for::<Alpha>().unwrap();
        cache.plan_for::<Gamma>().unwrap();

        assert!(cache.contains::<Alpha>());
        assert!(!cache.contains::<Beta>());
        assert!(cache.contains::<Gamma>());
        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn rebuild_after_eviction_keeps_field_order() {
        let cache = PlanCache::with_capacity(1);
        let before = cache.plan_for::<Alpha>().unwrap();
        cache.plan_for::<Beta>().unwrap();
        assert!(!cache.contains::<Alpha>());

        let after = cache.plan_for::<Alpha>().unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(before.fields(), after.fields());
        assert_eq!(after.field_names(), &["label", "a", "self_tag"]);
        assert_eq!(cache.stats().builds, 3);
    }

    #[test]
    fn failed_build_is_not_cached() {
        let cache = PlanCache::with_capacity(4);
        let err = cache.serializer_for::<Faulty>().err().unwrap();
        assert!(matches!(err, HessianError::Introspection(_)));
        assert!(cache.is_empty());
        assert!(cache.serializer_for::<Faulty>().is_err());
    }

    #[test]
    fn clear_resets_entries_and_stats() {
        let cache = PlanCache::with_capacity(4);
        cache.plan_for::<Alpha>().unwrap();
        cache.plan_for::<Alpha>().unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), PlanCacheStats::default());
    }

    #[test]
    fn capacity_has_a_floor_of_one() {
        assert_eq!(PlanCache::with_capacity(0).capacity(), 1);
        assert!(PlanCache::global().capacity() >= 1);
    }

    #[test]
    fn global_cache_serves_serializable_values() {
        let value = Value::object(Alpha { a: 1, label: "one".into() });
        let bytes = hessian_core::to_bytes(&value).unwrap();
        assert!(PlanCache::global().contains::<Alpha>());
        assert!(bytes.starts_with(&[b'C', 0x05]));
    }
}
