#[cfg(test)]
mod stream_telemetry_tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use hessian_core::envelope::{Deflation, Envelope};
    use hessian_core::io::{Hessian2Input, Hessian2Output, ObjectInput, ObjectOutput};
    use hessian_core::serializer::{ClassDescriptor, Serializable};
    use hessian_core::telemetry::{CountersSnapshot, Stage, StageTimes, StreamCounters, TelemetryTimer};
    use hessian_core::value::Value;

    struct Sample {
        n: i32,
    }

    impl Serializable for Sample {
        fn describe() -> ClassDescriptor<Self> {
            ClassDescriptor::new("Sample").int("n", |s: &Sample| s.n)
        }
    }

    fn make_counters() -> StreamCounters {
        StreamCounters {
            values_written: 10,
            objects_written: 4,
            definitions_written: 1,
            legacy_objects: 0,
            refs_written: 2,
            objects_read: 4,
            definitions_read: 1,
            refs_read: 2,
        }
    }

    fn make_timer() -> TelemetryTimer {
        let mut timer = TelemetryTimer::new();
        std::thread::sleep(Duration::from_millis(20)); // ensure elapsed > stage times
        timer.add_stage_time(Stage::Write, Duration::from_millis(5));
        timer.add_stage_time(Stage::Read, Duration::from_millis(3));
        timer.finish();
        timer
    }

    #[test]
    fn output_counts_definitions_and_refs() {
        let shared = Value::object(Sample { n: 1 });
        let mut out = Hessian2Output::new(Vec::new());
        out.write_object(&Value::list(vec![shared.clone(), shared, Value::object(Sample { n: 2 })]))
            .unwrap();

        let c = out.counters();
        assert_eq!(c.objects_written, 2);
        assert_eq!(c.definitions_written, 1);
        assert_eq!(c.refs_written, 1);
        // the list and its three elements; fields go through typed writes
        assert_eq!(c.values_written, 4);
        assert!((c.definition_reuse() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn input_counts_mirror_output() {
        let shared = Value::object(Sample { n: 1 });
        let bytes = hessian_core::to_bytes(&Value::list(vec![shared.clone(), shared])).unwrap();

        let mut input = Hessian2Input::new(&bytes[..]);
        input.read_object().unwrap();
        let c = input.counters();
        assert_eq!(c.objects_read, 1);
        assert_eq!(c.definitions_read, 1);
        assert_eq!(c.refs_read, 1);
    }

    #[test]
    fn snapshot_is_sane_and_serializes() {
        let snapshot = CountersSnapshot::from(&make_counters(), &make_timer());
        assert!(snapshot.sanity_check());
        assert_eq!(snapshot.total_stage_time(), Duration::from_millis(8));
        assert!(snapshot.values_per_sec > 0.0);

        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"definitions_written\":1"));
        let back: CountersSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.stage_times, snapshot.stage_times);
    }

    #[test]
    fn insane_snapshot_is_detected() {
        let mut counters = make_counters();
        counters.definitions_written = 5;
        let snapshot = CountersSnapshot::from(&counters, &make_timer());
        assert!(!snapshot.sanity_check());
    }

    #[test]
    fn counters_merge_and_bincode() {
        let mut total = make_counters();
        total += make_counters();
        assert_eq!(total.values_written, 20);
        assert_eq!(total.refs_read, 4);

        let bytes = total.to_bytes().unwrap();
        assert_eq!(StreamCounters::from_bytes(&bytes).unwrap(), total);
    }

    #[test]
    fn stage_times_accumulate() {
        let mut times = StageTimes::default();
        times.add(Stage::Deflate, Duration::from_millis(2));
        times.add(Stage::Deflate, Duration::from_millis(3));
        assert_eq!(times.get(Stage::Deflate), Duration::from_millis(5));
        assert_eq!(times.get(Stage::Inflate), Duration::ZERO);
        assert_eq!(Stage::Inflate.to_string(), "inflate");
    }

    #[test]
    fn top_level_writes_and_envelopes_record_stages() {
        let mut out = Hessian2Output::new(Vec::new());
        out.write_object(&Value::Int(1)).unwrap();
        let stages: HashSet<Stage> = out.snapshot().stage_times.iter().map(|(s, _)| s).collect();
        assert!(stages.contains(&Stage::Write));

        let body = Deflation::new().wrap(out).unwrap();
        let mut inner = Hessian2Output::new(body);
        inner.write_object(&Value::string("x")).unwrap();
        let body = inner.into_inner().unwrap();
        assert!(body.timer().stage_times.iter().any(|(s, _)| s == Stage::Deflate));
        body.finish().unwrap();
    }
}
