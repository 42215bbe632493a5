// Legacy (typed map) framing suite. Catches:

// * class definitions leaking into legacy streams
// * missing map-end markers
// * type strings not going through the type table

#[cfg(test)]
mod tests {
    use hessian_core::config::{OutputConfig, SchemaMode};
    use hessian_core::io::{Hessian2Input, Hessian2Output, ObjectBegin, ObjectInput, ObjectOutput};
    use hessian_core::serializer::{ClassDescriptor, Serializable};
    use hessian_core::value::Value;

    struct Point {
        x: i32,
        y: i32,
    }

    impl Serializable for Point {
        fn describe() -> ClassDescriptor<Self> {
            ClassDescriptor::new("Point")
                .int("x", |p: &Point| p.x)
                .int("y", |p: &Point| p.y)
        }
    }

    struct Line {
        from: Value,
        to: Value,
    }

    impl Serializable for Line {
        fn describe() -> ClassDescriptor<Self> {
            ClassDescriptor::new("Line")
                .object("from", |l: &Line| l.from.clone())
                .object("to", |l: &Line| l.to.clone())
        }
    }

    fn legacy_output() -> Hessian2Output<Vec<u8>> {
        Hessian2Output::with_config(Vec::new(), OutputConfig::legacy())
    }

    #[test]
    fn legacy_config_selects_typed_maps() {
        assert_eq!(OutputConfig::legacy().schema_mode, SchemaMode::Legacy);
        let mut out = legacy_output();
        assert_eq!(out.write_object_begin("Any").unwrap(), ObjectBegin::Legacy);
    }

    #[test]
    fn point_is_a_typed_map() {
        let mut out = legacy_output();
        out.write_object(&Value::object(Point { x: 3, y: 4 })).unwrap();
        assert_eq!(out.counters().definitions_written, 0);
        assert_eq!(out.counters().legacy_objects, 1);

        let bytes = out.into_inner().unwrap();
        assert_eq!(
            bytes,
            vec![
                b'M', 0x05, b'P', b'o', b'i', b'n', b't',
                0x01, b'x', 0x93,
                0x01, b'y', 0x94,
                b'Z',
            ]
        );
    }

    #[test]
    fn second_instance_uses_type_index() {
        let mut out = legacy_output();
        out.write_object(&Value::object(Point { x: 1, y: 2 })).unwrap();
        out.write_object(&Value::object(Point { x: 5, y: 6 })).unwrap();
        let bytes = out.into_inner().unwrap();

        // First map is 14 bytes; the second names its type by index 0.
        assert_eq!(&bytes[14..16], &[b'M', 0x90]);

        let mut input = Hessian2Input::new(&bytes[..]);
        input.read_object().unwrap();
        let second = input.read_object().unwrap();
        let obj = second.as_generic().unwrap();
        assert_eq!(obj.type_name(), "Point");
        assert_eq!(obj.field("x").and_then(|v| v.as_int()), Some(5));
        assert_eq!(input.counters().definitions_read, 0);
        assert_eq!(input.counters().objects_read, 2);
    }

    #[test]
    fn nested_and_shared_instances() {
        let p = Value::object(Point { x: 0, y: 0 });
        let line = Value::object(Line { from: p.clone(), to: p });

        let mut out = legacy_output();
        out.write_object(&line).unwrap();
        let bytes = out.into_inner().unwrap();
        assert!(!bytes.contains(&b'C'));
        assert_eq!(&bytes[bytes.len() - 3..], &[b'Q', 0x91, b'Z']);

        let back = Hessian2Input::new(&bytes[..]).read_object().unwrap();
        let line = back.as_generic().unwrap();
        assert_eq!(line.type_name(), "Line");
        assert!(line.field("from").unwrap().ptr_eq(&line.field("to").unwrap()));
    }

    #[test]
    fn decoded_cached_stream_rewrites_as_legacy() {
        let cached = hessian_core::to_bytes(&Value::object(Point { x: 3, y: 4 })).unwrap();
        let value = hessian_core::from_bytes(&cached).unwrap();

        let mut out = legacy_output();
        out.write_object(&value).unwrap();
        let legacy = out.into_inner().unwrap();
        assert_eq!(legacy[0], b'M');

        let again = hessian_core::from_bytes(&legacy).unwrap();
        assert_eq!(again.as_generic().unwrap().field_names(), vec!["x", "y"]);
    }

    #[test]
    fn empty_type_name_reads_as_plain_map() {
        let bytes = [b'M', 0x00, 0x01, b'k', 0x91, b'Z'];
        let value = hessian_core::from_bytes(&bytes).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.get_str("k").and_then(|v| v.as_int()), Some(1));
    }
}
