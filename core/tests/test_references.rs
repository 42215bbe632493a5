// Reference table suite. Catches:

// * cycles that recurse instead of ending in a back-reference
// * shared instances written more than once
// * writer and reader assigning different indexes
// * unshared writes leaking into the shared table

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use hessian_core::config::{InputConfig, OutputConfig};
    use hessian_core::constants::DEFAULT_MAX_DEPTH;
    use hessian_core::io::{Hessian2Input, Hessian2Output, ObjectInput, ObjectOutput};
    use hessian_core::serializer::{ClassDescriptor, Serializable};
    use hessian_core::types::{HessianError, ProtocolError};
    use hessian_core::value::{GenericObject, ListValue, MapValue, ObjectRef, Value};
    use hessian_core::{from_bytes, to_bytes};

    struct Node {
        label: String,
        next: RefCell<Value>,
    }

    impl Serializable for Node {
        fn describe() -> ClassDescriptor<Self> {
            ClassDescriptor::new("Node")
                .string("label", |n: &Node| Some(n.label.as_str()))
                .object("next", |n: &Node| n.next.borrow().clone())
        }
    }

    struct Leaf {
        v: i32,
    }

    impl Serializable for Leaf {
        fn describe() -> ClassDescriptor<Self> {
            ClassDescriptor::new("Leaf").int("v", |l: &Leaf| l.v).unshared()
        }
    }

    struct Point {
        x: i32,
    }

    impl Serializable for Point {
        fn describe() -> ClassDescriptor<Self> {
            ClassDescriptor::new("P").int("x", |p: &Point| p.x)
        }
    }

// ## 1️⃣ Cycles

    #[test]
    fn list_containing_itself() {
        let list = Rc::new(ListValue::new(None, Vec::new()));
        let value = Value::List(list.clone());
        list.push(Value::Int(1));
        list.push(value.clone());

        let bytes = to_bytes(&value).unwrap();
        assert_eq!(bytes, vec![0x7a, 0x91, b'Q', 0x90]);

        let back = from_bytes(&bytes).unwrap();
        let items = back.as_list().unwrap();
        assert_eq!(items.get(0).and_then(|v| v.as_int()), Some(1));
        assert!(items.get(1).unwrap().ptr_eq(&back));
    }

    #[test]
    fn map_containing_itself() {
        let map = Rc::new(MapValue::new(Vec::new()));
        let value = Value::Map(map.clone());
        map.insert(Value::string("self"), value.clone());

        let bytes = to_bytes(&value).unwrap();
        assert_eq!(bytes, vec![b'H', 0x04, b's', b'e', b'l', b'f', b'Q', 0x90, b'Z']);

        let back = from_bytes(&bytes).unwrap();
        assert!(back.as_map().unwrap().get_str("self").unwrap().ptr_eq(&back));
    }

    #[test]
    fn generic_object_cycle() {
        let node = Rc::new(GenericObject::new("Node"));
        let value = Value::Object(node.clone() as ObjectRef);
        node.set_field("next", value.clone());

        let bytes = to_bytes(&value).unwrap();
        assert_eq!(
            bytes,
            vec![b'C', 0x04, b'N', b'o', b'd', b'e', 0x91, 0x04, b'n', b'e', b'x', b't', 0x60, b'Q', 0x90]
        );

        let back = from_bytes(&bytes).unwrap();
        assert!(back.as_generic().unwrap().field("next").unwrap().ptr_eq(&back));
    }

    #[test]
    fn typed_two_node_ring() {
        let a = Rc::new(Node { label: "a".into(), next: RefCell::new(Value::Null) });
        let b = Rc::new(Node { label: "b".into(), next: RefCell::new(Value::Null) });
        let va = Value::Object(a.clone() as ObjectRef);
        let vb = Value::Object(b.clone() as ObjectRef);
        *a.next.borrow_mut() = vb;
        *b.next.borrow_mut() = va.clone();

        let back = from_bytes(&to_bytes(&va).unwrap()).unwrap();
        let first = back.as_generic().unwrap();
        assert_eq!(first.field("label").unwrap().as_str(), Some("a"));

        let second_value = first.field("next").unwrap();
        let second = second_value.as_generic().unwrap();
        assert_eq!(second.field("label").unwrap().as_str(), Some("b"));
        assert!(second.field("next").unwrap().ptr_eq(&back));

        // Break the cycles so the test does not leak.
        *a.next.borrow_mut() = Value::Null;
        second.set_field("next", Value::Null);
    }

// ## 2️⃣ Sharing

    #[test]
    fn shared_instance_written_once() {
        let p = Value::object(Point { x: 7 });
        let list = Value::list(vec![p.clone(), p]);

        let mut out = Hessian2Output::new(Vec::new());
        out.write_object(&list).unwrap();
        assert_eq!(out.counters().refs_written, 1);
        let bytes = out.into_inner().unwrap();
        assert_eq!(&bytes[bytes.len() - 2..], &[b'Q', 0x91]);

        let mut input = Hessian2Input::new(&bytes[..]);
        let back = input.read_object().unwrap();
        assert_eq!(input.counters().refs_read, 1);
        let items = back.as_list().unwrap();
        assert!(items.get(0).unwrap().ptr_eq(&items.get(1).unwrap()));
    }

    #[test]
    fn references_span_top_level_writes() {
        let list = Value::list(vec![Value::Int(5)]);
        let mut out = Hessian2Output::new(Vec::new());
        out.write_object(&list).unwrap();
        out.write_object(&list).unwrap();
        let bytes = out.into_inner().unwrap();
        assert_eq!(bytes, vec![0x79, 0x95, b'Q', 0x90]);

        let mut input = Hessian2Input::new(&bytes[..]);
        let first = input.read_object().unwrap();
        let second = input.read_object().unwrap();
        assert!(first.ptr_eq(&second));
    }

    #[test]
    fn reset_references_forgets_identities() {
        let list = Value::list(vec![]);
        let mut out = Hessian2Output::new(Vec::new());
        out.write_object(&list).unwrap();
        out.reset_references();
        out.write_object(&list).unwrap();
        assert_eq!(out.into_inner().unwrap(), vec![0x78, 0x78]);
    }

    #[test]
    fn scalars_are_never_shared() {
        let s = Value::string("same");
        let bytes = to_bytes(&Value::list(vec![s.clone(), s])).unwrap();
        assert!(!bytes.contains(&b'Q'));
    }

// ## 3️⃣ Unshared plans

    #[test]
    fn unshared_instance_is_written_twice() {
        let leaf = Value::object(Leaf { v: 7 });
        let list = Value::list(vec![leaf.clone(), leaf]);

        let bytes = to_bytes(&list).unwrap();
        assert_eq!(
            bytes,
            vec![0x7a, b'C', 0x04, b'L', b'e', b'a', b'f', 0x91, 0x01, b'v', 0x60, 0x97, 0x60, 0x97]
        );

        let back = from_bytes(&bytes).unwrap();
        let items = back.as_list().unwrap();
        assert!(!items.get(0).unwrap().ptr_eq(&items.get(1).unwrap()));
    }

    #[test]
    fn unshared_writes_keep_indexes_aligned() {
        let leaf = Value::object(Leaf { v: 1 });
        let list = Value::list(vec![leaf.clone(), leaf]);
        let p = Value::object(Point { x: 2 });

        let mut out = Hessian2Output::new(Vec::new());
        out.write_object(&list).unwrap();
        out.write_object(&p).unwrap();
        out.write_object(&p).unwrap();
        let bytes = out.into_inner().unwrap();
        // list 0, leaves 1 and 2, point 3
        assert_eq!(&bytes[bytes.len() - 2..], &[b'Q', 0x93]);

        let mut input = Hessian2Input::new(&bytes[..]);
        input.read_object().unwrap();
        let first = input.read_object().unwrap();
        let second = input.read_object().unwrap();
        assert_eq!(first.as_generic().unwrap().type_name(), "P");
        assert!(first.ptr_eq(&second));
    }

    #[test]
    fn unshared_cycle_stops_at_depth_limit() {
        let list = Rc::new(ListValue::new(None, Vec::new()));
        let value = Value::List(list.clone());
        list.push(value.clone());

        let mut out = Hessian2Output::new(Vec::new());
        assert!(!out.set_unshared(true));
        let err = out.write_object(&value).unwrap_err();
        assert!(matches!(err, HessianError::Protocol(ProtocolError::DepthExceeded { .. })));
    }

// ## 4️⃣ Depth limits

    fn chain(len: usize) -> Value {
        let mut next = Value::Null;
        for i in 0..len {
            next = Value::object(Node { label: i.to_string(), next: RefCell::new(next) });
        }
        next
    }

    /// `C "N" [n]`, then `levels` nested instances, ending in null.
    fn nested_instances(levels: usize) -> Vec<u8> {
        let mut bytes = vec![b'C', 0x01, b'N', 0x91, 0x01, b'n'];
        bytes.extend(std::iter::repeat(0x60).take(levels));
        bytes.push(b'N');
        bytes
    }

    fn chain_len(mut node: Value) -> usize {
        let mut len = 0;
        while let Some(obj) = node.as_generic() {
            len += 1;
            let next = obj.field("next").unwrap_or(Value::Null);
            node = next;
        }
        len
    }

    #[test]
    fn instance_chains_within_default_depth_round_trip() {
        let bytes = to_bytes(&chain(100)).unwrap();
        assert_eq!(chain_len(from_bytes(&bytes).unwrap()), 100);

        assert!(from_bytes(&nested_instances(100)).is_ok());
    }

    #[test]
    fn deep_instance_chain_is_rejected_when_written() {
        let err = to_bytes(&chain(300)).unwrap_err();
        let root = err.root();
        assert!(
            matches!(root, HessianError::Protocol(ProtocolError::DepthExceeded { limit }) if *limit == DEFAULT_MAX_DEPTH),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn deep_instance_nesting_is_rejected_when_read() {
        let err = from_bytes(&nested_instances(500)).unwrap_err();
        assert!(matches!(
            err,
            HessianError::Protocol(ProtocolError::DepthExceeded { limit }) if limit == DEFAULT_MAX_DEPTH
        ));
    }

    #[test]
    fn raised_limits_carry_long_chains() {
        let worker = std::thread::Builder::new()
            .stack_size(64 << 20)
            .spawn(|| {
                let node = chain(600);
                let config = OutputConfig { max_depth: 1024, ..OutputConfig::default() };
                let mut out = Hessian2Output::with_config(Vec::new(), config);
                out.write_object(&node).unwrap();
                let bytes = out.into_inner().unwrap();

                let config = InputConfig { max_depth: 1024, ..InputConfig::default() };
                let back = Hessian2Input::with_config(&bytes[..], config).read_object().unwrap();
                chain_len(back)
            })
            .unwrap();
        assert_eq!(worker.join().unwrap(), 600);
    }

// ## 5️⃣ Reader limits

    #[test]
    fn dangling_reference_is_rejected() {
        let err = from_bytes(&[b'Q', 0x95]).unwrap_err();
        assert!(matches!(
            err,
            HessianError::Protocol(ProtocolError::InvalidReference { index: 5, defined: 0 })
        ));
    }

    #[test]
    fn nesting_beyond_limit_is_rejected() {
        let mut bytes = vec![0x79; 10];
        bytes.push(0x90);
        let config = InputConfig { max_depth: 4, ..InputConfig::default() };
        let err = Hessian2Input::with_config(&bytes[..], config).read_object().unwrap_err();
        assert!(matches!(err, HessianError::Protocol(ProtocolError::DepthExceeded { limit: 4 })));

        assert!(from_bytes(&bytes).is_ok());
    }
}
