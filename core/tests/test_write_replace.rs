// Substitution suite. Catches:

// * the hook running more than once per instance
// * repeated originals not resolving to the replacement
// * an identity hook recursing instead of falling back
// * hooks lost through `extends`

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use hessian_core::serializer::{ClassDescriptor, Serializable};
    use hessian_core::types::HessianError;
    use hessian_core::value::{GenericObject, ObjectRef, Value};
    use hessian_core::{from_bytes, to_bytes};

    static REDACT_CALLS: AtomicUsize = AtomicUsize::new(0);
    static MASK_CALLS: AtomicUsize = AtomicUsize::new(0);

    struct Secret {
        token: String,
    }

    impl Serializable for Secret {
        fn describe() -> ClassDescriptor<Self> {
            ClassDescriptor::new("Secret")
                .string("token", |s: &Secret| Some(s.token.as_str()))
                .write_replace(|s: &Secret, _original: &ObjectRef| {
                    REDACT_CALLS.fetch_add(1, Ordering::SeqCst);
                    let fields = vec![("length".to_string(), Value::Int(s.token.len() as i32))];
                    Ok(Value::object(GenericObject::with_fields("Redacted", fields)))
                })
        }
    }

    struct Masked;

    impl Serializable for Masked {
        fn describe() -> ClassDescriptor<Self> {
            ClassDescriptor::new("Masked").write_replace(|_: &Masked, _: &ObjectRef| {
                MASK_CALLS.fetch_add(1, Ordering::SeqCst);
                Ok(Value::string("masked"))
            })
        }
    }

    struct Plain {
        n: i32,
    }

    impl Serializable for Plain {
        fn describe() -> ClassDescriptor<Self> {
            ClassDescriptor::new("Plain")
                .int("n", |p: &Plain| p.n)
                .write_replace(|_: &Plain, original: &ObjectRef| Ok(Value::Object(original.clone())))
        }
    }

    struct Refusing;

    impl Serializable for Refusing {
        fn describe() -> ClassDescriptor<Self> {
            ClassDescriptor::new("Refusing")
                .write_replace(|_: &Refusing, _: &ObjectRef| Err(HessianError::custom("refused")))
        }
    }

    struct Handle {
        id: i32,
    }

    impl Serializable for Handle {
        fn describe() -> ClassDescriptor<Self> {
            ClassDescriptor::new("Handle")
                .int("id", |h: &Handle| h.id)
                .write_replace(|h: &Handle, _: &ObjectRef| Ok(Value::string(format!("handle:{}", h.id))))
        }
    }

    struct Session {
        handle: Handle,
        user: String,
    }

    fn handle_of(s: &Session) -> &Handle {
        &s.handle
    }

    impl Serializable for Session {
        fn describe() -> ClassDescriptor<Self> {
            ClassDescriptor::new("Session")
                .string("user", |s: &Session| Some(s.user.as_str()))
                .extends(Handle::describe(), handle_of)
        }
    }

    #[test]
    fn replacement_takes_over_original_identity() {
        let secret = Value::object(Secret { token: "hunter2".into() });
        let list = Value::list(vec![secret.clone(), secret]);

        let bytes = to_bytes(&list).unwrap();
        assert_eq!(&bytes[bytes.len() - 2..], &[b'Q', 0x91]);
        assert_eq!(REDACT_CALLS.load(Ordering::SeqCst), 1);

        let back = from_bytes(&bytes).unwrap();
        let items = back.as_list().unwrap();
        let first = items.get(0).unwrap();
        let redacted = first.as_generic().unwrap();
        assert_eq!(redacted.type_name(), "Redacted");
        assert_eq!(redacted.field("length").and_then(|v| v.as_int()), Some(7));
        assert!(items.get(1).unwrap().ptr_eq(&first));
    }

    #[test]
    fn scalar_replacement_is_written_each_time() {
        let masked = Value::object(Masked);
        let bytes = to_bytes(&Value::list(vec![masked.clone(), masked])).unwrap();

        let mut expected = vec![0x7a];
        expected.extend_from_slice(b"\x06masked\x06masked");
        assert_eq!(bytes, expected);
        assert_eq!(MASK_CALLS.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn identity_hook_falls_back_to_class_serializer() {
        let back = from_bytes(&to_bytes(&Value::object(Plain { n: 9 })).unwrap()).unwrap();
        let obj = back.as_generic().unwrap();
        assert_eq!(obj.type_name(), "Plain");
        assert_eq!(obj.field("n").and_then(|v| v.as_int()), Some(9));
    }

    #[test]
    fn identity_hook_still_shares_instances() {
        let plain = Value::object(Plain { n: 1 });
        let bytes = to_bytes(&Value::list(vec![plain.clone(), plain])).unwrap();
        assert_eq!(&bytes[bytes.len() - 2..], &[b'Q', 0x91]);
    }

    #[test]
    fn hook_error_aborts_the_write() {
        let err = to_bytes(&Value::object(Refusing)).unwrap_err();
        assert!(matches!(err, HessianError::Custom(ref msg) if msg == "refused"));
    }

    #[test]
    fn parent_hook_applies_to_extending_type() {
        let session = Session { handle: Handle { id: 4 }, user: "ana".into() };
        let back = from_bytes(&to_bytes(&Value::object(session)).unwrap()).unwrap();
        assert_eq!(back.as_str(), Some("handle:4"));
    }
}
