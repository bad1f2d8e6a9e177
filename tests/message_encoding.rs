use protowire::encoding::{
    decode_varint, decode_zigzag, encode_varint, encode_zigzag, encoded_len_varint,
};
use protowire::{
    EncodeErrorKind, EnumProps, FieldProps, FieldType, MessageProps, StructValue, Syntax,
    TypeRegistry, Value,
};
use quickcheck::quickcheck;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Encodes, decodes, and re-encodes a message, checking that the canonical
/// byte sequence survives the round trip.
fn check_roundtrip(value: &StructValue, props: &MessageProps, registry: &TypeRegistry) -> Vec<u8> {
    let bytes = protowire::encode(value, props, registry).unwrap();
    log::debug!("encoded message: {:?}", bytes);

    let decoded = protowire::decode(&bytes, props, registry).unwrap();
    let reencoded = protowire::encode(&decoded, props, registry).unwrap();
    assert_eq!(bytes, reencoded);
    bytes
}

fn month_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.add_enum(
        EnumProps::build("pkg.Month")
            .symbol("UNKNOWN", 0)
            .symbol("JANUARY", 2)
            .finish(),
    );
    registry.add_message(
        MessageProps::build("pkg.MonthValue", Syntax::Proto3)
            .wrapper()
            .field(FieldProps::new(1, "value", FieldType::enumeration("pkg.Month")))
            .finish(),
    );
    registry
}

#[test]
fn proto3_scalar_message() {
    init();
    let props = MessageProps::build("pkg.Scalars", Syntax::Proto3)
        .field(FieldProps::new(1, "a", FieldType::Int32))
        .field(FieldProps::new(2, "b", FieldType::String))
        .finish();
    let value = StructValue::new().field("a", 150).field("b", "");

    let bytes = check_roundtrip(&value, &props, &TypeRegistry::new());
    assert_eq!(bytes, [0x08, 0x96, 0x01]);
}

#[test]
fn proto2_negative_int64() {
    init();
    let props = MessageProps::build("pkg.Opt", Syntax::Proto2)
        .field(FieldProps::new(1, "x", FieldType::Int64))
        .finish();
    let value = StructValue::new().field("x", -1i64);

    let bytes = check_roundtrip(&value, &props, &TypeRegistry::new());
    assert_eq!(
        bytes,
        [0x08, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]
    );
}

#[test]
fn packed_repeated_int32() {
    init();
    let props = MessageProps::build("pkg.Packed", Syntax::Proto3)
        .field(FieldProps::new(5, "values", FieldType::Int32).packed())
        .finish();
    let value = StructValue::new().field(
        "values",
        Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
    );

    let bytes = check_roundtrip(&value, &props, &TypeRegistry::new());
    assert_eq!(bytes, [0x2A, 0x03, 0x01, 0x02, 0x03]);
}

#[test]
fn sint32_zigzag_bytes() {
    init();
    let props = MessageProps::build("pkg.Signed", Syntax::Proto3)
        .field(FieldProps::new(1, "s", FieldType::Sint32))
        .finish();
    let registry = TypeRegistry::new();

    // zigzag(-1) = 1.
    let value = StructValue::new().field("s", -1);
    assert_eq!(check_roundtrip(&value, &props, &registry), [0x08, 0x01]);

    let value = StructValue::new().field("s", 2_147_483_647);
    assert_eq!(
        check_roundtrip(&value, &props, &registry),
        [0x08, 0xFE, 0xFF, 0xFF, 0xFF, 0x0F]
    );
}

#[test]
fn float_and_double_specials() {
    init();
    let props = MessageProps::build("pkg.Floats", Syntax::Proto3)
        .field(FieldProps::new(1, "f", FieldType::Float))
        .field(FieldProps::new(2, "d", FieldType::Double))
        .finish();
    let registry = TypeRegistry::new();

    let value = StructValue::new().field("f", f32::NAN);
    let bytes = protowire::encode(&value, &props, &registry).unwrap();
    assert_eq!(bytes, [0x0D, 0x00, 0x00, 0xC0, 0x7F]);

    let value = StructValue::new().field("d", f64::NEG_INFINITY);
    let bytes = check_roundtrip(&value, &props, &registry);
    assert_eq!(
        bytes,
        [0x11, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xF0, 0xFF]
    );

    let value = StructValue::new().field("f", f32::INFINITY);
    assert_eq!(
        check_roundtrip(&value, &props, &registry),
        [0x0D, 0x00, 0x00, 0x80, 0x7F]
    );

    let value = StructValue::new().field("d", f64::NAN);
    let bytes = protowire::encode(&value, &props, &registry).unwrap();
    assert_eq!(
        bytes,
        [0x11, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0xF8, 0x7F]
    );
}

#[test]
fn embedded_value_wrapper() {
    init();
    let registry = month_registry();
    let props = MessageProps::build("pkg.Foo", Syntax::Proto3)
        .field(FieldProps::new(2, "month", FieldType::message("pkg.MonthValue")))
        .finish();

    let value = StructValue::new().field("month", Value::Enum("JANUARY".to_owned()));
    let bytes = protowire::encode(&value, &props, &registry).unwrap();
    assert_eq!(bytes, [0x12, 0x02, 0x08, 0x02]);
}

#[test]
fn int32_overflow_is_a_type_error() {
    init();
    let props = MessageProps::build("pkg.Scalars", Syntax::Proto3)
        .field(FieldProps::new(1, "a", FieldType::Int32))
        .finish();
    let value = StructValue::new().field("a", Value::Int(1i64 << 31));
    let error = protowire::encode(&value, &props, &TypeRegistry::new()).unwrap_err();
    assert!(matches!(error.kind(), EncodeErrorKind::Type(_)));
}

#[test]
fn oneof_wrong_branch_is_an_encode_error() {
    init();
    let props = MessageProps::build("pkg.Choice", Syntax::Proto3)
        .oneof("kind")
        .oneof("extra")
        .field(FieldProps::new(1, "count", FieldType::Int32).in_oneof(0))
        .field(FieldProps::new(2, "flag", FieldType::Bool).in_oneof(1))
        .finish();

    let value = StructValue::new().oneof("kind", "flag", true);
    let error = protowire::encode(&value, &props, &TypeRegistry::new()).unwrap_err();
    let rendered = error.to_string();
    assert!(rendered.contains("flag"), "{}", rendered);
    assert!(rendered.contains("kind"), "{}", rendered);
}

#[test]
fn nested_messages_roundtrip() {
    init();
    let mut registry = TypeRegistry::new();
    registry.add_message(
        MessageProps::build("pkg.Inner", Syntax::Proto3)
            .field(FieldProps::new(1, "id", FieldType::Uint32))
            .field(FieldProps::new(2, "tags", FieldType::String).repeated())
            .finish(),
    );
    let props = MessageProps::build("pkg.Outer", Syntax::Proto3)
        .field(FieldProps::new(1, "inner", FieldType::message("pkg.Inner")))
        .field(FieldProps::new(2, "rest", FieldType::message("pkg.Inner")).repeated())
        .finish();

    let inner = StructValue::new().field("id", 7u32).field(
        "tags",
        Value::List(vec![Value::String("a".into()), Value::String("b".into())]),
    );
    let value = StructValue::new()
        .field("inner", inner.clone())
        .field(
            "rest",
            Value::List(vec![Value::Message(inner.clone()), Value::Message(inner)]),
        );
    check_roundtrip(&value, &props, &registry);
}

quickcheck! {
    fn varint_roundtrip(value: u64) -> bool {
        let mut buf = Vec::new();
        encode_varint(value, &mut buf);
        if buf.len() != encoded_len_varint(value) {
            return false;
        }
        let mut slice = &buf[..];
        decode_varint(&mut slice) == Ok(value) && slice.is_empty()
    }

    fn zigzag_roundtrip(value: i64) -> bool {
        decode_zigzag(encode_zigzag(value)) == value
    }

    fn negative_int64_is_ten_bytes(value: i64) -> bool {
        if value >= 0 {
            return true;
        }
        let mut buf = Vec::new();
        encode_varint(value as u64, &mut buf);
        buf.len() == 10
    }

    fn int32_field_roundtrip(value: i32) -> bool {
        let props = MessageProps::build("pkg.Scalars", Syntax::Proto3)
            .field(FieldProps::new(1, "a", FieldType::Int32))
            .finish();
        let registry = TypeRegistry::new();
        let message = StructValue::new().field("a", value);
        let bytes = protowire::encode(&message, &props, &registry).unwrap();
        let decoded = protowire::decode(&bytes, &props, &registry).unwrap();
        match decoded.get("a") {
            Some(Value::Int(decoded)) => *decoded == i64::from(value),
            // Skipped as the proto3 default.
            None => value == 0,
            _ => false,
        }
    }

    fn sint64_field_roundtrip(value: i64) -> bool {
        let props = MessageProps::build("pkg.Signed", Syntax::Proto3)
            .field(FieldProps::new(1, "s", FieldType::Sint64))
            .finish();
        let registry = TypeRegistry::new();
        let message = StructValue::new().field("s", value);
        let bytes = protowire::encode(&message, &props, &registry).unwrap();
        let decoded = protowire::decode(&bytes, &props, &registry).unwrap();
        match decoded.get("s") {
            Some(Value::Int(decoded)) => *decoded == value,
            None => value == 0,
            _ => false,
        }
    }

    fn string_field_roundtrip(value: String) -> bool {
        let props = MessageProps::build("pkg.Text", Syntax::Proto3)
            .field(FieldProps::new(1, "s", FieldType::String))
            .finish();
        let registry = TypeRegistry::new();
        let message = StructValue::new().field("s", value.clone());
        let bytes = protowire::encode(&message, &props, &registry).unwrap();
        let decoded = protowire::decode(&bytes, &props, &registry).unwrap();
        match decoded.get("s") {
            Some(Value::String(decoded)) => *decoded == value,
            None => value.is_empty(),
            _ => false,
        }
    }

    fn encoding_is_deterministic(a: i64, b: String, c: Vec<u8>) -> bool {
        let props = MessageProps::build("pkg.Mixed", Syntax::Proto3)
            .field(FieldProps::new(1, "a", FieldType::Int64))
            .field(FieldProps::new(2, "b", FieldType::String))
            .field(FieldProps::new(3, "c", FieldType::Bytes))
            .finish();
        let registry = TypeRegistry::new();
        let message = StructValue::new()
            .field("a", a)
            .field("b", b)
            .field("c", c);
        let first = protowire::encode(&message, &props, &registry).unwrap();
        let second = protowire::encode(&message, &props, &registry).unwrap();
        first == second
    }

    fn canonical_reencode(a: i64, b: String, packed: Vec<u32>) -> bool {
        let props = MessageProps::build("pkg.Mixed", Syntax::Proto3)
            .field(FieldProps::new(1, "a", FieldType::Int64))
            .field(FieldProps::new(2, "b", FieldType::String))
            .field(FieldProps::new(3, "p", FieldType::Uint32).packed())
            .finish();
        let registry = TypeRegistry::new();
        let message = StructValue::new()
            .field("a", a)
            .field("b", b)
            .field(
                "p",
                Value::List(packed.into_iter().map(Value::from).collect()),
            );
        let bytes = protowire::encode(&message, &props, &registry).unwrap();
        let decoded = protowire::decode(&bytes, &props, &registry).unwrap();
        protowire::encode(&decoded, &props, &registry).unwrap() == bytes
    }
}
